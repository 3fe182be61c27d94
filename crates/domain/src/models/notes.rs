//! Append-only notes log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single timestamped note line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEntry {
    pub recorded_at: DateTime<Utc>,
    pub text: String,
}

/// Ordered, append-only sequence of notes.
///
/// There is deliberately no way to remove or edit an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotesLog(Vec<NoteEntry>);

impl NotesLog {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends a line. Blank text is ignored.
    pub fn append(&mut self, recorded_at: DateTime<Utc>, text: impl Into<String>) {
        let text = text.into();
        if text.trim().is_empty() {
            return;
        }
        self.0.push(NoteEntry {
            recorded_at,
            text: text.trim().to_string(),
        });
    }

    /// Appends a line unless an entry with identical text already exists.
    ///
    /// Returns whether the line was appended.
    pub fn append_once(&mut self, recorded_at: DateTime<Utc>, text: impl Into<String>) -> bool {
        let text = text.into();
        if self.contains_text(&text) {
            return false;
        }
        let before = self.0.len();
        self.append(recorded_at, text);
        self.0.len() > before
    }

    pub fn contains_text(&self, text: &str) -> bool {
        let text = text.trim();
        self.0.iter().any(|e| e.text == text)
    }

    pub fn entries(&self) -> &[NoteEntry] {
        &self.0
    }

    pub fn last(&self) -> Option<&NoteEntry> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<NoteEntry>> for NotesLog {
    fn from(entries: Vec<NoteEntry>) -> Self {
        Self(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 15, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_append_keeps_order() {
        let mut log = NotesLog::new();
        log.append(at(9), "first");
        log.append(at(10), "second");
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[0].text, "first");
        assert_eq!(log.last().unwrap().text, "second");
    }

    #[test]
    fn test_append_ignores_blank() {
        let mut log = NotesLog::new();
        log.append(at(9), "   ");
        assert!(log.is_empty());
    }

    #[test]
    fn test_append_once_is_idempotent() {
        let mut log = NotesLog::new();
        assert!(log.append_once(at(9), "Location changed"));
        assert!(!log.append_once(at(10), "Location changed"));
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut log = NotesLog::new();
        log.append(at(9), "hello");
        let json = serde_json::to_value(&log).unwrap();
        assert!(json.is_array());
        assert_eq!(json[0]["text"], "hello");
    }
}
