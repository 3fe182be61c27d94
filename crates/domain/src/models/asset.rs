//! Canonical asset record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset_status::AssetStatus;
use super::notes::NotesLog;

/// Canonical inventory record owned by the broader inventory system.
///
/// The audit workflow only ever updates assets; it never creates or deletes
/// them. `location` is a location *name*, not a foreign key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub id: i64,
    pub asset_code: String,
    pub asset_type: String,
    pub location: String,
    pub status: AssetStatus,
    pub user_id: Option<i64>,
    pub notes: NotesLog,
    pub last_updated: Option<DateTime<Utc>>,
    pub updated_by: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn is_assigned(&self) -> bool {
        self.user_id.is_some()
    }
}

/// Partial update of a canonical asset.
///
/// Only the `Some` fields are written; `updated_at` is always set to `at`.
/// Note lines are merged into the asset's notes log, skipping any line the
/// log already holds.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetPatch {
    pub status: Option<AssetStatus>,
    pub location: Option<String>,
    pub user_id: Option<i64>,
    /// Reject the write if the asset already has a user. Set for
    /// reassignments so two concurrent submissions cannot both claim it.
    pub require_unassigned: bool,
    pub note_lines: Vec<String>,
    pub updated_by: Option<i64>,
    /// Also stamp `last_updated` (resolution writes do, status mirrors don't).
    pub touch_last_updated: bool,
    pub at: DateTime<Utc>,
}

impl AssetPatch {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self {
            status: None,
            location: None,
            user_id: None,
            require_unassigned: false,
            note_lines: Vec::new(),
            updated_by: None,
            touch_last_updated: false,
            at,
        }
    }

    pub fn status(mut self, status: AssetStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn user_id(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// Assign a user, but only onto an asset that has none.
    pub fn reassign_to(mut self, user_id: i64) -> Self {
        self.user_id = Some(user_id);
        self.require_unassigned = true;
        self
    }

    pub fn note_once(mut self, text: impl Into<String>) -> Self {
        self.note_lines.push(text.into());
        self
    }

    pub fn updated_by(mut self, employee_id: Option<i64>) -> Self {
        self.updated_by = employee_id;
        self
    }

    pub fn touch_last_updated(mut self) -> Self {
        self.touch_last_updated = true;
        self
    }

    /// Whether applying the patch would change the asset's status,
    /// location, user or notes.
    pub fn changes(&self, asset: &Asset) -> bool {
        self.status.is_some_and(|s| s != asset.status)
            || self.location.as_ref().is_some_and(|l| *l != asset.location)
            || self.user_id.is_some_and(|u| Some(u) != asset.user_id)
            || self
                .note_lines
                .iter()
                .any(|line| !line.trim().is_empty() && !asset.notes.contains_text(line))
    }

    /// Applies the patch to an in-memory asset.
    pub fn apply_to(&self, asset: &mut Asset) {
        if let Some(status) = self.status {
            asset.status = status;
        }
        if let Some(location) = &self.location {
            asset.location = location.clone();
        }
        if let Some(user_id) = self.user_id {
            asset.user_id = Some(user_id);
        }
        for line in &self.note_lines {
            asset.notes.append_once(self.at, line.clone());
        }
        if self.updated_by.is_some() {
            asset.updated_by = self.updated_by;
        }
        if self.touch_last_updated {
            asset.last_updated = Some(self.at);
        }
        asset.updated_at = self.at;
    }
}
