//! Bilingual asset status vocabulary.
//!
//! Asset statuses are stored in their Japanese form but are accepted in
//! either Japanese or English. Each variant is one equivalence pair; two
//! statuses compare equal iff they are the same variant, whichever language
//! they were parsed from.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Closed set of canonical asset statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum AssetStatus {
    /// 利用中
    InUse,
    /// 欠落
    Missing,
    /// 故障中
    Broken,
    /// 保管中
    InStorage,
    /// 保管(使用無)
    InStorageUnused,
    /// 返却済
    Returned,
    /// 廃止
    Abolished,
    /// 貸出中
    OnLoan,
    /// 利用予約
    Reserved,
}

impl AssetStatus {
    /// Every status, in display order.
    pub const ALL: [AssetStatus; 9] = [
        AssetStatus::InUse,
        AssetStatus::Missing,
        AssetStatus::Broken,
        AssetStatus::InStorage,
        AssetStatus::InStorageUnused,
        AssetStatus::Returned,
        AssetStatus::Abolished,
        AssetStatus::OnLoan,
        AssetStatus::Reserved,
    ];

    /// Japanese form, which is also the persisted form.
    pub fn japanese(&self) -> &'static str {
        match self {
            AssetStatus::InUse => "利用中",
            AssetStatus::Missing => "欠落",
            AssetStatus::Broken => "故障中",
            AssetStatus::InStorage => "保管中",
            AssetStatus::InStorageUnused => "保管(使用無)",
            AssetStatus::Returned => "返却済",
            AssetStatus::Abolished => "廃止",
            AssetStatus::OnLoan => "貸出中",
            AssetStatus::Reserved => "利用予約",
        }
    }

    /// English form.
    pub fn english(&self) -> &'static str {
        match self {
            AssetStatus::InUse => "In Use",
            AssetStatus::Missing => "Missing",
            AssetStatus::Broken => "Broken",
            AssetStatus::InStorage => "In Storage",
            AssetStatus::InStorageUnused => "In Storage-Unused",
            AssetStatus::Returned => "Returned",
            AssetStatus::Abolished => "Abolished",
            AssetStatus::OnLoan => "On Loan",
            AssetStatus::Reserved => "Reserved",
        }
    }

    /// Parses either language form.
    ///
    /// English forms are matched case-insensitively and ignore spaces,
    /// hyphens and underscores, so `in_storage`, `In Storage` and
    /// `IN-STORAGE` are all accepted. The full-width parentheses variant of
    /// `保管(使用無)` is accepted too.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }

        let japanese = trimmed.replace('（', "(").replace('）', ")");
        if let Some(status) = Self::ALL.iter().find(|s| s.japanese() == japanese) {
            return Some(*status);
        }

        let folded = fold_english(trimmed);
        Self::ALL
            .iter()
            .find(|s| fold_english(s.english()) == folded)
            .copied()
    }
}

fn fold_english(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(|c| c.to_lowercase())
        .collect()
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.japanese())
    }
}

impl FromStr for AssetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("Unknown asset status: {}", s))
    }
}

impl TryFrom<String> for AssetStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AssetStatus> for String {
    fn from(status: AssetStatus) -> Self {
        status.japanese().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_japanese_english_pairs_are_equivalent() {
        let pairs = [
            ("欠落", "Missing"),
            ("故障中", "Broken"),
            ("保管中", "In Storage"),
            ("利用中", "In Use"),
            ("返却済", "Returned"),
            ("廃止", "Abolished"),
            ("貸出中", "On Loan"),
            ("利用予約", "Reserved"),
            ("保管(使用無)", "In Storage-Unused"),
        ];
        for (ja, en) in pairs {
            assert_eq!(AssetStatus::parse(ja), AssetStatus::parse(en), "{ja} vs {en}");
            assert!(AssetStatus::parse(ja).is_some());
        }
    }

    #[test]
    fn test_parse_is_lenient_for_english() {
        assert_eq!(AssetStatus::parse("missing"), Some(AssetStatus::Missing));
        assert_eq!(AssetStatus::parse("in_storage"), Some(AssetStatus::InStorage));
        assert_eq!(AssetStatus::parse(" IN-USE "), Some(AssetStatus::InUse));
        assert_eq!(
            AssetStatus::parse("in storage unused"),
            Some(AssetStatus::InStorageUnused)
        );
    }

    #[test]
    fn test_parse_full_width_parentheses() {
        assert_eq!(
            AssetStatus::parse("保管（使用無）"),
            Some(AssetStatus::InStorageUnused)
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(AssetStatus::parse(""), None);
        assert_eq!(AssetStatus::parse("Lost"), None);
        assert!("紛失".parse::<AssetStatus>().is_err());
    }

    #[test]
    fn test_display_uses_japanese() {
        assert_eq!(AssetStatus::InStorage.to_string(), "保管中");
        assert_eq!(AssetStatus::InUse.to_string(), "利用中");
    }

    #[test]
    fn test_serde_round_trip_accepts_english() {
        let status: AssetStatus = serde_json::from_str("\"Broken\"").unwrap();
        assert_eq!(status, AssetStatus::Broken);
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"故障中\"");
    }
}
