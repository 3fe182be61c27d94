//! Location reference data.

use serde::{Deserialize, Serialize};

/// A physical location assets can be placed in.
///
/// Assets refer to locations by `name`; audit assignments refer to them by
/// `id`. Plan fan-out resolves one to the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: i64,
    pub name: String,
}
