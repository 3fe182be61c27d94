//! Employee reference data.

use serde::{Deserialize, Serialize};

/// An employee who may own assets, act as an auditor, or receive mail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
    pub department: Option<String>,
}

impl Employee {
    /// Email address if one is on file and non-blank.
    pub fn mail_address(&self) -> Option<&str> {
        self.email
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
    }
}
