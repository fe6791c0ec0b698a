use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Commit {
    pub oid: String,
    pub author: AuthorInfo,
    pub summary: String,
    pub date: DateTime<FixedOffset>,
    /// Empty when the log was requested with subject lines only.
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
}
