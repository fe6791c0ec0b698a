use serde::{Deserialize, Serialize};

/// A `[submodule]` section from `.gitmodules`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Submodule {
    /// Path relative to the repository root
    pub path: String,
    pub url: String,
}
