//! Blame data transfer objects.
//!
//! A blame is an ordered list of chunks covering the file top to bottom.
//! Each chunk is a run of consecutive lines last touched by the same commit
//! and carries that commit's full metadata.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Blame {
    pub chunks: Vec<BlameChunk>,
}

impl Blame {
    /// All lines of the blamed file, in order.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.chunks
            .iter()
            .flat_map(|chunk| chunk.lines.iter().map(String::as_str))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BlameChunk {
    /// OID of the commit that last modified these lines
    pub oid: String,
    pub author: Signature,
    pub committer: Signature,
    pub summary: String,
    pub lines: Vec<String>,
}

/// Person and time attached to a commit in porcelain output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    /// Email without the surrounding angle brackets
    pub mail: String,
    pub time: DateTime<FixedOffset>,
}
