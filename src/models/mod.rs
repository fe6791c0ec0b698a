//! Data transfer objects (DTOs) for repository views.
//!
//! These structs are immutable values serialized to JSON for the renderer.
//! - `tree`: Tree, TreeEntry, Blob, GitObject, HistoryEntry
//! - `commit`: Commit, AuthorInfo
//! - `blame`: Blame, BlameChunk, Signature
//! - `submodule`: Submodule records from `.gitmodules`
//! - `response`: ViewData and the per-operation payloads

pub mod blame;
pub mod commit;
pub mod response;
pub mod submodule;
pub mod tree;

pub use blame::*;
pub use commit::*;
pub use response::*;
pub use submodule::*;
pub use tree::*;
