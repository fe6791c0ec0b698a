pub mod archiver;
pub mod blame;
pub mod history;
pub mod log;
pub mod paths;
pub mod process;
pub mod repository;
pub mod submodule;
pub mod submodule_url;
pub mod tree;

pub use archiver::{ArchiveFormat, Archiver};
pub use process::{GitRunner, ProcessOutput};
pub use repository::{GitRepository, RepositoryAccess};
pub use submodule_url::SubmoduleUrlResolver;

/// True for a full hex object id (SHA-1 or SHA-256).
pub fn is_object_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.bytes().all(|b| b.is_ascii_hexdigit())
}
