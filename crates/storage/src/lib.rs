pub mod backend;
pub mod error;
mod path;

pub use crate::backend::{Filesystem, LocalFilesystem};
pub use crate::path::{normalize, resolve_under, validate as validate_path};
use std::sync::Arc;

pub type FilesystemHandle = Arc<dyn Filesystem + Send + Sync>;
