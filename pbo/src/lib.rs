mod archive;
mod bin;
pub mod ext;
mod source;
mod writer;

pub use archive::*;
pub use bin::*;
pub use source::*;
pub use writer::*;

pub use pbo_core::{
    Archive, Entry, FileEntry, Header, PackingMethod, Properties, ReadOptions, Record,
    SignatureStatus, DIGEST_SIZE,
};

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Build a closure turning an [`io::Error`] into an [`Error::Io`], with an
/// optional path and a short description of what was being done.
#[macro_export]
macro_rules! wrap_io_err {
    ($path:expr, $context:expr) => {
        |source| $crate::Error::Io {
            source,
            path: Some($path.to_path_buf()),
            context: $context,
        }
    };
    ($context:expr) => {
        |source| $crate::Error::Io {
            source,
            path: None,
            context: $context,
        }
    };
}

#[derive(thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Core(#[from] pbo_core::Error),

    #[error("{context}{}", path.as_ref().map(|p| format!(": {}", p.display())).unwrap_or_default())]
    Io {
        source: io::Error,
        path: Option<PathBuf>,
        context: &'static str,
    },

    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("Destination already exists: {0}")]
    WriteCollision(PathBuf),

    #[error("Invalid path component {component:?} in entry {entry:?}")]
    InvalidPath { entry: PathBuf, component: PathBuf },

    #[error("Path is not valid UTF-8: {0:?}")]
    NonUtf8Path(PathBuf),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(PathBuf),

    #[error("Entry {entry:?} size mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        entry: PathBuf,
        actual: u64,
        expected: u64,
    },
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{self}")?;

        let mut source = self.source();
        while let Some(err) = source {
            writeln!(f, "\tCaused by: {err}")?;
            source = err.source();
        }

        Ok(())
    }
}
