use std::fs::{self, File, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use pbo_core::{PackingMethod, Record};

use crate::ext::copy_bounded;
use crate::{wrap_io_err, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceKind {
    File,
    /// Expanded into its children while packing, never stored itself
    Directory,
}

/// A file or directory on disk slated to go into an archive.
#[derive(Clone, Debug)]
pub struct SourceEntry {
    source: PathBuf,
    /// Archive path, `/` separated
    target: String,
    kind: SourceKind,
    record: Record,
}

impl SourceEntry {
    /// Stat `source` and describe it under the archive path `target`.
    pub fn new(source: impl AsRef<Path>, target: impl Into<String>) -> Result<SourceEntry, Error> {
        let source = source.as_ref().to_path_buf();
        let target = target.into();

        let metadata = fs::metadata(&source).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::SourceNotFound(source.clone()),
            _ => Error::Io {
                source: err,
                path: Some(source.clone()),
                context: "Reading metadata",
            },
        })?;

        let kind = if metadata.is_dir() {
            SourceKind::Directory
        } else if metadata.is_file() {
            SourceKind::File
        } else {
            return Err(Error::UnsupportedFileType(source));
        };

        let size = match kind {
            SourceKind::File => u32::try_from(metadata.len()).map_err(pbo_core::Error::from)?,
            SourceKind::Directory => 0,
        };
        let record = Record {
            path: target.as_bytes().to_vec(),
            packing_method: PackingMethod::Uncompressed,
            original_size: size,
            reserved: 0,
            timestamp: timestamp(&metadata),
            data_size: size,
        };

        Ok(SourceEntry {
            source,
            target,
            kind,
            record,
        })
    }

    /// Describe `source` under its own file name.
    pub fn from_path(source: impl AsRef<Path>) -> Result<SourceEntry, Error> {
        let source = source.as_ref();
        let name = match source.file_name() {
            Some(name) => name.to_os_string(),
            // `.` and friends have no file name until resolved
            None => fs::canonicalize(source)
                .map_err(wrap_io_err!(source, "Resolving path"))?
                .file_name()
                .map(|name| name.to_os_string())
                .ok_or_else(|| Error::InvalidPath {
                    entry: source.to_path_buf(),
                    component: source.to_path_buf(),
                })?,
        };
        let target = name
            .into_string()
            .map_err(|_| Error::NonUtf8Path(source.to_path_buf()))?;
        SourceEntry::new(source, target)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_dir(&self) -> bool {
        self.kind == SourceKind::Directory
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Change the method stored for a file. Only methods that carry a payload
    /// are accepted.
    pub fn set_packing_method(&mut self, method: PackingMethod) -> Result<(), Error> {
        if !method.has_payload() {
            return Err(pbo_core::Error::InvalidPackingMethod(method.into()).into());
        }
        self.record.packing_method = method;
        Ok(())
    }

    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.record.timestamp = timestamp;
    }

    /// Stream the file's contents to `emit` in chunks of at most `buf.len()`.
    /// The source is opened here and closed before returning.
    pub fn stream_payload<F>(&self, buf: &mut [u8], emit: F) -> Result<(), Error>
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        match self.record.packing_method {
            PackingMethod::Uncompressed => {}
            method => return Err(pbo_core::Error::UnsupportedPackingMethod(method).into()),
        }

        let expected = u64::from(self.record.size()?);
        let file = File::open(&self.source).map_err(wrap_io_err!(self.source, "Opening source file"))?;
        let actual = copy_bounded(file, expected, buf, emit)
            .map_err(wrap_io_err!(self.source, "Copying source file"))?;
        if actual != expected {
            return Err(Error::LengthMismatch {
                entry: self.source.clone(),
                actual,
                expected,
            });
        }
        Ok(())
    }

    /// Read a directory's immediate children, sorted by file name. Files
    /// have no children.
    pub fn children(&self) -> Result<Vec<SourceEntry>, Error> {
        if !self.is_dir() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.source).map_err(wrap_io_err!(self.source, "Reading dir"))? {
            let entry = entry.map_err(wrap_io_err!(self.source, "Reading dir entry"))?;
            names.push(entry.file_name());
        }
        names.sort();

        names
            .into_iter()
            .map(|name| {
                let path = self.source.join(&name);
                let name = name
                    .into_string()
                    .map_err(|_| Error::NonUtf8Path(path.clone()))?;
                SourceEntry::new(&path, format!("{}/{}", self.target, name))
            })
            .collect()
    }
}

/// Seconds since the epoch for `time`, or for now when the platform can't
/// report it or it is out of range.
pub(crate) fn unix_seconds(time: Option<SystemTime>) -> u32 {
    time.and_then(|time| time.duration_since(UNIX_EPOCH).ok())
        .and_then(|since| u32::try_from(since.as_secs()).ok())
        .unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .ok()
                .and_then(|since| u32::try_from(since.as_secs()).ok())
                .unwrap_or(u32::MAX)
        })
}

fn timestamp(metadata: &Metadata) -> u32 {
    unix_seconds(metadata.modified().ok())
}
