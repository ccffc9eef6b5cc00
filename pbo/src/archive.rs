use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::debug;
use pbo_core::{Archive, ArchiveReader, ArchiveSrc, ReadOptions};

use crate::{wrap_io_err, Error};

/// A `.pbo` file on disk, read positionally.
#[derive(Debug)]
pub struct ArchiveFile {
    path: PathBuf,
    src: BufReader<File>,
    pos: u64,
    len: u64,
}

impl ArchiveFile {
    pub fn open(path: impl AsRef<Path>) -> Result<ArchiveFile, Error> {
        let path = path.as_ref().to_path_buf();

        let file = OpenOptions::new()
            .read(true)
            .open(&path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound => Error::SourceNotFound(path.clone()),
                _ => Error::Io {
                    source,
                    path: Some(path.clone()),
                    context: "Open",
                },
            })?;
        let len = file
            .metadata()
            .map_err(wrap_io_err!(path, "Reading metadata"))?
            .len();

        Ok(ArchiveFile {
            path,
            src: BufReader::new(file),
            pos: 0,
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ArchiveSrc for ArchiveFile {
    type Err = Error;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        // Seeking discards the BufReader's buffer, so only seek when the
        // read is not sequential
        if offset != self.pos {
            self.src
                .seek(SeekFrom::Start(offset))
                .map_err(wrap_io_err!(self.path, "Seek at read_at"))?;
            self.pos = offset;
        }
        let count = self
            .src
            .read(buf)
            .map_err(wrap_io_err!(self.path, "Read at read_at"))?;
        self.pos += count as u64;
        Ok(count)
    }

    fn size(&mut self) -> Result<u64, Error> {
        Ok(self.len)
    }
}

/// Open and fully read the archive at `path`. The file is closed before this
/// returns, whatever the outcome.
pub fn read_archive(path: impl AsRef<Path>, options: ReadOptions) -> Result<Archive, Error> {
    let path = path.as_ref();
    let src = ArchiveFile::open(path)?;
    ArchiveReader::new(src, options).unpack().map_err(|err| {
        debug!("failed to read {}: {}", path.display(), err);
        err
    })
}
