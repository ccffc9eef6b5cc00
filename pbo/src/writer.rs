use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, trace, warn};
use pbo_core::{Checksum, Entry, Header, Properties, DIGEST_SIZE, PACKING_BUFFER_SIZE, RECORD_MIN_SIZE};

use crate::{wrap_io_err, Error, SourceEntry};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CreateOptions {
    /// Replace an existing file at the destination
    pub overwrite: bool,
    /// Accepted for symmetry with reading; the trailer is always written
    pub signed: bool,
}

impl Default for CreateOptions {
    fn default() -> CreateOptions {
        CreateOptions {
            overwrite: true,
            signed: false,
        }
    }
}

/// Feeds everything written through it into a [`Checksum`].
struct HashingWriter<W> {
    inner: W,
    checksum: Checksum,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> HashingWriter<W> {
        HashingWriter {
            inner,
            checksum: Checksum::new(),
        }
    }

    fn write_checked(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)?;
        self.checksum.update(bytes);
        Ok(())
    }

    /// Append the digest of everything written so far, unhashed.
    fn finish(mut self) -> io::Result<[u8; DIGEST_SIZE]> {
        trace!("digest over {} bytes", self.checksum.fed());
        let digest = self.checksum.finalize();
        self.inner.write_all(&digest)?;
        self.inner.flush()?;
        Ok(digest)
    }
}

/// Collects sources and writes them out as one archive.
#[derive(Debug)]
pub struct ArchiveWriter {
    path: PathBuf,
    options: CreateOptions,
    header: Header,
    entries: Vec<SourceEntry>,
}

impl ArchiveWriter {
    /// The header is seeded with `prefix` and `product` set to the file stem
    /// of `path`, and `version` set to the current time in milliseconds.
    pub fn new(path: impl AsRef<Path>, options: CreateOptions) -> ArchiveWriter {
        let path = path.as_ref().to_path_buf();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();
        let version = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|since| since.as_millis())
            .unwrap_or(0);

        ArchiveWriter {
            path,
            options,
            header: Header::new(Properties::seeded(stem.clone(), stem, version.to_string())),
            entries: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Add a file or directory, stored under its own file name.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<&mut ArchiveWriter, Error> {
        let entry = SourceEntry::from_path(path)?;
        debug!("queued {} as {:?}", entry.source().display(), entry.kind());
        Ok(self.add_entry(entry))
    }

    pub fn add_entry(&mut self, entry: SourceEntry) -> &mut ArchiveWriter {
        self.entries.push(entry);
        self
    }

    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    /// Write the archive and return its digest. A partially written file is
    /// removed when packing fails.
    pub fn pack(self) -> Result<[u8; DIGEST_SIZE], Error> {
        if self.options.overwrite {
            match fs::remove_file(&self.path) {
                Ok(()) => debug!("replacing {}", self.path.display()),
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(Error::Io {
                        source: err,
                        path: Some(self.path.clone()),
                        context: "Removing existing archive",
                    })
                }
            }
        }

        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::AlreadyExists => Error::WriteCollision(self.path.clone()),
                _ => Error::Io {
                    source,
                    path: Some(self.path.clone()),
                    context: "Creating archive",
                },
            })?;

        let mut out = HashingWriter::new(BufWriter::new(file));
        let result = self.write_sections(&mut out).and_then(|count| {
            let digest = out
                .finish()
                .map_err(wrap_io_err!(self.path, "Writing signature"))?;
            Ok((count, digest))
        });

        match result {
            Ok((count, digest)) => {
                info!("packed {} files into {}", count, self.path.display());
                Ok(digest)
            }
            Err(err) => {
                // The writer has been dropped, closing the file
                if let Err(rm) = fs::remove_file(&self.path) {
                    warn!("failed to remove partial archive {}: {}", self.path.display(), rm);
                }
                Err(err)
            }
        }
    }

    /// Header section, payload section and the zero byte leading the trailer.
    /// Returns the number of files stored.
    fn write_sections(&self, out: &mut HashingWriter<BufWriter<File>>) -> Result<usize, Error> {
        let files = self.write_headers(out)?;
        out.write_checked(&[0; RECORD_MIN_SIZE])
            .map_err(wrap_io_err!(self.path, "Writing terminator"))?;

        let mut buf = vec![0; PACKING_BUFFER_SIZE];
        for entry in files.iter() {
            debug!("streaming {}", entry.source().display());
            entry.stream_payload(&mut buf, |chunk| out.write_checked(chunk))?;
        }

        out.write_checked(&[0])
            .map_err(wrap_io_err!(self.path, "Writing signature"))?;
        Ok(files.len())
    }

    /// Write every header record. Directories are expanded as they are
    /// reached, depth first with children in name order. Returns the files
    /// in the order their records were written.
    fn write_headers<W: Write>(&self, out: &mut HashingWriter<W>) -> Result<Vec<SourceEntry>, Error> {
        let header = Entry::from(self.header.clone()).header_record()?;
        out.write_checked(&header)
            .map_err(wrap_io_err!(self.path, "Writing header"))?;

        // The destination already exists here, so it resolves
        let destination = fs::canonicalize(&self.path)
            .map_err(wrap_io_err!(self.path, "Resolving archive path"))?;

        let mut files = Vec::new();
        let mut pending: Vec<SourceEntry> = self.entries.iter().rev().cloned().collect();
        while let Some(entry) = pending.pop() {
            if entry.is_dir() {
                pending.extend(entry.children()?.into_iter().rev());
                continue;
            }
            if fs::canonicalize(entry.source()).ok().as_ref() == Some(&destination) {
                debug!("skipping the archive being written: {}", entry.source().display());
                continue;
            }

            let mut record = Vec::with_capacity(RECORD_MIN_SIZE + entry.target().len());
            entry.record().encode_into(&mut record)?;
            out.write_checked(&record)
                .map_err(wrap_io_err!(self.path, "Writing record"))?;
            trace!("record: {}", entry.record());
            files.push(entry);
        }
        Ok(files)
    }
}
