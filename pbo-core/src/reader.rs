use alloc::vec::Vec;

use log::{debug, trace, warn};

use crate::cursor::{copy_bounded, read_exact};
use crate::{
    ArchiveSrc, Checksum, Entry, Error, FileEntry, Header, PackingMethod, DIGEST_SIZE,
    PACKING_BUFFER_SIZE, SIGNATURE_SIZE,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadOptions {
    /// Treat a digest mismatch as fatal instead of a warning
    pub signed: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadState {
    ReadingHeaders,
    ReadingData,
    ReadingSignature,
    Done,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SignatureStatus {
    Verified,
    /// Only produced when the read was not `signed`
    Mismatch {
        expected: [u8; DIGEST_SIZE],
        actual: [u8; DIGEST_SIZE],
    },
}

impl SignatureStatus {
    pub fn is_verified(&self) -> bool {
        *self == SignatureStatus::Verified
    }
}

/// A fully read archive: every record in header order with payloads loaded.
#[derive(Clone, Debug)]
pub struct Archive {
    entries: Vec<Entry>,
    digest: [u8; DIGEST_SIZE],
    signature: SignatureStatus,
}

impl Archive {
    /// The first `Version` record, if any
    pub fn header(&self) -> Option<&Header> {
        self.entries.iter().find_map(Entry::as_header)
    }

    /// Every retained record in header order, the header included
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn files(&self) -> impl Iterator<Item = &FileEntry> {
        self.entries.iter().filter_map(Entry::as_file)
    }

    pub fn find(&self, path: &[u8]) -> Option<&FileEntry> {
        self.files().find(|file| file.path_bytes() == path)
    }

    /// Digest computed over the header and payload sections
    pub fn digest(&self) -> [u8; DIGEST_SIZE] {
        self.digest
    }

    pub fn signature(&self) -> SignatureStatus {
        self.signature
    }

    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

/// Reads one archive from `src` front to back.
///
/// The source and the checksum are owned by the reader for the whole
/// operation; the reader is consumed by [`ArchiveReader::unpack`].
pub struct ArchiveReader<S> {
    src: S,
    checksum: Checksum,
    cursor: u64,
    state: ReadState,
    options: ReadOptions,
    entries: Vec<Entry>,
}

impl<S: ArchiveSrc> ArchiveReader<S> {
    pub fn new(src: S, options: ReadOptions) -> ArchiveReader<S> {
        ArchiveReader {
            src,
            checksum: Checksum::new(),
            cursor: 0,
            state: ReadState::ReadingHeaders,
            options,
            entries: Vec::new(),
        }
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Run every phase. On failure nothing read so far is returned and the
    /// source is dropped.
    pub fn unpack(mut self) -> Result<Archive, S::Err> {
        match self.run() {
            Ok(archive) => Ok(archive),
            Err(err) => {
                debug!("archive rejected in {:?} at offset {}", self.state, self.cursor);
                self.state = ReadState::Failed;
                Err(err)
            }
        }
    }

    fn run(&mut self) -> Result<Archive, S::Err> {
        self.read_headers()?;
        self.transition(ReadState::ReadingData);
        self.read_data()?;
        self.transition(ReadState::ReadingSignature);
        let (digest, signature) = self.read_signature()?;
        self.transition(ReadState::Done);

        Ok(Archive {
            entries: core::mem::take(&mut self.entries),
            digest,
            signature,
        })
    }

    fn transition(&mut self, next: ReadState) {
        debug!("{:?} -> {:?} at offset {}", self.state, next, self.cursor);
        self.state = next;
    }

    fn read_headers(&mut self) -> Result<(), S::Err> {
        loop {
            let (entry, raw) = Entry::read(&mut self.src, self.cursor)?;
            self.checksum.update(&raw);
            self.cursor = self
                .cursor
                .checked_add(raw.len() as u64)
                .ok_or(Error::Overflow)?;

            if entry.is_null() {
                return Ok(());
            }
            if let Entry::Version(header) = &entry {
                // Only the first record may be the header, and it has no path
                if !self.entries.is_empty() || !header.record().path.is_empty() {
                    return Err(Error::InvalidHeader.into());
                }
            }
            trace!("record: {}", entry.record());
            self.entries.push(entry);
        }
    }

    fn read_data(&mut self) -> Result<(), S::Err> {
        let len = self.src.size()?;
        let mut buf = [0; PACKING_BUFFER_SIZE];

        for entry in self.entries.iter_mut() {
            let file = match entry {
                Entry::Version(_) | Entry::Null(_) => continue,
                Entry::File(file) => file,
            };
            match file.record.packing_method {
                PackingMethod::Uncompressed => (),
                method => return Err(Error::UnsupportedPackingMethod(method).into()),
            }

            let size = u64::from(file.record.size()?);
            let end = self.cursor.checked_add(size).ok_or(Error::Overflow)?;
            if end > len {
                return Err(Error::TruncatedRead.into());
            }

            let checksum = &mut self.checksum;
            let mut payload = Vec::with_capacity(size as usize);
            let copied = copy_bounded(&mut self.src, self.cursor, size, &mut buf, |chunk| {
                checksum.update(chunk);
                payload.extend_from_slice(chunk);
                Ok(())
            })?;
            if copied != size {
                return Err(Error::SizeMismatch {
                    expected: size,
                    actual: copied,
                }
                .into());
            }

            file.data_offset = Some(self.cursor);
            file.payload = Some(payload);
            self.cursor = end;
        }
        Ok(())
    }

    fn read_signature(&mut self) -> Result<([u8; DIGEST_SIZE], SignatureStatus), S::Err> {
        let len = self.src.size()?;
        let remaining = len.saturating_sub(self.cursor);
        if remaining != SIGNATURE_SIZE as u64 {
            return Err(Error::SignatureMissing { remaining }.into());
        }

        let mut trailer = [0; SIGNATURE_SIZE];
        read_exact(&mut self.src, self.cursor, &mut trailer)?;
        if trailer[0] != 0 {
            return Err(Error::SignatureMissing { remaining }.into());
        }
        self.checksum.update(&trailer[..1]);
        self.cursor += SIGNATURE_SIZE as u64;

        let mut expected = [0; DIGEST_SIZE];
        expected.copy_from_slice(&trailer[1..]);
        let fed = self.checksum.fed();
        let actual = core::mem::take(&mut self.checksum).finalize();
        trace!("digest over {} bytes", fed);

        if actual == expected {
            return Ok((actual, SignatureStatus::Verified));
        }
        if self.options.signed {
            return Err(Error::SignatureMismatch.into());
        }
        warn!("archive signature does not match its contents");
        Ok((actual, SignatureStatus::Mismatch { expected, actual }))
    }
}

impl<S> core::fmt::Debug for ArchiveReader<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("cursor", &self.cursor)
            .field("state", &self.state)
            .field("options", &self.options)
            .field("entries", &self.entries.len())
            .finish()
    }
}
