//! The record structs represent the on-disk header section of an archive
use alloc::vec::Vec;
use core::fmt::Display;
use core::mem;

use bytemuck::{Pod, Zeroable};

use crate::cursor::{read_exact, scan_until};
use crate::{
    ArchiveSrc, Error, Header, PackingMethod, Properties, NULL_TERM, RECORD_FIELDS_SIZE,
    SCAN_LIMIT,
};

/// Fixed-width part of a header record, following the NUL-terminated path.
/// Every field is stored little-endian.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(packed, C)]
pub struct RecordFields {
    pub packing_method: u32,
    pub original_size: u32,
    pub reserved: u32,
    pub timestamp: u32,
    pub data_size: u32,
}

impl RecordFields {
    /// Parse the fields from exactly [`RECORD_FIELDS_SIZE`] bytes
    pub fn from_bytes(data: &[u8]) -> Result<RecordFields, Error> {
        let fields: &RecordFields = bytemuck::try_from_bytes(data)?;
        Ok(RecordFields {
            packing_method: u32::from_le(fields.packing_method),
            original_size: u32::from_le(fields.original_size),
            reserved: u32::from_le(fields.reserved),
            timestamp: u32::from_le(fields.timestamp),
            data_size: u32::from_le(fields.data_size),
        })
    }

    pub fn encode_into(&self, out: &mut Vec<u8>) {
        let le = RecordFields {
            packing_method: self.packing_method.to_le(),
            original_size: self.original_size.to_le(),
            reserved: self.reserved.to_le(),
            timestamp: self.timestamp.to_le(),
            data_size: self.data_size.to_le(),
        };
        out.extend_from_slice(bytemuck::bytes_of(&le));
    }
}

/// Fields shared by every kind of entry.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Record {
    /// Archive-internal path without the terminating NUL, exactly as stored
    pub path: Vec<u8>,
    pub packing_method: PackingMethod,
    pub original_size: u32,
    /// Carried through unchanged, no defined meaning
    pub reserved: u32,
    /// Unix seconds
    pub timestamp: u32,
    /// Size of the payload as stored in the archive
    pub data_size: u32,
}

impl Record {
    /// True only for the terminator of the header section
    pub fn is_null(&self) -> bool {
        self.path.is_empty()
            && self.packing_method == PackingMethod::Null
            && self.original_size == 0
            && self.reserved == 0
            && self.timestamp == 0
            && self.data_size == 0
    }

    /// Number of payload bytes this record owns in the data section.
    ///
    /// Fails for the reserved transforms, whose stored size cannot be
    /// interpreted without a codec.
    pub fn size(&self) -> Result<u32, Error> {
        match self.packing_method {
            PackingMethod::Uncompressed => Ok(self.data_size),
            method @ (PackingMethod::Compressed | PackingMethod::Encrypted) => {
                Err(Error::UnsupportedPackingMethod(method))
            }
            PackingMethod::Version | PackingMethod::Null => Ok(0),
        }
    }

    /// Size of the payload before any transform
    pub fn original_size(&self) -> u32 {
        match self.packing_method {
            PackingMethod::Uncompressed | PackingMethod::Compressed => self.original_size,
            _ => 0,
        }
    }

    pub fn fields(&self) -> RecordFields {
        RecordFields {
            packing_method: self.packing_method.into(),
            original_size: self.original_size,
            reserved: self.reserved,
            timestamp: self.timestamp,
            data_size: self.data_size,
        }
    }

    /// Append `path\0` and the fixed fields.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> Result<(), Error> {
        if self.path.contains(&0) {
            return Err(Error::InteriorNul);
        }
        out.extend_from_slice(&self.path);
        out.push(0);
        self.fields().encode_into(out);
        Ok(())
    }

    /// Read one record at `offset`, returning it with the raw bytes consumed.
    ///
    /// An all-zero record decodes as the terminator whether its tag is
    /// `Uncompressed` or `Null`.
    pub fn read<S: ArchiveSrc>(src: &mut S, offset: u64) -> Result<(Record, Vec<u8>), S::Err> {
        let mut raw = scan_until(src, offset, NULL_TERM, SCAN_LIMIT)?;
        let path_len = raw.len() - 1;

        let fields_offset = offset
            .checked_add(raw.len() as u64)
            .ok_or(Error::Overflow)?;
        let mut fields = [0; RECORD_FIELDS_SIZE];
        read_exact(src, fields_offset, &mut fields)?;
        raw.extend_from_slice(&fields);

        let fields = RecordFields::from_bytes(&fields)?;
        let mut record = Record {
            path: raw[..path_len].to_vec(),
            packing_method: PackingMethod::try_from(fields.packing_method)?,
            original_size: fields.original_size,
            reserved: fields.reserved,
            timestamp: fields.timestamp,
            data_size: fields.data_size,
        };
        if record.packing_method == PackingMethod::Uncompressed
            && record.path.is_empty()
            && bytemuck::bytes_of(&fields).iter().all(|b| *b == 0)
        {
            record.packing_method = PackingMethod::Null;
        }
        Ok((record, raw))
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "path={:?} method={:?} original_size={} reserved={} timestamp={} data_size={}",
            alloc::string::String::from_utf8_lossy(&self.path),
            self.packing_method,
            self.original_size,
            self.reserved,
            self.timestamp,
            self.data_size,
        )
    }
}

/// A member of the archive whose payload lives in the data section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileEntry {
    pub(crate) record: Record,
    pub(crate) data_offset: Option<u64>,
    pub(crate) payload: Option<Vec<u8>>,
}

impl FileEntry {
    pub fn new(record: Record) -> FileEntry {
        FileEntry {
            record,
            data_offset: None,
            payload: None,
        }
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn path_bytes(&self) -> &[u8] {
        &self.record.path
    }

    /// Offset of the payload within the archive, once the data section has
    /// been read
    pub fn data_offset(&self) -> Option<u64> {
        self.data_offset
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_deref()
    }

    pub fn into_payload(self) -> Option<Vec<u8>> {
        self.payload
    }
}

/// One record of the header section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Entry {
    File(FileEntry),
    Version(Header),
    Null(Record),
}

impl Entry {
    pub fn record(&self) -> &Record {
        match self {
            Entry::File(file) => &file.record,
            Entry::Version(header) => &header.record,
            Entry::Null(record) => record,
        }
    }

    pub fn path_bytes(&self) -> &[u8] {
        &self.record().path
    }

    pub fn packing_method(&self) -> PackingMethod {
        self.record().packing_method
    }

    pub fn is_null(&self) -> bool {
        match self {
            Entry::Null(record) => record.is_null(),
            _ => false,
        }
    }

    pub fn size(&self) -> Result<u32, Error> {
        self.record().size()
    }

    pub fn as_file(&self) -> Option<&FileEntry> {
        match self {
            Entry::File(file) => Some(file),
            _ => None,
        }
    }

    pub fn as_header(&self) -> Option<&Header> {
        match self {
            Entry::Version(header) => Some(header),
            _ => None,
        }
    }

    /// Serialize this entry's header record, property block included for
    /// the header.
    pub fn header_record(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(mem::size_of::<RecordFields>() + self.path_bytes().len() + 1);
        self.record().encode_into(&mut out)?;
        if let Entry::Version(header) = self {
            header.properties.encode_into(&mut out)?;
        }
        Ok(out)
    }

    /// Parse one header record at `offset`. Returns the entry and every byte
    /// consumed, in order; the next record starts at `offset + raw.len()`.
    pub fn read<S: ArchiveSrc>(src: &mut S, offset: u64) -> Result<(Entry, Vec<u8>), S::Err> {
        let (record, mut raw) = Record::read(src, offset)?;
        let entry = match record.packing_method {
            PackingMethod::Version => {
                let block_offset = offset
                    .checked_add(raw.len() as u64)
                    .ok_or(Error::Overflow)?;
                let block = Properties::read_block(src, block_offset)?;
                let properties = Properties::decode(&block)?;
                raw.extend_from_slice(&block);
                Entry::Version(Header { record, properties })
            }
            PackingMethod::Null => Entry::Null(record),
            _ => Entry::File(FileEntry::new(record)),
        };
        Ok((entry, raw))
    }
}

impl From<Header> for Entry {
    fn from(header: Header) -> Entry {
        Entry::Version(header)
    }
}
