#![no_std]
extern crate alloc;

use core::mem;

pub use crate::checksum::Checksum;
pub use crate::entry::{Entry, FileEntry, Record, RecordFields};
pub use crate::error::Error;
pub use crate::header::{Header, Properties};
pub use crate::method::PackingMethod;
pub use crate::reader::{Archive, ArchiveReader, ReadOptions, ReadState, SignatureStatus};
pub use crate::src::ArchiveSrc;

mod checksum;
pub mod cursor;
mod entry;
mod error;
mod header;
mod method;
mod reader;
mod src;


pub const RECORD_FIELDS_SIZE: usize = mem::size_of::<RecordFields>();
/// Smallest possible header record: empty path plus the fixed fields.
/// The header section is closed by this many zero bytes.
pub const RECORD_MIN_SIZE: usize = RECORD_FIELDS_SIZE + 1;
/// Chunk size used when streaming payloads
pub const PACKING_BUFFER_SIZE: usize = 4096;
pub const DIGEST_SIZE: usize = 20;
/// Zero byte plus digest
pub const SIGNATURE_SIZE: usize = DIGEST_SIZE + 1;
pub const SCAN_INITIAL: usize = 64;
/// Longest string field accepted while scanning for a terminator
pub const SCAN_LIMIT: usize = 64 * 1024;

pub const NULL_TERM: &[u8] = &[0];
pub const PROPERTIES_TERM: &[u8] = &[0, 0];

#[cfg(test)]
mod tests {
    use core::mem;

    use crate::{RecordFields, RECORD_FIELDS_SIZE, RECORD_MIN_SIZE, SIGNATURE_SIZE};

    #[test]
    fn record_sizes() {
        assert_eq!(mem::size_of::<RecordFields>(), 20);
        assert_eq!(RECORD_FIELDS_SIZE, 20);
        assert_eq!(RECORD_MIN_SIZE, 21);
        assert_eq!(SIGNATURE_SIZE, 21);
    }
}
