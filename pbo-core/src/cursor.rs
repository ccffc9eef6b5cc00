//! Primitive reads over an [`ArchiveSrc`]. None of these keep state beyond
//! the offset they are handed.
use alloc::vec::Vec;

use crate::{ArchiveSrc, Error, SCAN_INITIAL};

pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, Error> {
    let bytes = buf
        .get(offset..offset + 4)
        .ok_or(Error::TruncatedRead)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

pub fn write_u32_le(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

/// Fill `buf` entirely from `offset`, failing with `TruncatedRead` if the
/// source ends first.
pub fn read_exact<S: ArchiveSrc>(src: &mut S, offset: u64, buf: &mut [u8]) -> Result<(), S::Err> {
    let mut filled = 0;
    while filled < buf.len() {
        let at = offset
            .checked_add(filled as u64)
            .ok_or(Error::Overflow)?;
        let count = src.read_at(at, &mut buf[filled..])?;
        if count == 0 {
            return Err(Error::TruncatedRead.into());
        }
        filled += count;
    }
    Ok(())
}

/// Read one byte at a time from `start` until the accumulated bytes end
/// with `terminator`. The returned buffer includes the terminator.
///
/// The buffer starts at [`SCAN_INITIAL`] bytes and doubles as needed; a
/// field that reaches `limit` bytes without terminating is rejected.
pub fn scan_until<S: ArchiveSrc>(
    src: &mut S,
    start: u64,
    terminator: &[u8],
    limit: usize,
) -> Result<Vec<u8>, S::Err> {
    let mut buf = Vec::with_capacity(SCAN_INITIAL.min(limit));
    let mut byte = [0; 1];
    loop {
        if buf.len() >= limit {
            return Err(Error::ScanLimit(limit).into());
        }
        if buf.len() == buf.capacity() {
            buf.reserve(buf.len());
        }
        let at = start
            .checked_add(buf.len() as u64)
            .ok_or(Error::Overflow)?;
        if src.read_at(at, &mut byte)? == 0 {
            return Err(Error::TruncatedRead.into());
        }
        buf.push(byte[0]);
        if buf.ends_with(terminator) {
            return Ok(buf);
        }
    }
}

/// Copy `total` bytes starting at `offset` in chunks of at most
/// `buf.len()`, handing each chunk to `observe` in order.
pub fn copy_bounded<S, F>(
    src: &mut S,
    offset: u64,
    total: u64,
    buf: &mut [u8],
    mut observe: F,
) -> Result<u64, S::Err>
where
    S: ArchiveSrc,
    F: FnMut(&[u8]) -> Result<(), S::Err>,
{
    let mut copied = 0;
    while copied < total {
        let count = (total - copied).min(buf.len() as u64) as usize;
        let at = offset.checked_add(copied).ok_or(Error::Overflow)?;
        read_exact(src, at, &mut buf[..count])?;
        observe(&buf[..count])?;
        copied += count as u64;
    }
    Ok(copied)
}
