use core::convert::TryFrom;

use crate::Error;

/// Positional byte source an archive is read from.
pub trait ArchiveSrc {
    type Err: From<Error>;

    /// Read up to `buf.len()` bytes starting at `offset`. Returns `Ok(0)`
    /// once `offset` is at or past the end of the source.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Self::Err>;

    /// Total length of the source in bytes
    fn size(&mut self) -> Result<u64, Self::Err>;
}

impl<T: AsRef<[u8]>> ArchiveSrc for T {
    type Err = Error;

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let data = self.as_ref();
        let start = usize::try_from(offset)?;
        if start >= data.len() {
            return Ok(0);
        }
        let end = start
            .checked_add(buf.len())
            .ok_or(Error::Overflow)?
            .min(data.len());
        let count = end - start;
        buf[..count].copy_from_slice(&data[start..end]);
        Ok(count)
    }

    fn size(&mut self) -> Result<u64, Error> {
        Ok(u64::try_from(self.as_ref().len())?)
    }
}

#[cfg(test)]
mod tests {
    use super::ArchiveSrc;

    #[test]
    fn buffer_read_at_clamps() {
        let mut src = &b"abcdef"[..];
        let mut buf = [0; 4];
        assert_eq!(src.read_at(4, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"ef");
        assert_eq!(src.read_at(6, &mut buf).unwrap(), 0);
        assert_eq!(src.read_at(100, &mut buf).unwrap(), 0);
        assert_eq!(src.size().unwrap(), 6);
    }
}
