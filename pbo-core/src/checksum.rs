use sha1_smol::Sha1;

use crate::DIGEST_SIZE;

/// Streaming SHA-1 over every header and payload byte of an archive, in
/// the order they appear on disk.
pub struct Checksum {
    hasher: Sha1,
    fed: u64,
}

impl Checksum {
    pub fn new() -> Checksum {
        Checksum {
            hasher: Sha1::new(),
            fed: 0,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
        self.fed += bytes.len() as u64;
    }

    /// Number of bytes fed so far
    pub fn fed(&self) -> u64 {
        self.fed
    }

    /// Consumes the accumulator; nothing can be fed after the digest is taken.
    pub fn finalize(self) -> [u8; DIGEST_SIZE] {
        self.hasher.digest().bytes()
    }
}

impl Default for Checksum {
    fn default() -> Self {
        Checksum::new()
    }
}

impl core::fmt::Debug for Checksum {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Checksum").field("fed", &self.fed).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Checksum;

    #[test]
    fn chunking_does_not_change_digest() {
        let mut whole = Checksum::new();
        whole.update(b"header bytes and payload bytes");

        let mut split = Checksum::new();
        split.update(b"header bytes");
        split.update(b" and ");
        split.update(b"payload bytes");

        assert_eq!(split.fed(), whole.fed());
        assert_eq!(split.finalize(), whole.finalize());
    }

    #[test]
    fn known_digest() {
        let mut sum = Checksum::new();
        sum.update(b"abc");
        assert_eq!(
            sum.finalize(),
            [
                0xa9, 0x99, 0x3e, 0x36, 0x47, 0x06, 0x81, 0x6a, 0xba, 0x3e, 0x25, 0x71, 0x78, 0x50,
                0xc2, 0x6c, 0x9c, 0xd0, 0xd8, 0x9d,
            ]
        );
    }
}
