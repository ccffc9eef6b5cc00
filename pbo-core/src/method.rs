use crate::Error;

/// Tag stored in every record describing how its payload is encoded.
///
/// The discriminants are the on-disk magic values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PackingMethod {
    Uncompressed = 0x0000_0000,
    /// `Cprs`, no codec is implemented
    Compressed = 0x4370_7273,
    /// `Vers`, marks the archive header
    Version = 0x5665_7273,
    /// `Encr`, no codec is implemented
    Encrypted = 0x456e_6372,
    /// Terminator sentinel
    Null = 0xffff_ffff,
}

impl PackingMethod {
    /// Whether this tag names a payload transform that has no codec.
    pub fn is_reserved(&self) -> bool {
        matches!(self, PackingMethod::Compressed | PackingMethod::Encrypted)
    }

    /// Whether records with this tag own bytes in the payload section.
    pub fn has_payload(&self) -> bool {
        !matches!(self, PackingMethod::Version | PackingMethod::Null)
    }
}

impl Default for PackingMethod {
    fn default() -> Self {
        PackingMethod::Null
    }
}

impl TryFrom<u32> for PackingMethod {
    type Error = Error;

    fn try_from(value: u32) -> Result<Self, Error> {
        match value {
            0x0000_0000 => Ok(PackingMethod::Uncompressed),
            0x4370_7273 => Ok(PackingMethod::Compressed),
            0x5665_7273 => Ok(PackingMethod::Version),
            0x456e_6372 => Ok(PackingMethod::Encrypted),
            0xffff_ffff => Ok(PackingMethod::Null),
            v => Err(Error::InvalidPackingMethod(v)),
        }
    }
}

impl From<PackingMethod> for u32 {
    fn from(method: PackingMethod) -> u32 {
        method as u32
    }
}

#[cfg(test)]
mod tests {
    use super::PackingMethod;
    use crate::Error;

    #[test]
    fn magic_values() {
        assert_eq!(u32::from(PackingMethod::Compressed).to_be_bytes(), *b"Cprs");
        assert_eq!(u32::from(PackingMethod::Version).to_be_bytes(), *b"Vers");
        assert_eq!(u32::from(PackingMethod::Encrypted).to_be_bytes(), *b"Encr");
    }

    #[test]
    fn unknown_tag_is_rejected() {
        match PackingMethod::try_from(0x1234) {
            Err(Error::InvalidPackingMethod(0x1234)) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn payload_ownership() {
        assert!(PackingMethod::Uncompressed.has_payload());
        assert!(PackingMethod::Compressed.has_payload());
        assert!(!PackingMethod::Version.has_payload());
        assert!(!PackingMethod::Null.has_payload());
        assert!(PackingMethod::Encrypted.is_reserved());
        assert!(!PackingMethod::Uncompressed.is_reserved());
    }
}
