use alloc::format;
use alloc::string::ToString;
use core::error;
use core::fmt::{Display, Formatter, Result};

use bytemuck::PodCastError;

use crate::PackingMethod;

#[derive(Debug)]
pub enum Error {
    /// Source ended before a terminator or fixed-width field completed
    TruncatedRead,
    SizeMismatch { expected: u64, actual: u64 },
    UnsupportedPackingMethod(PackingMethod),
    InvalidPackingMethod(u32),
    /// Trailing region after the payload section is not exactly one zero
    /// byte plus a digest
    SignatureMissing { remaining: u64 },
    SignatureMismatch,
    /// A `Version` record that is not the first record or carries a path
    InvalidHeader,
    ScanLimit(usize),
    InvalidUtf8,
    InteriorNul,
    EmptyKey,
    Cast(PodCastError),
    Overflow,
    TryFromInt(core::num::TryFromIntError),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result {
        use Error::*;

        let msg = match self {
            TruncatedRead => "Truncated read".to_string(),
            SizeMismatch { expected, actual } => {
                format!("Size mismatch: expected {}, got {}", expected, actual)
            }
            UnsupportedPackingMethod(method) => {
                format!("Unsupported packing method: {:?}", method)
            }
            InvalidPackingMethod(tag) => format!("Invalid packing method: {:#010x}", tag),
            SignatureMissing { remaining } => {
                format!("Signature missing: {} trailing bytes", remaining)
            }
            SignatureMismatch => "Signature mismatch".to_string(),
            InvalidHeader => "Header record out of place".to_string(),
            ScanLimit(limit) => format!("Unterminated field longer than {} bytes", limit),
            InvalidUtf8 => "Invalid UTF-8".to_string(),
            InteriorNul => "String contains a NUL byte".to_string(),
            EmptyKey => "Empty property key".to_string(),
            Cast(err) => format!("Bytemuck: {:?}", err),
            Overflow => "Overflow".to_string(),
            TryFromInt(err) => format!("TryFromInt: {}", err),
        };
        write!(f, "{}", msg)
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::TryFromInt(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PodCastError> for Error {
    fn from(err: PodCastError) -> Error {
        Error::Cast(err)
    }
}

impl From<core::num::TryFromIntError> for Error {
    fn from(err: core::num::TryFromIntError) -> Error {
        Error::TryFromInt(err)
    }
}

impl From<core::str::Utf8Error> for Error {
    fn from(_: core::str::Utf8Error) -> Error {
        Error::InvalidUtf8
    }
}
