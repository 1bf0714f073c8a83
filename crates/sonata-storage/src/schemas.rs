//! Binary schema constants and low-level helpers shared by the `SONH`
//! container format.

use crate::error::{Result, SonataError};

/// Magic numbers for binary formats owned by this crate.
pub mod magic {
    /// `SONH` ("SONATA Hierarchical") container magic number.
    pub const SONH: [u8; 4] = *b"SONH";
}

/// Current `SONH` format version.
pub const SONH_VERSION: u32 = 1;

/// Validate a 4-byte magic number against the expected value.
pub fn validate_magic(found: [u8; 4], expected: [u8; 4]) -> Result<()> {
    if found != expected {
        return Err(SonataError::schema(format!(
            "invalid magic number: expected {expected:?}, found {found:?}"
        )));
    }
    Ok(())
}

/// Compute a CRC32 checksum over a byte buffer.
pub fn calculate_checksum(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Validate a CRC32 checksum.
pub fn validate_checksum(data: &[u8], expected: u32) -> Result<()> {
    let computed = calculate_checksum(data);
    if computed != expected {
        return Err(SonataError::schema(format!(
            "checksum mismatch: expected {expected:08x}, computed {computed:08x}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magic_round_trip() {
        assert!(validate_magic(magic::SONH, magic::SONH).is_ok());
        assert!(validate_magic(*b"NOPE", magic::SONH).is_err());
    }

    #[test]
    fn checksum_round_trip() {
        let data = b"sonata";
        let sum = calculate_checksum(data);
        assert!(validate_checksum(data, sum).is_ok());
        assert!(validate_checksum(data, sum.wrapping_add(1)).is_err());
    }
}
