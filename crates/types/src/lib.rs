pub mod address;
pub mod bloom;
pub mod bytes;
pub mod hash;
pub mod uint;

pub use address::Address;
pub use bloom::Bloom;
pub use bytes::Bytes;
pub use hash::{HashExt, H160, H256};
pub use uint::{UintExt, U256, U512};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("Invalid hex string: {0}")]
    InvalidHex(String),

    #[error("Invalid length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid address checksum")]
    InvalidChecksum,

    #[error("Quantity does not fit in 256 bits: {0}")]
    QuantityOverflow(String),
}

pub type Result<T> = std::result::Result<T, TypesError>;

/// Decodes a hex string with an optional `0x` prefix. Odd-length input is
/// left-padded with a zero nibble.
pub fn decode_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let padded;
    let s = if s.len() % 2 == 1 {
        padded = format!("0{}", s);
        padded.as_str()
    } else {
        s
    };
    hex::decode(s).map_err(|_| TypesError::InvalidHex(s.to_string()))
}
