use primitive_types::{U256 as PrimitiveU256, U512 as PrimitiveU512};

pub type U256 = PrimitiveU256;
pub type U512 = PrimitiveU512;

pub trait UintExt: Sized {
    /// Interprets up to 32 big-endian bytes, right-aligned.
    fn from_be_slice(bytes: &[u8]) -> Self;
    fn to_be_bytes32(&self) -> [u8; 32];
    /// Minimal big-endian form; zero is the empty vector.
    fn to_be_bytes_trimmed(&self) -> Vec<u8>;
    /// Number of significant bytes (0 for zero).
    fn byte_len(&self) -> usize;
    /// `usize` value, or `None` if it does not fit.
    fn to_usize(&self) -> Option<usize>;
}

impl UintExt for U256 {
    fn from_be_slice(bytes: &[u8]) -> Self {
        let len = bytes.len().min(32);
        let mut array = [0u8; 32];
        array[32 - len..].copy_from_slice(&bytes[bytes.len() - len..]);
        U256::from_big_endian(&array)
    }

    fn to_be_bytes32(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        self.to_big_endian(&mut bytes);
        bytes
    }

    fn to_be_bytes_trimmed(&self) -> Vec<u8> {
        let bytes = self.to_be_bytes32();
        let first_non_zero = bytes.iter().position(|&b| b != 0).unwrap_or(32);
        bytes[first_non_zero..].to_vec()
    }

    fn byte_len(&self) -> usize {
        (self.bits() + 7) / 8
    }

    fn to_usize(&self) -> Option<usize> {
        if self.bits() > usize::BITS as usize {
            None
        } else {
            Some(self.low_u64() as usize)
        }
    }
}
