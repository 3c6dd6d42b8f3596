use crate::U256;
use primitive_types::{H160 as PrimitiveH160, H256 as PrimitiveH256};

pub type H160 = PrimitiveH160;
pub type H256 = PrimitiveH256;

/// Conversions between 32-byte hashes and machine words. Storage keys and
/// values live as `H256` in state and as `U256` on the stack.
pub trait HashExt {
    fn from_word(word: U256) -> Self;
    fn to_word(&self) -> U256;
}

impl HashExt for H256 {
    fn from_word(word: U256) -> Self {
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        H256::from(bytes)
    }

    fn to_word(&self) -> U256 {
        U256::from_big_endian(self.as_bytes())
    }
}
