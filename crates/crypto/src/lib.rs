use ethereum_types::H256;
use sha3::{Digest, Keccak256};
use thiserror::Error;

pub mod secp256k1_crypto;
pub use secp256k1_crypto::*;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Invalid private key")]
    InvalidPrivateKey,

    #[error("Secp256k1 error: {0}")]
    Secp256k1(#[from] secp256k1::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Keccak-256 of the input.
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}

/// Keccak-256 of the concatenation of the given slices.
pub fn keccak256_concat(data: &[&[u8]]) -> H256 {
    let mut hasher = Keccak256::new();
    for slice in data {
        hasher.update(slice);
    }
    H256::from_slice(&hasher.finalize())
}

/// Hash of empty code, the code hash of every account without code.
pub fn empty_code_hash() -> H256 {
    keccak256(&[])
}
