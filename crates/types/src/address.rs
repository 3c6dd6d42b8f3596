use crate::{Result, TypesError, H160, H256, U256};
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::str::FromStr;

/// 20-byte account address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(H160);

impl Address {
    pub const ZERO: Address = Address(H160::zero());

    pub fn zero() -> Self {
        Self::ZERO
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != 20 {
            return Err(TypesError::InvalidLength {
                expected: 20,
                actual: slice.len(),
            });
        }
        Ok(Address(H160::from_slice(slice)))
    }

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Address(H160::from(bytes))
    }

    /// Address with `n` in its low-order bytes; the precompile addresses are
    /// `from_low_u64(1)` and up.
    pub fn from_low_u64(n: u64) -> Self {
        Address(H160::from_low_u64_be(n))
    }

    /// Takes the low 160 bits of a machine word.
    pub fn from_word(word: U256) -> Self {
        let mut bytes = [0u8; 32];
        word.to_big_endian(&mut bytes);
        Address(H160::from_slice(&bytes[12..]))
    }

    /// Zero-extends the address to a machine word.
    pub fn to_word(&self) -> U256 {
        U256::from_big_endian(self.0.as_bytes())
    }

    /// Takes the last 20 bytes of a hash (address derivation).
    pub fn from_hash(hash: &H256) -> Self {
        Address(H160::from_slice(&hash.as_bytes()[12..]))
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn to_bytes(&self) -> [u8; 20] {
        self.0.to_fixed_bytes()
    }

    pub fn checksum(&self) -> String {
        let address_hex = hex::encode(self.0.as_bytes());
        let hash = Keccak256::digest(address_hex.as_bytes());

        let mut checksum = String::with_capacity(42);
        checksum.push_str("0x");
        for (i, ch) in address_hex.chars().enumerate() {
            let nibble = if i % 2 == 0 {
                hash[i / 2] >> 4
            } else {
                hash[i / 2] & 0xf
            };
            if ch.is_ascii_alphabetic() && nibble >= 8 {
                checksum.push(ch.to_ascii_uppercase());
            } else {
                checksum.push(ch);
            }
        }
        checksum
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 40 {
            return Err(TypesError::InvalidLength {
                expected: 40,
                actual: digits.len(),
            });
        }

        let bytes = hex::decode(digits).map_err(|_| TypesError::InvalidHex(digits.to_string()))?;
        let addr = Address::from_slice(&bytes)?;

        // Mixed case means the caller supplied a checksum.
        let has_upper = digits.chars().any(|c| c.is_ascii_uppercase());
        let has_lower = digits.chars().any(|c| c.is_ascii_lowercase());
        if has_upper && has_lower && addr.checksum()[2..] != *digits {
            return Err(TypesError::InvalidChecksum);
        }

        Ok(addr)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.checksum())
    }
}

impl fmt::LowerHex for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0.as_bytes()))
    }
}

impl From<H160> for Address {
    fn from(hash: H160) -> Self {
        Address(hash)
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Address::from_bytes(bytes)
    }
}
