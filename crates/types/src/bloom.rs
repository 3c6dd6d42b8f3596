use crate::{Result, TypesError};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha3::{Digest, Keccak256};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

pub const BLOOM_BYTES: usize = 256;
const BLOOM_BITS: usize = BLOOM_BYTES * 8;

/// 2048-bit log bloom. Each accrued item sets three bits chosen from the
/// first six bytes of its Keccak-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bloom([u8; BLOOM_BYTES]);

impl Bloom {
    pub const ZERO: Bloom = Bloom([0u8; BLOOM_BYTES]);

    pub fn new() -> Self {
        Self::ZERO
    }

    pub fn from_slice(slice: &[u8]) -> Result<Self> {
        if slice.len() != BLOOM_BYTES {
            return Err(TypesError::InvalidLength {
                expected: BLOOM_BYTES,
                actual: slice.len(),
            });
        }
        let mut bloom = Self::new();
        bloom.0.copy_from_slice(slice);
        Ok(bloom)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Adds an item (a log address or topic) to the filter.
    pub fn accrue(&mut self, input: &[u8]) {
        for bit in Self::bits_for(input) {
            self.set(bit);
        }
    }

    /// True if every bit the item would set is already set.
    pub fn contains_input(&self, input: &[u8]) -> bool {
        Self::bits_for(input).iter().all(|&bit| self.is_set(bit))
    }

    pub fn contains(&self, other: &Bloom) -> bool {
        self.0
            .iter()
            .zip(other.0.iter())
            .all(|(mine, theirs)| mine & theirs == *theirs)
    }

    /// Bit indices count from the least significant bit of the last byte.
    pub fn set(&mut self, index: usize) {
        if index < BLOOM_BITS {
            self.0[BLOOM_BYTES - 1 - index / 8] |= 1 << (index % 8);
        }
    }

    pub fn is_set(&self, index: usize) -> bool {
        index < BLOOM_BITS && self.0[BLOOM_BYTES - 1 - index / 8] & (1 << (index % 8)) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }

    fn bits_for(input: &[u8]) -> [usize; 3] {
        let hash = Keccak256::digest(input);
        let mut bits = [0usize; 3];
        for (i, bit) in bits.iter_mut().enumerate() {
            *bit = ((hash[2 * i] as usize) << 8 | hash[2 * i + 1] as usize) & (BLOOM_BITS - 1);
        }
        bits
    }
}

impl Default for Bloom {
    fn default() -> Self {
        Self::new()
    }
}

impl BitOr for Bloom {
    type Output = Self;

    fn bitor(mut self, rhs: Self) -> Self::Output {
        self |= rhs;
        self
    }
}

impl BitOrAssign for Bloom {
    fn bitor_assign(&mut self, rhs: Self) {
        for (mine, theirs) in self.0.iter_mut().zip(rhs.0.iter()) {
            *mine |= theirs;
        }
    }
}

impl fmt::Debug for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bloom({:x})", self)
    }
}

impl fmt::LowerHex for Bloom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<[u8; BLOOM_BYTES]> for Bloom {
    fn from(bytes: [u8; BLOOM_BYTES]) -> Self {
        Bloom(bytes)
    }
}

impl Serialize for Bloom {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format!("{:x}", self))
    }
}

impl<'de> Deserialize<'de> for Bloom {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = crate::decode_hex(&s).map_err(serde::de::Error::custom)?;
        Bloom::from_slice(&bytes).map_err(serde::de::Error::custom)
    }
}
