use ethereum_crypto::{recover_address, Signature};
use ethereum_types::{Address, Bytes, U256};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Precompiled contract addresses
pub const ECRECOVER_ADDRESS: u64 = 0x01;
pub const SHA256_ADDRESS: u64 = 0x02;
pub const RIPEMD160_ADDRESS: u64 = 0x03;
pub const IDENTITY_ADDRESS: u64 = 0x04;

/// A built-in function reachable at a reserved address. Execution is pure
/// and total: input it cannot interpret yields an empty output.
pub trait PrecompiledContract: Send + Sync {
    fn required_gas(&self, input: &[u8]) -> u64;
    fn execute(&self, input: &[u8]) -> Bytes;
}

fn word_count(len: usize) -> u64 {
    len.div_ceil(32) as u64
}

/// `base + word * ceil(len / 32)` pricing.
#[derive(Debug, Clone, Copy)]
pub struct Linear {
    pub base: u64,
    pub word: u64,
}

impl Linear {
    pub fn cost(&self, input: &[u8]) -> u64 {
        self.base.saturating_add(self.word.saturating_mul(word_count(input.len())))
    }
}

/// ECRECOVER - public key recovery from `hash, v, r, s`
pub struct EcRecover;

impl PrecompiledContract for EcRecover {
    fn required_gas(&self, _input: &[u8]) -> u64 {
        3000
    }

    fn execute(&self, input: &[u8]) -> Bytes {
        let mut padded = [0u8; 128];
        let len = input.len().min(128);
        padded[..len].copy_from_slice(&input[..len]);

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&padded[..32]);
        let v = U256::from_big_endian(&padded[32..64]);
        let r = U256::from_big_endian(&padded[64..96]);
        let s = U256::from_big_endian(&padded[96..128]);

        let recovery_id = if v == U256::from(27) {
            0
        } else if v == U256::from(28) {
            1
        } else {
            return Bytes::new();
        };

        match recover_address(&hash, &Signature::new(r, s, recovery_id)) {
            Ok(address) => {
                let mut output = vec![0u8; 12];
                output.extend_from_slice(address.as_bytes());
                Bytes::from_vec(output)
            }
            Err(_) => Bytes::new(),
        }
    }
}

/// SHA256 hash function
pub struct Sha256Hash;

impl PrecompiledContract for Sha256Hash {
    fn required_gas(&self, input: &[u8]) -> u64 {
        Linear { base: 60, word: 12 }.cost(input)
    }

    fn execute(&self, input: &[u8]) -> Bytes {
        Bytes::from_vec(Sha256::digest(input).to_vec())
    }
}

/// RIPEMD160 hash function
pub struct Ripemd160Hash;

impl PrecompiledContract for Ripemd160Hash {
    fn required_gas(&self, input: &[u8]) -> u64 {
        Linear { base: 600, word: 120 }.cost(input)
    }

    fn execute(&self, input: &[u8]) -> Bytes {
        // Left-padded to a full word.
        let mut output = vec![0u8; 12];
        output.extend_from_slice(&Ripemd160::digest(input));
        Bytes::from_vec(output)
    }
}

/// Identity function - returns input as output
pub struct Identity;

impl PrecompiledContract for Identity {
    fn required_gas(&self, input: &[u8]) -> u64 {
        Linear { base: 15, word: 3 }.cost(input)
    }

    fn execute(&self, input: &[u8]) -> Bytes {
        Bytes::from_slice(input)
    }
}

/// Built-ins keyed by address.
pub struct PrecompiledRegistry {
    contracts: BTreeMap<Address, Box<dyn PrecompiledContract>>,
}

impl PrecompiledRegistry {
    pub fn empty() -> Self {
        PrecompiledRegistry {
            contracts: BTreeMap::new(),
        }
    }

    /// The four original built-ins at addresses 1 through 4.
    pub fn frontier() -> Self {
        let mut registry = Self::empty();
        registry.register(Address::from_low_u64(ECRECOVER_ADDRESS), Box::new(EcRecover));
        registry.register(Address::from_low_u64(SHA256_ADDRESS), Box::new(Sha256Hash));
        registry.register(Address::from_low_u64(RIPEMD160_ADDRESS), Box::new(Ripemd160Hash));
        registry.register(Address::from_low_u64(IDENTITY_ADDRESS), Box::new(Identity));
        registry
    }

    pub fn register(&mut self, address: Address, contract: Box<dyn PrecompiledContract>) {
        self.contracts.insert(address, contract);
    }

    pub fn get(&self, address: &Address) -> Option<&dyn PrecompiledContract> {
        self.contracts.get(address).map(|c| c.as_ref())
    }

    pub fn is_precompiled(&self, address: &Address) -> bool {
        self.contracts.contains_key(address)
    }

    pub fn addresses(&self) -> impl Iterator<Item = &Address> {
        self.contracts.keys()
    }
}

impl Default for PrecompiledRegistry {
    fn default() -> Self {
        Self::frontier()
    }
}

impl std::fmt::Debug for PrecompiledRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.contracts.keys()).finish()
    }
}
