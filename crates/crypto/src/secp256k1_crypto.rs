use crate::{CryptoError, Result};
use ethereum_types::{Address, U256};
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, Secp256k1,
};

pub use secp256k1::SecretKey;

/// Order of the secp256k1 group.
pub const SECP256K1_N: U256 = U256 {
    0: [
    0xbfd25e8cd0364141,
    0xbaaedce6af48a03b,
    0xfffffffffffffffe,
    0xffffffffffffffff,
],
};

/// `SECP256K1_N / 2`; signatures with `s` above it are malleable.
pub const SECP256K1_HALF_N: U256 = U256 {
    0: [
    0xdfe92f46681b20a0,
    0x5d576e7357a4501d,
    0xffffffffffffffff,
    0x7fffffffffffffff,
],
};

/// ECDSA signature; `v` is the recovery id (0 or 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub r: U256,
    pub s: U256,
    pub v: u8,
}

impl Signature {
    pub fn new(r: U256, s: U256, v: u8) -> Self {
        Signature { r, s, v }
    }

    /// `r` and `s` in `[1, n)` and `v` a valid recovery id.
    pub fn is_valid(&self) -> bool {
        self.v <= 1
            && !self.r.is_zero()
            && !self.s.is_zero()
            && self.r < SECP256K1_N
            && self.s < SECP256K1_N
    }

    pub fn is_low_s(&self) -> bool {
        self.s <= SECP256K1_HALF_N
    }

    fn to_recoverable(&self) -> Result<RecoverableSignature> {
        if !self.is_valid() {
            return Err(CryptoError::InvalidSignature);
        }
        let mut compact = [0u8; 64];
        self.r.to_big_endian(&mut compact[..32]);
        self.s.to_big_endian(&mut compact[32..]);
        let recovery_id =
            RecoveryId::from_i32(self.v as i32).map_err(|_| CryptoError::InvalidSignature)?;
        Ok(RecoverableSignature::from_compact(&compact, recovery_id)?)
    }
}

/// Signs a 32-byte digest.
pub fn sign(digest: &[u8; 32], secret: &SecretKey) -> Result<Signature> {
    let secp = Secp256k1::signing_only();
    let message = Message::from_slice(digest)?;
    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret)
        .serialize_compact();

    Ok(Signature {
        r: U256::from_big_endian(&compact[..32]),
        s: U256::from_big_endian(&compact[32..]),
        v: recovery_id.to_i32() as u8,
    })
}

pub fn recover_public_key(digest: &[u8; 32], signature: &Signature) -> Result<PublicKey> {
    let secp = Secp256k1::verification_only();
    let message = Message::from_slice(digest)?;
    Ok(secp.recover_ecdsa(&message, &signature.to_recoverable()?)?)
}

/// Recovers the signer's address from a digest and signature.
pub fn recover_address(digest: &[u8; 32], signature: &Signature) -> Result<Address> {
    let public_key = recover_public_key(digest, signature)?;
    Ok(public_key_to_address(&public_key))
}

pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    let uncompressed = public_key.serialize_uncompressed();
    // Drop the 0x04 tag and hash the 64-byte point.
    Address::from_hash(&crate::keccak256(&uncompressed[1..]))
}

pub fn secret_to_address(secret: &SecretKey) -> Address {
    let secp = Secp256k1::signing_only();
    public_key_to_address(&PublicKey::from_secret_key(&secp, secret))
}

pub fn secret_from_slice(bytes: &[u8]) -> Result<SecretKey> {
    SecretKey::from_slice(bytes).map_err(|_| CryptoError::InvalidPrivateKey)
}

pub fn generate_private_key() -> SecretKey {
    SecretKey::new(&mut rand::thread_rng())
}
