use ethereum_crypto::{keccak256, recover_address, sign, SecretKey, Signature};
use ethereum_rlp::{Decode, Decoder, Encode, Encoder, RlpError};
use ethereum_types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid v value: {0}")]
    InvalidV(u64),
    #[error("Crypto error: {0}")]
    Crypto(#[from] ethereum_crypto::CryptoError),
    #[error("RLP error: {0}")]
    Rlp(#[from] RlpError),
}

pub type Result<T> = std::result::Result<T, TransactionError>;

/// Signed legacy transaction. `to == None` creates a contract.
///
/// `v` is 27/28 for pre-replay-protection signatures and
/// `chain_id * 2 + 35/36` for EIP-155 ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub nonce: U256,
    pub gas_price: U256,
    pub gas_limit: U256,
    pub to: Option<Address>,
    pub value: U256,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub v: u64,
    #[serde(default)]
    pub r: U256,
    #[serde(default)]
    pub s: U256,
}

impl Transaction {
    pub fn is_create(&self) -> bool {
        self.to.is_none()
    }

    pub fn hash(&self) -> H256 {
        keccak256(&ethereum_rlp::encode(self))
    }

    /// Chain id carried in `v`, if the signature is replay protected.
    pub fn chain_id(&self) -> Option<u64> {
        if self.v >= 35 {
            Some((self.v - 35) / 2)
        } else {
            None
        }
    }

    /// Digest the sender signs. With a chain id the payload gains
    /// `[chain_id, 0, 0]`.
    pub fn signing_hash(&self, chain_id: Option<u64>) -> H256 {
        let mut encoder = Encoder::new();
        encoder.encode_list_with(|list| {
            self.encode_payload(list);
            if let Some(chain_id) = chain_id {
                chain_id.encode(list);
                0u64.encode(list);
                0u64.encode(list);
            }
        });
        keccak256(&encoder.finish())
    }

    /// Signs the transaction in place, replacing any previous signature.
    pub fn sign(mut self, secret: &SecretKey, chain_id: Option<u64>) -> Result<Self> {
        let signature = sign(self.signing_hash(chain_id).as_fixed_bytes(), secret)?;
        self.r = signature.r;
        self.s = signature.s;
        self.v = match chain_id {
            Some(id) => id * 2 + 35 + signature.v as u64,
            None => 27 + signature.v as u64,
        };
        Ok(self)
    }

    /// Signature with `v` reduced to a recovery id.
    pub fn signature(&self) -> Result<Signature> {
        let recovery_id = match self.v {
            27 | 28 => self.v - 27,
            v if v >= 35 => (v - 35) % 2,
            v => return Err(TransactionError::InvalidV(v)),
        };
        Ok(Signature::new(self.r, self.s, recovery_id as u8))
    }

    pub fn sender(&self) -> Result<Address> {
        let signature = self.signature()?;
        let digest = self.signing_hash(self.chain_id());
        recover_address(digest.as_fixed_bytes(), &signature).map_err(|_| TransactionError::InvalidSignature)
    }

    fn encode_payload(&self, list: &mut Encoder) {
        self.nonce.encode(list);
        self.gas_price.encode(list);
        self.gas_limit.encode(list);
        self.to.encode(list);
        self.value.encode(list);
        self.data.encode(list);
    }
}

impl Encode for Transaction {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_list_with(|list| {
            self.encode_payload(list);
            self.v.encode(list);
            self.r.encode(list);
            self.s.encode(list);
        });
    }
}

impl Decode for Transaction {
    fn decode(decoder: &mut Decoder) -> std::result::Result<Self, RlpError> {
        decoder.decode_list_with(|list| {
            Ok(Transaction {
                nonce: U256::decode(list)?,
                gas_price: U256::decode(list)?,
                gas_limit: U256::decode(list)?,
                to: Option::<Address>::decode(list)?,
                value: U256::decode(list)?,
                data: Bytes::decode(list)?,
                v: u64::decode(list)?,
                r: U256::decode(list)?,
                s: U256::decode(list)?,
            })
        })
    }
}
