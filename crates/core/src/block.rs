use crate::Transaction;
use ethereum_crypto::keccak256;
use ethereum_rlp::{Decode, Decoder, Encode, Encoder, RlpError};
use ethereum_types::{Address, Bloom, Bytes, H256, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Header {
    pub parent_hash: H256,
    pub ommers_hash: H256,
    pub beneficiary: Address,
    pub state_root: H256,
    pub transactions_root: H256,
    pub receipts_root: H256,
    pub logs_bloom: Bloom,
    pub difficulty: U256,
    pub number: u64,
    pub gas_limit: u64,
    pub gas_used: u64,
    pub timestamp: u64,
    pub extra_data: Bytes,
    pub mix_hash: H256,
    pub nonce: u64,
}

impl Default for Header {
    fn default() -> Self {
        Self {
            parent_hash: H256::zero(),
            ommers_hash: H256::zero(),
            beneficiary: Address::ZERO,
            state_root: H256::zero(),
            transactions_root: H256::zero(),
            receipts_root: H256::zero(),
            logs_bloom: Bloom::ZERO,
            difficulty: U256::zero(),
            number: 0,
            gas_limit: 0,
            gas_used: 0,
            timestamp: 0,
            extra_data: Bytes::new(),
            mix_hash: H256::zero(),
            nonce: 0,
        }
    }
}

impl Header {
    pub fn hash(&self) -> H256 {
        keccak256(&ethereum_rlp::encode(self))
    }

    pub fn is_genesis(&self) -> bool {
        self.number == 0 && self.parent_hash.is_zero()
    }
}

impl Encode for Header {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_list_with(|list| {
            self.parent_hash.encode(list);
            self.ommers_hash.encode(list);
            self.beneficiary.encode(list);
            self.state_root.encode(list);
            self.transactions_root.encode(list);
            self.receipts_root.encode(list);
            self.logs_bloom.encode(list);
            self.difficulty.encode(list);
            self.number.encode(list);
            self.gas_limit.encode(list);
            self.gas_used.encode(list);
            self.timestamp.encode(list);
            self.extra_data.encode(list);
            self.mix_hash.encode(list);
            // The seal nonce is a fixed 8-byte string, not an integer.
            list.encode_bytes(&self.nonce.to_be_bytes());
        });
    }
}

impl Decode for Header {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_list_with(|list| {
            let mut header = Header {
                parent_hash: H256::decode(list)?,
                ommers_hash: H256::decode(list)?,
                beneficiary: Address::decode(list)?,
                state_root: H256::decode(list)?,
                transactions_root: H256::decode(list)?,
                receipts_root: H256::decode(list)?,
                logs_bloom: Bloom::decode(list)?,
                difficulty: U256::decode(list)?,
                number: u64::decode(list)?,
                gas_limit: u64::decode(list)?,
                gas_used: u64::decode(list)?,
                timestamp: u64::decode(list)?,
                extra_data: Bytes::decode(list)?,
                mix_hash: H256::decode(list)?,
                nonce: 0,
            };
            let nonce = list.decode_bytes()?;
            let nonce: [u8; 8] = nonce.try_into().map_err(|_| RlpError::InvalidLength {
                what: "seal nonce",
                actual: nonce.len(),
            })?;
            header.nonce = u64::from_be_bytes(nonce);
            Ok(header)
        })
    }
}

/// A block as handed to the execution engine. Ommers are not modelled.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

impl Block {
    pub fn new(header: Header, transactions: Vec<Transaction>) -> Self {
        Block {
            header,
            transactions,
        }
    }

    pub fn hash(&self) -> H256 {
        self.header.hash()
    }

    pub fn number(&self) -> u64 {
        self.header.number
    }
}

impl Encode for Block {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_list_with(|list| {
            self.header.encode(list);
            list.encode_list(&self.transactions);
            list.encode_list_with(|_| {});
        });
    }
}

impl Decode for Block {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_list_with(|list| {
            let header = Header::decode(list)?;
            let transactions = list.decode_list()?;
            let ommers: Vec<Header> = list.decode_list()?;
            if !ommers.is_empty() {
                return Err(RlpError::InvalidLength {
                    what: "ommers",
                    actual: ommers.len(),
                });
            }
            Ok(Block {
                header,
                transactions,
            })
        })
    }
}
