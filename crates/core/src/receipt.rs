use ethereum_rlp::{Decode, Decoder, Encode, Encoder, RlpError};
use ethereum_types::{Address, Bloom, Bytes, H256};
use serde::{Deserialize, Serialize};

/// A log emitted by LOG0..LOG4.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
}

impl LogEntry {
    pub fn bloom(&self) -> Bloom {
        let mut bloom = Bloom::new();
        bloom.accrue(self.address.as_bytes());
        for topic in &self.topics {
            bloom.accrue(topic.as_bytes());
        }
        bloom
    }
}

impl Encode for LogEntry {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_list_with(|list| {
            self.address.encode(list);
            self.topics.encode(list);
            self.data.encode(list);
        });
    }
}

impl Decode for LogEntry {
    fn decode(decoder: &mut Decoder) -> Result<Self, RlpError> {
        decoder.decode_list_with(|list| {
            Ok(LogEntry {
                address: Address::decode(list)?,
                topics: Vec::<H256>::decode(list)?,
                data: Bytes::decode(list)?,
            })
        })
    }
}

/// Outcome of one included transaction. Immutable once built.
///
/// Only `[post_state, cumulative_gas_used, logs_bloom, logs]` is consensus
/// data; the remaining fields are local diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    post_state: H256,
    cumulative_gas_used: u64,
    logs_bloom: Bloom,
    logs: Vec<LogEntry>,
    gas_used: u64,
    output: Bytes,
    error: String,
    contract_address: Option<Address>,
}

impl Receipt {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        post_state: H256,
        cumulative_gas_used: u64,
        gas_used: u64,
        logs: Vec<LogEntry>,
        output: Bytes,
        error: String,
        contract_address: Option<Address>,
    ) -> Self {
        let logs_bloom = logs.iter().fold(Bloom::new(), |acc, log| acc | log.bloom());
        Receipt {
            post_state,
            cumulative_gas_used,
            logs_bloom,
            logs,
            gas_used,
            output,
            error,
            contract_address,
        }
    }

    pub fn post_state(&self) -> H256 {
        self.post_state
    }

    pub fn cumulative_gas_used(&self) -> u64 {
        self.cumulative_gas_used
    }

    pub fn logs_bloom(&self) -> &Bloom {
        &self.logs_bloom
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    pub fn gas_used(&self) -> u64 {
        self.gas_used
    }

    pub fn output(&self) -> &Bytes {
        &self.output
    }

    /// Empty when execution succeeded.
    pub fn error(&self) -> &str {
        &self.error
    }

    pub fn contract_address(&self) -> Option<Address> {
        self.contract_address
    }

    pub fn is_success(&self) -> bool {
        self.error.is_empty()
    }
}

impl Encode for Receipt {
    fn encode(&self, encoder: &mut Encoder) {
        encoder.encode_list_with(|list| {
            self.post_state.encode(list);
            self.cumulative_gas_used.encode(list);
            self.logs_bloom.encode(list);
            self.logs.encode(list);
        });
    }
}
