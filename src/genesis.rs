use std::collections::BTreeMap;
use std::path::Path;
use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use ethereum_types::{H256, U256, Address, Bytes};
use ethereum_core::Header;
use ethereum_evm::{Account, AccountState, ForkSchedule, MemoryState};

/// Genesis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenesisConfig {
    /// Chain configuration
    pub config: ChainConfig,
    /// Nonce for mining
    #[serde(default = "zero_quantity")]
    pub nonce: String,
    /// Timestamp
    #[serde(default = "zero_quantity")]
    pub timestamp: String,
    /// Extra data
    #[serde(default)]
    pub extra_data: String,
    /// Gas limit
    pub gas_limit: String,
    /// Difficulty
    pub difficulty: String,
    /// Mix hash
    #[serde(default)]
    pub mix_hash: Option<String>,
    /// Coinbase
    #[serde(default)]
    pub coinbase: Option<String>,
    /// Pre-allocated accounts
    #[serde(default)]
    pub alloc: BTreeMap<String, GenesisAccount>,
}

fn zero_quantity() -> String {
    "0x0".to_string()
}

/// Chain configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    pub chain_id: u64,
    #[serde(default)]
    pub homestead_block: Option<u64>,
    #[serde(default)]
    pub eip150_block: Option<u64>,
    #[serde(default)]
    pub eip155_block: Option<u64>,
    #[serde(default)]
    pub eip158_block: Option<u64>,
}

impl ChainConfig {
    /// Replay protection and empty-account clearing ship together, so the
    /// later of the two heights activates both.
    pub fn fork_schedule(&self) -> ForkSchedule {
        let spurious_dragon_block = match (self.eip155_block, self.eip158_block) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
        ForkSchedule {
            chain_id: self.chain_id,
            homestead_block: self.homestead_block,
            tangerine_whistle_block: self.eip150_block,
            spurious_dragon_block,
        }
    }
}

/// Genesis account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenesisAccount {
    /// Balance
    pub balance: String,
    /// Nonce
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<u64>,
    /// Code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Storage
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<String, String>>,
}

/// Genesis block builder
#[derive(Debug, Clone)]
pub struct Genesis {
    config: GenesisConfig,
}

impl Genesis {
    /// Load genesis configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context("Failed to read genesis file")?;

        Self::from_json(&content)
    }

    /// Load genesis configuration from JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        let config: GenesisConfig = serde_json::from_str(json)
            .context("Failed to parse genesis configuration")?;

        Ok(Self { config })
    }

    /// Development chain with every fork active and `alloc` funded.
    pub fn dev(chain_id: u64, alloc: impl IntoIterator<Item = (Address, U256)>) -> Self {
        Self {
            config: GenesisConfig {
                config: ChainConfig {
                    chain_id,
                    homestead_block: Some(0),
                    eip150_block: Some(0),
                    eip155_block: Some(0),
                    eip158_block: Some(0),
                },
                nonce: zero_quantity(),
                timestamp: zero_quantity(),
                extra_data: String::new(),
                gas_limit: "0x7a1200".to_string(),
                difficulty: "0x20000".to_string(),
                mix_hash: None,
                coinbase: None,
                alloc: alloc
                    .into_iter()
                    .map(|(address, balance)| {
                        (
                            format!("{:x}", address),
                            GenesisAccount {
                                balance: format!("{:#x}", balance),
                                ..Default::default()
                            },
                        )
                    })
                    .collect(),
            },
        }
    }

    pub fn config(&self) -> &GenesisConfig {
        &self.config
    }

    pub fn fork_schedule(&self) -> ForkSchedule {
        self.config.config.fork_schedule()
    }

    /// Writes the pre-allocated accounts into `state` and returns the
    /// genesis header committing to the result.
    pub fn apply(&self, state: &mut MemoryState) -> Result<Header> {
        for (address_str, genesis_account) in &self.config.alloc {
            let address = parse_address(address_str)?;
            let account = build_account(genesis_account)
                .with_context(|| format!("Invalid genesis account {}", address_str))?;
            state.insert_account(address, account);
        }

        Ok(Header {
            parent_hash: H256::zero(),
            beneficiary: match &self.config.coinbase {
                Some(coinbase) => parse_address(coinbase)?,
                None => Address::zero(),
            },
            state_root: state.state_root(),
            difficulty: parse_u256(&self.config.difficulty)?,
            number: 0,
            gas_limit: parse_u64(&self.config.gas_limit)?,
            gas_used: 0,
            timestamp: parse_u64(&self.config.timestamp)?,
            extra_data: Bytes::from_vec(parse_bytes(&self.config.extra_data)?),
            mix_hash: match &self.config.mix_hash {
                Some(mix_hash) => parse_h256(mix_hash)?,
                None => H256::zero(),
            },
            nonce: parse_u64(&self.config.nonce)?,
            ..Default::default()
        })
    }
}

fn build_account(genesis_account: &GenesisAccount) -> Result<Account> {
    let mut account = Account::with_balance(parse_u256(&genesis_account.balance)?);
    account.nonce = U256::from(genesis_account.nonce.unwrap_or(0));

    if let Some(ref code_str) = genesis_account.code {
        account.code = Bytes::from_vec(parse_bytes(code_str)?);
    }

    if let Some(ref storage) = genesis_account.storage {
        for (key_str, value_str) in storage {
            let value = parse_h256(value_str)?;
            if !value.is_zero() {
                account.storage.insert(parse_h256(key_str)?, value);
            }
        }
    }

    Ok(account)
}

// Parsing helpers

pub fn parse_u64(s: &str) -> Result<u64> {
    match s.strip_prefix("0x") {
        Some(hex) => u64::from_str_radix(hex, 16)
            .context("Failed to parse hex u64"),
        None => s.parse().context("Failed to parse u64"),
    }
}

pub fn parse_u256(s: &str) -> Result<U256> {
    match s.strip_prefix("0x") {
        Some(hex) => U256::from_str_radix(hex, 16)
            .context("Failed to parse hex U256"),
        None => U256::from_dec_str(s)
            .context("Failed to parse U256"),
    }
}

/// Storage keys and values may be shorter than a word; they are left-padded.
fn parse_h256(s: &str) -> Result<H256> {
    let bytes = parse_bytes(s)?;
    if bytes.len() > 32 {
        anyhow::bail!("Invalid H256 length: {}", bytes.len());
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(&bytes);
    Ok(H256::from(word))
}

fn parse_address(s: &str) -> Result<Address> {
    let bytes = parse_bytes(s)?;
    Address::from_slice(&bytes)
        .with_context(|| format!("Invalid address {}", s))
}

fn parse_bytes(s: &str) -> Result<Vec<u8>> {
    hex::decode(s.strip_prefix("0x").unwrap_or(s))
        .context("Failed to parse hex bytes")
}
