use std::path::{Path, PathBuf};
use std::fs;
use anyhow::{Result, Context};
use serde::{Deserialize, Serialize};
use ethereum_evm::{ForkSchedule, TraceConfig};

/// Complete node configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Node configuration
    pub node: NodeConfig,
    /// Chain rules
    pub chain: ChainConfig,
    /// Execution tracing
    pub execution: ExecutionConfig,
    /// Logging configuration
    pub log: LogConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Node name
    pub name: String,
    /// Data directory
    pub datadir: PathBuf,
}

/// Chain id and fork activation heights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub homestead_block: Option<u64>,
    pub tangerine_whistle_block: Option<u64>,
    pub spurious_dragon_block: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Record a step trace for every executed transaction
    pub trace: bool,
    pub trace_stack: bool,
    pub trace_memory: bool,
    pub trace_storage: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level
    pub level: String,
    /// Enable JSON logging
    pub json: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: "ethereum-node".to_string(),
            datadir: PathBuf::from("./data"),
        }
    }
}

impl Default for ChainConfig {
    fn default() -> Self {
        ChainConfig::from(ForkSchedule::mainnet())
    }
}

impl From<ForkSchedule> for ChainConfig {
    fn from(forks: ForkSchedule) -> Self {
        Self {
            chain_id: forks.chain_id,
            homestead_block: forks.homestead_block,
            tangerine_whistle_block: forks.tangerine_whistle_block,
            spurious_dragon_block: forks.spurious_dragon_block,
        }
    }
}

impl ChainConfig {
    pub fn fork_schedule(&self) -> ForkSchedule {
        ForkSchedule {
            chain_id: self.chain_id,
            homestead_block: self.homestead_block,
            tangerine_whistle_block: self.tangerine_whistle_block,
            spurious_dragon_block: self.spurious_dragon_block,
        }
    }
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            trace: false,
            trace_stack: true,
            trace_memory: false,
            trace_storage: true,
        }
    }
}

impl ExecutionConfig {
    pub fn trace_config(&self) -> TraceConfig {
        TraceConfig {
            disable_stack: !self.trace_stack,
            disable_memory: !self.trace_memory,
            disable_storage: !self.trace_storage,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context("Failed to read configuration file")?;

        let config: Config = toml::from_str(&content)
            .context("Failed to parse configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .context("Failed to serialize configuration")?;

        fs::write(path, content)
            .context("Failed to write configuration file")?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        // Forks must activate in order
        let chain = &self.chain;
        let heights = [
            ("homestead_block", chain.homestead_block),
            ("tangerine_whistle_block", chain.tangerine_whistle_block),
            ("spurious_dragon_block", chain.spurious_dragon_block),
        ];
        for pair in heights.windows(2) {
            let (earlier_name, earlier) = pair[0];
            let (later_name, later) = pair[1];
            match (earlier, later) {
                (Some(a), Some(b)) if b < a => {
                    anyhow::bail!("{} ({}) is before {} ({})", later_name, b, earlier_name, a);
                }
                (None, Some(_)) => {
                    anyhow::bail!("{} is set but {} is not", later_name, earlier_name);
                }
                _ => {}
            }
        }

        if chain.spurious_dragon_block.is_some() && chain.chain_id == 0 {
            anyhow::bail!("chain_id must be non-zero once replay protection is active");
        }

        if self.log.level.trim().is_empty() {
            anyhow::bail!("log level must not be empty");
        }

        Ok(())
    }

    /// Get configuration for specific network
    pub fn for_network(network: &str) -> Result<Self> {
        let mut config = Config::default();

        match network.to_lowercase().as_str() {
            "mainnet" | "main" => {
                config.chain = ChainConfig::from(ForkSchedule::mainnet());
            }
            "ropsten" => {
                config.chain = ChainConfig {
                    chain_id: 3,
                    homestead_block: Some(0),
                    tangerine_whistle_block: Some(0),
                    spurious_dragon_block: Some(10),
                };
            }
            "dev" => {
                config.chain = ChainConfig::from(ForkSchedule::all_from_genesis(1337));
                config.log.level = "debug".to_string();
            }
            _ => anyhow::bail!("Unknown network: {}", network),
        }

        Ok(config)
    }
}
