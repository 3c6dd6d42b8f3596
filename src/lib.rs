// Core modules
pub mod config;
pub mod genesis;
pub mod node;

// Re-export commonly used types
pub use config::{Config, ExecutionConfig, LogConfig, NodeConfig};
pub use genesis::{Genesis, GenesisAccount, GenesisConfig};
pub use node::{ImportedBlock, Node, NodeInfo, TransactionTrace};

// Re-export crate modules
pub use ethereum_core as core;
pub use ethereum_crypto as crypto;
pub use ethereum_evm as evm;
pub use ethereum_rlp as rlp;
pub use ethereum_types as types;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get client version string
pub fn client_version() -> String {
    format!("ethereum-node/v{}/rust", VERSION)
}
