use crate::execution::HaltReason;
use crate::state::StateError;
use ethereum_types::{U256, U512};
use thiserror::Error;

pub type EvmResult<T> = Result<T, EvmError>;

/// Failure inside a running frame.
///
/// `Halt` ends the frame exceptionally and is absorbed by the caller as a
/// failed call. `Internal` means an engine invariant broke and unwinds the
/// whole transaction.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvmError {
    #[error("{0}")]
    Halt(#[from] HaltReason),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StateError> for EvmError {
    fn from(err: StateError) -> Self {
        EvmError::Internal(err.to_string())
    }
}

/// Why a transaction could not be executed or included.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("Not enough base gas: required {required}, got {got}")]
    NotEnoughBaseGas { required: u64, got: U256 },

    #[error("Block gas limit reached: limit {gas_limit}, used {gas_used}, transaction wants {gas}")]
    BlockGasLimitReached {
        gas_limit: u64,
        gas_used: u64,
        gas: U256,
    },

    #[error("Gas limit {0} does not fit the gas counter")]
    GasLimitOverflow(U256),

    #[error("Invalid nonce: expected {expected}, got {got}")]
    InvalidNonce { expected: U256, got: U256 },

    #[error("Cost of transaction exceeds sender balance: required {required}, got {got}")]
    NotEnoughCash { required: U512, got: U512 },

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<EvmError> for ExecutionError {
    fn from(err: EvmError) -> Self {
        match err {
            EvmError::Internal(msg) => ExecutionError::Internal(msg),
            EvmError::Halt(reason) => {
                ExecutionError::Internal(format!("unabsorbed halt: {}", reason))
            }
        }
    }
}

impl From<StateError> for ExecutionError {
    fn from(err: StateError) -> Self {
        ExecutionError::Internal(err.to_string())
    }
}
