use ethereum_core::LogEntry;
use ethereum_types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a frame stopped exceptionally. All gas given to the frame is lost.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaltReason {
    #[error("out of gas")]
    OutOfGas,
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("invalid opcode 0x{0:02x}")]
    InvalidOpcode(u8),
    #[error("invalid jump destination {0}")]
    InvalidJump(usize),
    #[error("call depth exceeded")]
    CallDepthExceeded,
    #[error("insufficient balance for transfer")]
    InsufficientBalance,
    #[error("contract address collision")]
    CreateCollision,
    #[error("contract code size exceeded")]
    CodeSizeExceeded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallKind {
    Call,
    CallCode,
    DelegateCall,
    Create,
}

/// Read-only view of the block being built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockContext {
    pub coinbase: Address,
    pub number: u64,
    pub timestamp: u64,
    pub difficulty: U256,
    pub gas_limit: u64,
    /// Gas used by the transactions already in the block.
    pub gas_used: u64,
    /// Most recent first: `last_hashes[0]` is the parent.
    pub last_hashes: Vec<H256>,
}

impl BlockContext {
    /// Hash of block `number` if it is one of the 256 before this one,
    /// otherwise zero.
    pub fn block_hash(&self, number: U256) -> H256 {
        let current = U256::from(self.number);
        if number >= current || current - number > U256::from(256) {
            return H256::zero();
        }
        let distance = (current - number).low_u64() as usize;
        self.last_hashes
            .get(distance - 1)
            .copied()
            .unwrap_or_default()
    }
}

/// Everything a frame knows about its own invocation.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Account whose storage and balance the frame acts on.
    pub address: Address,
    /// Account the running code was loaded from.
    pub code_address: Address,
    pub caller: Address,
    pub origin: Address,
    pub value: U256,
    pub data: Bytes,
    pub code: Bytes,
    pub gas: u64,
    pub gas_price: U256,
    pub depth: usize,
    pub kind: CallKind,
}

/// A nested call or create made during execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InternalCall {
    pub kind: CallKind,
    pub from: Address,
    pub to: Address,
    pub value: U256,
    pub gas: u64,
    pub gas_used: u64,
    pub output: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<HaltReason>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub calls: Vec<InternalCall>,
}

/// Side effects a frame accumulates. A child's substate is merged into its
/// parent only when the child succeeds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substate {
    pub logs: Vec<LogEntry>,
    pub touched: BTreeSet<Address>,
    pub suicides: BTreeSet<Address>,
    pub refund_counter: u64,
    pub internal_calls: Vec<InternalCall>,
}

impl Substate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn accrue(&mut self, child: Substate) {
        self.logs.extend(child.logs);
        self.touched.extend(child.touched);
        self.suicides.extend(child.suicides);
        self.refund_counter = self.refund_counter.saturating_add(child.refund_counter);
        self.internal_calls.extend(child.internal_calls);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Halt {
    /// STOP, RETURN, SUICIDE or running off the end of the code.
    Stop { output: Bytes },
    Exception(HaltReason),
}

#[derive(Debug, Clone)]
pub struct FrameResult {
    pub halt: Halt,
    pub gas_left: u64,
    pub substate: Substate,
}

impl FrameResult {
    pub fn exception(reason: HaltReason) -> Self {
        FrameResult {
            halt: Halt::Exception(reason),
            gas_left: 0,
            substate: Substate::new(),
        }
    }
}

/// Outcome of one top-level execution including every nested call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub output: Bytes,
    pub logs: Vec<LogEntry>,
    pub touched: BTreeSet<Address>,
    pub suicides: BTreeSet<Address>,
    pub internal_calls: Vec<InternalCall>,
    /// Gas charged to the sender before the refund.
    pub gas_used: u64,
    /// Refund actually applied.
    pub refund: u64,
    /// Refund counter before capping.
    pub refund_counter: u64,
    pub exception: Option<HaltReason>,
    pub contract_address: Option<Address>,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exception.is_none()
    }
}
