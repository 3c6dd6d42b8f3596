//! Gas-metered execution engine.
//!
//! Transactions enter through [`TransactionExecutor`] (or a whole block
//! through [`BlockProcessor`]). Nested calls and creates are run by the
//! [`CallDispatcher`], which drives an [`Interpreter`] per frame against an
//! [`AccountState`] with nested views.

pub mod block;
pub mod call;
pub mod error;
pub mod execution;
pub mod executive;
pub mod gas;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod precompiled;
pub mod schedule;
pub mod stack;
pub mod state;
pub mod tracer;
pub mod word;

#[cfg(test)]
mod tests;

pub use block::{BlockError, BlockOutcome, BlockProcessor};
pub use call::{contract_address, CallDispatcher, CallOutcome, CallParams, CreateParams};
pub use error::{EvmError, EvmResult, ExecutionError};
pub use execution::{
    BlockContext, CallKind, ExecutionContext, ExecutionResult, Halt, HaltReason, InternalCall, Substate,
};
pub use executive::TransactionExecutor;
pub use interpreter::Interpreter;
pub use precompiled::{PrecompiledContract, PrecompiledRegistry};
pub use schedule::{CallGasPolicy, FixedRules, Fork, ForkSchedule, RuleSet, Schedule};
pub use state::{Account, AccountState, MemoryState, StateError, StateView};
pub use tracer::{ExecutionObserver, StructLog, StructLogger, TraceConfig};
