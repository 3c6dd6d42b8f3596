use crate::error::ExecutionError;
use crate::execution::{BlockContext, ExecutionResult};
use crate::executive::TransactionExecutor;
use crate::precompiled::PrecompiledRegistry;
use crate::schedule::RuleSet;
use crate::state::{AccountState, StateError};
use ethereum_core::{Header, Receipt, Transaction};
use ethereum_types::{Bloom, H256};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum BlockError {
    #[error("Transaction {index} is invalid: {source}")]
    InvalidTransaction {
        index: usize,
        #[source]
        source: ExecutionError,
    },

    #[error("State error: {0}")]
    State(#[from] StateError),
}

/// Everything produced by executing a block's transactions.
#[derive(Debug, Clone, Default)]
pub struct BlockOutcome {
    pub receipts: Vec<Receipt>,
    pub results: Vec<ExecutionResult>,
    pub gas_used: u64,
    pub logs_bloom: Bloom,
    pub state_root: H256,
}

/// Runs the transactions of a block in order, each on top of the previous
/// one's state. A single invalid transaction rejects the whole block.
pub struct BlockProcessor<'a> {
    rules: &'a dyn RuleSet,
    precompiles: &'a PrecompiledRegistry,
}

impl<'a> BlockProcessor<'a> {
    pub fn new(rules: &'a dyn RuleSet, precompiles: &'a PrecompiledRegistry) -> Self {
        BlockProcessor { rules, precompiles }
    }

    /// `last_hashes` are the hashes of the preceding blocks, parent first.
    pub fn process(
        &self,
        state: &mut dyn AccountState,
        header: &Header,
        transactions: &[Transaction],
        last_hashes: Vec<H256>,
    ) -> Result<BlockOutcome, BlockError> {
        let schedule = self.rules.schedule(header.number);
        let mut context = BlockContext {
            coinbase: header.beneficiary,
            number: header.number,
            timestamp: header.timestamp,
            difficulty: header.difficulty,
            gas_limit: header.gas_limit,
            gas_used: 0,
            last_hashes,
        };
        debug!(
            number = header.number,
            fork = %schedule.fork,
            transactions = transactions.len(),
            "processing block"
        );

        let view = state.start_nested_view();
        let mut outcome = BlockOutcome::default();
        for (index, tx) in transactions.iter().enumerate() {
            let executed = TransactionExecutor::new(&mut *state, &schedule, self.precompiles)
                .execute(tx, &context);
            let (receipt, result) = match executed {
                Ok(executed) => executed,
                Err(source) => {
                    warn!(number = header.number, index, error = %source, "rejecting block");
                    state.rollback(view)?;
                    return Err(BlockError::InvalidTransaction { index, source });
                }
            };
            context.gas_used = receipt.cumulative_gas_used();
            outcome.logs_bloom |= *receipt.logs_bloom();
            outcome.receipts.push(receipt);
            outcome.results.push(result);
        }
        state.commit(view)?;

        outcome.gas_used = context.gas_used;
        outcome.state_root = state.state_root();
        Ok(outcome)
    }
}
