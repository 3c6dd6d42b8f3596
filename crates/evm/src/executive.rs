//! Top-level transaction execution.
//!
//! [`TransactionExecutor`] validates a signed transaction, charges for it up
//! front, dispatches the call or create and settles gas with the sender and
//! the block author. Every state change happens inside one outer view that
//! is committed only once the receipt is ready.

use crate::call::{contract_address, CallDispatcher, CallOutcome, CallParams, CreateParams};
use crate::error::ExecutionError;
use crate::execution::{BlockContext, CallKind, ExecutionResult};
use crate::gas;
use crate::precompiled::PrecompiledRegistry;
use crate::schedule::Schedule;
use crate::state::AccountState;
use crate::tracer::ExecutionObserver;
use ethereum_core::{Receipt, Transaction};
use ethereum_types::{Address, U256, U512};
use tracing::debug;

pub struct TransactionExecutor<'a> {
    state: &'a mut dyn AccountState,
    schedule: &'a Schedule,
    precompiles: &'a PrecompiledRegistry,
    observer: Option<&'a mut dyn ExecutionObserver>,
}

impl<'a> TransactionExecutor<'a> {
    pub fn new(
        state: &'a mut dyn AccountState,
        schedule: &'a Schedule,
        precompiles: &'a PrecompiledRegistry,
    ) -> Self {
        TransactionExecutor {
            state,
            schedule,
            precompiles,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn ExecutionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Validates and executes `tx` on top of `block`.
    ///
    /// `Err` means the transaction cannot be included and the state is
    /// untouched. A transaction whose execution halts exceptionally is still
    /// included: its receipt carries the error.
    pub fn execute(
        &mut self,
        tx: &Transaction,
        block: &BlockContext,
    ) -> Result<(Receipt, ExecutionResult), ExecutionError> {
        let sender = self.verify_signature(tx)?;
        self.execute_from(sender, tx, block)
    }

    /// Like [`execute`](Self::execute) with the sender already known. The
    /// signature is not looked at.
    pub fn execute_from(
        &mut self,
        sender: Address,
        tx: &Transaction,
        block: &BlockContext,
    ) -> Result<(Receipt, ExecutionResult), ExecutionError> {
        let gas_limit = self.validate(sender, tx, block)?;

        let view = self.state.start_nested_view();
        match self.apply(sender, tx, block, gas_limit) {
            Ok(executed) => {
                self.state.commit(view)?;
                Ok(executed)
            }
            Err(err) => {
                self.state.rollback(view)?;
                Err(err)
            }
        }
    }

    fn verify_signature(&self, tx: &Transaction) -> Result<Address, ExecutionError> {
        let signature = tx
            .signature()
            .map_err(|e| ExecutionError::InvalidSignature(e.to_string()))?;
        if !signature.is_valid() {
            return Err(ExecutionError::InvalidSignature("r or s out of range".into()));
        }
        if self.schedule.require_low_s && !signature.is_low_s() {
            return Err(ExecutionError::InvalidSignature("high s value".into()));
        }
        if let Some(chain_id) = tx.chain_id() {
            if self.schedule.chain_id != Some(chain_id) {
                return Err(ExecutionError::InvalidSignature(format!(
                    "chain id {} not accepted",
                    chain_id
                )));
            }
        }
        tx.sender()
            .map_err(|e| ExecutionError::InvalidSignature(e.to_string()))
    }

    /// Static checks. Returns the gas limit as a counter value.
    fn validate(
        &self,
        sender: Address,
        tx: &Transaction,
        block: &BlockContext,
    ) -> Result<u64, ExecutionError> {
        let intrinsic = gas::intrinsic_gas(self.schedule, &tx.data, tx.is_create());
        if tx.gas_limit < U256::from(intrinsic) {
            return Err(ExecutionError::NotEnoughBaseGas {
                required: intrinsic,
                got: tx.gas_limit,
            });
        }

        if U256::from(block.gas_used) + tx.gas_limit > U256::from(block.gas_limit) {
            return Err(ExecutionError::BlockGasLimitReached {
                gas_limit: block.gas_limit,
                gas_used: block.gas_used,
                gas: tx.gas_limit,
            });
        }

        if tx.gas_limit > U256::from(u64::MAX) {
            return Err(ExecutionError::GasLimitOverflow(tx.gas_limit));
        }
        let gas_limit = tx.gas_limit.low_u64();

        let nonce = self.state.nonce(&sender);
        if tx.nonce != nonce {
            return Err(ExecutionError::InvalidNonce {
                expected: nonce,
                got: tx.nonce,
            });
        }

        let required = U512::from(tx.value) + U512::from(tx.gas_limit) * U512::from(tx.gas_price);
        let balance = U512::from(self.state.balance(&sender));
        if balance < required {
            return Err(ExecutionError::NotEnoughCash {
                required,
                got: balance,
            });
        }

        Ok(gas_limit)
    }

    fn apply(
        &mut self,
        sender: Address,
        tx: &Transaction,
        block: &BlockContext,
        gas_limit: u64,
    ) -> Result<(Receipt, ExecutionResult), ExecutionError> {
        let schedule = self.schedule;
        let intrinsic = gas::intrinsic_gas(schedule, &tx.data, tx.is_create());
        let gas = gas_limit - intrinsic;

        self.state.inc_nonce(&sender);
        self.state
            .sub_balance(&sender, U256::from(gas_limit) * tx.gas_price)?;

        debug!(
            %sender,
            to = ?tx.to,
            gas_limit,
            value = %tx.value,
            "executing transaction"
        );

        let mut dispatcher = CallDispatcher::new(
            &mut *self.state,
            schedule,
            block,
            self.precompiles,
            sender,
            tx.gas_price,
        );
        if let Some(observer) = self.observer.as_deref_mut() {
            dispatcher = dispatcher.with_observer(observer);
        }
        let outcome = match tx.to {
            None => dispatcher.create(CreateParams {
                creator: sender,
                address: contract_address(&sender, &tx.nonce),
                value: tx.value,
                init_code: tx.data.clone(),
                gas,
                depth: 0,
            })?,
            Some(to) => dispatcher.call(CallParams {
                kind: CallKind::Call,
                caller: sender,
                address: to,
                code_address: to,
                value: tx.value,
                transfer: true,
                data: tx.data.clone(),
                gas,
                depth: 0,
            })?,
        };

        let result = self.finalize(sender, tx, block, gas_limit, outcome)?;
        let receipt = Receipt::new(
            self.state.state_root(),
            block.gas_used + result.gas_used - result.refund,
            result.gas_used - result.refund,
            result.logs.clone(),
            result.output.clone(),
            result.exception.map(|e| e.to_string()).unwrap_or_default(),
            result.contract_address,
        );
        Ok((receipt, result))
    }

    fn finalize(
        &mut self,
        sender: Address,
        tx: &Transaction,
        block: &BlockContext,
        gas_limit: u64,
        outcome: CallOutcome,
    ) -> Result<ExecutionResult, ExecutionError> {
        let gas_used = gas_limit - outcome.gas_left;
        let mut substate = outcome.substate;

        let refund_counter = substate.refund_counter;
        let refund = if outcome.result.is_ok() {
            let suicide_refund = self
                .schedule
                .suicide_refund_gas
                .saturating_mul(substate.suicides.len() as u64);
            refund_counter.saturating_add(suicide_refund).min(gas_used / 2)
        } else {
            0
        };

        let price = tx.gas_price;
        self.state
            .add_balance(&sender, U256::from(outcome.gas_left + refund) * price);
        self.state
            .add_balance(&block.coinbase, U256::from(gas_used - refund) * price);
        substate.touched.insert(block.coinbase);

        for address in &substate.suicides {
            self.state.delete_account(address);
        }
        if self.schedule.kill_empty {
            for address in &substate.touched {
                if self.state.exists(address) && self.state.is_empty(address) {
                    debug!(%address, "removing empty touched account");
                    self.state.delete_account(address);
                }
            }
        }

        let (output, exception) = match outcome.result {
            Ok(output) => (output, None),
            Err(reason) => {
                debug!(%sender, %reason, "transaction execution failed");
                (Default::default(), Some(reason))
            }
        };

        Ok(ExecutionResult {
            output,
            logs: substate.logs,
            touched: substate.touched,
            suicides: substate.suicides,
            internal_calls: substate.internal_calls,
            gas_used,
            refund,
            refund_counter,
            exception,
            contract_address: outcome.created,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::HaltReason;
    use crate::state::{Account, MemoryState};
    use ethereum_crypto::{secret_from_slice, secret_to_address, SecretKey};
    use ethereum_types::Bytes;

    fn secret() -> SecretKey {
        secret_from_slice(&[0x11; 32]).unwrap()
    }

    fn block() -> BlockContext {
        BlockContext {
            coinbase: Address::from_low_u64(0xc0ffee),
            gas_limit: 10_000_000,
            ..Default::default()
        }
    }

    fn transfer(nonce: u64, to: Address, value: u64) -> Transaction {
        Transaction {
            nonce: U256::from(nonce),
            gas_price: U256::from(10),
            gas_limit: U256::from(21000),
            to: Some(to),
            value: U256::from(value),
            data: Bytes::new(),
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        }
    }

    fn funded_state(balance: u64) -> MemoryState {
        let mut state = MemoryState::new();
        state.insert_account(secret_to_address(&secret()), Account::with_balance(U256::from(balance)));
        state
    }

    #[test]
    fn test_rejections_leave_state_untouched() {
        let schedule = Schedule::frontier();
        let precompiles = PrecompiledRegistry::frontier();
        let mut state = funded_state(1_000_000);
        let root = state.state_root();
        let to = Address::from_low_u64(0xbeef);

        let cases = [
            {
                let mut tx = transfer(0, to, 1);
                tx.gas_limit = U256::from(20999);
                tx
            },
            transfer(1, to, 1),
            transfer(0, to, 1_000_000),
            {
                let mut tx = transfer(0, to, 1);
                tx.gas_limit = U256::from(20_000_000);
                tx
            },
        ];
        let mut executor = TransactionExecutor::new(&mut state, &schedule, &precompiles);
        let errors: Vec<_> = cases
            .iter()
            .map(|tx| {
                let tx = tx.clone().sign(&secret(), None).unwrap();
                executor.execute(&tx, &block()).unwrap_err()
            })
            .collect();

        assert!(matches!(errors[0], ExecutionError::NotEnoughBaseGas { required: 21000, .. }));
        assert!(matches!(errors[1], ExecutionError::InvalidNonce { .. }));
        assert!(matches!(errors[2], ExecutionError::NotEnoughCash { .. }));
        assert!(matches!(errors[3], ExecutionError::BlockGasLimitReached { .. }));
        assert_eq!(state.state_root(), root);
        assert_eq!(state.open_views(), 0);
    }

    #[test]
    fn test_signature_rules() {
        let precompiles = PrecompiledRegistry::frontier();
        let mut state = funded_state(1_000_000);
        let to = Address::from_low_u64(0xbeef);

        let frontier = Schedule::frontier();
        let protected = transfer(0, to, 1).sign(&secret(), Some(1)).unwrap();
        let err = TransactionExecutor::new(&mut state, &frontier, &precompiles)
            .execute(&protected, &block())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidSignature(_)));

        let other_chain = Schedule::spurious_dragon(61);
        let err = TransactionExecutor::new(&mut state, &other_chain, &precompiles)
            .execute(&protected, &block())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidSignature(_)));

        let unsigned = transfer(0, to, 1);
        let err = TransactionExecutor::new(&mut state, &frontier, &precompiles)
            .execute(&unsigned, &block())
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidSignature(_)));

        let mainnet = Schedule::spurious_dragon(1);
        let (receipt, _) = TransactionExecutor::new(&mut state, &mainnet, &precompiles)
            .execute(&protected, &block())
            .unwrap();
        assert!(receipt.is_success());
    }

    #[test]
    fn test_failed_execution_keeps_nonce_and_fee() {
        let schedule = Schedule::homestead();
        let precompiles = PrecompiledRegistry::frontier();
        let mut state = funded_state(10_000_000);
        let sender = secret_to_address(&secret());
        let contract = Address::from_low_u64(0xbad);
        // PUSH1 1, SSTORE with one operand missing
        state.insert_account(
            contract,
            Account {
                code: Bytes::from_slice(&[0x60, 0x01, 0x55]),
                ..Default::default()
            },
        );

        let mut tx = transfer(0, contract, 5);
        tx.gas_limit = U256::from(50_000);
        let tx = tx.sign(&secret(), None).unwrap();
        let (receipt, result) = TransactionExecutor::new(&mut state, &schedule, &precompiles)
            .execute(&tx, &block())
            .unwrap();

        assert_eq!(result.exception, Some(HaltReason::StackUnderflow));
        assert_eq!(receipt.gas_used(), 50_000);
        assert_eq!(receipt.error(), "stack underflow");
        assert_eq!(state.nonce(&sender), U256::one());
        assert_eq!(state.balance(&sender), U256::from(10_000_000 - 500_000));
        assert_eq!(state.balance(&contract), U256::zero());
        assert_eq!(state.balance(&block().coinbase), U256::from(500_000));
    }

    #[test]
    fn test_execute_from_skips_signature() {
        let schedule = Schedule::frontier();
        let precompiles = PrecompiledRegistry::frontier();
        let sender = Address::from_low_u64(0xa11ce);
        let mut state = MemoryState::new();
        state.insert_account(sender, Account::with_balance(U256::from(1_000_000)));

        let (receipt, result) = TransactionExecutor::new(&mut state, &schedule, &precompiles)
            .execute_from(sender, &transfer(0, Address::from_low_u64(0xbeef), 0), &block())
            .unwrap();
        assert!(result.is_success());
        assert_eq!(receipt.gas_used(), 21000);
    }
}
