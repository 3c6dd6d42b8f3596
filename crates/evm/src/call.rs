//! Nested invocations.
//!
//! The dispatcher owns the borrowed state and block environment for one
//! transaction. Each call or create runs inside its own nested state view,
//! committed only when the callee halts normally.

use crate::error::EvmResult;
use crate::execution::{BlockContext, CallKind, ExecutionContext, Halt, HaltReason, Substate};
use crate::interpreter::Interpreter;
use crate::precompiled::PrecompiledRegistry;
use crate::schedule::Schedule;
use crate::state::{AccountState, StateView};
use crate::tracer::{ExecutionObserver, StepInfo};
use ethereum_crypto::keccak256;
use ethereum_rlp::{Encode, Encoder};
use ethereum_types::{Address, Bytes, H256, U256};
use tracing::{debug, trace};

/// Address of a contract created by `sender` at `nonce`:
/// the last 20 bytes of `keccak(rlp([sender, nonce]))`.
pub fn contract_address(sender: &Address, nonce: &U256) -> Address {
    let mut encoder = Encoder::new();
    encoder.encode_list_with(|list| {
        sender.encode(list);
        nonce.encode(list);
    });
    Address::from_hash(&keccak256(&encoder.finish()))
}

#[derive(Debug, Clone)]
pub struct CallParams {
    pub kind: CallKind,
    /// Caller seen by the callee, and the source of any transfer.
    pub caller: Address,
    /// Account whose storage the callee uses.
    pub address: Address,
    /// Account the code is loaded from.
    pub code_address: Address,
    pub value: U256,
    /// Whether `value` actually moves from `caller` to `address`.
    pub transfer: bool,
    pub data: Bytes,
    pub gas: u64,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct CreateParams {
    pub creator: Address,
    pub address: Address,
    pub value: U256,
    pub init_code: Bytes,
    pub gas: u64,
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub result: Result<Bytes, HaltReason>,
    pub gas_left: u64,
    /// Empty unless the invocation succeeded.
    pub substate: Substate,
    pub created: Option<Address>,
}

impl CallOutcome {
    fn failed(reason: HaltReason) -> Self {
        CallOutcome {
            result: Err(reason),
            gas_left: 0,
            substate: Substate::new(),
            created: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

pub struct CallDispatcher<'a> {
    pub state: &'a mut dyn AccountState,
    pub schedule: &'a Schedule,
    pub block: &'a BlockContext,
    pub precompiles: &'a PrecompiledRegistry,
    pub origin: Address,
    pub gas_price: U256,
    observer: Option<&'a mut dyn ExecutionObserver>,
}

impl<'a> CallDispatcher<'a> {
    pub fn new(
        state: &'a mut dyn AccountState,
        schedule: &'a Schedule,
        block: &'a BlockContext,
        precompiles: &'a PrecompiledRegistry,
        origin: Address,
        gas_price: U256,
    ) -> Self {
        CallDispatcher {
            state,
            schedule,
            block,
            precompiles,
            origin,
            gas_price,
            observer: None,
        }
    }

    pub fn with_observer(mut self, observer: &'a mut dyn ExecutionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub(crate) fn observe_step(&mut self, step: &StepInfo<'_>) {
        if let Some(observer) = self.observer.as_mut() {
            observer.step(step);
        }
    }

    pub(crate) fn observe_storage(&mut self, address: &Address, key: &H256, value: &H256) {
        if let Some(observer) = self.observer.as_mut() {
            observer.storage_write(address, key, value);
        }
    }

    pub(crate) fn observe_fault(&mut self, depth: usize, reason: &HaltReason) {
        if let Some(observer) = self.observer.as_mut() {
            observer.fault(depth, reason);
        }
    }

    /// Checks that a frame at `depth` may start a nested invocation moving
    /// `value` out of `sender`. A rejected invocation fails without running
    /// and hands back the gas it would have been given.
    pub fn check_invoke(
        &self,
        depth: usize,
        sender: &Address,
        value: U256,
    ) -> Result<(), HaltReason> {
        if depth >= self.schedule.max_depth {
            return Err(HaltReason::CallDepthExceeded);
        }
        if self.state.balance(sender) < value {
            return Err(HaltReason::InsufficientBalance);
        }
        Ok(())
    }

    /// Runs a CALL-family invocation. Only internal errors are returned as
    /// `Err`; exceptional halts are reported in the outcome.
    pub fn call(&mut self, params: CallParams) -> EvmResult<CallOutcome> {
        trace!(
            kind = ?params.kind,
            to = %params.code_address,
            gas = params.gas,
            depth = params.depth,
            "call"
        );
        let view = self.state.start_nested_view();
        let outcome = self.call_in_view(params);
        self.close_view(view, &outcome)?;
        outcome
    }

    /// Runs init code for a new contract at `params.address` and deposits
    /// the returned code.
    pub fn create(&mut self, params: CreateParams) -> EvmResult<CallOutcome> {
        trace!(address = %params.address, gas = params.gas, depth = params.depth, "create");
        let view = self.state.start_nested_view();
        let outcome = self.create_in_view(params);
        self.close_view(view, &outcome)?;
        outcome
    }

    fn close_view(&mut self, view: StateView, outcome: &EvmResult<CallOutcome>) -> EvmResult<()> {
        match outcome {
            Ok(outcome) if outcome.is_success() => self.state.commit(view)?,
            _ => self.state.rollback(view)?,
        }
        Ok(())
    }

    fn call_in_view(&mut self, params: CallParams) -> EvmResult<CallOutcome> {
        let mut substate = Substate::new();
        if params.transfer {
            self.state
                .transfer_balance(&params.caller, &params.address, params.value)?;
        }
        substate.touched.insert(params.address);

        if let Some(contract) = self.precompiles.get(&params.code_address) {
            let cost = contract.required_gas(&params.data);
            if cost > params.gas {
                trace!(
                    address = %params.code_address,
                    cost,
                    gas = params.gas,
                    "precompile out of gas"
                );
                return Ok(CallOutcome::failed(HaltReason::OutOfGas));
            }
            return Ok(CallOutcome {
                result: Ok(contract.execute(&params.data)),
                gas_left: params.gas - cost,
                substate,
                created: None,
            });
        }

        let code = self.state.code(&params.code_address);
        if code.is_empty() {
            return Ok(CallOutcome {
                result: Ok(Bytes::new()),
                gas_left: params.gas,
                substate,
                created: None,
            });
        }

        let context = ExecutionContext {
            address: params.address,
            code_address: params.code_address,
            caller: params.caller,
            origin: self.origin,
            value: params.value,
            data: params.data,
            code,
            gas: params.gas,
            gas_price: self.gas_price,
            depth: params.depth,
            kind: params.kind,
        };
        let frame = Interpreter::new(context).run(self)?;
        match frame.halt {
            Halt::Stop { output } => {
                substate.accrue(frame.substate);
                Ok(CallOutcome {
                    result: Ok(output),
                    gas_left: frame.gas_left,
                    substate,
                    created: None,
                })
            }
            Halt::Exception(reason) => Ok(CallOutcome::failed(reason)),
        }
    }

    fn create_in_view(&mut self, params: CreateParams) -> EvmResult<CallOutcome> {
        let address = params.address;
        if !self.state.nonce(&address).is_zero() || !self.state.code(&address).is_empty() {
            debug!(%address, "contract address collision");
            return Ok(CallOutcome::failed(HaltReason::CreateCollision));
        }

        self.state.create_account(&address);
        if !self.schedule.contract_start_nonce.is_zero() {
            self.state.set_nonce(&address, self.schedule.contract_start_nonce);
        }
        self.state
            .transfer_balance(&params.creator, &address, params.value)?;

        let mut substate = Substate::new();
        substate.touched.insert(address);

        let context = ExecutionContext {
            address,
            code_address: address,
            caller: params.creator,
            origin: self.origin,
            value: params.value,
            data: Bytes::new(),
            code: params.init_code,
            gas: params.gas,
            gas_price: self.gas_price,
            depth: params.depth,
            kind: CallKind::Create,
        };
        let frame = Interpreter::new(context).run(self)?;
        let output = match frame.halt {
            Halt::Stop { output } => output,
            Halt::Exception(reason) => return Ok(CallOutcome::failed(reason)),
        };

        if let Some(limit) = self.schedule.create_data_limit {
            if output.len() > limit {
                debug!(%address, size = output.len(), limit, "contract code too large");
                return Ok(CallOutcome::failed(HaltReason::CodeSizeExceeded));
            }
        }

        let mut gas_left = frame.gas_left;
        let deposit_cost = self.schedule.create_data_gas.saturating_mul(output.len() as u64);
        if deposit_cost > gas_left {
            if !self.schedule.create_empty_on_code_deposit_oog {
                return Ok(CallOutcome::failed(HaltReason::OutOfGas));
            }
            debug!(%address, deposit_cost, gas_left, "code deposit unpaid, leaving contract empty");
        } else {
            gas_left -= deposit_cost;
            self.state.set_code(&address, output);
        }

        substate.accrue(frame.substate);
        Ok(CallOutcome {
            result: Ok(Bytes::new()),
            gas_left,
            substate,
            created: Some(address),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryState;

    struct Env {
        schedule: Schedule,
        block: BlockContext,
        precompiles: PrecompiledRegistry,
    }

    impl Env {
        fn new(schedule: Schedule) -> Self {
            Env {
                schedule,
                block: BlockContext::default(),
                precompiles: PrecompiledRegistry::frontier(),
            }
        }

        fn dispatcher<'a>(&'a self, state: &'a mut MemoryState) -> CallDispatcher<'a> {
            CallDispatcher::new(
                state,
                &self.schedule,
                &self.block,
                &self.precompiles,
                Address::zero(),
                U256::one(),
            )
        }
    }

    fn call_params(to: Address, data: &[u8], gas: u64) -> CallParams {
        CallParams {
            kind: CallKind::Call,
            caller: Address::from_low_u64(0xca11),
            address: to,
            code_address: to,
            value: U256::zero(),
            transfer: true,
            data: Bytes::from_slice(data),
            gas,
            depth: 0,
        }
    }

    #[test]
    fn test_contract_address() {
        let sender: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
        assert_eq!(
            format!("{:x}", contract_address(&sender, &U256::zero())),
            "0xcd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"
        );
        assert_eq!(
            format!("{:x}", contract_address(&sender, &U256::one())),
            "0x343c43a37d37dff08ae8c4a11544c718abb4fcf8"
        );
    }

    #[test]
    fn test_call_to_precompile_charges_its_cost() {
        let env = Env::new(Schedule::frontier());
        let mut state = MemoryState::new();
        let outcome = env
            .dispatcher(&mut state)
            .call(call_params(Address::from_low_u64(4), &[1, 2, 3], 100))
            .unwrap();
        assert_eq!(outcome.result, Ok(Bytes::from_slice(&[1, 2, 3])));
        assert_eq!(outcome.gas_left, 82);
    }

    #[test]
    fn test_precompile_out_of_gas_rolls_back_transfer() {
        let env = Env::new(Schedule::frontier());
        let mut state = MemoryState::new();
        let caller = Address::from_low_u64(0xca11);
        state.add_balance(&caller, U256::from(10));

        let mut params = call_params(Address::from_low_u64(2), &[0; 64], 83);
        params.value = U256::from(5);
        let outcome = env.dispatcher(&mut state).call(params).unwrap();

        assert_eq!(outcome.result, Err(HaltReason::OutOfGas));
        assert_eq!(outcome.gas_left, 0);
        assert_eq!(state.balance(&caller), U256::from(10));
        assert!(!state.exists(&Address::from_low_u64(2)));
    }

    #[test]
    fn test_call_without_code_keeps_gas_and_moves_value() {
        let env = Env::new(Schedule::frontier());
        let mut state = MemoryState::new();
        let caller = Address::from_low_u64(0xca11);
        let target = Address::from_low_u64(0xbeef);
        state.add_balance(&caller, U256::from(10));

        let mut params = call_params(target, &[], 500);
        params.value = U256::from(4);
        let outcome = env.dispatcher(&mut state).call(params).unwrap();

        assert!(outcome.is_success());
        assert_eq!(outcome.gas_left, 500);
        assert!(outcome.substate.touched.contains(&target));
        assert_eq!(state.balance(&target), U256::from(4));
        assert_eq!(state.open_views(), 0);
    }

    #[test]
    fn test_create_collision() {
        let env = Env::new(Schedule::frontier());
        let mut state = MemoryState::new();
        let address = Address::from_low_u64(0xc0de);
        state.set_nonce(&address, U256::one());

        let outcome = env
            .dispatcher(&mut state)
            .create(CreateParams {
                creator: Address::from_low_u64(1),
                address,
                value: U256::zero(),
                init_code: Bytes::new(),
                gas: 1000,
                depth: 0,
            })
            .unwrap();
        assert_eq!(outcome.result, Err(HaltReason::CreateCollision));
        assert_eq!(outcome.gas_left, 0);
    }

    #[test]
    fn test_check_invoke_depth_and_balance() {
        let env = Env::new(Schedule::frontier());
        let mut state = MemoryState::new();
        state.add_balance(&Address::from_low_u64(1), U256::from(5));
        let dispatcher = env.dispatcher(&mut state);
        let sender = Address::from_low_u64(1);

        assert_eq!(dispatcher.check_invoke(0, &sender, U256::from(5)), Ok(()));
        assert_eq!(
            dispatcher.check_invoke(0, &sender, U256::from(6)),
            Err(HaltReason::InsufficientBalance)
        );
        assert_eq!(
            dispatcher.check_invoke(1024, &sender, U256::zero()),
            Err(HaltReason::CallDepthExceeded)
        );
    }
}
