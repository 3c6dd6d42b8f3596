use crate::{
    call::{contract_address, CallDispatcher, CallParams, CreateParams},
    error::{EvmError, EvmResult},
    execution::{CallKind, ExecutionContext, FrameResult, Halt, HaltReason, InternalCall, Substate},
    gas::{self, Gas},
    memory::Memory,
    opcodes::Opcode,
    stack::Stack,
    tracer::StepInfo,
    word,
};
use ethereum_core::LogEntry;
use ethereum_crypto::keccak256;
use ethereum_types::{Address, Bytes, HashExt, H256, U256};
use std::collections::HashSet;
use tracing::debug;

/// What the interpreter does after an instruction.
enum Flow {
    Next,
    /// Skip PUSH immediates.
    Skip(usize),
    Jump(U256),
    Stop(Bytes),
}

/// Byte offsets of every JUMPDEST that is not PUSH data.
fn analyze_jump_dests(code: &[u8]) -> HashSet<usize> {
    let mut dests = HashSet::new();
    let mut pc = 0;
    while pc < code.len() {
        let byte = code[pc];
        if byte == Opcode::JUMPDEST as u8 {
            dests.insert(pc);
        }
        pc += 1 + Opcode::from_u8(byte).map_or(0, |op| op.push_bytes());
    }
    dests
}

/// `(offset, len)` of a memory range already paid for. Zero-length ranges
/// may carry any offset and are normalised to `(0, 0)`.
fn memory_range(offset: U256, len: U256) -> (usize, usize) {
    if len.is_zero() {
        (0, 0)
    } else {
        (offset.low_u64() as usize, len.low_u64() as usize)
    }
}

/// `len` bytes of `source` from `offset`, zero-padded on the right.
fn padded_slice(source: &[u8], offset: U256, len: usize) -> Vec<u8> {
    let mut out = vec![0u8; len];
    if offset < U256::from(source.len()) {
        let start = offset.low_u64() as usize;
        let available = (source.len() - start).min(len);
        out[..available].copy_from_slice(&source[start..start + available]);
    }
    out
}

/// One frame of bytecode execution.
pub struct Interpreter {
    context: ExecutionContext,
    stack: Stack,
    memory: Memory,
    gas: Gas,
    pc: usize,
    jump_dests: HashSet<usize>,
    substate: Substate,
}

impl Interpreter {
    pub fn new(context: ExecutionContext) -> Self {
        let gas = Gas::new(context.gas);
        let jump_dests = analyze_jump_dests(&context.code);
        Self {
            context,
            stack: Stack::new(),
            memory: Memory::new(),
            gas,
            pc: 0,
            jump_dests,
            substate: Substate::new(),
        }
    }

    /// Runs until the frame halts. Exceptional halts are part of the
    /// result; only internal errors come back as `Err`.
    pub fn run(mut self, dispatcher: &mut CallDispatcher<'_>) -> EvmResult<FrameResult> {
        loop {
            match self.step(dispatcher) {
                Ok(Flow::Next) => self.pc += 1,
                Ok(Flow::Skip(n)) => self.pc += 1 + n,
                Ok(Flow::Jump(dest)) => match self.jump_target(dest) {
                    Ok(target) => self.pc = target,
                    Err(reason) => return Ok(self.fail(dispatcher, reason)),
                },
                Ok(Flow::Stop(output)) => {
                    return Ok(FrameResult {
                        halt: Halt::Stop { output },
                        gas_left: self.gas.remaining(),
                        substate: self.substate,
                    });
                }
                Err(EvmError::Halt(reason)) => return Ok(self.fail(dispatcher, reason)),
                Err(err) => return Err(err),
            }
        }
    }

    fn fail(&self, dispatcher: &mut CallDispatcher<'_>, reason: HaltReason) -> FrameResult {
        debug!(
            address = %self.context.address,
            pc = self.pc,
            depth = self.context.depth,
            %reason,
            "frame halted exceptionally"
        );
        dispatcher.observe_fault(self.context.depth, &reason);
        FrameResult::exception(reason)
    }

    fn jump_target(&self, dest: U256) -> Result<usize, HaltReason> {
        let target = dest.low_u64() as usize;
        if dest.bits() <= 63 && self.jump_dests.contains(&target) {
            Ok(target)
        } else {
            Err(HaltReason::InvalidJump(target))
        }
    }

    fn step(&mut self, dispatcher: &mut CallDispatcher<'_>) -> EvmResult<Flow> {
        let Some(&byte) = self.context.code.get(self.pc) else {
            return Ok(Flow::Stop(Bytes::new()));
        };
        let schedule = dispatcher.schedule;
        let opcode = Opcode::from_u8(byte)
            .filter(|op| *op != Opcode::DELEGATECALL || schedule.have_delegate_call)
            .ok_or(HaltReason::InvalidOpcode(byte))?;

        let info = opcode.info();
        self.stack.verify(info.stack_in, info.stack_out)?;

        let cost = gas::requirements(
            opcode,
            &self.stack,
            &self.memory,
            schedule,
            &*dispatcher.state,
            &self.context.address,
            self.gas.remaining(),
        )?;

        dispatcher.observe_step(&StepInfo {
            pc: self.pc,
            opcode,
            gas: self.gas.remaining(),
            gas_cost: cost.gas,
            depth: self.context.depth,
            address: self.context.address,
            stack: &self.stack,
            memory: &self.memory,
        });

        self.gas.consume(cost.gas)?;
        self.memory.expand(cost.memory_size);
        self.execute(opcode, cost.provided_gas.unwrap_or(0), dispatcher)
    }

    fn execute(
        &mut self,
        opcode: Opcode,
        provided_gas: u64,
        dispatcher: &mut CallDispatcher<'_>,
    ) -> EvmResult<Flow> {
        match opcode {
            Opcode::STOP => return Ok(Flow::Stop(Bytes::new())),

            Opcode::ADD => self.binary(word::add)?,
            Opcode::MUL => self.binary(word::mul)?,
            Opcode::SUB => self.binary(word::sub)?,
            Opcode::DIV => self.binary(word::div)?,
            Opcode::SDIV => self.binary(word::sdiv)?,
            Opcode::MOD => self.binary(word::rem)?,
            Opcode::SMOD => self.binary(word::smod)?,
            Opcode::ADDMOD => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let n = self.stack.pop()?;
                self.stack.push(word::addmod(a, b, n))?;
            }
            Opcode::MULMOD => {
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let n = self.stack.pop()?;
                self.stack.push(word::mulmod(a, b, n))?;
            }
            Opcode::EXP => self.binary(word::exp)?,
            Opcode::SIGNEXTEND => self.binary(word::signextend)?,

            Opcode::LT => self.binary(|a, b| word::bool_to_word(a < b))?,
            Opcode::GT => self.binary(|a, b| word::bool_to_word(a > b))?,
            Opcode::SLT => self.binary(|a, b| word::bool_to_word(word::slt(a, b)))?,
            Opcode::SGT => self.binary(|a, b| word::bool_to_word(word::sgt(a, b)))?,
            Opcode::EQ => self.binary(|a, b| word::bool_to_word(a == b))?,
            Opcode::ISZERO => {
                let a = self.stack.pop()?;
                self.stack.push(word::bool_to_word(a.is_zero()))?;
            }
            Opcode::AND => self.binary(|a, b| a & b)?,
            Opcode::OR => self.binary(|a, b| a | b)?,
            Opcode::XOR => self.binary(|a, b| a ^ b)?,
            Opcode::NOT => {
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            Opcode::BYTE => self.binary(word::byte)?,

            Opcode::SHA3 => {
                let (offset, len) = memory_range(self.stack.pop()?, self.stack.pop()?);
                let hash = keccak256(&self.memory.read(offset, len));
                self.stack.push(hash.to_word())?;
            }

            Opcode::ADDRESS => self.stack.push(self.context.address.to_word())?,
            Opcode::BALANCE => {
                let address = Address::from_word(self.stack.pop()?);
                self.stack.push(dispatcher.state.balance(&address))?;
            }
            Opcode::ORIGIN => self.stack.push(self.context.origin.to_word())?,
            Opcode::CALLER => self.stack.push(self.context.caller.to_word())?,
            Opcode::CALLVALUE => self.stack.push(self.context.value)?,
            Opcode::CALLDATALOAD => {
                let offset = self.stack.pop()?;
                let data = padded_slice(&self.context.data, offset, 32);
                self.stack.push(U256::from_big_endian(&data))?;
            }
            Opcode::CALLDATASIZE => self.stack.push(U256::from(self.context.data.len()))?,
            Opcode::CALLDATACOPY => {
                let dest = self.stack.pop()?;
                let source_offset = self.stack.pop()?;
                let (dest, len) = memory_range(dest, self.stack.pop()?);
                self.memory.copy_padded(dest, &self.context.data, source_offset, len);
            }
            Opcode::CODESIZE => self.stack.push(U256::from(self.context.code.len()))?,
            Opcode::CODECOPY => {
                let dest = self.stack.pop()?;
                let source_offset = self.stack.pop()?;
                let (dest, len) = memory_range(dest, self.stack.pop()?);
                self.memory.copy_padded(dest, &self.context.code, source_offset, len);
            }
            Opcode::GASPRICE => self.stack.push(self.context.gas_price)?,
            Opcode::EXTCODESIZE => {
                let address = Address::from_word(self.stack.pop()?);
                self.stack.push(U256::from(dispatcher.state.code(&address).len()))?;
            }
            Opcode::EXTCODECOPY => {
                let address = Address::from_word(self.stack.pop()?);
                let dest = self.stack.pop()?;
                let source_offset = self.stack.pop()?;
                let (dest, len) = memory_range(dest, self.stack.pop()?);
                let code = dispatcher.state.code(&address);
                self.memory.copy_padded(dest, &code, source_offset, len);
            }

            Opcode::BLOCKHASH => {
                let number = self.stack.pop()?;
                self.stack.push(dispatcher.block.block_hash(number).to_word())?;
            }
            Opcode::COINBASE => self.stack.push(dispatcher.block.coinbase.to_word())?,
            Opcode::TIMESTAMP => self.stack.push(U256::from(dispatcher.block.timestamp))?,
            Opcode::NUMBER => self.stack.push(U256::from(dispatcher.block.number))?,
            Opcode::DIFFICULTY => self.stack.push(dispatcher.block.difficulty)?,
            Opcode::GASLIMIT => self.stack.push(U256::from(dispatcher.block.gas_limit))?,

            Opcode::POP => {
                self.stack.pop()?;
            }
            Opcode::MLOAD => {
                let offset = self.stack.pop()?.low_u64() as usize;
                self.stack.push(self.memory.read_word(offset))?;
            }
            Opcode::MSTORE => {
                let offset = self.stack.pop()?.low_u64() as usize;
                let value = self.stack.pop()?;
                self.memory.write_word(offset, value);
            }
            Opcode::MSTORE8 => {
                let offset = self.stack.pop()?.low_u64() as usize;
                let value = self.stack.pop()?;
                self.memory.write_byte(offset, value.byte(0));
            }
            Opcode::SLOAD => {
                let key = H256::from_word(self.stack.pop()?);
                let value = dispatcher.state.storage_at(&self.context.address, &key);
                self.stack.push(value.to_word())?;
            }
            Opcode::SSTORE => {
                let key = H256::from_word(self.stack.pop()?);
                let value = H256::from_word(self.stack.pop()?);
                let current = dispatcher.state.storage_at(&self.context.address, &key);
                let (_, refund) = gas::sstore_cost(dispatcher.schedule, &current, &value);
                self.substate.refund_counter += refund;
                dispatcher.state.set_storage(self.context.address, key, value);
                dispatcher.observe_storage(&self.context.address, &key, &value);
            }
            Opcode::JUMP => {
                let dest = self.stack.pop()?;
                return Ok(Flow::Jump(dest));
            }
            Opcode::JUMPI => {
                let dest = self.stack.pop()?;
                let condition = self.stack.pop()?;
                if !condition.is_zero() {
                    return Ok(Flow::Jump(dest));
                }
            }
            Opcode::PC => self.stack.push(U256::from(self.pc))?,
            Opcode::MSIZE => self.stack.push(U256::from(self.memory.size()))?,
            Opcode::GAS => self.stack.push(U256::from(self.gas.remaining()))?,
            Opcode::JUMPDEST => {}

            Opcode::PUSH1
            | Opcode::PUSH2
            | Opcode::PUSH3
            | Opcode::PUSH4
            | Opcode::PUSH5
            | Opcode::PUSH6
            | Opcode::PUSH7
            | Opcode::PUSH8
            | Opcode::PUSH9
            | Opcode::PUSH10
            | Opcode::PUSH11
            | Opcode::PUSH12
            | Opcode::PUSH13
            | Opcode::PUSH14
            | Opcode::PUSH15
            | Opcode::PUSH16
            | Opcode::PUSH17
            | Opcode::PUSH18
            | Opcode::PUSH19
            | Opcode::PUSH20
            | Opcode::PUSH21
            | Opcode::PUSH22
            | Opcode::PUSH23
            | Opcode::PUSH24
            | Opcode::PUSH25
            | Opcode::PUSH26
            | Opcode::PUSH27
            | Opcode::PUSH28
            | Opcode::PUSH29
            | Opcode::PUSH30
            | Opcode::PUSH31
            | Opcode::PUSH32 => {
                let n = opcode.push_bytes();
                // Immediates past the end of code read as zero.
                let bytes = padded_slice(&self.context.code, U256::from(self.pc + 1), n);
                self.stack.push(U256::from_big_endian(&bytes))?;
                return Ok(Flow::Skip(n));
            }

            Opcode::DUP1
            | Opcode::DUP2
            | Opcode::DUP3
            | Opcode::DUP4
            | Opcode::DUP5
            | Opcode::DUP6
            | Opcode::DUP7
            | Opcode::DUP8
            | Opcode::DUP9
            | Opcode::DUP10
            | Opcode::DUP11
            | Opcode::DUP12
            | Opcode::DUP13
            | Opcode::DUP14
            | Opcode::DUP15
            | Opcode::DUP16 => {
                self.stack.dup(opcode.position() - 1)?;
            }

            Opcode::SWAP1
            | Opcode::SWAP2
            | Opcode::SWAP3
            | Opcode::SWAP4
            | Opcode::SWAP5
            | Opcode::SWAP6
            | Opcode::SWAP7
            | Opcode::SWAP8
            | Opcode::SWAP9
            | Opcode::SWAP10
            | Opcode::SWAP11
            | Opcode::SWAP12
            | Opcode::SWAP13
            | Opcode::SWAP14
            | Opcode::SWAP15
            | Opcode::SWAP16 => {
                self.stack.swap(opcode.position())?;
            }

            Opcode::LOG0
            | Opcode::LOG1
            | Opcode::LOG2
            | Opcode::LOG3
            | Opcode::LOG4 => {
                let (offset, len) = memory_range(self.stack.pop()?, self.stack.pop()?);
                let mut topics = Vec::with_capacity(opcode.position());
                for _ in 0..opcode.position() {
                    topics.push(H256::from_word(self.stack.pop()?));
                }
                self.substate.logs.push(LogEntry {
                    address: self.context.address,
                    topics,
                    data: Bytes::from_vec(self.memory.read(offset, len)),
                });
            }

            Opcode::CREATE => self.create(provided_gas, dispatcher)?,
            Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL => {
                self.call(opcode, provided_gas, dispatcher)?
            }
            Opcode::RETURN => {
                let (offset, len) = memory_range(self.stack.pop()?, self.stack.pop()?);
                return Ok(Flow::Stop(Bytes::from_vec(self.memory.read(offset, len))));
            }
            Opcode::SUICIDE => {
                let beneficiary = Address::from_word(self.stack.pop()?);
                let owner = self.context.address;
                let balance = dispatcher.state.balance(&owner);
                dispatcher.state.sub_balance(&owner, balance)?;
                // Sending to itself burns the balance.
                if beneficiary != owner {
                    dispatcher.state.add_balance(&beneficiary, balance);
                }
                self.substate.touched.insert(beneficiary);
                self.substate.suicides.insert(owner);
                return Ok(Flow::Stop(Bytes::new()));
            }
        }
        Ok(Flow::Next)
    }

    fn binary(&mut self, op: impl FnOnce(U256, U256) -> U256) -> EvmResult<()> {
        let a = self.stack.pop()?;
        let b = self.stack.pop()?;
        self.stack.push(op(a, b))
    }

    fn create(&mut self, provided_gas: u64, dispatcher: &mut CallDispatcher<'_>) -> EvmResult<()> {
        let value = self.stack.pop()?;
        let (offset, len) = memory_range(self.stack.pop()?, self.stack.pop()?);
        let owner = self.context.address;

        let nonce = dispatcher.state.nonce(&owner);
        let address = contract_address(&owner, &nonce);

        if let Err(reason) = dispatcher.check_invoke(self.context.depth, &owner, value) {
            self.gas.return_unused(provided_gas);
            self.record_rejected(CallKind::Create, owner, address, value, provided_gas, reason);
            return self.stack.push(U256::zero());
        }
        dispatcher.state.inc_nonce(&owner);

        let outcome = dispatcher.create(CreateParams {
            creator: owner,
            address,
            value,
            init_code: Bytes::from_vec(self.memory.read(offset, len)),
            gas: provided_gas,
            depth: self.context.depth + 1,
        })?;
        self.gas.return_unused(outcome.gas_left);
        self.record_call(
            CallKind::Create,
            owner,
            address,
            value,
            provided_gas,
            outcome.gas_left,
            Bytes::new(),
            outcome.result.as_ref().err().copied(),
            outcome.substate,
        );

        let pushed = if outcome.result.is_ok() {
            address.to_word()
        } else {
            U256::zero()
        };
        self.stack.push(pushed)
    }

    fn call(
        &mut self,
        opcode: Opcode,
        provided_gas: u64,
        dispatcher: &mut CallDispatcher<'_>,
    ) -> EvmResult<()> {
        let _requested = self.stack.pop()?;
        let target = Address::from_word(self.stack.pop()?);
        let value = if opcode == Opcode::DELEGATECALL {
            None
        } else {
            Some(self.stack.pop()?)
        };
        let (in_offset, in_len) = memory_range(self.stack.pop()?, self.stack.pop()?);
        let (out_offset, out_len) = memory_range(self.stack.pop()?, self.stack.pop()?);
        let owner = self.context.address;
        let kind = match opcode {
            Opcode::CALL => CallKind::Call,
            Opcode::CALLCODE => CallKind::CallCode,
            _ => CallKind::DelegateCall,
        };

        // The stipend is part of the callee's gas even when it never runs.
        let stipend = match value {
            Some(value) if !value.is_zero() => dispatcher.schedule.call_stipend,
            _ => 0,
        };
        let gas = provided_gas + stipend;

        let transferred = value.unwrap_or_default();
        if let Err(reason) = dispatcher.check_invoke(self.context.depth, &owner, transferred) {
            self.gas.return_unused(gas);
            self.record_rejected(kind, owner, target, transferred, gas, reason);
            return self.stack.push(U256::zero());
        }
        let data = Bytes::from_vec(self.memory.read(in_offset, in_len));

        let params = match kind {
            CallKind::Call => CallParams {
                kind: CallKind::Call,
                caller: owner,
                address: target,
                code_address: target,
                value: transferred,
                transfer: true,
                data,
                gas,
                depth: self.context.depth + 1,
            },
            CallKind::CallCode => CallParams {
                kind: CallKind::CallCode,
                caller: owner,
                address: owner,
                code_address: target,
                value: transferred,
                transfer: true,
                data,
                gas,
                depth: self.context.depth + 1,
            },
            _ => CallParams {
                kind: CallKind::DelegateCall,
                caller: self.context.caller,
                address: owner,
                code_address: target,
                value: self.context.value,
                transfer: false,
                data,
                gas,
                depth: self.context.depth + 1,
            },
        };
        let outcome = dispatcher.call(params)?;
        self.gas.return_unused(outcome.gas_left);

        let output = outcome.result.clone().unwrap_or_default();
        let copied = out_len.min(output.len());
        self.memory.write(out_offset, &output[..copied]);

        let success = outcome.result.is_ok();
        self.record_call(
            kind,
            owner,
            target,
            transferred,
            gas,
            outcome.gas_left,
            output,
            outcome.result.err(),
            outcome.substate,
        );
        self.stack.push(word::bool_to_word(success))
    }

    /// Folds a finished child into this frame. A failed child leaves only
    /// its call record behind.
    #[allow(clippy::too_many_arguments)]
    fn record_call(
        &mut self,
        kind: CallKind,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        gas_left: u64,
        output: Bytes,
        error: Option<HaltReason>,
        mut child: Substate,
    ) {
        let calls = std::mem::take(&mut child.internal_calls);
        if error.is_none() {
            self.substate.accrue(child);
        }
        self.substate.internal_calls.push(InternalCall {
            kind,
            from,
            to,
            value,
            gas,
            gas_used: gas.saturating_sub(gas_left),
            output,
            error,
            calls: if error.is_none() { calls } else { Vec::new() },
        });
    }

    /// A nested invocation refused before it ran: it used no gas and has no
    /// children.
    fn record_rejected(
        &mut self,
        kind: CallKind,
        from: Address,
        to: Address,
        value: U256,
        gas: u64,
        reason: HaltReason,
    ) {
        self.substate.internal_calls.push(InternalCall {
            kind,
            from,
            to,
            value,
            gas,
            gas_used: 0,
            output: Bytes::new(),
            error: Some(reason),
            calls: Vec::new(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_dests_skip_push_data() {
        // PUSH1 0x5b, JUMPDEST, PUSH2 0x5b 0x5b, JUMPDEST
        let code = [0x60, 0x5b, 0x5b, 0x61, 0x5b, 0x5b, 0x5b];
        let dests = analyze_jump_dests(&code);
        assert_eq!(dests, [2usize, 6].into_iter().collect());
    }

    #[test]
    fn test_truncated_push_at_end_of_code() {
        let dests = analyze_jump_dests(&[0x7f, 0x5b]);
        assert!(dests.is_empty());
        assert_eq!(padded_slice(&[0x7f, 0xaa], U256::one(), 3), vec![0xaa, 0, 0]);
    }

    #[test]
    fn test_memory_range_normalises_empty() {
        assert_eq!(memory_range(U256::MAX, U256::zero()), (0, 0));
        assert_eq!(memory_range(U256::from(4), U256::from(2)), (4, 2));
    }
}
