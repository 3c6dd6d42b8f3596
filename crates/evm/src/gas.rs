//! Gas accounting.
//!
//! Costs are computed from the opcode, its operands and the active
//! [`Schedule`] before anything executes. Intermediate arithmetic is done in
//! `U256` with saturation so that absurd operands simply exceed the gas
//! available instead of wrapping.

use crate::error::EvmResult;
use crate::execution::HaltReason;
use crate::memory::{required_size, Memory};
use crate::opcodes::{GasTier, Opcode};
use crate::schedule::Schedule;
use crate::stack::Stack;
use crate::state::AccountState;
use ethereum_types::{Address, HashExt, UintExt, H256, U256};

/// Remaining gas of a frame.
#[derive(Debug, Clone, Copy)]
pub struct Gas {
    limit: u64,
    used: u64,
}

impl Gas {
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Charges `amount` in full or not at all.
    pub fn consume(&mut self, amount: u64) -> EvmResult<()> {
        let new_used = self.used.saturating_add(amount);
        if new_used > self.limit {
            Err(HaltReason::OutOfGas.into())
        } else {
            self.used = new_used;
            Ok(())
        }
    }

    /// Returns gas a finished callee did not spend.
    pub fn return_unused(&mut self, amount: u64) {
        self.used = self.used.saturating_sub(amount);
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.used
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }
}

/// What an instruction costs before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InstructionCost {
    /// Total charge, including memory growth and gas handed to a callee.
    pub gas: u64,
    /// Byte size memory must grow to, zero if untouched.
    pub memory_size: usize,
    /// Gas forwarded to a nested call or create.
    pub provided_gas: Option<u64>,
}

/// `memory_gas * w + w^2 / quad_coeff_div` for `w` words.
pub fn memory_cost(schedule: &Schedule, words: usize) -> U256 {
    let words = U256::from(words);
    words * U256::from(schedule.memory_gas) + words * words / U256::from(schedule.quad_coeff_div)
}

/// Cost of growing memory from `current` to `new_size` bytes. Zero when it
/// does not grow.
pub fn memory_expansion_cost(schedule: &Schedule, current: usize, new_size: usize) -> U256 {
    if new_size <= current {
        return U256::zero();
    }
    let old_words = current.div_ceil(32);
    let new_words = new_size.div_ceil(32);
    memory_cost(schedule, new_words) - memory_cost(schedule, old_words)
}

fn words(len: U256) -> U256 {
    let whole = len / 32;
    if (len % 32).is_zero() {
        whole
    } else {
        whole + 1
    }
}

pub fn copy_cost(schedule: &Schedule, base: u64, len: U256) -> U256 {
    U256::from(base).saturating_add(U256::from(schedule.copy_gas).saturating_mul(words(len)))
}

pub fn sha3_cost(schedule: &Schedule, len: U256) -> U256 {
    U256::from(schedule.sha3_gas)
        .saturating_add(U256::from(schedule.sha3_word_gas).saturating_mul(words(len)))
}

pub fn log_cost(schedule: &Schedule, topics: usize, len: U256) -> U256 {
    U256::from(schedule.log_gas)
        .saturating_add(U256::from(schedule.log_topic_gas * topics as u64))
        .saturating_add(U256::from(schedule.log_data_gas).saturating_mul(len))
}

pub fn exp_cost(schedule: &Schedule, exponent: U256) -> U256 {
    U256::from(schedule.exp_gas + schedule.exp_byte_gas * exponent.byte_len() as u64)
}

/// `(cost, refund)` of writing `new` over `current`.
pub fn sstore_cost(schedule: &Schedule, current: &H256, new: &H256) -> (u64, u64) {
    if current.is_zero() && !new.is_zero() {
        (schedule.sstore_set_gas, 0)
    } else if !current.is_zero() && new.is_zero() {
        (schedule.sstore_reset_gas, schedule.sstore_refund_gas)
    } else {
        (schedule.sstore_reset_gas, 0)
    }
}

/// Fixed cost of including a transaction.
pub fn intrinsic_gas(schedule: &Schedule, data: &[u8], is_create: bool) -> u64 {
    let base = if is_create {
        schedule.tx_create_gas
    } else {
        schedule.tx_gas
    };
    data.iter().fold(base, |acc, &byte| {
        acc + if byte == 0 {
            schedule.tx_data_zero_gas
        } else {
            schedule.tx_data_non_zero_gas
        }
    })
}

/// Whether a transfer to `target` must pay for creating it.
fn creates_account(schedule: &Schedule, state: &dyn AccountState, target: &Address, value: U256) -> bool {
    if schedule.no_empty {
        !value.is_zero() && state.is_empty(target)
    } else {
        !state.exists(target)
    }
}

/// Prices `opcode` against the current frame without changing anything.
/// Fails with out-of-gas if the total exceeds `remaining`.
#[allow(clippy::too_many_arguments)]
pub fn requirements(
    opcode: Opcode,
    stack: &Stack,
    memory: &Memory,
    schedule: &Schedule,
    state: &dyn AccountState,
    owner: &Address,
    remaining: u64,
) -> EvmResult<InstructionCost> {
    let info = opcode.info();
    let tier = U256::from(schedule.tier_gas(info.tier));

    let mut memory_size = 0usize;
    let cost = match opcode {
        Opcode::EXP => exp_cost(schedule, stack.peek(1)?),
        Opcode::SHA3 => {
            memory_size = required_size(stack.peek(0)?, stack.peek(1)?)?;
            sha3_cost(schedule, stack.peek(1)?)
        }
        Opcode::BALANCE => U256::from(schedule.balance_gas),
        Opcode::EXTCODESIZE => U256::from(schedule.extcodesize_gas),
        Opcode::EXTCODECOPY => {
            memory_size = required_size(stack.peek(1)?, stack.peek(3)?)?;
            copy_cost(schedule, schedule.extcodecopy_base_gas, stack.peek(3)?)
        }
        Opcode::CALLDATACOPY | Opcode::CODECOPY => {
            memory_size = required_size(stack.peek(0)?, stack.peek(2)?)?;
            copy_cost(schedule, schedule.tier_gas(GasTier::VeryLow), stack.peek(2)?)
        }
        Opcode::MLOAD | Opcode::MSTORE => {
            memory_size = required_size(stack.peek(0)?, U256::from(32))?;
            tier
        }
        Opcode::MSTORE8 => {
            memory_size = required_size(stack.peek(0)?, U256::one())?;
            tier
        }
        Opcode::RETURN => {
            memory_size = required_size(stack.peek(0)?, stack.peek(1)?)?;
            tier
        }
        Opcode::SLOAD => U256::from(schedule.sload_gas),
        Opcode::SSTORE => {
            let key = H256::from_word(stack.peek(0)?);
            let current = state.storage_at(owner, &key);
            let new = H256::from_word(stack.peek(1)?);
            U256::from(sstore_cost(schedule, &current, &new).0)
        }
        Opcode::JUMPDEST => U256::from(schedule.jumpdest_gas),
        Opcode::BLOCKHASH => U256::from(schedule.blockhash_gas),
        Opcode::LOG0 | Opcode::LOG1 | Opcode::LOG2 | Opcode::LOG3 | Opcode::LOG4 => {
            memory_size = required_size(stack.peek(0)?, stack.peek(1)?)?;
            log_cost(schedule, opcode.position(), stack.peek(1)?)
        }
        Opcode::SUICIDE => {
            let beneficiary = Address::from_word(stack.peek(0)?);
            let mut cost = schedule.suicide_gas;
            if schedule.suicide_to_new_account_cost > 0
                && creates_account(schedule, state, &beneficiary, state.balance(owner))
            {
                cost += schedule.suicide_to_new_account_cost;
            }
            U256::from(cost)
        }
        Opcode::CREATE => {
            memory_size = required_size(stack.peek(1)?, stack.peek(2)?)?;
            U256::from(schedule.create_gas)
        }
        Opcode::CALL | Opcode::CALLCODE => {
            let target = Address::from_word(stack.peek(1)?);
            let value = stack.peek(2)?;
            memory_size = required_size(stack.peek(3)?, stack.peek(4)?)?
                .max(required_size(stack.peek(5)?, stack.peek(6)?)?);

            let mut cost = schedule.call_gas;
            if !value.is_zero() {
                cost += schedule.call_value_transfer_gas;
            }
            if opcode == Opcode::CALL && creates_account(schedule, state, &target, value) {
                cost += schedule.call_new_account_gas;
            }
            U256::from(cost)
        }
        Opcode::DELEGATECALL => {
            memory_size = required_size(stack.peek(2)?, stack.peek(3)?)?
                .max(required_size(stack.peek(4)?, stack.peek(5)?)?);
            U256::from(schedule.call_gas)
        }
        _ => tier,
    };

    let total = cost.saturating_add(memory_expansion_cost(schedule, memory.size(), memory_size));
    if total > U256::from(remaining) {
        return Err(HaltReason::OutOfGas.into());
    }
    let gas = total.low_u64();
    let available = remaining - gas;

    let provided_gas = match opcode {
        Opcode::CALL | Opcode::CALLCODE | Opcode::DELEGATECALL => Some(
            schedule
                .call_gas_policy
                .call_gas(stack.peek(0)?, available)
                .ok_or(HaltReason::OutOfGas)?,
        ),
        Opcode::CREATE => Some(schedule.call_gas_policy.create_gas(available)),
        _ => None,
    };

    Ok(InstructionCost {
        gas: gas + provided_gas.unwrap_or(0),
        memory_size,
        provided_gas,
    })
}
