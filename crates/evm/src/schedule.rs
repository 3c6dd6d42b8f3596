//! Cost schedule and rule-set parameterisation.
//!
//! A [`Schedule`] fixes every gas constant and behavioural switch for one
//! block. [`RuleSet`] implementations pick the schedule for a block number.

use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How much gas a frame hands to a nested call or create.
pub trait CallGasPolicy: fmt::Debug + Send + Sync {
    /// Gas forwarded to a CALL-family callee given the amount the caller
    /// requested and what the caller has left after paying for the call
    /// itself. `None` means the request cannot be honoured and the caller
    /// runs out of gas.
    fn call_gas(&self, requested: U256, available: u64) -> Option<u64>;

    /// Gas handed to CREATE init code.
    fn create_gas(&self, available: u64) -> u64;
}

/// The callee receives exactly what was requested; asking for more than
/// is available is out-of-gas. CREATE forwards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestedGas;

impl CallGasPolicy for RequestedGas {
    fn call_gas(&self, requested: U256, available: u64) -> Option<u64> {
        if requested > U256::from(available) {
            None
        } else {
            Some(requested.low_u64())
        }
    }

    fn create_gas(&self, available: u64) -> u64 {
        available
    }
}

/// Requests are capped at all but one 64th of the available gas.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllButOneSixtyFourth;

impl AllButOneSixtyFourth {
    fn cap(available: u64) -> u64 {
        available - available / 64
    }
}

impl CallGasPolicy for AllButOneSixtyFourth {
    fn call_gas(&self, requested: U256, available: u64) -> Option<u64> {
        let cap = Self::cap(available);
        if requested > U256::from(cap) {
            Some(cap)
        } else {
            Some(requested.low_u64())
        }
    }

    fn create_gas(&self, available: u64) -> u64 {
        Self::cap(available)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Fork {
    Frontier,
    Homestead,
    TangerineWhistle,
    SpuriousDragon,
}

impl fmt::Display for Fork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Fork::Frontier => "Frontier",
            Fork::Homestead => "Homestead",
            Fork::TangerineWhistle => "TangerineWhistle",
            Fork::SpuriousDragon => "SpuriousDragon",
        };
        f.write_str(name)
    }
}

/// Gas costs and switches for the machine.
#[derive(Debug, Clone)]
pub struct Schedule {
    pub fork: Fork,
    /// Max number of nested calls/creates
    pub max_depth: usize,
    /// Gas prices for instructions in all tiers, indexed by `GasTier::index`
    pub tier_step_gas: [u64; 8],
    pub exp_gas: u64,
    /// Additional `EXP` gas per byte of exponent
    pub exp_byte_gas: u64,
    pub sha3_gas: u64,
    /// Additional `SHA3` gas per word of hashed memory
    pub sha3_word_gas: u64,
    pub sload_gas: u64,
    /// `SSTORE` of a non-zero value into an empty slot
    pub sstore_set_gas: u64,
    /// `SSTORE` over a non-empty slot, or of zero into an empty one
    pub sstore_reset_gas: u64,
    /// Refund for clearing a non-empty slot
    pub sstore_refund_gas: u64,
    pub jumpdest_gas: u64,
    pub log_gas: u64,
    pub log_data_gas: u64,
    pub log_topic_gas: u64,
    pub create_gas: u64,
    pub call_gas: u64,
    /// Free gas granted to a callee receiving value
    pub call_stipend: u64,
    pub call_value_transfer_gas: u64,
    pub call_new_account_gas: u64,
    pub suicide_refund_gas: u64,
    /// Linear memory coefficient
    pub memory_gas: u64,
    /// Divisor of the quadratic memory term
    pub quad_coeff_div: u64,
    /// Per-byte cost of storing returned contract code
    pub create_data_gas: u64,
    /// Largest deployable contract, if limited
    pub create_data_limit: Option<usize>,
    pub tx_gas: u64,
    pub tx_create_gas: u64,
    pub tx_data_zero_gas: u64,
    pub tx_data_non_zero_gas: u64,
    /// Per-word cost of the *COPY instructions
    pub copy_gas: u64,
    pub extcodesize_gas: u64,
    pub extcodecopy_base_gas: u64,
    pub balance_gas: u64,
    pub suicide_gas: u64,
    /// Extra `SUICIDE` cost when the beneficiary must be created
    pub suicide_to_new_account_cost: u64,
    pub blockhash_gas: u64,
    pub have_delegate_call: bool,
    /// Failing to pay for code deposit leaves an empty contract instead of
    /// failing the create
    pub create_empty_on_code_deposit_oog: bool,
    /// Touched accounts that end up empty are deleted
    pub kill_empty: bool,
    /// Empty accounts count as absent for new-account charges
    pub no_empty: bool,
    /// Transaction signatures must have `s` in the lower half order
    pub require_low_s: bool,
    /// Chain id accepted in replay-protected signatures
    pub chain_id: Option<u64>,
    /// Nonce given to freshly created contracts
    pub contract_start_nonce: U256,
    pub call_gas_policy: Arc<dyn CallGasPolicy>,
}

impl Schedule {
    pub fn frontier() -> Schedule {
        Schedule {
            fork: Fork::Frontier,
            max_depth: 1024,
            tier_step_gas: [0, 2, 3, 5, 8, 10, 20, 0],
            exp_gas: 10,
            exp_byte_gas: 10,
            sha3_gas: 30,
            sha3_word_gas: 6,
            sload_gas: 50,
            sstore_set_gas: 20000,
            sstore_reset_gas: 5000,
            sstore_refund_gas: 15000,
            jumpdest_gas: 1,
            log_gas: 375,
            log_data_gas: 8,
            log_topic_gas: 375,
            create_gas: 32000,
            call_gas: 40,
            call_stipend: 2300,
            call_value_transfer_gas: 9000,
            call_new_account_gas: 25000,
            suicide_refund_gas: 24000,
            memory_gas: 3,
            quad_coeff_div: 512,
            create_data_gas: 200,
            create_data_limit: None,
            tx_gas: 21000,
            tx_create_gas: 21000,
            tx_data_zero_gas: 4,
            tx_data_non_zero_gas: 68,
            copy_gas: 3,
            extcodesize_gas: 20,
            extcodecopy_base_gas: 20,
            balance_gas: 20,
            suicide_gas: 0,
            suicide_to_new_account_cost: 0,
            blockhash_gas: 20,
            have_delegate_call: false,
            create_empty_on_code_deposit_oog: true,
            kill_empty: false,
            no_empty: false,
            require_low_s: false,
            chain_id: None,
            contract_start_nonce: U256::zero(),
            call_gas_policy: Arc::new(RequestedGas),
        }
    }

    pub fn homestead() -> Schedule {
        Schedule {
            fork: Fork::Homestead,
            tx_create_gas: 53000,
            have_delegate_call: true,
            create_empty_on_code_deposit_oog: false,
            require_low_s: true,
            ..Schedule::frontier()
        }
    }

    /// EIP-150 repricing.
    pub fn tangerine_whistle() -> Schedule {
        Schedule {
            fork: Fork::TangerineWhistle,
            sload_gas: 200,
            call_gas: 700,
            extcodesize_gas: 700,
            extcodecopy_base_gas: 700,
            balance_gas: 400,
            suicide_gas: 5000,
            suicide_to_new_account_cost: 25000,
            call_gas_policy: Arc::new(AllButOneSixtyFourth),
            ..Schedule::homestead()
        }
    }

    /// EIP-155, 158, 160 and 170.
    pub fn spurious_dragon(chain_id: u64) -> Schedule {
        Schedule {
            fork: Fork::SpuriousDragon,
            exp_byte_gas: 50,
            create_data_limit: Some(24576),
            kill_empty: true,
            no_empty: true,
            chain_id: Some(chain_id),
            contract_start_nonce: U256::one(),
            ..Schedule::tangerine_whistle()
        }
    }

    pub fn for_fork(fork: Fork, chain_id: u64) -> Schedule {
        match fork {
            Fork::Frontier => Schedule::frontier(),
            Fork::Homestead => Schedule::homestead(),
            Fork::TangerineWhistle => Schedule::tangerine_whistle(),
            Fork::SpuriousDragon => Schedule::spurious_dragon(chain_id),
        }
    }

    pub fn tier_gas(&self, tier: crate::opcodes::GasTier) -> u64 {
        self.tier_step_gas[tier.index()]
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Schedule::frontier()
    }
}

/// Yields the schedule active at a block height.
pub trait RuleSet: Send + Sync {
    fn schedule(&self, block_number: u64) -> Schedule;
}

/// Fork activation heights. A fork without a height never activates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForkSchedule {
    pub chain_id: u64,
    pub homestead_block: Option<u64>,
    pub tangerine_whistle_block: Option<u64>,
    pub spurious_dragon_block: Option<u64>,
}

impl ForkSchedule {
    pub fn mainnet() -> Self {
        ForkSchedule {
            chain_id: 1,
            homestead_block: Some(1_150_000),
            tangerine_whistle_block: Some(2_463_000),
            spurious_dragon_block: Some(2_675_000),
        }
    }

    /// Every fork active from genesis.
    pub fn all_from_genesis(chain_id: u64) -> Self {
        ForkSchedule {
            chain_id,
            homestead_block: Some(0),
            tangerine_whistle_block: Some(0),
            spurious_dragon_block: Some(0),
        }
    }

    pub fn fork_at(&self, block_number: u64) -> Fork {
        let active = |height: Option<u64>| height.is_some_and(|h| block_number >= h);
        if active(self.spurious_dragon_block) {
            Fork::SpuriousDragon
        } else if active(self.tangerine_whistle_block) {
            Fork::TangerineWhistle
        } else if active(self.homestead_block) {
            Fork::Homestead
        } else {
            Fork::Frontier
        }
    }
}

impl Default for ForkSchedule {
    fn default() -> Self {
        ForkSchedule::mainnet()
    }
}

impl RuleSet for ForkSchedule {
    fn schedule(&self, block_number: u64) -> Schedule {
        Schedule::for_fork(self.fork_at(block_number), self.chain_id)
    }
}

/// One schedule for every block.
#[derive(Debug, Clone)]
pub struct FixedRules(pub Schedule);

impl RuleSet for FixedRules {
    fn schedule(&self, _block_number: u64) -> Schedule {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requested_gas_policy() {
        let policy = RequestedGas;
        assert_eq!(policy.call_gas(U256::from(100), 100), Some(100));
        assert_eq!(policy.call_gas(U256::from(101), 100), None);
        assert_eq!(policy.call_gas(U256::MAX, 100), None);
        assert_eq!(policy.create_gas(6400), 6400);
    }

    #[test]
    fn test_all_but_one_64th_policy() {
        let policy = AllButOneSixtyFourth;
        assert_eq!(policy.call_gas(U256::from(100), 6400), Some(100));
        assert_eq!(policy.call_gas(U256::MAX, 6400), Some(6300));
        assert_eq!(policy.create_gas(6400), 6300);
    }

    #[test]
    fn test_mainnet_fork_heights() {
        let forks = ForkSchedule::mainnet();
        assert_eq!(forks.fork_at(0), Fork::Frontier);
        assert_eq!(forks.fork_at(1_149_999), Fork::Frontier);
        assert_eq!(forks.fork_at(1_150_000), Fork::Homestead);
        assert_eq!(forks.fork_at(2_463_000), Fork::TangerineWhistle);
        assert_eq!(forks.fork_at(2_675_000), Fork::SpuriousDragon);
    }

    #[test]
    fn test_schedules_differ_by_fork() {
        let frontier = Schedule::frontier();
        let homestead = Schedule::homestead();
        let tw = Schedule::tangerine_whistle();
        let sd = Schedule::spurious_dragon(1);

        assert!(!frontier.have_delegate_call && homestead.have_delegate_call);
        assert_eq!(frontier.tx_create_gas, 21000);
        assert_eq!(homestead.tx_create_gas, 53000);
        assert!(frontier.create_empty_on_code_deposit_oog);
        assert!(!homestead.create_empty_on_code_deposit_oog);
        assert_eq!(tw.call_gas, 700);
        assert_eq!(tw.call_gas_policy.call_gas(U256::MAX, 64), Some(63));
        assert_eq!(sd.create_data_limit, Some(24576));
        assert_eq!(sd.exp_byte_gas, 50);
        assert!(sd.kill_empty && !tw.kill_empty);
        assert_eq!(sd.chain_id, Some(1));
    }

    #[test]
    fn test_unset_forks_never_activate() {
        let forks = ForkSchedule {
            chain_id: 7,
            homestead_block: Some(10),
            tangerine_whistle_block: None,
            spurious_dragon_block: None,
        };
        assert_eq!(forks.fork_at(1_000_000), Fork::Homestead);
        assert_eq!(forks.schedule(5).fork, Fork::Frontier);
    }
}
