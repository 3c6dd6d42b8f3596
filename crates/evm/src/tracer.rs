//! Optional execution tracing.
//!
//! An [`ExecutionObserver`] is handed to the dispatcher when a transaction is
//! executed and sees every instruction before it runs. Nothing in the
//! machine depends on whether one is attached.

use crate::execution::HaltReason;
use crate::memory::Memory;
use crate::opcodes::Opcode;
use crate::stack::Stack;
use ethereum_types::{Address, Bytes, HashExt, H256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Machine state just before an instruction executes, after it was priced.
pub struct StepInfo<'a> {
    pub pc: usize,
    pub opcode: Opcode,
    /// Gas left before charging.
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: usize,
    pub address: Address,
    pub stack: &'a Stack,
    pub memory: &'a Memory,
}

pub trait ExecutionObserver {
    fn step(&mut self, step: &StepInfo<'_>) {
        let _ = step;
    }

    fn storage_write(&mut self, address: &Address, key: &H256, value: &H256) {
        let _ = (address, key, value);
    }

    /// A frame at `depth` halted exceptionally.
    fn fault(&mut self, depth: usize, reason: &HaltReason) {
        let _ = (depth, reason);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TraceConfig {
    pub disable_stack: bool,
    pub disable_memory: bool,
    pub disable_storage: bool,
}

/// One executed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructLog {
    pub pc: u64,
    pub op: String,
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Vec<H256>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<Bytes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage: Option<BTreeMap<H256, H256>>,
}

/// Records a [`StructLog`] per instruction.
#[derive(Debug, Default)]
pub struct StructLogger {
    config: TraceConfig,
    logs: Vec<StructLog>,
    storage: HashMap<Address, BTreeMap<H256, H256>>,
}

impl StructLogger {
    pub fn new(config: TraceConfig) -> Self {
        StructLogger {
            config,
            logs: Vec::new(),
            storage: HashMap::new(),
        }
    }

    pub fn logs(&self) -> &[StructLog] {
        &self.logs
    }

    pub fn into_logs(self) -> Vec<StructLog> {
        self.logs
    }
}

impl ExecutionObserver for StructLogger {
    fn step(&mut self, step: &StepInfo<'_>) {
        let stack = (!self.config.disable_stack).then(|| {
            // Bottom first, like the machine's own view.
            step.stack
                .snapshot()
                .into_iter()
                .rev()
                .map(H256::from_word)
                .collect()
        });
        let memory = (!self.config.disable_memory).then(|| Bytes::from_slice(step.memory.as_slice()));
        let storage = (!self.config.disable_storage)
            .then(|| self.storage.get(&step.address).cloned().unwrap_or_default());

        self.logs.push(StructLog {
            pc: step.pc as u64,
            op: step.opcode.name().to_string(),
            gas: step.gas,
            gas_cost: step.gas_cost,
            depth: step.depth,
            error: None,
            stack,
            memory,
            storage,
        });
    }

    fn storage_write(&mut self, address: &Address, key: &H256, value: &H256) {
        self.storage.entry(*address).or_default().insert(*key, *value);
    }

    fn fault(&mut self, depth: usize, reason: &HaltReason) {
        if let Some(last) = self.logs.iter_mut().rev().find(|log| log.depth == depth) {
            if last.error.is_none() {
                last.error = Some(reason.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_types::U256;

    #[test]
    fn test_struct_logger_records_steps() {
        let mut stack = Stack::new();
        stack.push(U256::from(1)).unwrap();
        stack.push(U256::from(2)).unwrap();
        let memory = Memory::new();

        let mut logger = StructLogger::new(TraceConfig {
            disable_memory: true,
            ..Default::default()
        });
        logger.step(&StepInfo {
            pc: 4,
            opcode: Opcode::ADD,
            gas: 100,
            gas_cost: 3,
            depth: 1,
            address: Address::zero(),
            stack: &stack,
            memory: &memory,
        });
        logger.fault(1, &HaltReason::OutOfGas);

        let log = &logger.logs()[0];
        assert_eq!(log.op, "ADD");
        assert_eq!(log.stack.as_ref().unwrap()[1], H256::from_low_u64_be(2));
        assert!(log.memory.is_none());
        assert_eq!(log.error.as_deref(), Some("out of gas"));

        let json = serde_json::to_value(log).unwrap();
        assert_eq!(json["gasCost"], 3);
        assert!(json.get("memory").is_none());
    }
}
