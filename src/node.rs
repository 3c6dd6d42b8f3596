use std::collections::{HashMap, VecDeque};
use anyhow::{Result, Context};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{info, warn, debug};

use ethereum_types::{Address, H256};
use ethereum_core::{Block, Header, Receipt, Transaction};
use ethereum_evm::{
    AccountState, BlockContext, BlockProcessor, ExecutionResult, ForkSchedule, MemoryState,
    PrecompiledRegistry, RuleSet, StructLog, StructLogger, TransactionExecutor,
};

use crate::config::Config;
use crate::genesis::Genesis;

/// BLOCKHASH can see this many ancestors.
const BLOCK_HASH_WINDOW: usize = 256;

/// Node status summary
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeInfo {
    pub name: String,
    pub chain_id: u64,
    pub head_number: u64,
    pub head_hash: H256,
    pub state_root: H256,
}

/// A block that made it onto the chain.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportedBlock {
    pub number: u64,
    pub hash: H256,
    pub gas_used: u64,
    pub state_root: H256,
    pub receipts: Vec<Receipt>,
}

/// Result of replaying one transaction with the struct logger attached.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionTrace {
    pub receipt: Receipt,
    pub gas_used: u64,
    pub failed: bool,
    pub return_value: ethereum_types::Bytes,
    pub struct_logs: Vec<StructLog>,
}

/// Chain head, world state and receipts of every imported block.
pub struct Node {
    config: Config,
    rules: ForkSchedule,
    precompiles: PrecompiledRegistry,
    state: MemoryState,
    head: Header,
    /// Parent first.
    last_hashes: VecDeque<H256>,
    receipts: HashMap<H256, Vec<Receipt>>,
    block_events: broadcast::Sender<ImportedBlock>,
}

impl Node {
    /// Create a node whose chain starts at `genesis`
    pub fn new(config: Config, genesis: &Genesis) -> Result<Self> {
        info!("Initializing node {}", config.node.name);

        let rules = genesis.fork_schedule();
        if rules.chain_id != config.chain.chain_id {
            warn!(
                "Genesis chain id {} overrides configured chain id {}",
                rules.chain_id, config.chain.chain_id
            );
        }

        let mut state = MemoryState::new();
        let head = genesis.apply(&mut state)
            .context("Failed to apply genesis")?;
        let (block_events, _) = broadcast::channel(100);

        info!(hash = %head.hash(), state_root = %head.state_root, "Genesis applied");

        Ok(Self {
            config,
            rules,
            precompiles: PrecompiledRegistry::frontier(),
            state,
            head,
            last_hashes: VecDeque::with_capacity(BLOCK_HASH_WINDOW),
            receipts: HashMap::new(),
            block_events,
        })
    }

    pub fn info(&self) -> NodeInfo {
        NodeInfo {
            name: self.config.node.name.clone(),
            chain_id: self.rules.chain_id,
            head_number: self.head.number,
            head_hash: self.head.hash(),
            state_root: self.state.state_root(),
        }
    }

    pub fn head(&self) -> &Header {
        &self.head
    }

    pub fn state(&self) -> &MemoryState {
        &self.state
    }

    pub fn receipts(&self, block_hash: &H256) -> Option<&[Receipt]> {
        self.receipts.get(block_hash).map(Vec::as_slice)
    }

    /// Subscribe to imported blocks
    pub fn subscribe_blocks(&self) -> broadcast::Receiver<ImportedBlock> {
        self.block_events.subscribe()
    }

    /// Executes `block` on top of the head. Nothing changes unless the
    /// block links to the head and every transaction in it is valid.
    pub fn import_block(&mut self, block: &Block) -> Result<ImportedBlock> {
        let header = &block.header;
        let head_hash = self.head.hash();
        if header.number != self.head.number + 1 {
            anyhow::bail!(
                "Block number {} does not follow head {}",
                header.number, self.head.number
            );
        }
        if header.parent_hash != head_hash {
            anyhow::bail!(
                "Block {} parent {} is not the head {}",
                header.number, header.parent_hash, head_hash
            );
        }

        let view = self.state.start_nested_view();
        let processed = BlockProcessor::new(&self.rules, &self.precompiles).process(
            &mut self.state,
            header,
            &block.transactions,
            self.last_hashes.iter().copied().collect(),
        );
        let outcome = match processed {
            Ok(outcome) if header.gas_used == 0 || header.gas_used == outcome.gas_used => outcome,
            Ok(outcome) => {
                self.state.rollback(view)?;
                anyhow::bail!(
                    "Block {} declares {} gas used but executing it used {}",
                    header.number, header.gas_used, outcome.gas_used
                );
            }
            Err(e) => {
                self.state.rollback(view)?;
                return Err(e).with_context(|| format!("Failed to import block {}", header.number));
            }
        };
        self.state.commit(view)?;

        let hash = block.hash();
        self.last_hashes.push_front(hash);
        self.last_hashes.truncate(BLOCK_HASH_WINDOW);
        self.head = header.clone();
        self.receipts.insert(hash, outcome.receipts.clone());

        info!(
            number = header.number,
            %hash,
            transactions = block.transactions.len(),
            gas_used = outcome.gas_used,
            "Imported block"
        );

        let imported = ImportedBlock {
            number: header.number,
            hash,
            gas_used: outcome.gas_used,
            state_root: outcome.state_root,
            receipts: outcome.receipts,
        };
        // No subscribers is fine.
        let _ = self.block_events.send(imported.clone());
        Ok(imported)
    }

    /// Replays `tx` in a pending block on top of the head with step tracing
    /// and discards the resulting state. With `sender` set the signature is
    /// not checked.
    pub fn trace_transaction(
        &mut self,
        tx: &Transaction,
        sender: Option<Address>,
    ) -> Result<TransactionTrace> {
        let number = self.head.number + 1;
        let schedule = self.rules.schedule(number);
        let block = BlockContext {
            coinbase: self.head.beneficiary,
            number,
            timestamp: self.head.timestamp,
            difficulty: self.head.difficulty,
            gas_limit: self.head.gas_limit,
            gas_used: 0,
            last_hashes: self.last_hashes.iter().copied().collect(),
        };
        let mut logger = StructLogger::new(self.config.execution.trace_config());

        let view = self.state.start_nested_view();
        let executed = {
            let mut executor = TransactionExecutor::new(&mut self.state, &schedule, &self.precompiles)
                .with_observer(&mut logger);
            match sender {
                Some(sender) => executor.execute_from(sender, tx, &block),
                None => executor.execute(tx, &block),
            }
        };
        self.state.rollback(view)?;

        let (receipt, result): (Receipt, ExecutionResult) = executed
            .context("Transaction rejected")?;
        debug!(steps = logger.logs().len(), "Traced transaction");

        Ok(TransactionTrace {
            gas_used: receipt.gas_used(),
            failed: !result.is_success(),
            return_value: result.output,
            struct_logs: logger.into_logs(),
            receipt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethereum_crypto::{secret_from_slice, secret_to_address, SecretKey};
    use ethereum_types::{Bytes, U256};

    fn secret() -> SecretKey {
        secret_from_slice(&[0x44; 32]).unwrap()
    }

    fn dev_node() -> Node {
        let genesis = Genesis::dev(1337, [(secret_to_address(&secret()), U256::exp10(18))]);
        Node::new(Config::for_network("dev").unwrap(), &genesis).unwrap()
    }

    fn next_block(node: &Node, transactions: Vec<Transaction>) -> Block {
        Block::new(
            Header {
                parent_hash: node.head().hash(),
                number: node.head().number + 1,
                gas_limit: 8_000_000,
                beneficiary: Address::from_low_u64(0xc0ffee),
                ..Default::default()
            },
            transactions,
        )
    }

    fn transfer(nonce: u64, value: u64) -> Transaction {
        Transaction {
            nonce: U256::from(nonce),
            gas_price: U256::from(1_000),
            gas_limit: U256::from(21000),
            to: Some(Address::from_low_u64(0xbeef)),
            value: U256::from(value),
            data: Bytes::new(),
            v: 0,
            r: U256::zero(),
            s: U256::zero(),
        }
        .sign(&secret(), Some(1337))
        .unwrap()
    }

    #[test]
    fn test_import_links_blocks() {
        let mut node = dev_node();
        let mut events = node.subscribe_blocks();

        let block = next_block(&node, vec![transfer(0, 5), transfer(1, 7)]);
        let imported = node.import_block(&block).unwrap();

        assert_eq!(imported.number, 1);
        assert_eq!(imported.gas_used, 42000);
        assert_eq!(node.head().number, 1);
        assert_eq!(node.receipts(&block.hash()).unwrap().len(), 2);
        assert_eq!(node.state().balance(&Address::from_low_u64(0xbeef)), U256::from(12));
        assert_eq!(events.try_recv().unwrap().hash, block.hash());

        let stale = Block::new(block.header.clone(), Vec::new());
        assert!(node.import_block(&stale).is_err());
    }

    #[test]
    fn test_rejected_block_leaves_head() {
        let mut node = dev_node();
        let root = node.info().state_root;

        let block = next_block(&node, vec![transfer(0, 5), transfer(5, 7)]);
        assert!(node.import_block(&block).is_err());

        let mut wrong_gas = next_block(&node, vec![transfer(0, 5)]);
        wrong_gas.header.gas_used = 1;
        assert!(node.import_block(&wrong_gas).is_err());

        assert_eq!(node.head().number, 0);
        assert_eq!(node.info().state_root, root);
    }

    #[test]
    fn test_trace_does_not_persist() {
        let mut node = dev_node();
        let root = node.info().state_root;

        let trace = node.trace_transaction(&transfer(0, 5), None).unwrap();

        assert!(!trace.failed);
        assert_eq!(trace.gas_used, 21000);
        assert!(trace.struct_logs.is_empty());
        assert_eq!(node.info().state_root, root);
    }
}
