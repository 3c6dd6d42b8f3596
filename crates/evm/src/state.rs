//! Account state as seen by the machine.
//!
//! [`AccountState`] is the boundary to whatever stores accounts. Every frame
//! runs inside a nested view opened with [`AccountState::start_nested_view`]
//! and closed by exactly one of `commit` or `rollback`, innermost first.

use ethereum_crypto::{empty_code_hash, keccak256};
use ethereum_rlp::{Encode, Encoder};
use ethereum_types::{Address, Bytes, H256, U256};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("View {got} closed out of order, innermost open view is {expected}")]
    ViewOutOfOrder { expected: u64, got: u64 },

    #[error("No open view to close")]
    NoOpenView,

    #[error("Insufficient balance for {address}: has {balance}, needs {required}")]
    InsufficientBalance {
        address: Address,
        balance: U256,
        required: U256,
    },
}

pub type StateResult<T> = Result<T, StateError>;

/// Handle for an open nested view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StateView(u64);

impl StateView {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    pub balance: U256,
    pub nonce: U256,
    pub code: Bytes,
    pub storage: BTreeMap<H256, H256>,
}

impl Account {
    pub fn with_balance(balance: U256) -> Self {
        Account {
            balance,
            ..Default::default()
        }
    }

    /// No balance, no nonce, no code.
    pub fn is_empty(&self) -> bool {
        self.balance.is_zero() && self.nonce.is_zero() && self.code.is_empty()
    }

    pub fn code_hash(&self) -> H256 {
        if self.code.is_empty() {
            empty_code_hash()
        } else {
            keccak256(&self.code)
        }
    }

    pub fn storage_root(&self) -> H256 {
        let mut encoder = Encoder::new();
        encoder.encode_list_with(|list| {
            for (key, value) in &self.storage {
                list.encode_list_with(|pair| {
                    key.encode(pair);
                    value.encode(pair);
                });
            }
        });
        keccak256(&encoder.finish())
    }
}

pub trait AccountState {
    fn exists(&self, address: &Address) -> bool;

    /// True for missing accounts as well as existing empty ones.
    fn is_empty(&self, address: &Address) -> bool;

    fn balance(&self, address: &Address) -> U256;

    fn nonce(&self, address: &Address) -> U256;

    fn code(&self, address: &Address) -> Bytes;

    fn storage_at(&self, address: &Address, key: &H256) -> H256;

    fn set_storage(&mut self, address: Address, key: H256, value: H256);

    /// Credits `amount`, creating the account if needed.
    fn add_balance(&mut self, address: &Address, amount: U256);

    fn sub_balance(&mut self, address: &Address, amount: U256) -> StateResult<()>;

    fn set_nonce(&mut self, address: &Address, nonce: U256);

    fn inc_nonce(&mut self, address: &Address) {
        let nonce = self.nonce(address);
        self.set_nonce(address, nonce.overflowing_add(U256::one()).0);
    }

    fn set_code(&mut self, address: &Address, code: Bytes);

    /// Makes a fresh account at `address`. A balance already sent there is
    /// kept; nonce, code and storage are reset.
    fn create_account(&mut self, address: &Address);

    fn delete_account(&mut self, address: &Address);

    fn transfer_balance(&mut self, from: &Address, to: &Address, amount: U256) -> StateResult<()> {
        self.sub_balance(from, amount)?;
        self.add_balance(to, amount);
        Ok(())
    }

    fn start_nested_view(&mut self) -> StateView;

    /// Folds the innermost view into its parent.
    fn commit(&mut self, view: StateView) -> StateResult<()>;

    /// Discards every change made since the innermost view was opened.
    fn rollback(&mut self, view: StateView) -> StateResult<()>;

    /// Commitment to the full account set.
    fn state_root(&self) -> H256;
}

#[derive(Debug, Default)]
struct Checkpoint {
    view: u64,
    /// Account values before the first write in this view; `None` marks an
    /// account that did not exist.
    prior: HashMap<Address, Option<Account>>,
}

/// In-memory account set with checkpointed nested views.
#[derive(Debug, Default)]
pub struct MemoryState {
    accounts: HashMap<Address, Account>,
    checkpoints: Vec<Checkpoint>,
    next_view: u64,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs an account outside of any view. Used to seed genesis state.
    pub fn insert_account(&mut self, address: Address, account: Account) {
        self.note(&address);
        self.accounts.insert(address, account);
    }

    pub fn account(&self, address: &Address) -> Option<&Account> {
        self.accounts.get(address)
    }

    /// Accounts ordered by address.
    pub fn accounts(&self) -> BTreeMap<Address, Account> {
        self.accounts.iter().map(|(a, acc)| (*a, acc.clone())).collect()
    }

    pub fn open_views(&self) -> usize {
        self.checkpoints.len()
    }

    fn note(&mut self, address: &Address) {
        if let Some(checkpoint) = self.checkpoints.last_mut() {
            checkpoint
                .prior
                .entry(*address)
                .or_insert_with(|| self.accounts.get(address).cloned());
        }
    }

    fn account_mut(&mut self, address: &Address) -> &mut Account {
        self.note(address);
        self.accounts.entry(*address).or_default()
    }

    fn pop_checkpoint(&mut self, view: StateView) -> StateResult<Checkpoint> {
        let top = self.checkpoints.last().ok_or(StateError::NoOpenView)?;
        if top.view != view.0 {
            return Err(StateError::ViewOutOfOrder {
                expected: top.view,
                got: view.0,
            });
        }
        self.checkpoints.pop().ok_or(StateError::NoOpenView)
    }
}

impl AccountState for MemoryState {
    fn exists(&self, address: &Address) -> bool {
        self.accounts.contains_key(address)
    }

    fn is_empty(&self, address: &Address) -> bool {
        self.accounts.get(address).map_or(true, Account::is_empty)
    }

    fn balance(&self, address: &Address) -> U256 {
        self.accounts.get(address).map(|a| a.balance).unwrap_or_default()
    }

    fn nonce(&self, address: &Address) -> U256 {
        self.accounts.get(address).map(|a| a.nonce).unwrap_or_default()
    }

    fn code(&self, address: &Address) -> Bytes {
        self.accounts
            .get(address)
            .map(|a| a.code.clone())
            .unwrap_or_default()
    }

    fn storage_at(&self, address: &Address, key: &H256) -> H256 {
        self.accounts
            .get(address)
            .and_then(|a| a.storage.get(key))
            .copied()
            .unwrap_or_default()
    }

    fn set_storage(&mut self, address: Address, key: H256, value: H256) {
        let account = self.account_mut(&address);
        if value.is_zero() {
            account.storage.remove(&key);
        } else {
            account.storage.insert(key, value);
        }
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        let account = self.account_mut(address);
        account.balance = account.balance.overflowing_add(amount).0;
    }

    fn sub_balance(&mut self, address: &Address, amount: U256) -> StateResult<()> {
        let balance = self.balance(address);
        if balance < amount {
            return Err(StateError::InsufficientBalance {
                address: *address,
                balance,
                required: amount,
            });
        }
        if amount.is_zero() {
            return Ok(());
        }
        self.account_mut(address).balance = balance - amount;
        Ok(())
    }

    fn set_nonce(&mut self, address: &Address, nonce: U256) {
        self.account_mut(address).nonce = nonce;
    }

    fn set_code(&mut self, address: &Address, code: Bytes) {
        self.account_mut(address).code = code;
    }

    fn create_account(&mut self, address: &Address) {
        let balance = self.balance(address);
        *self.account_mut(address) = Account::with_balance(balance);
    }

    fn delete_account(&mut self, address: &Address) {
        self.note(address);
        self.accounts.remove(address);
    }

    fn start_nested_view(&mut self) -> StateView {
        let view = self.next_view;
        self.next_view += 1;
        self.checkpoints.push(Checkpoint {
            view,
            prior: HashMap::new(),
        });
        trace!(view, depth = self.checkpoints.len(), "opened state view");
        StateView(view)
    }

    fn commit(&mut self, view: StateView) -> StateResult<()> {
        let checkpoint = self.pop_checkpoint(view)?;
        if let Some(parent) = self.checkpoints.last_mut() {
            // The parent keeps its own older snapshot where it has one.
            for (address, prior) in checkpoint.prior {
                parent.prior.entry(address).or_insert(prior);
            }
        }
        trace!(view = view.0, "committed state view");
        Ok(())
    }

    fn rollback(&mut self, view: StateView) -> StateResult<()> {
        let checkpoint = self.pop_checkpoint(view)?;
        for (address, prior) in checkpoint.prior {
            match prior {
                Some(account) => {
                    self.accounts.insert(address, account);
                }
                None => {
                    self.accounts.remove(&address);
                }
            }
        }
        trace!(view = view.0, "rolled back state view");
        Ok(())
    }

    fn state_root(&self) -> H256 {
        let mut addresses: Vec<&Address> = self.accounts.keys().collect();
        addresses.sort();

        let mut encoder = Encoder::new();
        encoder.encode_list_with(|list| {
            for address in addresses {
                let account = &self.accounts[address];
                list.encode_list_with(|entry| {
                    address.encode(entry);
                    account.nonce.encode(entry);
                    account.balance.encode(entry);
                    account.storage_root().encode(entry);
                    account.code_hash().encode(entry);
                });
            }
        });
        keccak256(&encoder.finish())
    }
}
