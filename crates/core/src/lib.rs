pub mod block;
pub mod receipt;
pub mod transaction;

pub use block::{Block, Header};
pub use receipt::{LogEntry, Receipt};
pub use transaction::{Transaction, TransactionError};
