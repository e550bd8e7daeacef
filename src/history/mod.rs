//! Transaction log: invertible records, bounded undo/redo storage.

pub mod log;
pub mod record;

pub use log::{TransactionLog, DEFAULT_DEPTH};
pub use record::TransactionRecord;
