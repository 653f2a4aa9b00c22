pub mod connection;
pub mod entity;
pub mod ledger;
pub mod memory;
pub mod repository;
pub mod store;

pub use ledger::IdLedger;
pub use memory::MemoryHistoryStore;
pub use repository::SqliteHistoryStore;
pub use store::{HistoryFilter, HistoryRecord, HistoryStats, HistoryStore};
