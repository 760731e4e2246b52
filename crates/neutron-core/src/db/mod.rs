//! Database layer for the save server

mod connection;
mod migrations;
mod playtime;
mod save_store;

pub use connection::Database;
pub use playtime::{LibSqlPlaytimeLedger, PlaytimeLedger};
pub use save_store::{LibSqlSaveStore, SaveStore};
