//! neutron-core - Core library for Neutron
//!
//! This crate contains the save synchronization subsystem shared by the
//! Neutron CLI and API server: the client-side sync engine and session
//! supervisor, the local state store, and the server-side versioned save
//! store and playtime ledger.

pub mod config;
pub mod db;
pub mod error;
pub mod launch;
pub mod local_state;
pub mod models;
pub mod storage;
pub mod sync;
pub mod util;

pub use error::{Error, Result};
pub use models::{GameId, PlatformId, PlaytimeRecord, SaveVersion, SaveVersionInfo};
