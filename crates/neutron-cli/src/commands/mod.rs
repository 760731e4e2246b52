pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod emulator;
pub mod launch;
pub mod library;
pub mod sync;
