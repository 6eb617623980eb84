//! Shared foundations: error taxonomy, startup configuration, shutdown flag.

pub mod config;
pub mod errors;
pub mod shutdown;
