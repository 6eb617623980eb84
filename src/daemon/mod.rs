//! Daemon subsystem: supervisor loop and signal handling.

pub mod loop_main;
pub mod signals;

pub use loop_main::{DaemonState, Supervisor};
