//! The three supervision loops: journal streaming, liveness checking,
//! storage reclamation.

pub mod health;
pub mod journal;
pub mod retention;
