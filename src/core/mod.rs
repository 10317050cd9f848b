//! Core library components.
//!
//! Everything here is independent of the command line: key loading, the
//! vault key store, envelope encryption and the SSH agent.

pub mod agent;
pub mod cipher;
pub mod config;
pub mod constants;
pub mod domain;
pub mod fs;
pub mod vault;
