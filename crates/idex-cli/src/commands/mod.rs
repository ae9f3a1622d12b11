//! Subcommands of the `idex` binary.

pub mod batch;
pub mod config;
pub mod extract;
