//! Subcommands of the `murk` binary.

pub mod commands;
