//! Cross-crate tests for the murk workspace, plus the modules they share.

pub mod fixtures;

#[cfg(test)]
mod cli;
#[cfg(test)]
mod ir;
