//! Read-only analyses over murk modules: size/complexity metrics, constant-folded
//! liveness, call-site queries and a small reference interpreter used to check that
//! rewritten modules still behave like the input.

pub mod metrics;
pub mod reachability;
pub mod semantics;
