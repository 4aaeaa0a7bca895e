//! Verification and construction of merged-mining proofs (AuxPoW).
//!
//! A parent chain block proves work for an auxiliary chain by committing to
//! the auxiliary block hash inside its coinbase script. This crate checks
//! that binding and builds the miner-side coinbase carrying it.

#[macro_use]
extern crate log;

pub mod blockchain;
pub mod common;
pub mod errors;
