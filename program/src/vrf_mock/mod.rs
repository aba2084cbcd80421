//! Local VRF coordinator.
//!
//! Implements the coordinator side of [`crate::oracle`] so the lottery can be
//! driven end to end on a local validator or in `solana-program-test`.
//! Words are derived from the request id unless the caller overrides them,
//! which makes it unsuitable for anything but development clusters.

pub mod instruction;
pub mod processor;
pub mod state;

pub use processor::process_instruction;
