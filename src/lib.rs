//! `rate-odds` library crate.
//!
//! Turns short-term interest-rate futures quotes into a probability
//! distribution over a central bank's next policy decision.
//!
//! The binary (`odds`) is a thin wrapper around this library so that:
//!
//! - the engine is testable without spawning processes
//! - I/O collaborators (YAML config, quote CSV, report JSON) stay swappable
//! - code stays easy to navigate as more institutions are added

pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod report;
