//! Domain types used throughout the engine.
//!
//! This module defines:
//!
//! - identifiers (`MeetingId`, `ContractId`, `ScenarioLabel`)
//! - the institution configuration (`InstitutionConfig` and its parts)
//! - input quotes (`ContractQuote`, `QuoteTable`)
//! - derived values and the final `Report`

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
