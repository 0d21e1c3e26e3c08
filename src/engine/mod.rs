//! The calculation engine.
//!
//! Responsibilities, leaf-first:
//!
//! - convert futures prices to implied rates (`rate`)
//! - resolve each meeting to its configured contract (`resolver`)
//! - measure the spread to the current policy rate (`spread`)
//! - grade contract data quality (`quality`)
//! - turn the next meeting's spread into scenario probabilities (`probability`)
//! - optionally derive day-weighted after-meeting rates (`meeting`)
//! - assemble the report (`assemble`), composed in one pass by `run`
//!
//! Nothing here performs I/O.

pub mod assemble;
pub mod meeting;
pub mod probability;
pub mod quality;
pub mod rate;
pub mod resolver;
pub mod run;
pub mod spread;

pub use run::run_institution;

/// Version string written into every report.
pub const ENGINE_VERSION: &str = concat!("rate-odds/", env!("CARGO_PKG_VERSION"));
