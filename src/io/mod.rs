//! Input/output collaborators around the engine.
//!
//! - institution config YAML load + validation (`config`)
//! - quote CSV ingest (`ingest`)
//! - report JSON read/write (`report`)

pub mod config;
pub mod ingest;
pub mod report;

pub use config::*;
pub use ingest::*;
pub use report::*;
