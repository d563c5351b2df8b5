//! # Contracts
//!
//! Frozen interface contracts for RFdc multi-tile synchronization: shared data
//! structures, the driver port trait and the error taxonomy.
//! All business crates depend on this crate, reverse dependencies are prohibited.
//!
//! ## Units
//! - Latencies and offsets are in T1 sample-clock ticks (`i32`, as the vendor driver)
//! - `-1` as target latency means measure only

mod converter;
mod driver;
mod error;
mod profile;
mod report;
mod status;
mod sync_config;

pub use converter::{ConverterType, TileMask, MAX_TILES};
pub use driver::RfdcDriver;
pub use error::*;
pub use profile::*;
pub use report::*;
pub use status::{MtsFailureKind, MtsStatus};
pub use sync_config::*;
