//! # RFdc Driver
//!
//! Reference implementations of the `RfdcDriver` port.
//!
//! Responsibilities:
//! - Scripted, call-recording mock driver for coordinator tests
//! - Deterministic simulated RFdc device for bench runs without hardware
//!
//! The register-level hardware driver is provided by the platform and plugs
//! into the same trait.

pub mod mock_driver;
pub mod simulated;

pub use contracts::{DriverError, RfdcDriver};
pub use mock_driver::{DriverCall, MockConfig, MockRfdc, MockSyncResponse};
pub use simulated::SimulatedRfdc;
