//! VentLab ventilation engine.
//!
//! The physiological calculation and safety-validation core of the VentLab
//! mechanical-ventilation simulator: breath-cycle timing and flow/pressure
//! derivations, streaming lung-compliance estimation, configuration safety
//! gating, and the sensor telemetry frame codec. Everything here is
//! synchronous, allocation-bounded on the telemetry path, and free of I/O —
//! the host platform owns transport, rendering and persistence.

#![deny(unused_must_use)]

pub mod compliance;
pub mod config;
pub mod error;
pub mod filter;
pub mod safety;
pub mod telemetry;
pub mod timing;

pub use compliance::{ComplianceEstimator, Recalibration};
pub use config::{VentMode, VentilatorSettings};
pub use error::{ComplianceError, DecodeError, Error, Result, TimingError};
pub use safety::{
    PatientClass, Severity, ValidationReport, validate, validate_with_cycle_measurement,
};
pub use telemetry::{Sample, decode_frame, encode_frame};
