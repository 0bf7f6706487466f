//! Unified error types for the ventilation engine.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! host platform's error handling uniform. All variants are `Copy` so they
//! can be cheaply passed through the ingestion loop without allocation.
//!
//! Ordinary validation outcomes are *data* (`ValidationReport`), never
//! errors: only precondition violations (non-positive divisors, seeds) and
//! unparseable telemetry frames surface here.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible operation in the engine funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A timing or flow derivation was asked to divide by a non-positive
    /// quantity.
    Timing(TimingError),
    /// The compliance estimator was fed a physically impossible input.
    Compliance(ComplianceError),
    /// A telemetry frame could not be decoded.
    Decode(DecodeError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timing(e) => write!(f, "timing: {e}"),
            Self::Compliance(e) => write!(f, "compliance: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Timing errors
// ---------------------------------------------------------------------------

/// Precondition violations in the pure timing/flow math.
///
/// The legacy engine let these propagate as `Infinity`/`NaN`; here they are
/// explicit so a caller can never transmit a configuration derived from one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingError {
    /// Respiratory frequency must be a positive breaths-per-minute value.
    NonPositiveFrequency,
    /// Inspiratory time must be positive to derive a flow from a volume.
    NonPositiveInspiratoryTime,
    /// Expiratory time must be positive to form an I:E ratio.
    NonPositiveExpiratoryTime,
    /// Compliance must be positive to derive a tidal volume from pressure.
    NonPositiveCompliance,
}

impl fmt::Display for TimingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositiveFrequency => write!(f, "non-positive frequency"),
            Self::NonPositiveInspiratoryTime => write!(f, "non-positive inspiratory time"),
            Self::NonPositiveExpiratoryTime => write!(f, "non-positive expiratory time"),
            Self::NonPositiveCompliance => write!(f, "non-positive compliance"),
        }
    }
}

impl From<TimingError> for Error {
    fn from(e: TimingError) -> Self {
        Self::Timing(e)
    }
}

// ---------------------------------------------------------------------------
// Compliance estimator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceError {
    /// The divergence check divides by peak pressure.
    NonPositivePeakPressure,
    /// The estimator must be seeded with a positive compliance.
    NonPositiveSeed,
}

impl fmt::Display for ComplianceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPositivePeakPressure => write!(f, "non-positive peak pressure"),
            Self::NonPositiveSeed => write!(f, "non-positive initial compliance"),
        }
    }
}

impl From<ComplianceError> for Error {
    fn from(e: ComplianceError) -> Self {
        Self::Compliance(e)
    }
}

// ---------------------------------------------------------------------------
// Telemetry decode errors
// ---------------------------------------------------------------------------

/// Fields of a telemetry frame, for decode diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameField {
    Pressure,
    Flow,
    Volume,
}

impl fmt::Display for FrameField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pressure => write!(f, "pressure"),
            Self::Flow => write!(f, "flow"),
            Self::Volume => write!(f, "volume"),
        }
    }
}

/// A malformed telemetry frame. The legacy engine yielded silent `NaN`s
/// here; the decoder now rejects the frame instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// The frame never opened the field (marker absent).
    MissingField(FrameField),
    /// The field's payload is not a parseable number.
    InvalidNumber(FrameField),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing {field} field"),
            Self::InvalidNumber(field) => write!(f, "unparseable {field} payload"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
