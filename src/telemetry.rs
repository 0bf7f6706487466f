//! Sensor telemetry frame codec.
//!
//! Wire format — one reading per line-oriented frame:
//! ```text
//! P<float>F<float>V<float>?
//! ```
//! `P`, `F` and `V` open the pressure, flow and volume fields; `?`
//! terminates the frame. The decoder is a three-flag character scan:
//! each marker switches which buffer subsequent characters land in, and
//! the marker itself is stripped from the front of its buffer before
//! numeric parsing.
//!
//! The legacy decoder let malformed frames fall through as `NaN`; this one
//! rejects them with a typed [`DecodeError`] so a bad frame can never feed
//! the compliance estimator a silent `NaN`.

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, FrameField};

/// One decoded telemetry reading. Immutable once created; samples carry no
/// identity beyond arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Airway pressure (cmH2O).
    pub pressure: f32,
    /// Gas flow (L/min).
    pub flow: f32,
    /// Delivered volume (mL).
    pub volume: f32,
}

/// Decode one telemetry frame.
pub fn decode_frame(frame: &str) -> Result<Sample, DecodeError> {
    let mut in_pressure = false;
    let mut in_flow = false;
    let mut in_volume = false;

    let mut pressure_buf = String::new();
    let mut flow_buf = String::new();
    let mut volume_buf = String::new();

    for ch in frame.chars() {
        match ch {
            'P' => in_pressure = true,
            'F' => {
                in_pressure = false;
                in_flow = true;
            }
            'V' => {
                in_flow = false;
                in_volume = true;
            }
            '?' => in_volume = false,
            _ => {}
        }

        // The marker character lands in its own buffer (the flag is already
        // set) and is stripped again in parse_field.
        if in_pressure {
            pressure_buf.push(ch);
        } else if in_flow {
            flow_buf.push(ch);
        } else if in_volume {
            volume_buf.push(ch);
        }
    }

    Ok(Sample {
        pressure: parse_field(&pressure_buf, FrameField::Pressure)?,
        flow: parse_field(&flow_buf, FrameField::Flow)?,
        volume: parse_field(&volume_buf, FrameField::Volume)?,
    })
}

/// Encode a sample into the frame grammar. `decode_frame` inverts this
/// within floating-point print precision.
pub fn encode_frame(sample: &Sample) -> String {
    format!("P{}F{}V{}?", sample.pressure, sample.flow, sample.volume)
}

/// Strip the leading marker and parse the remaining payload.
///
/// `f32::from_str` happily accepts "nan" and "inf"; those are rejected
/// here so a frame can never smuggle a non-finite value into the engine.
fn parse_field(buf: &str, field: FrameField) -> Result<f32, DecodeError> {
    let Some(payload) = buf.get(1..) else {
        return Err(DecodeError::MissingField(field));
    };
    match payload.trim().parse::<f32>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(DecodeError::InvalidNumber(field)),
    }
}
