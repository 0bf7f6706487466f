//! Breath-cycle timing and flow/pressure derivations.
//!
//! Pure, stateless math relating the operator-set frequency, inspiratory
//! time and I:E ratio slider to the derived quantities previewed in the
//! configuration UI: cycle split, peak flow and the supply-tank pressure
//! needed to drive it.
//!
//! Several constants are empirical calibration data fitted against the
//! physical ventilator bench and must not be re-derived:
//! the 0.98 flow correction and the tank-pressure quadratic.

use crate::error::TimingError;

/// Empirical correction applied to the ideal square-wave flow.
const FLOW_CORRECTION: f32 = 0.98;

/// Tank-pressure quadratic fit `p = A·q² + B·q + C` (q in L/min, p in bar).
const TANK_A: f32 = 0.0025;
const TANK_B: f32 = 0.2203;
const TANK_C: f32 = -0.5912;

/// One breath cycle split into its phases.
#[derive(Debug, Clone, PartialEq)]
pub struct BreathTiming {
    /// Inspiratory time (s).
    pub inspiratory_time_s: f32,
    /// Expiratory time (s).
    pub expiratory_time_s: f32,
    /// Full cycle time `60 / frequency` (s).
    pub cycle_time_s: f32,
    /// Human-readable I:E label for the branch taken, e.g. `"1:2"`.
    pub ratio_label: String,
}

/// An inspiratory:expiratory ratio with its display form.
#[derive(Debug, Clone, PartialEq)]
pub struct IeRatio {
    /// Raw ratio `inspiratory / expiratory`.
    pub ratio: f32,
    /// Display label: `"1:x"` normally, `"x:1"` when inverted.
    pub label: String,
    /// True when inspiration outlasts expiration.
    pub inverted: bool,
}

/// Quantities derived from a pressure-control configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureControlDerivation {
    /// Expected tidal volume (mL).
    pub tidal_volume_ml: f32,
    /// Peak inspiratory flow (L/min).
    pub max_flow_l_min: f32,
    /// Required supply-tank pressure (bar).
    pub tank_pressure_bar: f32,
}

/// Breath cycle time in seconds: `60 / frequency`.
pub fn cycle_time(frequency_bpm: f32) -> Result<f32, TimingError> {
    if frequency_bpm <= 0.0 {
        return Err(TimingError::NonPositiveFrequency);
    }
    Ok(60.0 / frequency_bpm)
}

/// Expiratory time left in the cycle after inspiration and an optional
/// inspiratory pause.
///
/// The result may be non-positive for inconsistent inputs; range checking
/// is the validator's job, not this function's.
pub fn expiratory_time(
    frequency_bpm: f32,
    inspiratory_time_s: f32,
    inspiratory_pause_s: f32,
) -> Result<f32, TimingError> {
    Ok(cycle_time(frequency_bpm)? - inspiratory_time_s - inspiratory_pause_s)
}

/// I:E ratio from explicit phase times.
pub fn ie_ratio(inspiratory_time_s: f32, expiratory_time_s: f32) -> Result<IeRatio, TimingError> {
    if expiratory_time_s <= 0.0 {
        return Err(TimingError::NonPositiveExpiratoryTime);
    }
    let ratio = inspiratory_time_s / expiratory_time_s;
    if ratio > 1.0 {
        Ok(IeRatio {
            ratio,
            label: format!("{}:1", fmt_ratio_part(ratio)),
            inverted: true,
        })
    } else {
        Ok(IeRatio {
            ratio,
            label: format!("1:{}", fmt_ratio_part(1.0 / ratio)),
            inverted: false,
        })
    }
}

/// Cycle split from the signed I:E ratio slider.
///
/// Slider semantics: `0` → 1:1; `+s` → 1:(1 + s/10); `-s` → (1 + s/10):1.
/// Expiratory pauses are subtracted from the usable cycle before the split.
pub fn from_ratio_slider(
    frequency_bpm: f32,
    slider: i32,
    exp_pause1_s: f32,
    exp_pause2_s: f32,
) -> Result<BreathTiming, TimingError> {
    let cycle_time_s = cycle_time(frequency_bpm)?;
    let usable = cycle_time_s - exp_pause1_s - exp_pause2_s;

    let (insp_fraction, ratio_label) = if slider == 0 {
        (0.5, "1:1".to_string())
    } else if slider > 0 {
        let e = 1.0 + slider as f32 / 10.0;
        (1.0 / (2.0 + slider as f32 / 10.0), format!("1:{}", fmt_ratio_part(e)))
    } else {
        let i = 1.0 + slider.unsigned_abs() as f32 / 10.0;
        (
            i / (2.0 + slider.unsigned_abs() as f32 / 10.0),
            format!("{}:1", fmt_ratio_part(i)),
        )
    };

    let inspiratory_time_s = usable * insp_fraction;
    Ok(BreathTiming {
        inspiratory_time_s,
        expiratory_time_s: usable - inspiratory_time_s,
        cycle_time_s,
        ratio_label,
    })
}

/// Peak inspiratory flow (L/min) delivering `tidal_volume_ml` over
/// `inspiratory_time_s` as a square wave, with the bench-fitted correction.
pub fn max_flow(tidal_volume_ml: f32, inspiratory_time_s: f32) -> Result<f32, TimingError> {
    if inspiratory_time_s <= 0.0 {
        return Err(TimingError::NonPositiveInspiratoryTime);
    }
    Ok(60.0 * tidal_volume_ml / (1000.0 * inspiratory_time_s) * FLOW_CORRECTION)
}

/// Supply-tank pressure (bar) required to sustain `max_flow_l_min`.
pub fn tank_pressure(max_flow_l_min: f32) -> f32 {
    TANK_A * max_flow_l_min * max_flow_l_min + TANK_B * max_flow_l_min + TANK_C
}

/// Expected volume/flow/tank-pressure for a pressure-control breath,
/// given the current compliance estimate (L/cmH2O).
pub fn pressure_control_derivation(
    peak_pressure_cmh2o: f32,
    peep_cmh2o: f32,
    inspiratory_time_s: f32,
    compliance_l_per_cmh2o: f32,
) -> Result<PressureControlDerivation, TimingError> {
    if inspiratory_time_s <= 0.0 {
        return Err(TimingError::NonPositiveInspiratoryTime);
    }
    if compliance_l_per_cmh2o <= 0.0 {
        return Err(TimingError::NonPositiveCompliance);
    }
    let driving = peak_pressure_cmh2o - peep_cmh2o;
    let max_flow_l_min = compliance_l_per_cmh2o * driving / (inspiratory_time_s / 60.0);
    Ok(PressureControlDerivation {
        tidal_volume_ml: 1000.0 * compliance_l_per_cmh2o * driving,
        max_flow_l_min,
        tank_pressure_bar: tank_pressure(max_flow_l_min),
    })
}

/// Format one side of a ratio label: whole values print as integers
/// ("1:2"), fractional values with one decimal ("1:1.5").
fn fmt_ratio_part(v: f32) -> String {
    if (v - v.round()).abs() < 1e-4 {
        format!("{}", v.round() as i64)
    } else {
        format!("{v:.1}")
    }
}
