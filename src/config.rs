//! Operator-entered ventilator settings.
//!
//! All tunable parameters for one simulated ventilation session. The host
//! platform edits this struct from its configuration UI and must pass it
//! through [`crate::safety::validate`] before transmitting it to the (real
//! or simulated) ventilator hardware.

use serde::{Deserialize, Serialize};

/// Ventilation mode: which variable is directly controlled per breath.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VentMode {
    /// Tidal volume is the set variable; pressure follows.
    VolumeControl,
    /// Peak pressure is the set variable; volume follows from compliance.
    PressureControl,
}

/// Candidate ventilator configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VentilatorSettings {
    pub mode: VentMode,

    // --- Breath cycle ---
    /// Respiratory frequency (breaths/min).
    pub frequency_bpm: f32,
    /// Inspiratory time (s).
    pub inspiratory_time_s: f32,
    /// Expiratory time (s).
    pub expiratory_time_s: f32,
    /// Signed I:E ratio slider position (0 = 1:1, +10 = 1:2, -10 = 2:1).
    pub ie_ratio_slider: i32,
    /// First expiratory pause (s), subtracted from the usable cycle.
    pub exp_pause1_s: f32,
    /// Second expiratory pause (s).
    pub exp_pause2_s: f32,

    // --- Volumes & pressures ---
    /// Tidal volume (mL).
    pub tidal_volume_ml: f32,
    /// Peak inspiratory pressure (cmH2O).
    pub peak_pressure_cmh2o: f32,
    /// Positive end-expiratory pressure (cmH2O).
    pub peep_cmh2o: f32,

    // --- Gas mix ---
    /// Fraction of inspired oxygen (21–100 %).
    pub fio2_percent: f32,
}

impl Default for VentilatorSettings {
    fn default() -> Self {
        // Typical adult volume-control ventilation; internally consistent
        // (inspiratory + expiratory time equals 60/frequency).
        Self {
            mode: VentMode::VolumeControl,
            frequency_bpm: 12.0,
            inspiratory_time_s: 1.0,
            expiratory_time_s: 4.0,
            ie_ratio_slider: 0,
            exp_pause1_s: 0.0,
            exp_pause2_s: 0.0,
            tidal_volume_ml: 500.0,
            peak_pressure_cmh2o: 20.0,
            peep_cmh2o: 5.0,
            fio2_percent: 40.0,
        }
    }
}
