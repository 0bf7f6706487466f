//! Configuration safety validator.
//!
//! Every candidate parameter set passes through [`validate`] before the
//! host platform may transmit it to the (real or simulated) ventilator.
//! Three tiers of checks run in order:
//!
//! 1. **Critical** — absolute bounds and cross-parameter consistency.
//!    Any hit blocks transmission outright.
//! 2. **Warning** — clinically risky but permitted values. The operator
//!    may acknowledge and proceed.
//! 3. **Patient-class** — extra thresholds for the patient class inferred
//!    from tidal volume and frequency.
//!
//! The validator is stateless; a fresh [`ValidationReport`] is built per
//! call and never mutated after return.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{VentMode, VentilatorSettings};

// Absolute bounds (critical tier).
const FREQ_BPM: (f32, f32) = (5.0, 60.0);
const FIO2_PCT: (f32, f32) = (21.0, 100.0);
const PEEP_CMH2O: (f32, f32) = (0.0, 20.0);
const PEAK_CMH2O: (f32, f32) = (5.0, 60.0);
const TIDAL_ML: (f32, f32) = (50.0, 2000.0);
const INSP_TIME_S: (f32, f32) = (0.2, 3.0);
const EXP_TIME_S: (f32, f32) = (0.2, 10.0);

/// Measured cycle time may deviate from `60/f` by at most this much (s)
/// before the mismatch warning fires.
const CYCLE_TOLERANCE_S: f32 = 0.5;

/// Patient class inferred from the volume/frequency combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientClass {
    Pediatric,
    Adult,
    General,
}

/// Overall severity of a validation outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Safe,
    Warning,
    Critical,
}

/// Violations that block transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CriticalViolation {
    FrequencyOutOfRange,
    Fio2OutOfRange,
    PeepOutOfRange,
    PeakPressureOutOfRange,
    TidalVolumeOutOfRange,
    InspiratoryTimeOutOfRange,
    ExpiratoryTimeOutOfRange,
    /// Peak pressure must exceed PEEP or no gas moves.
    PeakPressureNotAbovePeep,
    /// Volume-control mode: volumes under 100 mL are not deliverable.
    VolumeControlTidalVolumeTooLow,
    /// Volume-control mode: inspiratory times under 0.3 s are not deliverable.
    VolumeControlInspiratoryTimeTooShort,
}

impl core::fmt::Display for CriticalViolation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::FrequencyOutOfRange => write!(f, "frequency outside 5-60 /min"),
            Self::Fio2OutOfRange => write!(f, "FiO2 outside 21-100 %"),
            Self::PeepOutOfRange => write!(f, "PEEP outside 0-20 cmH2O"),
            Self::PeakPressureOutOfRange => write!(f, "peak pressure outside 5-60 cmH2O"),
            Self::TidalVolumeOutOfRange => write!(f, "tidal volume outside 50-2000 mL"),
            Self::InspiratoryTimeOutOfRange => write!(f, "inspiratory time outside 0.2-3.0 s"),
            Self::ExpiratoryTimeOutOfRange => write!(f, "expiratory time outside 0.2-10.0 s"),
            Self::PeakPressureNotAbovePeep => write!(f, "peak pressure not above PEEP"),
            Self::VolumeControlTidalVolumeTooLow => {
                write!(f, "tidal volume below 100 mL in volume control")
            }
            Self::VolumeControlInspiratoryTimeTooShort => {
                write!(f, "inspiratory time below 0.3 s in volume control")
            }
        }
    }
}

/// Advisory findings: transmission is allowed once acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SafetyWarning {
    /// Peak pressure above 35 cmH2O.
    BarotraumaRisk,
    /// Peak pressure above 50 cmH2O.
    SevereBarotraumaRisk,
    /// PEEP above 15 cmH2O impedes venous return.
    HighPeepVenousReturn,
    /// Tidal volume above 1000 mL.
    VolutraumaRisk,
    /// Tidal volume below 200 mL.
    AtelectasisRisk,
    /// Frequency above 35 /min risks breath stacking.
    AutoPeepRisk,
    /// Frequency below 8 /min.
    HypoventilationRisk,
    /// I:E ratio above 1.5.
    InvertedIeRatio,
    /// I:E ratio above 2.0.
    SeverelyInvertedIeRatio,
    /// FiO2 above 80 %.
    HighFio2,
    /// FiO2 above 95 %.
    VeryHighFio2,
    /// Measured cycle time deviates from 60/frequency by more than 0.5 s.
    CycleTimeMismatch,
    /// Pediatric patient with tidal volume above 500 mL.
    PediatricHighTidalVolume,
    /// Pediatric patient with peak pressure above 30 cmH2O.
    PediatricHighPeakPressure,
    /// Adult patient with tidal volume below 300 mL.
    AdultLowTidalVolume,
    /// Pressure control: driving pressure under 5 cmH2O delivers little volume.
    LowDrivingPressure,
    /// Pressure control: driving pressure over 40 cmH2O risks volutrauma.
    HighDrivingPressure,
}

impl core::fmt::Display for SafetyWarning {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BarotraumaRisk => write!(f, "peak pressure above 35 cmH2O: barotrauma risk"),
            Self::SevereBarotraumaRisk => {
                write!(f, "peak pressure above 50 cmH2O: critical barotrauma risk")
            }
            Self::HighPeepVenousReturn => {
                write!(f, "PEEP above 15 cmH2O may impair venous return")
            }
            Self::VolutraumaRisk => write!(f, "tidal volume above 1000 mL: volutrauma risk"),
            Self::AtelectasisRisk => write!(f, "tidal volume below 200 mL: atelectasis risk"),
            Self::AutoPeepRisk => write!(f, "frequency above 35 /min: auto-PEEP risk"),
            Self::HypoventilationRisk => write!(f, "frequency below 8 /min: hypoventilation"),
            Self::InvertedIeRatio => write!(f, "I:E ratio above 1.5"),
            Self::SeverelyInvertedIeRatio => write!(f, "I:E ratio above 2.0"),
            Self::HighFio2 => write!(f, "FiO2 above 80 %"),
            Self::VeryHighFio2 => write!(f, "FiO2 above 95 %"),
            Self::CycleTimeMismatch => {
                write!(f, "measured cycle time inconsistent with set frequency")
            }
            Self::PediatricHighTidalVolume => {
                write!(f, "tidal volume above 500 mL for pediatric patient")
            }
            Self::PediatricHighPeakPressure => {
                write!(f, "peak pressure above 30 cmH2O for pediatric patient")
            }
            Self::AdultLowTidalVolume => write!(f, "tidal volume below 300 mL for adult patient"),
            Self::LowDrivingPressure => {
                write!(f, "driving pressure below 5 cmH2O: likely inadequate volume")
            }
            Self::HighDrivingPressure => {
                write!(f, "driving pressure above 40 cmH2O: volutrauma risk")
            }
        }
    }
}

/// Outcome of one validation call.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    /// True when no critical violation was found.
    pub valid: bool,
    pub critical: Vec<CriticalViolation>,
    pub warnings: Vec<SafetyWarning>,
    pub patient_class: PatientClass,
    pub severity: Severity,
}

/// Validate a candidate configuration against all tiers.
///
/// The cycle-time consistency check needs a telemetry measurement and is
/// skipped here; use [`validate_with_cycle_measurement`] when one exists.
pub fn validate(settings: &VentilatorSettings) -> ValidationReport {
    validate_inner(settings, None)
}

/// Validate, additionally comparing a telemetry-measured total cycle time
/// (seconds) against the set frequency.
pub fn validate_with_cycle_measurement(
    settings: &VentilatorSettings,
    measured_cycle_s: f32,
) -> ValidationReport {
    validate_inner(settings, Some(measured_cycle_s))
}

fn validate_inner(s: &VentilatorSettings, measured_cycle_s: Option<f32>) -> ValidationReport {
    let mut critical = Vec::new();
    let mut warnings = Vec::new();

    // ── Critical tier ─────────────────────────────────────────────
    check_range(&mut critical, s.frequency_bpm, FREQ_BPM, CriticalViolation::FrequencyOutOfRange);
    check_range(&mut critical, s.fio2_percent, FIO2_PCT, CriticalViolation::Fio2OutOfRange);
    check_range(&mut critical, s.peep_cmh2o, PEEP_CMH2O, CriticalViolation::PeepOutOfRange);
    check_range(
        &mut critical,
        s.peak_pressure_cmh2o,
        PEAK_CMH2O,
        CriticalViolation::PeakPressureOutOfRange,
    );
    check_range(
        &mut critical,
        s.tidal_volume_ml,
        TIDAL_ML,
        CriticalViolation::TidalVolumeOutOfRange,
    );
    check_range(
        &mut critical,
        s.inspiratory_time_s,
        INSP_TIME_S,
        CriticalViolation::InspiratoryTimeOutOfRange,
    );
    check_range(
        &mut critical,
        s.expiratory_time_s,
        EXP_TIME_S,
        CriticalViolation::ExpiratoryTimeOutOfRange,
    );
    if s.peak_pressure_cmh2o <= s.peep_cmh2o {
        critical.push(CriticalViolation::PeakPressureNotAbovePeep);
    }
    if s.mode == VentMode::VolumeControl {
        if s.tidal_volume_ml < 100.0 {
            critical.push(CriticalViolation::VolumeControlTidalVolumeTooLow);
        }
        if s.inspiratory_time_s < 0.3 {
            critical.push(CriticalViolation::VolumeControlInspiratoryTimeTooShort);
        }
    }

    // ── Warning tier ──────────────────────────────────────────────
    if s.peak_pressure_cmh2o > 50.0 {
        warnings.push(SafetyWarning::SevereBarotraumaRisk);
    } else if s.peak_pressure_cmh2o > 35.0 {
        warnings.push(SafetyWarning::BarotraumaRisk);
    }
    if s.peep_cmh2o > 15.0 {
        warnings.push(SafetyWarning::HighPeepVenousReturn);
    }
    if s.tidal_volume_ml > 1000.0 {
        warnings.push(SafetyWarning::VolutraumaRisk);
    } else if s.tidal_volume_ml < 200.0 {
        warnings.push(SafetyWarning::AtelectasisRisk);
    }
    if s.frequency_bpm > 35.0 {
        warnings.push(SafetyWarning::AutoPeepRisk);
    } else if s.frequency_bpm < 8.0 {
        warnings.push(SafetyWarning::HypoventilationRisk);
    }
    if s.expiratory_time_s > 0.0 {
        let ratio = s.inspiratory_time_s / s.expiratory_time_s;
        if ratio > 2.0 {
            warnings.push(SafetyWarning::SeverelyInvertedIeRatio);
        } else if ratio > 1.5 {
            warnings.push(SafetyWarning::InvertedIeRatio);
        }
    }
    if s.fio2_percent > 95.0 {
        warnings.push(SafetyWarning::VeryHighFio2);
    } else if s.fio2_percent > 80.0 {
        warnings.push(SafetyWarning::HighFio2);
    }
    if let Some(measured) = measured_cycle_s {
        if s.frequency_bpm > 0.0
            && (measured - 60.0 / s.frequency_bpm).abs() > CYCLE_TOLERANCE_S
        {
            warnings.push(SafetyWarning::CycleTimeMismatch);
        }
    }
    if s.mode == VentMode::PressureControl {
        let driving = s.peak_pressure_cmh2o - s.peep_cmh2o;
        if driving < 5.0 {
            warnings.push(SafetyWarning::LowDrivingPressure);
        } else if driving > 40.0 {
            warnings.push(SafetyWarning::HighDrivingPressure);
        }
    }

    // ── Patient class tier ────────────────────────────────────────
    let patient_class = classify_patient(s.tidal_volume_ml, s.frequency_bpm);
    match patient_class {
        PatientClass::Pediatric => {
            if s.tidal_volume_ml > 500.0 {
                warnings.push(SafetyWarning::PediatricHighTidalVolume);
            }
            if s.peak_pressure_cmh2o > 30.0 {
                warnings.push(SafetyWarning::PediatricHighPeakPressure);
            }
        }
        PatientClass::Adult => {
            if s.tidal_volume_ml < 300.0 {
                warnings.push(SafetyWarning::AdultLowTidalVolume);
            }
        }
        PatientClass::General => {}
    }

    let severity = if !critical.is_empty() {
        warn!(
            "configuration blocked: {} critical violation(s), first: {}",
            critical.len(),
            critical[0]
        );
        Severity::Critical
    } else if warnings.is_empty() {
        Severity::Safe
    } else {
        Severity::Warning
    };

    ValidationReport {
        valid: critical.is_empty(),
        critical,
        warnings,
        patient_class,
        severity,
    }
}

/// Infer the patient class from the volume/frequency combination.
fn classify_patient(tidal_volume_ml: f32, frequency_bpm: f32) -> PatientClass {
    if tidal_volume_ml < 200.0 && frequency_bpm > 20.0 {
        PatientClass::Pediatric
    } else if tidal_volume_ml > 400.0 && frequency_bpm < 20.0 {
        PatientClass::Adult
    } else {
        PatientClass::General
    }
}

fn check_range(
    out: &mut Vec<CriticalViolation>,
    value: f32,
    (min, max): (f32, f32),
    violation: CriticalViolation,
) {
    if !(min..=max).contains(&value) || value.is_nan() {
        out.push(violation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VentilatorSettings;

    fn settings(
        frequency: f32,
        ti: f32,
        te: f32,
        vt: f32,
        peak: f32,
        peep: f32,
        fio2: f32,
        slider: i32,
    ) -> VentilatorSettings {
        VentilatorSettings {
            frequency_bpm: frequency,
            inspiratory_time_s: ti,
            expiratory_time_s: te,
            tidal_volume_ml: vt,
            peak_pressure_cmh2o: peak,
            peep_cmh2o: peep,
            fio2_percent: fio2,
            ie_ratio_slider: slider,
            ..VentilatorSettings::default()
        }
    }

    #[test]
    fn peak_at_or_below_peep_is_critical() {
        let report = validate(&settings(20.0, 1.0, 2.0, 500.0, 15.0, 20.0, 50.0, 0));
        assert!(!report.valid);
        assert_eq!(report.severity, Severity::Critical);
        assert!(report.critical.contains(&CriticalViolation::PeakPressureNotAbovePeep));
    }

    #[test]
    fn typical_adult_vcv_is_safe() {
        let report = validate(&settings(12.0, 0.8, 3.2, 450.0, 25.0, 5.0, 40.0, 0));
        assert!(report.valid);
        assert_eq!(report.severity, Severity::Safe);
        assert_eq!(report.patient_class, PatientClass::Adult);
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn absolute_bounds_are_critical() {
        let report = validate(&settings(70.0, 1.0, 2.0, 500.0, 25.0, 5.0, 40.0, 0));
        assert!(report.critical.contains(&CriticalViolation::FrequencyOutOfRange));

        let report = validate(&settings(12.0, 1.0, 2.0, 500.0, 25.0, 5.0, 15.0, 0));
        assert!(report.critical.contains(&CriticalViolation::Fio2OutOfRange));

        let report = validate(&settings(12.0, 0.1, 2.0, 500.0, 25.0, 5.0, 40.0, 0));
        assert!(report.critical.contains(&CriticalViolation::InspiratoryTimeOutOfRange));

        let report = validate(&settings(12.0, 1.0, 12.0, 500.0, 25.0, 5.0, 40.0, 0));
        assert!(report.critical.contains(&CriticalViolation::ExpiratoryTimeOutOfRange));
    }

    #[test]
    fn nan_inputs_never_pass_the_critical_tier() {
        let report = validate(&settings(f32::NAN, 1.0, 2.0, 500.0, 25.0, 5.0, 40.0, 0));
        assert!(!report.valid);
        assert!(report.critical.contains(&CriticalViolation::FrequencyOutOfRange));
    }

    #[test]
    fn barotrauma_warnings_escalate() {
        let report = validate(&settings(12.0, 1.0, 4.0, 500.0, 38.0, 5.0, 40.0, 0));
        assert!(report.valid);
        assert_eq!(report.severity, Severity::Warning);
        assert!(report.warnings.contains(&SafetyWarning::BarotraumaRisk));

        let report = validate(&settings(12.0, 1.0, 4.0, 500.0, 55.0, 5.0, 40.0, 0));
        assert!(report.warnings.contains(&SafetyWarning::SevereBarotraumaRisk));
        assert!(!report.warnings.contains(&SafetyWarning::BarotraumaRisk));
    }

    #[test]
    fn inverted_ratio_warnings_escalate() {
        let report = validate(&settings(12.0, 2.4, 1.5, 500.0, 25.0, 5.0, 40.0, 0));
        assert!(report.warnings.contains(&SafetyWarning::InvertedIeRatio));

        let report = validate(&settings(12.0, 2.9, 1.2, 500.0, 25.0, 5.0, 40.0, 0));
        assert!(report.warnings.contains(&SafetyWarning::SeverelyInvertedIeRatio));
    }

    #[test]
    fn pediatric_classification_and_thresholds() {
        let report = validate(&settings(25.0, 0.5, 1.5, 150.0, 32.0, 5.0, 40.0, 0));
        assert_eq!(report.patient_class, PatientClass::Pediatric);
        assert!(report.warnings.contains(&SafetyWarning::PediatricHighPeakPressure));
        // 150 mL also trips the general atelectasis threshold.
        assert!(report.warnings.contains(&SafetyWarning::AtelectasisRisk));
    }

    #[test]
    fn patient_classification_boundaries() {
        assert_eq!(classify_patient(450.0, 12.0), PatientClass::Adult);
        assert_eq!(classify_patient(150.0, 25.0), PatientClass::Pediatric);
        // Neither rule matches at the boundaries: class falls to General.
        assert_eq!(classify_patient(250.0, 12.0), PatientClass::General);
        assert_eq!(classify_patient(150.0, 20.0), PatientClass::General);
        assert_eq!(classify_patient(400.0, 12.0), PatientClass::General);
    }

    #[test]
    fn volume_control_extra_criticals() {
        let mut s = settings(20.0, 0.25, 2.0, 80.0, 25.0, 5.0, 40.0, 0);
        s.mode = VentMode::VolumeControl;
        let report = validate(&s);
        assert!(report.critical.contains(&CriticalViolation::VolumeControlTidalVolumeTooLow));
        assert!(
            report
                .critical
                .contains(&CriticalViolation::VolumeControlInspiratoryTimeTooShort)
        );
    }

    #[test]
    fn pressure_control_driving_pressure_warnings() {
        let mut s = settings(12.0, 1.0, 4.0, 500.0, 8.0, 5.0, 40.0, 0);
        s.mode = VentMode::PressureControl;
        let report = validate(&s);
        assert!(report.valid);
        assert!(report.warnings.contains(&SafetyWarning::LowDrivingPressure));

        let mut s = settings(12.0, 1.0, 4.0, 500.0, 50.0, 5.0, 40.0, 0);
        s.mode = VentMode::PressureControl;
        let report = validate(&s);
        assert!(report.warnings.contains(&SafetyWarning::HighDrivingPressure));
    }

    #[test]
    fn cycle_measurement_mismatch_warns() {
        let s = settings(12.0, 0.8, 3.2, 450.0, 25.0, 5.0, 40.0, 0);
        // 60/12 = 5 s; a 4.0 s measured cycle is 1.0 s off.
        let report = validate_with_cycle_measurement(&s, 4.0);
        assert!(report.warnings.contains(&SafetyWarning::CycleTimeMismatch));

        let report = validate_with_cycle_measurement(&s, 4.8);
        assert!(!report.warnings.contains(&SafetyWarning::CycleTimeMismatch));
    }

    #[test]
    fn criticals_dominate_warnings() {
        // Out-of-range frequency plus a barotrauma warning: severity must
        // still be Critical and valid false.
        let report = validate(&settings(70.0, 1.0, 2.0, 500.0, 40.0, 5.0, 40.0, 0));
        assert!(!report.valid);
        assert_eq!(report.severity, Severity::Critical);
        assert!(!report.warnings.is_empty());
    }
}
