//! Windowed, error-gated lung-compliance recalibration.
//!
//! The estimator consumes one (peak pressure, measured pressure, measured
//! volume) triple per breath cycle and periodically recomputes the
//! compliance constant used by the pressure-control derivations. It does
//! not recompute every cycle: only at a fixed 5-cycle checkpoint, and only
//! when the measured pressure has diverged from the commanded peak by more
//! than 5 %. The first two cycles of each window are discarded as
//! transients.
//!
//! The checkpoint length, divergence threshold, transient trim and PEEP
//! window are calibration data — do not retune without bench validation.
//!
//! One estimator instance per simulation session; the state is caller-owned
//! and never shared (concurrent sessions each construct their own).

use heapless::{HistoryBuffer, Vec};
use log::{info, warn};

use crate::error::ComplianceError;

/// Cycles per recalibration checkpoint.
const RECAL_WINDOW: usize = 5;

/// Leading window entries discarded as transient/unreliable.
const TRANSIENT_TRIM: usize = 2;

/// Relative peak-pressure divergence (%) required to open the gate.
const ERROR_THRESHOLD_PCT: f32 = 5.0;

/// Pressure samples retained for the running-minimum PEEP approximation.
const PEEP_WINDOW: usize = 100;

/// Typical adult compliance (L/cmH2O), used as the default seed.
const DEFAULT_COMPLIANCE: f32 = 0.05;

/// One cycle's worth of measurements entering the recalibration window.
#[derive(Debug, Clone, Copy)]
struct CycleSample {
    pressure: f32,
    peep: f32,
    volume_ml: f32,
}

/// Result of an accepted recalibration: the new compliance and the
/// averages it was computed from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Recalibration {
    /// New compliance estimate (L/cmH2O).
    pub compliance: f32,
    /// Mean measured pressure over the retained window entries (cmH2O).
    pub avg_pressure: f32,
    /// Mean approximate PEEP over the retained window entries (cmH2O).
    pub avg_peep: f32,
    /// Mean measured volume, converted to litres.
    pub avg_volume_l: f32,
}

/// Stateful compliance estimator. Construct one per session.
pub struct ComplianceEstimator {
    compliance: f32,
    cycle_count: u64,
    /// Rolling pressure samples; their minimum approximates PEEP.
    pressure_ring: HistoryBuffer<f32, PEEP_WINDOW>,
    /// Samples gathered since the last checkpoint.
    window: Vec<CycleSample, RECAL_WINDOW>,
}

impl ComplianceEstimator {
    /// Seed the estimator with an initial compliance (L/cmH2O).
    pub fn new(initial_compliance: f32) -> Result<Self, ComplianceError> {
        if initial_compliance <= 0.0 || !initial_compliance.is_finite() {
            return Err(ComplianceError::NonPositiveSeed);
        }
        Ok(Self {
            compliance: initial_compliance,
            cycle_count: 0,
            pressure_ring: HistoryBuffer::new(),
            window: Vec::new(),
        })
    }

    /// Current compliance estimate (L/cmH2O). Always positive.
    pub fn compliance(&self) -> f32 {
        self.compliance
    }

    /// Total cycles observed since construction or the last [`reset`].
    ///
    /// [`reset`]: Self::reset
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }

    /// Drop all gathered history but keep the current compliance estimate.
    pub fn reset(&mut self) {
        self.cycle_count = 0;
        self.pressure_ring = HistoryBuffer::new();
        self.window.clear();
    }

    /// Feed one cycle of measurements.
    ///
    /// Returns `Ok(Some(..))` when a recalibration was accepted,
    /// `Ok(None)` when none was due or the divergence gate stayed closed —
    /// the normal outcome, distinct from the `Err` precondition failures.
    pub fn update(
        &mut self,
        peak_pressure: f32,
        measured_pressure: f32,
        measured_volume_ml: f32,
    ) -> Result<Option<Recalibration>, ComplianceError> {
        if peak_pressure <= 0.0 || !peak_pressure.is_finite() {
            return Err(ComplianceError::NonPositivePeakPressure);
        }

        self.pressure_ring.write(measured_pressure);
        let peep = self.approximate_peep();
        let _ = self.window.push(CycleSample {
            pressure: measured_pressure,
            peep,
            volume_ml: measured_volume_ml,
        });
        self.cycle_count += 1;

        if self.window.len() < RECAL_WINDOW {
            return Ok(None);
        }
        Ok(self.checkpoint(peak_pressure))
    }

    /// Evaluate the divergence gate on a full window. The window is drained
    /// either way so the next checkpoint is five fresh cycles out.
    fn checkpoint(&mut self, peak_pressure: f32) -> Option<Recalibration> {
        let reference = self.window[RECAL_WINDOW - 1].pressure;
        let error_pct = (peak_pressure - reference).abs() / peak_pressure * 100.0;

        let result = if error_pct > ERROR_THRESHOLD_PCT {
            self.recalibrate()
        } else {
            None
        };
        self.window.clear();
        result
    }

    /// Recompute compliance from the retained (post-trim) window entries.
    /// A non-positive or non-finite result is rejected and the previous
    /// estimate retained.
    fn recalibrate(&mut self) -> Option<Recalibration> {
        let retained = &self.window[TRANSIENT_TRIM..];
        let n = retained.len() as f32;

        let avg_pressure = retained.iter().map(|s| s.pressure).sum::<f32>() / n;
        let avg_peep = retained.iter().map(|s| s.peep).sum::<f32>() / n;
        let avg_volume_l = retained.iter().map(|s| s.volume_ml).sum::<f32>() / n / 1000.0;

        let candidate = avg_volume_l / (avg_pressure - avg_peep);
        if !candidate.is_finite() || candidate <= 0.0 {
            warn!(
                "rejected compliance recalibration {candidate} \
                 (avg_p={avg_pressure}, avg_peep={avg_peep}); keeping {}",
                self.compliance
            );
            return None;
        }

        info!("compliance recalibrated {} -> {candidate}", self.compliance);
        self.compliance = candidate;
        Some(Recalibration {
            compliance: candidate,
            avg_pressure,
            avg_peep,
            avg_volume_l,
        })
    }

    /// Minimum of the retained pressure samples — a cheap PEEP proxy, since
    /// airway pressure bottoms out at end-expiration.
    fn approximate_peep(&self) -> f32 {
        self.pressure_ring
            .oldest_ordered()
            .copied()
            .fold(f32::INFINITY, f32::min)
    }
}

impl Default for ComplianceEstimator {
    fn default() -> Self {
        Self {
            compliance: DEFAULT_COMPLIANCE,
            cycle_count: 0,
            pressure_ring: HistoryBuffer::new(),
            window: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two transient low-pressure cycles, then three steady ones. The lows
    /// are trimmed from the averages but keep feeding the PEEP minimum.
    fn feed_standard_window(est: &mut ComplianceEstimator, peak: f32) -> Option<Recalibration> {
        for _ in 0..2 {
            assert_eq!(est.update(peak, 5.0, 500.0).unwrap(), None);
        }
        assert_eq!(est.update(peak, 20.0, 500.0).unwrap(), None);
        assert_eq!(est.update(peak, 20.0, 500.0).unwrap(), None);
        est.update(peak, 20.0, 500.0).unwrap()
    }

    #[test]
    fn recalibrates_on_fifth_cycle_when_diverged() {
        let mut est = ComplianceEstimator::new(0.05).unwrap();
        // Peak 30 vs reference 20 → 33 % divergence, gate opens.
        let recal = feed_standard_window(&mut est, 30.0).expect("recalibration due");

        assert!((recal.avg_pressure - 20.0).abs() < 1e-5);
        assert!((recal.avg_peep - 5.0).abs() < 1e-5);
        assert!((recal.avg_volume_l - 0.5).abs() < 1e-5);
        // 0.5 L over 15 cmH2O driving pressure.
        assert!((recal.compliance - 0.5 / 15.0).abs() < 1e-5);
        assert!((est.compliance() - 0.5 / 15.0).abs() < 1e-5);
        assert_eq!(est.cycle_count(), 5);
    }

    #[test]
    fn gate_stays_closed_below_threshold() {
        let mut est = ComplianceEstimator::new(0.05).unwrap();
        // Peak 20.5 vs reference 20 → 2.4 % divergence, below the 5 % gate.
        assert_eq!(feed_standard_window(&mut est, 20.5), None);
        assert!((est.compliance() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn window_drains_at_every_checkpoint() {
        let mut est = ComplianceEstimator::new(0.05).unwrap();
        assert_eq!(feed_standard_window(&mut est, 20.5), None);
        // A second full window is needed before the next checkpoint fires.
        let recal = feed_standard_window(&mut est, 30.0);
        assert!(recal.is_some());
        assert_eq!(est.cycle_count(), 10);
    }

    #[test]
    fn degenerate_window_keeps_previous_compliance() {
        let mut est = ComplianceEstimator::new(0.05).unwrap();
        // Flat pressure: PEEP minimum equals the pressure, so the driving
        // pressure is zero and the recomputation is non-finite.
        for _ in 0..4 {
            assert_eq!(est.update(30.0, 20.0, 500.0).unwrap(), None);
        }
        assert_eq!(est.update(30.0, 20.0, 500.0).unwrap(), None);
        assert!((est.compliance() - 0.05).abs() < 1e-6);
    }

    #[test]
    fn non_positive_peak_is_a_typed_error() {
        let mut est = ComplianceEstimator::new(0.05).unwrap();
        assert_eq!(
            est.update(0.0, 20.0, 500.0),
            Err(ComplianceError::NonPositivePeakPressure)
        );
        assert_eq!(
            est.update(-5.0, 20.0, 500.0),
            Err(ComplianceError::NonPositivePeakPressure)
        );
        // Failed updates must not advance the cycle counter.
        assert_eq!(est.cycle_count(), 0);
    }

    #[test]
    fn seed_must_be_positive() {
        assert!(matches!(
            ComplianceEstimator::new(0.0),
            Err(ComplianceError::NonPositiveSeed)
        ));
        assert!(matches!(
            ComplianceEstimator::new(-1.0),
            Err(ComplianceError::NonPositiveSeed)
        ));
        assert!(matches!(
            ComplianceEstimator::new(f32::NAN),
            Err(ComplianceError::NonPositiveSeed)
        ));
    }

    #[test]
    fn reset_keeps_compliance_but_drops_history() {
        let mut est = ComplianceEstimator::new(0.05).unwrap();
        let recal = feed_standard_window(&mut est, 30.0);
        assert!(recal.is_some());
        let learned = est.compliance();

        est.reset();
        assert_eq!(est.cycle_count(), 0);
        assert!((est.compliance() - learned).abs() < 1e-6);
    }
}
