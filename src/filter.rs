//! Exponential (EMA) smoothing primitive.
//!
//! A single reusable building block for smoothing any scalar telemetry
//! stream before display or thresholding. Kept separate from the
//! compliance estimator on purpose: the estimator's gate works on raw
//! values, consumers opt into smoothing per stream.

/// One exponential-filter step: `alpha·new + (1 − alpha)·old`.
///
/// `alpha` near 1 tracks the input closely; near 0 it smooths heavily.
pub fn exponential_filter(new: f32, old: f32, alpha: f32) -> f32 {
    alpha * new + (1.0 - alpha) * old
}

/// Stateful wrapper around [`exponential_filter`], seeded by the first
/// sample it sees.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialFilter {
    alpha: f32,
    state: Option<f32>,
}

impl ExponentialFilter {
    /// `alpha` is clamped into `[0, 1]`.
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            state: None,
        }
    }

    /// Feed one sample and return the smoothed value.
    pub fn apply(&mut self, sample: f32) -> f32 {
        let next = match self.state {
            Some(prev) => exponential_filter(sample, prev, self.alpha),
            None => sample,
        };
        self.state = Some(next);
        next
    }

    /// Last smoothed value, if any sample has been fed.
    pub fn value(&self) -> Option<f32> {
        self.state
    }

    /// Forget all history (e.g. on session restart).
    pub fn reset(&mut self) {
        self.state = None;
    }
}
