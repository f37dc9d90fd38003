use serde::{Deserialize, Serialize};

/// Rounding rule that turns the ideal, fractional share of samples into a whole quota.
///
/// Each sensor keeps adding samples while the credit left over stays above
/// `-threshold * lowest_density`, so `0.5` rounds to nearest and `1.0` always rounds up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BalancePolicy {
    pub threshold: f64,
}

impl Default for BalancePolicy {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl BalancePolicy {
    /// Samples for a sensor of `density` so that `remaining * density` tracks
    /// `lowest_density * requested_samples`, i.e. every sensor ends up with the sample
    /// density of the widest one.
    pub fn quota(&self, density: f32, lowest_density: f32, requested_samples: u32) -> u32 {
        let density = density as f64;
        let lowest = lowest_density as f64;
        if !(density.is_finite() && lowest.is_finite() && density > 0.0 && lowest > 0.0) {
            return 0;
        }

        let mut credit = lowest * requested_samples.saturating_sub(1) as f64;
        let mut remaining = 0;
        while credit > -self.threshold * lowest {
            remaining += 1;
            credit -= density;
        }

        remaining
    }
}
