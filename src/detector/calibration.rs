//! Baseline calibration for the two ranging positions.
//!
//! At startup (and on an explicit re-calibration request) the detector
//! averages a fixed-length burst of samples from each ranging sensor to
//! establish the "doorway empty" baseline distances.  Detection later looks
//! for readings *below* baseline minus tolerance, so both baselines are
//! clamped to a configured maximum plausible distance: a covered or
//! misconfigured sensor must not produce an implausibly large baseline that
//! leaves it permanently blind.

use log::{info, warn};

use crate::config::SystemConfig;

// ---------------------------------------------------------------------------
// Calibration result
// ---------------------------------------------------------------------------

/// Baselines and detection tolerance, immutable once the burst completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Calibration {
    /// Mean inner reading over the burst, clamped to the plausibility cap.
    pub baseline_inner_mm: u16,
    /// Mean outer reading over the burst, clamped to the plausibility cap.
    pub baseline_outer_mm: u16,
    /// Detection margin: a fixed fraction of the mean baseline.
    pub tolerance_mm: u16,
}

impl Calibration {
    /// True if `reading` is below the inner detection threshold.
    /// `None` means the sensor saw nothing (far) and is never below.
    pub fn below_inner(&self, reading: Option<u16>) -> bool {
        match reading {
            Some(d) => d < self.baseline_inner_mm.saturating_sub(self.tolerance_mm),
            None => false,
        }
    }

    /// True if `reading` is below the outer detection threshold.
    pub fn below_outer(&self, reading: Option<u16>) -> bool {
        match reading {
            Some(d) => d < self.baseline_outer_mm.saturating_sub(self.tolerance_mm),
            None => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Burst accumulator
// ---------------------------------------------------------------------------

/// Accumulates one calibration burst, one sample pair per tick.
///
/// Integer arithmetic throughout: sums in `u32` (20 × 65535 fits easily),
/// truncating division for the means.
#[derive(Debug, Clone)]
pub struct Calibrator {
    samples_wanted: u16,
    cap_mm: u16,
    tolerance_percent: u8,
    sum_inner: u32,
    sum_outer: u32,
    count: u16,
    unavailable: u16,
}

impl Calibrator {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            samples_wanted: config.calibration_samples,
            cap_mm: config.max_plausible_distance_mm,
            tolerance_percent: config.tolerance_percent,
            sum_inner: 0,
            sum_outer: 0,
            count: 0,
            unavailable: 0,
        }
    }

    /// Feed one tick's sample pair.  Returns the finished [`Calibration`]
    /// once the burst is complete, `None` while still collecting.
    ///
    /// An unavailable reading counts as the plausibility cap: it fails safe
    /// toward "nothing detected" instead of aborting the burst.
    pub fn feed(&mut self, inner_mm: Option<u16>, outer_mm: Option<u16>) -> Option<Calibration> {
        if inner_mm.is_none() || outer_mm.is_none() {
            self.unavailable += 1;
        }
        self.sum_inner += u32::from(inner_mm.unwrap_or(self.cap_mm));
        self.sum_outer += u32::from(outer_mm.unwrap_or(self.cap_mm));
        self.count += 1;

        if self.count < self.samples_wanted {
            return None;
        }

        let count = u32::from(self.count);
        let mean_inner = (self.sum_inner / count) as u16;
        let mean_outer = (self.sum_outer / count) as u16;
        let baseline_inner_mm = mean_inner.min(self.cap_mm);
        let baseline_outer_mm = mean_outer.min(self.cap_mm);
        let tolerance_mm = ((u32::from(baseline_inner_mm) + u32::from(baseline_outer_mm)) / 2
            * u32::from(self.tolerance_percent)
            / 100) as u16;

        if self.unavailable == self.count {
            warn!(
                "calibration burst saw no valid ranging samples, baselines clamped to {} mm",
                self.cap_mm
            );
        }
        info!(
            "calibration complete: inner={} mm outer={} mm tolerance={} mm ({} of {} samples unavailable)",
            baseline_inner_mm, baseline_outer_mm, tolerance_mm, self.unavailable, self.count
        );

        Some(Calibration {
            baseline_inner_mm,
            baseline_outer_mm,
            tolerance_mm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_burst(inner: &[Option<u16>], outer: &[Option<u16>]) -> Calibration {
        let config = SystemConfig::default();
        let mut cal = Calibrator::new(&config);
        let mut result = None;
        for (i, o) in inner.iter().zip(outer) {
            result = cal.feed(*i, *o);
        }
        result.expect("burst should complete")
    }

    #[test]
    fn uniform_burst_yields_exact_baselines() {
        let samples: std::vec::Vec<_> = (0..20).map(|_| Some(1000u16)).collect();
        let c = run_burst(&samples, &samples);
        assert_eq!(c.baseline_inner_mm, 1000);
        assert_eq!(c.baseline_outer_mm, 1000);
        // (1000 + 1000) / 2 * 30 / 100
        assert_eq!(c.tolerance_mm, 300);
    }

    #[test]
    fn burst_is_deterministic() {
        let inner: std::vec::Vec<_> = (0..20).map(|i| Some(800 + i * 3)).collect();
        let outer: std::vec::Vec<_> = (0..20).map(|i| Some(1200 - i * 2)).collect();
        let a = run_burst(&inner, &outer);
        let b = run_burst(&inner, &outer);
        assert_eq!(a, b);
    }

    #[test]
    fn mean_above_cap_is_clamped() {
        let far: std::vec::Vec<_> = (0..20).map(|_| Some(5000u16)).collect();
        let c = run_burst(&far, &far);
        let cap = SystemConfig::default().max_plausible_distance_mm;
        assert_eq!(c.baseline_inner_mm, cap);
        assert_eq!(c.baseline_outer_mm, cap);
    }

    #[test]
    fn unavailable_samples_count_as_cap() {
        let none: std::vec::Vec<Option<u16>> = (0..20).map(|_| None).collect();
        let c = run_burst(&none, &none);
        let cap = SystemConfig::default().max_plausible_distance_mm;
        assert_eq!(c.baseline_inner_mm, cap);
        assert_eq!(c.baseline_outer_mm, cap);
        assert_eq!(c.tolerance_mm, cap / 100 * 30);
    }

    #[test]
    fn mixed_unavailable_pulls_mean_toward_cap() {
        // 10 samples at 1000 and 10 unavailable (counted as 2000)
        let inner: std::vec::Vec<_> = (0..20)
            .map(|i| if i < 10 { Some(1000u16) } else { None })
            .collect();
        let good: std::vec::Vec<_> = (0..20).map(|_| Some(1000u16)).collect();
        let c = run_burst(&inner, &good);
        assert_eq!(c.baseline_inner_mm, 1500);
        assert_eq!(c.baseline_outer_mm, 1000);
    }

    #[test]
    fn below_threshold_checks() {
        let c = Calibration {
            baseline_inner_mm: 1000,
            baseline_outer_mm: 1000,
            tolerance_mm: 100,
        };
        assert!(c.below_inner(Some(899)));
        assert!(!c.below_inner(Some(900)));
        assert!(!c.below_inner(Some(1000)));
        assert!(!c.below_inner(None));
        assert!(c.below_outer(Some(400)));
        assert!(!c.below_outer(None));
    }

    #[test]
    fn zero_calibration_never_detects() {
        let c = Calibration::default();
        assert!(!c.below_inner(Some(0)));
        assert!(!c.below_outer(Some(0)));
    }
}
