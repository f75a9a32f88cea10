//! Jump Correction Module
//! Detects and removes step discontinuities caused by device resets.
//!
//! A reset shows up as a large per-step difference while the reading itself
//! snaps back near zero. Ordinary sharp motion also produces a large
//! difference, but leaves the reading far from zero, so the conjunction of
//! the two thresholds separates the cases.

use chrono::NaiveDateTime;
use std::fmt;
use tracing::info;

/// Displacement channel being corrected, for audit output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Vertical,
    Horizontal,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Vertical => f.write_str("vertical"),
            Channel::Horizontal => f.write_str("horizontal"),
        }
    }
}

/// Correction anchor: every sample strictly after `days` gains `size`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JumpAnchor {
    pub days: f64,
    pub size: f64,
}

/// Reset detector and corrector for one displacement channel.
pub struct JumpCorrector {
    channel: Channel,
    threshold: f64,
}

impl JumpCorrector {
    pub fn new(channel: Channel, threshold: f64) -> Self {
        Self { channel, threshold }
    }

    /// Scan the per-step differences of the uncorrected series for reset
    /// signatures. Each flagged index yields an anchor at the preceding
    /// sample; anchors come out in increasing time order.
    ///
    /// `diffs` must be the first differences of `values` with `diffs[0] == 0`.
    pub fn detect(
        &self,
        timestamps: &[NaiveDateTime],
        days: &[f64],
        values: &[f64],
        diffs: &[f64],
    ) -> Vec<JumpAnchor> {
        let mut anchors = Vec::new();
        for i in 1..values.len() {
            if diffs[i].abs() > self.threshold && values[i].abs() < self.threshold {
                anchors.push(JumpAnchor {
                    days: days[i - 1],
                    size: values[i - 1],
                });
                info!(
                    channel = %self.channel,
                    timestamp = %timestamps[i],
                    reset_value = values[i],
                    jump_size = diffs[i],
                    "device reset detected"
                );
            }
        }
        anchors
    }

    /// Apply anchors sequentially, in the order they were discovered, to the
    /// running corrected series. Anchor sizes were taken from the raw series,
    /// so consecutive resets compose additively.
    pub fn apply(&self, days: &[f64], values: &mut [f64], anchors: &[JumpAnchor]) {
        for anchor in anchors {
            for (day, value) in days.iter().zip(values.iter_mut()) {
                if *day > anchor.days {
                    *value += anchor.size;
                }
            }
        }
        info!(channel = %self.channel, jumps = anchors.len(), "jump correction applied");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamps(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2021, 2, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::minutes(30 * i as i64))
            .collect()
    }

    fn days(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 30.0 / 1440.0).collect()
    }

    fn diffs(values: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0];
        out.extend(values.windows(2).map(|w| w[1] - w[0]));
        out
    }

    #[test]
    fn sharp_but_continuous_motion_is_not_flagged() {
        // Step of 0.25 at index 2, but the reading stays well away from zero,
        // so this is genuine signal, not a reset.
        let values = [0.10, 0.05, -0.20, -0.18, -0.15];
        let corrector = JumpCorrector::new(Channel::Horizontal, 0.15);
        let anchors = corrector.detect(&stamps(5), &days(5), &values, &diffs(&values));
        assert!(anchors.is_empty());
    }

    #[test]
    fn genuine_reset_is_flagged_and_corrected() {
        // Reading snaps from 0.55 back to 0.02: reset.
        let mut values = vec![0.50, 0.55, 0.02, 0.06, 0.10];
        let d = days(5);
        let corrector = JumpCorrector::new(Channel::Vertical, 0.25);
        let anchors = corrector.detect(&stamps(5), &d, &values, &diffs(&values));
        assert_eq!(anchors, vec![JumpAnchor { days: d[1], size: 0.55 }]);

        corrector.apply(&d, &mut values, &anchors);
        let expected = [0.50, 0.55, 0.57, 0.61, 0.65];
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
        // Continuous after correction: every step is small again.
        assert!(diffs(&values).iter().all(|s| s.abs() < 0.25));
    }

    #[test]
    fn detection_is_idempotent_after_correction() {
        let mut values = vec![0.50, 0.55, 0.02, 0.06, 0.10];
        let d = days(5);
        let corrector = JumpCorrector::new(Channel::Vertical, 0.25);
        let anchors = corrector.detect(&stamps(5), &d, &values, &diffs(&values));
        corrector.apply(&d, &mut values, &anchors);

        let again = corrector.detect(&stamps(5), &d, &values, &diffs(&values));
        assert!(again.is_empty());
    }

    #[test]
    fn consecutive_resets_compose_additively() {
        // Two resets; anchor sizes are taken from the raw series and applied
        // in increasing time order, so segment three gains both offsets.
        let mut values = vec![0.30, 0.62, 0.01, 0.33, 0.70, 0.05, 0.12];
        let d = days(7);
        let corrector = JumpCorrector::new(Channel::Vertical, 0.25);
        let anchors = corrector.detect(&stamps(7), &d, &values, &diffs(&values));
        assert_eq!(anchors.len(), 2);
        assert_eq!(anchors[0], JumpAnchor { days: d[1], size: 0.62 });
        assert_eq!(anchors[1], JumpAnchor { days: d[4], size: 0.70 });

        corrector.apply(&d, &mut values, &anchors);
        // Hand-computed: +0.62 from index 2 on, +0.70 more from index 5 on.
        let expected = [0.30, 0.62, 0.63, 0.95, 1.32, 1.37, 1.44];
        for (got, want) in values.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "{got} != {want}");
        }
    }
}
