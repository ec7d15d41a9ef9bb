/// Wilder-smoothed average gain and loss behind the RSI-like oscillator.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GainLossAverages {
    pub avg_gain: f64,
    pub avg_loss: f64,
}

impl GainLossAverages {
    /// Fold one price delta into the averages with smoothing window `period`.
    pub fn update(self, diff: f64, period: usize) -> Self {
        let n = period as f64;
        let gain = diff.max(0.0);
        let loss = (-diff).max(0.0);
        Self {
            avg_gain: (self.avg_gain * (n - 1.0) + gain) / n,
            avg_loss: (self.avg_loss * (n - 1.0) + loss) / n,
        }
    }

    /// Oscillator in `[0, 100]`.
    ///
    /// With no losses it saturates at 100, or sits at 0 when there are no
    /// gains either.
    pub fn value(&self, eps: f64) -> f64 {
        if self.avg_loss <= 0.0 {
            return if self.avg_gain > 0.0 { 100.0 } else { 0.0 };
        }
        let rs = self.avg_gain / self.avg_loss.max(eps);
        (100.0 - 100.0 / (1.0 + rs)).clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturation_edges() {
        let flat = GainLossAverages::default();
        assert_eq!(flat.value(0.001), 0.0);

        let up = flat.update(1.0, 14);
        assert_eq!(up.value(0.001), 100.0);

        let down = flat.update(-1.0, 14);
        assert_eq!(down.value(0.001), 0.0);
    }

    #[test]
    fn balanced_moves_sit_at_fifty() {
        let avgs = GainLossAverages {
            avg_gain: 0.5,
            avg_loss: 0.5,
        };
        assert!((avgs.value(0.001) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn smoothing_uses_period() {
        let avgs = GainLossAverages::default().update(14.0, 14);
        assert!((avgs.avg_gain - 1.0).abs() < 1e-12);
        let avgs = avgs.update(0.0, 14);
        assert!((avgs.avg_gain - 13.0 / 14.0).abs() < 1e-12);
    }
}
