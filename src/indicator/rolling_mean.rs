use crate::history::RingBuffer;

/// Mean of the most recent `window` values, O(1) per push.
///
/// Unlike a warm-up style moving average this reports a value as soon as one
/// sample is present, averaging whatever the window currently holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingMean {
    window: RingBuffer<f64>,
    sum: f64,
}

impl RollingMean {
    pub fn new(window: usize) -> Self {
        assert!(window > 0, "rolling mean window must be > 0");
        Self {
            window: RingBuffer::new(window),
            sum: 0.0,
        }
    }

    /// Push a new value and return the updated mean.
    pub fn push(&mut self, value: f64) -> f64 {
        if let Some(evicted) = self.window.push(value) {
            self.sum -= evicted;
        }
        self.sum += value;
        self.sum / self.window.len() as f64
    }

    pub fn value(&self) -> Option<f64> {
        if self.window.is_empty() {
            None
        } else {
            Some(self.sum / self.window.len() as f64)
        }
    }

    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    pub fn window(&self) -> usize {
        self.window.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_window_averages_what_it_has() {
        let mut m = RollingMean::new(3);
        assert_eq!(m.value(), None);
        assert!((m.push(10.0) - 10.0).abs() < f64::EPSILON);
        assert!((m.push(20.0) - 15.0).abs() < f64::EPSILON);
        assert!(!m.is_full());
        assert!((m.push(30.0) - 20.0).abs() < f64::EPSILON);
        assert!(m.is_full());
        // [20, 30, 40]
        assert!((m.push(40.0) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn no_drift_after_many_pushes() {
        let mut m = RollingMean::new(10);
        let mut naive_buf: Vec<f64> = Vec::new();

        for i in 0..10_000u64 {
            let val = (i as f64) * 0.1 + 0.01;
            let rolling = m.push(val);
            naive_buf.push(val);
            if naive_buf.len() > 10 {
                naive_buf.remove(0);
            }
            let naive = naive_buf.iter().sum::<f64>() / naive_buf.len() as f64;
            assert!(
                (rolling - naive).abs() < 1e-8,
                "Drift at i={}: rolling={} naive={}",
                i,
                rolling,
                naive
            );
        }
    }

    #[test]
    #[should_panic(expected = "rolling mean window must be > 0")]
    fn zero_window_panics() {
        RollingMean::new(0);
    }
}
