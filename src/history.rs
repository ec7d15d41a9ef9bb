use std::collections::VecDeque;

use serde::Serialize;

/// Fixed-capacity FIFO buffer. Pushing past capacity evicts the oldest entry.
#[derive(Debug, Clone, PartialEq)]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring buffer capacity must be > 0");
        Self {
            capacity,
            items: VecDeque::new(),
        }
    }

    /// Append `value`, returning the evicted oldest entry when full.
    pub fn push(&mut self, value: T) -> Option<T> {
        let evicted = if self.items.len() == self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(value);
        evicted
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

impl<T: Clone> RingBuffer<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}

/// One flushed bucket of raw ticks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketPoint {
    pub close: f64,
    pub high: f64,
    pub low: f64,
    pub mean: f64,
    pub oscillator: f64,
}

/// Groups raw ticks into fixed-count buckets and keeps bounded price and
/// oscillator histories of the flushed buckets.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketAggregator {
    bucket_size: usize,
    buffer: Vec<f64>,
    prices: RingBuffer<f64>,
    oscillators: RingBuffer<f64>,
}

impl BucketAggregator {
    pub fn new(bucket_size: usize, history_capacity: usize) -> Self {
        assert!(bucket_size > 0, "bucket size must be > 0");
        Self {
            bucket_size,
            buffer: Vec::with_capacity(bucket_size),
            prices: RingBuffer::new(history_capacity),
            oscillators: RingBuffer::new(history_capacity),
        }
    }

    /// Add a raw tick. When the bucket fills, the closing `(price, oscillator)`
    /// pair is pushed onto the histories and the flushed bucket is returned.
    pub fn push(&mut self, price: f64, oscillator: f64) -> Option<BucketPoint> {
        self.buffer.push(price);
        if self.buffer.len() < self.bucket_size {
            return None;
        }

        let n = self.buffer.len() as f64;
        let point = BucketPoint {
            close: price,
            high: self.buffer.iter().copied().fold(f64::MIN, f64::max),
            low: self.buffer.iter().copied().fold(f64::MAX, f64::min),
            mean: self.buffer.iter().sum::<f64>() / n,
            oscillator,
        };
        self.prices.push(price);
        self.oscillators.push(oscillator);
        self.buffer.clear();
        Some(point)
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    pub fn price_history(&self) -> &RingBuffer<f64> {
        &self.prices
    }

    pub fn oscillator_history(&self) -> &RingBuffer<f64> {
        &self.oscillators
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut rb = RingBuffer::new(3);
        assert_eq!(rb.push(1), None);
        assert_eq!(rb.push(2), None);
        assert_eq!(rb.push(3), None);
        assert!(rb.is_full());
        assert_eq!(rb.push(4), Some(1));
        assert_eq!(rb.to_vec(), vec![2, 3, 4]);
        assert_eq!(rb.latest(), Some(&4));
    }

    #[test]
    fn bucket_flushes_on_size() {
        let mut agg = BucketAggregator::new(3, 10);
        assert!(agg.push(10.0, 40.0).is_none());
        assert!(agg.push(12.0, 45.0).is_none());
        let point = agg.push(11.0, 50.0).unwrap();
        assert!((point.close - 11.0).abs() < f64::EPSILON);
        assert!((point.high - 12.0).abs() < f64::EPSILON);
        assert!((point.low - 10.0).abs() < f64::EPSILON);
        assert!((point.mean - 11.0).abs() < 1e-12);
        assert!((point.oscillator - 50.0).abs() < f64::EPSILON);
        assert_eq!(agg.pending(), 0);
        assert_eq!(agg.price_history().to_vec(), vec![11.0]);
        assert_eq!(agg.oscillator_history().to_vec(), vec![50.0]);
    }

    #[test]
    #[should_panic(expected = "ring buffer capacity must be > 0")]
    fn zero_capacity_panics() {
        let _ = RingBuffer::<f64>::new(0);
    }
}
