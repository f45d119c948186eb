//! Fixed-capacity drift ring buffer with wrap-triggered statistics

use crate::data::WindowStats;

/// Overwrites oldest-first. Every time the write index wraps back to zero
/// the whole window is summarized.
#[derive(Debug, Clone)]
pub struct DriftRingBuffer {
    values: Vec<f64>,
    index: usize,
    len: usize,
    wraps: u64,
}

impl DriftRingBuffer {
    /// Capacity is at least one
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            index: 0,
            len: 0,
            wraps: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Next write position
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn wraps(&self) -> u64 {
        self.wraps
    }

    /// Store `value` at the write index and advance.
    ///
    /// Returns window statistics when this write completed a full pass,
    /// computed over the buffer as it stands after this write.
    pub fn write(&mut self, value: f64) -> Option<WindowStats> {
        let capacity = self.values.len();
        self.values[self.index] = value;
        self.index = (self.index + 1) % capacity;
        self.len = (self.len + 1).min(capacity);

        if self.index == 0 {
            self.wraps += 1;
            WindowStats::from_values(&self.values)
        } else {
            None
        }
    }

    /// Stored values, oldest first
    pub fn ordered(&self) -> Vec<f64> {
        if self.len < self.values.len() {
            return self.values[..self.len].to_vec();
        }
        let mut out = Vec::with_capacity(self.len);
        out.extend_from_slice(&self.values[self.index..]);
        out.extend_from_slice(&self.values[..self.index]);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_fire_once_per_wrap() {
        let mut buf = DriftRingBuffer::new(6000);
        let mut fired = Vec::new();
        for tick in 1..=6001u32 {
            if let Some(stats) = buf.write(tick as f64) {
                fired.push((tick, stats));
            }
        }
        assert_eq!(fired.len(), 1);
        let (tick, stats) = fired[0];
        assert_eq!(tick, 6000);
        // Window is 1..=6000; tick 6001 is not included
        assert_eq!(stats.max, 6000.0);
        assert_eq!(stats.min, 1.0);
        assert!((stats.mean - 3000.5).abs() < 1e-9);
        assert_eq!(buf.index(), 1);
        assert_eq!(buf.wraps(), 1);
    }

    #[test]
    fn test_ordered_after_overwrite() {
        let mut buf = DriftRingBuffer::new(3);
        for v in [1.0, 2.0] {
            buf.write(v);
        }
        assert_eq!(buf.ordered(), vec![1.0, 2.0]);
        for v in [3.0, 4.0] {
            buf.write(v);
        }
        assert_eq!(buf.ordered(), vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut buf = DriftRingBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
        assert!(buf.write(5.0).is_some());
    }
}
