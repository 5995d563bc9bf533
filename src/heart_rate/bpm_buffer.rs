//! Circular window of recent BPM estimates.

/// Fixed-capacity ring of BPM values; the average covers filled slots only.
#[derive(Debug, Clone)]
pub struct BpmBuffer {
    values: Vec<f64>,
    index: usize,
    filled: usize,
}

impl BpmBuffer {
    /// A zero capacity is bumped to one.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            index: 0,
            filled: 0,
        }
    }

    pub fn push(&mut self, bpm: f64) {
        self.values[self.index] = bpm;
        self.index = (self.index + 1) % self.values.len();
        self.filled = (self.filled + 1).min(self.values.len());
    }

    /// Mean of the stored values, `None` before the first push.
    pub fn average(&self) -> Option<f64> {
        if self.filled == 0 {
            return None;
        }
        let sum: f64 = self.values[..self.filled].iter().sum();
        Some(sum / self.filled as f64)
    }

    pub fn clear(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
        self.index = 0;
        self.filled = 0;
    }

    pub fn len(&self) -> usize {
        self.filled
    }

    pub fn is_empty(&self) -> bool {
        self.filled == 0
    }

    pub fn capacity(&self) -> usize {
        self.values.len()
    }
}
