//! Rolling window of trusted readings used for graphs and statistics

use envmon_core::{summarize, temperature_series, Reading, SeriesStats};
use std::collections::VecDeque;

pub const DEFAULT_HISTORY_CAPACITY: usize = 128;

/// Bounded history, oldest entries dropped first
#[derive(Debug, Clone)]
pub struct ReadingHistory {
    capacity: usize,
    readings: VecDeque<Reading>,
}

impl ReadingHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: VecDeque::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, reading: Reading) {
        if self.readings.len() == self.capacity {
            self.readings.pop_front();
        }
        self.readings.push_back(reading);
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Reading> {
        self.readings.iter()
    }

    /// Most recent `n` readings, oldest first
    pub fn recent(&self, n: usize) -> Vec<Reading> {
        let start = self.readings.len().saturating_sub(n);
        self.readings.iter().skip(start).cloned().collect()
    }

    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        temperature_series(self.readings.iter())
    }

    pub fn temperature_stats(&self) -> Option<SeriesStats> {
        summarize(self.readings.iter().map(|r| r.temperature_c))
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for ReadingHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}
