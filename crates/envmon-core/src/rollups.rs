//! Aggregates over reading series (trend page, status API)

use crate::types::Reading;
use serde::{Deserialize, Serialize};

/// Aggregation applied to a series of values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateType {
    Min,
    Max,
    Avg,
    Last,
}

/// Accumulator for calculating aggregates over multiple observations
#[derive(Debug, Clone)]
pub struct Accumulator {
    observations: Vec<f64>,
    aggregate_type: AggregateType,
}

impl Accumulator {
    pub fn new(aggregate_type: AggregateType) -> Self {
        Self {
            observations: Vec::new(),
            aggregate_type,
        }
    }

    pub fn add(&mut self, value: f64) {
        self.observations.push(value);
    }

    pub fn result(&self) -> Option<f64> {
        if self.observations.is_empty() {
            return None;
        }

        Some(match self.aggregate_type {
            AggregateType::Min => self
                .observations
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min),
            AggregateType::Max => self
                .observations
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max),
            AggregateType::Avg => {
                let sum: f64 = self.observations.iter().sum();
                sum / self.observations.len() as f64
            }
            AggregateType::Last => self.observations.last().copied()?,
        })
    }

    pub fn count(&self) -> usize {
        self.observations.len()
    }
}

/// Summary of one metric over a window of readings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub last: f64,
    pub count: usize,
}

/// Summarize a series. `None` when empty.
pub fn summarize<I>(values: I) -> Option<SeriesStats>
where
    I: IntoIterator<Item = f64>,
{
    let mut min = Accumulator::new(AggregateType::Min);
    let mut max = Accumulator::new(AggregateType::Max);
    let mut avg = Accumulator::new(AggregateType::Avg);
    let mut last = Accumulator::new(AggregateType::Last);

    for value in values {
        min.add(value);
        max.add(value);
        avg.add(value);
        last.add(value);
    }

    Some(SeriesStats {
        min: min.result()?,
        max: max.result()?,
        avg: avg.result()?,
        last: last.result()?,
        count: last.count(),
    })
}

/// Temperature series of a window of readings, oldest first
pub fn temperature_series<'a, I>(readings: I) -> Vec<f64>
where
    I: IntoIterator<Item = &'a Reading>,
{
    readings.into_iter().map(|r| r.temperature_c).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accumulator_min() {
        let mut acc = Accumulator::new(AggregateType::Min);
        acc.add(10.0);
        acc.add(5.0);
        acc.add(15.0);
        assert_eq!(acc.result(), Some(5.0));
    }

    #[test]
    fn test_accumulator_avg() {
        let mut acc = Accumulator::new(AggregateType::Avg);
        acc.add(10.0);
        acc.add(20.0);
        acc.add(30.0);
        assert_eq!(acc.result(), Some(20.0));
    }

    #[test]
    fn test_accumulator_empty() {
        let acc = Accumulator::new(AggregateType::Avg);
        assert_eq!(acc.result(), None);
    }

    #[test]
    fn test_summarize() {
        let stats = summarize([21.0, 19.5, 23.0, 22.5]).unwrap();
        assert_eq!(stats.min, 19.5);
        assert_eq!(stats.max, 23.0);
        assert_eq!(stats.avg, 21.5);
        assert_eq!(stats.last, 22.5);
        assert_eq!(stats.count, 4);

        assert!(summarize(std::iter::empty()).is_none());
    }
}
