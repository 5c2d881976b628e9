//! Bounded ring buffer of readings pending delivery

use envmon_core::{MetricKind, OperatingStatus, Reading, ValidRanges};
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, warn};

/// Why a reading was refused at the door
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    NotOperating(OperatingStatus),
    OutOfRange { metric: MetricKind, value: f64 },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::NotOperating(status) => write!(f, "sensor status {}", status),
            Rejection::OutOfRange { metric, value } => {
                write!(f, "{} out of range ({})", metric, value)
            }
        }
    }
}

/// Result of offering a reading to the cache
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Accepted,
    /// Accepted, and the oldest entry was overwritten to make room
    AcceptedWithEviction,
    Rejected(Rejection),
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Admission::Rejected(_))
    }
}

/// FIFO of admitted readings, capacity fixed at construction
#[derive(Debug, Clone)]
pub struct DeliveryCache {
    capacity: usize,
    ranges: ValidRanges,
    entries: VecDeque<Reading>,
    admitted: u64,
    rejected: u64,
    evicted: u64,
}

impl DeliveryCache {
    pub fn new(capacity: usize, ranges: ValidRanges) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ranges,
            entries: VecDeque::with_capacity(capacity),
            admitted: 0,
            rejected: 0,
            evicted: 0,
        }
    }

    /// Stricter than per-field validation: the sensor must report ok and
    /// every field must be in range
    pub fn check_admission(&self, reading: &Reading) -> Result<(), Rejection> {
        if !reading.status.is_ok() {
            return Err(Rejection::NotOperating(reading.status));
        }
        match self.ranges.first_violation(reading) {
            Some((metric, value)) => Err(Rejection::OutOfRange { metric, value }),
            None => Ok(()),
        }
    }

    /// Admit or drop a reading. Overflow evicts the oldest entry.
    pub fn offer(&mut self, reading: Reading) -> Admission {
        if let Err(rejection) = self.check_admission(&reading) {
            self.rejected += 1;
            warn!(reason = %rejection, timestamp = %reading.timestamp, "Reading dropped from delivery");
            return Admission::Rejected(rejection);
        }

        self.admitted += 1;
        let evicted = if self.entries.len() >= self.capacity {
            self.entries.pop_front();
            self.evicted += 1;
            debug!(capacity = self.capacity, "Delivery cache full, oldest reading overwritten");
            true
        } else {
            false
        };
        self.entries.push_back(reading);

        if evicted {
            Admission::AcceptedWithEviction
        } else {
            Admission::Accepted
        }
    }

    /// All pending readings, oldest first, as one slice
    pub fn as_batch(&mut self) -> &[Reading] {
        self.entries.make_contiguous()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> {
        self.entries.iter()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn admitted(&self) -> u64 {
        self.admitted
    }

    pub fn rejected(&self) -> u64 {
        self.rejected
    }

    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use envmon_core::{AirQuality, Atmospheric};

    /// Valid reading tagged by its TVOC value
    pub(crate) fn reading(tag: u16) -> Reading {
        Reading::new(
            21.0,
            Atmospheric::DEFAULT,
            AirQuality::new(OperatingStatus::Ok, 2, tag, 600),
            Utc.timestamp_opt(1_700_000_000 + i64::from(tag), 0).unwrap(),
        )
    }

    #[test]
    fn test_admits_valid_reading() {
        let mut cache = DeliveryCache::new(4, ValidRanges::default());
        assert_eq!(cache.offer(reading(1)), Admission::Accepted);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.admitted(), 1);
    }

    #[test]
    fn test_rejects_not_operating() {
        let mut cache = DeliveryCache::new(4, ValidRanges::default());
        let mut r = reading(1);
        r.status = OperatingStatus::Warmup;

        assert_eq!(
            cache.offer(r),
            Admission::Rejected(Rejection::NotOperating(OperatingStatus::Warmup))
        );
        assert!(cache.is_empty());
        assert_eq!(cache.rejected(), 1);
    }

    #[test]
    fn test_rejects_out_of_range() {
        let mut cache = DeliveryCache::new(4, ValidRanges::default());
        let mut r = reading(1);
        r.pressure_hpa = 101_325.0;

        let admission = cache.offer(r);
        assert_eq!(
            admission,
            Admission::Rejected(Rejection::OutOfRange {
                metric: MetricKind::Pressure,
                value: 101_325.0
            })
        );
        assert!(!admission.is_accepted());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_overflow_evicts_oldest() {
        let mut cache = DeliveryCache::new(3, ValidRanges::default());
        for tag in 1..=3 {
            assert_eq!(cache.offer(reading(tag)), Admission::Accepted);
        }
        assert_eq!(cache.offer(reading(4)), Admission::AcceptedWithEviction);

        assert_eq!(cache.len(), 3);
        assert_eq!(cache.evicted(), 1);
        let tags: Vec<u16> = cache.iter().map(|r| r.tvoc_ppb).collect();
        assert_eq!(tags, vec![2, 3, 4]);
        let batch: Vec<u16> = cache.as_batch().iter().map(|r| r.tvoc_ppb).collect();
        assert_eq!(batch, vec![2, 3, 4]);
    }
}
