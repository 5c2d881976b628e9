//! Flush policy and hand-off of cached readings to a sink

use crate::{Admission, DeliveryCache, DeliveryError, DeliveryResult};
use envmon_core::{BatchSink, Reading};
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// When to send and how long to wait for the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    /// Minimum cached readings before a timed flush is attempted
    pub batch_size: usize,
    /// Minimum time since the last successful flush
    pub flush_interval: Duration,
    /// Upper bound for a single sink write
    pub write_timeout: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            batch_size: 10,
            flush_interval: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
        }
    }
}

impl BatchPolicy {
    pub fn validate(&self, capacity: usize) -> DeliveryResult<()> {
        if self.batch_size == 0 {
            return Err(DeliveryError::InvalidSettings("batch size must be > 0".into()));
        }
        if self.batch_size > capacity {
            return Err(DeliveryError::InvalidSettings(format!(
                "batch size {} exceeds cache capacity {}",
                self.batch_size, capacity
            )));
        }
        if self.write_timeout.is_zero() {
            return Err(DeliveryError::InvalidSettings("write timeout must be > 0".into()));
        }
        Ok(())
    }
}

/// Counters for logs and metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    pub pending: usize,
    pub admitted: u64,
    pub rejected: u64,
    pub evicted: u64,
    pub successful_flushes: u64,
    pub failed_flushes: u64,
    pub delivered: u64,
}

/// Owns the delivery cache and decides when to flush it
pub struct DeliveryBatcher {
    cache: DeliveryCache,
    policy: BatchPolicy,
    last_flush: Instant,
    successful_flushes: u64,
    failed_flushes: u64,
    delivered: u64,
}

impl DeliveryBatcher {
    pub fn new(cache: DeliveryCache, policy: BatchPolicy) -> Self {
        Self::new_at(cache, policy, Instant::now())
    }

    /// The flush clock starts at `now`
    pub fn new_at(cache: DeliveryCache, policy: BatchPolicy, now: Instant) -> Self {
        Self {
            cache,
            policy,
            last_flush: now,
            successful_flushes: 0,
            failed_flushes: 0,
            delivered: 0,
        }
    }

    pub fn offer(&mut self, reading: Reading) -> Admission {
        self.cache.offer(reading)
    }

    /// Both the interval has elapsed and a full batch is waiting
    pub fn should_flush(&self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_flush);
        elapsed >= self.policy.flush_interval && self.cache.len() >= self.policy.batch_size
    }

    /// Flush only when [`should_flush`](Self::should_flush) says so
    pub async fn flush_if_due(
        &mut self,
        sink: &mut dyn BatchSink,
        now: Instant,
    ) -> Option<DeliveryResult<usize>> {
        if self.should_flush(now) {
            Some(self.flush(sink, now).await)
        } else {
            None
        }
    }

    /// Hand the whole cache to the sink as one batch
    ///
    /// On success the cache is emptied and `now` becomes the last flush
    /// time. On failure nothing changes.
    #[instrument(skip(self, sink, now), fields(sink_name = sink.name()))]
    pub async fn flush(&mut self, sink: &mut dyn BatchSink, now: Instant) -> DeliveryResult<usize> {
        if self.cache.is_empty() {
            debug!("Nothing to flush");
            return Ok(0);
        }

        let timeout = self.policy.write_timeout;
        let batch = self.cache.as_batch();
        let count = batch.len();

        let written = tokio::time::timeout(timeout, sink.write_batch(batch)).await;
        let result = match written {
            Ok(Ok(())) => Ok(count),
            Ok(Err(e)) => Err(DeliveryError::SinkFailed {
                sink: sink.name().to_string(),
                message: format!("{:#}", e),
            }),
            Err(_) => Err(DeliveryError::Timeout {
                sink: sink.name().to_string(),
                timeout,
            }),
        };

        match &result {
            Ok(count) => {
                self.cache.clear();
                self.last_flush = now;
                self.successful_flushes += 1;
                self.delivered += *count as u64;
                info!(count, "Delivered batch");
            }
            Err(e) => {
                self.failed_flushes += 1;
                warn!(error = %e, pending = self.cache.len(), "Batch delivery failed, keeping cache for retry");
            }
        }

        result
    }

    /// Final best-effort flush, thresholds ignored
    pub async fn flush_remaining(&mut self, sink: &mut dyn BatchSink) -> DeliveryResult<usize> {
        info!(pending = self.cache.len(), "Final flush");
        self.flush(sink, Instant::now()).await
    }

    pub fn cache(&self) -> &DeliveryCache {
        &self.cache
    }

    pub fn policy(&self) -> BatchPolicy {
        self.policy
    }

    pub fn last_flush(&self) -> Instant {
        self.last_flush
    }

    pub fn pending(&self) -> usize {
        self.cache.len()
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            pending: self.cache.len(),
            admitted: self.cache.admitted(),
            rejected: self.cache.rejected(),
            evicted: self.cache.evicted(),
            successful_flushes: self.successful_flushes,
            failed_flushes: self.failed_flushes,
            delivered: self.delivered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::reading;
    use anyhow::{anyhow, Result};
    use envmon_core::ValidRanges;

    /// Records delivered batches; fails while `failing` is set
    #[derive(Default)]
    struct RecordingSink {
        failing: bool,
        batches: Vec<Vec<u16>>,
        attempts: usize,
    }

    #[async_trait::async_trait]
    impl BatchSink for RecordingSink {
        fn name(&self) -> &str {
            "recording"
        }

        async fn write_batch(&mut self, points: &[Reading]) -> Result<()> {
            self.attempts += 1;
            if self.failing {
                return Err(anyhow!("store unavailable"));
            }
            self.batches.push(points.iter().map(|r| r.tvoc_ppb).collect());
            Ok(())
        }
    }

    struct StalledSink;

    #[async_trait::async_trait]
    impl BatchSink for StalledSink {
        fn name(&self) -> &str {
            "stalled"
        }

        async fn write_batch(&mut self, _points: &[Reading]) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    fn batcher(capacity: usize, batch_size: usize, interval: Duration, t0: Instant) -> DeliveryBatcher {
        DeliveryBatcher::new_at(
            DeliveryCache::new(capacity, ValidRanges::default()),
            BatchPolicy {
                batch_size,
                flush_interval: interval,
                write_timeout: Duration::from_millis(100),
            },
            t0,
        )
    }

    #[test]
    fn test_should_flush_needs_time_and_size() {
        let t0 = Instant::now();
        let mut b = batcher(100, 3, Duration::from_secs(60), t0);

        b.offer(reading(1));
        b.offer(reading(2));
        b.offer(reading(3));
        // batch full, timer not elapsed
        assert!(!b.should_flush(t0 + Duration::from_secs(59)));
        assert!(b.should_flush(t0 + Duration::from_secs(60)));

        let mut small = batcher(100, 3, Duration::from_secs(60), t0);
        small.offer(reading(1));
        // timer elapsed, batch too small
        assert!(!small.should_flush(t0 + Duration::from_secs(600)));
    }

    #[tokio::test]
    async fn test_successful_flush_clears_cache() {
        let t0 = Instant::now();
        let mut b = batcher(100, 2, Duration::from_secs(10), t0);
        let mut sink = RecordingSink::default();
        b.offer(reading(1));
        b.offer(reading(2));

        let t1 = t0 + Duration::from_secs(10);
        let sent = b.flush_if_due(&mut sink, t1).await.unwrap().unwrap();

        assert_eq!(sent, 2);
        assert_eq!(sink.batches, vec![vec![1, 2]]);
        assert_eq!(b.pending(), 0);
        assert_eq!(b.last_flush(), t1);
        assert_eq!(b.stats().successful_flushes, 1);
        assert_eq!(b.stats().delivered, 2);
    }

    #[tokio::test]
    async fn test_failed_flush_changes_nothing() {
        let t0 = Instant::now();
        let mut b = batcher(100, 2, Duration::from_secs(10), t0);
        let mut sink = RecordingSink {
            failing: true,
            ..Default::default()
        };
        b.offer(reading(1));
        b.offer(reading(2));

        let result = b.flush(&mut sink, t0 + Duration::from_secs(30)).await;
        assert!(matches!(result, Err(DeliveryError::SinkFailed { .. })));
        assert_eq!(b.pending(), 2);
        assert_eq!(b.last_flush(), t0);
        assert_eq!(b.stats().failed_flushes, 1);
        assert_eq!(b.stats().successful_flushes, 0);

        // retry delivers the retained batch
        sink.failing = false;
        b.flush(&mut sink, t0 + Duration::from_secs(40)).await.unwrap();
        assert_eq!(sink.batches, vec![vec![1, 2]]);
    }

    #[tokio::test]
    async fn test_sustained_failure_keeps_newest_readings() {
        let t0 = Instant::now();
        let mut b = batcher(1000, 10, Duration::from_secs(60), t0);
        let mut sink = RecordingSink {
            failing: true,
            ..Default::default()
        };

        for tag in 1..=1500u16 {
            b.offer(reading(tag));
            let now = t0 + Duration::from_secs(u64::from(tag));
            if let Some(result) = b.flush_if_due(&mut sink, now).await {
                assert!(result.is_err());
            }
        }

        assert_eq!(b.pending(), 1000);
        let tags: Vec<u16> = b.cache().iter().map(|r| r.tvoc_ppb).collect();
        assert_eq!(tags.first(), Some(&501));
        assert_eq!(tags.last(), Some(&1500));
        assert_eq!(b.stats().evicted, 500);
        assert_eq!(b.stats().successful_flushes, 0);
        assert!(sink.attempts > 0);
        assert!(sink.batches.is_empty());
    }

    #[tokio::test]
    async fn test_stalled_sink_times_out() {
        let t0 = Instant::now();
        let mut b = batcher(10, 1, Duration::ZERO, t0);
        let mut sink = StalledSink;
        b.offer(reading(1));

        let result = b.flush(&mut sink, t0).await;
        assert!(matches!(result, Err(DeliveryError::Timeout { .. })));
        assert_eq!(b.pending(), 1);
    }

    #[tokio::test]
    async fn test_flush_remaining_ignores_thresholds() {
        let t0 = Instant::now();
        let mut b = batcher(100, 50, Duration::from_secs(3600), t0);
        let mut sink = RecordingSink::default();
        b.offer(reading(7));

        assert!(!b.should_flush(t0));
        assert_eq!(b.flush_remaining(&mut sink).await.unwrap(), 1);
        assert_eq!(sink.batches, vec![vec![7]]);

        // empty cache: no call into the sink
        assert_eq!(b.flush_remaining(&mut sink).await.unwrap(), 0);
        assert_eq!(sink.attempts, 1);
    }

    #[test]
    fn test_policy_validation() {
        assert!(BatchPolicy::default().validate(1000).is_ok());
        let policy = BatchPolicy {
            batch_size: 50,
            ..Default::default()
        };
        assert!(matches!(
            policy.validate(10),
            Err(DeliveryError::InvalidSettings(_))
        ));
    }
}
