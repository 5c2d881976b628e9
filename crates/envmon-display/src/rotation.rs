use crate::PageKind;
use envmon_ingest::HealthSnapshot;
use std::time::{Duration, Instant};
use tracing::debug;

/// Cycles through pages, holding each for the dwell time
#[derive(Debug, Clone)]
pub struct PageRotation {
    order: Vec<PageKind>,
    dwell: Duration,
    skip_healthy_health_page: bool,
    index: usize,
    shown_since: Option<Instant>,
}

impl PageRotation {
    /// An empty order falls back to [`PageKind::DEFAULT_ORDER`]
    pub fn new(order: Vec<PageKind>, dwell: Duration, skip_healthy_health_page: bool) -> Self {
        let order = if order.is_empty() {
            PageKind::DEFAULT_ORDER.to_vec()
        } else {
            order
        };
        Self {
            order,
            dwell,
            skip_healthy_health_page,
            index: 0,
            shown_since: None,
        }
    }

    pub fn order(&self) -> &[PageKind] {
        &self.order
    }

    fn eligible(&self, page: PageKind, health: &HealthSnapshot) -> bool {
        !(page == PageKind::SensorHealth && self.skip_healthy_health_page && health.all_ok())
    }

    /// Next eligible index after `from`; `from` itself if nothing else qualifies
    fn next_eligible(&self, from: usize, health: &HealthSnapshot) -> usize {
        (1..=self.order.len())
            .map(|step| (from + step) % self.order.len())
            .find(|&i| self.eligible(self.order[i], health))
            .unwrap_or(from)
    }

    /// Page to show at `now`, advancing once the dwell time is over
    pub fn select(&mut self, now: Instant, health: &HealthSnapshot) -> PageKind {
        match self.shown_since {
            None => {
                if !self.eligible(self.order[self.index], health) {
                    self.index = self.next_eligible(self.index, health);
                }
                self.shown_since = Some(now);
            }
            Some(since) => {
                let expired = now.saturating_duration_since(since) >= self.dwell;
                if expired || !self.eligible(self.order[self.index], health) {
                    self.index = self.next_eligible(self.index, health);
                    self.shown_since = Some(now);
                    debug!(page = ?self.order[self.index], "Page advanced");
                }
            }
        }
        self.order[self.index]
    }
}
