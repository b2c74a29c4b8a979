use std::time::Duration;

use async_trait::async_trait;

/// Points in a session where rendering has to settle before continuing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A freshly opened tab.
    PageOpen,
    /// Before looking for campaign cards.
    Initial,
    /// After scrolling a card into view.
    Scroll,
    /// After clicking a card's expand affordance.
    Expand,
}

#[async_trait]
pub trait WaitStrategy: Send + Sync {
    async fn settle(&self, phase: Phase);
}

/// Sleep a fixed time per phase.
#[derive(Debug, Clone)]
pub struct FixedDelay {
    pub page_open: Duration,
    pub initial: Duration,
    pub scroll: Duration,
    pub expand: Duration,
}

impl Default for FixedDelay {
    fn default() -> Self {
        Self {
            page_open: Duration::from_millis(5000),
            initial: Duration::from_millis(3000),
            scroll: Duration::from_millis(800),
            expand: Duration::from_millis(1500),
        }
    }
}

impl FixedDelay {
    pub fn delay(&self, phase: Phase) -> Duration {
        match phase {
            Phase::PageOpen => self.page_open,
            Phase::Initial => self.initial,
            Phase::Scroll => self.scroll,
            Phase::Expand => self.expand,
        }
    }
}

#[async_trait]
impl WaitStrategy for FixedDelay {
    async fn settle(&self, phase: Phase) {
        tokio::time::sleep(self.delay(phase)).await;
    }
}

/// No waiting at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Immediate;

#[async_trait]
impl WaitStrategy for Immediate {
    async fn settle(&self, _phase: Phase) {}
}
