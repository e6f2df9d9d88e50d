use crate::notify::{AddOptions, NotificationCenter};
use crate::ports::TimeProvider;
use crate::types::Category;

use std::time::Duration;
use tokio::task::JoinHandle;

// Rotating pool of demo business events, in the spirit of the dashboard
// this backs: one entry is injected per feed interval.
const SAMPLE_EVENTS: &[(Category, &str, &str)] = &[
    (
        Category::Success,
        "Report ready",
        "The monthly analytics report finished rendering.",
    ),
    (
        Category::Info,
        "New client inquiry",
        "A prospect requested a discovery call.",
    ),
    (
        Category::Warning,
        "Invoice overdue",
        "Invoice #1042 passed its due date.",
    ),
    (
        Category::Success,
        "Milestone reached",
        "Project 'Atlas rollout' hit its second milestone.",
    ),
    (
        Category::Error,
        "Agent run failed",
        "The lead-scoring agent stopped with an error.",
    ),
];

pub(crate) struct FeedHandle {
    handle: JoinHandle<()>,
}

impl FeedHandle {
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    #[cfg(test)]
    pub(crate) fn abort(&self) {
        self.handle.abort();
    }
}

/// Periodically adds a synthetic notification so a fresh install has
/// something to show. Runs until aborted; disabled for a zero interval.
pub(crate) struct SyntheticFeed<T> {
    time: T,
    interval: Duration,
}

impl<T: TimeProvider> SyntheticFeed<T> {
    pub(crate) fn new(time: T, interval: Duration) -> Self {
        Self { time, interval }
    }

    pub(crate) fn spawn(&self, center: NotificationCenter<T>) -> Option<FeedHandle> {
        if self.interval.is_zero() {
            return None;
        }
        let time = self.time.clone();
        let interval = self.interval;
        let handle = tokio::spawn(async move {
            let mut index = 0usize;
            loop {
                time.sleep(interval).await;
                let (category, title, message) = SAMPLE_EVENTS[index % SAMPLE_EVENTS.len()];
                index += 1;
                center.add(
                    category,
                    title,
                    Some(message),
                    AddOptions {
                        auto_hide: false,
                        ..AddOptions::default()
                    },
                );
            }
        });
        Some(FeedHandle { handle })
    }
}
