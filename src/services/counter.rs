use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonically increasing counter, shareable across tasks
///
/// Counts start at a configurable first value so several deployments can
/// carve out disjoint ranges if they need to.
#[derive(Debug)]
pub struct Counter {
    count: AtomicU64,
}

impl Counter {
    /// Create a counter whose first returned count is `first_count`
    pub fn new(first_count: u64) -> Self {
        Self {
            count: AtomicU64::new(first_count),
        }
    }

    /// Return the current count and advance
    pub fn next(&self) -> u64 {
        let count = self.count.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(count, "picked a count");
        count
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn counts_from_the_configured_start() {
        let counter = Counter::new(5);

        assert_eq!(counter.next(), 5);
        assert_eq!(counter.next(), 6);
        assert_eq!(counter.next(), 7);
    }

    #[test]
    fn default_counts_from_one() {
        let counter = Counter::default();

        assert_eq!(counter.next(), 1);
        assert_eq!(counter.next(), 2);
    }

    #[test]
    fn concurrent_picks_never_collide() {
        let counter = Arc::new(Counter::new(0));
        let mut handles = Vec::new();

        for _ in 0..4 {
            let counter = Arc::clone(&counter);
            handles.push(std::thread::spawn(move || {
                (0..250).map(|_| counter.next()).collect::<Vec<_>>()
            }));
        }

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|handle| handle.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();

        assert_eq!(all.len(), 1000);
    }
}
