use std::time::Duration;

use rand::Rng;

const SECONDS_PER_MINUTE: u64 = 60;

/// Randomized step backoff for re-subscribing to the real-time channel.
///
/// Attempt 1 fires immediately. Attempt `n >= 2` waits a whole number of
/// minutes drawn uniformly from `windows_minutes[n - 2]`; attempts past the
/// configured windows reuse the last one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectBackoff {
    max_retry: u32,
    windows_minutes: Vec<(u64, u64)>,
}

impl ReconnectBackoff {
    pub fn new(max_retry: u32, windows_minutes: Vec<(u64, u64)>) -> Self {
        let windows_minutes = windows_minutes
            .into_iter()
            .map(|(low, high)| (low.min(high), low.max(high)))
            .collect();
        Self {
            max_retry,
            windows_minutes,
        }
    }

    /// Same windows, different retry ceiling.
    pub fn with_max_retry(mut self, max_retry: u32) -> Self {
        self.max_retry = max_retry;
        self
    }

    pub fn max_retry(&self) -> u32 {
        self.max_retry
    }

    pub fn windows_minutes(&self) -> &[(u64, u64)] {
        &self.windows_minutes
    }

    pub fn delay_for_attempt<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let index = (attempt as usize - 2).min(self.windows_minutes.len().saturating_sub(1));
        let Some(&(low, high)) = self.windows_minutes.get(index) else {
            return Duration::ZERO;
        };
        let minutes = rng.gen_range(low..=high);
        Duration::from_secs(minutes.saturating_mul(SECONDS_PER_MINUTE))
    }
}

impl Default for ReconnectBackoff {
    fn default() -> Self {
        Self::new(3, vec![(1, 10), (11, 20)])
    }
}
