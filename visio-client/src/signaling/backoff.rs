use rand::Rng;
use std::time::Duration;

/// Randomized exponential reconnect delay.
///
/// Each retry waits a uniformly random time in `[0, bound)`; the bound doubles
/// after every draw and returns to its initial value on [`reset`](Self::reset).
/// The bound is not capped.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    bound: Duration,
}

impl Backoff {
    pub fn new(initial: Duration) -> Self {
        Self {
            initial,
            bound: initial,
        }
    }

    /// Upper bound of the next delay.
    pub fn bound(&self) -> Duration {
        self.bound
    }

    pub fn next_delay(&mut self) -> Duration {
        let bound_ms = u64::try_from(self.bound.as_millis()).unwrap_or(u64::MAX);
        let delay_ms = if bound_ms == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..bound_ms)
        };
        self.bound = self.bound.saturating_mul(2);
        Duration::from_millis(delay_ms)
    }

    pub fn reset(&mut self) {
        self.bound = self.initial;
    }
}
