//! Linear retry schedule for token exchanges.

// std
use std::time::Duration as StdDuration;

/// Attempt budget with a delay that grows by a fixed step after every failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LinearBackoff {
	/// Total attempts, including the first one.
	pub max_attempts: u32,
	/// Delay added per failed attempt.
	pub step: StdDuration,
}
impl LinearBackoff {
	/// Default delay step between attempts.
	pub const DEFAULT_STEP: StdDuration = StdDuration::from_millis(1_000);

	/// Creates a schedule with the default one second step; zero attempts are bumped to one.
	pub fn new(max_attempts: u32) -> Self {
		Self { max_attempts: max_attempts.max(1), step: Self::DEFAULT_STEP }
	}

	/// Overrides the delay step.
	pub fn with_step(mut self, step: StdDuration) -> Self {
		self.step = step;

		self
	}

	/// Delay to wait after the `attempt`-th failure (1-based), or `None` when the budget is spent.
	pub fn delay_after(&self, attempt: u32) -> Option<StdDuration> {
		if attempt >= self.max_attempts {
			None
		} else {
			Some(self.step.saturating_mul(attempt))
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn delays_grow_linearly_until_budget_is_spent() {
		let backoff = LinearBackoff::new(4);

		assert_eq!(backoff.delay_after(1), Some(StdDuration::from_secs(1)));
		assert_eq!(backoff.delay_after(2), Some(StdDuration::from_secs(2)));
		assert_eq!(backoff.delay_after(3), Some(StdDuration::from_secs(3)));
		assert_eq!(backoff.delay_after(4), None);
	}

	#[test]
	fn zero_attempts_still_tries_once() {
		let backoff = LinearBackoff::new(0).with_step(StdDuration::from_millis(10));

		assert_eq!(backoff.max_attempts, 1);
		assert_eq!(backoff.delay_after(1), None);
	}
}
