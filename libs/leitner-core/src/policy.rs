//! Interval policies: how long a card stays learned at a given level.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Decides the expiration date of a card that just reached `new_level`.
pub trait IntervalPolicy {
    /// Policy identifier, used in logs.
    fn name(&self) -> &'static str;

    /// Never panics; dates past the representable range saturate.
    fn expiration(&self, new_level: usize, tested: DateTime<Utc>) -> DateTime<Utc>;
}

/// Classic Leitner boxes: a fixed delay per level.
///
/// Level `n` (n >= 1) uses `delays_days[n - 1]`; levels past the end of the
/// table reuse the last delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeitnerPolicy {
    pub delays_days: Vec<u32>,
}

impl Default for LeitnerPolicy {
    fn default() -> Self {
        Self {
            delays_days: vec![1, 2, 4, 8, 16, 32, 64],
        }
    }
}

impl LeitnerPolicy {
    pub fn new(delays_days: Vec<u32>) -> Self {
        Self { delays_days }
    }

    /// Delay for a card entering `level`. Level 0 has no delay.
    pub fn delay(&self, level: usize) -> Duration {
        if level == 0 {
            return Duration::zero();
        }
        let index = (level - 1).min(self.delays_days.len().saturating_sub(1));
        let days = self.delays_days.get(index).copied().unwrap_or(1);
        Duration::days(i64::from(days))
    }
}

impl IntervalPolicy for LeitnerPolicy {
    fn name(&self) -> &'static str {
        "leitner"
    }

    fn expiration(&self, new_level: usize, tested: DateTime<Utc>) -> DateTime<Utc> {
        tested
            .checked_add_signed(self.delay(new_level))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn delays_follow_the_table() {
        let policy = LeitnerPolicy::default();
        assert_eq!(policy.delay(0), Duration::zero());
        assert_eq!(policy.delay(1), Duration::days(1));
        assert_eq!(policy.delay(3), Duration::days(4));
        assert_eq!(policy.delay(7), Duration::days(64));
    }

    #[test]
    fn levels_past_the_table_reuse_last_delay() {
        let policy = LeitnerPolicy::new(vec![1, 3]);
        assert_eq!(policy.delay(2), Duration::days(3));
        assert_eq!(policy.delay(12), Duration::days(3));
    }

    #[test]
    fn empty_table_defaults_to_one_day() {
        let policy = LeitnerPolicy::new(vec![]);
        assert_eq!(policy.delay(5), Duration::days(1));
    }

    #[test]
    fn huge_delays_saturate_instead_of_overflowing() {
        let tested = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        let policy = LeitnerPolicy::new(vec![u32::MAX]);
        assert_eq!(policy.expiration(1, tested), DateTime::<Utc>::MAX_UTC);

        let policy = LeitnerPolicy::new(vec![100_000_000]);
        assert_eq!(policy.expiration(3, tested), DateTime::<Utc>::MAX_UTC);
    }

    #[test]
    fn expiration_adds_delay_to_test_time() {
        let tested = Utc.with_ymd_and_hms(2024, 2, 1, 10, 0, 0).unwrap();
        let policy = LeitnerPolicy::default();
        assert_eq!(
            policy.expiration(2, tested),
            Utc.with_ymd_and_hms(2024, 2, 3, 10, 0, 0).unwrap()
        );
    }
}
