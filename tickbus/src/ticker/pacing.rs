//! Fixed-rate pacing with carried overrun

use std::time::Duration;

/// Advance a tick counter, wrapping to zero at `i64::MAX`
pub fn next_tick(tick: i64) -> i64 {
    tick.checked_add(1).map_or(0, |next| next % i64::MAX)
}

/// Sleep calculator for a fixed-period loop
///
/// An iteration that runs over budget carries the excess into the next one,
/// which then gets a shorter sleep (or none) so the loop catches up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pacer {
    period: Duration,
    carried: Duration,
}

impl Pacer {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            carried: Duration::ZERO,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Overrun not yet paid back
    pub fn carried_overrun(&self) -> Duration {
        self.carried
    }

    /// How long to sleep after an iteration that took `elapsed`
    ///
    /// `period - carried - elapsed`; when that is negative the deficit becomes
    /// the new carried overrun and the result is zero.
    pub fn next_wait(&mut self, elapsed: Duration) -> Duration {
        let spent = self.carried.saturating_add(elapsed);
        match self.period.checked_sub(spent) {
            Some(wait) => {
                self.carried = Duration::ZERO;
                wait
            }
            None => {
                self.carried = spent - self.period;
                Duration::ZERO
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_within_budget_sleeps_remainder() {
        let mut pacer = Pacer::new(ms(33));
        assert_eq!(pacer.next_wait(ms(10)), ms(23));
        assert_eq!(pacer.carried_overrun(), Duration::ZERO);
    }

    #[test]
    fn test_overrun_is_carried_then_paid_back() {
        let mut pacer = Pacer::new(ms(33));

        assert_eq!(pacer.next_wait(ms(50)), Duration::ZERO);
        assert_eq!(pacer.carried_overrun(), ms(17));

        // 33 - 17 - 0 = 16
        assert_eq!(pacer.next_wait(Duration::ZERO), ms(16));
        assert_eq!(pacer.carried_overrun(), Duration::ZERO);
    }

    #[test]
    fn test_overrun_accumulates_until_a_body_fits() {
        let mut pacer = Pacer::new(ms(33));
        assert_eq!(pacer.next_wait(ms(50)), Duration::ZERO);
        assert_eq!(pacer.next_wait(ms(30)), Duration::ZERO);
        assert_eq!(pacer.carried_overrun(), ms(14));
        assert_eq!(pacer.next_wait(ms(4)), ms(15));
        assert_eq!(pacer.carried_overrun(), Duration::ZERO);
    }

    #[test]
    fn test_exact_budget_sleeps_zero_without_carry() {
        let mut pacer = Pacer::new(ms(33));
        assert_eq!(pacer.next_wait(ms(33)), Duration::ZERO);
        assert_eq!(pacer.carried_overrun(), Duration::ZERO);
    }

    #[test]
    fn test_next_tick_wraps() {
        assert_eq!(next_tick(0), 1);
        assert_eq!(next_tick(i64::MAX - 2), i64::MAX - 1);
        assert_eq!(next_tick(i64::MAX - 1), 0);
        assert_eq!(next_tick(i64::MAX), 0);
    }

    proptest! {
        #[test]
        fn prop_time_is_conserved(period in 1u64..100, bodies in prop::collection::vec(0u64..200, 1..50)) {
            let mut pacer = Pacer::new(ms(period));
            for body in bodies {
                let before = pacer.carried_overrun();
                let wait = pacer.next_wait(ms(body));
                let after = pacer.carried_overrun();
                prop_assert_eq!(before + ms(body) + wait, ms(period) + after);
                prop_assert!(wait.is_zero() || after.is_zero());
            }
        }

        #[test]
        fn prop_next_tick_stays_in_range(tick in 0i64..i64::MAX) {
            let next = next_tick(tick);
            prop_assert!(next >= 0);
            prop_assert!(next == tick + 1 || next == 0);
        }
    }
}
