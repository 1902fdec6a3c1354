use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

// Two attempts per user and six per guild every sixty seconds, with at most
// three resolutions in flight per guild at once. Requests past the cap are
// rejected immediately rather than queued.
const USER_ATTEMPTS: usize = 2;
const GUILD_ATTEMPTS: usize = 6;
const ATTEMPT_WINDOW: Duration = Duration::from_secs(60);
const GUILD_CONCURRENCY: usize = 3;

#[derive(Debug, PartialEq, Eq)]
pub enum LimitExceeded {
    Cooldown { retry_after: Duration },
    TooManyInFlight,
}

/// Attempt-frequency and concurrency limits applied at the command boundary,
/// upstream of the resolver.
pub struct AttemptLimits {
    user_attempts: Mutex<HashMap<u64, Vec<Instant>>>,
    guild_attempts: Mutex<HashMap<u64, Vec<Instant>>>,
    in_flight: Arc<Mutex<HashMap<u64, usize>>>,
}

/// Held for the duration of one resolution; releases the guild's
/// concurrency slot on drop.
pub struct InFlightGuard {
    guild_id: u64,
    in_flight: Arc<Mutex<HashMap<u64, usize>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock();
        if let Some(count) = in_flight.get_mut(&self.guild_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                in_flight.remove(&self.guild_id);
            }
        }
    }
}

fn window_retry(attempts: &mut Vec<Instant>, limit: usize, now: Instant) -> Option<Duration> {
    attempts.retain(|t| now.duration_since(*t) < ATTEMPT_WINDOW);
    if attempts.len() >= limit {
        // Entries are in insertion order, so the first is the oldest.
        Some(ATTEMPT_WINDOW - now.duration_since(attempts[0]))
    } else {
        None
    }
}

impl AttemptLimits {
    pub fn new() -> Self {
        AttemptLimits {
            user_attempts: Mutex::new(HashMap::new()),
            guild_attempts: Mutex::new(HashMap::new()),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Admits one verification attempt, or says why not. An attempt only
    /// counts against the windows once it has actually been admitted.
    pub fn try_begin(&self, user_id: u64, guild_id: u64) -> Result<InFlightGuard, LimitExceeded> {
        self.try_begin_at(user_id, guild_id, Instant::now())
    }

    fn try_begin_at(
        &self,
        user_id: u64,
        guild_id: u64,
        now: Instant,
    ) -> Result<InFlightGuard, LimitExceeded> {
        let mut user_attempts = self.user_attempts.lock();
        let mut guild_attempts = self.guild_attempts.lock();

        let user_window = user_attempts.entry(user_id).or_default();
        if let Some(retry_after) = window_retry(user_window, USER_ATTEMPTS, now) {
            return Err(LimitExceeded::Cooldown { retry_after });
        }
        let guild_window = guild_attempts.entry(guild_id).or_default();
        if let Some(retry_after) = window_retry(guild_window, GUILD_ATTEMPTS, now) {
            return Err(LimitExceeded::Cooldown { retry_after });
        }

        {
            let mut in_flight = self.in_flight.lock();
            let count = in_flight.entry(guild_id).or_insert(0);
            if *count >= GUILD_CONCURRENCY {
                return Err(LimitExceeded::TooManyInFlight);
            }
            *count += 1;
        }

        user_attempts.entry(user_id).or_default().push(now);
        guild_attempts.entry(guild_id).or_default().push(now);

        Ok(InFlightGuard {
            guild_id,
            in_flight: Arc::clone(&self.in_flight),
        })
    }
}

impl Default for AttemptLimits {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn third_user_attempt_in_the_window_is_rejected() {
        let limits = AttemptLimits::new();
        let now = Instant::now();

        drop(limits.try_begin_at(1, 10, now).unwrap());
        drop(limits.try_begin_at(1, 10, now).unwrap());

        match limits.try_begin_at(1, 10, now) {
            Err(LimitExceeded::Cooldown { retry_after }) => {
                assert!(retry_after > Duration::ZERO);
                assert!(retry_after <= ATTEMPT_WINDOW);
            }
            other => panic!("expected a cooldown, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn attempts_fall_out_of_the_window() {
        let limits = AttemptLimits::new();
        let now = Instant::now();

        drop(limits.try_begin_at(1, 10, now).unwrap());
        drop(limits.try_begin_at(1, 10, now).unwrap());

        let later = now + ATTEMPT_WINDOW + Duration::from_secs(1);
        assert!(limits.try_begin_at(1, 10, later).is_ok());
    }

    #[test]
    fn guild_window_caps_across_users() {
        let limits = AttemptLimits::new();
        let now = Instant::now();

        for user in 1..=6 {
            drop(limits.try_begin_at(user, 10, now).unwrap());
        }
        assert!(matches!(
            limits.try_begin_at(7, 10, now),
            Err(LimitExceeded::Cooldown { .. })
        ));

        // A different guild is unaffected.
        assert!(limits.try_begin_at(7, 11, now).is_ok());
    }

    #[test]
    fn in_flight_cap_rejects_without_consuming_an_attempt() {
        let limits = AttemptLimits::new();
        let now = Instant::now();

        let _a = limits.try_begin_at(1, 10, now).unwrap();
        let _b = limits.try_begin_at(2, 10, now).unwrap();
        let c = limits.try_begin_at(3, 10, now).unwrap();

        assert!(matches!(
            limits.try_begin_at(4, 10, now),
            Err(LimitExceeded::TooManyInFlight)
        ));

        // Releasing a slot lets the same user straight back in, because the
        // rejected attempt was not recorded against the windows.
        drop(c);
        assert!(limits.try_begin_at(4, 10, now).is_ok());
    }
}
