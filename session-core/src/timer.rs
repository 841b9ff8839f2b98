//! The keep-alive timer: arms, re-arms, and evaluates session timeouts.
//!
//! The event loop owns actual timer scheduling (see the design note on
//! coroutine-free suspension); this module only decides, given the current
//! time and the slot's bookkeeping, whether the session has genuinely timed
//! out or whether a shorter follow-up timer should be armed instead.

use std::time::{Duration, Instant};

/// The outcome of evaluating a fired keep-alive timer against a slot's
/// `latest_msg_received` timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvaluation {
    /// `now - latest_msg_received >= revised_session_timeout`: the session
    /// must be closed.
    Expired,
    /// Traffic arrived since the timer was armed; re-arm for the remaining
    /// interval.
    Rearm { remaining: Duration },
}

/// Evaluates a fired keep-alive timer.
///
/// `latest_msg_received` is `None` when no message has arrived since
/// session creation; in that case, the session timeout is measured from
/// the timer's original arm time (`armed_at`), matching the source's use of
/// a single "latest activity" timestamp initialized at creation.
pub fn evaluate(
    now: Instant,
    armed_at: Instant,
    latest_msg_received: Option<Instant>,
    revised_session_timeout: Duration,
) -> TimerEvaluation {
    let reference = latest_msg_received.unwrap_or(armed_at);
    let elapsed = now.saturating_duration_since(reference);
    if elapsed >= revised_session_timeout {
        TimerEvaluation::Expired
    } else {
        TimerEvaluation::Rearm {
            remaining: revised_session_timeout - elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_traffic_since_arming_and_timeout_elapsed_is_expired() {
        let armed_at = Instant::now();
        let now = armed_at + Duration::from_secs(11);
        let result = evaluate(now, armed_at, None, Duration::from_secs(10));
        assert_eq!(result, TimerEvaluation::Expired);
    }

    #[test]
    fn recent_traffic_rearms_for_the_remaining_interval() {
        let armed_at = Instant::now();
        let latest = armed_at + Duration::from_secs(7);
        let now = armed_at + Duration::from_secs(10);
        let result = evaluate(now, armed_at, Some(latest), Duration::from_secs(10));
        assert_eq!(
            result,
            TimerEvaluation::Rearm {
                remaining: Duration::from_secs(7)
            }
        );
    }

    #[test]
    fn exact_boundary_counts_as_expired() {
        let armed_at = Instant::now();
        let now = armed_at + Duration::from_secs(10);
        let result = evaluate(now, armed_at, None, Duration::from_secs(10));
        assert_eq!(result, TimerEvaluation::Expired);
    }
}
