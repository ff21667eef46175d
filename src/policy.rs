use crate::models::Problem;
use chrono::{Duration, NaiveDate};
use std::str::FromStr;

/// Interval policy selected once per deployment. Strategies are never mixed
/// per problem: switching mid-stream would reinterpret stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Doubling interval with a hard ceiling; any miss resets to 1 day.
    Backoff,
    /// Streak-to-interval table with a one-day recovery checkpoint after
    /// a lapse.
    StreakTable,
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "backoff" => Ok(Strategy::Backoff),
            "streak" => Ok(Strategy::StreakTable),
            other => Err(format!("unknown strategy '{other}' (expected 'backoff' or 'streak')")),
        }
    }
}

/// Everything the scheduler writes back to the problem row after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub next_review_date: NaiveDate,
    pub review_interval: i64,
    pub correct_streak: i64,
    pub correct_count: i64,
    pub total_count: i64,
}

/// Ceiling for the doubling strategy.
const MAX_BACKOFF_DAYS: i64 = 30;

/// Interval in days for the n-th consecutive success. Streaks of 4 and
/// beyond stay at 21 days.
fn streak_interval(streak: i64) -> i64 {
    match streak {
        ..=1 => 2,
        2 => 3,
        3 => 7,
        _ => 21,
    }
}

/// Computes the new schedule state for a problem after one attempt.
///
/// Pure function of (current row state, outcome of the immediately
/// preceding recorded attempt, new outcome, attempt date). `prev_correct`
/// is `None` when the problem has no recorded attempts before this one; it
/// matters only to the streak-table strategy's recovery rule.
///
/// Streak-table rules, in order:
/// 1. Failure: streak and spacing reset (streak 0, 1 day).
/// 2. Success right after a recorded failure: a single recovery day
///    (streak 1, 1 day) instead of the table value, so a lapse has to be
///    confirmed recovered before spacing escalates again.
/// 3. Any other success: streak increments and the table gives the gap.
pub fn apply_outcome(
    strategy: Strategy,
    problem: &Problem,
    prev_correct: Option<bool>,
    correct: bool,
    on: NaiveDate,
) -> Schedule {
    let correct_count = problem.correct_count + i64::from(correct);
    let total_count = problem.total_count + 1;

    let (review_interval, correct_streak) = match strategy {
        Strategy::Backoff => {
            let interval = if correct {
                (problem.review_interval * 2).min(MAX_BACKOFF_DAYS)
            } else {
                1
            };
            (interval, problem.correct_streak)
        }
        Strategy::StreakTable => {
            if !correct {
                (1, 0)
            } else if prev_correct == Some(false) {
                (1, 1)
            } else {
                let streak = problem.correct_streak + 1;
                (streak_interval(streak), streak)
            }
        }
    };

    Schedule {
        next_review_date: on + Duration::days(review_interval),
        review_interval,
        correct_streak,
        correct_count,
        total_count,
    }
}

/// First review date for a problem registered without an initiating attempt.
///
/// Backoff keeps the original one-day placeholder; the streak table starts
/// at its no-history default of two days with the streak left at 0.
pub fn initial_review_date(strategy: Strategy, on: NaiveDate) -> NaiveDate {
    let days = match strategy {
        Strategy::Backoff => 1,
        Strategy::StreakTable => 2,
    };
    on + Duration::days(days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(interval: i64, streak: i64) -> Problem {
        Problem {
            id: 1,
            set_id: 1,
            label: "3-14".to_string(),
            next_review_date: day(2024, 1, 1),
            review_interval: interval,
            correct_streak: streak,
            correct_count: 0,
            total_count: 0,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn backoff_doubles_up_to_cap() {
        let today = day(2024, 1, 1);
        let mut p = problem(1, 0);
        let expected = [2, 4, 8, 16, 30, 30];

        for want in expected {
            let s = apply_outcome(Strategy::Backoff, &p, Some(true), true, today);
            assert_eq!(s.review_interval, want);
            assert_eq!(s.next_review_date, today + Duration::days(want));
            p.review_interval = s.review_interval;
        }
    }

    #[test]
    fn backoff_failure_resets_to_one_day() {
        let today = day(2024, 1, 1);
        let p = problem(16, 0);
        let s = apply_outcome(Strategy::Backoff, &p, Some(true), false, today);
        assert_eq!(s.review_interval, 1);
        assert_eq!(s.next_review_date, day(2024, 1, 2));
    }

    #[test]
    fn backoff_counters_track_attempts() {
        let today = day(2024, 1, 1);
        let p = problem(1, 0);

        let s = apply_outcome(Strategy::Backoff, &p, None, true, today);
        assert_eq!((s.correct_count, s.total_count), (1, 1));

        let s = apply_outcome(Strategy::Backoff, &p, None, false, today);
        assert_eq!((s.correct_count, s.total_count), (0, 1));
    }

    #[test]
    fn streak_grows_through_table() {
        let today = day(2024, 1, 1);
        let mut p = problem(1, 0);
        let expected = [(1, 2), (2, 3), (3, 7), (4, 21), (5, 21)];

        let mut prev = None;
        for (streak, interval) in expected {
            let s = apply_outcome(Strategy::StreakTable, &p, prev, true, today);
            assert_eq!(s.correct_streak, streak);
            assert_eq!(s.review_interval, interval);
            p.correct_streak = s.correct_streak;
            prev = Some(true);
        }
    }

    #[test]
    fn streak_failure_resets() {
        let today = day(2024, 1, 1);
        let p = problem(7, 3);
        let s = apply_outcome(Strategy::StreakTable, &p, Some(true), false, today);
        assert_eq!(s.correct_streak, 0);
        assert_eq!(s.review_interval, 1);
        assert_eq!(s.next_review_date, day(2024, 1, 2));
    }

    #[test]
    fn success_after_failure_gets_recovery_day() {
        // Streak 0 after a recorded miss: one deliberate recovery day,
        // not the table's 2-day value for streak 1.
        let today = day(2024, 1, 1);
        let p = problem(1, 0);
        let s = apply_outcome(Strategy::StreakTable, &p, Some(false), true, today);
        assert_eq!(s.correct_streak, 1);
        assert_eq!(s.review_interval, 1);
        assert_eq!(s.next_review_date, day(2024, 1, 2));
    }

    #[test]
    fn fresh_first_success_uses_table() {
        // Same streak-1 result but with no prior miss on record: the
        // table value applies.
        let today = day(2024, 1, 1);
        let p = problem(1, 0);
        let s = apply_outcome(Strategy::StreakTable, &p, None, true, today);
        assert_eq!(s.correct_streak, 1);
        assert_eq!(s.review_interval, 2);
        assert_eq!(s.next_review_date, day(2024, 1, 3));
    }

    #[test]
    fn no_history_defaults() {
        let today = day(2024, 1, 1);
        assert_eq!(initial_review_date(Strategy::Backoff, today), day(2024, 1, 2));
        assert_eq!(initial_review_date(Strategy::StreakTable, today), day(2024, 1, 3));
    }

    #[test]
    fn strategy_parses_from_config_value() {
        assert_eq!("backoff".parse::<Strategy>().unwrap(), Strategy::Backoff);
        assert_eq!(" Streak ".parse::<Strategy>().unwrap(), Strategy::StreakTable);
        assert!("sm2".parse::<Strategy>().is_err());
    }
}
