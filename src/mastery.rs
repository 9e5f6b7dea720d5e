// src/mastery.rs

use crate::constants::*;
use crate::models::{ConceptMasteryRecord, UpdateRule};
use chrono::{DateTime, Duration, Utc};
use log::debug;

// --- Public Interface ---

/// Scores one practice attempt against `current` and returns the updated record.
///
/// Pure: the clock reading is passed in, nothing is read or written.
pub fn apply_practice_outcome(
    current: &ConceptMasteryRecord,
    was_successful: bool,
    rule: UpdateRule,
    now: DateTime<Utc>,
) -> ConceptMasteryRecord {
    let mut next = current.clone();

    // 1. Counters (shared by both rules)
    next.times_encountered = current.times_encountered.saturating_add(1);
    if was_successful {
        next.times_succeeded = current.times_succeeded.saturating_add(1);
    } else {
        next.times_failed = current.times_failed.saturating_add(1);
    }

    debug!(
        "[Mastery Input] Rule: {}, Success: {}, Level: {:.3}, Encountered: {}",
        rule, was_successful, current.mastery_level, current.times_encountered
    );

    // 2. Mastery, review flag and review date
    match rule {
        UpdateRule::Ema => {
            next.mastery_level = ema_mastery(current.mastery_level, was_successful);
            next.needs_review = false;
            next.next_review_date = review_interval_days(rule, next.mastery_level)
                .map(|days| now + days_to_duration(days));
        }
        UpdateRule::SuccessRatio => {
            next.mastery_level = success_ratio(next.times_succeeded, next.times_encountered);
            next.needs_review = next.mastery_level < RATIO_REVIEW_THRESHOLD;
            next.next_review_date = if next.needs_review {
                review_interval_days(rule, next.mastery_level)
                    .map(|days| now + days_to_duration(days))
            } else {
                None
            };
        }
    }

    next.last_used = Some(now);
    next
}

/// Days until the next review for a freshly computed mastery level.
///
/// Rule A always schedules; Rule B only yields an interval when the concept
/// is below the review threshold.
pub fn review_interval_days(rule: UpdateRule, mastery_level: f64) -> Option<i64> {
    match rule {
        UpdateRule::Ema => {
            let days = if mastery_level >= EMA_TIER_HIGH_THRESHOLD {
                EMA_INTERVAL_HIGH
            } else if mastery_level >= EMA_TIER_MID_THRESHOLD {
                EMA_INTERVAL_MID
            } else {
                EMA_INTERVAL_LOW
            };
            Some(days)
        }
        UpdateRule::SuccessRatio => {
            if mastery_level >= RATIO_REVIEW_THRESHOLD {
                return None;
            }
            let days = (mastery_level * RATIO_INTERVAL_SCALE).floor() as i64;
            Some(days.max(RATIO_INTERVAL_MIN))
        }
    }
}

// --- Internal Algorithm Logic ---

fn ema_mastery(level: f64, was_successful: bool) -> f64 {
    let level = level.clamp(MASTERY_MIN, MASTERY_MAX);
    if was_successful {
        debug!("[Mastery logic] Branch: EMA Gain");
        (level + (MASTERY_MAX - level) * EMA_SUCCESS_GAIN).min(MASTERY_MAX)
    } else {
        debug!("[Mastery logic] Branch: EMA Decay");
        (level * EMA_FAILURE_DECAY).max(MASTERY_MIN)
    }
}

fn success_ratio(succeeded: u32, encountered: u32) -> f64 {
    // Counters were bumped before this is reached.
    debug_assert!(encountered >= 1, "success ratio over zero attempts");
    if encountered == 0 {
        return MASTERY_MIN;
    }
    f64::from(succeeded) / f64::from(encountered)
}

fn days_to_duration(days: i64) -> Duration {
    Duration::seconds(days * DAY_SECONDS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn record(level: f64, enc: u32, succ: u32, fail: u32) -> ConceptMasteryRecord {
        ConceptMasteryRecord {
            mastery_level: level,
            times_encountered: enc,
            times_succeeded: succ,
            times_failed: fail,
            ..ConceptMasteryRecord::default()
        }
    }

    #[test]
    fn ema_success_moves_ten_percent_of_gap() {
        let out = apply_practice_outcome(&record(0.5, 1, 1, 0), true, UpdateRule::Ema, now());
        assert!((out.mastery_level - 0.55).abs() < 1e-12);
        assert_eq!(out.times_encountered, 2);
        assert_eq!(out.times_succeeded, 2);
        assert_eq!(out.times_failed, 0);
        assert_eq!(out.next_review_date, Some(now() + Duration::days(7)));
        assert!(!out.needs_review);
        assert_eq!(out.last_used, Some(now()));
    }

    #[test]
    fn ema_failure_decays_and_keeps_long_interval() {
        let out = apply_practice_outcome(&record(0.9, 4, 4, 0), false, UpdateRule::Ema, now());
        assert!((out.mastery_level - 0.81).abs() < 1e-12);
        assert_eq!(out.times_failed, 1);
        assert_eq!(out.next_review_date, Some(now() + Duration::days(30)));
    }

    #[test]
    fn ema_clears_review_flag() {
        let mut r = record(0.1, 0, 0, 0);
        r.needs_review = true;
        let out = apply_practice_outcome(&r, false, UpdateRule::Ema, now());
        assert!(!out.needs_review);
        assert_eq!(out.next_review_date, Some(now() + Duration::days(1)));
    }

    #[test]
    fn ema_tier_boundaries() {
        assert_eq!(review_interval_days(UpdateRule::Ema, 0.8), Some(30));
        assert_eq!(review_interval_days(UpdateRule::Ema, 0.79), Some(7));
        assert_eq!(review_interval_days(UpdateRule::Ema, 0.5), Some(7));
        assert_eq!(review_interval_days(UpdateRule::Ema, 0.49), Some(1));
        assert_eq!(review_interval_days(UpdateRule::Ema, 0.0), Some(1));
    }

    #[test]
    fn ema_success_at_full_mastery_stays_at_one() {
        let out = apply_practice_outcome(&record(1.0, 9, 9, 0), true, UpdateRule::Ema, now());
        assert_eq!(out.mastery_level, 1.0);
    }

    #[test]
    fn ratio_success_above_threshold_leaves_review_unset() {
        let mut r = record(0.2, 3, 2, 1);
        r.next_review_date = Some(now());
        let out = apply_practice_outcome(&r, true, UpdateRule::SuccessRatio, now());
        assert_eq!(out.times_encountered, 4);
        assert_eq!(out.times_succeeded, 3);
        assert_eq!(out.mastery_level, 0.75);
        assert!(!out.needs_review);
        assert_eq!(out.next_review_date, None);
    }

    #[test]
    fn ratio_below_threshold_schedules_review() {
        let out =
            apply_practice_outcome(&record(0.9, 1, 1, 0), false, UpdateRule::SuccessRatio, now());
        assert_eq!(out.mastery_level, 0.5);
        assert!(out.needs_review);
        assert_eq!(out.next_review_date, Some(now() + Duration::days(7)));
    }

    #[test]
    fn ratio_interval_has_one_day_floor() {
        assert_eq!(review_interval_days(UpdateRule::SuccessRatio, 0.0), Some(1));
        assert_eq!(review_interval_days(UpdateRule::SuccessRatio, 0.05), Some(1));
        assert_eq!(review_interval_days(UpdateRule::SuccessRatio, 0.5), Some(7));
        assert_eq!(review_interval_days(UpdateRule::SuccessRatio, 0.69), Some(9));
        assert_eq!(review_interval_days(UpdateRule::SuccessRatio, 0.7), None);
    }

    #[test]
    fn first_failure_under_ratio_rule_is_zero_mastery() {
        let out =
            apply_practice_outcome(&record(0.4, 0, 0, 0), false, UpdateRule::SuccessRatio, now());
        assert_eq!(out.mastery_level, 0.0);
        assert!(out.needs_review);
        assert_eq!(out.next_review_date, Some(now() + Duration::days(1)));
    }
}
