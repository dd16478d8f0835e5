//! Announce and reminder times for a talk.
//!
//! Announcements never go out at weekends: a date landing on Saturday or
//! Sunday is pulled back two days. Days are shifted before the hour is pinned.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

use crate::config::{AnnouncePolicy, HourOfDay, ReminderPolicy};

/// Days subtracted from an announce date that falls on a weekend.
const WEEKEND_SHIFT_DAYS: u64 = 2;

/// Computes when the "upcoming talk" announcement for a talk goes out.
///
/// # Arguments
///
/// * `talk_date` - Calendar date of the talk
/// * `policy` - Days ahead and hour of the announcement
///
/// # Returns
///
/// `days_before` days ahead of the talk at the policy hour, moved back two
/// days if that lands on a Saturday or Sunday. Results before chrono's
/// earliest date saturate at [`NaiveDate::MIN`].
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use talkbot::config::{AnnouncePolicy, HourOfDay};
/// use talkbot::talk::schedule::announce_datetime;
///
/// let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
/// let policy = AnnouncePolicy { days_before: 2, time: HourOfDay::new(10).unwrap() };
/// let at = announce_datetime(monday, &policy);
/// assert_eq!(at.to_string(), "2026-10-15 10:00:00");
/// ```
pub fn announce_datetime(talk_date: NaiveDate, policy: &AnnouncePolicy) -> NaiveDateTime {
    let mut date = talk_date
        .checked_sub_days(Days::new(u64::from(policy.days_before)))
        .unwrap_or(NaiveDate::MIN);

    if is_weekend(date) {
        date = date
            .checked_sub_days(Days::new(WEEKEND_SHIFT_DAYS))
            .unwrap_or(date);
    }

    date.and_time(top_of_hour(policy.time))
}

/// Computes when the "starting soon" reminder goes out.
///
/// The reminder is always sent on the day of the talk itself, at the policy
/// hour. Weekend talks are not shifted.
pub fn reminder_datetime(talk_date: NaiveDate, policy: &ReminderPolicy) -> NaiveDateTime {
    talk_date.and_time(top_of_hour(policy.time))
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn top_of_hour(hour: HourOfDay) -> NaiveTime {
    // HourOfDay is always 0-23
    NaiveTime::from_hms_opt(hour.get(), 0, 0).unwrap_or(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn announce(days_before: u32, time: u32) -> AnnouncePolicy {
        AnnouncePolicy {
            days_before,
            time: HourOfDay::new(time).unwrap(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, hour: u32) -> NaiveDateTime {
        d.and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn test_friday_talk_announced_wednesday() {
        let friday = date(2026, 10, 23);
        assert_eq!(
            announce_datetime(friday, &announce(2, 10)),
            at(date(2026, 10, 21), 10)
        );
    }

    #[test]
    fn test_monday_talk_announced_previous_thursday() {
        // Two days before Monday is Saturday, pulled back to Thursday
        let monday = date(2026, 10, 19);
        let announced = announce_datetime(monday, &announce(2, 9));
        assert_eq!(announced, at(date(2026, 10, 15), 9));
        assert_eq!(announced.weekday(), Weekday::Thu);
    }

    #[test]
    fn test_sunday_landing_shifts_to_friday() {
        // One day before Monday is Sunday; the shift is always two days
        let monday = date(2026, 10, 19);
        let announced = announce_datetime(monday, &announce(1, 9));
        assert_eq!(announced, at(date(2026, 10, 16), 9));
        assert_eq!(announced.weekday(), Weekday::Fri);
    }

    #[test]
    fn test_same_day_announcement() {
        let tuesday = date(2026, 10, 20);
        assert_eq!(
            announce_datetime(tuesday, &announce(0, 8)),
            at(tuesday, 8)
        );
    }

    #[test]
    fn test_weekend_talk_same_day_announcement_shifted() {
        let saturday = date(2026, 10, 24);
        assert_eq!(
            announce_datetime(saturday, &announce(0, 8)),
            at(date(2026, 10, 22), 8)
        );
    }

    #[test]
    fn test_shift_crosses_month_boundary() {
        // Mon 2 Nov 2026 - 2 days = Sat 31 Oct, shifted to Thu 29 Oct
        let monday = date(2026, 11, 2);
        assert_eq!(
            announce_datetime(monday, &announce(2, 10)),
            at(date(2026, 10, 29), 10)
        );
    }

    #[test]
    fn test_midnight_announce_hour() {
        let friday = date(2026, 10, 23);
        assert_eq!(
            announce_datetime(friday, &announce(1, 0)),
            at(date(2026, 10, 22), 0)
        );
    }

    #[test]
    fn test_reminder_same_day_at_hour() {
        let monday = date(2026, 10, 19);
        let policy = ReminderPolicy {
            time: HourOfDay::new(9).unwrap(),
        };
        assert_eq!(reminder_datetime(monday, &policy), at(monday, 9));
    }

    #[test]
    fn test_huge_days_before_saturates() {
        let friday = date(2026, 10, 23);
        let announced = announce_datetime(friday, &announce(u32::MAX, 10));
        assert!(announced.date() < friday);
        assert_eq!(announced.time(), NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    proptest! {
        #[test]
        fn prop_announce_never_on_weekend(
            offset in 0u32..3650,
            days_before in 0u32..=14,
            hour in 0u32..=23,
        ) {
            let talk_date = date(2020, 1, 1) + Days::new(u64::from(offset));
            let announced = announce_datetime(talk_date, &announce(days_before, hour));
            prop_assert!(!is_weekend(announced.date()));
            prop_assert_eq!(announced.time(), NaiveTime::from_hms_opt(hour, 0, 0).unwrap());
        }

        #[test]
        fn prop_announce_not_after_reminder(
            offset in 0u32..3650,
            days_before in 1u32..=14,
            announce_hour in 0u32..=23,
            reminder_hour in 0u32..=23,
        ) {
            let talk_date = date(2020, 1, 1) + Days::new(u64::from(offset));
            let announced = announce_datetime(talk_date, &announce(days_before, announce_hour));
            let reminder = reminder_datetime(
                talk_date,
                &ReminderPolicy { time: HourOfDay::new(reminder_hour).unwrap() },
            );
            prop_assert!(announced < reminder);
            prop_assert_eq!(reminder.date(), talk_date);
        }
    }
}
