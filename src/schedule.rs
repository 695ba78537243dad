use chrono::{Datelike, Days, NaiveDate, Weekday};

/// First date strictly after `today` that falls on one of `draw_days`.
pub fn next_draw_date(draw_days: &[Weekday], today: NaiveDate) -> Option<NaiveDate> {
    (1..=7u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .find(|date| draw_days.contains(&date.weekday()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_tuesday_friday_schedule() {
        let days = [Weekday::Tue, Weekday::Fri];
        // 2026-02-02 is a Monday
        assert_eq!(next_draw_date(&days, date(2026, 2, 2)), Some(date(2026, 2, 3)));
        assert_eq!(next_draw_date(&days, date(2026, 2, 3)), Some(date(2026, 2, 6)));
        assert_eq!(next_draw_date(&days, date(2026, 2, 6)), Some(date(2026, 2, 10)));
        assert_eq!(next_draw_date(&days, date(2026, 2, 8)), Some(date(2026, 2, 10)));
    }

    #[test]
    fn test_single_draw_day_is_a_week_later() {
        assert_eq!(
            next_draw_date(&[Weekday::Mon], date(2026, 2, 2)),
            Some(date(2026, 2, 9))
        );
    }

    #[test]
    fn test_no_schedule() {
        assert_eq!(next_draw_date(&[], date(2026, 2, 2)), None);
    }
}
