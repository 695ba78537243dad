use chrono::{NaiveDate, Weekday};
use std::num::ParseIntError;

pub fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_numbers(raw: &str) -> Result<Vec<u32>, ParseIntError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect()
}

pub fn join_weekdays(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn parse_weekdays(raw: &str) -> Vec<Weekday> {
    raw.split(',')
        .filter_map(|part| part.trim().parse().ok())
        .collect()
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numbers_text_format() {
        assert_eq!(join_numbers(&[4, 23, 42]), "4,23,42");
        assert_eq!(parse_numbers("4, 23,42").unwrap(), vec![4, 23, 42]);
        assert_eq!(parse_numbers("").unwrap(), Vec::<u32>::new());
        assert!(parse_numbers("4,x").is_err());
    }

    #[test]
    fn test_weekdays_text_format() {
        let days = vec![Weekday::Tue, Weekday::Fri];
        assert_eq!(join_weekdays(&days), "Tue,Fri");
        assert_eq!(parse_weekdays("Tue,Fri"), days);
        assert_eq!(parse_weekdays(""), Vec::<Weekday>::new());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-02-02").unwrap(),
            NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
        );
        assert!(parse_date("02/02/2026").is_err());
    }
}
