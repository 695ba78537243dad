use chrono::Weekday;
use rusqlite::Connection;
use tracing::info;

use crate::database::insert_lottery;
use crate::types::{LotteryConfig, LotteryId, NewLottery};

/// Games known out of the box, with their official draw weekdays.
pub fn default_lotteries() -> Vec<NewLottery> {
    vec![
        NewLottery {
            name: "EuroMilhões".to_string(),
            config: LotteryConfig {
                main_count: 5,
                main_min: 1,
                main_max: 50,
                extra_count: 2,
                extra_min: 1,
                extra_max: 12,
            },
            draw_days: vec![Weekday::Tue, Weekday::Fri],
        },
        NewLottery {
            name: "Totoloto".to_string(),
            config: LotteryConfig {
                main_count: 5,
                main_min: 1,
                main_max: 49,
                extra_count: 1,
                extra_min: 1,
                extra_max: 13,
            },
            draw_days: vec![Weekday::Wed, Weekday::Sat],
        },
        NewLottery {
            name: "EuroDreams".to_string(),
            config: LotteryConfig {
                main_count: 6,
                main_min: 1,
                main_max: 40,
                extra_count: 1,
                extra_min: 1,
                extra_max: 5,
            },
            draw_days: vec![Weekday::Mon, Weekday::Thu],
        },
    ]
}

/// Inserts the default games; existing names are left as they are.
pub fn seed_default_lotteries(conn: &Connection) -> rusqlite::Result<Vec<LotteryId>> {
    let mut ids = Vec::new();
    for lottery in default_lotteries() {
        ids.push(insert_lottery(conn, &lottery)?);
    }
    info!("🎰 {} lotteries available", ids.len());
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{create_database_with_connection, get_all_lotteries};

    #[test]
    fn test_presets_are_valid() {
        for lottery in default_lotteries() {
            assert!(lottery.config.validate().is_ok(), "{}", lottery.name);
            assert!(!lottery.draw_days.is_empty());
        }
    }

    #[test]
    fn test_seeding_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        create_database_with_connection(&conn).unwrap();
        let first = seed_default_lotteries(&conn).unwrap();
        let second = seed_default_lotteries(&conn).unwrap();
        assert_eq!(first, second);
        assert_eq!(get_all_lotteries(&conn).unwrap().len(), 3);
    }
}
