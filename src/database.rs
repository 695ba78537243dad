use crate::types::{
    Draw, Lottery, LotteryConfig, LotteryId, NewLottery, NewSuggestion, Suggestion,
    ValidationOutcome,
};
use crate::utils::{join_numbers, join_weekdays, parse_numbers, parse_weekdays};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result, Row, params};

pub fn create_database_with_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS lotteries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            main_count INTEGER NOT NULL,
            main_min INTEGER NOT NULL,
            main_max INTEGER NOT NULL,
            extra_count INTEGER NOT NULL DEFAULT 0,
            extra_min INTEGER NOT NULL DEFAULT 0,
            extra_max INTEGER NOT NULL DEFAULT 0,
            draw_days TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS draws (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lottery_id INTEGER NOT NULL,
            draw_date TEXT NOT NULL,
            main_numbers TEXT NOT NULL,
            extra_numbers TEXT NOT NULL DEFAULT '',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (lottery_id, draw_date),
            FOREIGN KEY (lottery_id) REFERENCES lotteries (id) ON DELETE CASCADE
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS suggestions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            lottery_id INTEGER NOT NULL,
            draw_date TEXT,
            main_numbers TEXT NOT NULL,
            extra_numbers TEXT NOT NULL DEFAULT '',
            algorithm TEXT NOT NULL,
            parameters TEXT NOT NULL DEFAULT '{}',
            was_validated INTEGER NOT NULL DEFAULT 0,
            actual_main_numbers TEXT,
            actual_extra_numbers TEXT,
            matches_main INTEGER,
            matches_extra INTEGER,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (lottery_id) REFERENCES lotteries (id) ON DELETE CASCADE
        )",
        [],
    )?;

    Ok(())
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}

fn numbers_at(row: &Row, idx: usize) -> Result<Vec<u32>> {
    let raw: String = row.get(idx)?;
    parse_numbers(&raw).map_err(|e| conversion_error(idx, e))
}

fn optional_numbers_at(row: &Row, idx: usize) -> Result<Vec<u32>> {
    let raw: Option<String> = row.get(idx)?;
    match raw {
        Some(raw) => parse_numbers(&raw).map_err(|e| conversion_error(idx, e)),
        None => Ok(Vec::new()),
    }
}

const LOTTERY_COLUMNS: &str = "id, name, main_count, main_min, main_max, extra_count, extra_min, extra_max, draw_days, is_active";

fn lottery_from_row(row: &Row) -> Result<Lottery> {
    let draw_days: String = row.get(8)?;
    Ok(Lottery {
        id: row.get(0)?,
        name: row.get(1)?,
        config: LotteryConfig {
            main_count: row.get(2)?,
            main_min: row.get(3)?,
            main_max: row.get(4)?,
            extra_count: row.get(5)?,
            extra_min: row.get(6)?,
            extra_max: row.get(7)?,
        },
        draw_days: parse_weekdays(&draw_days),
        is_active: row.get(9)?,
    })
}

const DRAW_COLUMNS: &str = "lottery_id, draw_date, main_numbers, extra_numbers";

fn draw_from_row(row: &Row) -> Result<Draw> {
    Ok(Draw {
        lottery_id: row.get(0)?,
        draw_date: row.get(1)?,
        main_numbers: numbers_at(row, 2)?,
        extra_numbers: numbers_at(row, 3)?,
    })
}

const SUGGESTION_COLUMNS: &str = "id, lottery_id, draw_date, main_numbers, extra_numbers, algorithm, parameters, \
     was_validated, actual_main_numbers, actual_extra_numbers, matches_main, matches_extra, created_at";

fn suggestion_from_row(row: &Row) -> Result<Suggestion> {
    let parameters: String = row.get(6)?;
    let parameters = serde_json::from_str(&parameters).map_err(|e| conversion_error(6, e))?;

    let was_validated: bool = row.get(7)?;
    let validation = if was_validated {
        Some(ValidationOutcome {
            actual_main_numbers: optional_numbers_at(row, 8)?,
            actual_extra_numbers: optional_numbers_at(row, 9)?,
            matches_main: row.get::<_, Option<u32>>(10)?.unwrap_or(0),
            matches_extra: row.get::<_, Option<u32>>(11)?.unwrap_or(0),
        })
    } else {
        None
    };

    Ok(Suggestion {
        id: row.get(0)?,
        lottery_id: row.get(1)?,
        draw_date: row.get(2)?,
        main_numbers: numbers_at(row, 3)?,
        extra_numbers: numbers_at(row, 4)?,
        algorithm: row.get(5)?,
        parameters,
        validation,
        created_at: row.get(12)?,
    })
}

// Lotteries

pub fn insert_lottery(conn: &Connection, lottery: &NewLottery) -> Result<LotteryId> {
    let config = &lottery.config;
    conn.execute(
        "INSERT OR IGNORE INTO lotteries (
            name, main_count, main_min, main_max, extra_count, extra_min, extra_max, draw_days
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            lottery.name,
            config.main_count,
            config.main_min,
            config.main_max,
            config.extra_count,
            config.extra_min,
            config.extra_max,
            join_weekdays(&lottery.draw_days),
        ],
    )?;

    if conn.changes() > 0 {
        Ok(conn.last_insert_rowid())
    } else {
        let mut stmt = conn.prepare("SELECT id FROM lotteries WHERE name = ?1")?;
        stmt.query_row([&lottery.name], |row| row.get::<_, i64>(0))
    }
}

pub fn get_all_lotteries(conn: &Connection) -> Result<Vec<Lottery>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM lotteries ORDER BY name",
        LOTTERY_COLUMNS
    ))?;
    let lottery_iter = stmt.query_map([], lottery_from_row)?;

    let mut results = Vec::new();
    for lottery in lottery_iter {
        results.push(lottery?);
    }
    Ok(results)
}

pub fn get_active_lotteries(conn: &Connection) -> Result<Vec<Lottery>> {
    Ok(get_all_lotteries(conn)?
        .into_iter()
        .filter(|l| l.is_active)
        .collect())
}

pub fn get_lottery(conn: &Connection, id: LotteryId) -> Result<Option<Lottery>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM lotteries WHERE id = ?1",
        LOTTERY_COLUMNS
    ))?;
    stmt.query_row([id], lottery_from_row).optional()
}

pub fn get_lottery_by_name(conn: &Connection, name: &str) -> Result<Option<Lottery>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM lotteries WHERE name = ?1 COLLATE NOCASE",
        LOTTERY_COLUMNS
    ))?;
    stmt.query_row([name], lottery_from_row).optional()
}

pub fn set_lottery_active(conn: &Connection, id: LotteryId, active: bool) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE lotteries SET is_active = ?2 WHERE id = ?1",
        params![id, active],
    )?;
    Ok(changed > 0)
}

// Draws

/// Inserts a draw; returns false when one already exists for the lottery and date.
pub fn save_draw(conn: &Connection, draw: &Draw) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO draws (lottery_id, draw_date, main_numbers, extra_numbers)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            draw.lottery_id,
            draw.draw_date,
            join_numbers(&draw.main_numbers),
            join_numbers(&draw.extra_numbers),
        ],
    )?;
    Ok(changed > 0)
}

/// All draws of a lottery, most recent first.
pub fn get_draw_history(conn: &Connection, lottery_id: LotteryId) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM draws WHERE lottery_id = ?1 ORDER BY draw_date DESC",
        DRAW_COLUMNS
    ))?;
    let draw_iter = stmt.query_map([lottery_id], draw_from_row)?;

    let mut results = Vec::new();
    for draw in draw_iter {
        results.push(draw?);
    }
    Ok(results)
}

pub fn get_latest_draws(conn: &Connection, lottery_id: LotteryId, limit: i64) -> Result<Vec<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM draws WHERE lottery_id = ?1 ORDER BY draw_date DESC LIMIT ?2",
        DRAW_COLUMNS
    ))?;
    let draw_iter = stmt.query_map(params![lottery_id, limit], draw_from_row)?;

    let mut results = Vec::new();
    for draw in draw_iter {
        results.push(draw?);
    }
    Ok(results)
}

pub fn get_draw_by_date(
    conn: &Connection,
    lottery_id: LotteryId,
    date: NaiveDate,
) -> Result<Option<Draw>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM draws WHERE lottery_id = ?1 AND draw_date = ?2",
        DRAW_COLUMNS
    ))?;
    stmt.query_row(params![lottery_id, date], draw_from_row)
        .optional()
}

/// Corrective removal of a single draw.
pub fn delete_draw(conn: &Connection, lottery_id: LotteryId, date: NaiveDate) -> Result<bool> {
    let changed = conn.execute(
        "DELETE FROM draws WHERE lottery_id = ?1 AND draw_date = ?2",
        params![lottery_id, date],
    )?;
    Ok(changed > 0)
}

pub fn count_draws(conn: &Connection, lottery_id: LotteryId) -> Result<usize> {
    let mut stmt = conn.prepare("SELECT COUNT(*) FROM draws WHERE lottery_id = ?1")?;
    stmt.query_row([lottery_id], |row| row.get(0))
}

// Suggestions

pub fn save_suggestion(conn: &Connection, suggestion: &NewSuggestion) -> Result<i64> {
    conn.execute(
        "INSERT INTO suggestions (
            lottery_id, draw_date, main_numbers, extra_numbers, algorithm, parameters
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            suggestion.lottery_id,
            suggestion.draw_date,
            join_numbers(&suggestion.main_numbers),
            join_numbers(&suggestion.extra_numbers),
            suggestion.algorithm,
            suggestion.parameters.to_string(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn query_suggestions<P: rusqlite::Params>(
    conn: &Connection,
    filter: &str,
    params: P,
) -> Result<Vec<Suggestion>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM suggestions {} ORDER BY draw_date DESC, id DESC",
        SUGGESTION_COLUMNS, filter
    ))?;
    let suggestion_iter = stmt.query_map(params, suggestion_from_row)?;

    let mut results = Vec::new();
    for suggestion in suggestion_iter {
        results.push(suggestion?);
    }
    Ok(results)
}

pub fn get_suggestions(conn: &Connection, lottery_id: Option<LotteryId>) -> Result<Vec<Suggestion>> {
    match lottery_id {
        Some(id) => query_suggestions(conn, "WHERE lottery_id = ?1", [id]),
        None => query_suggestions(conn, "", []),
    }
}

pub fn get_suggestion(conn: &Connection, id: i64) -> Result<Option<Suggestion>> {
    Ok(query_suggestions(conn, "WHERE id = ?1", [id])?.into_iter().next())
}

pub fn get_validated_suggestions(conn: &Connection, lottery_id: LotteryId) -> Result<Vec<Suggestion>> {
    query_suggestions(
        conn,
        "WHERE lottery_id = ?1 AND was_validated = 1",
        [lottery_id],
    )
}

/// Unvalidated suggestions that name a target draw date.
pub fn get_pending_suggestions(conn: &Connection, lottery_id: LotteryId) -> Result<Vec<Suggestion>> {
    query_suggestions(
        conn,
        "WHERE lottery_id = ?1 AND was_validated = 0 AND draw_date IS NOT NULL",
        [lottery_id],
    )
}

pub fn suggestion_exists_for_date(
    conn: &Connection,
    lottery_id: LotteryId,
    date: NaiveDate,
) -> Result<bool> {
    let mut stmt =
        conn.prepare("SELECT COUNT(*) FROM suggestions WHERE lottery_id = ?1 AND draw_date = ?2")?;
    let count: i64 = stmt.query_row(params![lottery_id, date], |row| row.get(0))?;
    Ok(count > 0)
}

/// Records a validation outcome only if the suggestion is still unvalidated.
///
/// Returns false when another caller already validated it; the stored result
/// is then left untouched.
pub fn mark_suggestion_validated(
    conn: &Connection,
    id: i64,
    outcome: &ValidationOutcome,
) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE suggestions
         SET actual_main_numbers = ?2, actual_extra_numbers = ?3,
             matches_main = ?4, matches_extra = ?5, was_validated = 1
         WHERE id = ?1 AND was_validated = 0",
        params![
            id,
            join_numbers(&outcome.actual_main_numbers),
            join_numbers(&outcome.actual_extra_numbers),
            outcome.matches_main,
            outcome.matches_extra,
        ],
    )?;
    Ok(changed == 1)
}

/// Removes suggestions that were stored without a target draw date.
pub fn delete_undated_suggestions(conn: &Connection) -> Result<usize> {
    conn.execute("DELETE FROM suggestions WHERE draw_date IS NULL", [])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use serde_json::json;

    fn setup() -> (Connection, LotteryId) {
        let conn = Connection::open_in_memory().unwrap();
        create_database_with_connection(&conn).unwrap();
        let id = insert_lottery(
            &conn,
            &NewLottery {
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
        )
        .unwrap();
        (conn, id)
    }

    fn date(raw: &str) -> NaiveDate {
        crate::utils::parse_date(raw).unwrap()
    }

    fn draw(lottery_id: LotteryId, day: &str, main: &[u32]) -> Draw {
        Draw {
            lottery_id,
            draw_date: date(day),
            main_numbers: main.to_vec(),
            extra_numbers: vec![2, 9],
        }
    }

    fn suggestion(lottery_id: LotteryId, day: Option<&str>) -> NewSuggestion {
        NewSuggestion {
            lottery_id,
            draw_date: day.map(date),
            main_numbers: vec![4, 23, 42, 43, 47],
            extra_numbers: vec![2, 9],
            algorithm: "auto_learning".to_string(),
            parameters: json!({ "total_draws_analyzed": 15 }),
        }
    }

    #[test]
    fn test_lottery_round_trip() {
        let (conn, id) = setup();
        let lottery = get_lottery(&conn, id).unwrap().unwrap();
        assert_eq!(lottery.name, "EuroMilhões");
        assert_eq!(lottery.config.main_max, 50);
        assert_eq!(lottery.draw_days, vec![Weekday::Tue, Weekday::Fri]);
        assert!(lottery.is_active);

        assert_eq!(get_lottery_by_name(&conn, "EuroMilhões").unwrap().unwrap().id, id);
        assert_eq!(get_lottery_by_name(&conn, "euromilhões").unwrap().unwrap().id, id);
        assert!(get_lottery_by_name(&conn, "Totoloto").unwrap().is_none());
    }

    #[test]
    fn test_insert_lottery_twice_returns_same_id() {
        let (conn, id) = setup();
        let again = insert_lottery(
            &conn,
            &NewLottery {
                name: "EuroMilhões".to_string(),
                config: LotteryConfig {
                    main_count: 5,
                    main_min: 1,
                    main_max: 50,
                    extra_count: 2,
                    extra_min: 1,
                    extra_max: 12,
                },
                draw_days: Vec::new(),
            },
        )
        .unwrap();
        assert_eq!(again, id);
        assert_eq!(get_all_lotteries(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_draw_ignored() {
        let (conn, id) = setup();
        assert!(save_draw(&conn, &draw(id, "2026-02-02", &[4, 5, 13, 21, 42])).unwrap());
        assert!(!save_draw(&conn, &draw(id, "2026-02-02", &[1, 2, 3, 4, 5])).unwrap());
        assert_eq!(count_draws(&conn, id).unwrap(), 1);

        let stored = get_draw_by_date(&conn, id, date("2026-02-02")).unwrap().unwrap();
        assert_eq!(stored.main_numbers, vec![4, 5, 13, 21, 42]);
    }

    #[test]
    fn test_history_most_recent_first() {
        let (conn, id) = setup();
        let draws = vec![
            draw(id, "2026-01-06", &[1, 2, 3, 4, 5]),
            draw(id, "2026-01-13", &[6, 7, 8, 9, 10]),
            draw(id, "2026-01-09", &[11, 12, 13, 14, 15]),
        ];
        for d in &draws {
            assert!(save_draw(&conn, d).unwrap());
        }

        let history = get_draw_history(&conn, id).unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|d| d.draw_date).collect();
        assert_eq!(
            dates,
            vec![date("2026-01-13"), date("2026-01-09"), date("2026-01-06")]
        );
        assert_eq!(get_latest_draws(&conn, id, 1).unwrap()[0].draw_date, date("2026-01-13"));
    }

    #[test]
    fn test_delete_draw() {
        let (conn, id) = setup();
        save_draw(&conn, &draw(id, "2026-02-02", &[4, 5, 13, 21, 42])).unwrap();
        assert!(delete_draw(&conn, id, date("2026-02-02")).unwrap());
        assert!(!delete_draw(&conn, id, date("2026-02-02")).unwrap());
        assert!(get_draw_by_date(&conn, id, date("2026-02-02")).unwrap().is_none());
    }

    #[test]
    fn test_inactive_lottery_left_out_of_active_list() {
        let (conn, id) = setup();
        assert!(set_lottery_active(&conn, id, false).unwrap());
        assert!(get_active_lotteries(&conn).unwrap().is_empty());
        assert!(!get_lottery(&conn, id).unwrap().unwrap().is_active);
        assert!(!set_lottery_active(&conn, 999, true).unwrap());
    }

    #[test]
    fn test_suggestion_lifecycle() {
        let (conn, id) = setup();
        let sid = save_suggestion(&conn, &suggestion(id, Some("2026-02-02"))).unwrap();

        let pending = get_pending_suggestions(&conn, id).unwrap();
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].was_validated());
        assert_eq!(pending[0].parameters["total_draws_analyzed"], 15);
        assert!(suggestion_exists_for_date(&conn, id, date("2026-02-02")).unwrap());

        let outcome = ValidationOutcome {
            actual_main_numbers: vec![4, 5, 13, 21, 42],
            actual_extra_numbers: vec![2, 9],
            matches_main: 2,
            matches_extra: 2,
        };
        assert!(mark_suggestion_validated(&conn, sid, &outcome).unwrap());

        let second = ValidationOutcome {
            matches_main: 5,
            ..outcome.clone()
        };
        assert!(!mark_suggestion_validated(&conn, sid, &second).unwrap());

        let stored = get_suggestion(&conn, sid).unwrap().unwrap();
        assert_eq!(stored.validation, Some(outcome));
        assert!(get_pending_suggestions(&conn, id).unwrap().is_empty());
        assert_eq!(get_validated_suggestions(&conn, id).unwrap().len(), 1);
    }

    #[test]
    fn test_undated_suggestions_not_pending_and_deletable() {
        let (conn, id) = setup();
        save_suggestion(&conn, &suggestion(id, None)).unwrap();
        save_suggestion(&conn, &suggestion(id, Some("2026-02-02"))).unwrap();

        assert_eq!(get_pending_suggestions(&conn, id).unwrap().len(), 1);
        assert_eq!(delete_undated_suggestions(&conn).unwrap(), 1);
        assert_eq!(get_suggestions(&conn, Some(id)).unwrap().len(), 1);
        assert_eq!(get_suggestions(&conn, None).unwrap().len(), 1);
    }
}
