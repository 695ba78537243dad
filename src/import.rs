use anyhow::{Context, Result, anyhow};
use chrono::NaiveDate;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::database::{get_lottery_by_name, save_draw};
use crate::types::{Draw, Lottery};

/// A batch of results for one lottery, as found in files and feeds.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DrawFeed {
    pub lottery: String,
    pub draws: Vec<FeedDraw>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedDraw {
    pub draw_date: NaiveDate,
    pub main_numbers: Vec<u32>,
    #[serde(default)]
    pub extra_numbers: Vec<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub inserted: usize,
    pub duplicates: usize,
    pub rejected: usize,
}

impl ImportReport {
    pub fn merge(&mut self, other: ImportReport) {
        self.inserted += other.inserted;
        self.duplicates += other.duplicates;
        self.rejected += other.rejected;
    }
}

/// Stores the draws of a feed for an already known lottery.
///
/// Draws that break the lottery's shape are logged and counted as rejected;
/// draws for an existing date are ignored.
pub fn save_feed_draws(conn: &Connection, lottery: &Lottery, draws: &[FeedDraw]) -> Result<ImportReport> {
    let mut report = ImportReport::default();

    for feed_draw in draws {
        let mut draw = Draw {
            lottery_id: lottery.id,
            draw_date: feed_draw.draw_date,
            main_numbers: feed_draw.main_numbers.clone(),
            extra_numbers: feed_draw.extra_numbers.clone(),
        };
        draw.main_numbers.sort_unstable();
        draw.extra_numbers.sort_unstable();

        if let Err(e) = draw.validate(&lottery.config) {
            warn!("⚠ Skipping {} draw on {}: {}", lottery.name, draw.draw_date, e);
            report.rejected += 1;
            continue;
        }

        if save_draw(conn, &draw)? {
            report.inserted += 1;
        } else {
            report.duplicates += 1;
        }
    }

    Ok(report)
}

pub fn save_feed(conn: &Connection, feed: &DrawFeed) -> Result<ImportReport> {
    let lottery = get_lottery_by_name(conn, &feed.lottery)?
        .ok_or_else(|| anyhow!("Unknown lottery: {}", feed.lottery))?;
    save_feed_draws(conn, &lottery, &feed.draws)
}

pub fn parse_and_insert_raw_json(conn: &Connection, raw_json: &str) -> Result<ImportReport> {
    let feed: DrawFeed = serde_json::from_str(raw_json).context("Invalid draw JSON")?;
    save_feed(conn, &feed)
}

/// Imports every `.json` file of a directory. Missing directories import nothing.
pub fn import_directory(conn: &Connection, dir: &Path) -> Result<ImportReport> {
    let mut report = ImportReport::default();
    if !dir.exists() {
        info!("Import directory {:?} not found, nothing to import", dir);
        return Ok(report);
    }

    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read {:?}", dir))?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.extension().and_then(|s| s.to_str()) == Some("json"))
        .collect();
    paths.sort();

    for path in paths {
        info!("Reading file: {:?}", path);
        let raw = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        let file_report = parse_and_insert_raw_json(conn, &raw)
            .with_context(|| format!("Failed to import {:?}", path))?;
        info!(
            "📥 {:?}: {} inserted, {} duplicates, {} rejected",
            path, file_report.inserted, file_report.duplicates, file_report.rejected
        );
        report.merge(file_report);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::{count_draws, create_database_with_connection};
    use crate::presets::seed_default_lotteries;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        create_database_with_connection(&conn).unwrap();
        seed_default_lotteries(&conn).unwrap();
        conn
    }

    const FEED: &str = r#"{
        "lottery": "EuroMilhões",
        "draws": [
            { "draw_date": "2026-02-03", "main_numbers": [42, 4, 5, 13, 21], "extra_numbers": [9, 2] },
            { "draw_date": "2026-02-06", "main_numbers": [1, 2, 3, 4, 5], "extra_numbers": [1, 12] },
            { "draw_date": "2026-02-10", "main_numbers": [1, 2, 3, 4, 51], "extra_numbers": [1, 12] },
            { "draw_date": "2026-02-03", "main_numbers": [6, 7, 8, 9, 10], "extra_numbers": [3, 4] }
        ]
    }"#;

    #[test]
    fn test_raw_json_import() {
        let conn = setup();
        let report = parse_and_insert_raw_json(&conn, FEED).unwrap();
        assert_eq!(
            report,
            ImportReport {
                inserted: 2,
                duplicates: 1,
                rejected: 1
            }
        );

        let lottery = get_lottery_by_name(&conn, "EuroMilhões").unwrap().unwrap();
        assert_eq!(count_draws(&conn, lottery.id).unwrap(), 2);

        let stored = crate::database::get_draw_by_date(
            &conn,
            lottery.id,
            crate::utils::parse_date("2026-02-03").unwrap(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(stored.main_numbers, vec![4, 5, 13, 21, 42]);
        assert_eq!(stored.extra_numbers, vec![2, 9]);
    }

    #[test]
    fn test_unknown_lottery_and_bad_json() {
        let conn = setup();
        assert!(parse_and_insert_raw_json(&conn, r#"{"lottery": "Nope", "draws": []}"#).is_err());
        assert!(parse_and_insert_raw_json(&conn, "not json").is_err());
    }

    #[test]
    fn test_directory_import() {
        let conn = setup();
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("euromilhoes.json"), FEED).unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let report = import_directory(&conn, dir.path()).unwrap();
        assert_eq!(report.inserted, 2);

        let again = import_directory(&conn, dir.path()).unwrap();
        assert_eq!(again.inserted, 0);
        assert_eq!(again.duplicates, 3);
    }

    #[test]
    fn test_missing_directory_is_empty_import() {
        let conn = setup();
        let report = import_directory(&conn, Path::new("/nonexistent/lottery/json")).unwrap();
        assert_eq!(report, ImportReport::default());
    }
}
