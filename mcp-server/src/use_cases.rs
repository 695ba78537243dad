use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rusqlite::Connection;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use lotto_suggest::database::*;
use lotto_suggest::import::parse_and_insert_raw_json;
use lotto_suggest::schedule::next_draw_date;
use lotto_suggest::stats::compute_statistics;
use lotto_suggest::suggestions::{
    generate_for_all_lotteries, generate_for_lottery, suggestion_summary, validate_all_lotteries,
};
use lotto_suggest::utils::parse_date;
use lotto_suggest::{Draw, Lottery, SuggestError, WeightConfig, validate_suggestions};

fn str_arg<'a>(arguments: &'a HashMap<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("Missing {} parameter", key))
}

fn date_arg(arguments: &HashMap<String, Value>, key: &str) -> Result<NaiveDate> {
    let raw = str_arg(arguments, key)?;
    parse_date(raw).map_err(|e| anyhow!("Invalid {} '{}': {}", key, raw, e))
}

fn numbers_arg(arguments: &HashMap<String, Value>, key: &str) -> Result<Vec<u32>> {
    match arguments.get(key) {
        Some(value) => serde_json::from_value(value.clone())
            .map_err(|e| anyhow!("Invalid {} parameter: {}", key, e)),
        None => Ok(Vec::new()),
    }
}

fn today_arg(arguments: &HashMap<String, Value>) -> Result<NaiveDate> {
    if arguments.contains_key("today") {
        date_arg(arguments, "today")
    } else {
        Ok(chrono::Local::now().date_naive())
    }
}

/// Looks a lottery up by numeric id or by name.
fn resolve_lottery(conn: &Connection, arguments: &HashMap<String, Value>) -> Result<Lottery> {
    let value = arguments
        .get("lottery")
        .ok_or_else(|| anyhow!("Missing lottery parameter"))?;

    let found = match value {
        Value::Number(n) => match n.as_i64() {
            Some(id) => get_lottery(conn, id)?,
            None => None,
        },
        Value::String(s) => match s.parse::<i64>() {
            Ok(id) => get_lottery(conn, id)?,
            Err(_) => get_lottery_by_name(conn, s)?,
        },
        _ => None,
    };

    found.ok_or_else(|| anyhow::Error::from(SuggestError::LotteryNotFound(value.to_string())))
}

fn optional_lottery(conn: &Connection, arguments: &HashMap<String, Value>) -> Result<Option<Lottery>> {
    if arguments.contains_key("lottery") {
        resolve_lottery(conn, arguments).map(Some)
    } else {
        Ok(None)
    }
}

pub struct LotteryUseCase {
    connection: Arc<Connection>,
}

impl LotteryUseCase {
    pub fn new(connection: Arc<Connection>) -> Self {
        Self { connection }
    }

    pub async fn list_lotteries(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let active_only = arguments
            .get("active_only")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
        let lotteries = if active_only {
            get_active_lotteries(&self.connection)?
        } else {
            get_all_lotteries(&self.connection)?
        };

        Ok(json!({
            "success": true,
            "lotteries": lotteries
        })
        .to_string())
    }

    pub async fn set_lottery_active(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let active = arguments
            .get("active")
            .and_then(|v| v.as_bool())
            .ok_or_else(|| anyhow!("Missing active parameter"))?;
        set_lottery_active(&self.connection, lottery.id, active)?;

        Ok(json!({
            "success": true,
            "lottery": lottery.name,
            "is_active": active
        })
        .to_string())
    }

    pub async fn get_draw_history(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let draws = match arguments.get("limit").and_then(|v| v.as_i64()) {
            Some(limit) => get_latest_draws(&self.connection, lottery.id, limit)?,
            None => get_draw_history(&self.connection, lottery.id)?,
        };

        Ok(json!({
            "success": true,
            "lottery": lottery.name,
            "count": draws.len(),
            "draws": draws
        })
        .to_string())
    }

    pub async fn save_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let mut draw = Draw {
            lottery_id: lottery.id,
            draw_date: date_arg(arguments, "draw_date")?,
            main_numbers: numbers_arg(arguments, "main_numbers")?,
            extra_numbers: numbers_arg(arguments, "extra_numbers")?,
        };
        draw.main_numbers.sort_unstable();
        draw.extra_numbers.sort_unstable();
        draw.validate(&lottery.config)?;

        let inserted = save_draw(&self.connection, &draw)?;
        let message = if inserted {
            format!("Saved {} draw for {}", lottery.name, draw.draw_date)
        } else {
            format!("A {} draw for {} already exists", lottery.name, draw.draw_date)
        };

        Ok(json!({
            "success": true,
            "inserted": inserted,
            "draw": draw,
            "message": message
        })
        .to_string())
    }

    pub async fn delete_draw(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let date = date_arg(arguments, "draw_date")?;
        let deleted = delete_draw(&self.connection, lottery.id, date)?;

        Ok(json!({
            "success": true,
            "deleted": deleted
        })
        .to_string())
    }

    pub async fn get_number_statistics(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|l| l as usize)
            .unwrap_or(10);

        let history = get_draw_history(&self.connection, lottery.id)?;
        let stats = compute_statistics(&history, lottery.config.main_min, lottery.config.main_max);

        Ok(json!({
            "success": true,
            "lottery": lottery.name,
            "hot_numbers": stats.hot_numbers(limit),
            "cold_numbers": stats.cold_numbers(limit),
            "statistics": stats
        })
        .to_string())
    }

    pub async fn next_draw_date(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let today = today_arg(arguments)?;

        Ok(json!({
            "success": true,
            "lottery": lottery.name,
            "next_draw_date": next_draw_date(&lottery.draw_days, today)
        })
        .to_string())
    }

    pub async fn parse_and_insert_raw_json(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let raw_json = str_arg(arguments, "raw_json")?;
        let report = parse_and_insert_raw_json(&self.connection, raw_json)?;

        Ok(json!({
            "success": true,
            "report": report,
            "message": format!("Inserted {} draws ({} duplicates, {} rejected)", report.inserted, report.duplicates, report.rejected)
        })
        .to_string())
    }
}

pub struct SuggestionUseCase {
    connection: Arc<Connection>,
    weights: WeightConfig,
    rng: Mutex<StdRng>,
}

impl SuggestionUseCase {
    pub fn new(connection: Arc<Connection>, weights: WeightConfig, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self {
            connection,
            weights,
            rng: Mutex::new(rng),
        }
    }

    fn weights_arg(&self, arguments: &HashMap<String, Value>) -> Result<WeightConfig> {
        match arguments.get("weights") {
            Some(value) => {
                let weights: WeightConfig = serde_json::from_value(value.clone())
                    .map_err(|e| anyhow!("Invalid weights parameter: {}", e))?;
                weights.validate()?;
                Ok(weights)
            }
            None => Ok(self.weights),
        }
    }

    fn with_rng<T>(
        &self,
        arguments: &HashMap<String, Value>,
        f: impl FnOnce(&mut StdRng) -> Result<T>,
    ) -> Result<T> {
        match arguments.get("seed").and_then(|v| v.as_u64()) {
            Some(seed) => f(&mut StdRng::seed_from_u64(seed)),
            None => {
                let mut rng = self.rng.lock().map_err(|_| anyhow!("Random generator lock poisoned"))?;
                f(&mut *rng)
            }
        }
    }

    pub async fn generate_suggestion(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = resolve_lottery(&self.connection, arguments)?;
        let weights = self.weights_arg(arguments)?;
        let today = today_arg(arguments)?;

        let outcome = self.with_rng(arguments, |rng| {
            Ok(generate_for_lottery(&self.connection, lottery.id, &weights, today, rng)?)
        })?;

        Ok(json!({
            "success": true,
            "suggestion_id": outcome.suggestion_id,
            "saved": outcome.suggestion_id.is_some(),
            "lottery": outcome.lottery_name,
            "draw_date": outcome.target_date,
            "main_numbers": outcome.generated.main_numbers,
            "extra_numbers": outcome.generated.extra_numbers,
            "insights": outcome.generated.insights
        })
        .to_string())
    }

    pub async fn generate_for_all_lotteries(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let weights = self.weights_arg(arguments)?;
        let today = today_arg(arguments)?;

        let entries = self.with_rng(arguments, |rng| {
            Ok(generate_for_all_lotteries(&self.connection, &weights, today, rng)?)
        })?;
        let generated = entries.iter().filter(|e| e.outcome.is_some()).count();

        Ok(json!({
            "success": true,
            "generated": generated,
            "results": entries
        })
        .to_string())
    }

    pub async fn validate_suggestions(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let results = match optional_lottery(&self.connection, arguments)? {
            Some(lottery) => vec![(lottery.id, validate_suggestions(&self.connection, lottery.id)?)],
            None => validate_all_lotteries(&self.connection)?,
        };

        let validated: usize = results.iter().map(|(_, s)| s.validated_count).sum();
        let total_matches: u32 = results.iter().map(|(_, s)| s.total_matches).sum();
        let results: Vec<Value> = results
            .into_iter()
            .map(|(lottery_id, summary)| json!({ "lottery_id": lottery_id, "summary": summary }))
            .collect();

        Ok(json!({
            "success": true,
            "validated_count": validated,
            "total_matches": total_matches,
            "results": results
        })
        .to_string())
    }

    pub async fn get_suggestions(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = optional_lottery(&self.connection, arguments)?;
        let mut suggestions = get_suggestions(&self.connection, lottery.map(|l| l.id))?;
        if let Some(validated) = arguments.get("validated").and_then(|v| v.as_bool()) {
            suggestions.retain(|s| s.was_validated() == validated);
        }
        if let Some(limit) = arguments.get("limit").and_then(|v| v.as_u64()) {
            suggestions.truncate(limit as usize);
        }

        Ok(json!({
            "success": true,
            "count": suggestions.len(),
            "suggestions": suggestions
        })
        .to_string())
    }

    pub async fn suggestion_summary(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let lottery = optional_lottery(&self.connection, arguments)?;
        let summary = suggestion_summary(&self.connection, lottery.map(|l| l.id))?;

        Ok(json!({
            "success": true,
            "summary": summary
        })
        .to_string())
    }

    pub async fn cleanup_suggestions(&self, _arguments: &HashMap<String, Value>) -> Result<String> {
        let deleted = delete_undated_suggestions(&self.connection)?;

        Ok(json!({
            "success": true,
            "deleted": deleted,
            "message": format!("Deleted {} suggestions without a draw date", deleted)
        })
        .to_string())
    }
}

pub struct ApiUseCase {
    connection: Arc<Connection>,
    feed_url: Option<String>,
}

impl ApiUseCase {
    pub fn new(connection: Arc<Connection>, feed_url: Option<String>) -> Self {
        Self {
            connection,
            feed_url,
        }
    }

    pub async fn fetch_and_save_draws(&self, arguments: &HashMap<String, Value>) -> Result<String> {
        let feed_url = match arguments.get("feed_url").and_then(|v| v.as_str()) {
            Some(url) => url.to_string(),
            None => self
                .feed_url
                .clone()
                .ok_or_else(|| anyhow!("No feed_url given and LOTTERY_FEED_URL is not set"))?,
        };

        let report = lotto_suggest::api::fetch_and_save_draws(&self.connection, &feed_url)
            .await
            .map_err(|e| anyhow!("API error: {:#}", e))?;
        let validation = validate_all_lotteries(&self.connection)?;
        let validated: usize = validation.iter().map(|(_, s)| s.validated_count).sum();

        Ok(json!({
            "success": true,
            "report": report,
            "validated_suggestions": validated
        })
        .to_string())
    }
}
