use chrono::NaiveDate;
use rand::Rng;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::database::{
    get_active_lotteries, get_all_lotteries, get_draw_history, get_lottery, get_suggestions,
    get_validated_suggestions, save_suggestion, suggestion_exists_for_date,
};
use crate::error::{Result, SuggestError};
use crate::sampler::generate_suggestion;
use crate::schedule::next_draw_date;
use crate::types::{
    GeneratedSuggestion, LotteryId, NewSuggestion, Suggestion, ValidationSummary, WeightConfig,
};
use crate::validator::validate_suggestions;

pub const ALGORITHM: &str = "auto_learning";

#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub lottery_id: LotteryId,
    pub lottery_name: String,
    pub target_date: Option<NaiveDate>,
    /// Id of the stored suggestion; `None` when one already existed for the date.
    pub suggestion_id: Option<i64>,
    pub generated: GeneratedSuggestion,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchEntry {
    pub lottery_id: LotteryId,
    pub lottery_name: String,
    pub outcome: Option<GenerationOutcome>,
    pub skipped: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestionSummary {
    pub total: usize,
    pub validated: usize,
    pub pending: usize,
    pub total_matches: u32,
    pub average_matches_main: f64,
    pub best: Option<Suggestion>,
}

/// Generates a suggestion for the lottery's next draw and stores it.
///
/// Nothing is written when generation fails. At most one suggestion is kept
/// per lottery and target date; a second run for the same date returns the
/// fresh combination without storing it.
pub fn generate_for_lottery<R: Rng + ?Sized>(
    conn: &Connection,
    lottery_id: LotteryId,
    weights: &WeightConfig,
    today: NaiveDate,
    rng: &mut R,
) -> Result<GenerationOutcome> {
    let lottery = get_lottery(conn, lottery_id)?
        .ok_or_else(|| SuggestError::LotteryNotFound(lottery_id.to_string()))?;
    let history = get_draw_history(conn, lottery.id)?;
    let feedback = get_validated_suggestions(conn, lottery.id)?;

    let generated = generate_suggestion(&lottery.config, &history, &feedback, weights, rng)?;
    let target_date = next_draw_date(&lottery.draw_days, today);

    let suggestion_id = match target_date {
        Some(date) if suggestion_exists_for_date(conn, lottery.id, date)? => {
            info!("A suggestion for {} on {} already exists", lottery.name, date);
            None
        }
        _ => {
            let id = save_suggestion(
                conn,
                &NewSuggestion {
                    lottery_id: lottery.id,
                    draw_date: target_date,
                    main_numbers: generated.main_numbers.clone(),
                    extra_numbers: generated.extra_numbers.clone(),
                    algorithm: ALGORITHM.to_string(),
                    parameters: json!({
                        "weights": generated.insights.weights,
                        "adjustment_factor": generated.insights.adjustment_factor,
                        "learned_from_suggestions": generated.insights.suggestions_learned,
                        "total_draws_analyzed": generated.insights.total_draws_analyzed,
                        "successful_numbers": generated.insights.successful_count,
                    }),
                },
            )?;
            info!(
                "✅ Saved suggestion {} for {} ({:?}): {:?} + {:?}",
                id, lottery.name, target_date, generated.main_numbers, generated.extra_numbers
            );
            Some(id)
        }
    };

    Ok(GenerationOutcome {
        lottery_id: lottery.id,
        lottery_name: lottery.name,
        target_date,
        suggestion_id,
        generated,
    })
}

/// Runs generation for every active lottery.
///
/// A lottery that cannot produce a suggestion (missing history, bad ranges or
/// weights) is reported as skipped; only storage errors abort the batch.
pub fn generate_for_all_lotteries<R: Rng + ?Sized>(
    conn: &Connection,
    weights: &WeightConfig,
    today: NaiveDate,
    rng: &mut R,
) -> Result<Vec<BatchEntry>> {
    let mut entries = Vec::new();

    for lottery in get_active_lotteries(conn)? {
        let entry = match generate_for_lottery(conn, lottery.id, weights, today, rng) {
            Ok(outcome) => BatchEntry {
                lottery_id: lottery.id,
                lottery_name: lottery.name,
                outcome: Some(outcome),
                skipped: None,
            },
            Err(e @ SuggestError::Storage(_)) => return Err(e),
            Err(e) => {
                warn!("Skipping {}: {}", lottery.name, e);
                BatchEntry {
                    lottery_id: lottery.id,
                    lottery_name: lottery.name,
                    outcome: None,
                    skipped: Some(e.to_string()),
                }
            }
        };
        entries.push(entry);
    }

    Ok(entries)
}

/// Validates every lottery, inactive ones included, so no suggestion stays
/// pending after its lottery is switched off.
pub fn validate_all_lotteries(conn: &Connection) -> Result<Vec<(LotteryId, ValidationSummary)>> {
    let mut results = Vec::new();
    for lottery in get_all_lotteries(conn)? {
        results.push((lottery.id, validate_suggestions(conn, lottery.id)?));
    }
    Ok(results)
}

/// Performance overview of stored suggestions, optionally for one lottery.
pub fn suggestion_summary(conn: &Connection, lottery_id: Option<LotteryId>) -> Result<SuggestionSummary> {
    let suggestions = get_suggestions(conn, lottery_id)?;
    let validated: Vec<&Suggestion> = suggestions.iter().filter(|s| s.was_validated()).collect();

    let total_matches: u32 = validated.iter().map(|s| s.total_matches()).sum();
    let average_matches_main = if validated.is_empty() {
        0.0
    } else {
        validated.iter().map(|s| s.matches_main() as f64).sum::<f64>() / validated.len() as f64
    };

    // Earliest listed wins ties, i.e. the most recent target date.
    let mut best: Option<&Suggestion> = None;
    for &suggestion in &validated {
        if best.is_none_or(|b| suggestion.total_matches() > b.total_matches()) {
            best = Some(suggestion);
        }
    }

    Ok(SuggestionSummary {
        total: suggestions.len(),
        validated: validated.len(),
        pending: suggestions.len() - validated.len(),
        total_matches,
        average_matches_main,
        best: best.cloned(),
    })
}
