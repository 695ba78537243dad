use rusqlite::Connection;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::database::{get_draw_by_date, get_pending_suggestions, mark_suggestion_validated};
use crate::error::Result;
use crate::types::{Draw, LotteryId, Suggestion, ValidationOutcome, ValidationSummary};

/// Size of the intersection of two number lists, treated as sets.
pub fn count_matches(predicted: &[u32], actual: &[u32]) -> u32 {
    let actual: HashSet<u32> = actual.iter().copied().collect();
    let predicted: HashSet<u32> = predicted.iter().copied().collect();
    predicted.intersection(&actual).count() as u32
}

/// Scores a suggestion against the draw for its target date.
pub fn evaluate(suggestion: &Suggestion, draw: &Draw) -> ValidationOutcome {
    ValidationOutcome {
        actual_main_numbers: draw.main_numbers.clone(),
        actual_extra_numbers: draw.extra_numbers.clone(),
        matches_main: count_matches(&suggestion.main_numbers, &draw.main_numbers),
        matches_extra: count_matches(&suggestion.extra_numbers, &draw.extra_numbers),
    }
}

/// Validates every pending suggestion of a lottery whose draw is now known.
///
/// Suggestions without a draw yet stay pending. Each update is its own write
/// guarded by `was_validated = 0`, so the call is idempotent, safe to repeat
/// after partial progress, and a suggestion validated concurrently by another
/// caller is neither overwritten nor counted twice.
pub fn validate_suggestions(conn: &Connection, lottery_id: LotteryId) -> Result<ValidationSummary> {
    let pending = get_pending_suggestions(conn, lottery_id)?;
    let mut summary = ValidationSummary::default();

    for suggestion in &pending {
        let Some(date) = suggestion.draw_date else {
            continue;
        };

        let Some(draw) = get_draw_by_date(conn, lottery_id, date)? else {
            debug!("No draw yet for lottery {} on {}", lottery_id, date);
            summary.pending_count += 1;
            continue;
        };

        let outcome = evaluate(suggestion, &draw);
        if mark_suggestion_validated(conn, suggestion.id, &outcome)? {
            debug!(
                "✓ Suggestion {} for {}: {} main + {} extra matches",
                suggestion.id, date, outcome.matches_main, outcome.matches_extra
            );
            summary.validated_count += 1;
            summary.total_matches += outcome.matches_main + outcome.matches_extra;
        } else {
            warn!("Suggestion {} was validated by another caller", suggestion.id);
        }
    }

    info!(
        "Validated {} suggestions for lottery {} ({} matches, {} still pending)",
        summary.validated_count, lottery_id, summary.total_matches, summary.pending_count
    );
    Ok(summary)
}
