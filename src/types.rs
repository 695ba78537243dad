use chrono::{NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::ops::RangeInclusive;

use crate::error::{Result, SuggestError};

pub type LotteryId = i64;

/// Shape of a game: how many numbers are drawn and from which ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotteryConfig {
    pub main_count: usize,
    pub main_min: u32,
    pub main_max: u32,
    pub extra_count: usize,
    pub extra_min: u32,
    pub extra_max: u32,
}

impl LotteryConfig {
    pub fn main_range(&self) -> RangeInclusive<u32> {
        self.main_min..=self.main_max
    }

    pub fn extra_range(&self) -> RangeInclusive<u32> {
        self.extra_min..=self.extra_max
    }

    pub fn validate(&self) -> Result<()> {
        if self.main_min > self.main_max {
            return Err(SuggestError::InvalidLottery(format!(
                "main range {}..={} is empty",
                self.main_min, self.main_max
            )));
        }
        if self.extra_count > 0 && self.extra_min > self.extra_max {
            return Err(SuggestError::InvalidLottery(format!(
                "extra range {}..={} is empty",
                self.extra_min, self.extra_max
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Lottery {
    pub id: LotteryId,
    pub name: String,
    #[serde(flatten)]
    pub config: LotteryConfig,
    pub draw_days: Vec<Weekday>,
    pub is_active: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewLottery {
    pub name: String,
    #[serde(flatten)]
    pub config: LotteryConfig,
    #[serde(default)]
    pub draw_days: Vec<Weekday>,
}

/// One historical result. `(lottery_id, draw_date)` is the natural key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draw {
    pub lottery_id: LotteryId,
    pub draw_date: NaiveDate,
    pub main_numbers: Vec<u32>,
    #[serde(default)]
    pub extra_numbers: Vec<u32>,
}

impl Draw {
    /// Checks counts, uniqueness and ranges against the owning lottery.
    pub fn validate(&self, config: &LotteryConfig) -> Result<()> {
        check_numbers(
            "main",
            &self.main_numbers,
            config.main_count,
            config.main_range(),
        )?;
        check_numbers(
            "extra",
            &self.extra_numbers,
            config.extra_count,
            config.extra_range(),
        )
    }
}

fn check_numbers(
    label: &str,
    numbers: &[u32],
    expected: usize,
    range: RangeInclusive<u32>,
) -> Result<()> {
    if numbers.len() != expected {
        return Err(SuggestError::InvalidDraw(format!(
            "expected {} {} numbers, got {}",
            expected,
            label,
            numbers.len()
        )));
    }
    let mut seen = HashSet::with_capacity(numbers.len());
    for &n in numbers {
        if !range.contains(&n) {
            return Err(SuggestError::InvalidDraw(format!(
                "{} number {} outside {}..={}",
                label,
                n,
                range.start(),
                range.end()
            )));
        }
        if !seen.insert(n) {
            return Err(SuggestError::InvalidDraw(format!(
                "{} number {} repeated",
                label, n
            )));
        }
    }
    Ok(())
}

/// Result of matching a suggestion against the real draw. Written once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub actual_main_numbers: Vec<u32>,
    pub actual_extra_numbers: Vec<u32>,
    pub matches_main: u32,
    pub matches_extra: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub id: i64,
    pub lottery_id: LotteryId,
    pub draw_date: Option<NaiveDate>,
    pub main_numbers: Vec<u32>,
    pub extra_numbers: Vec<u32>,
    pub algorithm: String,
    pub parameters: serde_json::Value,
    pub validation: Option<ValidationOutcome>,
    pub created_at: String,
}

impl Suggestion {
    pub fn was_validated(&self) -> bool {
        self.validation.is_some()
    }

    pub fn matches_main(&self) -> u32 {
        self.validation.as_ref().map_or(0, |v| v.matches_main)
    }

    pub fn matches_extra(&self) -> u32 {
        self.validation.as_ref().map_or(0, |v| v.matches_extra)
    }

    pub fn total_matches(&self) -> u32 {
        self.matches_main() + self.matches_extra()
    }
}

#[derive(Debug, Clone)]
pub struct NewSuggestion {
    pub lottery_id: LotteryId,
    pub draw_date: Option<NaiveDate>,
    pub main_numbers: Vec<u32>,
    pub extra_numbers: Vec<u32>,
    pub algorithm: String,
    pub parameters: serde_json::Value,
}

/// Sampler weights. `pair_affinity = 0` turns the pair bias off.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub base_frequency: f64,
    pub recency_hot: f64,
    pub delay_cold: f64,
    pub pair_affinity: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            base_frequency: 1.0,
            recency_hot: 1.5,
            delay_cold: 1.8,
            pair_affinity: 0.5,
        }
    }
}

impl WeightConfig {
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("base_frequency", self.base_frequency),
            ("recency_hot", self.recency_hot),
            ("delay_cold", self.delay_cold),
            ("pair_affinity", self.pair_affinity),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(SuggestError::InvalidWeights(format!(
                    "{} must be a finite non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.base_frequency == 0.0 {
            return Err(SuggestError::InvalidWeights(
                "base_frequency must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationInsights {
    pub total_draws_analyzed: usize,
    pub suggestions_learned: usize,
    pub successful_count: usize,
    pub adjustment_factor: f64,
    pub top_numbers: Vec<u32>,
    pub selected_from_successful: usize,
    /// Effective weights after feedback adjustment; thread these into the next run.
    pub weights: WeightConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedSuggestion {
    pub main_numbers: Vec<u32>,
    pub extra_numbers: Vec<u32>,
    pub insights: GenerationInsights,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub validated_count: usize,
    pub total_matches: u32,
    pub pending_count: usize,
}
