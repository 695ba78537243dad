use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Suggestion, WeightConfig};

/// Below this many validated suggestions the adjustment factor stays neutral.
pub const MIN_FEEDBACK_SAMPLE: usize = 3;

/// What past validated suggestions say about the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackAnalysis {
    pub validated_count: usize,
    pub average_matches_main: f64,
    pub successful_numbers: BTreeSet<u32>,
    pub recommendation_count: BTreeMap<u32, u32>,
    pub adjustment_factor: f64,
}

impl Default for FeedbackAnalysis {
    fn default() -> Self {
        Self {
            validated_count: 0,
            average_matches_main: 0.0,
            successful_numbers: BTreeSet::new(),
            recommendation_count: BTreeMap::new(),
            adjustment_factor: 1.0,
        }
    }
}

impl FeedbackAnalysis {
    pub fn is_successful(&self, n: u32) -> bool {
        self.successful_numbers.contains(&n)
    }

    pub fn recommendations_of(&self, n: u32) -> u32 {
        self.recommendation_count.get(&n).copied().unwrap_or(0)
    }
}

/// Aggregates validated suggestions. Unvalidated entries are ignored.
pub fn analyze_feedback(suggestions: &[Suggestion]) -> FeedbackAnalysis {
    let validated: Vec<&Suggestion> = suggestions.iter().filter(|s| s.was_validated()).collect();
    if validated.is_empty() {
        return FeedbackAnalysis::default();
    }

    let mut successful_numbers = BTreeSet::new();
    let mut recommendation_count = BTreeMap::new();

    for suggestion in &validated {
        for &n in &suggestion.main_numbers {
            *recommendation_count.entry(n).or_insert(0) += 1;
        }

        if let Some(outcome) = &suggestion.validation {
            if outcome.matches_main > 0 {
                for &n in &suggestion.main_numbers {
                    if outcome.actual_main_numbers.contains(&n) {
                        successful_numbers.insert(n);
                    }
                }
            }
        }
    }

    let total_main: u32 = validated.iter().map(|s| s.matches_main()).sum();
    let average_matches_main = total_main as f64 / validated.len() as f64;

    FeedbackAnalysis {
        validated_count: validated.len(),
        average_matches_main,
        successful_numbers,
        recommendation_count,
        adjustment_factor: adjustment_factor(validated.len(), average_matches_main),
    }
}

/// Lower average hit rates move weight from recency toward frequency and delay.
pub fn adjustment_factor(validated_count: usize, average_matches_main: f64) -> f64 {
    if validated_count < MIN_FEEDBACK_SAMPLE {
        1.0
    } else if average_matches_main < 1.0 {
        0.8
    } else if average_matches_main < 2.0 {
        0.95
    } else {
        1.0
    }
}

/// Rescales `prior` by the analysis' factor. Pair affinity is left untouched.
pub fn adjust_weights(prior: &WeightConfig, analysis: &FeedbackAnalysis) -> WeightConfig {
    let factor = analysis.adjustment_factor;
    if factor == 1.0 {
        return *prior;
    }
    WeightConfig {
        base_frequency: prior.base_frequency * factor,
        recency_hot: prior.recency_hot / factor,
        delay_cold: prior.delay_cold * factor,
        pair_affinity: prior.pair_affinity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValidationOutcome;

    fn validated(predicted: &[u32], actual: &[u32]) -> Suggestion {
        let matches_main = predicted.iter().filter(|&&n| actual.contains(&n)).count() as u32;
        Suggestion {
            id: 0,
            lottery_id: 1,
            draw_date: None,
            main_numbers: predicted.to_vec(),
            extra_numbers: Vec::new(),
            algorithm: "auto_learning".to_string(),
            parameters: serde_json::Value::Null,
            validation: Some(ValidationOutcome {
                actual_main_numbers: actual.to_vec(),
                actual_extra_numbers: Vec::new(),
                matches_main,
                matches_extra: 0,
            }),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_empty_input_is_neutral() {
        let analysis = analyze_feedback(&[]);
        assert_eq!(analysis, FeedbackAnalysis::default());
        assert_eq!(analysis.adjustment_factor, 1.0);
    }

    #[test]
    fn test_small_sample_keeps_neutral_factor() {
        let suggestions = vec![
            validated(&[1, 2, 3, 4, 5], &[10, 11, 12, 13, 14]),
            validated(&[1, 2, 3, 4, 5], &[20, 21, 22, 23, 24]),
        ];
        let analysis = analyze_feedback(&suggestions);
        assert_eq!(analysis.validated_count, 2);
        assert_eq!(analysis.average_matches_main, 0.0);
        assert_eq!(analysis.adjustment_factor, 1.0);
    }

    #[test]
    fn test_successful_and_recommended_numbers() {
        let suggestions = vec![
            validated(&[1, 2, 3, 4, 5], &[3, 4, 5, 6, 7]),
            validated(&[1, 8, 9, 10, 11], &[20, 21, 22, 23, 24]),
            validated(&[1, 2, 30, 31, 32], &[2, 40, 41, 42, 43]),
        ];
        let analysis = analyze_feedback(&suggestions);

        let expected: BTreeSet<u32> = [2, 3, 4, 5].into_iter().collect();
        assert_eq!(analysis.successful_numbers, expected);
        assert_eq!(analysis.recommendations_of(1), 3);
        assert_eq!(analysis.recommendations_of(2), 2);
        assert_eq!(analysis.recommendations_of(49), 0);
        assert!((analysis.average_matches_main - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(analysis.adjustment_factor, 0.95);
    }

    #[test]
    fn test_factor_thresholds() {
        assert_eq!(adjustment_factor(3, 0.5), 0.8);
        assert_eq!(adjustment_factor(3, 1.5), 0.95);
        assert_eq!(adjustment_factor(3, 2.0), 1.0);
        assert_eq!(adjustment_factor(2, 0.0), 1.0);
    }

    #[test]
    fn test_adjust_weights_rescales_all_but_pair() {
        let analysis = FeedbackAnalysis {
            adjustment_factor: 0.8,
            ..FeedbackAnalysis::default()
        };
        let adjusted = adjust_weights(&WeightConfig::default(), &analysis);
        assert!((adjusted.base_frequency - 0.8).abs() < 1e-9);
        assert!((adjusted.recency_hot - 1.875).abs() < 1e-9);
        assert!((adjusted.delay_cold - 1.44).abs() < 1e-9);
        assert_eq!(adjusted.pair_affinity, 0.5);
    }

    #[test]
    fn test_unvalidated_suggestions_are_ignored() {
        let mut pending = validated(&[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5]);
        pending.validation = None;
        let analysis = analyze_feedback(&[pending]);
        assert_eq!(analysis.validated_count, 0);
        assert!(analysis.successful_numbers.is_empty());
    }
}
