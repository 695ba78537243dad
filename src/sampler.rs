use rand::Rng;
use tracing::{debug, info};

use crate::error::{Result, SuggestError};
use crate::feedback::{FeedbackAnalysis, adjust_weights, analyze_feedback};
use crate::stats::{NumberStatistics, compute_statistics};
use crate::types::{Draw, GeneratedSuggestion, GenerationInsights, LotteryConfig, Suggestion, WeightConfig};

/// Fewer draws than this and the statistics are too sparse to use.
pub const MIN_HISTORY: usize = 10;

const SUCCESS_MULTIPLIER: f64 = 2.0;
const RECOMMENDATION_BONUS: f64 = 0.2;
const COLD_DELAY_THRESHOLD: usize = 30;
const COLD_DELAY_DIVISOR: f64 = 20.0;
const POOL_SCALE: f64 = 10.0;
const PAIR_AFFINITY_PROBABILITY: f64 = 0.3;
const PAIR_TOP_CANDIDATES: usize = 3;
const TOP_INSIGHT_COUNT: usize = 10;

/// Generates one combination for a lottery.
///
/// `history` is the lottery's draws, most recent first. `feedback` may contain
/// any suggestions for the lottery; only validated ones are learned from. The
/// weights are rescaled by the feedback before sampling and the effective
/// values are returned in the insights so the caller can carry them forward.
pub fn generate_suggestion<R: Rng + ?Sized>(
    lottery: &LotteryConfig,
    history: &[Draw],
    feedback: &[Suggestion],
    weights: &WeightConfig,
    rng: &mut R,
) -> Result<GeneratedSuggestion> {
    if history.len() < MIN_HISTORY {
        return Err(SuggestError::InsufficientHistory {
            available: history.len(),
            required: MIN_HISTORY,
        });
    }
    lottery.validate()?;
    weights.validate()?;

    let stats = compute_statistics(history, lottery.main_min, lottery.main_max);
    let analysis = analyze_feedback(feedback);
    let effective = adjust_weights(weights, &analysis);

    info!(
        "🎲 Generating from {} draws, learning from {} validated suggestions (factor {:.2})",
        history.len(),
        analysis.validated_count,
        analysis.adjustment_factor
    );

    let scored = number_weights(lottery, &stats, &analysis, &effective);
    let main_numbers = sample_main_numbers(lottery.main_count, &scored, &stats, &effective, rng)?;
    let extra_numbers = sample_extra_numbers(lottery, rng)?;

    let selected_from_successful = main_numbers
        .iter()
        .filter(|&&n| analysis.is_successful(n))
        .count();

    debug!("Selected {:?} + {:?}", main_numbers, extra_numbers);

    Ok(GeneratedSuggestion {
        main_numbers,
        extra_numbers,
        insights: GenerationInsights {
            total_draws_analyzed: history.len(),
            suggestions_learned: analysis.validated_count,
            successful_count: analysis.successful_numbers.len(),
            adjustment_factor: analysis.adjustment_factor,
            top_numbers: top_numbers(&scored, TOP_INSIGHT_COUNT),
            selected_from_successful,
            weights: effective,
        },
    })
}

/// Scalar weight of one candidate number.
pub fn number_weight(
    n: u32,
    stats: &NumberStatistics,
    analysis: &FeedbackAnalysis,
    weights: &WeightConfig,
) -> f64 {
    let mut weight = weights.base_frequency * (stats.frequency_of(n) as f64 + 1.0);

    if analysis.is_successful(n) {
        weight *= SUCCESS_MULTIPLIER;
    }

    let recommended = analysis.recommendations_of(n);
    if recommended > 0 {
        weight *= 1.0 + RECOMMENDATION_BONUS * recommended as f64;
    }

    weight += weights.recency_hot * stats.recent_frequency_of(n) as f64;

    let delay = stats.delay_of(n);
    if delay > COLD_DELAY_THRESHOLD {
        weight += weights.delay_cold * (delay as f64 / COLD_DELAY_DIVISOR);
    }

    weight
}

/// Weights for every number of the main range, in ascending number order.
pub fn number_weights(
    lottery: &LotteryConfig,
    stats: &NumberStatistics,
    analysis: &FeedbackAnalysis,
    weights: &WeightConfig,
) -> Vec<(u32, f64)> {
    lottery
        .main_range()
        .map(|n| (n, number_weight(n, stats, analysis, weights)))
        .collect()
}

fn top_numbers(scored: &[(u32, f64)], limit: usize) -> Vec<u32> {
    let mut ranked = scored.to_vec();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().take(limit).map(|(n, _)| n).collect()
}

/// Discrete weighted multiset: number `n` occupies `copies` slots.
///
/// Equivalent to a flat list with each number repeated `copies` times, but
/// picks walk cumulative counts instead of allocating every slot.
#[derive(Debug, Clone)]
struct WeightedPool {
    entries: Vec<(u32, u128)>,
    total: u128,
}

impl WeightedPool {
    /// Fails when the summed copy counts do not fit, which only happens for
    /// weights near the top of the `f64` range.
    fn new(scored: &[(u32, f64)]) -> Result<Self> {
        let entries: Vec<(u32, u128)> = scored
            .iter()
            .map(|&(n, weight)| (n, pool_copies(weight)))
            .collect();
        let total = entries
            .iter()
            .try_fold(0u128, |acc, &(_, copies)| acc.checked_add(copies))
            .ok_or_else(|| {
                SuggestError::InvalidWeights("weights too large to sample from".to_string())
            })?;
        Ok(Self { entries, total })
    }

    fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<u32> {
        if self.total == 0 {
            return None;
        }
        let mut slot = rng.random_range(0..self.total);
        for &(n, copies) in &self.entries {
            if slot < copies {
                return Some(n);
            }
            slot -= copies;
        }
        None
    }

    fn remove(&mut self, number: u32) {
        if let Some(pos) = self.entries.iter().position(|&(n, _)| n == number) {
            let (_, copies) = self.entries.remove(pos);
            self.total -= copies;
        }
    }

    fn numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.iter().map(|&(n, _)| n)
    }
}

/// `max(1, round(weight * 10))`; the float cast saturates for huge weights.
fn pool_copies(weight: f64) -> u128 {
    let copies = (weight * POOL_SCALE).round();
    if copies >= 1.0 { copies as u128 } else { 1 }
}

fn sample_main_numbers<R: Rng + ?Sized>(
    count: usize,
    scored: &[(u32, f64)],
    stats: &NumberStatistics,
    weights: &WeightConfig,
    rng: &mut R,
) -> Result<Vec<u32>> {
    let mut pool = WeightedPool::new(scored)?;
    let mut selected: Vec<u32> = Vec::with_capacity(count);

    while selected.len() < count {
        let Some(mut number) = pool.pick(rng) else {
            break;
        };

        if !selected.is_empty()
            && weights.pair_affinity > 0.0
            && rng.random_bool(PAIR_AFFINITY_PROBABILITY)
        {
            if let Some(paired) = pick_by_pair_affinity(&pool, &selected, stats, rng) {
                number = paired;
            }
        }

        if !selected.contains(&number) {
            selected.push(number);
        }
        pool.remove(number);
    }

    if selected.len() < count {
        return Err(SuggestError::PoolExhausted {
            selected: selected.len(),
            required: count,
        });
    }

    selected.sort_unstable();
    Ok(selected)
}

/// Picks uniformly among the best-paired remaining candidates, if any pairs exist.
fn pick_by_pair_affinity<R: Rng + ?Sized>(
    pool: &WeightedPool,
    selected: &[u32],
    stats: &NumberStatistics,
    rng: &mut R,
) -> Option<u32> {
    let mut ranked: Vec<(u32, u32)> = pool
        .numbers()
        .filter(|n| !selected.contains(n))
        .map(|n| (n, stats.pair_score(n, selected)))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    match ranked.first() {
        Some(&(_, best)) if best > 0 => {
            let top = ranked.len().min(PAIR_TOP_CANDIDATES);
            Some(ranked[rng.random_range(0..top)].0)
        }
        _ => None,
    }
}

fn sample_extra_numbers<R: Rng + ?Sized>(lottery: &LotteryConfig, rng: &mut R) -> Result<Vec<u32>> {
    if lottery.extra_count == 0 {
        return Ok(Vec::new());
    }

    let mut pool: Vec<u32> = lottery.extra_range().collect();
    let mut extras = Vec::with_capacity(lottery.extra_count);
    while extras.len() < lottery.extra_count && !pool.is_empty() {
        let idx = rng.random_range(0..pool.len());
        extras.push(pool.swap_remove(idx));
    }

    if extras.len() < lottery.extra_count {
        return Err(SuggestError::PoolExhausted {
            selected: extras.len(),
            required: lottery.extra_count,
        });
    }

    extras.sort_unstable();
    Ok(extras)
}
