use serde::Serialize;
use std::collections::BTreeMap;

use crate::types::Draw;

/// Number of most recent draws counted as "recent".
pub const RECENT_WINDOW: usize = 20;

/// Per-number history derived from a most-recent-first list of draws.
///
/// Every number in the configured main range has an entry in `frequency`,
/// `delay` and `recent_frequency`. Pairs are keyed `(low, high)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NumberStatistics {
    pub draws_analyzed: usize,
    pub frequency: BTreeMap<u32, u32>,
    pub delay: BTreeMap<u32, usize>,
    pub recent_frequency: BTreeMap<u32, u32>,
    #[serde(skip)]
    pub pair_count: BTreeMap<(u32, u32), u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NumberStat {
    pub number: u32,
    pub frequency: u32,
    pub delay: usize,
}

/// Computes frequency, delay, recent frequency and pair counts.
///
/// `history` must be ordered most recent first and hold at most one draw
/// per date; duplicates are not removed here.
pub fn compute_statistics(history: &[Draw], main_min: u32, main_max: u32) -> NumberStatistics {
    let mut frequency = BTreeMap::new();
    let mut delay = BTreeMap::new();
    let mut recent_frequency = BTreeMap::new();
    let mut pair_count = BTreeMap::new();

    for n in main_min..=main_max {
        frequency.insert(n, 0);
        recent_frequency.insert(n, 0);
    }

    for (idx, draw) in history.iter().enumerate() {
        for &n in &draw.main_numbers {
            if let Some(count) = frequency.get_mut(&n) {
                *count += 1;
                delay.entry(n).or_insert(idx);
                if idx < RECENT_WINDOW {
                    if let Some(recent) = recent_frequency.get_mut(&n) {
                        *recent += 1;
                    }
                }
            }
        }

        let numbers = &draw.main_numbers;
        for i in 0..numbers.len() {
            for j in (i + 1)..numbers.len() {
                *pair_count.entry(pair_key(numbers[i], numbers[j])).or_insert(0) += 1;
            }
        }
    }

    for n in main_min..=main_max {
        delay.entry(n).or_insert(history.len());
    }

    NumberStatistics {
        draws_analyzed: history.len(),
        frequency,
        delay,
        recent_frequency,
        pair_count,
    }
}

pub fn pair_key(a: u32, b: u32) -> (u32, u32) {
    if a <= b { (a, b) } else { (b, a) }
}

impl NumberStatistics {
    pub fn frequency_of(&self, n: u32) -> u32 {
        self.frequency.get(&n).copied().unwrap_or(0)
    }

    pub fn delay_of(&self, n: u32) -> usize {
        self.delay.get(&n).copied().unwrap_or(self.draws_analyzed)
    }

    pub fn recent_frequency_of(&self, n: u32) -> u32 {
        self.recent_frequency.get(&n).copied().unwrap_or(0)
    }

    pub fn pair_count_of(&self, a: u32, b: u32) -> u32 {
        self.pair_count.get(&pair_key(a, b)).copied().unwrap_or(0)
    }

    /// Sum of co-occurrences between `candidate` and every already selected number.
    pub fn pair_score(&self, candidate: u32, selected: &[u32]) -> u32 {
        selected
            .iter()
            .map(|&s| self.pair_count_of(candidate, s))
            .sum()
    }

    fn stat(&self, n: u32) -> NumberStat {
        NumberStat {
            number: n,
            frequency: self.frequency_of(n),
            delay: self.delay_of(n),
        }
    }

    /// Most frequently drawn numbers, ties broken by the lower number.
    pub fn hot_numbers(&self, limit: usize) -> Vec<NumberStat> {
        let mut stats: Vec<NumberStat> = self.frequency.keys().map(|&n| self.stat(n)).collect();
        stats.sort_by(|a, b| b.frequency.cmp(&a.frequency).then(a.number.cmp(&b.number)));
        stats.truncate(limit);
        stats
    }

    /// Longest-absent numbers, ties broken by the lower number.
    pub fn cold_numbers(&self, limit: usize) -> Vec<NumberStat> {
        let mut stats: Vec<NumberStat> = self.frequency.keys().map(|&n| self.stat(n)).collect();
        stats.sort_by(|a, b| b.delay.cmp(&a.delay).then(a.number.cmp(&b.number)));
        stats.truncate(limit);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn history(draws: &[[u32; 3]]) -> Vec<Draw> {
        let start = NaiveDate::from_ymd_opt(2026, 1, 31).unwrap();
        draws
            .iter()
            .enumerate()
            .map(|(i, numbers)| Draw {
                lottery_id: 1,
                draw_date: start - chrono::Days::new(i as u64),
                main_numbers: numbers.to_vec(),
                extra_numbers: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn test_frequency_and_delay() {
        let draws = history(&[[1, 2, 3], [2, 3, 4], [3, 4, 5]]);
        let stats = compute_statistics(&draws, 1, 6);

        assert_eq!(stats.frequency_of(3), 3);
        assert_eq!(stats.frequency_of(1), 1);
        assert_eq!(stats.frequency_of(6), 0);

        assert_eq!(stats.delay_of(1), 0);
        assert_eq!(stats.delay_of(4), 1);
        assert_eq!(stats.delay_of(5), 2);
        assert_eq!(stats.delay_of(6), 3);
    }

    #[test]
    fn test_every_number_in_range_has_entries() {
        let stats = compute_statistics(&[], 1, 10);
        assert_eq!(stats.frequency.len(), 10);
        assert_eq!(stats.delay.len(), 10);
        assert_eq!(stats.recent_frequency.len(), 10);
        assert!(stats.delay.values().all(|&d| d == 0));
    }

    #[test]
    fn test_recent_frequency_limited_to_window() {
        let mut rows = vec![[10, 11, 12]; RECENT_WINDOW];
        rows.extend(vec![[1, 2, 3]; 5]);
        let stats = compute_statistics(&history(&rows), 1, 12);

        assert_eq!(stats.recent_frequency_of(10), RECENT_WINDOW as u32);
        assert_eq!(stats.recent_frequency_of(1), 0);
        assert_eq!(stats.frequency_of(1), 5);
    }

    #[test]
    fn test_pair_counts_are_unordered() {
        let draws = history(&[[3, 1, 2], [2, 3, 9]]);
        let stats = compute_statistics(&draws, 1, 9);

        assert_eq!(stats.pair_count_of(2, 3), 2);
        assert_eq!(stats.pair_count_of(3, 2), 2);
        assert_eq!(stats.pair_count_of(1, 3), 1);
        assert_eq!(stats.pair_count_of(1, 9), 0);
        assert_eq!(stats.pair_score(3, &[1, 2]), 3);
    }

    #[test]
    fn test_statistics_are_deterministic() {
        let draws = history(&[[5, 7, 9], [1, 7, 8], [2, 5, 7], [3, 4, 6]]);
        let first = compute_statistics(&draws, 1, 9);
        let second = compute_statistics(&draws, 1, 9);
        assert_eq!(first, second);
    }

    #[test]
    fn test_hot_and_cold_numbers() {
        let draws = history(&[[1, 2, 3], [1, 2, 4], [1, 5, 6]]);
        let stats = compute_statistics(&draws, 1, 8);

        let hot = stats.hot_numbers(2);
        assert_eq!(hot[0].number, 1);
        assert_eq!(hot[0].frequency, 3);
        assert_eq!(hot[1].number, 2);

        let cold = stats.cold_numbers(2);
        assert_eq!(cold[0].number, 7);
        assert_eq!(cold[1].number, 8);
        assert_eq!(cold[0].delay, 3);
    }
}
