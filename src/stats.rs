//! Small descriptive-statistics helpers shared by the analyzers
//!
//! The engine uses descriptive statistics only; there is deliberately no
//! hypothesis testing or model fitting here.

use std::collections::HashMap;
use std::hash::Hash;

/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation, `None` for fewer than one value
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

/// Statistical mode. Ties break toward the value seen first, matching how
/// logged-hour "optimal timing" has historically been reported.
pub fn mode<T: Copy + Eq + Hash>(values: &[T]) -> Option<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    for value in values {
        *counts.entry(*value).or_insert(0) += 1;
    }
    let mut best: Option<(T, usize)> = None;
    for value in values {
        let count = counts[value];
        match best {
            Some((_, best_count)) if best_count >= count => {}
            _ => best = Some((*value, count)),
        }
    }
    best.map(|(value, _)| value)
}

/// Values ranked by descending count, most frequent first, deduplicated
pub fn ranked_by_count<T: Copy + Eq + Hash>(values: &[T], take: usize) -> Vec<T> {
    let mut counts: HashMap<T, usize> = HashMap::new();
    let mut order: Vec<T> = Vec::new();
    for value in values {
        let entry = counts.entry(*value).or_insert(0);
        if *entry == 0 {
            order.push(*value);
        }
        *entry += 1;
    }
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order.truncate(take);
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[4.0, 6.0]), Some(5.0));
    }

    #[test]
    fn population_std_dev_matches_hand_calculation() {
        // Values 2, 4, 4, 4, 5, 5, 7, 9 have population std dev exactly 2
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = population_std_dev(&values).unwrap();
        assert!((sd - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_value_has_zero_std_dev() {
        assert_eq!(population_std_dev(&[42.0]), Some(0.0));
    }

    #[test]
    fn mode_breaks_ties_by_first_seen() {
        assert_eq!(mode(&[8, 8, 12, 20]), Some(8));
        assert_eq!(mode(&[12, 8, 12, 8]), Some(12));
        assert_eq!(mode::<u32>(&[]), None);
    }

    #[test]
    fn ranked_by_count_orders_most_frequent_first() {
        let ranked = ranked_by_count(&[13, 20, 13, 13, 20, 7], 2);
        assert_eq!(ranked, vec![13, 20]);
    }
}
