use crate::model::ThresholdMethod;

/// Median of the values; 0 when empty.
pub fn median(values: &[f64]) -> f64 {
    let mut sorted = finite_sorted(values);
    if sorted.is_empty() {
        return 0.0;
    }

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        sorted.swap_remove(mid)
    } else {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    }
}

pub fn mean(values: &[f64]) -> f64 {
    let finite = finite_sorted(values);
    if finite.is_empty() {
        return 0.0;
    }
    finite.iter().sum::<f64>() / finite.len() as f64
}

/// Drops `floor(n * proportion)` values from each end before averaging.
pub fn trimmed_mean(values: &[f64], proportion: f64) -> f64 {
    let sorted = finite_sorted(values);
    if sorted.is_empty() {
        return 0.0;
    }

    let proportion = proportion.clamp(0.0, 0.5);
    let cut = (sorted.len() as f64 * proportion).floor() as usize;
    if cut * 2 >= sorted.len() {
        return median(&sorted);
    }
    mean(&sorted[cut..sorted.len() - cut])
}

pub fn derive_threshold(densities: &[f64], method: ThresholdMethod, trimmed_percent: f64) -> f64 {
    match method {
        ThresholdMethod::Median => median(densities),
        ThresholdMethod::Mean => mean(densities),
        ThresholdMethod::TrimmedMean => trimmed_mean(densities, trimmed_percent),
    }
}

fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values
        .iter()
        .copied()
        .filter(|value| value.is_finite())
        .collect::<Vec<_>>();
    sorted.sort_by(|left, right| left.total_cmp(right));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn median_of_even_count_averages_middle_values() {
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), 2.5);
    }

    #[test]
    fn median_of_single_value_is_that_value() {
        assert_eq!(median(&[5.0]), 5.0);
    }

    #[test]
    fn median_of_empty_set_is_zero() {
        assert_eq!(median(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(trimmed_mean(&[], 0.1), 0.0);
    }

    #[test]
    fn median_of_odd_count_picks_middle() {
        assert_eq!(median(&[9.0, 0.5, 2.0]), 2.0);
    }

    #[test]
    fn trimmed_mean_discards_tails() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 100.0];
        assert_eq!(trimmed_mean(&values, 0.1), 5.5);
        assert_eq!(trimmed_mean(&values, 0.0), mean(&values));
    }

    #[test]
    fn trimmed_mean_with_small_sample_keeps_everything() {
        assert_eq!(trimmed_mean(&[1.0, 3.0], 0.1), 2.0);
    }

    #[test]
    fn derive_threshold_dispatches_on_method() {
        let values = [1.0, 2.0, 9.0];
        assert_eq!(derive_threshold(&values, ThresholdMethod::Median, 0.1), 2.0);
        assert_eq!(derive_threshold(&values, ThresholdMethod::Mean, 0.1), 4.0);
        assert_eq!(
            derive_threshold(&values, ThresholdMethod::TrimmedMean, 0.34),
            2.0
        );
    }
}
