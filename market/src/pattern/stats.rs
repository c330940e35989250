//! Small order statistics used by the detectors.

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Position of the value closest to `target` (first one on ties).
pub fn nearest_index(values: &[f64], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, v) in values.iter().enumerate() {
        let gap = (v - target).abs();
        match best {
            Some((_, best_gap)) if gap >= best_gap => {}
            _ => best = Some((i, gap)),
        }
    }

    best.map(|(i, _)| i)
}

/// Position of the minimum value (first one on ties).
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (i, v) in values.iter().copied().enumerate() {
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }

    best.map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantile_interpolates_between_ranks() {
        let v = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&v, 0.0), Some(1.0));
        assert_eq!(quantile(&v, 1.0), Some(5.0));
        assert_eq!(quantile(&v, 0.5), Some(3.0));
        // pos = 0.35 * 4 = 1.4 -> 2.0 + 0.4
        let q = quantile(&v, 0.35).unwrap();
        assert!((q - 2.4).abs() < 1e-12);
    }

    #[test]
    fn quantile_ignores_input_order() {
        let a = quantile(&[5.0, 1.0, 4.0, 2.0, 3.0], 0.35);
        let b = quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.35);
        assert_eq!(a, b);
    }

    #[test]
    fn quantile_of_empty_is_none() {
        assert_eq!(quantile(&[], 0.35), None);
    }

    #[test]
    fn nearest_index_prefers_first_on_tie() {
        assert_eq!(nearest_index(&[3.0, 1.0, 5.0, 1.0], 1.0), Some(1));
        assert_eq!(nearest_index(&[9.0, 11.0], 10.0), Some(0));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn argmin_prefers_first_on_tie() {
        assert_eq!(argmin(&[4.0, 2.0, 7.0, 2.0]), Some(1));
        assert_eq!(argmin(&[]), None);
    }
}
