//! Per-frame vibration features.
//!
//! All functions take samples in g and return `None` when the feature is
//! undefined for the input (empty frame, zero variance, zero rms).

use contracts::{Axis, StatisticRecord};

/// Signed sample with the largest magnitude. Ties keep the first.
pub fn peak(samples: &[f64]) -> Option<f64> {
    let mut best: Option<f64> = None;
    for &x in samples {
        match best {
            Some(b) if x.abs() <= b.abs() => {}
            _ => best = Some(x),
        }
    }
    best
}

pub fn peak_to_peak(samples: &[f64]) -> Option<f64> {
    let (first, rest) = samples.split_first()?;
    let (min, max) = rest
        .iter()
        .fold((*first, *first), |(lo, hi), &x| (lo.min(x), hi.max(x)));
    Some(max - min)
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Root mean square
pub fn rms(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum_sq: f64 = samples.iter().map(|x| x * x).sum();
    Some((sum_sq / samples.len() as f64).sqrt())
}

/// Sample standard deviation (n - 1 denominator)
pub fn standard_deviation(samples: &[f64]) -> Option<f64> {
    if samples.len() < 2 {
        return None;
    }
    let m = mean(samples)?;
    let ss: f64 = samples.iter().map(|x| (x - m).powi(2)).sum();
    Some((ss / (samples.len() - 1) as f64).sqrt())
}

/// Biased central moments m2, m3, m4
fn central_moments(samples: &[f64]) -> Option<(f64, f64, f64)> {
    let m = mean(samples)?;
    let n = samples.len() as f64;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for &x in samples {
        let d = x - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Excess (Fisher) kurtosis from biased moments
pub fn kurtosis(samples: &[f64]) -> Option<f64> {
    let (m2, _, m4) = central_moments(samples)?;
    if m2 == 0.0 {
        return None;
    }
    Some(m4 / (m2 * m2) - 3.0)
}

/// Skewness from biased moments
pub fn skew(samples: &[f64]) -> Option<f64> {
    let (m2, m3, _) = central_moments(samples)?;
    if m2 == 0.0 {
        return None;
    }
    Some(m3 / m2.powf(1.5))
}

/// Crest factor `peak / rms`, signed like the peak
pub fn crest(samples: &[f64]) -> Option<f64> {
    let p = peak(samples)?;
    let r = rms(samples)?;
    if r == 0.0 {
        return None;
    }
    Some(p / r)
}

/// Compute every feature for one frame.
pub fn compute_record(axis: Axis, samples: &[f64]) -> StatisticRecord {
    StatisticRecord {
        axis,
        peak: peak(samples),
        peak_to_peak: peak_to_peak(samples),
        rms: rms(samples),
        standard_deviation: standard_deviation(samples),
        kurtosis: kurtosis(samples),
        skew: skew(samples),
        crest: crest(samples),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Option<f64>, b: f64) -> bool {
        a.is_some_and(|a| (a - b).abs() < 1e-9)
    }

    #[test]
    fn test_standard_deviation() {
        let sd = standard_deviation(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!(close(sd, (10.0f64 / 4.0).sqrt()));
        assert_eq!(standard_deviation(&[1.0]), None);
    }

    #[test]
    fn test_peak_p2p_rms_crest() {
        let raw = [1.0, -5.0, 3.0];
        assert_eq!(peak(&raw), Some(-5.0));
        assert_eq!(peak_to_peak(&raw), Some(6.0));
        assert!(close(rms(&raw), (35.0f64 / 3.0).sqrt()));
        let c = crest(&raw).unwrap();
        assert!((c - (-1.4638501094227998)).abs() < 1e-4);
    }

    #[test]
    fn test_peak_tie_keeps_first() {
        assert_eq!(peak(&[2.0, -2.0, 1.0]), Some(2.0));
        assert_eq!(peak(&[-2.0, 2.0]), Some(-2.0));
        assert_eq!(peak(&[]), None);
    }

    #[test]
    fn test_constant_frame_edge_cases() {
        let flat = [0.0; 8];
        let record = compute_record(Axis::X, &flat);
        assert_eq!(record.peak, Some(0.0));
        assert_eq!(record.peak_to_peak, Some(0.0));
        assert_eq!(record.rms, Some(0.0));
        assert_eq!(record.crest, None);
        assert_eq!(record.kurtosis, None);
        assert_eq!(record.skew, None);
    }

    #[test]
    fn test_kurtosis_skew_symmetric() {
        // Two-point distribution: excess kurtosis -2, no skew
        let samples = [1.0, -1.0, 1.0, -1.0];
        assert!(close(kurtosis(&samples), -2.0));
        assert!(close(skew(&samples), 0.0));
    }

    #[test]
    fn test_skew_sign() {
        let right_tail = [0.0, 0.0, 0.0, 0.0, 10.0];
        assert!(skew(&right_tail).unwrap() > 0.0);
        let left_tail = [0.0, 0.0, 0.0, 0.0, -10.0];
        assert!(skew(&left_tail).unwrap() < 0.0);
    }

    #[test]
    fn test_order_independent_features() {
        use rand::rngs::StdRng;
        use rand::seq::SliceRandom;
        use rand::{Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(7);
        let samples: Vec<f64> = (0..256).map(|_| rng.random_range(-2.0..2.0)).collect();
        let mut shuffled = samples.clone();
        shuffled.shuffle(&mut rng);

        let a = compute_record(Axis::Y, &samples);
        let b = compute_record(Axis::Y, &shuffled);
        for (x, y) in [
            (a.peak_to_peak, b.peak_to_peak),
            (a.rms, b.rms),
            (a.standard_deviation, b.standard_deviation),
            (a.kurtosis, b.kurtosis),
            (a.skew, b.skew),
        ] {
            assert!((x.unwrap() - y.unwrap()).abs() < 1e-9);
        }
    }

    #[test]
    fn test_empty_frame() {
        let record = compute_record(Axis::Z, &[]);
        assert_eq!(record.axis, Axis::Z);
        assert_eq!(record.peak, None);
        assert_eq!(record.rms, None);
        assert_eq!(record.standard_deviation, None);
    }
}
