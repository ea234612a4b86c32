//! Local maxima / minima of the altitude signal and threshold filtering.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ExtremumKind {
    Peak,
    Valley,
}

impl ExtremumKind {
    /// Strictly more extreme in this kind's direction.
    fn beats(self, a: f64, b: f64) -> bool {
        match self {
            ExtremumKind::Peak => a > b,
            ExtremumKind::Valley => a < b,
        }
    }

    /// Fold `value` into the running barrier (lowest for peaks, highest for valleys).
    fn deepen(self, barrier: Option<f64>, value: f64) -> Option<f64> {
        if !value.is_finite() {
            return barrier;
        }
        Some(match (self, barrier) {
            (_, None) => value,
            (ExtremumKind::Peak, Some(b)) => b.min(value),
            (ExtremumKind::Valley, Some(b)) => b.max(value),
        })
    }

    /// Altitude excursion separating two same-kind extrema across `barrier`.
    fn excursion(self, a: f64, b: f64, barrier: Option<f64>) -> f64 {
        let Some(barrier) = barrier else {
            return 0.0;
        };
        match self {
            ExtremumKind::Peak => a.min(b) - barrier,
            ExtremumKind::Valley => barrier - a.max(b),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct Extremum {
    pub index: usize,
    pub kind: ExtremumKind,
    pub value: f64,
}

/// Find local maxima (`Peak`) or minima (`Valley`) of `signal`.
///
/// Runs of equal samples are treated as one candidate located at the middle
/// of the run. A run qualifies when it is strictly above (below) every
/// neighbouring run; runs touching either end only need to beat their single
/// neighbour. A signal with fewer than two distinct runs has no extrema.
///
/// Two consecutive candidates of the same kind are merged when the signal
/// between them does not move away by at least `min_separation` (altitude
/// units): for peaks the lower of the two must sit `min_separation` above the
/// deepest sample in between, and symmetrically for valleys. The more extreme
/// candidate survives; on equal values the earlier one does.
pub fn find_extrema(signal: &[f64], kind: ExtremumKind, min_separation: f64) -> Vec<Extremum> {
    let candidates = candidate_indices(signal, kind);
    suppress_close(signal, &candidates, kind, min_separation)
        .into_iter()
        .map(|index| Extremum {
            index,
            kind,
            value: signal[index],
        })
        .collect()
}

fn candidate_indices(signal: &[f64], kind: ExtremumKind) -> Vec<usize> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    let mut start = 0usize;
    for i in 1..=signal.len() {
        if i == signal.len() || signal[i] != signal[start] {
            runs.push((start, i - 1));
            start = i;
        }
    }
    if runs.len() < 2 {
        return Vec::new();
    }

    let mut out = Vec::new();
    for (r, &(lo, hi)) in runs.iter().enumerate() {
        let value = signal[lo];
        if !value.is_finite() {
            continue;
        }
        let left_ok = r == 0 || kind.beats(value, signal[runs[r - 1].0]);
        let right_ok = r + 1 == runs.len() || kind.beats(value, signal[runs[r + 1].0]);
        if left_ok && right_ok {
            out.push(lo + (hi - lo) / 2);
        }
    }
    out
}

fn suppress_close(
    signal: &[f64],
    candidates: &[usize],
    kind: ExtremumKind,
    min_separation: f64,
) -> Vec<usize> {
    let mut kept: Vec<usize> = Vec::with_capacity(candidates.len());
    // Deepest sample seen since the last kept candidate, and where scanning resumes.
    let mut barrier: Option<f64> = None;
    let mut cursor = 0usize;

    for &cand in candidates {
        if let Some(last) = kept.last_mut() {
            barrier = signal[cursor..cand]
                .iter()
                .fold(barrier, |acc, &v| kind.deepen(acc, v));
            cursor = cand;
            let excursion = kind.excursion(signal[*last], signal[cand], barrier);
            if excursion < min_separation {
                if kind.beats(signal[cand], signal[*last]) {
                    *last = cand;
                    barrier = None;
                    cursor = cand + 1;
                }
                continue;
            }
        }
        kept.push(cand);
        barrier = None;
        cursor = cand + 1;
    }
    kept
}

/// Keep peaks at or above `peak_threshold` and valleys at or below
/// `valley_threshold`, preserving order.
pub fn filter_by_threshold(
    extrema: &[Extremum],
    peak_threshold: f64,
    valley_threshold: f64,
) -> Vec<Extremum> {
    extrema
        .iter()
        .filter(|e| match e.kind {
            ExtremumKind::Peak => e.value >= peak_threshold,
            ExtremumKind::Valley => e.value <= valley_threshold,
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(extrema: &[Extremum]) -> Vec<usize> {
        extrema.iter().map(|e| e.index).collect()
    }

    #[test]
    fn scenario_a_candidates() {
        let signal = [50.0, 850.0, 60.0, 900.0, 40.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 1.0);
        let valleys = find_extrema(&signal, ExtremumKind::Valley, 1.0);
        assert_eq!(indices(&peaks), vec![1, 3]);
        assert_eq!(indices(&valleys), vec![0, 2, 4]);
        assert!(peaks.iter().all(|e| e.kind == ExtremumKind::Peak));
        assert_eq!(valleys[2].value, 40.0);
    }

    #[test]
    fn empty_single_and_constant_signals_have_no_extrema() {
        for signal in [vec![], vec![5.0], vec![3.0; 10]] {
            assert!(find_extrema(&signal, ExtremumKind::Peak, 50.0).is_empty());
            assert!(find_extrema(&signal, ExtremumKind::Valley, 50.0).is_empty());
        }
    }

    #[test]
    fn plateau_reports_middle_index() {
        let signal = [0.0, 5.0, 5.0, 5.0, 5.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 0.0);
        assert_eq!(indices(&peaks), vec![2]);
        let signal = [0.0, 5.0, 5.0, 5.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 0.0);
        assert_eq!(indices(&peaks), vec![2]);
    }

    #[test]
    fn edges_compare_against_single_neighbour() {
        let signal = [10.0, 5.0, 7.0];
        assert_eq!(indices(&find_extrema(&signal, ExtremumKind::Peak, 0.0)), vec![0, 2]);
        assert_eq!(indices(&find_extrema(&signal, ExtremumKind::Valley, 0.0)), vec![1]);
    }

    #[test]
    fn shallow_dip_merges_peaks_keeping_higher() {
        // Dip of 20 m between peaks is below the 50 m separation.
        let signal = [0.0, 900.0, 880.0, 950.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 50.0);
        assert_eq!(indices(&peaks), vec![3]);
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 10.0);
        assert_eq!(indices(&peaks), vec![1, 3]);
    }

    #[test]
    fn equal_close_peaks_keep_earlier() {
        let signal = [0.0, 900.0, 890.0, 900.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 50.0);
        assert_eq!(indices(&peaks), vec![1]);
    }

    #[test]
    fn shallow_bump_merges_valleys_keeping_lower() {
        let signal = [500.0, 40.0, 60.0, 20.0, 500.0];
        let valleys = find_extrema(&signal, ExtremumKind::Valley, 50.0);
        assert_eq!(indices(&valleys), vec![3]);
    }

    #[test]
    fn suppression_chains_across_noise() {
        // Noisy top: every dip is shallow, only the highest point survives.
        let signal = [0.0, 800.0, 790.0, 810.0, 795.0, 805.0, 0.0, 820.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 50.0);
        assert_eq!(indices(&peaks), vec![3, 7]);
    }

    #[test]
    fn retained_neighbours_are_separated() {
        let signal: Vec<f64> = (0..400)
            .map(|i| {
                let t = i as f64 * 0.1;
                500.0 + 450.0 * t.sin() + 30.0 * (7.3 * t).sin()
            })
            .collect();
        let min_sep = 50.0;
        let peaks = find_extrema(&signal, ExtremumKind::Peak, min_sep);
        for pair in peaks.windows(2) {
            let between = signal[pair[0].index + 1..pair[1].index]
                .iter()
                .copied()
                .fold(f64::INFINITY, f64::min);
            assert!(pair[0].value.min(pair[1].value) - between >= min_sep);
        }
        let valleys = find_extrema(&signal, ExtremumKind::Valley, min_sep);
        for pair in valleys.windows(2) {
            let between = signal[pair[0].index + 1..pair[1].index]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            assert!(between - pair[0].value.max(pair[1].value) >= min_sep);
        }
    }

    #[test]
    fn threshold_filter_is_inclusive_and_order_preserving() {
        let extrema = vec![
            Extremum { index: 0, kind: ExtremumKind::Valley, value: 100.0 },
            Extremum { index: 1, kind: ExtremumKind::Peak, value: 800.0 },
            Extremum { index: 2, kind: ExtremumKind::Valley, value: 100.5 },
            Extremum { index: 3, kind: ExtremumKind::Peak, value: 799.9 },
            Extremum { index: 4, kind: ExtremumKind::Valley, value: -3.0 },
        ];
        let kept = filter_by_threshold(&extrema, 800.0, 100.0);
        assert_eq!(indices(&kept), vec![0, 1, 4]);
    }

    #[test]
    fn raising_peak_threshold_never_adds_peaks() {
        let signal = [0.0, 850.0, 10.0, 900.0, 5.0, 1200.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 50.0);
        let mut previous = usize::MAX;
        for threshold in [0.0, 850.0, 851.0, 900.0, 1000.0, 1300.0] {
            let n = filter_by_threshold(&peaks, threshold, 100.0).len();
            assert!(n <= previous);
            previous = n;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn non_finite_samples_are_not_candidates() {
        let signal = [0.0, f64::NAN, 0.0, 5.0, 0.0];
        let peaks = find_extrema(&signal, ExtremumKind::Peak, 0.0);
        assert_eq!(indices(&peaks), vec![3]);
    }
}
