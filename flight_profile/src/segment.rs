//! Pairing of filtered peaks and valleys into climb/descent segments.

use serde::{Deserialize, Serialize};

use crate::extrema::{Extremum, ExtremumKind};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProfileSegment {
    pub start_index: usize,
    pub end_index: usize,
    pub direction: Direction,
}

impl ProfileSegment {
    /// Number of sample steps covered by the segment.
    pub fn span(&self) -> usize {
        self.end_index.saturating_sub(self.start_index)
    }
}

/// What to do when two extrema of the same kind follow each other.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SameKindPolicy {
    /// Do not pair them; move on by one position.
    #[default]
    Skip,
    /// Replace the run by its most extreme member, then pair.
    Collapse,
}

/// Pair time-adjacent peak/valley transitions, skipping same-kind neighbours.
pub fn build_segments(extrema: &[Extremum]) -> Vec<ProfileSegment> {
    build_segments_with(extrema, SameKindPolicy::Skip)
}

pub fn build_segments_with(extrema: &[Extremum], policy: SameKindPolicy) -> Vec<ProfileSegment> {
    let mut merged: Vec<Extremum> = extrema.to_vec();
    merged.sort_by_key(|e| e.index);
    if policy == SameKindPolicy::Collapse {
        merged = collapse_same_kind(merged);
    }

    merged
        .windows(2)
        .filter(|w| w[0].kind != w[1].kind && w[0].index < w[1].index)
        .map(|w| ProfileSegment {
            start_index: w[0].index,
            end_index: w[1].index,
            direction: match w[0].kind {
                ExtremumKind::Valley => Direction::Ascending,
                ExtremumKind::Peak => Direction::Descending,
            },
        })
        .collect()
}

fn collapse_same_kind(sorted: Vec<Extremum>) -> Vec<Extremum> {
    let mut out: Vec<Extremum> = Vec::with_capacity(sorted.len());
    for e in sorted {
        match out.last_mut() {
            Some(last) if last.kind == e.kind => {
                let more_extreme = match e.kind {
                    ExtremumKind::Peak => e.value > last.value,
                    ExtremumKind::Valley => e.value < last.value,
                };
                if more_extreme {
                    *last = e;
                }
            }
            _ => out.push(e),
        }
    }
    out
}

/// Keep only segments whose span is strictly shorter than the mean span.
///
/// Returns the kept segments and how many were dropped.
pub fn drop_long_segments(segments: &[ProfileSegment]) -> (Vec<ProfileSegment>, usize) {
    if segments.is_empty() {
        return (Vec::new(), 0);
    }
    let mean = segments.iter().map(|s| s.span() as f64).sum::<f64>() / segments.len() as f64;
    let kept: Vec<ProfileSegment> = segments
        .iter()
        .filter(|s| (s.span() as f64) < mean)
        .copied()
        .collect();
    let dropped = segments.len() - kept.len();
    (kept, dropped)
}
