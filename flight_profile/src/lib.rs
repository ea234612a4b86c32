//! Flight profile extraction: finds high-altitude peaks and low-altitude
//! valleys in an aircraft trajectory, pairs them into climb/descent segments
//! and summarizes position and wind over each segment.

pub mod extrema;
pub mod load;
pub mod report;
pub mod segment;
pub mod summary;
pub mod trajectory;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use extrema::{filter_by_threshold, find_extrema, Extremum, ExtremumKind};
pub use load::{load_trajectory, parse_trajectory, VariableNames};
pub use report::{write_report, write_report_file, write_run_json, REPORT_HEADER};
pub use segment::{
    build_segments, build_segments_with, drop_long_segments, Direction, ProfileSegment,
    SameKindPolicy,
};
pub use summary::{circular_mean_deg, summarize, summarize_all, SegmentSummary};
pub use trajectory::{Trajectory, TrajectoryColumns, TrajectorySample};

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("failed to load input: {0}")]
    InputLoad(String),
    #[error("unsupported input format: {0}")]
    UnsupportedFormat(String),
    #[error("empty segment: start index {start} is after end index {end}")]
    EmptySegment { start: usize, end: usize },
    #[error("segment end index {end} is outside a trajectory of {len} samples")]
    SegmentOutOfRange { end: usize, len: usize },
    #[error("no profile segments found")]
    NoProfilesFound,
    #[error("failed to write output: {0}")]
    OutputWrite(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Peaks below this altitude (m) are discarded.
    pub peak_threshold_m: f64,
    /// Valleys above this altitude (m) are discarded.
    pub valley_threshold_m: f64,
    /// Altitude excursion (m) required between two retained same-kind extrema.
    pub min_separation_m: f64,
    pub same_kind_policy: SameKindPolicy,
    /// Keep only segments shorter than the mean segment span.
    pub drop_long_segments: bool,
    pub variables: VariableNames,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            peak_threshold_m: 800.0,
            valley_threshold_m: 100.0,
            min_separation_m: 50.0,
            same_kind_policy: SameKindPolicy::Skip,
            drop_long_segments: false,
            variables: VariableNames::default(),
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ProfileError> {
        for (name, value) in [
            ("peak_threshold_m", self.peak_threshold_m),
            ("valley_threshold_m", self.valley_threshold_m),
            ("min_separation_m", self.min_separation_m),
        ] {
            if !value.is_finite() {
                return Err(ProfileError::InvalidParameter(format!(
                    "{} must be finite, got {}",
                    name, value
                )));
            }
        }
        if self.min_separation_m < 0.0 {
            return Err(ProfileError::InvalidParameter(format!(
                "min_separation_m must be >= 0, got {}",
                self.min_separation_m
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct RunDiagnostics {
    pub samples: usize,
    pub peak_candidates: usize,
    pub valley_candidates: usize,
    pub long_segments_dropped: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ProfileRun {
    pub params: Params,
    /// Peaks that passed the threshold filter.
    pub peaks: Vec<Extremum>,
    /// Valleys that passed the threshold filter.
    pub valleys: Vec<Extremum>,
    pub segments: Vec<ProfileSegment>,
    pub summaries: Vec<SegmentSummary>,
    pub diagnostics: RunDiagnostics,
}

impl ProfileRun {
    /// True when no segment survived; callers treat this as advisory.
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Detect, filter, pair and summarize profile segments of `trajectory`.
pub fn extract_profiles(
    trajectory: &Trajectory,
    params: &Params,
) -> Result<ProfileRun, ProfileError> {
    params.validate()?;

    let altitude = trajectory.altitude_m();
    let raw_peaks = find_extrema(altitude, ExtremumKind::Peak, params.min_separation_m);
    let raw_valleys = find_extrema(altitude, ExtremumKind::Valley, params.min_separation_m);

    let peaks = filter_by_threshold(
        &raw_peaks,
        params.peak_threshold_m,
        params.valley_threshold_m,
    );
    let valleys = filter_by_threshold(
        &raw_valleys,
        params.peak_threshold_m,
        params.valley_threshold_m,
    );

    let mut surviving = Vec::with_capacity(peaks.len() + valleys.len());
    surviving.extend_from_slice(&peaks);
    surviving.extend_from_slice(&valleys);
    let mut segments = build_segments_with(&surviving, params.same_kind_policy);

    let mut long_segments_dropped = 0;
    if params.drop_long_segments {
        let (kept, dropped) = drop_long_segments(&segments);
        segments = kept;
        long_segments_dropped = dropped;
    }

    let summaries = summarize_all(&segments, trajectory)?;

    Ok(ProfileRun {
        params: params.clone(),
        peaks,
        valleys,
        segments,
        summaries,
        diagnostics: RunDiagnostics {
            samples: trajectory.len(),
            peak_candidates: raw_peaks.len(),
            valley_candidates: raw_valleys.len(),
            long_segments_dropped,
        },
    })
}
