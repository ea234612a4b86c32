//! Per-segment statistics.

use ndarray::ArrayView1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::segment::{Direction, ProfileSegment};
use crate::trajectory::Trajectory;
use crate::ProfileError;

const MIN_RESULTANT: f64 = 1e-9;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SegmentSummary {
    pub start_index: usize,
    pub end_index: usize,
    pub direction: Direction,
    pub start_time_s: f64,
    pub end_time_s: f64,
    pub mean_latitude_deg: f64,
    pub mean_longitude_deg: f64,
    pub mean_wind_speed: f64,
    /// Circular mean in `[0, 360)`; NaN when the directions cancel out.
    pub mean_wind_direction_deg: f64,
}

/// Summarize `trajectory` over `segment`, both end samples included.
pub fn summarize(
    segment: &ProfileSegment,
    trajectory: &Trajectory,
) -> Result<SegmentSummary, ProfileError> {
    let (start, end) = (segment.start_index, segment.end_index);
    if start > end {
        return Err(ProfileError::EmptySegment { start, end });
    }
    if end >= trajectory.len() {
        return Err(ProfileError::SegmentOutOfRange {
            end,
            len: trajectory.len(),
        });
    }

    let range = start..=end;
    let mean = |column: &[f64]| -> f64 {
        ArrayView1::from(&column[range.clone()])
            .mean()
            .unwrap_or(f64::NAN)
    };

    Ok(SegmentSummary {
        start_index: start,
        end_index: end,
        direction: segment.direction,
        start_time_s: trajectory.time_s()[start],
        end_time_s: trajectory.time_s()[end],
        mean_latitude_deg: mean(trajectory.latitude_deg()),
        mean_longitude_deg: mean(trajectory.longitude_deg()),
        mean_wind_speed: mean(trajectory.wind_speed()),
        mean_wind_direction_deg: circular_mean_deg(&trajectory.wind_direction_deg()[range.clone()])
            .unwrap_or(f64::NAN),
    })
}

/// Summarize every segment, keeping the input order.
pub fn summarize_all(
    segments: &[ProfileSegment],
    trajectory: &Trajectory,
) -> Result<Vec<SegmentSummary>, ProfileError> {
    segments
        .par_iter()
        .map(|segment| summarize(segment, trajectory))
        .collect()
}

/// Mean of angles in degrees, computed on unit vectors.
///
/// Returns `None` for an empty slice or when the vectors cancel out.
pub fn circular_mean_deg(directions: &[f64]) -> Option<f64> {
    if directions.is_empty() {
        return None;
    }
    let (sin_sum, cos_sum) = directions.iter().fold((0.0, 0.0), |(s, c), &deg| {
        let rad = deg.to_radians();
        (s + rad.sin(), c + rad.cos())
    });
    let n = directions.len() as f64;
    let (sin_mean, cos_mean) = (sin_sum / n, cos_sum / n);
    if sin_mean.hypot(cos_mean) < MIN_RESULTANT {
        return None;
    }
    let deg = sin_mean.atan2(cos_mean).to_degrees().rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative angles.
    Some(if deg >= 360.0 { 0.0 } else { deg })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trajectory::TrajectorySample;
    use approx::assert_abs_diff_eq;

    fn trajectory() -> Trajectory {
        let samples: Vec<TrajectorySample> = (0..5)
            .map(|i| TrajectorySample {
                time_s: 100.0 + i as f64,
                altitude_m: [50.0, 850.0, 60.0, 900.0, 40.0][i],
                latitude_deg: 54.0 + i as f64,
                longitude_deg: 10.0 - i as f64,
                wind_speed: 2.0 * i as f64,
                wind_direction_deg: [350.0, 10.0, 350.0, 10.0, 90.0][i],
            })
            .collect();
        Trajectory::from_samples(&samples)
    }

    #[test]
    fn circular_mean_wraps_through_north() {
        let mean = circular_mean_deg(&[350.0, 10.0]).unwrap();
        assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn circular_mean_of_ordinary_angles() {
        assert_abs_diff_eq!(circular_mean_deg(&[80.0, 100.0]).unwrap(), 90.0, epsilon = 1e-9);
        assert_abs_diff_eq!(circular_mean_deg(&[270.0]).unwrap(), 270.0, epsilon = 1e-9);
        assert_abs_diff_eq!(circular_mean_deg(&[-90.0]).unwrap(), 270.0, epsilon = 1e-9);
    }

    #[test]
    fn circular_mean_undefined_cases() {
        assert!(circular_mean_deg(&[]).is_none());
        assert!(circular_mean_deg(&[0.0, 180.0]).is_none());
    }

    #[test]
    fn summary_uses_inclusive_range() {
        let traj = trajectory();
        let segment = ProfileSegment {
            start_index: 0,
            end_index: 1,
            direction: Direction::Ascending,
        };
        let s = summarize(&segment, &traj).unwrap();
        assert_eq!(s.start_time_s, 100.0);
        assert_eq!(s.end_time_s, 101.0);
        assert_abs_diff_eq!(s.mean_latitude_deg, 54.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.mean_longitude_deg, 9.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s.mean_wind_speed, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.mean_wind_direction_deg, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn reversed_range_is_an_error() {
        let segment = ProfileSegment {
            start_index: 3,
            end_index: 1,
            direction: Direction::Descending,
        };
        let err = summarize(&segment, &trajectory()).unwrap_err();
        assert!(matches!(err, ProfileError::EmptySegment { start: 3, end: 1 }));
    }

    #[test]
    fn range_past_the_end_is_an_error() {
        let segment = ProfileSegment {
            start_index: 3,
            end_index: 5,
            direction: Direction::Descending,
        };
        let err = summarize(&segment, &trajectory()).unwrap_err();
        assert!(matches!(err, ProfileError::SegmentOutOfRange { end: 5, len: 5 }));
    }

    #[test]
    fn summarize_all_keeps_order() {
        let traj = trajectory();
        let segments = vec![
            ProfileSegment { start_index: 3, end_index: 4, direction: Direction::Descending },
            ProfileSegment { start_index: 0, end_index: 1, direction: Direction::Ascending },
        ];
        let out = summarize_all(&segments, &traj).unwrap();
        assert_eq!(out[0].start_index, 3);
        assert_eq!(out[1].start_index, 0);
    }
}
