//! Index-aligned flight trajectory columns.

use serde::{Deserialize, Serialize};

use crate::summary::circular_mean_deg;
use crate::ProfileError;

/// One time-indexed record of the trajectory.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySample {
    pub time_s: f64,
    pub altitude_m: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub wind_speed: f64,
    pub wind_direction_deg: f64,
}

impl TrajectorySample {
    fn is_finite(&self) -> bool {
        self.time_s.is_finite()
            && self.altitude_m.is_finite()
            && self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.wind_speed.is_finite()
            && self.wind_direction_deg.is_finite()
    }
}

/// Raw parallel arrays as they come out of a data file.
#[derive(Clone, Debug, Default)]
pub struct TrajectoryColumns {
    pub time_s: Vec<f64>,
    pub altitude_m: Vec<f64>,
    pub latitude_deg: Vec<f64>,
    pub longitude_deg: Vec<f64>,
    pub wind_speed: Vec<f64>,
    pub wind_direction_deg: Vec<f64>,
}

/// Validated trajectory: every column has the same length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Trajectory {
    time_s: Vec<f64>,
    altitude_m: Vec<f64>,
    latitude_deg: Vec<f64>,
    longitude_deg: Vec<f64>,
    wind_speed: Vec<f64>,
    wind_direction_deg: Vec<f64>,
}

impl Trajectory {
    /// Build from parallel columns, failing when any column length differs from `time`.
    pub fn from_columns(columns: TrajectoryColumns) -> Result<Self, ProfileError> {
        let expected = columns.time_s.len();
        let lengths = [
            ("altitude", columns.altitude_m.len()),
            ("latitude", columns.latitude_deg.len()),
            ("longitude", columns.longitude_deg.len()),
            ("wind_speed", columns.wind_speed.len()),
            ("wind_direction", columns.wind_direction_deg.len()),
        ];
        for (name, len) in lengths {
            if len != expected {
                return Err(ProfileError::InputLoad(format!(
                    "column '{}' has {} samples but time has {}",
                    name, len, expected
                )));
            }
        }
        Ok(Self {
            time_s: columns.time_s,
            altitude_m: columns.altitude_m,
            latitude_deg: columns.latitude_deg,
            longitude_deg: columns.longitude_deg,
            wind_speed: columns.wind_speed,
            wind_direction_deg: columns.wind_direction_deg,
        })
    }

    pub fn from_samples(samples: &[TrajectorySample]) -> Self {
        let mut out = Self::with_capacity(samples.len());
        for sample in samples {
            out.push(*sample);
        }
        out
    }

    fn with_capacity(n: usize) -> Self {
        Self {
            time_s: Vec::with_capacity(n),
            altitude_m: Vec::with_capacity(n),
            latitude_deg: Vec::with_capacity(n),
            longitude_deg: Vec::with_capacity(n),
            wind_speed: Vec::with_capacity(n),
            wind_direction_deg: Vec::with_capacity(n),
        }
    }

    fn push(&mut self, sample: TrajectorySample) {
        self.time_s.push(sample.time_s);
        self.altitude_m.push(sample.altitude_m);
        self.latitude_deg.push(sample.latitude_deg);
        self.longitude_deg.push(sample.longitude_deg);
        self.wind_speed.push(sample.wind_speed);
        self.wind_direction_deg.push(sample.wind_direction_deg);
    }

    /// Remove every row that has a NaN or infinite value in any column.
    ///
    /// Returns the cleaned trajectory and the number of rows removed.
    pub fn drop_non_finite(self) -> (Self, usize) {
        let before = self.len();
        let kept: Vec<TrajectorySample> = self.samples().filter(|s| s.is_finite()).collect();
        let dropped = before - kept.len();
        if dropped == 0 {
            return (self, 0);
        }
        (Self::from_samples(&kept), dropped)
    }

    /// True when time never decreases from one sample to the next.
    pub fn is_time_monotonic(&self) -> bool {
        self.time_s.windows(2).all(|w| w[1] >= w[0])
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time_s.is_empty()
    }

    pub fn sample(&self, index: usize) -> Option<TrajectorySample> {
        if index >= self.len() {
            return None;
        }
        Some(TrajectorySample {
            time_s: self.time_s[index],
            altitude_m: self.altitude_m[index],
            latitude_deg: self.latitude_deg[index],
            longitude_deg: self.longitude_deg[index],
            wind_speed: self.wind_speed[index],
            wind_direction_deg: self.wind_direction_deg[index],
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = TrajectorySample> + '_ {
        (0..self.len()).filter_map(move |i| self.sample(i))
    }

    pub fn time_s(&self) -> &[f64] {
        &self.time_s
    }

    pub fn altitude_m(&self) -> &[f64] {
        &self.altitude_m
    }

    pub fn latitude_deg(&self) -> &[f64] {
        &self.latitude_deg
    }

    pub fn longitude_deg(&self) -> &[f64] {
        &self.longitude_deg
    }

    pub fn wind_speed(&self) -> &[f64] {
        &self.wind_speed
    }

    pub fn wind_direction_deg(&self) -> &[f64] {
        &self.wind_direction_deg
    }

    /// Circular mean of the wind direction over the whole flight.
    pub fn mean_wind_direction(&self) -> Option<f64> {
        circular_mean_deg(&self.wind_direction_deg)
    }
}
