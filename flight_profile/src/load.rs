//! Reading trajectory columns from MAT, delimited text and (optionally) NetCDF files.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::trajectory::{Trajectory, TrajectoryColumns};
use crate::ProfileError;

/// Names of the six variables inside the data file.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VariableNames {
    pub time: String,
    pub altitude: String,
    pub latitude: String,
    pub longitude: String,
    pub wind_speed: String,
    pub wind_direction: String,
}

impl Default for VariableNames {
    fn default() -> Self {
        Self {
            time: "sys_time".to_string(),
            altitude: "Alt".to_string(),
            latitude: "Lat".to_string(),
            longitude: "Lon".to_string(),
            wind_speed: "FF".to_string(),
            wind_direction: "DD".to_string(),
        }
    }
}

impl VariableNames {
    fn ordered(&self) -> [&str; 6] {
        [
            self.time.as_str(),
            self.altitude.as_str(),
            self.latitude.as_str(),
            self.longitude.as_str(),
            self.wind_speed.as_str(),
            self.wind_direction.as_str(),
        ]
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Mat,
    Delimited(u8),
    NetCdf,
}

fn detect_format(hint: &str) -> Result<Format, ProfileError> {
    let hint = hint.to_ascii_lowercase();
    let ext = hint.rsplit('.').next().unwrap_or(hint.as_str());
    match ext {
        "mat" => Ok(Format::Mat),
        "csv" => Ok(Format::Delimited(b',')),
        "tsv" | "txt" => Ok(Format::Delimited(b'\t')),
        "nc" | "nc4" | "cdf" => Ok(Format::NetCdf),
        _ => Err(ProfileError::UnsupportedFormat(hint.to_string())),
    }
}

/// Load a trajectory from `path`, choosing the reader by file extension.
pub fn load_trajectory(path: &Path, names: &VariableNames) -> Result<Trajectory, ProfileError> {
    let hint = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default();
    match detect_format(hint)? {
        Format::NetCdf => load_netcdf(path, names),
        _ => {
            let data = fs::read(path).map_err(|e| {
                ProfileError::InputLoad(format!("failed to read {}: {}", path.display(), e))
            })?;
            parse_trajectory(&data, hint, names).map_err(|err| match err {
                ProfileError::InputLoad(msg) => {
                    ProfileError::InputLoad(format!("{}: {}", path.display(), msg))
                }
                other => other,
            })
        }
    }
}

/// Parse an in-memory MAT or delimited-text file; `format` is an extension hint.
pub fn parse_trajectory(
    input: &[u8],
    format: &str,
    names: &VariableNames,
) -> Result<Trajectory, ProfileError> {
    match detect_format(format)? {
        Format::Mat => parse_mat(input, names),
        Format::Delimited(delimiter) => parse_delimited(input, delimiter, names),
        Format::NetCdf => Err(ProfileError::UnsupportedFormat(format!(
            "{} (NetCDF can only be read from a path)",
            format
        ))),
    }
}

fn columns_from(values: [Vec<f64>; 6]) -> Result<Trajectory, ProfileError> {
    let [time_s, altitude_m, latitude_deg, longitude_deg, wind_speed, wind_direction_deg] = values;
    Trajectory::from_columns(TrajectoryColumns {
        time_s,
        altitude_m,
        latitude_deg,
        longitude_deg,
        wind_speed,
        wind_direction_deg,
    })
}

fn parse_mat(input: &[u8], names: &VariableNames) -> Result<Trajectory, ProfileError> {
    let mat = matfile::MatFile::parse(Cursor::new(input))
        .map_err(|e| ProfileError::InputLoad(format!("invalid MAT file: {:?}", e)))?;

    let mut values: [Vec<f64>; 6] = Default::default();
    for (slot, name) in values.iter_mut().zip(names.ordered()) {
        let array = mat
            .find_by_name(name)
            .ok_or_else(|| ProfileError::InputLoad(format!("missing variable '{}'", name)))?;
        // Row and column vectors are both accepted, like a squeeze.
        let non_singleton = array.size().iter().filter(|&&d| d > 1).count();
        if non_singleton > 1 {
            return Err(ProfileError::InputLoad(format!(
                "variable '{}' is not a vector (size {:?})",
                name,
                array.size()
            )));
        }
        *slot = numeric_to_f64(array.data()).ok_or_else(|| {
            ProfileError::InputLoad(format!("variable '{}' is not a real numeric array", name))
        })?;
    }
    columns_from(values)
}

fn numeric_to_f64(data: &matfile::NumericData) -> Option<Vec<f64>> {
    use matfile::NumericData;

    fn widen<T: Copy + Into<f64>>(real: &[T]) -> Vec<f64> {
        real.iter().map(|&v| v.into()).collect()
    }

    #[allow(unreachable_patterns)]
    let out = match data {
        NumericData::Double { real, .. } => real.clone(),
        NumericData::Single { real, .. } => widen(real),
        NumericData::Int8 { real, .. } => widen(real),
        NumericData::UInt8 { real, .. } => widen(real),
        NumericData::Int16 { real, .. } => widen(real),
        NumericData::UInt16 { real, .. } => widen(real),
        NumericData::Int32 { real, .. } => widen(real),
        NumericData::UInt32 { real, .. } => widen(real),
        NumericData::Int64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        NumericData::UInt64 { real, .. } => real.iter().map(|&v| v as f64).collect(),
        _ => return None,
    };
    Some(out)
}

fn parse_delimited(
    input: &[u8],
    delimiter: u8,
    names: &VariableNames,
) -> Result<Trajectory, ProfileError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(input);

    let headers = reader
        .headers()
        .map_err(|e| ProfileError::InputLoad(format!("unreadable header: {}", e)))?
        .clone();
    let mut positions = [0usize; 6];
    for (slot, name) in positions.iter_mut().zip(names.ordered()) {
        *slot = headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| ProfileError::InputLoad(format!("missing variable '{}'", name)))?;
    }

    let mut values: [Vec<f64>; 6] = Default::default();
    for (row, record) in reader.records().enumerate() {
        let record = record
            .map_err(|e| ProfileError::InputLoad(format!("row {}: {}", row + 1, e)))?;
        for (column, &pos) in values.iter_mut().zip(positions.iter()) {
            let cell = record.get(pos).unwrap_or_default();
            let value = if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|e| {
                    ProfileError::InputLoad(format!(
                        "row {}: '{}' in column '{}' is not a number ({})",
                        row + 1,
                        cell,
                        &headers[pos],
                        e
                    ))
                })?
            };
            column.push(value);
        }
    }
    columns_from(values)
}

#[cfg(feature = "netcdf")]
fn load_netcdf(path: &Path, names: &VariableNames) -> Result<Trajectory, ProfileError> {
    let file = netcdf::open(path)
        .map_err(|e| ProfileError::InputLoad(format!("{}: {}", path.display(), e)))?;

    let mut values: [Vec<f64>; 6] = Default::default();
    for (slot, name) in values.iter_mut().zip(names.ordered()) {
        let var = file.variable(name).ok_or_else(|| {
            ProfileError::InputLoad(format!("{}: missing variable '{}'", path.display(), name))
        })?;
        let data: Vec<f64> = var.get_values(..).map_err(|e| {
            ProfileError::InputLoad(format!("{}: variable '{}': {}", path.display(), name, e))
        })?;
        *slot = data;
    }
    columns_from(values)
}

#[cfg(not(feature = "netcdf"))]
fn load_netcdf(path: &Path, _names: &VariableNames) -> Result<Trajectory, ProfileError> {
    Err(ProfileError::UnsupportedFormat(format!(
        "{} (built without the `netcdf` feature)",
        path.display()
    )))
}
