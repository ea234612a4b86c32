//! Segment report output: the tab-separated text table and the JSON run dump.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::summary::SegmentSummary;
use crate::{ProfileError, ProfileRun};

pub const REPORT_HEADER: &str =
    "sys_time:start and finish of each data segment, mean lats, lons, wspd, wdir";

/// Write one tab-separated row per segment after a `#` header line.
///
/// Numbers use the `%.18e` layout of `numpy.savetxt`, so existing tooling
/// that reads those reports keeps working.
pub fn write_report<W: Write>(summaries: &[SegmentSummary], mut out: W) -> Result<(), ProfileError> {
    writeln!(out, "# {}", REPORT_HEADER).map_err(|e| ProfileError::OutputWrite(e.to_string()))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .from_writer(out);
    for s in summaries {
        writer
            .write_record(
                [
                    s.start_time_s,
                    s.end_time_s,
                    s.mean_latitude_deg,
                    s.mean_longitude_deg,
                    s.mean_wind_speed,
                    s.mean_wind_direction_deg,
                ]
                .iter()
                .map(|&v| format_savetxt(v)),
            )
            .map_err(|e| ProfileError::OutputWrite(e.to_string()))?;
    }
    writer
        .flush()
        .map_err(|e| ProfileError::OutputWrite(e.to_string()))
}

pub fn write_report_file(summaries: &[SegmentSummary], path: &Path) -> Result<(), ProfileError> {
    let file = File::create(path).map_err(|e| {
        ProfileError::OutputWrite(format!("failed to create {}: {}", path.display(), e))
    })?;
    write_report(summaries, BufWriter::new(file)).map_err(|err| match err {
        ProfileError::OutputWrite(msg) => {
            ProfileError::OutputWrite(format!("{}: {}", path.display(), msg))
        }
        other => other,
    })
}

/// Dump the whole run (parameters, extrema, segments, summaries) as JSON.
pub fn write_run_json(run: &ProfileRun, path: &Path) -> Result<(), ProfileError> {
    let text = serde_json::to_string_pretty(run)
        .map_err(|e| ProfileError::OutputWrite(e.to_string()))?;
    fs::write(path, text).map_err(|e| {
        ProfileError::OutputWrite(format!("failed to write {}: {}", path.display(), e))
    })
}

fn format_savetxt(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let raw = format!("{:.18e}", value);
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exp.abs())
        }
        None => raw,
    }
}
