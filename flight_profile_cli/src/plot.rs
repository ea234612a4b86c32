use std::error::Error;
use std::fs::File;
use std::panic;
use std::path::Path;

use chrono::NaiveTime;
use flight_profile::{Direction, ProfileRun, Trajectory};
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::DrawingErrorKind;

const CHART_SIZE: (u32, u32) = (1160, 820);
const ASCENDING_COLOR: RGBColor = RGBColor(191, 191, 0);
const DESCENDING_COLOR: RGBColor = RGBColor(0, 191, 191);

pub struct FlightPlot<'a> {
    pub trajectory: &'a Trajectory,
    pub run: &'a ProfileRun,
    pub title: String,
}

pub enum ChartKind {
    Png,
    Svg,
}

#[derive(Debug)]
pub enum PlotFailure {
    /// Drawing failed (missing fonts, backend panic); the run can go on without the chart.
    Render(String),
    /// The chart file could not be written.
    Write(String),
}

/// Render the altitude chart, turning backend panics (missing fonts) into errors.
pub fn render_chart_guard(
    plot: &FlightPlot,
    path: &Path,
    kind: ChartKind,
) -> Result<(), PlotFailure> {
    File::create(path).map_err(|e| PlotFailure::Write(e.to_string()))?;

    let render = || -> Result<(), PlotFailure> {
        match kind {
            ChartKind::Png => {
                let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
                draw_altitude_chart(root, plot).map_err(classify)
            }
            ChartKind::Svg => {
                let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
                draw_altitude_chart(root, plot).map_err(classify)
            }
        }
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| PlotFailure::Render("plotting backend panicked".to_string()))?
}

fn classify<E: Error + Send + Sync>(err: DrawingAreaErrorKind<E>) -> PlotFailure {
    match err {
        DrawingAreaErrorKind::BackendError(DrawingErrorKind::DrawingError(e)) => {
            PlotFailure::Write(e.to_string())
        }
        other => PlotFailure::Render(format!("plotting error: {}", other)),
    }
}

fn draw_altitude_chart<DB: DrawingBackend>(
    root: DrawingArea<DB, plotters::coord::Shift>,
    plot: &FlightPlot,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let times = plot.trajectory.time_s();
    let altitude = plot.trajectory.altitude_m();

    let (x_min, x_max) = finite_bounds(times).unwrap_or((0.0, 1.0));
    let (alt_min, alt_max) = finite_bounds(altitude).unwrap_or((0.0, 1.0));
    // Climb labels sit on the bottom edge of the axis, descent labels 50 m below the top.
    let label_low = alt_min - 0.02 * alt_min.abs();
    let label_high = alt_max + 0.02 * alt_max.abs();

    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            &plot.title,
            FontDesc::new(FontFamily::SansSerif, 30.0, FontStyle::Bold),
        )
        .margin(25)
        .set_label_area_size(LabelAreaPosition::Left, 70)
        .set_label_area_size(LabelAreaPosition::Bottom, 50)
        .build_cartesian_2d(x_min..x_max, label_low..(label_high + 50.0))?;

    chart
        .configure_mesh()
        .x_desc("time")
        .y_desc("height [m]")
        .x_label_formatter(&|v| format_clock(*v))
        .y_label_formatter(&|v| format!("{:.0}", v))
        .label_style(FontDesc::new(
            FontFamily::SansSerif,
            16.0,
            FontStyle::Normal,
        ))
        .draw()?;

    chart.draw_series(LineSeries::new(
        times.iter().copied().zip(altitude.iter().copied()),
        &RGBColor(31, 119, 180),
    ))?;

    let label_font = FontDesc::new(FontFamily::SansSerif, 22.0, FontStyle::Normal);
    for (number, summary) in plot.run.summaries.iter().enumerate() {
        let (color, label_y) = match summary.direction {
            Direction::Ascending => (ASCENDING_COLOR, label_low),
            Direction::Descending => (DESCENDING_COLOR, label_high),
        };
        let style = ShapeStyle {
            color: color.to_rgba(),
            filled: false,
            stroke_width: 3,
        };
        chart.draw_series(LineSeries::new(
            (summary.start_index..=summary.end_index).map(|i| (times[i], altitude[i])),
            style,
        ))?;

        let label = number.to_string();
        let width = 14 * label.len() as i32;
        chart.draw_series(std::iter::once(
            EmptyElement::at((times[summary.start_index], label_y))
                + Rectangle::new([(-4, -26), (width, -2)], color.mix(0.5).filled())
                + Text::new(label, (0, -24), label_font.clone()),
        ))?;
    }

    chart.draw_series(
        plot.run
            .peaks
            .iter()
            .map(|e| Circle::new((times[e.index], e.value), 5, RED.filled())),
    )?;
    chart.draw_series(
        plot.run
            .valleys
            .iter()
            .map(|e| TriangleMarker::new((times[e.index], e.value), 6, GREEN.filled())),
    )?;

    root.present()?;
    Ok(())
}

fn finite_bounds(values: &[f64]) -> Option<(f64, f64)> {
    let finite = values.iter().copied().filter(|v| v.is_finite());
    let (lo, hi) = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })?;
    if hi > lo {
        Some((lo, hi))
    } else {
        Some((lo - 0.5, hi + 0.5))
    }
}

/// Clock label for a system time in seconds: `H:MM`, prefixed with whole days
/// (`1 day, 2:05`) past 24 hours.
pub fn format_clock(seconds: f64) -> String {
    if !seconds.is_finite() {
        return String::new();
    }
    let whole = seconds.floor() as i64;
    let days = whole.div_euclid(86_400);
    let rem = whole.rem_euclid(86_400) as u32;
    let clock = NaiveTime::from_num_seconds_from_midnight_opt(rem, 0)
        .map(|t| t.format("%-H:%M").to_string())
        .unwrap_or_default();
    match days {
        0 => clock,
        1 | -1 => format!("{} day, {}", days, clock),
        _ => format!("{} days, {}", days, clock),
    }
}

/// Plot title `YYYY.MM.DD <flight>` taken from `_`-separated file name tokens.
pub fn flight_title(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let tokens: Vec<&str> = stem.split('_').collect();
    let date = tokens
        .iter()
        .find(|t| t.len() == 8 && t.is_ascii() && t.contains("20"))
        .map(|t| format!("{}.{}.{}", &t[..4], &t[4..6], &t[6..]))
        .unwrap_or_else(|| "Date?".to_string());
    let flight = tokens
        .iter()
        .find(|t| t.contains("flug"))
        .copied()
        .unwrap_or_default();
    format!("{} {}", date, flight).trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_labels() {
        assert_eq!(format_clock(0.0), "0:00");
        assert_eq!(format_clock(9.0 * 3600.0 + 5.0 * 60.0 + 59.9), "9:05");
        assert_eq!(format_clock(86_400.0 + 2.0 * 3600.0 + 300.0), "1 day, 2:05");
        assert_eq!(format_clock(3.0 * 86_400.0), "3 days, 0:00");
        assert_eq!(format_clock(-60.0), "-1 day, 23:59");
    }

    #[test]
    fn title_from_file_name() {
        assert_eq!(
            flight_title(Path::new("/data/xwakes_20190712_flug3_a.mat")),
            "2019.07.12 flug3"
        );
        assert_eq!(flight_title(Path::new("flug2_notes.mat")), "Date? flug2");
        assert_eq!(flight_title(Path::new("trajectory.csv")), "Date?");
    }

    #[test]
    fn directory_destination_is_a_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let trajectory = Trajectory::default();
        let run = flight_profile::extract_profiles(&trajectory, &flight_profile::Params::default())
            .unwrap();
        let plot = FlightPlot {
            trajectory: &trajectory,
            run: &run,
            title: "Date?".to_string(),
        };
        for kind in [ChartKind::Svg, ChartKind::Png] {
            let failure = render_chart_guard(&plot, dir.path(), kind).unwrap_err();
            assert!(matches!(failure, PlotFailure::Write(_)));
        }
    }

    #[test]
    fn bounds_widen_flat_series() {
        assert_eq!(finite_bounds(&[]), None);
        assert_eq!(finite_bounds(&[5.0, 5.0]), Some((4.5, 5.5)));
        assert_eq!(finite_bounds(&[1.0, f64::NAN, 3.0]), Some((1.0, 3.0)));
    }
}
