//! SVG charts of price, P/E and σ-bands.
//!
//! Charts are assembled as SVG text. Each panel plots one series against a left
//! axis and optionally a second series against a right axis, with overvalued and
//! undervalued regions shaded behind the lines.

use chrono::{Datelike, NaiveDate};
use epsilon_valuation::{BandAnalysis, EpsMode, PeSeries, RegionKind, SigmaBands, ValuationError};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

const WIDTH: f64 = 960.0;
const PANEL_HEIGHT: f64 = 360.0;
const TITLE_HEIGHT: f64 = 44.0;
const MARGIN_X: f64 = 72.0;
const MARGIN_TOP: f64 = 40.0;
const MARGIN_BOTTOM: f64 = 40.0;
const VALUE_TICKS: usize = 5;
const MAX_TIME_LABELS: usize = 12;

const LEFT_COLOR: &str = "#348dc1";
const RIGHT_COLOR: &str = "#333333";
const MEAN_COLOR: &str = "#8c8c8c";
const SIGMA_COLOR: &str = "#d4a017";
const OVERVALUED_COLOR: &str = "#d62728";
const UNDERVALUED_COLOR: &str = "#1f77b4";

const SOLID: &str = "0";
const DASHED: &str = "6 4";
const DOTTED: &str = "2 3";

/// Errors raised while rendering charts.
#[derive(Debug, Error)]
pub enum ChartError {
    /// Nothing to plot.
    #[error("No data to plot")]
    Empty,

    /// More series than a panel has axes.
    #[error("At most two series can be plotted, got {0}")]
    TooManySeries(usize),

    /// A series does not line up with the dates.
    #[error("Series '{name}' has {actual} values for {expected} dates")]
    LengthMismatch {
        /// Series name.
        name: String,
        /// Number of dates.
        expected: usize,
        /// Number of values.
        actual: usize,
    },

    /// Invalid band configuration.
    #[error(transparent)]
    Valuation(#[from] ValuationError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One P/E panel: a series and, optionally, its bands.
#[derive(Debug, Clone, Copy)]
pub struct PePanel<'a> {
    /// The P/E series.
    pub series: &'a PeSeries,
    /// Bands drawn on the P/E axis.
    pub bands: Option<&'a BandAnalysis>,
}

/// A named series of optional values aligned with a date axis.
#[derive(Debug, Clone, PartialEq)]
pub struct NamedSeries {
    /// Legend label.
    pub name: String,
    /// One value per date, `None` where missing.
    pub values: Vec<Option<f64>>,
}

impl NamedSeries {
    /// Create a named series.
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Write an SVG document to `path`, creating parent directories.
pub fn save_svg(path: &Path, svg: &str) -> Result<(), ChartError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, svg)?;
    Ok(())
}

/// Render the P/E chart, one panel per entry in `panels`.
///
/// Each panel plots price on the left axis and P/E on the right axis, with the
/// band mean as a dashed line, the ±kσ thresholds as dotted lines and
/// overvalued (red) and undervalued (blue) regions shaded.
///
/// # Errors
///
/// [`ChartError::Empty`] when there are no panels or every series is empty.
pub fn render_pe_chart(
    symbol: &str,
    panels: &[PePanel<'_>],
    updated: NaiveDate,
) -> Result<String, ChartError> {
    if panels.iter().all(|p| p.series.is_empty()) {
        return Err(ChartError::Empty);
    }

    let height = TITLE_HEIGHT + PANEL_HEIGHT * panels.len() as f64;
    let mut svg = svg_header(WIDTH, height);
    svg.push_str(&format!(
        r##"<text x="{x:.2}" y="28" text-anchor="middle" font-size="16" font-weight="bold" fill="#222">{title}</text>"##,
        x = WIDTH / 2.0,
        title = escape(&format!("{} P/E Ratio (last updated {})", symbol, updated)),
    ));

    for (idx, panel) in panels.iter().enumerate() {
        let mode = panel.series.mode();
        let dates = panel.series.dates();
        let prices: Vec<Option<f64>> = panel
            .series
            .records()
            .iter()
            .map(|r| Some(r.price))
            .collect();
        let ratios: Vec<Option<f64>> = panel.series.records().iter().map(|r| r.pe_ratio).collect();

        let layout = Panel {
            title: format!("{} {} P/E: {}", symbol, mode_title(mode), mode.label()),
            dates: &dates,
            left: Line {
                label: format!("{} Price", symbol),
                values: &prices,
                color: LEFT_COLOR,
            },
            right: Some(Line {
                label: format!("{} P/E", mode_title(mode)),
                values: &ratios,
                color: RIGHT_COLOR,
            }),
            bands: panel.bands.map(|b| (b, Axis::Right)),
        };
        draw_panel(&mut svg, &layout, &Frame::at(TITLE_HEIGHT + idx as f64 * PANEL_HEIGHT));
    }

    svg.push_str(svg_footer());
    debug!(symbol, panels = panels.len(), "rendered P/E chart");
    Ok(svg)
}

/// Render up to two series over `dates`, the second on a right axis.
///
/// `sigma` is `(k, index)`: band the series at `index` at `k` standard
/// deviations. An index past the last series is logged and banding is skipped.
///
/// # Errors
///
/// [`ChartError::TooManySeries`] for more than two series,
/// [`ChartError::LengthMismatch`] when a series does not match `dates`,
/// [`ChartError::Empty`] when there is nothing to plot, and
/// [`ChartError::Valuation`] for an invalid `k`.
pub fn render_time_series(
    dates: &[NaiveDate],
    series: &[NamedSeries],
    sigma: Option<(f64, usize)>,
) -> Result<String, ChartError> {
    if series.len() > 2 {
        return Err(ChartError::TooManySeries(series.len()));
    }
    let Some(first) = series.first() else {
        return Err(ChartError::Empty);
    };
    if dates.is_empty() {
        return Err(ChartError::Empty);
    }
    for s in series {
        if s.values.len() != dates.len() {
            return Err(ChartError::LengthMismatch {
                name: s.name.clone(),
                expected: dates.len(),
                actual: s.values.len(),
            });
        }
    }

    let bands = match sigma {
        Some((k, index)) => {
            let bander = SigmaBands::new(k)?;
            match series.get(index) {
                Some(target) => {
                    let points: Vec<(NaiveDate, Option<f64>)> = dates
                        .iter()
                        .copied()
                        .zip(target.values.iter().copied())
                        .collect();
                    let axis = if index == 0 { Axis::Left } else { Axis::Right };
                    bander.compute(&points).map(|b| (b, axis))
                }
                None => {
                    warn!(
                        index,
                        series = series.len(),
                        "sigma series index out of range, skipping bands"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let title = series
        .iter()
        .map(|s| s.name.as_str())
        .collect::<Vec<_>>()
        .join(" vs ");

    let layout = Panel {
        title,
        dates,
        left: Line {
            label: first.name.clone(),
            values: &first.values,
            color: LEFT_COLOR,
        },
        right: series.get(1).map(|s| Line {
            label: s.name.clone(),
            values: &s.values,
            color: RIGHT_COLOR,
        }),
        bands: bands.as_ref().map(|(b, axis)| (b, *axis)),
    };

    let mut svg = svg_header(WIDTH, PANEL_HEIGHT);
    draw_panel(&mut svg, &layout, &Frame::at(0.0));
    svg.push_str(svg_footer());
    Ok(svg)
}

const fn mode_title(mode: EpsMode) -> &'static str {
    match mode {
        EpsMode::Forward => "Forward",
        EpsMode::Trailing => "Trailing",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Left,
    Right,
}

struct Line<'a> {
    label: String,
    values: &'a [Option<f64>],
    color: &'static str,
}

struct Panel<'a> {
    title: String,
    dates: &'a [NaiveDate],
    left: Line<'a>,
    right: Option<Line<'a>>,
    bands: Option<(&'a BandAnalysis, Axis)>,
}

enum Mark {
    Stroke(&'static str),
    Swatch,
}

struct LegendEntry {
    label: String,
    color: &'static str,
    mark: Mark,
}

/// Vertical placement of a panel inside the document.
struct Frame {
    top: f64,
}

impl Frame {
    const fn at(top: f64) -> Self {
        Self { top }
    }

    fn plot_top(&self) -> f64 {
        self.top + MARGIN_TOP
    }

    fn plot_bottom(&self) -> f64 {
        self.top + PANEL_HEIGHT - MARGIN_BOTTOM
    }

    fn y(&self, value: f64, (min_v, max_v): (f64, f64)) -> f64 {
        let inner = self.plot_bottom() - self.plot_top();
        if (max_v - min_v).abs() < f64::EPSILON {
            return self.plot_top() + inner / 2.0;
        }
        let norm = (value - min_v) / (max_v - min_v);
        self.plot_top() + (1.0 - norm) * inner
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn svg_header(width: f64, height: f64) -> String {
    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}"><style>text{{font-family:Arial,sans-serif;font-size:10px;fill:#666}}</style><rect width="100%" height="100%" fill="#ffffff" />"##,
        w = width,
        h = height
    )
}

const fn svg_footer() -> &'static str {
    "</svg>"
}

fn x_positions(len: usize) -> Vec<f64> {
    match len {
        0 => Vec::new(),
        1 => vec![WIDTH / 2.0],
        _ => {
            let inner = WIDTH - 2.0 * MARGIN_X;
            (0..len)
                .map(|i| MARGIN_X + inner * (i as f64 / (len - 1) as f64))
                .collect()
        }
    }
}

fn extent(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (min_v, max_v) = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !min_v.is_finite() || !max_v.is_finite() {
        return None;
    }
    if min_v == max_v {
        let adjust = if min_v == 0.0 { 1.0 } else { min_v.abs() * 0.1 };
        return Some((min_v - adjust, max_v + adjust));
    }
    let pad = (max_v - min_v) * 0.05;
    Some((min_v - pad, max_v + pad))
}

fn axis_extent(line: &Line<'_>, bands: Option<&BandAnalysis>) -> Option<(f64, f64)> {
    let guides = bands
        .map(|b| vec![b.mean, b.upper, b.lower])
        .unwrap_or_default();
    extent(line.values.iter().flatten().copied().chain(guides))
}

fn segments(
    xs: &[f64],
    values: &[Option<f64>],
    frame: &Frame,
    range: (f64, f64),
) -> Vec<Vec<(f64, f64)>> {
    let mut out = Vec::new();
    let mut current = Vec::new();
    for (x, value) in xs.iter().zip(values) {
        match value.filter(|v| v.is_finite()) {
            Some(v) => current.push((*x, frame.y(v, range))),
            None if !current.is_empty() => out.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn polyline(points: &[(f64, f64)], stroke: &str) -> String {
    if points.is_empty() {
        return String::new();
    }

    let coords: String = points
        .iter()
        .map(|(x, y)| format!("{:.2},{:.2}", x, y))
        .collect::<Vec<_>>()
        .join(" ");

    format!(
        r#"<polyline fill="none" stroke="{stroke}" stroke-width="1.5" points="{coords}" />"#,
        stroke = stroke,
        coords = coords
    )
}

fn format_value(value: f64) -> String {
    if value.abs() >= 1000.0 {
        format!("{:.0}", value)
    } else {
        format!("{:.1}", value)
    }
}

fn draw_panel(svg: &mut String, panel: &Panel<'_>, frame: &Frame) {
    let xs = x_positions(panel.dates.len());
    let band_on = |axis: Axis| {
        panel
            .bands
            .filter(|(_, side)| *side == axis)
            .map(|(b, _)| b)
    };

    svg.push_str(&format!(
        r##"<text x="{x:.2}" y="{y:.2}" text-anchor="middle" font-size="13" font-weight="bold" fill="#333">{title}</text>"##,
        x = WIDTH / 2.0,
        y = frame.top + 22.0,
        title = escape(&panel.title),
    ));

    let Some(left_range) = axis_extent(&panel.left, band_on(Axis::Left)) else {
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">No data</text>"#,
            x = WIDTH / 2.0,
            y = frame.top + PANEL_HEIGHT / 2.0,
        ));
        return;
    };
    let right_range = panel
        .right
        .as_ref()
        .and_then(|line| axis_extent(line, band_on(Axis::Right)));

    if let Some((bands, _)) = panel.bands {
        draw_regions(svg, panel.dates, &xs, bands, frame);
    }

    add_time_axis(svg, panel.dates, &xs, frame);

    if let Some((bands, axis)) = panel.bands {
        let range = match axis {
            Axis::Left => Some(left_range),
            Axis::Right => right_range,
        };
        if let Some(range) = range {
            draw_guides(svg, bands, frame, range);
        }
    }

    for segment in segments(&xs, panel.left.values, frame, left_range) {
        svg.push_str(&polyline(&segment, panel.left.color));
    }
    add_value_axis(svg, frame, left_range, Axis::Left, panel.left.color);

    if let (Some(right), Some(range)) = (&panel.right, right_range) {
        for segment in segments(&xs, right.values, frame, range) {
            svg.push_str(&polyline(&segment, right.color));
        }
        add_value_axis(svg, frame, range, Axis::Right, right.color);
    }

    let mut entries = vec![LegendEntry {
        label: panel.left.label.clone(),
        color: panel.left.color,
        mark: Mark::Stroke(SOLID),
    }];
    if let Some(right) = &panel.right {
        entries.push(LegendEntry {
            label: right.label.clone(),
            color: right.color,
            mark: Mark::Stroke(SOLID),
        });
    }
    if let Some((bands, _)) = panel.bands {
        entries.extend([
            LegendEntry {
                label: format!("Mean: {:.2}", bands.mean),
                color: MEAN_COLOR,
                mark: Mark::Stroke(DASHED),
            },
            LegendEntry {
                label: format!("+{}σ: {:.2}", bands.k, bands.upper),
                color: SIGMA_COLOR,
                mark: Mark::Stroke(DOTTED),
            },
            LegendEntry {
                label: format!("-{}σ: {:.2}", bands.k, bands.lower),
                color: SIGMA_COLOR,
                mark: Mark::Stroke(DOTTED),
            },
            LegendEntry {
                label: "Overvalued".to_string(),
                color: OVERVALUED_COLOR,
                mark: Mark::Swatch,
            },
            LegendEntry {
                label: "Undervalued".to_string(),
                color: UNDERVALUED_COLOR,
                mark: Mark::Swatch,
            },
        ]);
    }
    draw_legend(svg, &entries, frame);
}

fn draw_regions(
    svg: &mut String,
    dates: &[NaiveDate],
    xs: &[f64],
    bands: &BandAnalysis,
    frame: &Frame,
) {
    let Some(last) = xs.len().checked_sub(1) else {
        return;
    };
    let index_of = |date: NaiveDate| dates.partition_point(|d| *d < date).min(last);

    for region in &bands.regions {
        let x1 = xs[index_of(region.start)];
        let x2 = xs[index_of(region.end)];
        let color = match region.kind {
            RegionKind::Overvalued => OVERVALUED_COLOR,
            RegionKind::Undervalued => UNDERVALUED_COLOR,
        };
        svg.push_str(&format!(
            r#"<rect x="{x:.2}" y="{y:.2}" width="{w:.2}" height="{h:.2}" fill="{color}" fill-opacity="0.15" />"#,
            x = x1.min(x2),
            y = frame.plot_top(),
            w = (x2 - x1).abs().max(1.0),
            h = frame.plot_bottom() - frame.plot_top(),
            color = color,
        ));
    }
}

fn draw_guides(svg: &mut String, bands: &BandAnalysis, frame: &Frame, range: (f64, f64)) {
    for (value, color, dash) in [
        (bands.mean, MEAN_COLOR, DASHED),
        (bands.upper, SIGMA_COLOR, DOTTED),
        (bands.lower, SIGMA_COLOR, DOTTED),
    ] {
        svg.push_str(&format!(
            r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1.2" stroke-dasharray="{dash}" />"#,
            x1 = MARGIN_X,
            x2 = WIDTH - MARGIN_X,
            y = frame.y(value, range),
            color = color,
            dash = dash,
        ));
    }
}

fn add_time_axis(svg: &mut String, dates: &[NaiveDate], xs: &[f64], frame: &Frame) {
    let (Some(first), Some(last)) = (dates.first(), dates.last()) else {
        return;
    };
    let axis_y = frame.plot_bottom();

    svg.push_str(&format!(
        r##"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="#000" stroke-width="1" />"##,
        x1 = MARGIN_X,
        x2 = WIDTH - MARGIN_X,
        y = axis_y
    ));

    // yearly labels for long histories, monthly otherwise
    let yearly = (*last - *first).num_days() > 730;
    let mut ticks: Vec<(usize, NaiveDate)> = Vec::new();
    let mut last_key: Option<(i32, u32)> = None;
    for (idx, date) in dates.iter().enumerate() {
        let key = if yearly {
            (date.year(), 0)
        } else {
            (date.year(), date.month())
        };
        if last_key != Some(key) {
            last_key = Some(key);
            ticks.push((idx, *date));
        }
    }

    let stride = ticks.len().div_ceil(MAX_TIME_LABELS).max(1);
    for (idx, date) in ticks.into_iter().step_by(stride) {
        let Some(&x) = xs.get(idx) else {
            break;
        };
        let label = if yearly {
            date.format("%Y").to_string()
        } else {
            date.format("%Y-%m").to_string()
        };

        svg.push_str(&format!(
            r##"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="#dddddd" stroke-width="0.5" />"##,
            x = x,
            y1 = frame.plot_top(),
            y2 = axis_y
        ));
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="middle">{label}</text>"#,
            x = x,
            y = axis_y + 16.0,
            label = label
        ));
    }
}

fn add_value_axis(svg: &mut String, frame: &Frame, range: (f64, f64), axis: Axis, color: &str) {
    let (x, anchor, label_x) = match axis {
        Axis::Left => (MARGIN_X, "end", MARGIN_X - 6.0),
        Axis::Right => (WIDTH - MARGIN_X, "start", WIDTH - MARGIN_X + 6.0),
    };

    svg.push_str(&format!(
        r#"<line x1="{x:.2}" y1="{y1:.2}" x2="{x:.2}" y2="{y2:.2}" stroke="{color}" stroke-width="1" />"#,
        x = x,
        y1 = frame.plot_top(),
        y2 = frame.plot_bottom(),
        color = color,
    ));

    let (min_v, max_v) = range;
    for i in 0..VALUE_TICKS {
        let value = min_v + (max_v - min_v) * i as f64 / (VALUE_TICKS - 1) as f64;
        let y = frame.y(value, range);
        svg.push_str(&format!(
            r#"<text x="{x:.2}" y="{y:.2}" text-anchor="{anchor}" fill="{color}">{label}</text>"#,
            x = label_x,
            y = y + 3.0,
            anchor = anchor,
            color = color,
            label = format_value(value),
        ));
    }
}

fn draw_legend(svg: &mut String, entries: &[LegendEntry], frame: &Frame) {
    if entries.is_empty() {
        return;
    }

    let x = MARGIN_X + 10.0;
    let mut y = frame.plot_top() + 14.0;

    svg.push_str(&format!(
        r##"<rect x="{x:.2}" y="{y:.2}" width="170" height="{h:.2}" fill="#ffffff" fill-opacity="0.8" stroke="#dddddd" />"##,
        x = x - 6.0,
        y = y - 12.0,
        h = entries.len() as f64 * 16.0 + 4.0,
    ));

    for entry in entries {
        match entry.mark {
            Mark::Stroke(dash) => svg.push_str(&format!(
                r#"<line x1="{x1:.2}" y1="{y:.2}" x2="{x2:.2}" y2="{y:.2}" stroke="{color}" stroke-width="1.5" stroke-dasharray="{dash}" />"#,
                x1 = x,
                x2 = x + 20.0,
                y = y - 4.0,
                color = entry.color,
                dash = dash
            )),
            Mark::Swatch => svg.push_str(&format!(
                r#"<rect x="{x:.2}" y="{y:.2}" width="20" height="8" fill="{color}" fill-opacity="0.3" />"#,
                x = x,
                y = y - 8.0,
                color = entry.color,
            )),
        }
        svg.push_str(&format!(
            r##"<text x="{x:.2}" y="{y:.2}" text-anchor="start" fill="#333">{label}</text>"##,
            x = x + 26.0,
            y = y,
            label = escape(&entry.label)
        ));
        y += 16.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use epsilon_data::{EpsReport, EpsTable, EpsValue, PricePoint, PriceSeries};

    fn dates(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        (0..n).map(|i| start + Duration::days(i as i64 * 7)).collect()
    }

    fn wave(n: usize) -> Vec<Option<f64>> {
        (0..n).map(|i| Some(20.0 + 4.0 * (i as f64 / 5.0).sin())).collect()
    }

    fn region_rects(svg: &str, color: &str) -> usize {
        svg.matches(&format!(r#"fill="{}" fill-opacity="0.15""#, color))
            .count()
    }

    fn pe_series(mode: EpsMode) -> PeSeries {
        let days = dates(80);
        let mut table = EpsTable::new();
        for year in 2019..=2022 {
            let mut report = EpsReport::new(NaiveDate::from_ymd_opt(year, 1, 1).unwrap());
            for y in [year - 1, year, year + 1] {
                for quarter in 1..=4 {
                    let label = format!("Q{}'{:02}", quarter, y % 100);
                    report.insert(label.parse().unwrap(), EpsValue::Value(40.0));
                }
            }
            table.upsert_report(report);
        }
        let prices = PriceSeries::new(
            days.iter()
                .zip(wave(80))
                .map(|(d, v)| PricePoint::new(*d, v.unwrap() * 160.0))
                .collect(),
        );
        PeSeries::compute(&table, &prices, mode)
    }

    #[test]
    fn test_render_pe_chart_has_both_panels() {
        let trailing = pe_series(EpsMode::Trailing);
        let forward = pe_series(EpsMode::Forward);
        let trailing_bands = SigmaBands::new(1.0)
            .unwrap()
            .compute(&trailing.ratio_points())
            .unwrap();
        let forward_bands = SigmaBands::new(1.0)
            .unwrap()
            .compute(&forward.ratio_points())
            .unwrap();
        let panels = [
            PePanel {
                series: &trailing,
                bands: Some(&trailing_bands),
            },
            PePanel {
                series: &forward,
                bands: Some(&forward_bands),
            },
        ];

        let svg = render_pe_chart(
            "S&P 500",
            &panels,
            NaiveDate::from_ymd_opt(2021, 7, 1).unwrap(),
        )
        .unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        assert!(svg.contains("S&amp;P 500 P/E Ratio (last updated 2021-07-01)"));
        assert!(svg.contains("Trailing P/E: Q(-4)+Q(-3)+Q(-2)+Q(-1)"));
        assert!(svg.contains("Forward P/E: Q(0)+Q(1)+Q(2)+Q(3)"));
        let expected = |kind| {
            trailing_bands.regions_of(kind).count() + forward_bands.regions_of(kind).count()
        };
        assert!(expected(RegionKind::Overvalued) > 0);
        assert!(expected(RegionKind::Undervalued) > 0);
        assert_eq!(
            region_rects(&svg, OVERVALUED_COLOR),
            expected(RegionKind::Overvalued)
        );
        assert_eq!(
            region_rects(&svg, UNDERVALUED_COLOR),
            expected(RegionKind::Undervalued)
        );
        assert!(svg.contains(&format!("stroke-dasharray=\"{}\"", DASHED)));
        assert!(svg.contains(&format!("Mean: {:.2}", forward_bands.mean)));
        assert!(svg.matches("<polyline").count() >= 4);
    }

    #[test]
    fn test_render_pe_chart_empty() {
        let empty = PeSeries::compute(&EpsTable::new(), &PriceSeries::default(), EpsMode::Forward);
        let panels = [PePanel {
            series: &empty,
            bands: None,
        }];
        let result = render_pe_chart("^GSPC", &panels, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(matches!(result, Err(ChartError::Empty)));
        assert!(matches!(
            render_pe_chart("^GSPC", &[], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            Err(ChartError::Empty)
        ));
    }

    #[test]
    fn test_time_series_rejects_three_series() {
        let d = dates(10);
        let series = vec![
            NamedSeries::new("a", wave(10)),
            NamedSeries::new("b", wave(10)),
            NamedSeries::new("c", wave(10)),
        ];
        assert!(matches!(
            render_time_series(&d, &series, None),
            Err(ChartError::TooManySeries(3))
        ));
    }

    #[test]
    fn test_time_series_length_mismatch() {
        let d = dates(10);
        let series = vec![NamedSeries::new("short", wave(9))];
        assert!(matches!(
            render_time_series(&d, &series, None),
            Err(ChartError::LengthMismatch { expected: 10, actual: 9, .. })
        ));
    }

    #[test]
    fn test_time_series_out_of_range_sigma_is_skipped() {
        let d = dates(60);
        let series = vec![NamedSeries::new("P/E", wave(60))];
        let svg = render_time_series(&d, &series, Some((1.0, 3))).unwrap();
        assert_eq!(region_rects(&svg, OVERVALUED_COLOR), 0);
        assert_eq!(region_rects(&svg, UNDERVALUED_COLOR), 0);
        assert!(svg.contains("P/E"));
    }

    #[test]
    fn test_time_series_with_bands_on_second_axis() {
        let d = dates(60);
        let mut gappy = wave(60);
        gappy[30] = None;
        let series = vec![
            NamedSeries::new("Price", wave(60)),
            NamedSeries::new("P/E", gappy),
        ];
        let svg = render_time_series(&d, &series, Some((1.0, 1))).unwrap();
        assert!(svg.contains("Price vs P/E"));
        assert!(region_rects(&svg, OVERVALUED_COLOR) > 0);
        // the gap splits the second series in two
        assert_eq!(svg.matches("<polyline").count(), 3);
    }

    #[test]
    fn test_invalid_sigma_is_an_error() {
        let d = dates(5);
        let series = vec![NamedSeries::new("P/E", wave(5))];
        assert!(matches!(
            render_time_series(&d, &series, Some((-1.0, 0))),
            Err(ChartError::Valuation(ValuationError::InvalidSigma(_)))
        ));
    }

    #[test]
    fn test_save_svg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("charts").join("pe.svg");
        save_svg(&path, "<svg></svg>").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<svg></svg>");
    }

    #[test]
    fn test_extent_widens_flat_ranges() {
        assert_eq!(extent([5.0, 5.0]), Some((4.5, 5.5)));
        assert_eq!(extent([0.0]), Some((-1.0, 1.0)));
        assert_eq!(extent(std::iter::empty()), None);
        assert_eq!(extent([f64::NAN]), None);
    }
}
