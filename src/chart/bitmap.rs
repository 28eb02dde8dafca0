use super::{ChartError, ChartRenderer, Result};
use crate::analysis::occupancy::OccupancyTrendChart;
use crate::analysis::relative_rent::RelativeRentChart;
use crate::analysis::MarketSeries;
use crate::analysis::utilization::{SegmentKind, UtilizationChart};
use crate::types::YearQuarter;
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::fs;
use std::path::Path;
use tracing::info;

type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

const BAR_HALF_WIDTH: f64 = 0.4;

const USED: RGBColor = RGBColor(0x80, 0x80, 0x80);
const UNDERUTILIZED: RGBColor = RGBColor(0xD3, 0xD3, 0xD3);
const DIRECT_SPACE: RGBColor = RGBColor(0xAD, 0xD8, 0xE6);
const SUBLET_SPACE: RGBColor = RGBColor(0xFF, 0xCC, 0xCB);
const DIRECT_RENT: RGBColor = RGBColor(0x00, 0x00, 0x8B);
const SUBLET_RENT: RGBColor = RGBColor(0x8B, 0x00, 0x00);

const DARK_BG: RGBColor = RGBColor(0x1C, 0x1C, 0x1E);
const NATIONAL: RGBColor = RGBColor(0xF8, 0xF8, 0xF2);
const MUTED: RGBColor = RGBColor(0x66, 0x66, 0x66);
const EVENT: RGBColor = RGBColor(0xFF, 0x55, 0x55);
const HIGHLIGHTS: [RGBColor; 5] = [
    RGBColor(0xFF, 0x55, 0x55),
    RGBColor(0x50, 0xFA, 0x7B),
    RGBColor(0x8B, 0xE9, 0xFD),
    RGBColor(0xFF, 0x79, 0xC6),
    RGBColor(0xBD, 0x93, 0xF9),
];

/// Renders PNG files through the plotters bitmap backend.
#[derive(Debug, Clone, Copy)]
pub struct BitmapRenderer {
    width: u32,
    height: u32,
}

impl BitmapRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn prepare_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn drawing_error(err: Box<dyn std::error::Error>) -> ChartError {
    ChartError::Drawing(err.to_string())
}

impl ChartRenderer for BitmapRenderer {
    fn render_utilization(&self, chart: &UtilizationChart, path: &Path) -> Result<()> {
        prepare_parent(path)?;
        draw_utilization(chart, path, self.size()).map_err(drawing_error)?;
        info!(path = %path.display(), "wrote utilization chart");
        Ok(())
    }

    fn render_relative_rent(&self, chart: &RelativeRentChart, path: &Path) -> Result<()> {
        prepare_parent(path)?;
        draw_relative_rent(chart, path, self.size()).map_err(drawing_error)?;
        info!(path = %path.display(), "wrote relative rent chart");
        Ok(())
    }

    fn render_occupancy_trend(&self, chart: &OccupancyTrendChart, path: &Path) -> Result<()> {
        prepare_parent(path)?;
        draw_occupancy_trend(chart, path, self.size()).map_err(drawing_error)?;
        info!(path = %path.display(), "wrote occupancy trend chart");
        Ok(())
    }
}

fn segment_color(kind: SegmentKind) -> RGBColor {
    match kind {
        SegmentKind::Used | SegmentKind::AdjustedUsed => USED,
        SegmentKind::Underutilized => UNDERUTILIZED,
        SegmentKind::Direct => DIRECT_SPACE,
        SegmentKind::Sublet => SUBLET_SPACE,
    }
}

/// Upper axis bound with some headroom; never zero.
fn axis_upper(max: f64) -> f64 {
    if max.is_finite() && max > 0.0 {
        max * 1.1
    } else {
        1.0
    }
}

fn index_range(n: usize) -> std::ops::Range<f64> {
    -0.5..(n.max(1) as f64 - 0.5)
}

/// Tick label for an x position; blank between categories.
fn label_at(labels: &[String], x: f64) -> String {
    let idx = x.round();
    if idx < 0.0 || (x - idx).abs() > 1e-6 {
        return String::new();
    }
    labels.get(idx as usize).cloned().unwrap_or_default()
}

/// Splits a series with gaps into runs of consecutive present values.
fn present_runs(values: &[Option<f64>]) -> Vec<Vec<(f64, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (i, value) in values.iter().enumerate() {
        match value.filter(|v| v.is_finite()) {
            Some(v) => current.push((i as f64, v)),
            None if !current.is_empty() => runs.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn draw_utilization(chart: &UtilizationChart, path: &Path, size: (u32, u32)) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let n = chart.len();
    let labels = chart.period_labels();
    let space_max = axis_upper(chart.max_stack());
    let rent_max = axis_upper(chart.max_rent());

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(100)
        .y_label_area_size(80)
        .right_y_label_area_size(80)
        .build_cartesian_2d(index_range(n), 0f64..space_max)?
        .set_secondary_coord(index_range(n), 0f64..rent_max);

    let x_formatter = |x: &f64| label_at(&labels, *x);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&x_formatter)
        .x_label_style(("sans-serif", 14).into_font().transform(FontTransform::Rotate90))
        .y_label_formatter(&|y: &f64| format!("{:.2}", y))
        .x_desc("Year-Quarter")
        .y_desc("Space (Million Square Feet)")
        .draw()?;

    ctx.configure_secondary_axes()
        .y_desc("Rent ($ per Square Foot)")
        .y_label_formatter(&|y: &f64| format!("${:.2}", y))
        .draw()?;

    let bases = chart.segment_bases();
    for (segment, base) in chart.segments.iter().zip(&bases) {
        let color = segment_color(segment.kind);
        ctx.draw_series((0..n).map(|i| {
            let x = i as f64;
            Rectangle::new(
                [
                    (x - BAR_HALF_WIDTH, base[i]),
                    (x + BAR_HALF_WIDTH, base[i] + segment.values[i]),
                ],
                color.filled(),
            )
        }))?
        .label(segment.kind.label())
        .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 14, y + 6)], color.filled()));
    }

    for (segment, base) in chart.segments.iter().zip(&bases) {
        let text_color = match segment.kind {
            SegmentKind::Underutilized => BLACK,
            _ => WHITE,
        };
        let style = ("sans-serif", 13)
            .into_font()
            .style(FontStyle::Bold)
            .color(&text_color)
            .pos(Pos::new(HPos::Center, VPos::Center));
        ctx.draw_series(
            (0..n)
                .filter(|&i| segment.values[i] > 0.0)
                .map(|i| {
                    Text::new(
                        format!("{:.1}%", segment.percentages[i]),
                        (i as f64, base[i] + segment.values[i] / 2.0),
                        style.clone(),
                    )
                }),
        )?;
    }

    let direct_runs = present_runs(&chart.direct_rent_adjusted);
    for run in &direct_runs {
        ctx.draw_secondary_series(LineSeries::new(run.clone(), DIRECT_RENT.stroke_width(2)))?;
    }
    ctx.draw_secondary_series(
        direct_runs
            .iter()
            .flatten()
            .map(|&point| Circle::new(point, 5, DIRECT_RENT.filled())),
    )?
    .label("Direct Rent Price (Inflation Adj.)")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], DIRECT_RENT.stroke_width(2)));

    let sublet_runs = present_runs(&chart.sublet_rent_adjusted);
    for run in &sublet_runs {
        ctx.draw_secondary_series(DashedLineSeries::new(
            run.clone(),
            10,
            6,
            SUBLET_RENT.stroke_width(2),
        ))?;
    }
    ctx.draw_secondary_series(sublet_runs.iter().flatten().map(|&point| {
        EmptyElement::at(point) + Rectangle::new([(-4, -4), (4, 4)], SUBLET_RENT.filled())
    }))?
    .label("Sublet Rent Price (Inflation Adj.)")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], SUBLET_RENT.stroke_width(2)));

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .label_font(("sans-serif", 14))
        .draw()?;

    root.present()?;
    Ok(())
}

fn dashed_label(period: &YearQuarter) -> String {
    format!("{}-Q{}", period.year, period.quarter)
}

/// Highlighted markets that have data, each coloured by its slot in the
/// highlight list so a missing market does not shift the others.
fn highlighted_series(chart: &RelativeRentChart) -> Vec<(&MarketSeries, RGBColor)> {
    chart
        .highlighted
        .iter()
        .enumerate()
        .filter_map(|(i, market)| {
            let series = chart.series.iter().find(|s| &s.market == market)?;
            Some((series, HIGHLIGHTS[i % HIGHLIGHTS.len()]))
        })
        .collect()
}

fn draw_relative_rent(chart: &RelativeRentChart, path: &Path, size: (u32, u32)) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&DARK_BG)?;

    let n = chart.periods.len();
    let labels: Vec<String> = chart.periods.iter().map(dashed_label).collect();
    let y_max = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .filter(|v| v.is_finite())
        .fold(1.0, f64::max);
    let y_max = axis_upper(y_max);
    let x_range = index_range(n);

    let mut ctx = ChartBuilder::on(&root)
        .caption(
            &chart.title,
            ("sans-serif", 30).into_font().color(&WHITE),
        )
        .margin(20)
        .x_label_area_size(100)
        .y_label_area_size(80)
        .build_cartesian_2d(x_range.clone(), 0f64..y_max)?;

    let x_formatter = |x: &f64| label_at(&labels, *x);
    ctx.configure_mesh()
        .disable_x_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&x_formatter)
        .x_label_style(
            ("sans-serif", 14)
                .into_font()
                .transform(FontTransform::Rotate90)
                .color(&WHITE),
        )
        .y_label_style(("sans-serif", 14).into_font().color(&WHITE))
        .axis_style(&WHITE)
        .bold_line_style(&MUTED.mix(0.3))
        .light_line_style(&DARK_BG)
        .x_desc("Year-Quarter")
        .y_desc(&chart.y_label)
        .axis_desc_style(("sans-serif", 16).into_font().color(&WHITE))
        .draw()?;

    ctx.draw_series(LineSeries::new(
        vec![(x_range.start, 1.0), (x_range.end, 1.0)],
        NATIONAL.stroke_width(3),
    ))?
    .label("National Average")
    .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], NATIONAL.stroke_width(3)));

    let positioned = |points: &[(YearQuarter, f64)]| -> Vec<(f64, f64)> {
        points
            .iter()
            .filter_map(|(period, value)| Some((chart.period_position(period)? as f64, *value)))
            .collect()
    };

    // Muted markets first so highlighted lines sit on top
    for series in chart
        .series
        .iter()
        .filter(|s| !chart.highlighted.contains(&s.market))
    {
        ctx.draw_series(LineSeries::new(positioned(series.points.as_slice()), MUTED.mix(0.3)))?;
    }

    for (series, color) in highlighted_series(chart) {
        ctx.draw_series(LineSeries::new(
            positioned(series.points.as_slice()),
            color.stroke_width(2),
        ))?
        .label(series.market.as_str())
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    if let Some(event) = &chart.event_marker {
        if let Some(pos) = chart.period_position(&event.period) {
            let x = pos as f64;
            ctx.draw_series(DashedLineSeries::new(
                vec![(x, 0.0), (x, y_max)],
                8,
                6,
                EVENT.mix(0.7).stroke_width(2),
            ))?
            .label(format!("{} ({})", event.label, event.period))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], EVENT.stroke_width(2)));
        }
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&DARK_BG)
        .border_style(&MUTED)
        .label_font(("sans-serif", 14).into_font().color(&WHITE))
        .draw()?;

    root.present()?;
    Ok(())
}

fn draw_occupancy_trend(chart: &OccupancyTrendChart, path: &Path, size: (u32, u32)) -> DrawResult {
    let root = BitMapBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;

    let n = chart.periods.len();
    let labels: Vec<String> = chart.periods.iter().map(|p| p.to_string()).collect();
    let values = chart
        .series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, v)| *v))
        .filter(|v| v.is_finite());
    let (low, high) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    let (low, high) = if low.is_finite() && high.is_finite() {
        let pad = ((high - low) * 0.1).max(1.0);
        ((low - pad).max(0.0), high + pad)
    } else {
        (0.0, 100.0)
    };

    let mut ctx = ChartBuilder::on(&root)
        .caption(&chart.title, ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(100)
        .y_label_area_size(80)
        .build_cartesian_2d(index_range(n), low..high)?;

    let x_formatter = |x: &f64| label_at(&labels, *x);
    ctx.configure_mesh()
        .x_labels(n.max(1))
        .x_label_formatter(&x_formatter)
        .x_label_style(("sans-serif", 14).into_font().transform(FontTransform::Rotate90))
        .y_label_formatter(&|y: &f64| format!("{:.0}", y))
        .x_desc("Time Period")
        .y_desc("Occupancy Percentage (%)")
        .draw()?;

    for (i, series) in chart.series.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let points: Vec<(f64, f64)> = series
            .points
            .iter()
            .filter_map(|(period, value)| {
                let pos = chart.periods.binary_search(period).ok()?;
                Some((pos as f64, *value))
            })
            .collect();

        ctx.draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(series.market.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        ctx.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.85))
        .border_style(&BLACK)
        .label_font(("sans-serif", 13))
        .draw()?;

    root.present()?;
    Ok(())
}
