use plotters::coord::ranged1d::{DefaultFormatting, KeyPointHint, Ranged};
use plotters::prelude::*;
use plotters::style::FontStyle;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::ops::Range;
use std::path::Path;

use crate::error::{MoversError, Result};
use crate::series::SeriesPoint;
use crate::storage_utils::ChartConfig;

const FONT_FAMILY: &str = "sans-serif";
const AXIS_TITLE_SIZE: f64 = 35.0;
const TICK_LABEL_SIZE: f64 = 25.0;
/// plotters-svg writes `font-size` as the requested size divided by this.
const SVG_FONT_SCALE: f64 = 1.24;
const LINE_WIDTH: u32 = 2;
const X_AXIS_TITLE: &str = "Time";
const Y_AXIS_TITLE: &str = "Price ($)";

/// Line and fill colours for one chart slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    DarkRed,
    DarkOrange,
    LimeGreen,
    RoyalBlue,
    DarkViolet,
}

impl Theme {
    pub const ALL: [Theme; 5] = [
        Theme::DarkRed,
        Theme::DarkOrange,
        Theme::LimeGreen,
        Theme::RoyalBlue,
        Theme::DarkViolet,
    ];

    /// Any slot is valid; slots past the last theme wrap around.
    pub fn for_slot(slot: usize) -> Self {
        Self::ALL[slot % Self::ALL.len()]
    }

    pub fn line(self) -> RGBColor {
        match self {
            Theme::DarkRed => RGBColor(139, 0, 0),
            Theme::DarkOrange => RGBColor(255, 140, 0),
            Theme::LimeGreen => RGBColor(50, 205, 50),
            Theme::RoyalBlue => RGBColor(65, 105, 225),
            Theme::DarkViolet => RGBColor(148, 0, 211),
        }
    }

    pub fn fill(self) -> RGBColor {
        match self {
            Theme::DarkRed => RGBColor(255, 228, 225),
            Theme::DarkOrange => RGBColor(255, 222, 173),
            Theme::LimeGreen => RGBColor(240, 255, 240),
            Theme::RoyalBlue => RGBColor(175, 238, 238),
            Theme::DarkViolet => RGBColor(230, 230, 250),
        }
    }
}

/// Padding added above the highest and below the lowest plotted price.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum AxisMargin {
    /// Fixed amount in price units. Coarse for very cheap or very expensive stocks.
    Absolute(f64),
    /// Fraction of the largest absolute price on the chart.
    Proportional(f64),
}

impl Default for AxisMargin {
    fn default() -> Self {
        AxisMargin::Absolute(3.0)
    }
}

impl AxisMargin {
    pub fn apply(self, min: f64, max: f64) -> (f64, f64) {
        let pad = match self {
            AxisMargin::Absolute(amount) => amount,
            AxisMargin::Proportional(fraction) => fraction * min.abs().max(max.abs()),
        };
        let (lo, hi) = (min - pad, max + pad);
        if hi > lo { (lo, hi) } else { (lo - 1.0, hi + 1.0) }
    }
}

/// Drops the year and the seconds: `2024-01-05 19:59:00` becomes `01-05 19:59`.
pub fn axis_label(timestamp: &str) -> String {
    let label: String = timestamp.chars().skip(5).take(11).collect();
    if label.is_empty() {
        timestamp.to_string()
    } else {
        label
    }
}

/// Tick indices for `len` points: every `len / divisions` points, plus the
/// last index even when it falls between two regular ticks.
pub fn x_ticks(len: usize, divisions: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let spacing = (len / divisions.max(1)).max(1);
    let last = len - 1;
    let mut ticks: Vec<usize> = (0..len).step_by(spacing).collect();
    if ticks.last() != Some(&last) {
        ticks.push(last);
    }
    ticks
}

/// Everything needed to draw one chart, computed without touching a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPlan {
    /// Oldest first.
    pub labels: Vec<String>,
    /// Oldest first, aligned with `labels`.
    pub prices: Vec<f64>,
    pub x_ticks: Vec<usize>,
    pub y_range: (f64, f64),
}

impl ChartPlan {
    /// `points` must be newest first, as the provider returns them.
    pub fn build(points: &[SeriesPoint], config: &ChartConfig) -> Result<Self> {
        let kept = &points[..points.len().min(config.max_points)];
        if kept.is_empty() {
            return Err(MoversError::EmptyInput("no points to chart"));
        }

        let mut labels = Vec::with_capacity(kept.len());
        let mut prices = Vec::with_capacity(kept.len());
        for point in kept.iter().rev() {
            let price = point.close.as_f64().ok_or_else(|| MoversError::InvalidPrice {
                timestamp: point.timestamp.clone(),
                value: point.close.to_string(),
            })?;
            labels.push(axis_label(&point.timestamp));
            prices.push(price);
        }

        let min = prices.iter().copied().fold(f64::INFINITY, f64::min);
        let max = prices.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Ok(Self {
            x_ticks: x_ticks(prices.len(), config.tick_divisions),
            y_range: config.margin.apply(min, max),
            labels,
            prices,
        })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// From the first point to the last, unpadded. A single point gets a unit-wide axis.
    pub fn x_range(&self) -> (f64, f64) {
        let last = self.len().saturating_sub(1) as f64;
        if last > 0.0 { (0.0, last) } else { (0.0, 1.0) }
    }

    pub fn label_at(&self, x: f64) -> String {
        let index = x.round();
        if index < 0.0 {
            return String::new();
        }
        self.labels.get(index as usize).cloned().unwrap_or_default()
    }
}

/// Linear x axis whose grid lines and labels sit exactly on the planned ticks.
struct TickAxis {
    start: f64,
    end: f64,
    ticks: Vec<f64>,
}

impl Ranged for TickAxis {
    type FormatOption = DefaultFormatting;
    type ValueType = f64;

    fn map(&self, value: &f64, limit: (i32, i32)) -> i32 {
        let fraction = (value - self.start) / (self.end - self.start);
        limit.0 + (fraction * f64::from(limit.1 - limit.0)).round() as i32
    }

    fn key_points<Hint: KeyPointHint>(&self, _hint: Hint) -> Vec<f64> {
        self.ticks.clone()
    }

    fn range(&self) -> Range<f64> {
        self.start..self.end
    }
}

/// Size to request from the SVG backend so the file carries `size` as its `font-size`.
fn svg_font_size(size: f64) -> f64 {
    size * SVG_FONT_SCALE
}

fn render_err(err: impl Display) -> MoversError {
    MoversError::Render(err.to_string())
}

/// Draws `points` (newest first) as a filled line chart at `path`, replacing
/// any file already there.
pub fn render(points: &[SeriesPoint], path: &Path, slot: usize, config: &ChartConfig) -> Result<()> {
    let plan = ChartPlan::build(points, config)?;
    render_plan(&plan, path, Theme::for_slot(slot), config)
}

pub fn render_plan(plan: &ChartPlan, path: &Path, theme: Theme, config: &ChartConfig) -> Result<()> {
    let size = config.canvas_px();
    let (x_lo, x_hi) = plan.x_range();
    let (y_lo, y_hi) = plan.y_range;
    let x_axis = TickAxis {
        start: x_lo,
        end: x_hi,
        ticks: plan.x_ticks.iter().map(|&i| i as f64).collect(),
    };
    let label = |x: &f64| plan.label_at(*x);

    // The backend owns the output file; it is flushed by `present` and released
    // when `root` drops at the end of this scope.
    let root = SVGBackend::new(path, (size, size)).into_drawing_area();
    root.fill(&WHITE).map_err(render_err)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(40)
        .x_label_area_size(140)
        .y_label_area_size(200)
        .build_cartesian_2d(x_axis, y_lo..y_hi)
        .map_err(render_err)?;

    chart
        .configure_mesh()
        .x_desc(X_AXIS_TITLE)
        .y_desc(Y_AXIS_TITLE)
        .axis_desc_style(
            (FONT_FAMILY, svg_font_size(AXIS_TITLE_SIZE))
                .into_font()
                .style(FontStyle::Bold),
        )
        .label_style((FONT_FAMILY, svg_font_size(TICK_LABEL_SIZE)))
        .x_label_formatter(&label)
        .draw()
        .map_err(render_err)?;

    chart
        .draw_series(
            AreaSeries::new(
                plan.prices.iter().enumerate().map(|(i, price)| (i as f64, *price)),
                y_lo,
                theme.fill().filled(),
            )
            .border_style(theme.line().stroke_width(LINE_WIDTH)),
        )
        .map_err(render_err)?;

    root.present().map_err(render_err)?;
    Ok(())
}
