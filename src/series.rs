//! Turns a provider bar map into the close-price series the chart draws and the
//! two prices the summary reports.
//!
//! "Open" here is the `open` of the most recent bar, not the session's opening
//! print. That is what the summary has always reported; callers wanting the
//! day's open would need the oldest bar of the session instead.
use crate::error::{MoversError, Result};
use crate::intraday::{BarSeries, Price};

/// One close observation, in the same order as the bars it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPoint {
    pub timestamp: String,
    pub close: Price,
}

#[derive(Debug, Clone, Default)]
pub struct NormalizedSeries {
    /// Newest first.
    pub points: Vec<SeriesPoint>,
    latest_open: Option<Price>,
}

impl NormalizedSeries {
    pub fn latest_open(&self) -> Result<&Price> {
        self.latest_open
            .as_ref()
            .ok_or(MoversError::EmptyInput("no bars to take an open price from"))
    }

    pub fn latest_close(&self) -> Result<&Price> {
        self.points
            .first()
            .map(|point| &point.close)
            .ok_or(MoversError::EmptyInput("no bars to take a close price from"))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

pub fn normalize(bars: &BarSeries) -> NormalizedSeries {
    let latest_open = bars.values().next().map(|bar| bar.open.clone());

    let points = bars
        .iter()
        .map(|(timestamp, bar)| SeriesPoint {
            timestamp: timestamp.clone(),
            close: bar.close.clone(),
        })
        .collect();

    NormalizedSeries {
        points,
        latest_open,
    }
}
