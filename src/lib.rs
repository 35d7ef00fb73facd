//! Charts the day's biggest movers.
//!
//! - `find_movers` scrapes the listing into symbol → percent change.
//! - `top_k` keeps the largest changes in a bounded heap.
//! - `intraday` fetches minute bars from the market-data provider.
//! - `series` turns bars into the close series plus latest open/close.
//! - `chart` calibrates axes and draws the SVG chart.
//! - `summary` zips the per-symbol prices into the summary document.
//! - `pipeline` runs all of the above per symbol with bounded concurrency.
//! - `movers_table` prints the run's results to the console.
pub mod chart;
pub mod error;
pub mod find_movers;
pub mod intraday;
pub mod logging;
pub mod movers_table;
pub mod pipeline;
pub mod series;
pub mod storage_utils;
pub mod summary;
pub mod top_k;

pub use error::MoversError;
