//! Error type shared by the selection, normalization, rendering and fetch steps.
//!
//! The binary's step functions wrap these in `anyhow` the same way they wrap
//! I/O and HTTP failures, so every variant here stays specific enough to be
//! logged per symbol.
use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MoversError {
    /// A reduction (open, close, min, max) was asked of an empty sequence.
    #[error("empty input: {0}")]
    EmptyInput(&'static str),

    /// The caller demanded a full selection but the listing was too short.
    #[error("not enough movers: required {required}, found {available}")]
    NotEnoughMovers { required: usize, available: usize },

    /// Parallel summary columns did not line up.
    #[error("length mismatch: {symbols} symbols, {opens} opens, {closes} closes")]
    LengthMismatch {
        symbols: usize,
        opens: usize,
        closes: usize,
    },

    /// A provider price could not be read as a number.
    #[error("invalid price {value:?} at {timestamp}")]
    InvalidPrice { timestamp: String, value: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The market-data provider answered without a usable series.
    #[error("provider error for {symbol}: {message}")]
    Provider { symbol: String, message: String },

    /// The drawing backend failed (bad path, unwritable file, ...).
    #[error("render error: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = MoversError> = std::result::Result<T, E>;
