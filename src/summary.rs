use serde::{Deserialize, Serialize};

use crate::error::{MoversError, Result};

/// One entry of the summary document. Prices keep the provider's text.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StockSummary {
    pub name: String,
    pub open_price: String,
    pub closed_price: String,
}

/// Zips the three columns position by position, keeping selection order.
pub fn assemble<S, O, C>(symbols: &[S], opens: &[O], closes: &[C]) -> Result<Vec<StockSummary>>
where
    S: AsRef<str>,
    O: ToString,
    C: ToString,
{
    if symbols.len() != opens.len() || symbols.len() != closes.len() {
        return Err(MoversError::LengthMismatch {
            symbols: symbols.len(),
            opens: opens.len(),
            closes: closes.len(),
        });
    }

    Ok(symbols
        .iter()
        .zip(opens)
        .zip(closes)
        .map(|((name, open), close)| StockSummary {
            name: name.as_ref().to_string(),
            open_price: open.to_string(),
            closed_price: close.to_string(),
        })
        .collect())
}
