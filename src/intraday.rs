use indexmap::IndexMap;
use reqwest::Client;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::error::{MoversError, Result};
use crate::storage_utils::MarketDataConfig;

/// Keys the provider uses instead of a series when it refuses a request.
const PROVIDER_MESSAGE_KEYS: &[&str] = &["Error Message", "Note", "Information"];

// --- Data Structures & Custom Deserialization ---

/// A price exactly as the provider sent it. Parsing waits until a number is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Price(String);

impl Price {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `None` for blank, malformed or non-finite values.
    pub fn as_f64(&self) -> Option<f64> {
        self.0.trim().parse::<f64>().ok().filter(|v| v.is_finite())
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

struct PriceVisitor;

impl<'de> Visitor<'de> for PriceVisitor {
    type Value = Price;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a price as a string or a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Price(v.to_string()))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Price(v.to_string()))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Price(v.to_string()))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Price(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(PriceVisitor)
    }
}

struct LenientF64Visitor;

impl<'de> Visitor<'de> for LenientF64Visitor {
    type Value = Option<f64>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a float, an integer, or a string representing a number")
    }

    fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E> {
        Ok(Some(v))
    }

    fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
        Ok(Some(v as f64))
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        if v.trim().is_empty() {
            Ok(None)
        } else {
            v.trim().parse::<f64>().map(Some).map_err(E::custom)
        }
    }

    fn visit_unit<E>(self) -> Result<Self::Value, E> {
        Ok(None)
    }
}

fn deserialize_f64_lenient<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    deserializer.deserialize_any(LenientF64Visitor)
}

/// One minute bar. The timestamp is the key of the enclosing series map.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Bar {
    #[serde(rename = "1. open")]
    pub open: Price,
    #[serde(rename = "2. high")]
    pub high: Price,
    #[serde(rename = "3. low")]
    pub low: Price,
    #[serde(rename = "4. close")]
    pub close: Price,
    #[serde(rename = "5. volume", default, deserialize_with = "deserialize_f64_lenient")]
    pub volume: Option<f64>,
}

/// Timestamp → bar, newest first, exactly as the provider listed them.
pub type BarSeries = IndexMap<String, Bar>;

// --- Response Parsing ---

/// Pulls the `Time Series ({interval})` object out of a provider response.
///
/// Provider notices (bad symbol, throttling, invalid key) come back with a
/// 200 status, so they are turned into [`MoversError::Provider`] here.
pub fn parse_intraday(symbol: &str, interval: &str, mut body: Map<String, Value>) -> Result<BarSeries> {
    let series_key = format!("Time Series ({})", interval);

    if let Some(series) = body.remove(&series_key) {
        let bars: BarSeries = serde_json::from_value(series)?;
        return Ok(bars);
    }

    let message = PROVIDER_MESSAGE_KEYS
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .map(String::from)
        .unwrap_or_else(|| format!("response has no \"{}\" object", series_key));

    Err(MoversError::Provider {
        symbol: symbol.to_string(),
        message,
    })
}

// --- Client ---

pub struct IntradayClient {
    client: Client,
    base_url: String,
    api_key: String,
    interval: String,
    output_size: String,
}

impl IntradayClient {
    pub fn new(client: Client, config: &MarketDataConfig, api_key: impl Into<String>) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: api_key.into(),
            interval: config.interval.clone(),
            output_size: config.output_size.clone(),
        }
    }

    pub async fn fetch(&self, symbol: &str) -> Result<BarSeries> {
        let params = [
            ("function", "TIME_SERIES_INTRADAY"),
            ("symbol", symbol),
            ("interval", self.interval.as_str()),
            ("outputsize", self.output_size.as_str()),
            ("apikey", self.api_key.as_str()),
        ];

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await?
            .error_for_status()?;

        let body: Map<String, Value> = response.json().await?;
        let bars = parse_intraday(symbol, &self.interval, body)?;
        debug!(symbol, bars = bars.len(), "intraday series fetched");
        Ok(bars)
    }
}
