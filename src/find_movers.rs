use regex::Regex;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::storage_utils::ListingConfig;

static ROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<tr[^>]*class="[^"]*\bsimpTblRow\b[^"]*"[^>]*>(.*?)</tr>"#)
        .expect("row pattern is valid")
});

static CELL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<td[^>]*aria-label="([^"]*)"[^>]*>(.*?)</td>"#).expect("cell pattern is valid")
});

/// Tickers such as `ACME`, `BRK-B`, `^GSPC` or `EURUSD=X`. Symbols name chart
/// files, so nothing that could act as a path separator gets through.
static SYMBOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9^][A-Za-z0-9.=^-]*$").expect("symbol pattern is valid")
});

static TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag pattern is valid"));

/// Inner text of a cell: tags stripped, common entities decoded, trimmed.
fn cell_text(html: &str) -> String {
    TAG_RE
        .replace_all(html, "")
        .replace("&amp;", "&")
        .replace("&nbsp;", " ")
        .trim()
        .to_string()
}

/// Reads `+12.34%`, `-0.5`, `1,234.5` and the like. Non-finite values are dropped.
pub fn parse_change(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '+' | '%' | ',' | ' '))
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v + 0.0)
}

/// Collects symbol → change from one listing page.
///
/// Rows without both a ticker-shaped symbol and a parsable change cell are skipped.
pub fn parse_listing(html: &str, change_label: &str) -> HashMap<String, f64> {
    let mut changes = HashMap::new();

    for row in ROW_RE.captures_iter(html) {
        let mut symbol = None;
        let mut change = None;

        for cell in CELL_RE.captures_iter(&row[1]) {
            let label = &cell[1];
            if label == "Symbol" {
                symbol = Some(cell_text(&cell[2]));
            } else if label == change_label {
                change = parse_change(&cell_text(&cell[2]));
            }
        }

        match (symbol, change) {
            (Some(symbol), Some(change)) if SYMBOL_RE.is_match(&symbol) => {
                changes.insert(symbol, change);
            }
            (symbol, _) => debug!(?symbol, "skipping listing row without a usable change"),
        }
    }

    changes
}

/// Walks every listing page and merges the rows. Later pages win on duplicate symbols.
pub async fn fetch_movers(client: &Client, config: &ListingConfig) -> Result<HashMap<String, f64>> {
    let mut changes = HashMap::new();

    for page in 0..config.pages {
        let offset = page * config.page_size;

        let html = client
            .get(&config.url)
            .query(&[("offset", offset), ("count", config.page_size)])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let rows = parse_listing(&html, &config.change_label);
        if rows.is_empty() {
            warn!(page, offset, "listing page had no rows");
        }
        changes.extend(rows);
    }

    info!(symbols = changes.len(), pages = config.pages, "listing scraped");
    Ok(changes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<table><tbody>
<tr class="simpTblRow Bgc($hoverBgColor):h BdB Bdbc($seperatorColor)">
  <td aria-label="Symbol" class="Va(m)"><a href="/quote/ACME" title="Acme Corp">ACME</a></td>
  <td aria-label="Name">Acme Corp</td>
  <td aria-label="Change"><span>+1.20</span></td>
  <td aria-label="% Change"><span class="C($positiveColor)">+12.34%</span></td>
</tr>
<tr class="simpTblRow">
  <td aria-label="Symbol"><a href="/quote/BOLT">BOLT</a></td>
  <td aria-label="% Change"><span>-1,234.50%</span></td>
</tr>
<tr class="simpTblRow">
  <td aria-label="Symbol"><a href="/quote/NADA">NADA</a></td>
  <td aria-label="% Change"><span>N/A</span></td>
</tr>
<tr class="header"><td aria-label="Symbol">HEAD</td><td aria-label="% Change">9%</td></tr>
</tbody></table>"#;

    #[test]
    fn parses_change_text() {
        assert_eq!(parse_change("+12.34%"), Some(12.34));
        assert_eq!(parse_change("-1,234.50%"), Some(-1234.5));
        assert_eq!(parse_change("N/A"), None);
        assert_eq!(parse_change("inf"), None);
        assert!(parse_change("-0.00%").unwrap().is_sign_positive());
    }

    #[test]
    fn reads_symbol_and_percent_change_cells() {
        let changes = parse_listing(PAGE, "% Change");

        assert_eq!(changes.len(), 2);
        assert_eq!(changes["ACME"], 12.34);
        assert_eq!(changes["BOLT"], -1234.5);
        assert!(!changes.contains_key("NADA"));
        assert!(!changes.contains_key("HEAD"));
    }

    #[test]
    fn rows_with_path_like_symbols_are_dropped() {
        let html = r#"
<tr class="simpTblRow"><td aria-label="Symbol">../../x</td><td aria-label="% Change">+50%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol">AB/CD</td><td aria-label="% Change">+40%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol"></td><td aria-label="% Change">+30%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol">BRK-B</td><td aria-label="% Change">+2%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol">^GSPC</td><td aria-label="% Change">+1%</td></tr>"#;

        let changes = parse_listing(html, "% Change");

        let mut symbols: Vec<&str> = changes.keys().map(String::as_str).collect();
        symbols.sort();
        assert_eq!(symbols, vec!["BRK-B", "^GSPC"]);
    }

    #[test]
    fn change_column_is_configurable() {
        let changes = parse_listing(PAGE, "Change");
        assert_eq!(changes["ACME"], 1.2);
    }

    #[tokio::test]
    async fn fetches_every_page_with_offsets() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/screener")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("offset".into(), "0".into()),
                mockito::Matcher::UrlEncoded("count".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(PAGE)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/screener")
            .match_query(mockito::Matcher::UrlEncoded("offset".into(), "2".into()))
            .with_status(200)
            .with_body(
                r#"<tr class="simpTblRow"><td aria-label="Symbol">ACME</td><td aria-label="% Change">20%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol">ZED</td><td aria-label="% Change">0.5%</td></tr>"#,
            )
            .create_async()
            .await;

        let config = ListingConfig {
            url: format!("{}/screener", server.url()),
            pages: 2,
            page_size: 2,
            ..ListingConfig::default()
        };
        let changes = fetch_movers(&Client::new(), &config).await.unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(changes.len(), 3);
        assert_eq!(changes["ACME"], 20.0);
        assert_eq!(changes["ZED"], 0.5);
    }
}
