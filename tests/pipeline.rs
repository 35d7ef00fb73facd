use mockito::{Matcher, Mock, ServerGuard};
use movers_charts::MoversError;
use movers_charts::pipeline::run_pipeline;
use movers_charts::storage_utils::{AppConfig, AsyncStorageManager};
use movers_charts::summary::StockSummary;
use serde_json::json;

const LISTING: &str = r#"
<tr class="simpTblRow"><td aria-label="Symbol"><a>AAA</a></td><td aria-label="% Change">+5.00%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol"><a>BBB</a></td><td aria-label="% Change">+3.00%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol"><a>CCC</a></td><td aria-label="% Change">+1.00%</td></tr>
<tr class="simpTblRow"><td aria-label="Symbol"><a>DDD</a></td><td aria-label="% Change">-2.00%</td></tr>
"#;

fn series_body(latest_open: &str, latest_close: &str) -> String {
    json!({
        "Meta Data": {"2. Symbol": "X"},
        "Time Series (1min)": {
            "2024-01-05 15:59:00": {
                "1. open": latest_open, "2. high": "12.0000", "3. low": "9.0000",
                "4. close": latest_close, "5. volume": "1500"
            },
            "2024-01-05 15:58:00": {
                "1. open": "9.9000", "2. high": "10.4000", "3. low": "9.8000",
                "4. close": "10.2000", "5. volume": "900"
            },
            "2024-01-05 15:57:00": {
                "1. open": "9.5000", "2. high": "10.0000", "3. low": "9.4000",
                "4. close": "9.9000", "5. volume": "700"
            }
        }
    })
    .to_string()
}

async fn mock_symbol(server: &mut ServerGuard, symbol: &str, body: String) -> Mock {
    server
        .mock("GET", "/query")
        .match_query(Matcher::UrlEncoded("symbol".into(), symbol.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

async fn setup(server: &mut ServerGuard, listing: &str) -> AppConfig {
    server
        .mock("GET", "/screener")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(listing)
        .create_async()
        .await;

    let mut config = AppConfig::default();
    config.listing.url = format!("{}/screener", server.url());
    config.listing.pages = 1;
    config.market_data.base_url = format!("{}/query", server.url());
    config.selection.count = 3;
    config.pipeline.concurrency = 2;
    config
}

#[tokio::test]
async fn failed_symbol_is_skipped_and_summary_keeps_selection_order() {
    let mut server = mockito::Server::new_async().await;
    let config = setup(&mut server, LISTING).await;
    mock_symbol(&mut server, "AAA", series_body("10.5000", "11.0000")).await;
    mock_symbol(&mut server, "BBB", series_body("20.0000", "19.5000")).await;
    mock_symbol(
        &mut server,
        "CCC",
        json!({"Error Message": "Invalid API call."}).to_string(),
    )
    .await;
    let untouched = server
        .mock("GET", "/query")
        .match_query(Matcher::UrlEncoded("symbol".into(), "DDD".into()))
        .with_status(200)
        .with_body(series_body("1", "1"))
        .expect(0)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

    let outcome = run_pipeline(&config, &storage, "demo").await.unwrap();

    let charted: Vec<(usize, &str)> = outcome
        .reports
        .iter()
        .map(|r| (r.rank, r.symbol.as_str()))
        .collect();
    assert_eq!(charted, vec![(1, "AAA"), (2, "BBB")]);

    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.skipped[0].0, "CCC");
    assert!(matches!(outcome.skipped[0].1, MoversError::Provider { .. }));

    let written: Vec<StockSummary> = storage.load("summary").await.unwrap();
    assert_eq!(written, outcome.summary);
    assert_eq!(
        serde_json::to_value(&written).unwrap(),
        json!([
            {"name": "AAA", "open_price": "10.5000", "closed_price": "11.0000"},
            {"name": "BBB", "open_price": "20.0000", "closed_price": "19.5000"}
        ])
    );

    let charts = dir.path().join("charts");
    assert!(charts.join("AAA.svg").exists());
    assert!(charts.join("BBB.svg").exists());
    assert!(!charts.join("CCC.svg").exists());
    untouched.assert_async().await;
}

#[tokio::test]
async fn failed_symbol_aborts_run_when_skipping_is_disabled() {
    let mut server = mockito::Server::new_async().await;
    let mut config = setup(&mut server, LISTING).await;
    config.pipeline.skip_failed_symbols = false;
    mock_symbol(&mut server, "AAA", series_body("10.5000", "11.0000")).await;
    mock_symbol(&mut server, "BBB", json!({"Note": "slow down"}).to_string()).await;
    mock_symbol(&mut server, "CCC", series_body("5", "6")).await;

    let dir = tempfile::tempdir().unwrap();
    let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

    let err = run_pipeline(&config, &storage, "demo").await.unwrap_err();

    assert!(format!("{err:#}").contains("BBB"));
    assert!(!storage.path_of("summary").exists());
}

#[tokio::test]
async fn full_selection_requirement_rejects_short_listing() {
    let mut server = mockito::Server::new_async().await;
    let mut config = setup(&mut server, LISTING).await;
    config.selection.count = 5;
    config.selection.require_full_selection = true;

    let dir = tempfile::tempdir().unwrap();
    let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

    let err = run_pipeline(&config, &storage, "demo").await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<MoversError>(),
        Some(MoversError::NotEnoughMovers {
            required: 5,
            available: 4
        })
    ));
}

#[tokio::test]
async fn empty_listing_writes_empty_summary() {
    let mut server = mockito::Server::new_async().await;
    let config = setup(&mut server, "<table></table>").await;

    let dir = tempfile::tempdir().unwrap();
    let storage = AsyncStorageManager::new(dir.path()).await.unwrap();

    let outcome = run_pipeline(&config, &storage, "demo").await.unwrap();

    assert!(outcome.reports.is_empty());
    let written: Vec<StockSummary> = storage.load("summary").await.unwrap();
    assert!(written.is_empty());
}
