//! Query surface served over a real socket.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use rust_decimal::Decimal;
use tokio::net::TcpListener;

use price_oracle::config::PriceSourceConfig;
use price_oracle::engine::{EngineParts, OracleEngine, QueryFacade};
use price_oracle::feeds::{unix_now, BinanceSource};
use price_oracle::http::response::{SignedPriceResponse, StatusResponse};
use price_oracle::http::HttpServer;
use price_oracle::oracle::{AssetPair, PriceObservation};
use price_oracle::Shutdown;

mod common;
use common::{RecordingSubmitter, StubConnector, StubNode};

struct TestOracle {
    base: String,
    engine: Arc<OracleEngine>,
    node: Arc<StubNode>,
    submitter: Arc<RecordingSubmitter>,
    shutdown: Shutdown,
}

impl TestOracle {
    async fn stop(self) {
        self.shutdown.trigger();
        self.engine.stop().await;
    }
}

/// Start an engine whose price source never answers, plus the HTTP surface.
async fn start_oracle() -> TestOracle {
    let config = common::test_config();
    let node = Arc::new(StubNode::new(31337));
    let submitter = Arc::new(RecordingSubmitter::default());
    let unreachable_exchange = PriceSourceConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        request_timeout_secs: 1,
    };
    let parts = EngineParts {
        connector: Arc::new(StubConnector::connected(node.clone())),
        price_source: Arc::new(BinanceSource::new(&unreachable_exchange).unwrap()),
        submitter: Some(submitter.clone()),
    };

    let http_config = config.http.clone();
    let engine = Arc::new(OracleEngine::with_parts(config, common::wallet(), parts).unwrap());
    engine.start().await.unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let server = HttpServer::new(&http_config, QueryFacade::new(engine.clone()));
    let shutdown = Shutdown::new();
    let mut signal = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, async move { signal.recv().await }).await;
    });

    TestOracle {
        base,
        engine,
        node,
        submitter,
        shutdown,
    }
}

fn record(engine: &OracleEngine, pair: &str, price: &str) -> u64 {
    let observed_at = unix_now();
    engine.prices().record(PriceObservation {
        pair: AssetPair::parse(pair).unwrap(),
        price: Decimal::from_str(price).unwrap(),
        observed_at,
    });
    observed_at
}

#[tokio::test]
async fn test_root() {
    let oracle = start_oracle().await;

    let res = reqwest::get(format!("{}/", oracle.base)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert!(res.headers().contains_key("x-request-id"));
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["message"], "Price oracle is running");

    oracle.stop().await;
}

#[tokio::test]
async fn test_price_lookup() {
    let oracle = start_oracle().await;
    let observed_at = record(&oracle.engine, "ETH/USDT", "3000.5");

    let res = reqwest::get(format!("{}/price/eth-usdt", oracle.base))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["assetPair"], "ETH/USDT");
    assert_eq!(body["price"], "3000.5");
    assert_eq!(body["timestamp"], observed_at);

    let res = reqwest::get(format!("{}/price/BTC-USDT", oracle.base))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = reqwest::get(format!("{}/price/DOGE-USDT", oracle.base))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body: serde_json::Value = res.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("DOGE-USDT"));

    oracle.stop().await;
}

#[tokio::test]
async fn test_signed_price_does_not_submit() {
    let oracle = start_oracle().await;
    let observed_at = record(&oracle.engine, "ETH/USDT", "3000.5");

    let res = reqwest::get(format!("{}/signed_price/ETH-USDT", oracle.base))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: SignedPriceResponse = res.json().await.unwrap();
    assert_eq!(body.asset_pair, "ETH/USDT");
    assert_eq!(body.price_uint256, "3000500000");
    assert_eq!(body.timestamp, observed_at);
    assert_eq!(body.chain_id, 31337);
    assert_eq!(body.signature.len(), 2 + 65 * 2);
    assert_eq!(
        body.asset_id,
        AssetPair::parse("ETH/USDT").unwrap().asset_id().to_string()
    );

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(oracle.submitter.call_count(), 0);

    oracle.stop().await;
}

#[tokio::test]
async fn test_signed_price_needs_live_node() {
    let oracle = start_oracle().await;
    record(&oracle.engine, "BTC/USDT", "50000");
    oracle.node.set_reachable(false);

    let res = reqwest::get(format!("{}/signed_price/BTC-USDT", oracle.base))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);

    oracle.stop().await;
}

#[tokio::test]
async fn test_status_reports_prices_and_listener() {
    let oracle = start_oracle().await;
    record(&oracle.engine, "BTC/USDT", "50000.25");

    let listening = common::eventually(Duration::from_secs(5), || {
        oracle.engine.listener_state()
            == Some(price_oracle::listener::ListenerState::Polling)
    })
    .await;
    assert!(listening);

    let res = reqwest::get(format!("{}/status", oracle.base)).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let status: StatusResponse = res.json().await.unwrap();

    assert_eq!(status.tracked_pairs, vec!["BTC/USDT", "ETH/USDT"]);
    assert_eq!(status.poll_interval_seconds, 10);
    assert_eq!(status.latest_prices["BTC/USDT"].as_ref().unwrap().price, "50000.25");
    assert!(status.latest_prices["ETH/USDT"].is_none());
    assert!(status.event_listener.active);
    assert!(status.event_listener.node_connected);
    assert_eq!(status.event_listener.chain_id, Some(31337));
    assert_eq!(
        status.event_listener.signer_address.to_lowercase(),
        "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
    );

    oracle.stop().await;
}
