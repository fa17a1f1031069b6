//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the query handlers
//! - Wire up middleware (request ID, tracing, request timeout)
//! - Serve on a bound listener until the shutdown future resolves

use std::future::Future;
use std::time::Duration;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HttpConfig;
use crate::engine::QueryFacade;
use crate::http::handlers;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub facade: QueryFacade,
}

/// HTTP server for the query surface.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server over `facade`.
    pub fn new(config: &HttpConfig, facade: QueryFacade) -> Self {
        let router = Self::build_router(config, AppState { facade });
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &HttpConfig, state: AppState) -> Router {
        Router::new()
            .route("/", get(handlers::root))
            .route("/price/{pair}", get(handlers::get_price))
            .route("/signed_price/{pair}", get(handlers::get_signed_price))
            .route("/status", get(handlers::get_status))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The configured router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testing::TEST_PRIVATE_KEY;
    use crate::blockchain::Wallet;
    use crate::config::OracleConfig;
    use crate::engine::OracleEngine;
    use crate::oracle::{AssetPair, PriceObservation};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tower::ServiceExt;

    /// Router over an engine that was never started.
    fn offline_router() -> (Router, Arc<OracleEngine>) {
        let mut config = OracleConfig::default();
        config.oracle.contract_address = "0x5FbDB2315678afecb367f032d93F642f64180aa3".to_string();
        config.oracle.asset_pairs = vec!["BTC/USDT".to_string()];

        let wallet = Wallet::from_private_key(TEST_PRIVATE_KEY).unwrap();
        let engine = Arc::new(OracleEngine::new(config.clone(), wallet).unwrap());
        let server = HttpServer::new(&config.http, QueryFacade::new(engine.clone()));
        (server.router(), engine)
    }

    async fn get(router: Router, uri: &str) -> axum::response::Response {
        router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let (router, _engine) = offline_router();
        let res = get(router, "/").await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_status_codes_without_node() {
        let (router, engine) = offline_router();

        assert_eq!(get(router.clone(), "/price/BTC-USDT").await.status(), StatusCode::NOT_FOUND);

        engine.prices().record(PriceObservation {
            pair: AssetPair::parse("BTC/USDT").unwrap(),
            price: Decimal::new(5000025, 2),
            observed_at: 100,
        });
        assert_eq!(get(router.clone(), "/price/btc-usdt").await.status(), StatusCode::OK);
        assert_eq!(get(router.clone(), "/price/XRP-USDT").await.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            get(router.clone(), "/signed_price/BTC-USDT").await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(get(router, "/status").await.status(), StatusCode::OK);
    }
}
