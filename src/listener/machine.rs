//! On-chain price request listener.
//!
//! # State Machine
//! ```text
//! INIT ──(event declared)──▶ SUBSCRIBED ──(filter created)──▶ POLLING
//!   │                                                          │
//!   └──(event missing)──▶ HALTED                               └──(shutdown)──▶ STOPPED
//! ```
//!
//! # Failure Handling
//! - Missing request event: fatal, the listener halts and never retries
//! - Filter creation or log polling errors: retried after a fixed backoff,
//!   the existing filter is kept
//! - Per-event failures (parse, unknown asset, no price, stale, signing,
//!   submission): the event is dropped and polling continues

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
use alloy::rpc::types::{Filter, Log};
use alloy::sol_types::SolEvent;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::{interval, sleep, Interval, MissedTickBehavior};

use crate::blockchain::contract::{OracleEvent, OracleInterface, PriceValidationRequested};
use crate::blockchain::{BlockchainResult, FulfillmentReceipt, Submitter};
use crate::config::OracleConfig;
use crate::engine::OracleContext;
use crate::lifecycle::ShutdownSignal;
use crate::listener::freshness::FreshnessWindow;
use crate::observability::metrics;
use crate::oracle::{AssetId, AssetPair};

/// Listener lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListenerState {
    Init,
    Subscribed,
    Polling,
    /// Stopped permanently by a configuration error.
    Halted,
    /// Stopped by shutdown.
    Stopped,
}

impl ListenerState {
    /// Numeric code exported as the `oracle_listener_state` gauge.
    pub fn code(&self) -> u8 {
        match self {
            ListenerState::Init => 0,
            ListenerState::Subscribed => 1,
            ListenerState::Polling => 2,
            ListenerState::Halted => 3,
            ListenerState::Stopped => 4,
        }
    }
}

impl fmt::Display for ListenerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ListenerState::Init => "init",
            ListenerState::Subscribed => "subscribed",
            ListenerState::Polling => "polling",
            ListenerState::Halted => "halted",
            ListenerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Fatal listener configuration errors.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("event '{name}' is not declared by the oracle contract (known: {known:?})")]
    MissingEvent {
        name: String,
        known: Vec<&'static str>,
    },
}

/// Why a request log could not be turned into a [`PendingRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("log decode failed: {0}")]
    Decode(String),
    #[error("timestamp {0} exceeds u64")]
    TimestampOverflow(U256),
}

/// One decoded price request. Lives only while it is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRequest {
    pub asset_id: AssetId,
    pub requested_at: u64,
    pub requester: Address,
}

impl PendingRequest {
    /// Decode a `PriceValidationRequested` log.
    pub fn from_log(log: &Log) -> Result<Self, ParseError> {
        let decoded = PriceValidationRequested::decode_log(&log.inner)
            .map_err(|e| ParseError::Decode(e.to_string()))?;
        let event = decoded.data;
        let requested_at = u64::try_from(event.timestamp)
            .map_err(|_| ParseError::TimestampOverflow(event.timestamp))?;

        Ok(Self {
            asset_id: AssetId(event.assetId),
            requested_at,
            requester: event.requester,
        })
    }
}

/// Why a request was not fulfilled before reaching the signer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    Parse(ParseError),
    UnknownAsset(AssetId),
    NoObservation(AssetPair),
    Stale {
        requested_at: u64,
        observed_at: u64,
        max_skew_secs: u64,
    },
}

impl DropReason {
    fn label(&self) -> &'static str {
        match self {
            DropReason::Parse(_) => "parse_error",
            DropReason::UnknownAsset(_) => "unknown_asset",
            DropReason::NoObservation(_) => "no_observation",
            DropReason::Stale { .. } => "stale",
        }
    }
}

/// Result of processing one log entry.
#[derive(Debug)]
pub enum RequestOutcome {
    Fulfilled(FulfillmentReceipt),
    Dropped(DropReason),
    SigningFailed(String),
    SubmissionFailed(String),
}

/// Listener timing and filter parameters.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub event_name: String,
    pub contract: Address,
    pub poll_interval: Duration,
    pub retry_backoff: Duration,
    pub window: FreshnessWindow,
}

impl ListenerSettings {
    pub fn from_config(config: &OracleConfig, contract: Address) -> Self {
        Self {
            event_name: config.listener.request_event.clone(),
            contract,
            poll_interval: Duration::from_millis(config.listener.poll_interval_ms),
            retry_backoff: Duration::from_millis(config.listener.retry_backoff_ms),
            window: FreshnessWindow::new(
                config.oracle.poll_interval(),
                Duration::from_secs(config.oracle.freshness_slack_secs),
            ),
        }
    }
}

/// Watches the oracle contract for price requests and fulfills them.
pub struct EventListener {
    ctx: OracleContext,
    submitter: Arc<dyn Submitter>,
    interface: OracleInterface,
    settings: ListenerSettings,
    state: watch::Sender<ListenerState>,
}

impl EventListener {
    pub fn new(
        ctx: OracleContext,
        submitter: Arc<dyn Submitter>,
        interface: OracleInterface,
        settings: ListenerSettings,
    ) -> Self {
        let (state, _) = watch::channel(ListenerState::Init);
        Self {
            ctx,
            submitter,
            interface,
            settings,
            state,
        }
    }

    /// Receiver tracking the listener's state; stays readable after `run` ends.
    pub fn state(&self) -> watch::Receiver<ListenerState> {
        self.state.subscribe()
    }

    fn transition(&self, next: ListenerState) {
        let previous = self.state.send_replace(next);
        metrics::record_listener_state(next.code());
        if previous != next {
            tracing::info!(from = %previous, to = %next, "Listener state changed");
        }
    }

    /// Resolve the configured request event against the declared interface.
    pub fn request_event(&self) -> Result<OracleEvent, ListenerError> {
        self.interface
            .event(&self.settings.event_name)
            .ok_or_else(|| ListenerError::MissingEvent {
                name: self.settings.event_name.clone(),
                known: self.interface.event_names(),
            })
    }

    /// Run until shutdown or a fatal configuration error. Returns the final state.
    pub async fn run(self, mut shutdown: ShutdownSignal) -> ListenerState {
        self.transition(ListenerState::Init);

        let event = match self.request_event() {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, "Listener halted");
                self.transition(ListenerState::Halted);
                return ListenerState::Halted;
            }
        };

        self.transition(ListenerState::Subscribed);
        let filter_id = tokio::select! {
            _ = shutdown.recv() => {
                self.transition(ListenerState::Stopped);
                return ListenerState::Stopped;
            }
            id = self.subscribe(event) => id,
        };

        self.transition(ListenerState::Polling);
        let mut ticker = interval(self.settings.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = self.poll_once(filter_id, &mut ticker) => {}
            }
        }

        match self.ctx.node.uninstall_filter(filter_id).await {
            Ok(_) => tracing::info!(filter_id = %filter_id, "Log filter released"),
            Err(e) => tracing::warn!(filter_id = %filter_id, error = %e, "Failed to release log filter"),
        }

        self.transition(ListenerState::Stopped);
        ListenerState::Stopped
    }

    /// Create the log filter from the current block, retrying transport errors.
    async fn subscribe(&self, event: OracleEvent) -> U256 {
        loop {
            match self.create_filter(event).await {
                Ok(id) => return id,
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        backoff_ms = self.settings.retry_backoff.as_millis() as u64,
                        "Failed to create log filter, retrying"
                    );
                    sleep(self.settings.retry_backoff).await;
                }
            }
        }
    }

    async fn create_filter(&self, event: OracleEvent) -> BlockchainResult<U256> {
        let from_block = self.ctx.node.block_number().await?;
        let filter = Filter::new()
            .address(self.settings.contract)
            .event_signature(event.topic())
            .from_block(from_block);
        let id = self.ctx.node.new_filter(&filter).await?;

        tracing::info!(
            event = event.name(),
            contract = %self.settings.contract,
            from_block,
            filter_id = %id,
            "Subscribed to price requests"
        );
        Ok(id)
    }

    async fn poll_once(&self, filter_id: U256, ticker: &mut Interval) {
        ticker.tick().await;

        match self.ctx.node.filter_changes(filter_id).await {
            Ok(logs) => {
                for log in &logs {
                    self.process_log(log).await;
                }
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    backoff_ms = self.settings.retry_backoff.as_millis() as u64,
                    "Log polling failed, retrying"
                );
                sleep(self.settings.retry_backoff).await;
            }
        }
    }

    /// Validate one request log and, if it passes, sign and submit a fulfillment.
    pub async fn process_log(&self, log: &Log) -> RequestOutcome {
        let outcome = self.fulfill(log).await;

        match &outcome {
            RequestOutcome::Fulfilled(receipt) => {
                metrics::record_request("fulfilled");
                metrics::record_fulfillment("success");
                tracing::info!(tx_hash = %receipt.tx_hash, "Price request fulfilled");
            }
            RequestOutcome::Dropped(reason) => {
                metrics::record_request(reason.label());
                match reason {
                    DropReason::UnknownAsset(id) => {
                        tracing::warn!(asset_id = %id, "Request for untracked asset dropped")
                    }
                    other => tracing::info!(reason = ?other, "Price request dropped"),
                }
            }
            RequestOutcome::SigningFailed(e) => {
                metrics::record_request("signing_failed");
                tracing::error!(error = %e, "Attestation signing failed, request dropped");
            }
            RequestOutcome::SubmissionFailed(e) => {
                metrics::record_request("submission_failed");
                metrics::record_fulfillment("failure");
                tracing::error!(error = %e, "Fulfillment submission failed, request dropped");
            }
        }

        outcome
    }

    async fn fulfill(&self, log: &Log) -> RequestOutcome {
        let request = match PendingRequest::from_log(log) {
            Ok(request) => request,
            Err(e) => return RequestOutcome::Dropped(DropReason::Parse(e)),
        };

        let pair = match self.ctx.assets.pair_of(&request.asset_id) {
            Some(pair) => pair.clone(),
            None => return RequestOutcome::Dropped(DropReason::UnknownAsset(request.asset_id)),
        };

        tracing::debug!(
            pair = %pair,
            requested_at = request.requested_at,
            requester = %request.requester,
            "Price request received"
        );

        let observation = match self.ctx.prices.latest(&pair) {
            Some(observation) => observation,
            None => return RequestOutcome::Dropped(DropReason::NoObservation(pair)),
        };

        if !self
            .settings
            .window
            .admits(request.requested_at, observation.observed_at)
        {
            return RequestOutcome::Dropped(DropReason::Stale {
                requested_at: request.requested_at,
                observed_at: observation.observed_at,
                max_skew_secs: self.settings.window.max_skew_secs(),
            });
        }

        let attestation = match self
            .ctx
            .signer
            .sign(
                self.ctx.node.as_ref(),
                &pair,
                observation.price,
                request.requested_at,
            )
            .await
        {
            Ok(attestation) => attestation,
            Err(e) => return RequestOutcome::SigningFailed(e.to_string()),
        };

        match self
            .submitter
            .submit(self.ctx.node.as_ref(), &attestation)
            .await
        {
            Ok(receipt) => RequestOutcome::Fulfilled(receipt),
            Err(e) => RequestOutcome::SubmissionFailed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::testing::{
        request_log, test_signer, RecordingSubmitter, StubNode, TEST_CONTRACT,
    };
    use crate::blockchain::BlockchainError;
    use crate::lifecycle::Shutdown;
    use crate::oracle::{AssetMap, PriceObservation, PriceTable};
    use alloy::primitives::{Bytes, LogData, B256};
    use rust_decimal::Decimal;
    use std::str::FromStr;
    use std::sync::atomic::Ordering;

    struct Harness {
        node: Arc<StubNode>,
        submitter: Arc<RecordingSubmitter>,
        prices: PriceTable,
        listener: EventListener,
    }

    fn harness(event_name: &str) -> Harness {
        let node = Arc::new(StubNode::new(1337));
        let submitter = Arc::new(RecordingSubmitter::default());
        let prices = PriceTable::new();
        let ctx = OracleContext {
            node: node.clone(),
            assets: Arc::new(AssetMap::new(["BTC/USDT"]).unwrap()),
            prices: prices.clone(),
            signer: Arc::new(test_signer()),
        };
        let settings = ListenerSettings {
            event_name: event_name.to_string(),
            contract: TEST_CONTRACT,
            poll_interval: Duration::from_millis(100),
            retry_backoff: Duration::from_millis(500),
            window: FreshnessWindow::new(Duration::from_secs(10), Duration::from_secs(5)),
        };
        let listener = EventListener::new(
            ctx,
            submitter.clone(),
            OracleInterface::declared(),
            settings,
        );
        Harness {
            node,
            submitter,
            prices,
            listener,
        }
    }

    fn btc() -> AssetPair {
        AssetPair::parse("BTC/USDT").unwrap()
    }

    fn observe_btc(prices: &PriceTable, observed_at: u64) {
        prices.record(PriceObservation {
            pair: btc(),
            price: Decimal::from_str("50000.123456").unwrap(),
            observed_at,
        });
    }

    #[tokio::test]
    async fn test_fresh_request_is_fulfilled() {
        let h = harness("PriceValidationRequested");
        observe_btc(&h.prices, 100);

        let outcome = h
            .listener
            .process_log(&request_log(btc().asset_id().0, 108))
            .await;

        assert!(matches!(outcome, RequestOutcome::Fulfilled(_)));
        let calls = h.submitter.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].scaled_price, U256::from(50000123456u64));
        assert_eq!(calls[0].timestamp, 108);
        assert_eq!(calls[0].chain_id, 1337);
    }

    #[tokio::test]
    async fn test_stale_request_is_dropped() {
        let h = harness("PriceValidationRequested");
        observe_btc(&h.prices, 100);

        let outcome = h
            .listener
            .process_log(&request_log(btc().asset_id().0, 200))
            .await;

        assert!(matches!(
            outcome,
            RequestOutcome::Dropped(DropReason::Stale {
                requested_at: 200,
                observed_at: 100,
                max_skew_secs: 25
            })
        ));
        assert_eq!(h.submitter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_asset_is_dropped() {
        let h = harness("PriceValidationRequested");
        observe_btc(&h.prices, 100);

        let outcome = h
            .listener
            .process_log(&request_log(B256::repeat_byte(0xab), 100))
            .await;

        assert!(matches!(
            outcome,
            RequestOutcome::Dropped(DropReason::UnknownAsset(_))
        ));
        assert_eq!(h.submitter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_observation_is_dropped() {
        let h = harness("PriceValidationRequested");

        let outcome = h
            .listener
            .process_log(&request_log(btc().asset_id().0, 100))
            .await;

        assert!(matches!(
            outcome,
            RequestOutcome::Dropped(DropReason::NoObservation(_))
        ));
    }

    #[tokio::test]
    async fn test_malformed_log_is_dropped() {
        let h = harness("PriceValidationRequested");
        let mut log = request_log(btc().asset_id().0, 100);
        log.inner.data = LogData::new_unchecked(
            vec![OracleEvent::PriceValidationRequested.topic()],
            Bytes::from(vec![1u8, 2, 3]),
        );

        let outcome = h.listener.process_log(&log).await;

        assert!(matches!(
            outcome,
            RequestOutcome::Dropped(DropReason::Parse(ParseError::Decode(_)))
        ));
    }

    #[tokio::test]
    async fn test_oversized_timestamp_is_dropped() {
        let h = harness("PriceValidationRequested");
        observe_btc(&h.prices, 100);
        let event = PriceValidationRequested {
            assetId: btc().asset_id().0,
            timestamp: U256::MAX,
            requester: Address::repeat_byte(0x11),
        };
        let mut log = request_log(btc().asset_id().0, 100);
        log.inner.data = event.encode_log_data();

        let outcome = h.listener.process_log(&log).await;

        match outcome {
            RequestOutcome::Dropped(DropReason::Parse(ParseError::TimestampOverflow(ts))) => {
                assert_eq!(ts, U256::MAX)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
        assert_eq!(h.submitter.call_count(), 0);
    }

    #[tokio::test]
    async fn test_submission_failure_is_reported() {
        let h = harness("PriceValidationRequested");
        observe_btc(&h.prices, 100);
        h.submitter.fail.store(true, Ordering::SeqCst);

        let outcome = h
            .listener
            .process_log(&request_log(btc().asset_id().0, 100))
            .await;

        assert!(matches!(outcome, RequestOutcome::SubmissionFailed(_)));
    }

    #[tokio::test]
    async fn test_missing_event_halts() {
        let h = harness("PriceRequested");
        let state = h.listener.state();
        let shutdown = Shutdown::new();

        let final_state = h.listener.run(shutdown.subscribe()).await;

        assert_eq!(final_state, ListenerState::Halted);
        assert_eq!(*state.borrow(), ListenerState::Halted);
        assert_eq!(h.node.filters_installed.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_keeps_filter() {
        let h = harness("PriceValidationRequested");
        observe_btc(&h.prices, 100);
        h.node
            .push_batch(Err(BlockchainError::Rpc("connection reset".to_string())));
        h.node
            .push_batch(Ok(vec![request_log(btc().asset_id().0, 101)]));

        let node = h.node.clone();
        let submitter = h.submitter.clone();
        let state = h.listener.state();
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(h.listener.run(shutdown.subscribe()));

        for _ in 0..50 {
            if submitter.call_count() > 0 {
                break;
            }
            sleep(Duration::from_millis(100)).await;
        }

        assert_eq!(submitter.call_count(), 1);
        assert_eq!(*state.borrow(), ListenerState::Polling);
        assert_eq!(node.filters_installed.load(Ordering::SeqCst), 1);
        assert!(node.filter_polls.load(Ordering::SeqCst) >= 2);

        shutdown.trigger();
        let final_state = handle.await.unwrap();

        assert_eq!(final_state, ListenerState::Stopped);
        assert_eq!(node.filters_uninstalled.load(Ordering::SeqCst), 1);
    }
}
