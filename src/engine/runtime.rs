//! Oracle engine lifecycle.
//!
//! # Startup
//! ```text
//! connect (WebSocket → HTTP) ──fail──▶ ConnectivityError, nothing started
//!     │
//!     ▼
//! store context → spawn price poller → spawn event listener
//! ```
//!
//! # Shutdown
//! Listener first (releases its log filter), then the poller, each bounded by
//! the grace period; finally the node handle is released.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use arc_swap::ArcSwapOption;
use thiserror::Error;
use tokio::sync::{watch, Mutex};

use crate::blockchain::{
    BlockchainError, ConnectionManager, ConnectionState, ConnectivityError, FulfillmentSubmitter,
    NodeConnector, OracleInterface, Submitter, Wallet,
};
use crate::config::{validate_config, OracleConfig};
use crate::engine::context::OracleContext;
use crate::engine::supervisor::SupervisedTask;
use crate::feeds::{BinanceSource, FetchError, MarketPoller, PriceSource};
use crate::listener::{EventListener, ListenerSettings, ListenerState};
use crate::observability::metrics;
use crate::oracle::{AssetError, AssetMap, AttestationSigner, PriceTable};

/// Lifecycle errors of the engine.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error(transparent)]
    Connectivity(#[from] ConnectivityError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("signing identity unavailable: {0}")]
    Wallet(#[from] BlockchainError),
}

impl From<AssetError> for OracleError {
    fn from(e: AssetError) -> Self {
        OracleError::Configuration(e.to_string())
    }
}

impl From<FetchError> for OracleError {
    fn from(e: FetchError) -> Self {
        OracleError::Configuration(format!("price source: {}", e))
    }
}

/// Replaceable collaborators of the engine.
pub struct EngineParts {
    pub connector: Arc<dyn NodeConnector>,
    pub price_source: Arc<dyn PriceSource>,
    /// Defaults to a [`FulfillmentSubmitter`] signing with the engine wallet.
    pub submitter: Option<Arc<dyn Submitter>>,
}

impl EngineParts {
    /// Production collaborators built from config.
    pub fn from_config(config: &OracleConfig) -> Result<Self, OracleError> {
        Ok(Self {
            connector: Arc::new(ConnectionManager::from_config(&config.node)),
            price_source: Arc::new(BinanceSource::new(&config.price_source)?),
            submitter: None,
        })
    }
}

#[derive(Default)]
struct RunningTasks {
    poller: Option<SupervisedTask<()>>,
    listener: Option<SupervisedTask<ListenerState>>,
}

/// Owns the oracle's shared state and background tasks.
pub struct OracleEngine {
    config: Arc<OracleConfig>,
    contract: Address,
    assets: Arc<AssetMap>,
    prices: PriceTable,
    signer: Arc<AttestationSigner>,
    submitter: Arc<dyn Submitter>,
    connector: Arc<dyn NodeConnector>,
    price_source: Arc<dyn PriceSource>,
    interface: OracleInterface,
    /// Present between a successful `start` and `stop`.
    context: ArcSwapOption<OracleContext>,
    listener_state: ArcSwapOption<watch::Receiver<ListenerState>>,
    tasks: Mutex<RunningTasks>,
}

impl OracleEngine {
    /// Engine with production collaborators.
    pub fn new(config: OracleConfig, wallet: Wallet) -> Result<Self, OracleError> {
        let parts = EngineParts::from_config(&config)?;
        Self::with_parts(config, wallet, parts)
    }

    /// Engine over explicit collaborators. Rejects configs `load_config` would reject.
    pub fn with_parts(
        config: OracleConfig,
        wallet: Wallet,
        parts: EngineParts,
    ) -> Result<Self, OracleError> {
        validate_config(&config).map_err(|errors| {
            OracleError::Configuration(
                errors
                    .iter()
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let contract = config.oracle.contract().ok_or_else(|| {
            OracleError::Configuration(format!(
                "invalid contract address '{}'",
                config.oracle.contract_address
            ))
        })?;
        let assets = Arc::new(AssetMap::new(&config.oracle.asset_pairs)?);

        let signer = Arc::new(AttestationSigner::new(
            wallet.clone(),
            contract,
            config.oracle.domain_name.clone(),
            config.oracle.domain_version.clone(),
        ));
        let submitter = parts.submitter.unwrap_or_else(|| {
            Arc::new(FulfillmentSubmitter::new(wallet, contract, &config.submitter))
                as Arc<dyn Submitter>
        });

        Ok(Self {
            config: Arc::new(config),
            contract,
            assets,
            prices: PriceTable::new(),
            signer,
            submitter,
            connector: parts.connector,
            price_source: parts.price_source,
            interface: OracleInterface::declared(),
            context: ArcSwapOption::empty(),
            listener_state: ArcSwapOption::empty(),
            tasks: Mutex::new(RunningTasks::default()),
        })
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    pub fn assets(&self) -> &AssetMap {
        &self.assets
    }

    pub fn prices(&self) -> &PriceTable {
        &self.prices
    }

    pub fn signer(&self) -> &AttestationSigner {
        &self.signer
    }

    /// Shared context while running.
    pub fn context(&self) -> Option<Arc<OracleContext>> {
        self.context.load_full()
    }

    pub fn listener_state(&self) -> Option<ListenerState> {
        self.listener_state
            .load_full()
            .map(|receiver| *receiver.borrow())
    }

    pub async fn is_running(&self) -> bool {
        let tasks = self.tasks.lock().await;
        tasks.poller.is_some() || tasks.listener.is_some()
    }

    /// Live connection state; disconnected when not started.
    pub async fn connection_state(&self) -> ConnectionState {
        match self.context() {
            Some(ctx) => {
                let state = ctx.node.connection_state().await;
                metrics::record_node_connected(state.connected);
                state
            }
            None => ConnectionState::disconnected(),
        }
    }

    /// Connect to the node, then start the poller and the listener.
    ///
    /// Calling `start` on a running engine does nothing.
    pub async fn start(&self) -> Result<(), OracleError> {
        let mut tasks = self.tasks.lock().await;
        if tasks.poller.is_some() || tasks.listener.is_some() {
            tracing::debug!("Engine already running");
            return Ok(());
        }

        let node = self.connector.connect().await.map_err(|e| {
            tracing::error!(error = %e, "Node unreachable, engine not started");
            e
        })?;

        let ctx = OracleContext {
            node,
            assets: self.assets.clone(),
            prices: self.prices.clone(),
            signer: self.signer.clone(),
        };
        self.context.store(Some(Arc::new(ctx.clone())));

        let poller = MarketPoller::new(
            self.price_source.clone(),
            self.assets.pairs().to_vec(),
            self.prices.clone(),
            self.config.oracle.poll_interval(),
        );
        tasks.poller = Some(SupervisedTask::spawn("price_poller", move |signal| {
            poller.run(signal)
        }));

        if self.config.listener.enabled {
            let listener = EventListener::new(
                ctx,
                self.submitter.clone(),
                self.interface.clone(),
                ListenerSettings::from_config(&self.config, self.contract),
            );
            self.listener_state.store(Some(Arc::new(listener.state())));
            tasks.listener = Some(SupervisedTask::spawn("event_listener", move |signal| {
                listener.run(signal)
            }));
        } else {
            tracing::info!("Event listener disabled");
        }

        tracing::info!(
            contract = %self.contract,
            signer = %self.signer.address(),
            pairs = self.assets.len(),
            "Oracle engine started"
        );
        Ok(())
    }

    /// Stop the listener, then the poller, then release the node handle.
    ///
    /// Calling `stop` on a stopped engine does nothing.
    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        let grace = Duration::from_secs(self.config.shutdown.grace_period_secs);

        if let Some(listener) = tasks.listener.take() {
            listener.stop(grace).await;
        }
        if let Some(poller) = tasks.poller.take() {
            poller.stop(grace).await;
        }

        if self.context.swap(None).is_some() {
            metrics::record_node_connected(false);
            tracing::info!("Oracle engine stopped");
        }
    }
}

impl std::fmt::Debug for OracleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleEngine")
            .field("contract", &self.contract)
            .field("pairs", &self.assets.pairs())
            .field("connected", &self.context.load().is_some())
            .finish()
    }
}
