//! Shared state handed to each oracle component.

use std::sync::Arc;

use crate::blockchain::ChainNode;
use crate::oracle::{AssetMap, AttestationSigner, PriceTable};

/// Everything a running component reads: node handle, tracked assets,
/// latest prices and the signing identity.
///
/// Built once per engine start and passed explicitly; cloning shares the
/// same underlying resources.
#[derive(Clone)]
pub struct OracleContext {
    pub node: Arc<dyn ChainNode>,
    pub assets: Arc<AssetMap>,
    pub prices: PriceTable,
    pub signer: Arc<AttestationSigner>,
}

impl std::fmt::Debug for OracleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleContext")
            .field("transport", &self.node.transport())
            .field("pairs", &self.assets.pairs())
            .field("prices", &self.prices.len())
            .field("signer", &self.signer.address())
            .finish()
    }
}
