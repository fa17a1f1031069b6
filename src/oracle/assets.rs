//! Asset pair labels and their on-chain identifiers.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from asset pair parsing or map construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("invalid asset pair '{0}': expected BASE/QUOTE")]
    InvalidPair(String),

    #[error("duplicate asset pair '{0}'")]
    Duplicate(String),

    #[error("asset id collision between '{0}' and '{1}'")]
    Collision(String, String),
}

/// Normalised asset pair label, e.g. `BTC/USDT`.
///
/// External input is upper-cased and `-`, `_` or `:` separators are
/// rewritten to `/`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetPair(String);

impl AssetPair {
    pub fn parse(raw: &str) -> Result<Self, AssetError> {
        let normalised: String = raw
            .trim()
            .chars()
            .map(|c| match c {
                '-' | '_' | ':' => '/',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        let mut parts = normalised.split('/');
        let valid = match (parts.next(), parts.next(), parts.next()) {
            (Some(base), Some(quote), None) => {
                !base.is_empty()
                    && !quote.is_empty()
                    && base.chars().all(|c| c.is_ascii_alphanumeric())
                    && quote.chars().all(|c| c.is_ascii_alphanumeric())
            }
            _ => false,
        };

        if valid {
            Ok(Self(normalised))
        } else {
            Err(AssetError::InvalidPair(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Exchange ticker symbol, the label with its separator removed.
    pub fn symbol(&self) -> String {
        self.0.replace('/', "")
    }

    /// Deterministic on-chain identifier: keccak256 of the label bytes.
    pub fn asset_id(&self) -> AssetId {
        AssetId(keccak256(self.0.as_bytes()))
    }
}

impl fmt::Display for AssetPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AssetPair {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetPair {
    type Error = AssetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetPair> for String {
    fn from(pair: AssetPair) -> Self {
        pair.0
    }
}

/// Fixed-size on-chain asset identifier (`bytes32`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetId(pub B256);

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<B256> for AssetId {
    fn from(id: B256) -> Self {
        Self(id)
    }
}

/// Bijective map between tracked pairs and their identifiers.
///
/// Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct AssetMap {
    pairs: Vec<AssetPair>,
    by_pair: HashMap<AssetPair, AssetId>,
    by_id: HashMap<AssetId, AssetPair>,
}

impl AssetMap {
    /// Build the map from raw labels. Order of `labels` is preserved.
    pub fn new<I, S>(labels: I) -> Result<Self, AssetError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut pairs = Vec::new();
        let mut by_pair = HashMap::new();
        let mut by_id: HashMap<AssetId, AssetPair> = HashMap::new();

        for label in labels {
            let pair = AssetPair::parse(label.as_ref())?;
            if by_pair.contains_key(&pair) {
                return Err(AssetError::Duplicate(pair.to_string()));
            }
            let id = pair.asset_id();
            if let Some(existing) = by_id.get(&id) {
                return Err(AssetError::Collision(existing.to_string(), pair.to_string()));
            }
            by_pair.insert(pair.clone(), id);
            by_id.insert(id, pair.clone());
            pairs.push(pair);
        }

        for (pair, id) in &by_pair {
            tracing::info!(pair = %pair, asset_id = %id, "Tracking asset pair");
        }

        Ok(Self { pairs, by_pair, by_id })
    }

    pub fn pairs(&self) -> &[AssetPair] {
        &self.pairs
    }

    pub fn id_of(&self, pair: &AssetPair) -> Option<AssetId> {
        self.by_pair.get(pair).copied()
    }

    pub fn pair_of(&self, id: &AssetId) -> Option<&AssetPair> {
        self.by_id.get(id)
    }

    /// Normalise an external label and return it only if tracked.
    pub fn resolve(&self, raw: &str) -> Option<AssetPair> {
        AssetPair::parse(raw)
            .ok()
            .filter(|pair| self.by_pair.contains_key(pair))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}
