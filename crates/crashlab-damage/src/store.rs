//! Storage seam for finalized repair estimates.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crashlab_errors::Result;

use crate::estimator::RepairEstimate;

/// Opaque identifier of a stored estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EstimateId(Uuid);

impl EstimateId {
    /// A fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for EstimateId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EstimateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EstimateId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Persistence for finalized estimates.
#[async_trait]
pub trait EstimateStore: Send + Sync {
    /// Store an estimate under a new id.
    async fn save(&self, estimate: RepairEstimate) -> Result<EstimateId>;

    /// Fetch a stored estimate.
    async fn load(&self, id: &EstimateId) -> Result<Option<RepairEstimate>>;

    /// Ids of all stored estimates, oldest estimate first.
    async fn list(&self) -> Result<Vec<EstimateId>>;
}

/// Process-local store, lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryEstimateStore {
    estimates: RwLock<HashMap<EstimateId, RepairEstimate>>,
}

impl InMemoryEstimateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored estimates.
    pub async fn len(&self) -> usize {
        self.estimates.read().await.len()
    }

    /// Whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.estimates.read().await.is_empty()
    }
}

#[async_trait]
impl EstimateStore for InMemoryEstimateStore {
    async fn save(&self, estimate: RepairEstimate) -> Result<EstimateId> {
        let id = EstimateId::new();
        self.estimates.write().await.insert(id, estimate);
        debug!(estimate_id = %id, "Stored repair estimate");
        Ok(id)
    }

    async fn load(&self, id: &EstimateId) -> Result<Option<RepairEstimate>> {
        Ok(self.estimates.read().await.get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<EstimateId>> {
        let estimates = self.estimates.read().await;
        let mut entries: Vec<_> = estimates
            .iter()
            .map(|(id, estimate)| (estimate.created_at, *id))
            .collect();
        entries.sort();
        Ok(entries.into_iter().map(|(_, id)| id).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_roundtrip() {
        let id = EstimateId::new();
        let parsed: std::result::Result<EstimateId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
        assert!("not-a-uuid".parse::<EstimateId>().is_err());
    }
}
