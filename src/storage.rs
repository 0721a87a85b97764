use crate::types::{DeploymentRecord, VerificationRequest};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

#[async_trait]
pub trait DeploymentStore: Send + Sync {
    async fn insert_deployment(&self, record: DeploymentRecord) -> anyhow::Result<()>;
    async fn deployments(&self) -> anyhow::Result<Vec<DeploymentRecord>>;
}

/// The pending-verification index: append plus delete-by-key. Keys are
/// deploy transaction hashes, so concurrent sweeps and fresh deploys cannot
/// collide on an entry.
#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn insert_pending(&self, request: VerificationRequest) -> anyhow::Result<()>;
    async fn pending(&self) -> anyhow::Result<Vec<VerificationRequest>>;
    async fn remove_pending(&self, deploy_tx_hash: &str) -> anyhow::Result<()>;
}

/// In-memory store mirroring the KV layout (`deployment:<tx>` and
/// `verification:<tx>` hash objects). The traits above are the seam for a
/// networked key-value backend.
#[derive(Default)]
pub struct InMemoryStorage {
    deployments: RwLock<BTreeMap<String, DeploymentRecord>>,
    verifications: RwLock<BTreeMap<String, VerificationRequest>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn deployment_key(deploy_tx_hash: &str) -> String {
        format!("deployment:{deploy_tx_hash}")
    }

    fn verification_key(deploy_tx_hash: &str) -> String {
        format!("verification:{deploy_tx_hash}")
    }
}

#[async_trait]
impl DeploymentStore for InMemoryStorage {
    async fn insert_deployment(&self, record: DeploymentRecord) -> anyhow::Result<()> {
        self.deployments
            .write()
            .insert(Self::deployment_key(&record.deploy_tx_hash), record);
        Ok(())
    }

    async fn deployments(&self) -> anyhow::Result<Vec<DeploymentRecord>> {
        Ok(self.deployments.read().values().cloned().collect())
    }
}

#[async_trait]
impl VerificationStore for InMemoryStorage {
    async fn insert_pending(&self, request: VerificationRequest) -> anyhow::Result<()> {
        self.verifications
            .write()
            .insert(Self::verification_key(&request.deploy_tx_hash), request);
        Ok(())
    }

    async fn pending(&self) -> anyhow::Result<Vec<VerificationRequest>> {
        Ok(self.verifications.read().values().cloned().collect())
    }

    async fn remove_pending(&self, deploy_tx_hash: &str) -> anyhow::Result<()> {
        self.verifications
            .write()
            .remove(&Self::verification_key(deploy_tx_hash));
        Ok(())
    }
}
