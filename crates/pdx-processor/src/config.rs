use std::time::Duration;

use serde::{Deserialize, Serialize};

use pdx_types::Did;

/// Node configuration consumed by the document pipelines.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Network identifier signed into every envelope header.
    pub network_id: u32,
    /// This node's own DID.
    pub identity: Did,
    /// Bound on every peer call (signature solicitation, delivery).
    pub p2p_connection_timeout: Duration,
    /// Bound on anchor pre-commit/commit waits.
    pub default_task_timeout: Duration,
    /// Minimum number of distinct signers required before anchoring.
    /// `None` requires one signature from each signer-collaborator.
    pub min_signatures: Option<usize>,
    /// Name of the ledger signing account.
    pub default_account: String,
}

impl NodeConfig {
    /// A configuration for the given identity with default bounds.
    pub fn for_identity(identity: Did) -> Self {
        Self {
            network_id: 1,
            identity,
            p2p_connection_timeout: Duration::from_secs(30),
            default_task_timeout: Duration::from_secs(120),
            min_signatures: None,
            default_account: "main".into(),
        }
    }
}
