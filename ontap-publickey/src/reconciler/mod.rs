//! Reconcilers for ONTAP resources.
//!
//! A reconciler compares the desired spec with the state reported by the
//! cluster and takes at most one corrective action to converge.

pub mod decision;
pub mod publickey;

use async_trait::async_trait;
use serde::Serialize;
use tracing::warn;

use crate::error::Result;

/// Result of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub changed: bool,
    pub warnings: Vec<String>,
}

impl Outcome {
    /// Record a non-fatal warning for the caller.
    pub fn warn(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        warn!("{}", msg);
        self.warnings.push(msg);
    }
}

/// Trait for resource reconcilers.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// The desired state supplied by the caller.
    type Spec;

    /// Fetch current state, decide, and apply the corrective action.
    async fn reconcile(&self, spec: &Self::Spec) -> Result<Outcome>;
}
