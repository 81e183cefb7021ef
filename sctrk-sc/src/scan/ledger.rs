//! Detached ledger operations
//!
//! Batch size lookups and location commits run as fire-and-forget tasks.
//! Each reports exactly one `LedgerOutcome` on the evaluator's channel; the
//! evaluator applies it to the store on its next tick. Nothing awaits these
//! tasks, and shutdown does not cancel them.

use crate::bridges::{BridgeError, LedgerCommit, LedgerLookup};
use crate::session::{CommitOutcome, SessionId};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Result posted back by a detached ledger task
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerOutcome {
    /// Batch size lookup finished
    BatchSize {
        session_id: SessionId,
        result: Result<usize, BridgeError>,
    },

    /// Location commit finished
    Commit {
        session_id: SessionId,
        destination: String,
        outcome: CommitOutcome,
    },
}

/// Ledger collaborators plus the per-operation time limit
#[derive(Clone)]
pub struct LedgerTasks {
    lookup: Arc<dyn LedgerLookup>,
    commit: Arc<dyn LedgerCommit>,
    timeout: Duration,
    outcomes: mpsc::UnboundedSender<LedgerOutcome>,
}

impl LedgerTasks {
    pub fn new(
        lookup: Arc<dyn LedgerLookup>,
        commit: Arc<dyn LedgerCommit>,
        timeout: Duration,
        outcomes: mpsc::UnboundedSender<LedgerOutcome>,
    ) -> Self {
        Self {
            lookup,
            commit,
            timeout,
            outcomes,
        }
    }

    /// Launch the batch size lookup for the first item of a session
    pub fn spawn_batch_size_lookup(&self, session_id: SessionId, identifier: String) {
        let lookup = Arc::clone(&self.lookup);
        let timeout = self.timeout;
        let outcomes = self.outcomes.clone();

        tokio::spawn(async move {
            debug!("Resolving batch size for {}", identifier);
            let result = with_timeout(timeout, lookup.resolve_batch_size(&identifier)).await;
            deliver(&outcomes, LedgerOutcome::BatchSize { session_id, result });
        });
    }

    /// Launch pool resolution followed by the location commit
    pub fn spawn_batch_commit(&self, session_id: SessionId, first_item: String, destination: String) {
        let lookup = Arc::clone(&self.lookup);
        let commit = Arc::clone(&self.commit);
        let timeout = self.timeout;
        let outcomes = self.outcomes.clone();

        tokio::spawn(async move {
            let outcome =
                commit_batch(lookup.as_ref(), commit.as_ref(), timeout, &first_item, &destination)
                    .await;
            deliver(
                &outcomes,
                LedgerOutcome::Commit {
                    session_id,
                    destination,
                    outcome,
                },
            );
        });
    }
}

async fn commit_batch(
    lookup: &dyn LedgerLookup,
    commit: &dyn LedgerCommit,
    timeout: Duration,
    first_item: &str,
    destination: &str,
) -> CommitOutcome {
    let pool_id = match with_timeout(timeout, lookup.resolve_pool_for_item(first_item)).await {
        Ok(pool_id) => pool_id,
        Err(e) => return CommitOutcome::Abandoned(e),
    };

    debug!("Committing location {} for pool {}", destination, pool_id);
    match with_timeout(timeout, commit.commit_location(pool_id, destination)).await {
        Ok(receipt) if receipt.confirmed => CommitOutcome::Confirmed {
            tx_hash: receipt.tx_hash,
        },
        Ok(receipt) => CommitOutcome::Failed {
            tx_hash: Some(receipt.tx_hash),
            error: BridgeError::CommitFailure("transaction reverted".to_string()),
        },
        Err(e) => CommitOutcome::Failed {
            tx_hash: None,
            error: e,
        },
    }
}

async fn with_timeout<T>(
    timeout: Duration,
    operation: impl Future<Output = Result<T, BridgeError>>,
) -> Result<T, BridgeError> {
    match tokio::time::timeout(timeout, operation).await {
        Ok(result) => result,
        Err(_) => Err(BridgeError::Unavailable(format!(
            "ledger did not respond within {}ms",
            timeout.as_millis()
        ))),
    }
}

fn deliver(outcomes: &mpsc::UnboundedSender<LedgerOutcome>, outcome: LedgerOutcome) {
    if outcomes.send(outcome).is_err() {
        // Evaluator already stopped
        warn!("Ledger result arrived after shutdown and was not applied");
    }
}
