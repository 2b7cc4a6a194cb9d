// src/bridge/pending.rs
// The pending-request table: request id -> one-shot completion channel
// (spec §3, §9 "Request correlation"). Bounded at MAX_PENDING; cancellation
// (timeout or shutdown) removes the entry and drops the sender so a late
// response cannot double-resolve it.

use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::{oneshot, Mutex};

pub const MAX_PENDING: usize = 100;

#[derive(Debug, Clone)]
pub enum PendingOutcome {
    Result(Value),
    Error(Value),
}

pub struct PendingTable {
    entries: Mutex<HashMap<String, oneshot::Sender<PendingOutcome>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum PendingError {
    #[error("too many in-flight requests")]
    Overloaded,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new in-flight request and return the receiver half. Fails
    /// once `MAX_PENDING` entries are outstanding.
    pub async fn register(&self, id: String) -> Result<oneshot::Receiver<PendingOutcome>, PendingError> {
        let mut entries = self.entries.lock().await;
        if entries.len() >= MAX_PENDING {
            return Err(PendingError::Overloaded);
        }
        let (tx, rx) = oneshot::channel();
        entries.insert(id, tx);
        Ok(rx)
    }

    /// Resolve a pending entry by id. A missing id (already timed out,
    /// already resolved, or unknown) is a silent no-op — the spec requires
    /// late responses to be dropped, not errored.
    pub async fn resolve(&self, id: &str, outcome: PendingOutcome) {
        let mut entries = self.entries.lock().await;
        if let Some(tx) = entries.remove(id) {
            let _ = tx.send(outcome);
        }
    }

    /// Remove an entry without resolving it, e.g. on timeout expiry.
    pub async fn cancel(&self, id: &str) {
        self.entries.lock().await.remove(id);
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Drop every pending entry, e.g. during shutdown drain.
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn register_and_resolve_round_trips() {
        let table = PendingTable::new();
        let rx = table.register("r1".to_string()).await.unwrap();
        table.resolve("r1", PendingOutcome::Result(json!({"ok": true}))).await;
        let outcome = rx.await.unwrap();
        assert!(matches!(outcome, PendingOutcome::Result(_)));
    }

    #[tokio::test]
    async fn resolving_unknown_id_is_a_silent_no_op() {
        let table = PendingTable::new();
        table.resolve("missing", PendingOutcome::Result(json!(null))).await;
        assert_eq!(table.len().await, 0);
    }

    #[tokio::test]
    async fn cancel_drops_the_entry_so_late_resolve_is_ignored() {
        let table = PendingTable::new();
        let rx = table.register("r1".to_string()).await.unwrap();
        table.cancel("r1").await;
        table.resolve("r1", PendingOutcome::Result(json!(1))).await;
        assert!(rx.await.is_err());
    }

    #[tokio::test]
    async fn refuses_registration_beyond_max_pending() {
        let table = PendingTable::new();
        for i in 0..MAX_PENDING {
            table.register(format!("r{i}")).await.unwrap();
        }
        assert!(matches!(
            table.register("overflow".to_string()).await,
            Err(PendingError::Overloaded)
        ));
    }

    #[tokio::test]
    async fn each_id_resolves_exactly_one_receiver() {
        let table = PendingTable::new();
        let rx1 = table.register("r1".to_string()).await.unwrap();
        let rx2 = table.register("r2".to_string()).await.unwrap();
        table.resolve("r1", PendingOutcome::Result(json!(1))).await;
        table.resolve("r2", PendingOutcome::Result(json!(2))).await;
        assert!(matches!(rx1.await.unwrap(), PendingOutcome::Result(v) if v == json!(1)));
        assert!(matches!(rx2.await.unwrap(), PendingOutcome::Result(v) if v == json!(2)));
    }
}
