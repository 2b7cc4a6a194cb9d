// src/bridge/context.rs
// The codebase context snapshot: single-writer (browser), many-readers
// (spec §3, §5). Modeled as a `tokio::sync::watch` channel so readers
// observe an atomic swap without holding a lock across suspension points.

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodebaseStats {
    pub file_count: u64,
    pub function_count: u64,
    pub class_count: u64,
    pub interface_count: u64,
    pub method_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hotspot {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub file_path: String,
    pub connections: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodebaseContext {
    pub project_name: String,
    pub stats: CodebaseStats,
    pub hotspots: Vec<Hotspot>,
    pub folder_tree: String,
}

/// Latest-value store for the context snapshot. `None` until the first
/// push, or after the browser disconnects.
#[derive(Clone)]
pub struct ContextStore {
    tx: watch::Sender<Option<CodebaseContext>>,
}

impl ContextStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CodebaseContext>> {
        self.tx.subscribe()
    }

    /// Replace the snapshot atomically. Last-wins across concurrent pushes.
    pub fn push(&self, context: CodebaseContext) {
        let _ = self.tx.send(Some(context));
    }

    /// Clear the snapshot, e.g. on browser disconnect.
    pub fn clear(&self) {
        let _ = self.tx.send(None);
    }

    pub fn current(&self) -> Option<CodebaseContext> {
        self.tx.borrow().clone()
    }
}

impl Default for ContextStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(project_name: &str) -> CodebaseContext {
        CodebaseContext {
            project_name: project_name.to_string(),
            stats: CodebaseStats {
                file_count: 1,
                function_count: 2,
                class_count: 0,
                interface_count: 0,
                method_count: 3,
            },
            hotspots: vec![],
            folder_tree: "src/".to_string(),
        }
    }

    #[test]
    fn absent_until_first_push() {
        let store = ContextStore::new();
        assert!(store.current().is_none());
    }

    #[test]
    fn push_is_last_wins() {
        let store = ContextStore::new();
        store.push(sample("s1"));
        store.push(sample("s2"));
        assert_eq!(store.current().unwrap().project_name, "s2");
    }

    #[test]
    fn clear_removes_the_snapshot() {
        let store = ContextStore::new();
        store.push(sample("s1"));
        store.clear();
        assert!(store.current().is_none());
    }

    #[tokio::test]
    async fn subscribers_observe_pushes() {
        let store = ContextStore::new();
        let mut rx = store.subscribe();
        store.push(sample("s1"));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().clone().unwrap().project_name, "s1");
    }
}
