//! # Test Utilities
//!
//! In-memory [`MigrationStore`] for exercising the pipeline without a database.
//! Each command pops its next scripted result; an empty script yields `Ok(0)`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use crate::database::MigrationStore;
use crate::error::MigrationResult;

/// A command received by [`ScriptedMigrationStore`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    UpdateSource(String),
    CopySourceHistory,
    UpdateSecondary(String),
    CopySecondaryHistory,
}

type CallHook = Box<dyn FnOnce() + Send>;

#[derive(Default)]
struct Scripts {
    source_updates: VecDeque<MigrationResult<u64>>,
    source_copies: VecDeque<MigrationResult<u64>>,
    secondary_updates: VecDeque<MigrationResult<u64>>,
    secondary_copies: VecDeque<MigrationResult<u64>>,
}

/// Store that replays scripted results and records every call
#[derive(Default)]
pub struct ScriptedMigrationStore {
    scripts: Mutex<Scripts>,
    calls: Mutex<Vec<StoreCall>>,
    hook: Mutex<Option<CallHook>>,
    latency: Mutex<Option<Duration>>,
}

impl std::fmt::Debug for ScriptedMigrationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedMigrationStore")
            .field("calls", &*self.calls.lock())
            .finish_non_exhaustive()
    }
}

impl ScriptedMigrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn push_source_update(&self, result: MigrationResult<u64>) {
        self.scripts.lock().source_updates.push_back(result);
    }

    /// Script a sequence of successful source chunk sizes
    pub fn push_source_updates(&self, rows: &[u64]) {
        for &n in rows {
            self.push_source_update(Ok(n));
        }
    }

    pub fn push_source_history_copy(&self, result: MigrationResult<u64>) {
        self.scripts.lock().source_copies.push_back(result);
    }

    pub fn push_secondary_update(&self, result: MigrationResult<u64>) {
        self.scripts.lock().secondary_updates.push_back(result);
    }

    pub fn push_secondary_updates(&self, rows: &[u64]) {
        for &n in rows {
            self.push_secondary_update(Ok(n));
        }
    }

    pub fn push_secondary_history_copy(&self, result: MigrationResult<u64>) {
        self.scripts.lock().secondary_copies.push_back(result);
    }

    /// Run `hook` once, inside the next command, before it returns
    pub fn on_next_call(&self, hook: impl FnOnce() + Send + 'static) {
        *self.hook.lock() = Some(Box::new(hook));
    }

    /// Make every command take `latency` before returning
    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = Some(latency);
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    async fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
        let latency = *self.latency.lock();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        let hook = self.hook.lock().take();
        if let Some(hook) = hook {
            hook();
        }
    }
}

#[async_trait]
impl MigrationStore for ScriptedMigrationStore {
    async fn update_source_chunk(&self, carrier: &str) -> MigrationResult<u64> {
        self.record(StoreCall::UpdateSource(carrier.to_string())).await;
        let next = self.scripts.lock().source_updates.pop_front();
        next.unwrap_or(Ok(0))
    }

    async fn copy_source_to_history(&self) -> MigrationResult<u64> {
        self.record(StoreCall::CopySourceHistory).await;
        let next = self.scripts.lock().source_copies.pop_front();
        next.unwrap_or(Ok(0))
    }

    async fn update_secondary_chunk(&self, carrier: &str) -> MigrationResult<u64> {
        self.record(StoreCall::UpdateSecondary(carrier.to_string())).await;
        let next = self.scripts.lock().secondary_updates.pop_front();
        next.unwrap_or(Ok(0))
    }

    async fn copy_secondary_to_history(&self) -> MigrationResult<u64> {
        self.record(StoreCall::CopySecondaryHistory).await;
        let next = self.scripts.lock().secondary_copies.pop_front();
        next.unwrap_or(Ok(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MigrationError;

    #[tokio::test]
    async fn test_scripted_results_then_default() {
        let store = ScriptedMigrationStore::new();
        store.push_source_updates(&[3, 1]);
        store.push_secondary_update(Err(MigrationError::DatabaseError("lock".into())));

        assert_eq!(store.update_source_chunk("X").await, Ok(3));
        assert_eq!(store.update_source_chunk("X").await, Ok(1));
        assert_eq!(store.update_source_chunk("X").await, Ok(0));
        assert!(store.update_secondary_chunk("X").await.is_err());
        assert_eq!(store.call_count(), 4);
    }

    #[tokio::test]
    async fn test_hook_runs_once() {
        let store = ScriptedMigrationStore::new();
        let fired = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&fired);
        store.on_next_call(move || *counter.lock() += 1);

        store.copy_source_to_history().await.unwrap();
        store.copy_secondary_to_history().await.unwrap();

        assert_eq!(*fired.lock(), 1);
        assert_eq!(
            store.calls(),
            vec![StoreCall::CopySourceHistory, StoreCall::CopySecondaryHistory]
        );
    }
}
