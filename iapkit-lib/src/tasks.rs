//! Background task slots.
//!
//! Each [`TaskKind`] has at most one task in flight per provider. Spawning a
//! task of a kind that is still running cancels the older one first; a
//! cancelled task is dropped at its next await point and never reaches its
//! terminal callback.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::observer::ProgressIndicator;

/// Kinds of background work that occupy a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Init,
    ItemList,
    Inbox,
    Verify,
    Restore,
}

/// Handle for a running slot task.
#[derive(Debug)]
pub struct TaskHandle {
    id: u64,
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl TaskHandle {
    fn new(id: u64, cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            id,
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Cancel the task.
    pub fn cancel(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }

    /// True while the task has neither finished nor been cancelled.
    pub fn is_running(&self) -> bool {
        self.cancel_tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}

/// At-most-one-per-kind task registry.
pub struct TaskSlots {
    runtime: Handle,
    progress: Arc<dyn ProgressIndicator>,
    slots: Mutex<HashMap<TaskKind, TaskHandle>>,
    next_id: AtomicU64,
}

impl TaskSlots {
    pub fn new(runtime: Handle, progress: Arc<dyn ProgressIndicator>) -> Self {
        Self {
            runtime,
            progress,
            slots: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// Run `future` in the slot for `kind`, cancelling any task already there.
    ///
    /// The progress indicator is shown for the task's lifetime.
    pub fn spawn<F>(&self, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel(kind);

        let (cancel_tx, cancel_rx) = oneshot::channel();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(kind, TaskHandle::new(id, cancel_tx));

        self.progress.show();
        let progress = self.progress.clone();
        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = cancel_rx => {
                    tracing::debug!(?kind, id, "task cancelled");
                }
                _ = future => {
                    progress.dismiss();
                }
            }
        });
    }

    /// Run `future` outside any slot. It is never cancelled by a newer task.
    pub fn spawn_detached<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(future);
    }

    /// Cancel the task in `kind`'s slot. Returns true if one was running.
    pub fn cancel(&self, kind: TaskKind) -> bool {
        let handle = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&kind);
        match handle {
            Some(mut handle) if handle.is_running() => {
                tracing::debug!(?kind, id = handle.id, "cancelling task");
                handle.cancel();
                self.progress.dismiss();
                true
            }
            _ => false,
        }
    }

    /// Cancel every running task.
    pub fn cancel_all(&self) {
        let handles: Vec<_> = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, handle)| handle)
            .collect();
        for mut handle in handles {
            if handle.is_running() {
                handle.cancel();
                self.progress.dismiss();
            }
        }
    }

    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .is_some_and(TaskHandle::is_running)
    }
}

impl Drop for TaskSlots {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
