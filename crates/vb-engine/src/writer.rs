//! Debounced persistence
//!
//! Slider edits arrive far faster than the store should be written. The
//! writer keeps the latest value per `(map, key)` and, once no edit has
//! arrived for the debounce window, writes all of them in one read-modify-write
//! cycle. A failed cycle is logged and dropped; the edits were already applied
//! to the tab, so nothing is retried.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Duration, Instant};

use vb_core::{Boost, MapKind};

use crate::config::WriterConfig;
use crate::store::{transact, RuleStore, StoreError};

const SAVED_CHANNEL_CAPACITY: usize = 64;

/// One entry that reached the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedEntry {
    pub kind: MapKind,
    pub key: String,
    pub boost: Boost,
}

enum Command {
    Save { kind: MapKind, key: String, boost: Boost },
    Flush(oneshot::Sender<Result<usize, StoreError>>),
}

/// Handle to the background writer task.
pub struct PersistenceWriter {
    commands: mpsc::UnboundedSender<Command>,
    saved: broadcast::Sender<SavedEntry>,
    task: JoinHandle<()>,
}

impl PersistenceWriter {
    /// Spawn the writer on the current tokio runtime.
    pub fn spawn(store: Arc<dyn RuleStore>, config: WriterConfig) -> Self {
        let (commands, rx) = mpsc::unbounded_channel();
        let (saved, _) = broadcast::channel(SAVED_CHANNEL_CAPACITY);
        let task = tokio::spawn(run(store, config.debounce(), rx, saved.clone()));
        Self {
            commands,
            saved,
            task,
        }
    }

    /// Queue `map[key] = boost`. Restarts the debounce window.
    pub fn schedule_save(&self, kind: MapKind, key: impl Into<String>, boost: Boost) {
        let key = key.into();
        if self
            .commands
            .send(Command::Save { kind, key, boost })
            .is_err()
        {
            log::warn!("persistence writer stopped; edit dropped");
        }
    }

    /// Write everything pending now. Returns the number of entries written.
    pub async fn flush(&self) -> Result<usize, StoreError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(Command::Flush(tx))
            .map_err(|_| StoreError::Unavailable)?;
        rx.await.map_err(|_| StoreError::Unavailable)?
    }

    /// Entries as they are written.
    pub fn subscribe(&self) -> broadcast::Receiver<SavedEntry> {
        self.saved.subscribe()
    }

    /// Stop the writer, writing whatever is still pending.
    pub async fn close(self) {
        drop(self.commands);
        if let Err(e) = self.task.await {
            log::warn!("persistence writer task failed: {}", e);
        }
    }
}

async fn run(
    store: Arc<dyn RuleStore>,
    debounce: Duration,
    mut commands: mpsc::UnboundedReceiver<Command>,
    saved: broadcast::Sender<SavedEntry>,
) {
    let mut pending: HashMap<(MapKind, String), Boost> = HashMap::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = async move {
            match deadline {
                Some(at) => sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Save { kind, key, boost }) => {
                    pending.insert((kind, key), boost);
                    deadline = Some(Instant::now() + debounce);
                }
                Some(Command::Flush(reply)) => {
                    deadline = None;
                    let result = write_pending(store.as_ref(), &mut pending, &saved).await;
                    let _ = reply.send(result);
                }
                None => {
                    if !pending.is_empty() {
                        let _ = write_pending(store.as_ref(), &mut pending, &saved).await;
                    }
                    break;
                }
            },
            _ = timer => {
                deadline = None;
                let _ = write_pending(store.as_ref(), &mut pending, &saved).await;
            }
        }
    }
}

async fn write_pending(
    store: &dyn RuleStore,
    pending: &mut HashMap<(MapKind, String), Boost>,
    saved: &broadcast::Sender<SavedEntry>,
) -> Result<usize, StoreError> {
    if pending.is_empty() {
        return Ok(0);
    }
    let entries: Vec<SavedEntry> = pending
        .drain()
        .map(|((kind, key), boost)| SavedEntry { kind, key, boost })
        .collect();

    let result = transact(store, |snapshot| {
        for entry in &entries {
            snapshot.map_mut(entry.kind).insert(entry.key.clone(), entry.boost);
        }
    })
    .await;

    match result {
        Ok(()) => {
            log::debug!("persisted {} entries", entries.len());
            let count = entries.len();
            for entry in entries {
                // No subscribers is fine
                let _ = saved.send(entry);
            }
            Ok(count)
        }
        Err(e) => {
            log::warn!("failed to persist {} entries: {}", entries.len(), e);
            Err(e)
        }
    }
}
