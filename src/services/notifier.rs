// src/services/notifier.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::models::RankChangeEvent;

/// Transport boundary for rank-change events. Implemented outside the engine
/// by a WebSocket/SSE broadcaster or a pub/sub publisher.
#[async_trait]
pub trait UpdateSink: Send + Sync {
    async fn notify(&self, event: RankChangeEvent) -> anyhow::Result<()>;
}

/// Sink that discards every event. Valid for tests and single-process runs.
pub struct NoopSink;

#[async_trait]
impl UpdateSink for NoopSink {
    async fn notify(&self, _event: RankChangeEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Decouples rank-change delivery from the submission path.
///
/// Events are queued into a bounded channel and forwarded to the sink by a
/// background task. A full queue drops the event with a warning; a failing
/// sink is logged. Neither ever fails `submit()`.
pub struct UpdateNotifier {
    tx: RwLock<Option<mpsc::Sender<RankChangeEvent>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    dropped: AtomicU64,
}

impl UpdateNotifier {
    pub fn new(sink: Arc<dyn UpdateSink>, queue_len: usize) -> Self {
        let (tx, mut rx) = mpsc::channel::<RankChangeEvent>(queue_len.max(1));
        let forwarder = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(err) = sink.notify(event).await {
                    warn!(error = %err, "update sink rejected rank-change event");
                }
            }
        });
        Self {
            tx: RwLock::new(Some(tx)),
            forwarder: Mutex::new(Some(forwarder)),
            dropped: AtomicU64::new(0),
        }
    }

    /// Best-effort enqueue; never blocks.
    pub async fn notify(&self, event: RankChangeEvent) {
        let tx = self.tx.read().await;
        let delivered = match tx.as_ref() {
            Some(tx) => tx.try_send(event).is_ok(),
            None => false,
        };
        if !delivered {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            warn!("rank-change queue unavailable or full, dropping event");
        }
    }

    /// Events dropped due to backpressure or shutdown.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Close the queue and wait for already-queued events to drain.
    pub async fn shutdown(&self) {
        self.tx.write().await.take();
        if let Some(forwarder) = self.forwarder.lock().await.take() {
            let _ = forwarder.await;
        }
    }
}
