use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::models::FeedArticle;
use crate::engine::state::{DownloadMetrics, StatusMessage};
use crate::news::NewsFeed;
use crate::updater::UpdateCoordinator;

/// Version of the push-event contract between backend and coordinators.
pub const EVENT_PROTOCOL_VERSION: u32 = 1;

/// Envelope for every backend-pushed notification. `seq` is assigned by the
/// emitting side and increases monotonically across all event kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BackendEvent {
    pub version: u32,
    pub seq: u64,
    pub payload: EventPayload,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    /// Replaces the whole status slice of the update session.
    UpdateStatus(UpdateStatusEvent),
    UpdateCompleted,
    UpdateFailed { reason: String },
    CancellationCompleted,
    CancellationFailed { reason: String },
    /// Replaces the whole article list.
    FeedUpdated { articles: Vec<FeedArticle> },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateStatusEvent {
    pub message: StatusMessage,
    pub progress: f32,
    #[serde(default)]
    pub download: Option<DownloadMetrics>,
    #[serde(default = "default_can_cancel")]
    pub can_cancel: bool,
}

fn default_can_cancel() -> bool {
    true
}

impl BackendEvent {
    /// Decode one JSON-encoded event, rejecting other protocol versions.
    pub fn from_json(line: &str) -> Result<Self, String> {
        let event: BackendEvent =
            serde_json::from_str(line).map_err(|err| format!("invalid event: {err}"))?;
        if event.version != EVENT_PROTOCOL_VERSION {
            return Err(format!(
                "unsupported event protocol version {} (expected {EVENT_PROTOCOL_VERSION})",
                event.version
            ));
        }
        Ok(event)
    }
}

/// Sending half handed to the backend.
#[derive(Clone, Debug)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<BackendEvent>,
    seq: Arc<AtomicU64>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BackendEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let sink = Self {
            tx,
            seq: Arc::new(AtomicU64::new(0)),
        };
        (sink, rx)
    }

    /// Stamp and send a payload. Returns `false` once the ingestor is gone.
    pub fn emit(&self, payload: EventPayload) -> bool {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx
            .send(BackendEvent {
                version: EVENT_PROTOCOL_VERSION,
                seq,
                payload,
            })
            .is_ok()
    }
}

/// Routes pushed events to the component owning the affected state slice.
pub struct EventIngestor {
    rx: mpsc::UnboundedReceiver<BackendEvent>,
    updates: Arc<UpdateCoordinator>,
    feed: Arc<NewsFeed>,
}

impl EventIngestor {
    pub fn new(
        rx: mpsc::UnboundedReceiver<BackendEvent>,
        updates: Arc<UpdateCoordinator>,
        feed: Arc<NewsFeed>,
    ) -> Self {
        Self { rx, updates, feed }
    }

    /// Apply one event. Returns whether any state changed.
    pub fn ingest(&self, event: BackendEvent) -> bool {
        if event.version != EVENT_PROTOCOL_VERSION {
            warn!(
                "events: dropping seq {} with protocol version {}",
                event.seq, event.version
            );
            return false;
        }
        match event.payload {
            EventPayload::FeedUpdated { articles } => self.feed.apply(event.seq, articles),
            payload => self.updates.apply(event.seq, payload),
        }
    }

    /// Apply everything already queued without waiting.
    pub fn drain(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.rx.try_recv() {
            if self.ingest(event) {
                applied += 1;
            }
        }
        applied
    }

    /// Wait for the next event and apply it. Returns `None` once every sink is dropped.
    pub async fn next(&mut self) -> Option<BackendEvent> {
        let event = self.rx.recv().await?;
        self.ingest(event.clone());
        Some(event)
    }

    pub async fn run(mut self) {
        while self.next().await.is_some() {}
        debug!("events: all sinks closed, ingestor stopping");
    }
}
