//! Best-effort usage analytics.
//!
//! The request path hands events to [`AnalyticsRecorder::record`], which never blocks
//! and never fails. A background task drains the queue into an [`AnalyticsStore`].

mod store;
mod summary;

pub use store::{AnalyticsStore, LifetimeCounters, MemoryStore, RedisStore, StoreSnapshot};
pub use summary::{AnalyticsSummary, HourCount, NamedCount, PopularQuery, summarize};

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
	Success,
	Error,
}
impl EventStatus {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Success => "success",
			Self::Error => "error",
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
	#[serde(with = "crate::time_serde")]
	pub timestamp: OffsetDateTime,
	pub status: EventStatus,
	pub model: String,
	pub query_hash: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub query_sample: Option<String>,
	pub total_ms: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub vector_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub llm_ms: Option<u64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub source_types: Vec<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub error_message: Option<String>,
}

enum Command {
	Record(Box<AnalyticsEvent>),
	Flush(oneshot::Sender<()>),
}

/// Handle to the analytics pipeline. Cloning shares the queue and the store.
#[derive(Clone)]
pub struct AnalyticsRecorder {
	tx: mpsc::Sender<Command>,
	store: Arc<dyn AnalyticsStore>,
	recent_events: usize,
}
impl AnalyticsRecorder {
	/// Starts the persistence task on the current Tokio runtime.
	pub fn spawn(store: Arc<dyn AnalyticsStore>, capacity: usize, recent_events: usize) -> Self {
		let (tx, mut rx) = mpsc::channel(capacity.max(1));
		let worker_store = store.clone();

		tokio::spawn(async move {
			while let Some(command) = rx.recv().await {
				match command {
					Command::Record(event) =>
						if let Err(err) = worker_store.append(&event).await {
							tracing::error!(error = %err, "Failed to persist analytics event.");
						},
					Command::Flush(done) => {
						let _ = done.send(());
					},
				}
			}
		});

		Self { tx, store, recent_events }
	}

	/// Queues `event` for persistence. Drops it with a warning when the queue is full.
	pub fn record(&self, event: AnalyticsEvent) {
		if let Err(err) = self.tx.try_send(Command::Record(Box::new(event))) {
			tracing::warn!(error = %err, "Dropped analytics event.");
		}
	}

	/// Waits until every event queued before this call has been handled.
	pub async fn flush(&self) {
		let (done, wait) = oneshot::channel();

		if self.tx.send(Command::Flush(done)).await.is_ok() {
			let _ = wait.await;
		}
	}

	pub async fn summary(&self) -> AnalyticsSummary {
		self.flush().await;

		let snapshot = match self.store.snapshot().await {
			Ok(snapshot) => snapshot,
			Err(err) => {
				tracing::error!(error = %err, "Failed to read analytics events.");

				StoreSnapshot::default()
			},
		};

		summarize(snapshot, self.recent_events)
	}

	pub async fn clear(&self) {
		self.flush().await;

		if let Err(err) = self.store.clear().await {
			tracing::error!(error = %err, "Failed to clear analytics events.");
		}
	}
}
