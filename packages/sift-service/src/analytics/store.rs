use std::{
	collections::{HashMap, VecDeque},
	sync::Mutex,
	time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{AnalyticsEvent, EventStatus};
use crate::{BoxFuture, Error, Result};
use sift_providers::redis::{self, RedisRest};

/// Entries kept per ranking in a snapshot.
pub const TOP_N: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifetimeCounters {
	pub success: u64,
	pub error: u64,
}

/// Everything a summary is computed from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreSnapshot {
	/// Newest first.
	pub events: Vec<AnalyticsEvent>,
	pub lifetime: LifetimeCounters,
	/// `(model, count)`, highest count first.
	pub models: Vec<(String, u64)>,
	/// `(query_hash, count)`, highest count first.
	pub queries: Vec<(String, u64)>,
}

pub trait AnalyticsStore
where
	Self: Send + Sync,
{
	fn append<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<()>>;

	fn snapshot<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot>>;

	fn clear<'a>(&'a self) -> BoxFuture<'a, Result<()>>;
}

#[derive(Default)]
struct MemoryState {
	events: VecDeque<AnalyticsEvent>,
	lifetime: LifetimeCounters,
	models: HashMap<String, u64>,
	queries: HashMap<String, u64>,
}

/// Process-local store used when no Redis endpoint is configured.
///
/// Ranking maps are pruned to the `max_ranked` highest counts once they grow past twice
/// that size, so long-running processes keep a bounded set of distinct queries.
pub struct MemoryStore {
	max_events: usize,
	max_ranked: usize,
	state: Mutex<MemoryState>,
}
impl MemoryStore {
	pub fn new(max_events: usize) -> Self {
		let max_events = max_events.max(1);

		Self {
			max_events,
			max_ranked: max_events.max(TOP_N),
			state: Mutex::new(MemoryState::default()),
		}
	}
}
impl AnalyticsStore for MemoryStore {
	fn append<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<()>> {
		let mut state = self.state.lock().unwrap_or_else(|err| err.into_inner());

		state.events.push_front(event.clone());
		state.events.truncate(self.max_events);

		match event.status {
			EventStatus::Success => state.lifetime.success += 1,
			EventStatus::Error => state.lifetime.error += 1,
		}

		*state.models.entry(event.model.clone()).or_default() += 1;
		*state.queries.entry(event.query_hash.clone()).or_default() += 1;

		prune_counts(&mut state.models, self.max_ranked);
		prune_counts(&mut state.queries, self.max_ranked);

		Box::pin(async { Ok(()) })
	}

	fn snapshot<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot>> {
		let state = self.state.lock().unwrap_or_else(|err| err.into_inner());
		let snapshot = StoreSnapshot {
			events: state.events.iter().cloned().collect(),
			lifetime: state.lifetime,
			models: top_counts(&state.models),
			queries: top_counts(&state.queries),
		};

		Box::pin(async move { Ok(snapshot) })
	}

	fn clear<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		*self.state.lock().unwrap_or_else(|err| err.into_inner()) = MemoryState::default();

		Box::pin(async { Ok(()) })
	}
}

fn top_counts(counts: &HashMap<String, u64>) -> Vec<(String, u64)> {
	ranked_counts(counts, TOP_N)
}

fn ranked_counts(counts: &HashMap<String, u64>, keep: usize) -> Vec<(String, u64)> {
	let mut ranked: Vec<(String, u64)> =
		counts.iter().map(|(key, count)| (key.clone(), *count)).collect();

	ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
	ranked.truncate(keep);

	ranked
}

fn prune_counts(counts: &mut HashMap<String, u64>, keep: usize) {
	if counts.len() <= keep.saturating_mul(2) {
		return;
	}

	*counts = ranked_counts(counts, keep).into_iter().collect();
}

/// Upstash Redis layout under `key`:
///
/// - `{key}:events`: list of JSON events, newest first, capped and expiring
/// - `{key}:counters`: hash of lifetime `success` / `error` counts
/// - `{key}:models`, `{key}:queries`: sorted sets of per-model and per-query-hash counts
pub struct RedisStore {
	client: RedisRest,
	key: String,
	max_events: u32,
	ttl_seconds: u64,
}
impl RedisStore {
	pub fn new(cfg: &sift_config::Analytics) -> Result<Self> {
		let (Some(url), Some(token)) = (cfg.redis_url.as_deref(), cfg.redis_token.as_deref()) else {
			return Err(Error::Configuration {
				message: "Redis analytics requires both a URL and a token.".to_string(),
			});
		};
		let client = RedisRest::new(url, token, Duration::from_millis(cfg.timeout_ms))?;

		Ok(Self {
			client,
			key: cfg.key.clone(),
			max_events: cfg.max_events,
			ttl_seconds: cfg.ttl_seconds,
		})
	}

	fn key(&self, suffix: &str) -> String {
		format!("{}:{suffix}", self.key)
	}

	async fn append_inner(&self, event: &AnalyticsEvent) -> Result<()> {
		let payload = serde_json::to_string(event)
			.map_err(|err| Error::Analytics { message: err.to_string() })?;
		let events = self.key("events");
		let commands = vec![
			command(&["LPUSH", &events, &payload]),
			command(&["LTRIM", &events, "0", &(self.max_events.saturating_sub(1)).to_string()]),
			command(&["EXPIRE", &events, &self.ttl_seconds.to_string()]),
			command(&["HINCRBY", &self.key("counters"), event.status.as_str(), "1"]),
			command(&["ZINCRBY", &self.key("models"), "1", &event.model]),
			command(&["ZINCRBY", &self.key("queries"), "1", &event.query_hash]),
		];

		self.client.pipeline(&commands).await.map_err(analytics_error)?;

		Ok(())
	}

	async fn snapshot_inner(&self) -> Result<StoreSnapshot> {
		let top = (TOP_N - 1).to_string();
		let commands = vec![
			command(&["LRANGE", &self.key("events"), "0", "-1"]),
			command(&["HGETALL", &self.key("counters")]),
			command(&["ZRANGE", &self.key("models"), "0", &top, "REV", "WITHSCORES"]),
			command(&["ZRANGE", &self.key("queries"), "0", &top, "REV", "WITHSCORES"]),
		];
		let replies = self.client.pipeline(&commands).await.map_err(analytics_error)?;
		let [events, counters, models, queries] = replies.as_slice() else {
			return Err(Error::Analytics {
				message: format!("Expected 4 pipeline replies, got {}.", replies.len()),
			});
		};

		Ok(StoreSnapshot {
			events: parse_events(events),
			lifetime: parse_counters(counters),
			models: parse_ranking(models),
			queries: parse_ranking(queries),
		})
	}

	async fn clear_inner(&self) -> Result<()> {
		let keys = ["events", "counters", "models", "queries"].map(|suffix| self.key(suffix));
		let mut args = vec!["DEL".to_string()];

		args.extend(keys);

		let reply = self.client.command(&args).await.map_err(analytics_error)?;

		tracing::debug!(removed = redis::as_i64(&reply).unwrap_or(0), "Cleared analytics keys.");

		Ok(())
	}
}
impl AnalyticsStore for RedisStore {
	fn append<'a>(&'a self, event: &'a AnalyticsEvent) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.append_inner(event))
	}

	fn snapshot<'a>(&'a self) -> BoxFuture<'a, Result<StoreSnapshot>> {
		Box::pin(self.snapshot_inner())
	}

	fn clear<'a>(&'a self) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.clear_inner())
	}
}

fn command(parts: &[&str]) -> Vec<String> {
	parts.iter().map(|part| part.to_string()).collect()
}

fn analytics_error(err: sift_providers::Error) -> Error {
	Error::Analytics { message: err.to_string() }
}

fn parse_events(reply: &Value) -> Vec<AnalyticsEvent> {
	let Some(items) = reply.as_array() else { return Vec::new() };

	items
		.iter()
		.filter_map(|item| {
			let parsed = match item {
				Value::String(raw) => serde_json::from_str(raw),
				other => serde_json::from_value(other.clone()),
			};

			match parsed {
				Ok(event) => Some(event),
				Err(err) => {
					tracing::warn!(error = %err, "Skipping malformed analytics event.");

					None
				},
			}
		})
		.collect()
}

fn parse_counters(reply: &Value) -> LifetimeCounters {
	let mut counters = LifetimeCounters::default();

	for (field, value) in redis::as_pairs(reply) {
		let count = value.parse::<u64>().unwrap_or(0);

		match field.as_str() {
			"success" => counters.success = count,
			"error" => counters.error = count,
			_ => {},
		}
	}

	counters
}

fn parse_ranking(reply: &Value) -> Vec<(String, u64)> {
	redis::as_pairs(reply)
		.into_iter()
		.map(|(member, score)| (member, score.parse::<f64>().map(|score| score as u64).unwrap_or(0)))
		.collect()
}

#[cfg(test)]
mod tests {
	use time::OffsetDateTime;

	use super::*;

	fn event(model: &str, hash: &str, status: EventStatus) -> AnalyticsEvent {
		AnalyticsEvent {
			timestamp: OffsetDateTime::UNIX_EPOCH,
			status,
			model: model.to_string(),
			query_hash: hash.to_string(),
			query_sample: None,
			total_ms: 1,
			vector_ms: None,
			llm_ms: None,
			source_types: Vec::new(),
			error_message: None,
		}
	}

	#[tokio::test]
	async fn memory_store_caps_events_but_not_counters() {
		let store = MemoryStore::new(2);

		for hash in ["a", "b", "c"] {
			store.append(&event("m", hash, EventStatus::Success)).await.expect("append");
		}

		let snapshot = store.snapshot().await.expect("snapshot");

		assert_eq!(snapshot.events.len(), 2);
		assert_eq!(snapshot.events[0].query_hash, "c");
		assert_eq!(snapshot.lifetime.success, 3);
		assert_eq!(snapshot.models, vec![("m".to_string(), 3)]);
	}

	#[tokio::test]
	async fn memory_store_prunes_rare_queries() {
		let store = MemoryStore::new(10);

		for _ in 0..3 {
			store.append(&event("m", "hot", EventStatus::Success)).await.expect("append");
		}
		for index in 0..50 {
			store.append(&event("m", &format!("q{index}"), EventStatus::Success)).await.expect("append");
		}

		let queries = store.state.lock().expect("lock").queries.len();

		assert!(queries <= 20, "expected pruned rankings, got {queries}");

		let snapshot = store.snapshot().await.expect("snapshot");

		assert_eq!(snapshot.queries[0], ("hot".to_string(), 3));
		assert_eq!(snapshot.models, vec![("m".to_string(), 53)]);
		assert_eq!(snapshot.lifetime.success, 53);
	}

	#[test]
	fn ranks_by_count_then_name() {
		let counts = HashMap::from([
			("b".to_string(), 2),
			("a".to_string(), 2),
			("c".to_string(), 5),
		]);

		assert_eq!(
			top_counts(&counts),
			vec![("c".to_string(), 5), ("a".to_string(), 2), ("b".to_string(), 2)]
		);
	}

	#[test]
	fn parses_redis_replies() {
		let raw = serde_json::to_string(&event("m", "h", EventStatus::Error)).expect("serialize");
		let events = parse_events(&serde_json::json!([raw, "not json"]));

		assert_eq!(events.len(), 1);
		assert_eq!(events[0].status, EventStatus::Error);

		let counters = parse_counters(&serde_json::json!(["success", "7", "error", "2"]));

		assert_eq!(counters, LifetimeCounters { success: 7, error: 2 });
		assert_eq!(
			parse_ranking(&serde_json::json!(["llama", "4", "mixtral", 1.0])),
			vec![("llama".to_string(), 4), ("mixtral".to_string(), 1)]
		);
	}
}
