use std::{collections::HashMap, sync::Mutex, time::Duration};

use tokio::time::Instant;

use crate::{chat::HistoryTurn, hits::RetrievalHit};

/// Entries above this count trigger a sweep of expired keys on insert.
const SWEEP_THRESHOLD: usize = 1_024;

struct CacheEntry<V> {
	value: V,
	expires_at: Instant,
}

/// Process-local memoization with a fixed lifetime per entry.
///
/// Expired entries are removed lazily when read. Concurrent writers to one key race
/// and the last insert wins.
pub struct TtlCache<V> {
	entries: Mutex<HashMap<String, CacheEntry<V>>>,
}
impl<V> TtlCache<V>
where
	V: Clone,
{
	pub fn new() -> Self {
		Self { entries: Mutex::new(HashMap::new()) }
	}

	pub fn get(&self, key: &str) -> Option<V> {
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());
		let entry = entries.get(key)?;

		if Instant::now() >= entry.expires_at {
			entries.remove(key);

			return None;
		}

		Some(entry.value.clone())
	}

	pub fn insert(&self, key: impl Into<String>, value: V, ttl: Duration) {
		let now = Instant::now();
		let mut entries = self.entries.lock().unwrap_or_else(|err| err.into_inner());

		if entries.len() >= SWEEP_THRESHOLD {
			entries.retain(|_, entry| entry.expires_at > now);
		}

		entries.insert(key.into(), CacheEntry { value, expires_at: now + ttl });
	}

	pub fn len(&self) -> usize {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) {
		self.entries.lock().unwrap_or_else(|err| err.into_inner()).clear();
	}
}
impl<V> Default for TtlCache<V>
where
	V: Clone,
{
	fn default() -> Self {
		Self::new()
	}
}

/// The two caches consulted on the answer path, sharing one lifetime.
pub struct RagCache {
	pub hits: TtlCache<Vec<RetrievalHit>>,
	pub answers: TtlCache<String>,
	pub ttl: Duration,
}
impl RagCache {
	pub fn new(ttl: Duration) -> Self {
		Self { hits: TtlCache::new(), answers: TtlCache::new(), ttl }
	}
}

/// djb2 variant (`hash * 33 ^ unit`, seed 5381) over UTF-16 code units, rendered as
/// unsigned 32-bit hex.
pub fn stable_hash(input: &str) -> String {
	let mut hash: i32 = 5_381;

	for unit in input.encode_utf16() {
		hash = hash.wrapping_mul(33) ^ i32::from(unit);
	}

	format!("{:x}", hash as u32)
}

/// Hashes `role:prefix` of each turn, where `prefix` is the first `chars` characters.
pub fn history_fingerprint(history: &[HistoryTurn], chars: usize) -> String {
	let joined = history
		.iter()
		.map(|turn| {
			let prefix: String = turn.content.chars().take(chars).collect();

			format!("{}:{prefix}", turn.role.as_str())
		})
		.collect::<Vec<_>>()
		.join("\n");

	stable_hash(&joined)
}

/// Keys carry the full query text; only history is reduced to a fingerprint.
pub fn hits_key(top_k: u32, query: &str) -> String {
	format!("hits:{top_k}:{query}")
}

pub fn answer_key(model: &str, question: &str, context_len: usize, fingerprint: &str) -> String {
	format!("answer:{model}:{question}:{context_len}:{fingerprint}")
}
