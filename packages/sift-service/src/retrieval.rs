use crate::{Error, Result, SiftService, cache, context, hits::RetrievalHit};
use sift_config::MAX_TOP_K;

impl SiftService {
	/// Top-`top_k` similarity search. Results keep the upstream order and are memoized per
	/// `(top_k, normalized query)`.
	pub async fn search(&self, query: &str, top_k: u32) -> Result<Vec<RetrievalHit>> {
		if !(1..=MAX_TOP_K).contains(&top_k) {
			return Err(Error::Validation {
				message: format!("top_k must be between 1 and {MAX_TOP_K}."),
			});
		}

		let query = context::normalize_question(query);

		if query.is_empty() {
			return Err(Error::Validation { message: "Query must be non-empty.".to_string() });
		}

		let key = cache::hits_key(top_k, &query);

		if let Some(hits) = self.cache.hits.get(&key) {
			tracing::debug!(cache_kind = "hits", top_k, "Cache hit.");

			return Ok(hits);
		}

		let rows = self.providers.vector.query(&self.cfg.providers.vector, &query, top_k).await?;
		let hits: Vec<RetrievalHit> = rows.into_iter().map(RetrievalHit::from).collect();

		self.cache.hits.insert(key, hits.clone(), self.cache.ttl);

		Ok(hits)
	}
}
