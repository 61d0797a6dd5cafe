use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::{AnalyticsEvent, EventStatus, LifetimeCounters, StoreSnapshot, store::TOP_N};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedCount {
	pub name: String,
	pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularQuery {
	pub hash: String,
	/// Sample text of the newest stored event with this hash, when one survives.
	pub sample: Option<String>,
	pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCount {
	pub hour: u8,
	pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
	pub total_queries: u64,
	pub success_count: u64,
	pub error_count: u64,
	/// Percentage in `0.0..=100.0`.
	pub success_rate: f64,
	pub avg_total_ms: f64,
	pub p95_total_ms: u64,
	pub avg_vector_ms: f64,
	pub avg_llm_ms: f64,
	pub top_models: Vec<NamedCount>,
	pub top_source_types: Vec<NamedCount>,
	pub popular_queries: Vec<PopularQuery>,
	pub recent_events: Vec<AnalyticsEvent>,
	/// Always 24 buckets, hour 0 first, in UTC.
	pub hourly_distribution: Vec<HourCount>,
	pub lifetime: LifetimeCounters,
}

/// Aggregates the stored window. Counts and timings cover the retained events only;
/// `lifetime`, `top_models` and `popular_queries` come from the store's counters.
pub fn summarize(snapshot: StoreSnapshot, recent: usize) -> AnalyticsSummary {
	let StoreSnapshot { events, lifetime, models, queries } = snapshot;
	let successes: Vec<&AnalyticsEvent> =
		events.iter().filter(|event| event.status == EventStatus::Success).collect();
	let success_count = successes.len() as u64;
	let total_queries = events.len() as u64;
	let success_rate = if total_queries == 0 {
		0.0
	} else {
		success_count as f64 / total_queries as f64 * 100.0
	};
	let mut hours = [0_u64; 24];

	for event in &events {
		hours[usize::from(event.timestamp.to_offset(time::UtcOffset::UTC).hour())] += 1;
	}

	let popular_queries = queries
		.into_iter()
		.map(|(hash, count)| PopularQuery {
			sample: events
				.iter()
				.find(|event| event.query_hash == hash)
				.and_then(|event| event.query_sample.clone()),
			hash,
			count,
		})
		.collect();

	AnalyticsSummary {
		total_queries,
		success_count,
		error_count: total_queries - success_count,
		success_rate,
		avg_total_ms: mean(successes.iter().map(|event| event.total_ms)),
		p95_total_ms: p95(successes.iter().map(|event| event.total_ms).collect()),
		avg_vector_ms: mean(successes.iter().filter_map(|event| event.vector_ms)),
		avg_llm_ms: mean(successes.iter().filter_map(|event| event.llm_ms)),
		top_models: models.into_iter().map(|(name, count)| NamedCount { name, count }).collect(),
		top_source_types: source_type_counts(&successes),
		popular_queries,
		recent_events: events.iter().take(recent).cloned().collect(),
		hourly_distribution: hours
			.iter()
			.enumerate()
			.map(|(hour, count)| HourCount { hour: hour as u8, count: *count })
			.collect(),
		lifetime,
	}
}

fn mean(values: impl Iterator<Item = u64>) -> f64 {
	let (sum, count) = values.fold((0_u64, 0_u64), |(sum, count), value| (sum + value, count + 1));

	if count == 0 { 0.0 } else { sum as f64 / count as f64 }
}

/// Nearest-rank 95th percentile.
fn p95(mut values: Vec<u64>) -> u64 {
	if values.is_empty() {
		return 0;
	}

	values.sort_unstable();

	let rank = (values.len() as f64 * 0.95).ceil() as usize;

	values[rank.clamp(1, values.len()) - 1]
}

fn source_type_counts(events: &[&AnalyticsEvent]) -> Vec<NamedCount> {
	let mut counts: HashMap<&str, u64> = HashMap::new();

	for event in events {
		for source_type in &event.source_types {
			*counts.entry(source_type.as_str()).or_default() += 1;
		}
	}

	let mut ranked: Vec<NamedCount> = counts
		.into_iter()
		.map(|(name, count)| NamedCount { name: name.to_string(), count })
		.collect();

	ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
	ranked.truncate(TOP_N);

	ranked
}
