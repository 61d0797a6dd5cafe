pub mod analytics;
pub mod ask;
pub mod cache;
pub mod chat;
pub mod compare;
pub mod context;
pub mod format;
pub mod hits;
pub mod interview;
pub mod persona;
pub mod retrieval;
pub mod sections;
pub mod time_serde;

mod error;

pub use analytics::{AnalyticsEvent, AnalyticsRecorder, AnalyticsStore, AnalyticsSummary, EventStatus};
pub use ask::{AskRequest, AskResponse};
pub use chat::ChatTurn;
pub use compare::{JobComparison, JobComparisonRequest};
pub use error::{Error, Result};
pub use hits::{ProfileEntryType, RetrievalHit, SourceMetadata};
pub use interview::{InterviewQuestion, InterviewRequest, InterviewSimulation, QuestionCategory};
pub use sections::ProfileSection;

use std::{future::Future, pin::Pin, sync::Arc, time::Duration};

use analytics::{MemoryStore, RedisStore};
use cache::RagCache;
use persona::PersonaProfile;
use sift_config::{Config, LlmProviderConfig, VectorProviderConfig};
use sift_providers::{
	chat::{self as chat_provider, ChatMessage},
	vector::{self, VectorMatch},
};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait VectorSearch
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		cfg: &'a VectorProviderConfig,
		text: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, sift_providers::Result<Vec<VectorMatch>>>;
}

pub trait ChatCompletion
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		model: &'a str,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, sift_providers::Result<Option<String>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub vector: Arc<dyn VectorSearch>,
	pub chat: Arc<dyn ChatCompletion>,
}
impl Providers {
	pub fn new(vector: Arc<dyn VectorSearch>, chat: Arc<dyn ChatCompletion>) -> Self {
		Self { vector, chat }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { vector: provider.clone(), chat: provider }
	}
}

struct DefaultProviders;
impl VectorSearch for DefaultProviders {
	fn query<'a>(
		&'a self,
		cfg: &'a VectorProviderConfig,
		text: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, sift_providers::Result<Vec<VectorMatch>>> {
		Box::pin(vector::query(cfg, text, top_k))
	}
}
impl ChatCompletion for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		model: &'a str,
		messages: &'a [ChatMessage],
	) -> BoxFuture<'a, sift_providers::Result<Option<String>>> {
		Box::pin(chat_provider::complete(cfg, model, messages))
	}
}

/// Shared per-process state behind every endpoint. Must be built inside a Tokio runtime,
/// since it starts the analytics task.
pub struct SiftService {
	pub cfg: Config,
	pub providers: Providers,
	pub cache: RagCache,
	pub analytics: AnalyticsRecorder,
	persona: PersonaProfile,
}
impl SiftService {
	/// Uses Redis-backed analytics when configured, in-memory analytics otherwise.
	pub fn new(cfg: Config) -> Result<Self> {
		Self::with_providers(cfg, Providers::default())
	}

	pub fn with_providers(cfg: Config, providers: Providers) -> Result<Self> {
		let store: Arc<dyn AnalyticsStore> = if cfg.analytics.redis_url.is_some() {
			Arc::new(RedisStore::new(&cfg.analytics)?)
		} else {
			Arc::new(MemoryStore::new(cfg.analytics.max_events as usize))
		};

		Ok(Self::with_parts(cfg, providers, store))
	}

	pub fn with_parts(cfg: Config, providers: Providers, store: Arc<dyn AnalyticsStore>) -> Self {
		let analytics = AnalyticsRecorder::spawn(
			store,
			cfg.analytics.queue_capacity as usize,
			cfg.analytics.recent_events as usize,
		);
		let cache = RagCache::new(Duration::from_millis(cfg.cache.ttl_ms));
		let persona = PersonaProfile::from_config(&cfg.persona);

		tracing::info!(
			persona = ?cfg.persona.kind,
			redis_analytics = cfg.analytics.redis_url.is_some(),
			"Service initialized."
		);

		Self { cfg, providers, cache, analytics, persona }
	}

	pub fn persona(&self) -> &PersonaProfile {
		&self.persona
	}
}
