use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::time::Instant;

use crate::{
	Error, Result, SiftService,
	analytics::{AnalyticsEvent, EventStatus},
	cache,
	chat::{self, ChatTurn, CompletionRequest},
	context::{self, ContextBudget},
	hits::RetrievalHit,
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AskRequest {
	#[serde(default)]
	pub question: String,
	#[serde(default)]
	pub model: Option<String>,
	#[serde(default)]
	pub messages: Vec<ChatTurn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskResponse {
	pub answer: String,
	pub sources: Vec<RetrievalHit>,
}

/// Stage timings reached so far. A stage that did not finish stays `None`.
#[derive(Default)]
struct Timings {
	vector_ms: Option<u64>,
	llm_ms: Option<u64>,
}

impl SiftService {
	/// Answers one question from retrieved profile context.
	///
	/// Every outcome is reported to analytics. Errors are not retried here; the providers
	/// already retry transient failures.
	pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
		let started = Instant::now();
		let model = chat::pick_model(request.model.as_deref(), &self.cfg.providers.llm);
		let mut timings = Timings::default();

		match self.answer(&request, &model, &mut timings).await {
			Ok((response, question)) => {
				let total_ms = elapsed_ms(started);

				tracing::info!(
					%model,
					total_ms,
					vector_ms = timings.vector_ms.unwrap_or(0),
					llm_ms = timings.llm_ms.unwrap_or(0),
					sources = response.sources.len(),
					"Answered question."
				);

				self.analytics.record(AnalyticsEvent {
					timestamp: OffsetDateTime::now_utc(),
					status: EventStatus::Success,
					model,
					query_hash: cache::stable_hash(&question),
					query_sample: Some(self.query_sample(&question)),
					total_ms,
					vector_ms: timings.vector_ms,
					llm_ms: timings.llm_ms,
					source_types: distinct_source_types(&response.sources),
					error_message: None,
				});

				Ok(response)
			},
			Err(err) => {
				let total_ms = elapsed_ms(started);

				tracing::warn!(%model, total_ms, error = %err, "Failed to answer question.");

				self.analytics.record(AnalyticsEvent {
					timestamp: OffsetDateTime::now_utc(),
					status: EventStatus::Error,
					model,
					query_hash: cache::stable_hash(&request.question),
					query_sample: Some(self.query_sample(&request.question)),
					total_ms,
					vector_ms: timings.vector_ms,
					llm_ms: timings.llm_ms,
					source_types: Vec::new(),
					error_message: Some(err.user_message()),
				});

				Err(err)
			},
		}
	}

	async fn answer(
		&self,
		request: &AskRequest,
		model: &str,
		timings: &mut Timings,
	) -> Result<(AskResponse, String)> {
		let rag = &self.cfg.rag;
		let question = context::normalize_question(&request.question);

		if question.is_empty() {
			return Err(Error::Validation { message: "Please enter a question.".to_string() });
		}
		if question.chars().count() > rag.max_question_chars as usize {
			return Err(Error::Validation {
				message: "Your question is too long. Please shorten it and try again.".to_string(),
			});
		}

		let history = chat::sanitize_history(&request.messages, rag);
		let vector_started = Instant::now();
		let mut hits = self.search(&question, rag.top_k).await?;
		timings.vector_ms = Some(elapsed_ms(vector_started));

		hits.truncate(rag.sources_to_return as usize);

		if hits.is_empty() {
			let response =
				AskResponse { answer: self.persona.not_found_answer().to_string(), sources: Vec::new() };

			timings.llm_ms = Some(0);

			return Ok((response, question));
		}

		let context = context::build_context(&hits, ContextBudget::from_config(rag), &self.persona);
		let llm_started = Instant::now();
		let answer = self
			.complete(CompletionRequest { model, question: &question, context: &context, history: &history })
			.await?;
		timings.llm_ms = Some(elapsed_ms(llm_started));

		Ok((AskResponse { answer, sources: hits }, question))
	}

	fn query_sample(&self, question: &str) -> String {
		question.chars().take(self.cfg.rag.query_sample_chars as usize).collect()
	}
}

fn elapsed_ms(started: Instant) -> u64 {
	u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Source types in order of first appearance.
pub fn distinct_source_types(hits: &[RetrievalHit]) -> Vec<String> {
	let mut seen: Vec<String> = Vec::new();

	for hit in hits {
		let source_type = hit.source_type();

		if !seen.iter().any(|known| known == source_type) {
			seen.push(source_type.to_string());
		}
	}

	seen
}
