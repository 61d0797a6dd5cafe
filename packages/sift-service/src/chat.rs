use serde::{Deserialize, Serialize};

use crate::{Result, SiftService, cache, context};
use sift_config::{LlmProviderConfig, Rag};
use sift_providers::chat::ChatMessage;

/// A caller-supplied conversation turn. Malformed turns are dropped by
/// [`sanitize_history`] rather than rejected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
	#[serde(default)]
	pub role: String,
	#[serde(default)]
	pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
	User,
	Assistant,
}
impl Role {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"user" => Some(Self::User),
			"assistant" => Some(Self::Assistant),
			_ => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			Self::User => "user",
			Self::Assistant => "assistant",
		}
	}
}

/// A history turn that passed sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
	pub role: Role,
	pub content: String,
}
impl HistoryTurn {
	fn to_message(&self) -> ChatMessage {
		match self.role {
			Role::User => ChatMessage::user(self.content.clone()),
			Role::Assistant => ChatMessage::assistant(self.content.clone()),
		}
	}
}

/// Inputs of one completion call.
#[derive(Debug, Clone, Copy)]
pub struct CompletionRequest<'a> {
	pub model: &'a str,
	pub question: &'a str,
	pub context: &'a str,
	pub history: &'a [HistoryTurn],
}

/// Keeps well-formed user/assistant turns, the most recent `max_history_messages`,
/// each whitespace-collapsed and clamped.
pub fn sanitize_history(turns: &[ChatTurn], rag: &Rag) -> Vec<HistoryTurn> {
	let valid: Vec<(Role, &str)> = turns
		.iter()
		.filter_map(|turn| {
			let role = Role::parse(&turn.role)?;

			(!turn.content.trim().is_empty()).then_some((role, turn.content.as_str()))
		})
		.collect();
	let skip = valid.len().saturating_sub(rag.max_history_messages as usize);

	valid
		.into_iter()
		.skip(skip)
		.map(|(role, content)| HistoryTurn {
			role,
			content: context::clamp(
				&context::collapse_whitespace(content),
				rag.max_history_message_chars as usize,
			),
		})
		.collect()
}

/// Resolves the requested model against the allow-list. Aliases are remapped and
/// anything unknown falls back to the default model.
pub fn pick_model(requested: Option<&str>, llm: &LlmProviderConfig) -> String {
	let Some(requested) = requested.map(str::trim).filter(|model| !model.is_empty()) else {
		return llm.default_model.clone();
	};
	let resolved = llm.model_aliases.get(requested).map(String::as_str).unwrap_or(requested);

	if llm.allowed_models.iter().any(|model| model == resolved) {
		return resolved.to_string();
	}

	llm.default_model.clone()
}

/// System prompt, context message, history, then the question as the final user turn.
pub fn build_messages(
	system_prompt: &str,
	context_message: String,
	history: &[HistoryTurn],
	question: &str,
) -> Vec<ChatMessage> {
	let mut messages = Vec::with_capacity(history.len() + 3);

	messages.push(ChatMessage::system(system_prompt));
	messages.push(ChatMessage::system(context_message));
	messages.extend(history.iter().map(HistoryTurn::to_message));
	messages.push(ChatMessage::user(question));

	messages
}

impl SiftService {
	/// Produces an answer for `request`, memoized per model, question, context size and
	/// history fingerprint.
	pub async fn complete(&self, request: CompletionRequest<'_>) -> Result<String> {
		let fingerprint = cache::history_fingerprint(
			request.history,
			self.cfg.rag.history_fingerprint_chars as usize,
		);
		let key = cache::answer_key(
			request.model,
			request.question,
			request.context.chars().count(),
			&fingerprint,
		);

		if let Some(answer) = self.cache.answers.get(&key) {
			tracing::debug!(cache_kind = "answer", model = request.model, "Cache hit.");

			return Ok(answer);
		}

		let messages = build_messages(
			self.persona.system_prompt(),
			self.persona.context_message(request.context),
			request.history,
			request.question,
		);
		let answer = self
			.providers
			.chat
			.complete(&self.cfg.providers.llm, request.model, &messages)
			.await?
			.unwrap_or_else(|| self.persona.empty_answer().to_string());

		self.cache.answers.insert(key, answer.clone(), self.cache.ttl);

		Ok(answer)
	}
}
