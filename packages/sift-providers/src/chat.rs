use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use crate::{
	Error, Result,
	retry::{self, RetryPolicy},
};
use sift_config::{ENV_LLM_API_KEY, LlmProviderConfig};

pub const LABEL: &str = "Chat completion";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
	pub role: &'static str,
	pub content: String,
}
impl ChatMessage {
	pub fn system(content: impl Into<String>) -> Self {
		Self { role: "system", content: content.into() }
	}

	pub fn user(content: impl Into<String>) -> Self {
		Self { role: "user", content: content.into() }
	}

	pub fn assistant(content: impl Into<String>) -> Self {
		Self { role: "assistant", content: content.into() }
	}
}

/// Sends `messages` to the chat-completions endpoint and returns the first choice's
/// text. `None` means the upstream answered without usable content.
pub async fn complete(
	cfg: &LlmProviderConfig,
	model: &str,
	messages: &[ChatMessage],
) -> Result<Option<String>> {
	if cfg.api_key.trim().is_empty() {
		return Err(Error::Configuration {
			message: format!("LLM API key is not configured. Set {ENV_LLM_API_KEY}."),
		});
	}

	let timeout = Duration::from_millis(cfg.timeout_ms);
	let client = Client::builder().build()?;
	let url = crate::join_url(&cfg.api_base, &cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let body = serde_json::json!({
		"model": model,
		"messages": messages,
		"temperature": cfg.temperature,
		"max_tokens": cfg.max_tokens,
	});
	let policy = RetryPolicy::from_config(LABEL, &cfg.retry);
	let res = retry::fetch_with_retry(&policy, || {
		retry::fetch_with_timeout(
			timeout,
			client.post(&url).headers(headers.clone()).json(&body).send(),
		)
	})
	.await?;
	let status = res.status();

	if !status.is_success() {
		let body = res.text().await.unwrap_or_default();

		return Err(Error::UpstreamHttp {
			label: LABEL.to_string(),
			status: status.as_u16(),
			body: body.trim().to_string(),
		});
	}

	let json: Value = res.json().await?;

	Ok(parse_completion_response(&json))
}

fn parse_completion_response(json: &Value) -> Option<String> {
	json.get("choices")
		.and_then(Value::as_array)
		.and_then(|choices| choices.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|message| message.get("content"))
		.and_then(Value::as_str)
		.map(str::trim)
		.filter(|content| !content.is_empty())
		.map(str::to_string)
}
