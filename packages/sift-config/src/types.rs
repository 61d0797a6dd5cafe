use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
	pub service: Service,
	pub providers: Providers,
	#[serde(default)]
	pub rag: Rag,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub persona: Persona,
	#[serde(default)]
	pub analytics: Analytics,
	#[serde(default)]
	pub security: Security,
	pub mcp: Option<Mcp>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub mcp_bind: String,
	pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Providers {
	pub vector: VectorProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorProviderConfig {
	pub provider_id: String,
	/// Usually supplied through `UPSTASH_VECTOR_REST_URL`.
	#[serde(default)]
	pub api_base: String,
	/// Usually supplied through `UPSTASH_VECTOR_REST_TOKEN`.
	#[serde(default)]
	pub api_key: String,
	#[serde(default = "default_vector_path")]
	pub path: String,
	#[serde(default = "default_vector_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_vector_retry")]
	pub retry: RetryConfig,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	/// Usually supplied through `GROQ_API_KEY`.
	#[serde(default)]
	pub api_key: String,
	#[serde(default = "default_llm_path")]
	pub path: String,
	pub default_model: String,
	pub allowed_models: Vec<String>,
	/// Legacy or retired model ids mapped onto a current entry of `allowed_models`.
	#[serde(default)]
	pub model_aliases: HashMap<String, String>,
	pub temperature: f32,
	pub max_tokens: u32,
	#[serde(default = "default_llm_timeout_ms")]
	pub timeout_ms: u64,
	#[serde(default = "default_llm_retry")]
	pub retry: RetryConfig,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
	/// Total attempts, including the first one.
	pub retries: u32,
	pub initial_backoff_ms: u64,
	pub backoff_factor: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Rag {
	pub top_k: u32,
	pub sources_to_return: u32,
	pub max_question_chars: u32,
	pub max_doc_chars: u32,
	pub max_total_context_chars: u32,
	pub max_history_messages: u32,
	pub max_history_message_chars: u32,
	pub history_fingerprint_chars: u32,
	pub query_sample_chars: u32,
}
impl Default for Rag {
	fn default() -> Self {
		Self {
			top_k: 8,
			sources_to_return: 5,
			max_question_chars: 2_000,
			max_doc_chars: 1_400,
			max_total_context_chars: 6_000,
			max_history_messages: 10,
			max_history_message_chars: 800,
			history_fingerprint_chars: 120,
			query_sample_chars: 60,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub ttl_ms: u64,
}
impl Default for Cache {
	fn default() -> Self {
		Self { ttl_ms: 60_000 }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PersonaKind {
	#[default]
	Interview,
	Food,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Persona {
	pub kind: PersonaKind,
	/// Usually supplied through `OWNER_NAME`.
	pub owner_name: String,
	/// Replaces the built-in system prompt for `kind` when set.
	pub system_prompt: Option<String>,
	/// Answer returned when retrieval yields nothing.
	pub not_found_answer: Option<String>,
	/// Answer returned when the model produces no text.
	pub empty_answer: Option<String>,
}
impl Default for Persona {
	fn default() -> Self {
		Self {
			kind: PersonaKind::Interview,
			owner_name: "Digital Twin".to_string(),
			system_prompt: None,
			not_found_answer: None,
			empty_answer: None,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Analytics {
	pub key: String,
	pub max_events: u32,
	pub ttl_seconds: u64,
	pub recent_events: u32,
	pub queue_capacity: u32,
	/// Usually supplied through `UPSTASH_REDIS_REST_URL`. Events stay in memory when unset.
	pub redis_url: Option<String>,
	/// Usually supplied through `UPSTASH_REDIS_REST_TOKEN`.
	pub redis_token: Option<String>,
	/// Usually supplied through `ANALYTICS_DASHBOARD_TOKEN`. The summary is public when unset.
	pub dashboard_token: Option<String>,
	pub timeout_ms: u64,
}
impl Default for Analytics {
	fn default() -> Self {
		Self {
			key: "sift:analytics".to_string(),
			max_events: 1_000,
			ttl_seconds: 7 * 24 * 60 * 60,
			recent_events: 20,
			queue_capacity: 256,
			redis_url: None,
			redis_token: None,
			dashboard_token: None,
			timeout_ms: 5_000,
		}
	}
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Security {
	pub bind_localhost_only: bool,
	/// Bearer token required by sift-mcp clients when set.
	pub mcp_auth_token: Option<String>,
}
impl Default for Security {
	fn default() -> Self {
		Self { bind_localhost_only: true, mcp_auth_token: None }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct Mcp {
	/// Base URL of sift-api. Defaults to `service.http_bind` when absent.
	pub api_base: Option<String>,
}

fn default_vector_path() -> String {
	"/query-data".to_string()
}

fn default_vector_timeout_ms() -> u64 {
	12_000
}

fn default_vector_retry() -> RetryConfig {
	RetryConfig { retries: 3, initial_backoff_ms: 400, backoff_factor: 2.0 }
}

fn default_llm_path() -> String {
	"/chat/completions".to_string()
}

fn default_llm_timeout_ms() -> u64 {
	18_000
}

fn default_llm_retry() -> RetryConfig {
	RetryConfig { retries: 4, initial_backoff_ms: 800, backoff_factor: 2.0 }
}
