mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Analytics, Cache, Config, LlmProviderConfig, Mcp, Persona, PersonaKind, Providers, Rag,
	RetryConfig, Security, Service, VectorProviderConfig,
};

use std::{env, fs, path::Path};

pub const ENV_VECTOR_URL: &str = "UPSTASH_VECTOR_REST_URL";
pub const ENV_VECTOR_TOKEN: &str = "UPSTASH_VECTOR_REST_TOKEN";
pub const ENV_LLM_API_KEY: &str = "GROQ_API_KEY";
pub const ENV_OWNER_NAME: &str = "OWNER_NAME";
pub const ENV_ANALYTICS_TOKEN: &str = "ANALYTICS_DASHBOARD_TOKEN";
pub const ENV_REDIS_URL: &str = "UPSTASH_REDIS_REST_URL";
pub const ENV_REDIS_TOKEN: &str = "UPSTASH_REDIS_REST_TOKEN";

/// Hard ceiling for `rag.top_k`, matching the vector store query limit.
pub const MAX_TOP_K: u32 = 10;

pub fn load(path: &Path) -> Result<Config> {
	load_with_env(path, |name| env::var(name).ok())
}

pub fn load_with_env<F>(path: &Path, lookup: F) -> Result<Config>
where
	F: Fn(&str) -> Option<String>,
{
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	apply_env(&mut cfg, lookup);
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

/// Overlays credentials and deployment-specific values from the environment.
///
/// Non-empty environment values win over the file.
pub fn apply_env<F>(cfg: &mut Config, lookup: F)
where
	F: Fn(&str) -> Option<String>,
{
	let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

	if let Some(value) = read(ENV_VECTOR_URL) {
		cfg.providers.vector.api_base = value;
	}
	if let Some(value) = read(ENV_VECTOR_TOKEN) {
		cfg.providers.vector.api_key = value;
	}
	if let Some(value) = read(ENV_LLM_API_KEY) {
		cfg.providers.llm.api_key = value;
	}
	if let Some(value) = read(ENV_OWNER_NAME) {
		cfg.persona.owner_name = value;
	}
	if let Some(value) = read(ENV_ANALYTICS_TOKEN) {
		cfg.analytics.dashboard_token = Some(value);
	}
	if let Some(value) = read(ENV_REDIS_URL) {
		cfg.analytics.redis_url = Some(value);
	}
	if let Some(value) = read(ENV_REDIS_TOKEN) {
		cfg.analytics.redis_token = Some(value);
	}
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.mcp_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.mcp_bind must be non-empty.".to_string(),
		});
	}

	validate_vector(&cfg.providers.vector)?;
	validate_llm(&cfg.providers.llm)?;
	validate_rag(&cfg.rag)?;

	if cfg.cache.ttl_ms == 0 {
		return Err(Error::Validation {
			message: "cache.ttl_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.persona.owner_name.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("persona.owner_name must be non-empty. Set it or {ENV_OWNER_NAME}."),
		});
	}

	validate_analytics(&cfg.analytics)?;

	if let Some(mcp) = cfg.mcp.as_ref()
		&& let Some(api_base) = mcp.api_base.as_deref()
		&& api_base.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "mcp.api_base must be non-empty when set.".to_string(),
		});
	}

	Ok(())
}

fn validate_vector(vector: &VectorProviderConfig) -> Result<()> {
	if vector.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: format!(
				"providers.vector.api_base must be non-empty. Set it or {ENV_VECTOR_URL}."
			),
		});
	}
	if vector.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: format!(
				"providers.vector.api_key must be non-empty. Set it or {ENV_VECTOR_TOKEN}."
			),
		});
	}
	if looks_like_redis_url(&vector.api_base) {
		return Err(Error::Validation {
			message: "providers.vector.api_base appears to be a Redis URL, not a vector database URL."
				.to_string(),
		});
	}
	if vector.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.vector.timeout_ms must be greater than zero.".to_string(),
		});
	}

	validate_retry("providers.vector.retry", &vector.retry)
}

fn validate_llm(llm: &LlmProviderConfig) -> Result<()> {
	if llm.api_base.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.api_base must be non-empty.".to_string(),
		});
	}
	if llm.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: format!("providers.llm.api_key must be non-empty. Set it or {ENV_LLM_API_KEY}."),
		});
	}
	if llm.allowed_models.is_empty() {
		return Err(Error::Validation {
			message: "providers.llm.allowed_models must be non-empty.".to_string(),
		});
	}
	if !llm.allowed_models.contains(&llm.default_model) {
		return Err(Error::Validation {
			message: "providers.llm.default_model must be listed in providers.llm.allowed_models."
				.to_string(),
		});
	}

	for (alias, target) in &llm.model_aliases {
		if !llm.allowed_models.contains(target) {
			return Err(Error::Validation {
				message: format!(
					"providers.llm.model_aliases.{alias} must point at an entry of providers.llm.allowed_models."
				),
			});
		}
	}

	if !llm.temperature.is_finite() {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be a finite number.".to_string(),
		});
	}
	if !(0.0..=2.0).contains(&llm.temperature) {
		return Err(Error::Validation {
			message: "providers.llm.temperature must be in the range 0.0-2.0.".to_string(),
		});
	}
	if llm.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.llm.max_tokens must be greater than zero.".to_string(),
		});
	}
	if llm.max_tokens > 8_192 {
		return Err(Error::Validation {
			message: "providers.llm.max_tokens must be 8,192 or less.".to_string(),
		});
	}
	if llm.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "providers.llm.timeout_ms must be greater than zero.".to_string(),
		});
	}

	validate_retry("providers.llm.retry", &llm.retry)
}

fn validate_retry(label: &str, retry: &RetryConfig) -> Result<()> {
	if retry.retries == 0 {
		return Err(Error::Validation {
			message: format!("{label}.retries must be greater than zero."),
		});
	}
	if !retry.backoff_factor.is_finite() || retry.backoff_factor < 1.0 {
		return Err(Error::Validation {
			message: format!("{label}.backoff_factor must be a finite number of at least 1.0."),
		});
	}

	Ok(())
}

fn validate_rag(rag: &Rag) -> Result<()> {
	if rag.top_k == 0 || rag.top_k > MAX_TOP_K {
		return Err(Error::Validation {
			message: format!("rag.top_k must be in the range 1-{MAX_TOP_K}."),
		});
	}
	if rag.sources_to_return == 0 {
		return Err(Error::Validation {
			message: "rag.sources_to_return must be greater than zero.".to_string(),
		});
	}
	if rag.sources_to_return > rag.top_k {
		return Err(Error::Validation {
			message: "rag.sources_to_return must be rag.top_k or less.".to_string(),
		});
	}

	for (label, value) in [
		("rag.max_question_chars", rag.max_question_chars),
		("rag.max_doc_chars", rag.max_doc_chars),
		("rag.max_total_context_chars", rag.max_total_context_chars),
		("rag.max_history_message_chars", rag.max_history_message_chars),
		("rag.query_sample_chars", rag.query_sample_chars),
	] {
		if value == 0 {
			return Err(Error::Validation {
				message: format!("{label} must be greater than zero."),
			});
		}
	}

	Ok(())
}

fn validate_analytics(analytics: &Analytics) -> Result<()> {
	if analytics.key.trim().is_empty() {
		return Err(Error::Validation { message: "analytics.key must be non-empty.".to_string() });
	}
	if analytics.max_events == 0 {
		return Err(Error::Validation {
			message: "analytics.max_events must be greater than zero.".to_string(),
		});
	}
	if analytics.queue_capacity == 0 {
		return Err(Error::Validation {
			message: "analytics.queue_capacity must be greater than zero.".to_string(),
		});
	}
	if analytics.redis_url.is_some() != analytics.redis_token.is_some() {
		return Err(Error::Validation {
			message: format!(
				"analytics.redis_url and analytics.redis_token must be set together ({ENV_REDIS_URL}, {ENV_REDIS_TOKEN})."
			),
		});
	}

	Ok(())
}

fn looks_like_redis_url(url: &str) -> bool {
	let lower = url.to_ascii_lowercase();

	lower.contains("upstash.io") && !lower.contains("vector")
}

fn normalize(cfg: &mut Config) {
	for value in [
		&mut cfg.persona.system_prompt,
		&mut cfg.persona.not_found_answer,
		&mut cfg.persona.empty_answer,
		&mut cfg.analytics.redis_url,
		&mut cfg.analytics.redis_token,
		&mut cfg.analytics.dashboard_token,
		&mut cfg.security.mcp_auth_token,
	] {
		if value.as_deref().map(|text| text.trim().is_empty()).unwrap_or(false) {
			*value = None;
		}
	}

	cfg.providers.vector.api_base = cfg.providers.vector.api_base.trim().trim_end_matches('/').to_string();
	cfg.providers.llm.api_base = cfg.providers.llm.api_base.trim().trim_end_matches('/').to_string();
}
