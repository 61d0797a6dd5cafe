use std::{
	collections::HashMap,
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::Value;

use sift_config::{Config, Error, PersonaKind};

const SAMPLE_CONFIG_TOML: &str = include_str!("fixtures/sample_config.toml");

fn sample_value() -> Value {
	toml::from_str(SAMPLE_CONFIG_TOML).expect("Failed to parse sample config.")
}

fn table<'a>(value: &'a mut Value, path: &[&str]) -> &'a mut toml::Table {
	let mut current = value.as_table_mut().expect("Sample config must be a table.");

	for key in path {
		current = current
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Sample config must include [{key}]."));
	}

	current
}

fn render(value: &Value) -> String {
	toml::to_string(value).expect("Failed to render sample config.")
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sift_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String, vars: &[(&str, &str)]) -> sift_config::Result<Config> {
	let env: HashMap<String, String> =
		vars.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect();
	let path = write_temp_config(payload);
	let result = sift_config::load_with_env(&path, |name| env.get(name).cloned());

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation(result: sift_config::Result<Config>, needle: &str) {
	let err = result.expect_err("Expected validation error.");

	assert!(matches!(err, Error::Validation { .. }), "Unexpected error kind: {err:?}");

	let message = err.to_string();

	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads_with_defaults() {
	let cfg = load_payload(render(&sample_value()), &[]).expect("Sample config must load.");

	assert_eq!(cfg.rag.top_k, 8);
	assert_eq!(cfg.rag.sources_to_return, 5);
	assert_eq!(cfg.rag.max_history_messages, 10);
	assert_eq!(cfg.rag.history_fingerprint_chars, 120);
	assert_eq!(cfg.providers.vector.path, "/query-data");
	assert_eq!(cfg.providers.llm.path, "/chat/completions");
	assert_eq!(cfg.persona.kind, PersonaKind::Interview);
	assert_eq!(cfg.analytics.ttl_seconds, 604_800);
	assert_eq!(
		cfg.providers.llm.model_aliases.get("llama-3.1-70b-versatile").map(String::as_str),
		Some("llama-3.3-70b-versatile")
	);
	assert!(cfg.analytics.redis_url.is_none());
	assert!(cfg.mcp.is_none());
}

#[test]
fn env_overrides_credentials_and_owner() {
	let mut value = sample_value();

	table(&mut value, &["providers", "vector"]).insert("api_key".to_string(), Value::from(""));
	table(&mut value, &["providers", "llm"]).remove("api_key");

	let cfg = load_payload(
		render(&value),
		&[
			("UPSTASH_VECTOR_REST_URL", "https://other-vector.upstash.io/"),
			("UPSTASH_VECTOR_REST_TOKEN", "env-vector-token"),
			("GROQ_API_KEY", "env-llm-key"),
			("OWNER_NAME", "Grace Example"),
			("ANALYTICS_DASHBOARD_TOKEN", "dash"),
		],
	)
	.expect("Env-backed config must load.");

	assert_eq!(cfg.providers.vector.api_base, "https://other-vector.upstash.io");
	assert_eq!(cfg.providers.vector.api_key, "env-vector-token");
	assert_eq!(cfg.providers.llm.api_key, "env-llm-key");
	assert_eq!(cfg.persona.owner_name, "Grace Example");
	assert_eq!(cfg.analytics.dashboard_token.as_deref(), Some("dash"));
}

#[test]
fn blank_env_values_do_not_override() {
	let cfg = load_payload(render(&sample_value()), &[("GROQ_API_KEY", "   ")])
		.expect("Sample config must load.");

	assert_eq!(cfg.providers.llm.api_key, "llm-key");
}

#[test]
fn missing_vector_token_names_env_var() {
	let mut value = sample_value();

	table(&mut value, &["providers", "vector"]).remove("api_key");

	expect_validation(load_payload(render(&value), &[]), "UPSTASH_VECTOR_REST_TOKEN");
}

#[test]
fn missing_llm_key_names_env_var() {
	let mut value = sample_value();

	table(&mut value, &["providers", "llm"]).insert("api_key".to_string(), Value::from(" "));

	expect_validation(load_payload(render(&value), &[]), "GROQ_API_KEY");
}

#[test]
fn redis_url_in_vector_slot_is_rejected() {
	let mut value = sample_value();

	table(&mut value, &["providers", "vector"])
		.insert("api_base".to_string(), Value::from("https://eu1-fluffy-cat.upstash.io"));

	expect_validation(load_payload(render(&value), &[]), "appears to be a Redis URL");
}

#[test]
fn default_model_must_be_allowed() {
	let mut value = sample_value();

	table(&mut value, &["providers", "llm"])
		.insert("default_model".to_string(), Value::from("gpt-unknown"));

	expect_validation(
		load_payload(render(&value), &[]),
		"providers.llm.default_model must be listed in providers.llm.allowed_models.",
	);
}

#[test]
fn alias_must_target_allowed_model() {
	let mut value = sample_value();

	table(&mut value, &["providers", "llm", "model_aliases"])
		.insert("old-model".to_string(), Value::from("missing-model"));

	expect_validation(load_payload(render(&value), &[]), "providers.llm.model_aliases.old-model");
}

#[test]
fn temperature_out_of_range_is_rejected() {
	let mut value = sample_value();

	table(&mut value, &["providers", "llm"]).insert("temperature".to_string(), Value::from(3.5));

	expect_validation(
		load_payload(render(&value), &[]),
		"providers.llm.temperature must be in the range 0.0-2.0.",
	);
}

#[test]
fn top_k_above_store_limit_is_rejected() {
	let mut value = sample_value();

	table(&mut value, &["rag"]).insert("top_k".to_string(), Value::Integer(11));

	expect_validation(load_payload(render(&value), &[]), "rag.top_k must be in the range 1-10.");
}

#[test]
fn sources_cannot_exceed_top_k() {
	let mut value = sample_value();
	let rag = table(&mut value, &["rag"]);

	rag.insert("top_k".to_string(), Value::Integer(3));
	rag.insert("sources_to_return".to_string(), Value::Integer(5));

	expect_validation(
		load_payload(render(&value), &[]),
		"rag.sources_to_return must be rag.top_k or less.",
	);
}

#[test]
fn zero_retries_are_rejected() {
	let mut value = sample_value();

	table(&mut value, &["providers", "vector", "retry"])
		.insert("retries".to_string(), Value::Integer(0));

	expect_validation(
		load_payload(render(&value), &[]),
		"providers.vector.retry.retries must be greater than zero.",
	);
}

#[test]
fn redis_url_requires_token() {
	let mut value = sample_value();

	table(&mut value, &["analytics"])
		.insert("redis_url".to_string(), Value::from("https://cache.upstash.io"));

	expect_validation(load_payload(render(&value), &[]), "UPSTASH_REDIS_REST_TOKEN");
}

#[test]
fn blank_optional_strings_become_none() {
	let mut value = sample_value();

	table(&mut value, &["security"]).insert("mcp_auth_token".to_string(), Value::from("  "));
	table(&mut value, &["persona"]).insert("system_prompt".to_string(), Value::from(""));

	let cfg = load_payload(render(&value), &[]).expect("Sample config must load.");

	assert!(cfg.security.mcp_auth_token.is_none());
	assert!(cfg.persona.system_prompt.is_none());
}

#[test]
fn missing_file_reports_read_error() {
	let path = env::temp_dir().join("sift_config_test_does_not_exist.toml");
	let err = sift_config::load_with_env(&path, |_| None).expect_err("Expected read error.");

	assert!(matches!(err, Error::ReadConfig { .. }), "Unexpected error kind: {err:?}");
}
