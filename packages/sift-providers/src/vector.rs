use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};

use crate::{
	Error, Result,
	retry::{self, RetryPolicy},
};
use sift_config::{ENV_VECTOR_TOKEN, ENV_VECTOR_URL, VectorProviderConfig};

pub const LABEL: &str = "Vector query";

/// One row of a `query-data` response, before domain typing.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorMatch {
	pub id: String,
	pub score: f32,
	pub data: Option<String>,
	pub metadata: Map<String, Value>,
}

/// Issues one similarity query with integrated embeddings.
pub async fn query(cfg: &VectorProviderConfig, text: &str, top_k: u32) -> Result<Vec<VectorMatch>> {
	ensure_configured(cfg)?;

	let timeout = Duration::from_millis(cfg.timeout_ms);
	let client = Client::builder().build()?;
	let url = crate::join_url(&cfg.api_base, &cfg.path);
	let headers = crate::auth_headers(&cfg.api_key, &cfg.default_headers)?;
	let body = serde_json::json!({
		"data": text,
		"topK": top_k,
		"includeMetadata": true,
		"includeData": true,
		"includeVectors": false,
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

	parse_query_response(json)
}

fn ensure_configured(cfg: &VectorProviderConfig) -> Result<()> {
	if cfg.api_base.trim().is_empty() {
		return Err(Error::Configuration {
			message: format!("Vector store URL is not configured. Set {ENV_VECTOR_URL}."),
		});
	}
	if cfg.api_key.trim().is_empty() {
		return Err(Error::Configuration {
			message: format!("Vector store token is not configured. Set {ENV_VECTOR_TOKEN}."),
		});
	}

	let lower = cfg.api_base.to_ascii_lowercase();

	if lower.contains("upstash.io") && !lower.contains("vector") {
		return Err(Error::Configuration {
			message: format!(
				"{ENV_VECTOR_URL} appears to be a Redis URL. Use the vector database REST URL."
			),
		});
	}

	Ok(())
}

fn parse_query_response(json: Value) -> Result<Vec<VectorMatch>> {
	let Some(result) = json.get("result") else {
		return Err(Error::InvalidResponse {
			message: "Vector query response is missing result.".to_string(),
		});
	};
	let Some(rows) = result.as_array() else {
		if result.is_null() {
			return Ok(Vec::new());
		}

		return Err(Error::InvalidResponse {
			message: "Vector query result must be an array.".to_string(),
		});
	};
	let mut matches = Vec::with_capacity(rows.len());

	for (index, row) in rows.iter().enumerate() {
		let id = match row.get("id") {
			Some(Value::String(id)) => id.clone(),
			Some(Value::Number(id)) => id.to_string(),
			_ => index.to_string(),
		};
		let score = row.get("score").and_then(Value::as_f64).unwrap_or(0.0) as f32;
		let data = row
			.get("data")
			.and_then(Value::as_str)
			.filter(|text| !text.is_empty())
			.map(str::to_string);
		let metadata = row.get("metadata").and_then(Value::as_object).cloned().unwrap_or_default();

		matches.push(VectorMatch { id, score, data, metadata });
	}

	Ok(matches)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_rows_in_upstream_order() {
		let json = serde_json::json!({
			"result": [
				{ "id": "exp-1", "score": 0.91, "data": "Led the platform team.", "metadata": { "type": "experience" } },
				{ "id": 7, "score": 0.42 }
			]
		});
		let parsed = parse_query_response(json).expect("parse failed");

		assert_eq!(parsed.len(), 2);
		assert_eq!(parsed[0].id, "exp-1");
		assert_eq!(parsed[0].data.as_deref(), Some("Led the platform team."));
		assert_eq!(parsed[0].metadata.get("type"), Some(&Value::from("experience")));
		assert_eq!(parsed[1].id, "7");
		assert!(parsed[1].data.is_none());
		assert!(parsed[1].metadata.is_empty());
	}

	#[test]
	fn null_result_is_empty() {
		let parsed = parse_query_response(serde_json::json!({ "result": null })).expect("parse failed");

		assert!(parsed.is_empty());
	}

	#[test]
	fn missing_result_is_invalid() {
		let err = parse_query_response(serde_json::json!({ "error": "nope" }))
			.expect_err("Expected invalid response.");

		assert!(matches!(err, Error::InvalidResponse { .. }));
	}

	#[test]
	fn redis_url_is_a_configuration_error() {
		let cfg = VectorProviderConfig {
			provider_id: "upstash-vector".to_string(),
			api_base: "https://eu1-warm-cat.upstash.io".to_string(),
			api_key: "token".to_string(),
			path: "/query-data".to_string(),
			timeout_ms: 1_000,
			retry: sift_config::RetryConfig {
				retries: 1,
				initial_backoff_ms: 1,
				backoff_factor: 1.0,
			},
			default_headers: Map::new(),
		};
		let err = ensure_configured(&cfg).expect_err("Expected configuration error.");

		assert!(err.to_string().contains("appears to be a Redis URL"));
	}
}
