//! Minimal client for the Upstash Redis REST interface.
//!
//! Single commands are `POST {url}` with a JSON array body; batches are
//! `POST {url}/pipeline` with an array of arrays. Each reply is `{"result": ..}` or
//! `{"error": ".."}`.

use std::time::Duration;

use reqwest::Client;
use serde_json::{Map, Value};

use crate::{Error, Result, retry};

pub const LABEL: &str = "Redis";

#[derive(Debug, Clone)]
pub struct RedisRest {
	client: Client,
	url: String,
	token: String,
	timeout: Duration,
}
impl RedisRest {
	pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
		if url.trim().is_empty() || token.trim().is_empty() {
			return Err(Error::Configuration {
				message: "Redis REST URL and token are required.".to_string(),
			});
		}

		Ok(Self {
			client: Client::builder().build()?,
			url: url.trim().trim_end_matches('/').to_string(),
			token: token.to_string(),
			timeout,
		})
	}

	pub async fn command(&self, args: &[String]) -> Result<Value> {
		let json = self.post(&self.url, serde_json::json!(args)).await?;

		reply_result(&json)
	}

	/// Runs `commands` in order and returns one result per command. Fails on the first
	/// command error.
	pub async fn pipeline(&self, commands: &[Vec<String>]) -> Result<Vec<Value>> {
		let url = crate::join_url(&self.url, "pipeline");
		let json = self.post(&url, serde_json::json!(commands)).await?;
		let Some(replies) = json.as_array() else {
			return Err(Error::InvalidResponse {
				message: "Redis pipeline response must be an array.".to_string(),
			});
		};

		replies.iter().map(reply_result).collect()
	}

	async fn post(&self, url: &str, body: Value) -> Result<Value> {
		let headers = crate::auth_headers(&self.token, &Map::new())?;
		let res = retry::fetch_with_timeout(
			self.timeout,
			self.client.post(url).headers(headers).json(&body).send(),
		)
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

		Ok(res.json().await?)
	}
}

fn reply_result(reply: &Value) -> Result<Value> {
	if let Some(message) = reply.get("error").and_then(Value::as_str) {
		return Err(Error::InvalidResponse { message: format!("Redis command failed: {message}") });
	}

	Ok(reply.get("result").cloned().unwrap_or(Value::Null))
}

/// Reads an integer reply. Upstash returns some counters as strings.
pub fn as_i64(value: &Value) -> Option<i64> {
	match value {
		Value::Number(number) => number.as_i64(),
		Value::String(text) => text.parse().ok(),
		_ => None,
	}
}

/// Reads a flat `[k1, v1, k2, v2, ..]` reply, as returned by `HGETALL` and
/// `ZRANGE .. WITHSCORES`.
pub fn as_pairs(value: &Value) -> Vec<(String, String)> {
	let Some(items) = value.as_array() else { return Vec::new() };

	items
		.chunks_exact(2)
		.filter_map(|pair| {
			let key = pair[0].as_str()?.to_string();
			let value = match &pair[1] {
				Value::String(text) => text.clone(),
				other => other.to_string(),
			};

			Some((key, value))
		})
		.collect()
}
