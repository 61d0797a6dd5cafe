//! Helpers shared by the integration tests of the workspace.

mod error;

pub use error::{Error, Result};

use std::net::SocketAddr;

use axum::Router;
use tokio::{net::TcpListener, sync::oneshot};

use sift_config::Config;

/// A complete config pointing at placeholder upstreams. Tests patch `api_base` fields
/// with the address of a [`StubServer`].
pub const SAMPLE_CONFIG_TOML: &str = r#"
[service]
http_bind = "127.0.0.1:8080"
mcp_bind  = "127.0.0.1:8082"
log_level = "info"

[providers.vector]
provider_id = "upstash-vector"
api_base    = "http://127.0.0.1:9/vector"
api_key     = "vector-token"
timeout_ms  = 2000

[providers.vector.retry]
retries            = 3
initial_backoff_ms = 1
backoff_factor     = 2.0

[providers.llm]
provider_id    = "groq"
api_base       = "http://127.0.0.1:9/llm"
api_key        = "llm-key"
default_model  = "llama-3.1-8b-instant"
allowed_models = ["llama-3.1-8b-instant", "llama-3.3-70b-versatile"]
temperature    = 0.7
max_tokens     = 600
timeout_ms     = 2000

[providers.llm.model_aliases]
"llama-3.1-70b-versatile" = "llama-3.3-70b-versatile"

[providers.llm.retry]
retries            = 4
initial_backoff_ms = 1
backoff_factor     = 2.0

[persona]
kind       = "interview"
owner_name = "Ada Example"
"#;

/// An axum router served on an ephemeral local port until dropped.
pub struct StubServer {
	addr: SocketAddr,
	shutdown: Option<oneshot::Sender<()>>,
}
impl StubServer {
	pub async fn spawn(app: Router) -> Result<Self> {
		let listener = TcpListener::bind("127.0.0.1:0").await?;
		let addr = listener.local_addr()?;
		let (tx, rx) = oneshot::channel();
		let server = axum::serve(listener, app).with_graceful_shutdown(async move {
			let _ = rx.await;
		});

		tokio::spawn(async move {
			let _ = server.into_future().await;
		});

		Ok(Self { addr, shutdown: Some(tx) })
	}

	pub fn url(&self) -> String {
		format!("http://{}", self.addr)
	}
}
impl Drop for StubServer {
	fn drop(&mut self) {
		if let Some(tx) = self.shutdown.take() {
			let _ = tx.send(());
		}
	}
}

/// Parses [`SAMPLE_CONFIG_TOML`] without consulting the process environment.
pub fn sample_config() -> Result<Config> {
	let cfg: Config = toml::from_str(SAMPLE_CONFIG_TOML)
		.map_err(|err| Error::Message(format!("Failed to parse sample config: {err}.")))?;

	sift_config::validate(&cfg)?;

	Ok(cfg)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sample_config_is_valid() {
		let cfg = sample_config().expect("Sample config must validate.");

		assert_eq!(cfg.providers.llm.default_model, "llama-3.1-8b-instant");
		assert_eq!(cfg.persona.owner_name, "Ada Example");
	}
}
