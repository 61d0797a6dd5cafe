pub mod server;

use std::{net::SocketAddr, path::PathBuf};

use clap::Parser;
use color_eyre::{Result, eyre};

use sift_config::{Config, Security};

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum McpAuthState {
	Off,
	Bearer { token: String },
}

pub async fn run(args: Args) -> Result<()> {
	sift_cli::load_dotenv();

	let config = sift_config::load(&args.config)?;

	sift_cli::init_tracing(&config.service.log_level);

	let auth_state = build_auth_state(&config.security, &config.service.mcp_bind)?;
	let api_base = api_base(&config);

	server::serve_mcp(&config.service.mcp_bind, &api_base, auth_state).await
}

fn api_base(config: &Config) -> String {
	config
		.mcp
		.as_ref()
		.and_then(|mcp| mcp.api_base.clone())
		.unwrap_or_else(|| config.service.http_bind.clone())
}

/// Without a token the tool server must stay on loopback.
fn build_auth_state(security: &Security, mcp_bind: &str) -> Result<McpAuthState> {
	if let Some(token) = security.mcp_auth_token.as_deref() {
		return Ok(McpAuthState::Bearer { token: token.to_string() });
	}

	let bind_addr: SocketAddr = mcp_bind.parse().map_err(|err| {
		eyre::eyre!("service.mcp_bind must be a valid socket address: {err}")
	})?;

	if !bind_addr.ip().is_loopback() {
		return Err(eyre::eyre!(
			"service.mcp_bind must be a loopback address when security.mcp_auth_token is unset."
		));
	}

	Ok(McpAuthState::Off)
}
