pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Configuration { message: String },
	#[error("{label} request failed with status {status}: {body}")]
	UpstreamHttp { label: String, status: u16, body: String },
	#[error("{label} request failed after {attempts} attempts: {message}")]
	Transient { label: String, attempts: u32, message: String },
	#[error("Request timed out after {timeout_ms} ms.")]
	Timeout { timeout_ms: u64 },
	#[error(transparent)]
	Reqwest(#[from] reqwest::Error),
	#[error(transparent)]
	SerdeJson(#[from] serde_json::Error),
	#[error(transparent)]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error(transparent)]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidResponse { message: String },
}
impl Error {
	/// Connection failures and timeouts. These are worth another attempt.
	pub fn is_network(&self) -> bool {
		match self {
			Self::Timeout { .. } => true,
			Self::Reqwest(err) => err.is_connect() || err.is_timeout() || err.is_request(),
			_ => false,
		}
	}
}
