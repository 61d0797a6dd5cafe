pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{message}")]
	Validation { message: String },
	#[error("{message}")]
	Configuration { message: String },
	#[error("{label} request failed with status {status}: {body}")]
	Upstream { label: String, status: u16, body: String },
	#[error("{message}")]
	Transient { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	/// Persistence failures of the analytics sink. Logged, never returned from `ask`.
	#[error("Analytics error: {message}")]
	Analytics { message: String },
}
impl Error {
	/// Longest message handed back to callers.
	pub const MAX_USER_MESSAGE_CHARS: usize = 300;

	/// The message shown to end users: one line, bounded length.
	pub fn user_message(&self) -> String {
		let collapsed = crate::context::collapse_whitespace(&self.to_string());

		if collapsed.is_empty() {
			return crate::persona::GENERIC_FAILURE.to_string();
		}

		crate::context::clamp(&collapsed, Self::MAX_USER_MESSAGE_CHARS)
	}
}
impl From<sift_providers::Error> for Error {
	fn from(err: sift_providers::Error) -> Self {
		match err {
			sift_providers::Error::Configuration { message } => Self::Configuration { message },
			sift_providers::Error::UpstreamHttp { label, status, body } =>
				Self::Upstream { label, status, body },
			err @ sift_providers::Error::Transient { .. } =>
				Self::Transient { message: err.to_string() },
			err @ sift_providers::Error::Timeout { .. } =>
				Self::Transient { message: err.to_string() },
			other => Self::Provider { message: other.to_string() },
		}
	}
}
