use axum::{
	Json, Router,
	extract::{Path, Query, State},
	http::{HeaderMap, StatusCode, header},
	response::{IntoResponse, Response},
	routing::{get, post},
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;
use sift_service::{
	AnalyticsSummary, AskRequest, AskResponse, Error as ServiceError, InterviewRequest,
	InterviewSimulation, JobComparison, JobComparisonRequest, ProfileSection, RetrievalHit,
};

pub const ANALYTICS_TOKEN_HEADER: &str = "x-analytics-token";

const DEFAULT_SEARCH_TOP_K: u32 = 5;

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health))
		.route("/api/chat", post(chat))
		.route("/api/search", post(search))
		.route("/api/sections/{section}", get(section))
		.route("/api/interviews/simulate", post(simulate_interview))
		.route("/api/profile/compare", post(compare_profile))
		.route("/api/analytics", get(analytics_summary).delete(analytics_clear))
		.with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub top_k: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SearchResponse {
	pub results: Vec<RetrievalHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SectionResponse {
	pub section: ProfileSection,
	pub results: Vec<RetrievalHit>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
	pub cleared: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
	#[serde(default)]
	pub token: Option<String>,
}

async fn health() -> StatusCode {
	StatusCode::OK
}

async fn chat(
	State(state): State<AppState>,
	Json(payload): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
	let response = state.service.ask(payload).await?;

	Ok(Json(response))
}

async fn search(
	State(state): State<AppState>,
	Json(payload): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, ApiError> {
	let top_k = payload.top_k.unwrap_or(DEFAULT_SEARCH_TOP_K);
	let results = state.service.search(&payload.query, top_k).await?;

	Ok(Json(SearchResponse { results }))
}

async fn section(
	State(state): State<AppState>,
	Path(section): Path<String>,
) -> Result<Json<SectionResponse>, ApiError> {
	let section: ProfileSection = section.parse()?;
	let results = state.service.section(section).await?;

	Ok(Json(SectionResponse { section, results }))
}

async fn simulate_interview(
	State(state): State<AppState>,
	Json(payload): Json<InterviewRequest>,
) -> Result<Json<InterviewSimulation>, ApiError> {
	let response = state.service.simulate_interview(payload).await?;

	Ok(Json(response))
}

async fn compare_profile(
	State(state): State<AppState>,
	Json(payload): Json<JobComparisonRequest>,
) -> Result<Json<JobComparison>, ApiError> {
	let response = state.service.compare_profile(payload).await?;

	Ok(Json(response))
}

async fn analytics_summary(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<AnalyticsQuery>,
) -> Result<Json<AnalyticsSummary>, ApiError> {
	authorize_analytics(&state, &headers, &query)?;

	Ok(Json(state.service.analytics.summary().await))
}

async fn analytics_clear(
	State(state): State<AppState>,
	headers: HeaderMap,
	Query(query): Query<AnalyticsQuery>,
) -> Result<Json<ClearResponse>, ApiError> {
	authorize_analytics(&state, &headers, &query)?;

	state.service.analytics.clear().await;

	tracing::info!("Analytics cleared.");

	Ok(Json(ClearResponse { cleared: true }))
}

/// Open when no dashboard token is configured. Otherwise the token may arrive as the
/// `token` query parameter, the analytics header or a bearer credential.
fn authorize_analytics(
	state: &AppState,
	headers: &HeaderMap,
	query: &AnalyticsQuery,
) -> Result<(), ApiError> {
	let Some(expected) = state.service.cfg.analytics.dashboard_token.as_deref() else {
		return Ok(());
	};
	let header_token = headers.get(ANALYTICS_TOKEN_HEADER).and_then(|value| value.to_str().ok());
	let bearer = headers
		.get(header::AUTHORIZATION)
		.and_then(|value| value.to_str().ok())
		.and_then(|value| value.strip_prefix("Bearer "));
	let presented = [query.token.as_deref(), header_token, bearer];

	if presented.into_iter().flatten().any(|token| token.trim() == expected) {
		return Ok(());
	}

	Err(json_error(StatusCode::UNAUTHORIZED, "unauthorized", "Unauthorized"))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
	error_code: String,
	message: String,
}

#[derive(Debug)]
pub struct ApiError {
	status: StatusCode,
	error_code: String,
	message: String,
}
impl ApiError {
	fn new(status: StatusCode, error_code: impl Into<String>, message: impl Into<String>) -> Self {
		Self { status, error_code: error_code.into(), message: message.into() }
	}
}
impl From<ServiceError> for ApiError {
	fn from(err: ServiceError) -> Self {
		let message = err.user_message();
		let (status, code) = match &err {
			ServiceError::Validation { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
			ServiceError::Configuration { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "configuration"),
			ServiceError::Upstream { .. } => (StatusCode::BAD_GATEWAY, "upstream_error"),
			ServiceError::Transient { .. } => (StatusCode::SERVICE_UNAVAILABLE, "upstream_unavailable"),
			ServiceError::Provider { .. } => (StatusCode::BAD_GATEWAY, "provider_error"),
			ServiceError::Analytics { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "analytics_error"),
		};

		if status.is_server_error() {
			tracing::error!(error = %err, "Request failed.");
		}

		json_error(status, code, message)
	}
}
impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorBody { error_code: self.error_code, message: self.message };

		(self.status, Json(body)).into_response()
	}
}

pub fn json_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
	ApiError::new(status, code, message)
}
