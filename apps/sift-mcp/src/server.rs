use std::{net::SocketAddr, sync::Arc};

use axum::{
	Router,
	body::Body,
	extract::State,
	http::{HeaderMap, Request, StatusCode},
	middleware::{self, Next},
	response::IntoResponse,
};
use color_eyre::Result;
use reqwest::Client;
use rmcp::{
	ErrorData, ServerHandler,
	handler::server::router::tool::ToolRouter,
	model::{CallToolResult, Content, JsonObject, ServerCapabilities, ServerInfo},
	transport::streamable_http_server::{
		StreamableHttpServerConfig, StreamableHttpService, session::local::LocalSessionManager,
	},
};
use serde_json::Value;
use tokio::net::TcpListener;

use crate::McpAuthState;
use sift_config::MAX_TOP_K;
use sift_service::{InterviewSimulation, JobComparison, ProfileSection, RetrievalHit, format};

pub const TOOL_SEARCH_PROFILE: &str = "search_profile";
pub const TOOL_GET_PROFILE_SECTION: &str = "get_profile_section";
pub const TOOL_RUN_INTERVIEW: &str = "run_interview";
pub const TOOL_COMPARE_PROFILE_WITH_JOB: &str = "compare_profile_with_job";

const HEADER_AUTHORIZATION: &str = "Authorization";
const DEFAULT_TOP_K: u32 = 5;

#[derive(Clone)]
struct SiftMcp {
	api_base: String,
	client: Client,
	tool_router: ToolRouter<Self>,
}
impl SiftMcp {
	fn new(api_base: String) -> Self {
		Self { api_base, client: Client::new(), tool_router: Self::tool_router() }
	}

	async fn post_json(&self, path: &str, body: Value) -> Result<Value, ToolFailure> {
		let url = format!("{}{}", self.api_base, path);
		let response = self.client.post(url).json(&body).send().await.map_err(request_failed)?;

		read_response(response).await
	}

	async fn get_json(&self, path: &str) -> Result<Value, ToolFailure> {
		let url = format!("{}{}", self.api_base, path);
		let response = self.client.get(url).send().await.map_err(request_failed)?;

		read_response(response).await
	}
}

#[rmcp::tool_router]
impl SiftMcp {
	#[rmcp::tool(
		name = "search_profile",
		description = "Search the professional profile for information relevant to a query.",
		input_schema = search_profile_schema()
	)]
	async fn search_profile(&self, mut params: JsonObject) -> Result<CallToolResult, ErrorData> {
		let query = take_required_string(&mut params, "query")?;
		let top_k = read_top_k(&params)?;
		let body = serde_json::json!({ "query": query, "top_k": top_k });

		match self.post_json("/api/search", body).await {
			Ok(json) => {
				let hits: Vec<RetrievalHit> = parse_field(json, "results")?;

				Ok(text_result(format::format_search_results(&hits)))
			},
			Err(failure) => failure.into_result(),
		}
	}

	#[rmcp::tool(
		name = "get_profile_section",
		description = "Get all entries of one profile section, such as experience or skills.",
		input_schema = get_profile_section_schema()
	)]
	async fn get_profile_section(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let raw = take_required_string(&mut params, "section")?;
		let section: ProfileSection =
			raw.parse().map_err(|err: sift_service::Error| ErrorData::invalid_params(err.to_string(), None))?;

		match self.get_json(&format!("/api/sections/{section}")).await {
			Ok(json) => {
				let hits: Vec<RetrievalHit> = parse_field(json, "results")?;

				Ok(text_result(format::format_section(&hits)))
			},
			Err(failure) => failure.into_result(),
		}
	}

	#[rmcp::tool(
		name = "run_interview",
		description = "Simulate a job interview against the profile and return a scored report.",
		input_schema = run_interview_schema()
	)]
	async fn run_interview(&self, mut params: JsonObject) -> Result<CallToolResult, ErrorData> {
		let job_title = take_required_string(&mut params, "jobTitle")?;
		let company = take_required_string(&mut params, "company")?;
		let body = serde_json::json!({
			"job_title": job_title,
			"company": company,
			"required_skills": take_string_list(&mut params, "requiredSkills")?,
			"responsibilities": take_string_list(&mut params, "responsibilities")?,
		});

		match self.post_json("/api/interviews/simulate", body).await {
			Ok(json) => {
				let simulation: InterviewSimulation = serde_json::from_value(json).map_err(|err| {
					ErrorData::internal_error(format!("Unexpected interview payload: {err}"), None)
				})?;

				Ok(text_result(format::format_interview_report(&simulation)))
			},
			Err(failure) => failure.into_result(),
		}
	}

	#[rmcp::tool(
		name = "compare_profile_with_job",
		description = "Compare the profile against a job description: skill matches, gaps and a 1-10 fit score.",
		input_schema = compare_profile_with_job_schema()
	)]
	async fn compare_profile_with_job(
		&self,
		mut params: JsonObject,
	) -> Result<CallToolResult, ErrorData> {
		let job_description = take_required_string(&mut params, "jobDescription")?;
		let body = serde_json::json!({
			"job_description": job_description,
			"job_title": take_optional_string(&mut params, "jobTitle")?,
			"company": take_optional_string(&mut params, "company")?,
		});

		match self.post_json("/api/profile/compare", body).await {
			Ok(json) => {
				let comparison: JobComparison = serde_json::from_value(json).map_err(|err| {
					ErrorData::internal_error(format!("Unexpected comparison payload: {err}"), None)
				})?;

				Ok(text_result(format::format_job_comparison(&comparison)))
			},
			Err(failure) => failure.into_result(),
		}
	}
}

#[rmcp::tool_handler]
impl ServerHandler for SiftMcp {
	fn get_info(&self) -> ServerInfo {
		ServerInfo {
			instructions: Some(
				"Profile tools that answer from the sift HTTP API: search, sections, interview simulation and job comparison."
					.to_string(),
			),
			capabilities: ServerCapabilities::builder().enable_tools().build(),
			..Default::default()
		}
	}
}

/// How a forwarded call failed: transport problems are protocol errors, API rejections
/// are reported to the agent as tool errors.
#[derive(Debug)]
enum ToolFailure {
	Protocol(ErrorData),
	Api { status: u16, message: String },
}
impl ToolFailure {
	fn into_result(self) -> Result<CallToolResult, ErrorData> {
		match self {
			Self::Protocol(err) => Err(err),
			Self::Api { status, message } => {
				tracing::warn!(status, %message, "sift-api rejected a tool call.");

				Ok(CallToolResult::error(vec![Content::text(format!("Error: {message}"))]))
			},
		}
	}
}

pub async fn serve_mcp(bind_addr: &str, api_base: &str, auth_state: McpAuthState) -> Result<()> {
	let bind_addr: SocketAddr = bind_addr.parse()?;
	let api_base = normalize_api_base(api_base);
	let session_manager: Arc<LocalSessionManager> = Default::default();
	let service = StreamableHttpService::new(
		move || Ok(SiftMcp::new(api_base.clone())),
		session_manager,
		StreamableHttpServerConfig::default(),
	);
	let router = Router::new()
		.fallback_service(service)
		.layer(middleware::from_fn_with_state(auth_state, mcp_auth_middleware));
	let listener = TcpListener::bind(bind_addr).await?;

	tracing::info!(%bind_addr, "MCP server listening.");

	axum::serve(listener, router).await?;

	Ok(())
}

fn is_authorized(headers: &HeaderMap, auth_state: &McpAuthState) -> bool {
	match auth_state {
		McpAuthState::Off => true,
		McpAuthState::Bearer { token } => read_bearer_token(headers) == Some(token.as_str()),
	}
}

fn read_bearer_token(headers: &HeaderMap) -> Option<&str> {
	let raw = headers.get(HEADER_AUTHORIZATION)?;
	let value = raw.to_str().ok()?.trim();
	let token = value.strip_prefix("Bearer ")?.trim();

	if token.is_empty() { None } else { Some(token) }
}

/// Adds a scheme when missing and swaps wildcard hosts for loopback, since sift-mcp runs
/// next to sift-api.
fn normalize_api_base(raw: &str) -> String {
	let trimmed = raw.trim().trim_end_matches('/');
	let (scheme, rest) = if let Some(value) = trimmed.strip_prefix("http://") {
		("http://", value)
	} else if let Some(value) = trimmed.strip_prefix("https://") {
		("https://", value)
	} else {
		("http://", trimmed)
	};
	let rest = if let Some(value) = rest.strip_prefix("0.0.0.0:") {
		format!("127.0.0.1:{value}")
	} else if let Some(value) = rest.strip_prefix("[::]:") {
		format!("127.0.0.1:{value}")
	} else {
		rest.to_string()
	};

	format!("{scheme}{rest}")
}

fn take_required_string(params: &mut JsonObject, key: &str) -> Result<String, ErrorData> {
	let value = params
		.remove(key)
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} is required."), None))?;
	let text = value
		.as_str()
		.ok_or_else(|| ErrorData::invalid_params(format!("{key} must be a string."), None))?
		.trim();

	if text.is_empty() {
		return Err(ErrorData::invalid_params(format!("{key} must be non-empty."), None));
	}

	Ok(text.to_string())
}

fn take_optional_string(params: &mut JsonObject, key: &str) -> Result<Option<String>, ErrorData> {
	match params.remove(key) {
		None | Some(Value::Null) => Ok(None),
		Some(Value::String(text)) => {
			let text = text.trim();

			Ok((!text.is_empty()).then(|| text.to_string()))
		},
		Some(_) => Err(ErrorData::invalid_params(format!("{key} must be a string."), None)),
	}
}

fn take_string_list(params: &mut JsonObject, key: &str) -> Result<Vec<String>, ErrorData> {
	match params.remove(key) {
		None | Some(Value::Null) => Ok(Vec::new()),
		Some(Value::Array(items)) => items
			.into_iter()
			.map(|item| match item {
				Value::String(text) => Ok(text.trim().to_string()),
				_ => Err(ErrorData::invalid_params(format!("{key} must contain strings."), None)),
			})
			.filter(|item| !matches!(item, Ok(text) if text.is_empty()))
			.collect(),
		Some(_) => Err(ErrorData::invalid_params(format!("{key} must be an array."), None)),
	}
}

fn read_top_k(params: &JsonObject) -> Result<u32, ErrorData> {
	match params.get("topK") {
		None | Some(Value::Null) => Ok(DEFAULT_TOP_K),
		Some(value) => {
			let out_of_range = || {
				ErrorData::invalid_params(format!("topK must be between 1 and {MAX_TOP_K}."), None)
			};
			let top_k = value
				.as_u64()
				.ok_or_else(|| ErrorData::invalid_params("topK must be an integer.", None))?;

			u32::try_from(top_k)
				.ok()
				.filter(|top_k| (1..=MAX_TOP_K).contains(top_k))
				.ok_or_else(out_of_range)
		},
	}
}

fn text_result(text: String) -> CallToolResult {
	CallToolResult::success(vec![Content::text(text)])
}

fn parse_field<T>(mut json: Value, field: &str) -> Result<T, ErrorData>
where
	T: serde::de::DeserializeOwned,
{
	let value = json.get_mut(field).map(Value::take).unwrap_or(Value::Null);

	serde_json::from_value(value).map_err(|err| {
		ErrorData::internal_error(format!("Unexpected {field} payload: {err}"), None)
	})
}

fn request_failed(err: reqwest::Error) -> ToolFailure {
	ToolFailure::Protocol(ErrorData::internal_error(format!("sift-api request failed: {err}"), None))
}

async fn read_response(response: reqwest::Response) -> Result<Value, ToolFailure> {
	let status = response.status();
	let bytes = response.bytes().await.map_err(|err| {
		ToolFailure::Protocol(ErrorData::internal_error(
			format!("sift-api response error: {err}"),
			None,
		))
	})?;
	let parsed = serde_json::from_slice::<Value>(&bytes).unwrap_or_else(|_| {
		let raw = String::from_utf8_lossy(&bytes).to_string();

		serde_json::json!({ "message": raw })
	});

	if status.is_success() {
		return Ok(parsed);
	}

	let message = parsed
		.get("message")
		.and_then(Value::as_str)
		.map(str::to_string)
		.unwrap_or_else(|| format!("sift-api returned status {status}."));

	Err(ToolFailure::Api { status: status.as_u16(), message })
}

async fn mcp_auth_middleware(
	State(auth_state): State<McpAuthState>,
	req: Request<Body>,
	next: Next,
) -> axum::response::Response {
	if !is_authorized(req.headers(), &auth_state) {
		return (StatusCode::UNAUTHORIZED, "A Bearer token matching security.mcp_auth_token is required.")
			.into_response();
	}

	next.run(req).await
}

fn search_profile_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"required": ["query"],
		"properties": {
			"query": { "type": "string", "description": "What to look for in the profile." },
			"topK": { "type": ["integer", "null"], "minimum": 1, "maximum": 10, "default": 5 }
		}
	}))
}

fn get_profile_section_schema() -> Arc<JsonObject> {
	let sections: Vec<&str> = ProfileSection::ALL.iter().map(|section| section.as_str()).collect();

	Arc::new(rmcp::object!({
		"type": "object",
		"required": ["section"],
		"properties": {
			"section": { "type": "string", "enum": sections }
		}
	}))
}

fn run_interview_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"required": ["jobTitle", "company"],
		"properties": {
			"jobTitle": { "type": "string" },
			"company": { "type": "string" },
			"requiredSkills": { "type": ["array", "null"], "items": { "type": "string" } },
			"responsibilities": { "type": ["array", "null"], "items": { "type": "string" } }
		}
	}))
}

fn compare_profile_with_job_schema() -> Arc<JsonObject> {
	Arc::new(rmcp::object!({
		"type": "object",
		"required": ["jobDescription"],
		"properties": {
			"jobDescription": { "type": "string", "description": "Full text of the job posting." },
			"jobTitle": { "type": ["string", "null"] },
			"company": { "type": ["string", "null"] }
		}
	}))
}

#[cfg(test)]
mod tests {
	use axum::{
		Json, Router,
		extract::Path,
		http::{HeaderMap, StatusCode},
		routing::{get, post},
	};
	use rmcp::model::ErrorCode;
	use serde_json::Value;

	use super::*;
	use sift_testkit::StubServer;

	fn params(value: Value) -> JsonObject {
		match value {
			Value::Object(map) => map,
			_ => JsonObject::new(),
		}
	}

	fn text_of(result: &CallToolResult) -> String {
		let json = serde_json::to_value(result).expect("serialize tool result");

		json["content"][0]["text"].as_str().unwrap_or_default().to_string()
	}

	fn is_error(result: &CallToolResult) -> bool {
		let json = serde_json::to_value(result).expect("serialize tool result");

		json["isError"].as_bool().unwrap_or(false)
	}

	async fn stub_api() -> StubServer {
		let app = Router::new()
			.route(
				"/api/search",
				post(|Json(body): Json<Value>| async move {
					assert_eq!(body["top_k"], 3);

					Json(serde_json::json!({
						"results": [
							{ "id": "a", "score": 0.876, "data": "Rust for 5 years", "metadata": { "type": "skill" } }
						]
					}))
				}),
			)
			.route(
				"/api/sections/{section}",
				get(|Path(section): Path<String>| async move {
					if section == "contact" {
						return (StatusCode::OK, Json(serde_json::json!({ "section": section, "results": [] })));
					}

					(
						StatusCode::BAD_GATEWAY,
						Json(serde_json::json!({
							"error_code": "upstream_error",
							"message": "Vector query request failed with status 503: busy"
						})),
					)
				}),
			)
			.route(
				"/api/interviews/simulate",
				post(|Json(body): Json<Value>| async move {
					Json(serde_json::json!({
						"job_title": body["job_title"],
						"company": body["company"],
						"questions": [],
						"score": 0,
						"passed": false,
						"recommendation": format!("skills: {}", body["required_skills"])
					}))
				}),
			)
			.route(
				"/api/profile/compare",
				post(|Json(body): Json<Value>| async move {
					assert_eq!(body["job_title"], Value::Null);
					assert_eq!(body["company"], "Acme");

					let job = body["job_description"].as_str().unwrap_or_default().to_string();

					Json(sift_service::compare::analyze("Familiar with Excel.", &job, "Analyst", "Acme"))
				}),
			);

		StubServer::spawn(app).await.expect("Failed to start stub API.")
	}

	#[test]
	fn registers_all_tools() {
		let names: Vec<String> =
			SiftMcp::tool_router().list_all().into_iter().map(|tool| tool.name.to_string()).collect();

		for name in [
			TOOL_SEARCH_PROFILE,
			TOOL_GET_PROFILE_SECTION,
			TOOL_RUN_INTERVIEW,
			TOOL_COMPARE_PROFILE_WITH_JOB,
		] {
			assert!(names.iter().any(|known| known == name), "Missing tool registration: {name}.");
		}

		assert_eq!(names.len(), 4, "Unexpected tool count for MCP registration.");
	}

	#[test]
	fn bearer_mode_requires_exact_token() {
		let state = McpAuthState::Bearer { token: "token-a".to_string() };
		let mut headers = HeaderMap::new();

		assert!(!is_authorized(&headers, &state));
		assert!(is_authorized(&headers, &McpAuthState::Off));

		headers.insert(HEADER_AUTHORIZATION, "bearer token-a".parse().expect("valid header"));

		assert!(!is_authorized(&headers, &state));

		headers.insert(HEADER_AUTHORIZATION, "Bearer token-a".parse().expect("valid header"));

		assert!(is_authorized(&headers, &state));
	}

	#[test]
	fn normalizes_api_base() {
		assert_eq!(normalize_api_base("0.0.0.0:8080/"), "http://127.0.0.1:8080");
		assert_eq!(normalize_api_base("https://api.example.com/"), "https://api.example.com");
	}

	#[test]
	fn top_k_defaults_and_rejects_out_of_range() {
		assert_eq!(read_top_k(&params(serde_json::json!({}))).expect("top_k"), 5);
		assert_eq!(read_top_k(&params(serde_json::json!({ "topK": 10 }))).expect("top_k"), 10);
		assert_eq!(read_top_k(&params(serde_json::json!({ "topK": 1 }))).expect("top_k"), 1);

		let err = read_top_k(&params(serde_json::json!({ "topK": 50 }))).expect_err("topK 50");

		assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
		assert!(err.message.contains("between 1 and 10"));
		assert!(read_top_k(&params(serde_json::json!({ "topK": 0 }))).is_err());
		assert!(read_top_k(&params(serde_json::json!({ "topK": -3 }))).is_err());
		assert!(read_top_k(&params(serde_json::json!({ "topK": "x" }))).is_err());
	}

	#[test]
	fn reads_string_lists() {
		let mut input = params(serde_json::json!({ "requiredSkills": [" Rust ", "", "Go"] }));

		assert_eq!(
			take_string_list(&mut input, "requiredSkills").expect("list"),
			vec!["Rust".to_string(), "Go".to_string()]
		);
		assert!(take_string_list(&mut input, "responsibilities").expect("list").is_empty());
	}

	#[tokio::test]
	async fn search_profile_formats_results() {
		let api = stub_api().await;
		let mcp = SiftMcp::new(api.url());
		let result = mcp
			.search_profile(params(serde_json::json!({ "query": "rust", "topK": 3 })))
			.await
			.expect("tool call");

		assert_eq!(text_of(&result), "1. [SKILL] (score: 0.88)\nRust for 5 years");

		let rejected =
			mcp.search_profile(params(serde_json::json!({ "query": "rust", "topK": 12 }))).await;

		assert!(rejected.is_err());
	}

	#[tokio::test]
	async fn section_reports_api_errors_as_tool_errors() {
		let api = stub_api().await;
		let mcp = SiftMcp::new(api.url());
		let empty = mcp
			.get_profile_section(params(serde_json::json!({ "section": "contact" })))
			.await
			.expect("tool call");

		assert_eq!(text_of(&empty), format::NO_SECTION_RESULTS);

		let failed = mcp
			.get_profile_section(params(serde_json::json!({ "section": "skills" })))
			.await
			.expect("tool call");

		assert!(is_error(&failed));
		assert_eq!(text_of(&failed), "Error: Vector query request failed with status 503: busy");

		let invalid =
			mcp.get_profile_section(params(serde_json::json!({ "section": "hobbies" }))).await;

		assert!(invalid.is_err());
	}

	#[tokio::test]
	async fn run_interview_renders_report() {
		let api = stub_api().await;
		let mcp = SiftMcp::new(api.url());
		let result = mcp
			.run_interview(params(serde_json::json!({
				"jobTitle": "SRE",
				"company": "Acme",
				"requiredSkills": ["Rust"]
			})))
			.await
			.expect("tool call");
		let text = text_of(&result);

		assert!(text.starts_with("# Interview Simulation: SRE at Acme\n\n## Result: ❌ FAIL (0%)"));
		assert!(text.contains(r#"skills: ["Rust"]"#));
	}

	#[tokio::test]
	async fn compare_profile_with_job_renders_report() {
		let api = stub_api().await;
		let mcp = SiftMcp::new(api.url());
		let result = mcp
			.compare_profile_with_job(params(serde_json::json!({
				"jobDescription": "Excel reporting.",
				"jobTitle": "  ",
				"company": "Acme"
			})))
			.await
			.expect("tool call");
		let text = text_of(&result);

		assert!(text.starts_with("# Profile Match: Analyst at Acme\n\n## Score: 6/10"));
		assert!(text.contains("- Excel (intermediate)"));

		let missing = mcp.compare_profile_with_job(params(serde_json::json!({ "company": "Acme" }))).await;

		assert!(missing.is_err());
	}
}
