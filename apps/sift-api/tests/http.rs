use std::sync::Arc;

use axum::{
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Map, Value};
use tower::util::ServiceExt;

use sift_api::{routes, state::AppState};
use sift_config::{Config, LlmProviderConfig, VectorProviderConfig};
use sift_providers::{chat::ChatMessage, vector::VectorMatch};
use sift_service::{
	BoxFuture, ChatCompletion, Providers, SiftService, VectorSearch, analytics::MemoryStore,
};

struct StaticVector {
	fail_with: Option<u16>,
}
impl VectorSearch for StaticVector {
	fn query<'a>(
		&'a self,
		_cfg: &'a VectorProviderConfig,
		_text: &'a str,
		top_k: u32,
	) -> BoxFuture<'a, sift_providers::Result<Vec<VectorMatch>>> {
		let result = match self.fail_with {
			Some(status) => Err(sift_providers::Error::UpstreamHttp {
				label: "Vector query".to_string(),
				status,
				body: "nope".to_string(),
			}),
			None => Ok(["skill", "experience", "skill"]
				.iter()
				.enumerate()
				.take(top_k as usize)
				.map(|(index, entry_type)| {
					let mut metadata = Map::new();

					metadata.insert("type".to_string(), Value::String(entry_type.to_string()));

					VectorMatch {
						id: format!("doc-{index}"),
						score: 0.9,
						data: Some(format!("Entry {index}")),
						metadata,
					}
				})
				.collect()),
		};

		Box::pin(async move { result })
	}
}

struct StaticChat;
impl ChatCompletion for StaticChat {
	fn complete<'a>(
		&'a self,
		_cfg: &'a LlmProviderConfig,
		_model: &'a str,
		_messages: &'a [ChatMessage],
	) -> BoxFuture<'a, sift_providers::Result<Option<String>>> {
		Box::pin(async move { Ok(Some("I write Rust.".to_string())) })
	}
}

fn app_with(cfg: Config, fail_with: Option<u16>) -> axum::Router {
	let store = Arc::new(MemoryStore::new(100));
	let providers = Providers::new(Arc::new(StaticVector { fail_with }), Arc::new(StaticChat));
	let service = SiftService::with_parts(cfg, providers, store);

	routes::router(AppState::from_service(service))
}

fn app() -> axum::Router {
	app_with(sift_testkit::sample_config().expect("Sample config must load."), None)
}

fn post_json(uri: &str, payload: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.")
}

fn get(uri: &str) -> Request<Body> {
	Request::builder().uri(uri).body(Body::empty()).expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes = body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");

	serde_json::from_slice(&bytes).expect("Response must be JSON.")
}

#[tokio::test]
async fn health_ok() {
	let response = app().oneshot(get("/health")).await.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn chat_returns_answer_and_sources() {
	let response = app()
		.oneshot(post_json("/api/chat", serde_json::json!({ "question": "What do you use?" })))
		.await
		.expect("Failed to call /api/chat.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["answer"], "I write Rust.");
	assert_eq!(json["sources"].as_array().map(Vec::len), Some(3));
	assert_eq!(json["sources"][0]["metadata"]["type"], "skill");
	assert_eq!(json["sources"][0]["data"], "Entry 0");
}

#[tokio::test]
async fn chat_rejects_blank_question() {
	let response = app()
		.oneshot(post_json("/api/chat", serde_json::json!({ "question": "   " })))
		.await
		.expect("Failed to call /api/chat.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let json = json_body(response).await;

	assert_eq!(json["error_code"], "invalid_request");
	assert_eq!(json["message"], "Please enter a question.");
	assert_eq!(json.as_object().map(|body| body.len()), Some(2));
}

#[tokio::test]
async fn chat_maps_upstream_failure_to_bad_gateway() {
	let cfg = sift_testkit::sample_config().expect("Sample config must load.");
	let response = app_with(cfg, Some(401))
		.oneshot(post_json("/api/chat", serde_json::json!({ "question": "Hello?" })))
		.await
		.expect("Failed to call /api/chat.");

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

	let json = json_body(response).await;

	assert_eq!(json["message"], "Vector query request failed with status 401: nope");
}

#[tokio::test]
async fn search_validates_top_k() {
	let router = app();
	let response = router
		.clone()
		.oneshot(post_json("/api/search", serde_json::json!({ "query": "rust", "top_k": 11 })))
		.await
		.expect("Failed to call /api/search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let response = router
		.oneshot(post_json("/api/search", serde_json::json!({ "query": "rust", "top_k": 2 })))
		.await
		.expect("Failed to call /api/search.");

	assert_eq!(response.status(), StatusCode::OK);
	assert_eq!(json_body(response).await["results"].as_array().map(Vec::len), Some(2));
}

#[tokio::test]
async fn section_filters_by_entry_type() {
	let router = app();
	let response =
		router.clone().oneshot(get("/api/sections/skills")).await.expect("Failed to call section.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["section"], "skills");
	assert_eq!(json["results"].as_array().map(Vec::len), Some(2));

	let response = router.oneshot(get("/api/sections/hobbies")).await.expect("Failed to call section.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn interview_simulation_returns_report() {
	let response = app()
		.oneshot(post_json(
			"/api/interviews/simulate",
			serde_json::json!({ "job_title": "SRE", "company": "Acme", "required_skills": ["Rust"] }),
		))
		.await
		.expect("Failed to call simulate.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["questions"].as_array().map(Vec::len), Some(6));
	assert_eq!(json["questions"][0]["category"], "HR");
}

#[tokio::test]
async fn profile_comparison_reports_gaps() {
	let router = app();
	let response = router
		.clone()
		.oneshot(post_json(
			"/api/profile/compare",
			serde_json::json!({ "job_description": "Title: Analyst\nCompany: Acme\nRequired: SQL." }),
		))
		.await
		.expect("Failed to call compare.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(response).await;

	assert_eq!(json["job_title"], "Analyst");
	assert_eq!(json["company"], "Acme");
	assert_eq!(json["overall_score"], 2);
	assert_eq!(json["gaps"][0]["skill"], "SQL/Database");
	assert_eq!(json["gaps"][0]["importance"], "critical");

	let response = router
		.oneshot(post_json("/api/profile/compare", serde_json::json!({ "job_description": " " })))
		.await
		.expect("Failed to call compare.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn analytics_requires_token_when_configured() {
	let mut cfg = sift_testkit::sample_config().expect("Sample config must load.");

	cfg.analytics.dashboard_token = Some("secret".to_string());

	let router = app_with(cfg, None);
	let response =
		router.clone().oneshot(get("/api/analytics")).await.expect("Failed to call analytics.");

	assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

	let response = router
		.clone()
		.oneshot(get("/api/analytics?token=secret"))
		.await
		.expect("Failed to call analytics.");

	assert_eq!(response.status(), StatusCode::OK);

	let by_header = Request::builder()
		.uri("/api/analytics")
		.header("x-analytics-token", "secret")
		.body(Body::empty())
		.expect("Failed to build request.");

	assert_eq!(router.clone().oneshot(by_header).await.expect("call").status(), StatusCode::OK);

	let by_bearer = Request::builder()
		.uri("/api/analytics")
		.header("authorization", "Bearer secret")
		.body(Body::empty())
		.expect("Failed to build request.");

	assert_eq!(router.clone().oneshot(by_bearer).await.expect("call").status(), StatusCode::OK);

	let wrong = Request::builder()
		.method("DELETE")
		.uri("/api/analytics?token=guess")
		.body(Body::empty())
		.expect("Failed to build request.");

	assert_eq!(router.oneshot(wrong).await.expect("call").status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn analytics_summarizes_and_clears() {
	let router = app();

	router
		.clone()
		.oneshot(post_json("/api/chat", serde_json::json!({ "question": "What do you use?" })))
		.await
		.expect("Failed to call /api/chat.");

	let json = json_body(
		router.clone().oneshot(get("/api/analytics")).await.expect("Failed to call analytics."),
	)
	.await;

	assert_eq!(json["total_queries"], 1);
	assert_eq!(json["success_count"], 1);
	assert_eq!(json["hourly_distribution"].as_array().map(Vec::len), Some(24));

	let clear = Request::builder()
		.method("DELETE")
		.uri("/api/analytics")
		.body(Body::empty())
		.expect("Failed to build request.");
	let response = router.clone().oneshot(clear).await.expect("Failed to clear analytics.");

	assert_eq!(response.status(), StatusCode::OK);

	let json = json_body(router.oneshot(get("/api/analytics")).await.expect("call")).await;

	assert_eq!(json["total_queries"], 0);
}
