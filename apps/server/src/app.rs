//! Axum application: state, routes, handlers, and the embedded form page.
//!
//! The server is stateless between requests: API keys arrive with each
//! research call (or fall back to configured env vars) and reports live only
//! in the response. The research handler awaits the pipeline directly inside
//! the async handler; there is no separate render loop to reconcile with.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use deepdraft_core::{PipelineOptions, ProgressReporter, ResearchOutcome, run_research};
use deepdraft_firecrawl::FirecrawlClient;
use deepdraft_gemini::GeminiClient;
use deepdraft_shared::{Activity, AppConfig, DeepDraftError, ResearchRequest, resolve_api_key};

/// The single-page form UI, embedded in the binary.
const INDEX_HTML: &str = include_str!("../assets/index.html");

// ---------------------------------------------------------------------------
// State and wiring
// ---------------------------------------------------------------------------

/// Shared application state: just the resolved config.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
}

/// Bind and run the web server until the process is stopped.
pub async fn serve(config: AppConfig, host: &str, port: u16) -> color_eyre::eyre::Result<()> {
    let state = AppState {
        config: Arc::new(config),
    };
    let app = build_router(state);

    let listener = TcpListener::bind((host, port)).await?;
    info!(%host, port, "deepdraft listening, open http://{host}:{port}/ in a browser");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the router. Split out from [`serve`] so tests can drive it directly.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(index_handler))
        .route("/api/research", post(research_handler))
        .route("/api/report/download", post(download_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

/// Body of `POST /api/research`. Keys are optional; absent keys fall back to
/// the configured env vars. Absent crawl parameters use config defaults.
#[derive(Debug, Deserialize)]
struct ResearchApiRequest {
    topic: String,
    #[serde(default)]
    gemini_api_key: Option<String>,
    #[serde(default)]
    firecrawl_api_key: Option<String>,
    #[serde(default)]
    max_depth: Option<u32>,
    #[serde(default)]
    time_limit_secs: Option<u32>,
    #[serde(default)]
    max_urls: Option<u32>,
}

/// Body of `200 OK` from `POST /api/research`.
#[derive(Debug, Serialize)]
struct ResearchApiResponse {
    run_id: String,
    topic: String,
    title: String,
    source_count: usize,
    initial_report: String,
    enhanced_report: String,
    filename: String,
    activity_log: Vec<String>,
    elapsed_ms: u128,
}

impl ResearchApiResponse {
    fn from_outcome(outcome: ResearchOutcome, activity_log: Vec<String>) -> Self {
        Self {
            run_id: outcome.run_id.to_string(),
            title: deepdraft_report::extract_title(&outcome.enhanced.markdown),
            filename: deepdraft_report::report_filename(&outcome.topic),
            topic: outcome.topic,
            source_count: outcome.source_count,
            initial_report: outcome.initial.markdown,
            enhanced_report: outcome.enhanced.markdown,
            activity_log,
            elapsed_ms: outcome.elapsed.as_millis(),
        }
    }
}

/// Body of `POST /api/report/download`.
#[derive(Debug, Deserialize)]
struct DownloadRequest {
    topic: String,
    markdown: String,
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// JSON error envelope. Bad user input maps to 400, upstream failures to 502.
/// Nothing is fatal; the user may simply resubmit.
struct ApiError(DeepDraftError);

impl From<DeepDraftError> for ApiError {
    fn from(err: DeepDraftError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_user_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::BAD_GATEWAY
        };
        warn!(error = %self.0, "research request failed");
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

// ---------------------------------------------------------------------------
// Progress collection
// ---------------------------------------------------------------------------

/// Collects phases and crawler activities into a run log returned to the UI.
#[derive(Default)]
struct CollectingProgress {
    log: Mutex<Vec<String>>,
}

impl CollectingProgress {
    fn into_log(self) -> Vec<String> {
        self.log.into_inner().unwrap_or_default()
    }
}

impl ProgressReporter for CollectingProgress {
    fn phase(&self, name: &str) {
        if let Ok(mut log) = self.log.lock() {
            log.push(name.to_string());
        }
    }

    fn activity(&self, activity: &Activity) {
        if let Ok(mut log) = self.log.lock() {
            log.push(activity.to_string());
        }
    }

    fn done(&self, _outcome: &ResearchOutcome) {}
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn research_handler(
    State(state): State<AppState>,
    Json(body): Json<ResearchApiRequest>,
) -> Result<Json<ResearchApiResponse>, ApiError> {
    let config = &state.config;

    let firecrawl_key = resolve_api_key(
        body.firecrawl_api_key.as_deref(),
        &config.firecrawl.api_key_env,
    )?;
    let gemini_key = resolve_api_key(body.gemini_api_key.as_deref(), &config.gemini.api_key_env)?;

    let request = ResearchRequest {
        topic: body.topic,
        max_depth: body.max_depth.unwrap_or(config.research.max_depth),
        time_limit_secs: body
            .time_limit_secs
            .unwrap_or(config.research.time_limit_secs),
        max_urls: body.max_urls.unwrap_or(config.research.max_urls),
    };

    let provider = FirecrawlClient::new(
        firecrawl_key,
        &config.firecrawl.base_url,
        config.firecrawl.poll_interval_ms,
    )?;
    let generator = GeminiClient::new(gemini_key, &config.gemini.base_url, &config.gemini.model)?;

    let options = PipelineOptions {
        max_prompt_sources: config.research.max_prompt_sources,
    };

    let progress = CollectingProgress::default();
    let outcome = run_research(&provider, &generator, &request, &options, &progress).await?;

    Ok(Json(ResearchApiResponse::from_outcome(
        outcome,
        progress.into_log(),
    )))
}

/// Echo a report back as a Markdown attachment. The filename comes from the
/// topic, whitespace collapsed to underscores.
async fn download_handler(Json(body): Json<DownloadRequest>) -> Response {
    let filename = deepdraft_report::report_filename(&body.topic);

    (
        [
            (header::CONTENT_TYPE, "text/markdown; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body.markdown,
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn router_with(config: AppConfig) -> Router {
        build_router(AppState {
            config: Arc::new(config),
        })
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn health_endpoint() {
        let app = router_with(AppConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");
    }

    #[tokio::test]
    async fn index_serves_the_form() {
        let app = router_with(AppConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_string(response).await;
        assert!(html.contains("deepdraft"));
        assert!(html.contains("Gemini API Key"));
        assert!(html.contains("Firecrawl API Key"));
        assert!(html.contains("Start Research"));
    }

    #[tokio::test]
    async fn download_sets_attachment_filename() {
        let app = router_with(AppConfig::default());
        let response = app
            .oneshot(json_request(
                "/api/report/download",
                serde_json::json!({
                    "topic": "electric vehicles",
                    "markdown": "# Report\n\nbody",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let disposition = response
            .headers()
            .get(header::CONTENT_DISPOSITION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert_eq!(
            disposition,
            "attachment; filename=\"electric_vehicles_report.md\""
        );
        assert_eq!(body_string(response).await, "# Report\n\nbody");
    }

    #[tokio::test]
    async fn blank_topic_is_a_400() {
        let app = router_with(AppConfig::default());
        let response = app
            .oneshot(json_request(
                "/api/research",
                serde_json::json!({
                    "topic": "   ",
                    "gemini_api_key": "g-key",
                    "firecrawl_api_key": "fc-key",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_string(response).await;
        assert!(body.contains("topic must not be empty"));
    }

    #[tokio::test]
    async fn missing_keys_are_a_400() {
        let mut config = AppConfig::default();
        // Point at env vars that cannot exist so the fallback fails too.
        config.gemini.api_key_env = "DD_TEST_NO_GEMINI_KEY_98765".into();
        config.firecrawl.api_key_env = "DD_TEST_NO_FIRECRAWL_KEY_98765".into();

        let app = router_with(config);
        let response = app
            .oneshot(json_request(
                "/api/research",
                serde_json::json!({ "topic": "electric vehicles" }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(body_string(response).await.contains("API key missing"));
    }

    #[tokio::test]
    async fn research_end_to_end_with_mocked_upstreams() {
        let upstream = MockServer::start().await;

        // Firecrawl: submit then complete on the first poll. The one source
        // has no summary, which must surface as the placeholder in the draft
        // prompt sent to Gemini.
        Mock::given(method("POST"))
            .and(path("/v1/deep-research"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "id": "job-e2e",
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        Mock::given(method("GET"))
            .and(path("/v1/deep-research/job-e2e"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "status": "completed",
                "activities": [
                    {"type": "search", "message": "scanning EV coverage"},
                ],
                "data": {
                    "finalAnalysis": "EVs keep getting cheaper.",
                    "sources": [
                        {"url": "example.com", "title": "EV overview"},
                    ],
                },
            })))
            .mount(&upstream)
            .await;

        // Gemini: the draft call must carry the placeholder for the
        // summary-less source; the enhance call must carry the draft text.
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(body_string_contains("No summary available"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "# EV Draft\n\nInitial findings."}]}}],
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(body_string_contains("INITIAL RESEARCH REPORT"))
            .and(body_string_contains("EV Draft"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": "# EV Enhanced\n\nDeeper findings."}]}}],
            })))
            .expect(1)
            .mount(&upstream)
            .await;

        let mut config = AppConfig::default();
        config.firecrawl.base_url = upstream.uri();
        config.firecrawl.poll_interval_ms = 0;
        config.gemini.base_url = upstream.uri();

        let app = router_with(config);
        let response = app
            .oneshot(json_request(
                "/api/research",
                serde_json::json!({
                    "topic": "electric vehicles",
                    "gemini_api_key": "g-key",
                    "firecrawl_api_key": "fc-key",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();

        assert_eq!(body["topic"], "electric vehicles");
        assert_eq!(body["source_count"], 1);
        assert_eq!(body["initial_report"], "# EV Draft\n\nInitial findings.");
        assert_eq!(body["enhanced_report"], "# EV Enhanced\n\nDeeper findings.");
        assert_eq!(body["title"], "EV Enhanced");
        assert_eq!(body["filename"], "electric_vehicles_report.md");

        let log: Vec<String> = body["activity_log"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert!(log.iter().any(|line| line.contains("Performing deep research")));
        assert!(log.iter().any(|line| line.contains("scanning EV coverage")));
        assert!(log.iter().any(|line| line.contains("Enhancing report")));
    }

    #[tokio::test]
    async fn upstream_failure_is_a_502() {
        let upstream = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/deep-research"))
            .respond_with(
                ResponseTemplate::new(401).set_body_string(r#"{"error": "Unauthorized"}"#),
            )
            .mount(&upstream)
            .await;

        let mut config = AppConfig::default();
        config.firecrawl.base_url = upstream.uri();
        config.firecrawl.poll_interval_ms = 0;

        let app = router_with(config);
        let response = app
            .oneshot(json_request(
                "/api/research",
                serde_json::json!({
                    "topic": "electric vehicles",
                    "gemini_api_key": "g-key",
                    "firecrawl_api_key": "bad-key",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert!(body_string(response).await.contains("Unauthorized"));
    }
}
