use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::json;

use weblante_common::{DecisionRequest, SessionContext, WeblanteError};
use weblante_engine::DecisionEngine;

pub struct AppState {
    pub engine: DecisionEngine,
    pub session: SessionContext,
}

/// Inbound body. A missing `url` is rejected the same way as a blank one.
#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    url: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    body: String,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "ok" }))
        .route("/analyze", post(analyze))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}

pub async fn analyze(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AnalyzeRequest>,
) -> impl IntoResponse {
    let request = DecisionRequest {
        url: body.url.unwrap_or_default(),
        title: body.title,
        description: body.description,
        body: body.body,
    };
    if let Err(e) = request.validate() {
        let message = match e {
            WeblanteError::Validation(message) => message,
            other => other.to_string(),
        };
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": message }))).into_response();
    }

    let decision = state.engine.decide(&request, &state.session).await;
    Json(decision).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use weblante_engine::testing::MemoryActivityLog;

    async fn spawn(age: Option<u8>) -> String {
        let engine = DecisionEngine::builder()
            .activity(Arc::new(MemoryActivityLog::new()))
            .build();
        let state = Arc::new(AppState {
            engine,
            session: SessionContext::new(age),
        });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(state)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_health() {
        let base = spawn(None).await;
        let resp = reqwest::get(format!("{base}/")).await.unwrap();
        assert_eq!(resp.status(), 200);
        assert_eq!(resp.text().await.unwrap(), "ok");
    }

    #[tokio::test]
    async fn test_analyze_returns_decision() {
        let base = spawn(Some(10)).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/analyze"))
            .json(&json!({"url": "https://www.pornhub.com/", "title": "x"}))
            .send()
            .await
            .unwrap();

        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["verdict"], "block");
        assert_eq!(body["riskScore"], 1.0);
        assert_eq!(body["stage"], "ADULT_DOMAIN");
        assert_eq!(body["reasons"][0], "Known adult domain (pornhub.com)");
    }

    #[tokio::test]
    async fn test_analyze_allows_trusted_site() {
        let base = spawn(Some(12)).await;
        let resp = reqwest::Client::new()
            .post(format!("{base}/analyze"))
            .json(&json!({"url": "https://www.khanacademy.org/math"}))
            .send()
            .await
            .unwrap();

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["verdict"], "allow");
        assert_eq!(body["stage"], "ALLOWLIST");
    }

    #[tokio::test]
    async fn test_missing_or_blank_url_is_rejected() {
        let base = spawn(None).await;
        let client = reqwest::Client::new();

        for payload in [json!({}), json!({"url": "   "}), json!({"url": null})] {
            let resp = client
                .post(format!("{base}/analyze"))
                .json(&payload)
                .send()
                .await
                .unwrap();
            assert_eq!(resp.status(), 400, "{payload}");
            let body: Value = resp.json().await.unwrap();
            assert_eq!(body, json!({"error": "url is required"}));
        }
    }
}
