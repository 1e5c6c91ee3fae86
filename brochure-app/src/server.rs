//! HTTP surface: health probe plus the whole and streamed brochure endpoints.

use axum::extract::State;
use axum::http::{HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use brochure_common::BrochureError;
use brochure_pipeline::{BrochureFrame, BrochureRequest, BrochureService};
use futures::{Stream, StreamExt};
use serde::Serialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tracing::error;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Serialize)]
struct BrochureResponse {
    status: &'static str,
    brochure: String,
}

/// Fatal request failure, rendered as `500 {"detail": message}`.
struct ApiError(BrochureError);

impl From<BrochureError> for ApiError {
    fn from(e: BrochureError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!(error = %self.0, "brochure request failed");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "detail": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Build the router.
///
/// Credentials are allowed, so origins must be listed explicitly and methods
/// and headers are mirrored from the preflight rather than wildcarded.
pub fn router(service: BrochureService, cors_origins: &[String]) -> anyhow::Result<Router> {
    let origins = cors_origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("invalid CORS origin: {e}"))?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    Ok(Router::new()
        .route("/health", get(health))
        .route("/api/generate-brochure", post(generate_brochure))
        .route("/api/generate-brochure-stream", post(generate_brochure_stream))
        .layer(cors)
        .with_state(service))
}

/// Serve `app` on `addr` until Ctrl-C.
pub async fn serve(app: Router, addr: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("brochure API listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;
    Ok(())
}

/// Map one frame to its SSE event: `{"content":..}`, `{"error":..}`, or `[DONE]`.
pub fn frame_to_event(frame: &BrochureFrame) -> Event {
    match frame {
        BrochureFrame::Done => Event::default().data(DONE_SENTINEL),
        other => {
            let payload = serde_json::to_string(other)
                .unwrap_or_else(|e| json!({ "error": e.to_string() }).to_string());
            Event::default().data(payload)
        }
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn generate_brochure(
    State(service): State<BrochureService>,
    Json(request): Json<BrochureRequest>,
) -> Result<Json<BrochureResponse>, ApiError> {
    let brochure = service.generate_brochure(&request).await?;
    Ok(Json(BrochureResponse {
        status: "success",
        brochure,
    }))
}

async fn generate_brochure_stream(
    State(service): State<BrochureService>,
    Json(request): Json<BrochureRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let frames = service.generate_brochure_stream(&request).await?;
    Ok(Sse::new(frames.map(|frame| Ok(frame_to_event(&frame)))))
}
