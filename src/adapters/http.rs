use crate::admission::AdmissionReviewResponse;
use crate::core::pipeline::AdmissionPipeline;
use crate::domain::ports::{ParameterStore, RegistryClient};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::CONTENT_TYPE, HeaderMap};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Webhook routes. `/mutate` is what the MutatingWebhookConfiguration
/// points at; `/` is kept for configurations registered without a path.
pub fn create_webhook_router<R, P>(pipeline: Arc<AdmissionPipeline<R, P>>) -> Router
where
    R: RegistryClient + 'static,
    P: ParameterStore + 'static,
{
    Router::new()
        .route("/", post(mutate::<R, P>))
        .route("/mutate", post(mutate::<R, P>))
        .route("/healthz", get(healthz))
        .with_state(pipeline)
}

async fn mutate<R, P>(
    State(pipeline): State<Arc<AdmissionPipeline<R, P>>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<AdmissionReviewResponse>
where
    R: RegistryClient + 'static,
    P: ParameterStore + 'static,
{
    // A header that is not valid UTF-8 is reported as an invalid content type.
    let content_type = headers
        .get(CONTENT_TYPE)
        .map(|value| value.to_str().unwrap_or_default());
    Json(pipeline.review(content_type, &body).await)
}

async fn healthz() -> &'static str {
    "ok"
}
