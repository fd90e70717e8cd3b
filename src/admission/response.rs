use crate::admission::request::SchemaVersion;
use crate::domain::model::AdmissionVerdict;
use crate::utils::error::{ProtocolError, BAD_REQUEST};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub const JSON_PATCH: &str = "JSONPatch";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionReviewResponse {
    pub api_version: String,
    pub kind: String,
    pub response: AdmissionResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    pub status: AdmissionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    /// Base64 of the JSON patch document.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionStatus {
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub code: u16,
}

impl AdmissionResponse {
    /// Raw patch bytes, if the response carries a mutation.
    pub fn decoded_patch(&self) -> Option<Vec<u8>> {
        self.patch.as_ref().and_then(|p| STANDARD.decode(p).ok())
    }
}

pub struct ResponseBuilder;

impl ResponseBuilder {
    pub fn build(schema: SchemaVersion, verdict: &AdmissionVerdict) -> AdmissionReviewResponse {
        let status = if verdict.allowed { "Success" } else { "Failure" };
        AdmissionReviewResponse {
            api_version: schema.api_version().to_string(),
            kind: "AdmissionReview".to_string(),
            response: AdmissionResponse {
                uid: verdict.correlation_id.clone(),
                allowed: verdict.allowed,
                status: AdmissionStatus {
                    status: status.to_string(),
                    message: verdict.status_message.clone(),
                    reason: verdict.reason.clone(),
                    code: verdict.status_code,
                },
                patch_type: verdict.patch.as_ref().map(|_| JSON_PATCH.to_string()),
                patch: verdict.patch.as_ref().map(|bytes| STANDARD.encode(bytes)),
            },
        }
    }

    /// Envelope for requests rejected before any policy ran. `uid` is empty
    /// when the request never yielded one.
    pub fn bad_request(
        schema: SchemaVersion,
        uid: Option<&str>,
        error: &ProtocolError,
    ) -> AdmissionReviewResponse {
        let verdict = AdmissionVerdict::deny(
            uid.unwrap_or_default(),
            BAD_REQUEST,
            "BadRequest",
            error.to_string(),
        );
        Self::build(schema, &verdict)
    }
}
