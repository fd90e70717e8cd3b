//! AdmissionReview wire format: request decoding, JSON patch and response
//! envelopes for the `admission.k8s.io/v1` and `v1beta1` APIs.

pub mod patch;
pub mod request;
pub mod response;

pub use patch::{JsonPatch, PatchOperation};
pub use request::{
    AdmissionRequest, RejectedReview, RequestDecoder, SchemaVersion, JSON_CONTENT_TYPE,
};
pub use response::{AdmissionReviewResponse, ResponseBuilder};
