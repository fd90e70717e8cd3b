use crate::domain::model::{Container, ResourceKind, Workload};
use crate::utils::error::ProtocolError;
use serde::Deserialize;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// AdmissionReview API versions the webhook answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    #[default]
    V1,
    V1Beta1,
}

impl SchemaVersion {
    pub fn api_version(&self) -> &'static str {
        match self {
            SchemaVersion::V1 => "admission.k8s.io/v1",
            SchemaVersion::V1Beta1 => "admission.k8s.io/v1beta1",
        }
    }

    fn from_api_version(api_version: Option<&str>) -> Result<Self, ProtocolError> {
        match api_version {
            None | Some("admission.k8s.io/v1") => Ok(SchemaVersion::V1),
            Some("admission.k8s.io/v1beta1") => Ok(SchemaVersion::V1Beta1),
            Some(other) => Err(ProtocolError::UnsupportedApiVersion(other.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReviewEnvelope {
    #[serde(default)]
    api_version: Option<String>,
    #[serde(default)]
    request: Option<RequestBody>,
}

// Both v1 and v1beta1 share this request shape.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestBody {
    #[serde(default)]
    uid: String,
    #[serde(default)]
    kind: GroupVersionKind,
    #[serde(default)]
    namespace: Option<String>,
    #[serde(default)]
    object: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct GroupVersionKind {
    #[serde(default)]
    kind: String,
}

/// Decoded admission request. `raw_payload` is the admitted object as sent.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionRequest {
    pub correlation_id: String,
    pub schema: SchemaVersion,
    pub resource_kind: String,
    pub namespace: Option<String>,
    pub raw_payload: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectMeta {
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PodSpec {
    #[serde(default)]
    containers: Vec<Container>,
    #[serde(default)]
    init_containers: Vec<Container>,
}

#[derive(Debug, Deserialize)]
struct PodObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: PodSpec,
}

#[derive(Debug, Deserialize)]
struct DeploymentObject {
    #[serde(default)]
    metadata: ObjectMeta,
    #[serde(default)]
    spec: DeploymentSpec,
}

#[derive(Debug, Default, Deserialize)]
struct DeploymentSpec {
    #[serde(default)]
    template: PodTemplateSpec,
}

#[derive(Debug, Default, Deserialize)]
struct PodTemplateSpec {
    #[serde(default)]
    spec: PodSpec,
}

/// A review the decoder refused, with the schema version to reply in.
#[derive(Debug)]
pub struct RejectedReview {
    pub schema: SchemaVersion,
    pub error: ProtocolError,
}

impl RejectedReview {
    fn new(schema: SchemaVersion, error: ProtocolError) -> Self {
        Self { schema, error }
    }
}

fn parse_envelope(
    content_type: Option<&str>,
    body: &[u8],
) -> Result<ReviewEnvelope, ProtocolError> {
    match content_type {
        None => return Err(ProtocolError::MissingContentType),
        Some(JSON_CONTENT_TYPE) => {}
        Some(other) => {
            return Err(ProtocolError::InvalidContentType {
                found: other.to_string(),
            })
        }
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProtocolError::EmptyBody);
    }
    serde_json::from_slice(body).map_err(ProtocolError::MalformedBody)
}

/// Turns webhook HTTP input into an [`AdmissionRequest`] and then into the
/// [`Workload`] of the configured kind.
#[derive(Debug, Clone, Copy)]
pub struct RequestDecoder {
    expected: ResourceKind,
}

impl RequestDecoder {
    pub fn new(expected: ResourceKind) -> Self {
        Self { expected }
    }

    pub fn expected_kind(&self) -> ResourceKind {
        self.expected
    }

    /// Decodes the envelope. On failure the returned [`RejectedReview`]
    /// carries the schema to answer in, once `apiVersion` was understood.
    pub fn decode(
        &self,
        content_type: Option<&str>,
        body: &[u8],
    ) -> Result<AdmissionRequest, RejectedReview> {
        let envelope = parse_envelope(content_type, body)
            .map_err(|error| RejectedReview::new(SchemaVersion::default(), error))?;
        let schema = SchemaVersion::from_api_version(envelope.api_version.as_deref())
            .map_err(|error| RejectedReview::new(SchemaVersion::default(), error))?;
        let reject = |error| RejectedReview::new(schema, error);

        let request = envelope
            .request
            .ok_or(ProtocolError::InvalidAdmission)
            .map_err(reject)?;
        if request.uid.is_empty() {
            return Err(reject(ProtocolError::MissingCorrelationId));
        }

        Ok(AdmissionRequest {
            correlation_id: request.uid,
            schema,
            resource_kind: request.kind.kind,
            namespace: request.namespace,
            raw_payload: request.object,
        })
    }

    pub fn decode_workload(&self, request: &AdmissionRequest) -> Result<Workload, ProtocolError> {
        if request.raw_payload.is_null() {
            return Err(ProtocolError::ObjectNotFound);
        }
        if request.resource_kind != self.expected.as_str() {
            return Err(ProtocolError::UnexpectedResource {
                expected: self.expected.as_str(),
                found: request.resource_kind.clone(),
            });
        }

        let malformed = |source| ProtocolError::MalformedObject {
            kind: self.expected.as_str(),
            source,
        };
        let (metadata, spec) = match self.expected {
            ResourceKind::Pod => {
                let pod = PodObject::deserialize(&request.raw_payload).map_err(malformed)?;
                (pod.metadata, pod.spec)
            }
            ResourceKind::Deployment => {
                let deployment =
                    DeploymentObject::deserialize(&request.raw_payload).map_err(malformed)?;
                (deployment.metadata, deployment.spec.template.spec)
            }
        };

        // Only the object's own namespace counts; the API server ignores the
        // pod template's.
        let namespace = metadata
            .namespace
            .filter(|ns| !ns.is_empty())
            .or_else(|| request.namespace.clone())
            .unwrap_or_default();

        Ok(Workload {
            namespace,
            containers: spec.containers,
            init_containers: spec.init_containers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn review(api_version: &str, kind: &str, object: serde_json::Value) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "apiVersion": api_version,
            "kind": "AdmissionReview",
            "request": {
                "uid": "705ab4f5-6393-11e8-b7cc-42010a800002",
                "kind": {"group": "apps", "version": "v1", "kind": kind},
                "namespace": "apps",
                "operation": "CREATE",
                "object": object
            }
        }))
        .unwrap()
    }

    fn deployment(image: &str) -> serde_json::Value {
        json!({
            "metadata": {"name": "web", "namespace": "apps"},
            "spec": {"template": {"spec": {
                "containers": [{"name": "web", "image": image}],
                "initContainers": [{"name": "init", "image": "busybox"}]
            }}}
        })
    }

    #[test]
    fn test_content_type_is_required_and_exact() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        let body = review("admission.k8s.io/v1", "Deployment", deployment("a"));

        assert!(matches!(
            decoder.decode(None, &body),
            Err(RejectedReview { error: ProtocolError::MissingContentType, .. })
        ));
        assert!(matches!(
            decoder.decode(Some("text/plain"), &body),
            Err(RejectedReview { error: ProtocolError::InvalidContentType { .. }, .. })
        ));
        assert!(matches!(
            decoder.decode(Some("application/json; charset=utf-8"), &body),
            Err(RejectedReview { error: ProtocolError::InvalidContentType { .. }, .. })
        ));
    }

    #[test]
    fn test_decodes_both_schema_versions() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        for (api_version, schema) in [
            ("admission.k8s.io/v1", SchemaVersion::V1),
            ("admission.k8s.io/v1beta1", SchemaVersion::V1Beta1),
        ] {
            let body = review(api_version, "Deployment", deployment("a"));
            let request = decoder.decode(Some(JSON_CONTENT_TYPE), &body).unwrap();
            assert_eq!(request.schema, schema);
            assert_eq!(request.correlation_id, "705ab4f5-6393-11e8-b7cc-42010a800002");
            assert_eq!(request.resource_kind, "Deployment");
        }

        let body = review("admission.k8s.io/v2", "Deployment", deployment("a"));
        assert!(matches!(
            decoder.decode(Some(JSON_CONTENT_TYPE), &body),
            Err(RejectedReview { error: ProtocolError::UnsupportedApiVersion(_), .. })
        ));
    }

    #[test]
    fn test_envelope_errors() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        let ct = Some(JSON_CONTENT_TYPE);

        assert!(matches!(
            decoder.decode(ct, b""),
            Err(RejectedReview { error: ProtocolError::EmptyBody, .. })
        ));
        assert!(matches!(
            decoder.decode(ct, b"{not json"),
            Err(RejectedReview { error: ProtocolError::MalformedBody(_), .. })
        ));
        assert!(matches!(
            decoder.decode(ct, br#"{"apiVersion":"admission.k8s.io/v1"}"#),
            Err(RejectedReview { error: ProtocolError::InvalidAdmission, .. })
        ));
        assert!(matches!(
            decoder.decode(ct, br#"{"request":{"kind":{"kind":"Deployment"}}}"#),
            Err(RejectedReview { error: ProtocolError::MissingCorrelationId, .. })
        ));
    }

    #[test]
    fn test_rejection_keeps_parsed_schema() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        let ct = Some(JSON_CONTENT_TYPE);

        let rejected = decoder
            .decode(ct, br#"{"apiVersion":"admission.k8s.io/v1beta1","request":{}}"#)
            .unwrap_err();
        assert_eq!(rejected.schema, SchemaVersion::V1Beta1);
        assert!(matches!(rejected.error, ProtocolError::MissingCorrelationId));

        let rejected = decoder.decode(ct, b"{not json").unwrap_err();
        assert_eq!(rejected.schema, SchemaVersion::V1);
    }

    #[test]
    fn test_template_namespace_is_ignored() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        let object = json!({
            "metadata": {"name": "web"},
            "spec": {"template": {
                "metadata": {"namespace": "kube-system"},
                "spec": {"containers": [{"image": "x"}]}
            }}
        });
        let body = review("admission.k8s.io/v1", "Deployment", object);
        let request = decoder.decode(Some(JSON_CONTENT_TYPE), &body).unwrap();

        assert_eq!(decoder.decode_workload(&request).unwrap().namespace, "apps");
    }

    #[test]
    fn test_decode_deployment_workload() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        let body = review("admission.k8s.io/v1", "Deployment", deployment("repo:1"));
        let request = decoder.decode(Some(JSON_CONTENT_TYPE), &body).unwrap();

        let workload = decoder.decode_workload(&request).unwrap();
        assert_eq!(workload.namespace, "apps");
        assert_eq!(workload.containers[0].image, "repo:1");
        assert_eq!(workload.init_containers[0].image, "busybox");
    }

    #[test]
    fn test_decode_pod_falls_back_to_request_namespace() {
        let decoder = RequestDecoder::new(ResourceKind::Pod);
        let pod = json!({"metadata": {"name": "p"}, "spec": {"containers": [{"image": "x"}]}});
        let body = review("admission.k8s.io/v1", "Pod", pod);
        let request = decoder.decode(Some(JSON_CONTENT_TYPE), &body).unwrap();

        let workload = decoder.decode_workload(&request).unwrap();
        assert_eq!(workload.namespace, "apps");
        assert_eq!(workload.containers.len(), 1);
    }

    #[test]
    fn test_workload_errors() {
        let decoder = RequestDecoder::new(ResourceKind::Deployment);
        let ct = Some(JSON_CONTENT_TYPE);

        let missing = review("admission.k8s.io/v1", "Deployment", serde_json::Value::Null);
        let request = decoder.decode(ct, &missing).unwrap();
        assert!(matches!(
            decoder.decode_workload(&request),
            Err(ProtocolError::ObjectNotFound)
        ));

        let pod = review("admission.k8s.io/v1", "Pod", deployment("a"));
        let request = decoder.decode(ct, &pod).unwrap();
        assert!(matches!(
            decoder.decode_workload(&request),
            Err(ProtocolError::UnexpectedResource { expected: "Deployment", .. })
        ));

        let broken = review(
            "admission.k8s.io/v1",
            "Deployment",
            json!({"spec": {"template": {"spec": {"containers": "nope"}}}}),
        );
        let request = decoder.decode(ct, &broken).unwrap();
        assert!(matches!(
            decoder.decode_workload(&request),
            Err(ProtocolError::MalformedObject { .. })
        ));
    }
}
