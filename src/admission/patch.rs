use crate::domain::model::ResourceKind;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: String,
    pub path: String,
    pub value: String,
}

/// RFC 6902 document sent back with a mutating admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JsonPatch(pub Vec<PatchOperation>);

impl JsonPatch {
    /// Replaces the image of the first container of a `kind` object.
    // Index 0 is targeted even when the ECR image sits in another container.
    pub fn replace_image(kind: ResourceKind, image: &str) -> Self {
        JsonPatch(vec![PatchOperation {
            op: "replace".to_string(),
            path: kind.first_image_path().to_string(),
            value: image.to_string(),
        }])
    }

    pub fn to_bytes(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
