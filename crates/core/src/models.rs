//! Model listing payloads.

use serde::{Deserialize, Serialize};

/// Creation timestamp reported for every listed model.
const MODEL_CREATED: u64 = 1_677_610_602;

/// Response body of `GET /v1/models`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelList {
    /// Always "list".
    pub object: String,
    /// The models, in registry order.
    pub data: Vec<ModelObject>,
}

/// One listed model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ModelObject {
    /// Model id, as routed.
    pub id: String,
    /// Always "model".
    pub object: String,
    /// Creation timestamp.
    pub created: u64,
    /// Name of the provider serving the model.
    pub owned_by: String,
}

impl ModelObject {
    /// Describe a model served by `owner`.
    pub fn new(id: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            object: "model".into(),
            created: MODEL_CREATED,
            owned_by: owner.into(),
        }
    }
}

impl FromIterator<ModelObject> for ModelList {
    fn from_iter<I: IntoIterator<Item = ModelObject>>(iter: I) -> Self {
        Self {
            object: "list".into(),
            data: iter.into_iter().collect(),
        }
    }
}
