//! Key issuance DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ApiKeyRecord;

/// Freshly issued key. The plaintext key is only ever shown here.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IssuedKeyResponse {
    pub key: String,
    /// Namespace to use in `/namespaces/{ns}/...` paths
    pub namespace: String,
}

impl From<ApiKeyRecord> for IssuedKeyResponse {
    fn from(record: ApiKeyRecord) -> Self {
        Self {
            key: record.key.as_str().to_string(),
            namespace: record.namespace.to_string(),
        }
    }
}
