//! Tenant directory
//!
//! Source of truth for which keys exist and which namespace each one owns.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{EntityTrait, Set};
use tracing::{info, warn};

use crate::domain::{ApiKey, ApiKeyRecord, GatewayError, GatewayResult, Namespace, Tenant};
use crate::infrastructure::crypto::{digest_prefix, hash_api_key};
use crate::infrastructure::database::entities::api_key;
use crate::infrastructure::Store;
use crate::support::{retry_with_backoff, RetryConfig};

#[derive(Clone)]
pub struct TenantDirectory {
    store: Store,
    retry: RetryConfig,
}

impl TenantDirectory {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Issue a fresh key and make its namespace exist.
    ///
    /// Both writes are create-if-absent, so the pair is retried as a unit
    /// until it converges or a non-transient error occurs.
    pub async fn issue(&self) -> GatewayResult<ApiKeyRecord> {
        let key = ApiKey::generate();
        let namespace = Namespace::derive(&key);
        let digest = hash_api_key(key.as_str());

        retry_with_backoff(
            self.retry.clone(),
            || self.persist(&digest, &namespace),
            GatewayError::is_retryable,
            "issue_api_key",
        )
        .await?;

        info!(
            namespace = %namespace,
            key = digest_prefix(&digest),
            "Issued API key"
        );
        Ok(ApiKeyRecord { key, namespace })
    }

    async fn persist(&self, digest: &str, namespace: &Namespace) -> GatewayResult<()> {
        let entry = api_key::ActiveModel {
            key_hash: Set(digest.to_string()),
            namespace: Set(namespace.to_string()),
            created_at: Set(Utc::now()),
        };
        let insert = api_key::Entity::insert(entry)
            .on_conflict(
                OnConflict::column(api_key::Column::KeyHash)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.store.connection());
        self.store.guard(insert).await.map_err(|e| e.escalate())?;

        if let Some(ddl) = self.store.dialect().create_namespace(namespace) {
            self.store.execute(ddl).await.map_err(|e| e.escalate())?;
        }
        Ok(())
    }

    /// Resolve a presented key to its tenant.
    ///
    /// The namespace is re-derived from the key and must equal the one on
    /// record; an unknown, malformed or mismatched key is `Unauthorized`.
    /// Store failures propagate so an outage is not reported as a bad key.
    pub async fn authenticate(&self, presented: &str) -> GatewayResult<Tenant> {
        let key = ApiKey::parse(presented).ok_or(GatewayError::Unauthorized)?;
        let expected = Namespace::derive(&key);
        let digest = hash_api_key(key.as_str());

        let lookup = api_key::Entity::find_by_id(digest.clone()).one(self.store.connection());
        let record = self.store.guard(lookup).await.map_err(|e| e.escalate())?;

        match record {
            Some(record) if record.namespace == expected.as_str() => Ok(Tenant {
                namespace: expected,
                key_digest: digest,
            }),
            Some(_) => {
                warn!(
                    key = digest_prefix(&digest),
                    "Directory namespace does not match the key"
                );
                Err(GatewayError::Unauthorized)
            }
            None => Err(GatewayError::Unauthorized),
        }
    }
}
