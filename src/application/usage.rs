//! Usage ledger
//!
//! Append-only record of metered calls. Cost is derived from the record
//! count, so it only ever grows; under a lagging replica it may trail the
//! true figure for a while, but it never goes down.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rust_decimal::Decimal;
use sea_orm::{ActiveValue::NotSet, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use tracing::warn;

use crate::domain::GatewayResult;
use crate::infrastructure::crypto::digest_prefix;
use crate::infrastructure::database::entities::api_key_usage;
use crate::infrastructure::Store;

/// Longest endpoint label kept in a record.
const MAX_ENDPOINT_LEN: usize = 255;

/// Per-call rate when none is configured.
pub fn default_cost_per_call() -> Decimal {
    Decimal::new(1, 3)
}

/// Calls and cost for one key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageSummary {
    pub calls: u64,
    pub cost: Decimal,
}

#[derive(Clone)]
pub struct UsageLedger {
    store: Store,
    cost_per_call: Decimal,
    last_seen: Arc<DashMap<String, DateTime<Utc>>>,
}

impl UsageLedger {
    pub fn new(store: Store, cost_per_call: Decimal) -> Self {
        Self {
            store,
            cost_per_call,
            last_seen: Arc::new(DashMap::new()),
        }
    }

    /// Append one record. Failures are logged and counted, never returned.
    pub async fn record(&self, key_digest: &str, endpoint: &str) {
        let entry = api_key_usage::ActiveModel {
            id: NotSet,
            key_hash: Set(key_digest.to_string()),
            recorded_at: Set(self.next_timestamp(key_digest)),
            endpoint: Set(endpoint.chars().take(MAX_ENDPOINT_LEN).collect()),
        };
        let insert = api_key_usage::Entity::insert(entry)
            .exec_without_returning(self.store.connection());

        if let Err(err) = self.store.guard(insert).await {
            metrics::counter!("usage_record_failures_total").increment(1);
            warn!(
                key = digest_prefix(key_digest),
                endpoint,
                error = %err,
                "Failed to record usage"
            );
        }
    }

    /// Wall-clock time, clamped so a key's records never go backwards.
    fn next_timestamp(&self, key_digest: &str) -> DateTime<Utc> {
        let now = Utc::now();
        let mut last = self
            .last_seen
            .entry(key_digest.to_string())
            .or_insert(now);
        if *last < now {
            *last = now;
        }
        *last
    }

    pub async fn calls(&self, key_digest: &str) -> GatewayResult<u64> {
        let count = api_key_usage::Entity::find()
            .filter(api_key_usage::Column::KeyHash.eq(key_digest))
            .count(self.store.connection());
        self.store.guard(count).await.map_err(|e| e.escalate())
    }

    /// Recorded calls times the per-call rate.
    pub async fn cost(&self, key_digest: &str) -> GatewayResult<Decimal> {
        Ok(self.usage(key_digest).await?.cost)
    }

    pub async fn usage(&self, key_digest: &str) -> GatewayResult<UsageSummary> {
        let calls = self.calls(key_digest).await?;
        Ok(UsageSummary {
            calls,
            cost: Decimal::from(calls) * self.cost_per_call,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{bare_store, memory_store};
    use chrono::Duration;
    use sea_orm::QueryOrder;

    #[tokio::test]
    async fn cost_is_calls_times_rate() {
        let ledger = UsageLedger::new(memory_store().await, default_cost_per_call());
        for _ in 0..5 {
            ledger.record("digest-a", "GET /namespaces/{ns}/tables").await;
        }
        ledger.record("digest-b", "GET /usage").await;

        let usage = ledger.usage("digest-a").await.unwrap();
        assert_eq!(usage.calls, 5);
        assert_eq!(usage.cost, Decimal::new(5, 3));
        assert_eq!(ledger.cost("digest-b").await.unwrap(), Decimal::new(1, 3));
        assert_eq!(ledger.cost("nobody").await.unwrap(), Decimal::ZERO);
    }

    #[tokio::test]
    async fn record_failures_are_swallowed() {
        let ledger = UsageLedger::new(bare_store().await, default_cost_per_call());
        ledger.record("digest", "GET /usage").await;
        assert!(ledger.cost("digest").await.is_err());
    }

    #[tokio::test]
    async fn timestamps_never_go_backwards() {
        let store = memory_store().await;
        let ledger = UsageLedger::new(store.clone(), default_cost_per_call());
        let future = Utc::now() + Duration::hours(1);
        ledger.last_seen.insert("digest".to_string(), future);

        ledger.record("digest", "GET /usage").await;
        ledger.record("digest", "GET /usage").await;

        let stamps: Vec<DateTime<Utc>> = api_key_usage::Entity::find()
            .filter(api_key_usage::Column::KeyHash.eq("digest"))
            .order_by_asc(api_key_usage::Column::Id)
            .all(store.connection())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.recorded_at)
            .collect();
        assert_eq!(stamps.len(), 2);
        assert!(stamps.iter().all(|t| *t >= future));
        assert!(stamps[0] <= stamps[1]);
    }
}
