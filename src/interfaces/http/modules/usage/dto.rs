//! Usage DTOs

use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::application::UsageSummary;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UsageResponse {
    pub status: String,
    /// Metered calls recorded so far
    pub calls: u64,
    /// Calls times the per-call rate
    pub cost: f64,
}

impl From<UsageSummary> for UsageResponse {
    fn from(summary: UsageSummary) -> Self {
        Self {
            status: "success".to_string(),
            calls: summary.calls,
            cost: summary.cost.to_f64().unwrap_or_default(),
        }
    }
}
