pub mod query;
pub mod rate_budget;
pub mod tenants;
pub mod usage;

// Re-export key types for convenience
pub use query::{CreateTable, PageLimits, QueryBuilder};
pub use rate_budget::{RateBudget, RateBudgetConfig};
pub use tenants::TenantDirectory;
pub use usage::{UsageLedger, UsageSummary};
