pub mod error;
pub mod identifier;
pub mod row;
pub mod schema;
pub mod tenant;

// Re-export commonly used types
pub use error::{GatewayError, GatewayResult};
pub use identifier::{Identifier, MAX_IDENTIFIER_LEN};
pub use row::{Row, RowPatch, SelectQuery, SortOrder, ROW_KEY_FIELD};
pub use schema::{ColumnType, TableDescriptor};
pub use tenant::{ApiKey, ApiKeyRecord, Namespace, Tenant};
