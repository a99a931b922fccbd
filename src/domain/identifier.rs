//! Identifier allow-listing
//!
//! Table and column names cannot be bound as parameters, so they are
//! interpolated into statement text. Only names made of `[A-Za-z0-9_]`
//! (1 to [`MAX_IDENTIFIER_LEN`] characters) ever reach a statement.

use std::fmt;

use super::error::GatewayError;

/// Longest accepted client identifier. Qualified physical names must stay
/// under backend identifier limits (63 bytes on Postgres).
pub const MAX_IDENTIFIER_LEN: usize = 48;

/// A client-supplied name that passed the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier(String);

impl Identifier {
    /// Validate `raw` as a table or column name.
    pub fn parse(raw: &str) -> Result<Self, GatewayError> {
        if is_safe_identifier(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(GatewayError::InvalidSchema(format!(
                "{:?} is not a valid identifier (1-{} characters from [A-Za-z0-9_])",
                truncate(raw),
                MAX_IDENTIFIER_LEN
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// `true` when `raw` may be interpolated into statement text.
pub fn is_safe_identifier(raw: &str) -> bool {
    !raw.is_empty()
        && raw.len() <= MAX_IDENTIFIER_LEN
        && raw.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn truncate(raw: &str) -> String {
    raw.chars().take(64).collect()
}
