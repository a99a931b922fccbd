//! Tenant identity: API keys and the namespaces derived from them

use std::fmt;

use uuid::Uuid;

use super::error::GatewayError;

/// Prefix of every tenant namespace.
pub const NAMESPACE_PREFIX: &str = "ks_";

/// An API key in canonical form: a lowercase, hyphenated UUID v4.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Generate a new key from the OS random source.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().hyphenated().to_string())
    }

    /// Accept only the canonical rendering, so every key has exactly one
    /// spelling and therefore exactly one namespace.
    pub fn parse(raw: &str) -> Option<Self> {
        let uuid = Uuid::try_parse(raw).ok()?;
        let canonical = uuid.hyphenated().to_string();
        (canonical == raw).then_some(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ApiKey({}...)", &self.0[..8])
    }
}

/// A tenant's private container in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// Fixed public transform: `ks_` followed by the key with `-` replaced
    /// by `_`. Canonical keys contain no `_`, so the mapping is injective.
    pub fn derive(key: &ApiKey) -> Self {
        Self(format!("{}{}", NAMESPACE_PREFIX, key.as_str().replace('-', "_")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An issued key with its namespace. Only returned once, at issuance.
#[derive(Debug, Clone)]
pub struct ApiKeyRecord {
    pub key: ApiKey,
    pub namespace: Namespace,
}

/// The caller behind an authenticated request.
#[derive(Debug, Clone)]
pub struct Tenant {
    /// Namespace re-derived from the presented key and confirmed against
    /// the directory.
    pub namespace: Namespace,
    /// SHA-256 digest of the key; the caller identity for metering and
    /// rate budgets.
    pub key_digest: String,
}

impl Tenant {
    /// Resolve a namespace named in a request path. Anything other than the
    /// caller's own namespace is `Unauthorized`, never a lookup elsewhere.
    pub fn scope(&self, requested: &str) -> Result<&Namespace, GatewayError> {
        if requested == self.namespace.as_str() {
            Ok(&self.namespace)
        } else {
            Err(GatewayError::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identifier::is_safe_identifier;

    #[test]
    fn namespace_is_a_safe_identifier() {
        let key = ApiKey::generate();
        let ns = Namespace::derive(&key);
        assert!(ns.as_str().starts_with(NAMESPACE_PREFIX));
        assert!(is_safe_identifier(ns.as_str()));
        assert!(!ns.as_str().contains("__"));
    }

    #[test]
    fn derivation_is_deterministic_and_distinct() {
        let a = ApiKey::generate();
        let b = ApiKey::generate();
        assert_eq!(Namespace::derive(&a), Namespace::derive(&a.clone()));
        assert_ne!(Namespace::derive(&a), Namespace::derive(&b));
    }

    #[test]
    fn derivation_follows_the_fixed_transform() {
        let key = ApiKey::parse("2f1c7e9a-5b3d-4c8e-9f0a-1b2c3d4e5f60").unwrap();
        assert_eq!(
            Namespace::derive(&key).as_str(),
            "ks_2f1c7e9a_5b3d_4c8e_9f0a_1b2c3d4e5f60"
        );
    }

    #[test]
    fn parse_accepts_only_canonical_keys() {
        let key = ApiKey::generate();
        assert!(ApiKey::parse(key.as_str()).is_some());
        assert!(ApiKey::parse(&key.as_str().to_uppercase()).is_none());
        assert!(ApiKey::parse(&key.as_str().replace('-', "")).is_none());
        assert!(ApiKey::parse("").is_none());
        assert!(ApiKey::parse("ks_abc").is_none());
    }

    #[test]
    fn debug_output_redacts_the_key() {
        let key = ApiKey::generate();
        let rendered = format!("{:?}", key);
        assert!(!rendered.contains(key.as_str()));
    }

    #[test]
    fn tenant_scope_rejects_foreign_namespaces() {
        let own = Namespace::derive(&ApiKey::generate());
        let other = Namespace::derive(&ApiKey::generate());
        let tenant = Tenant {
            namespace: own.clone(),
            key_digest: "digest".into(),
        };
        assert_eq!(tenant.scope(own.as_str()).unwrap(), &own);
        assert!(matches!(
            tenant.scope(other.as_str()),
            Err(GatewayError::Unauthorized)
        ));
    }
}
