//! Principal types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique principal identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrincipalId(pub Uuid);

impl PrincipalId {
    /// Create a new random principal ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a principal ID from a string
    pub fn parse(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl Default for PrincipalId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PrincipalId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// A registered principal, as seen outside the credential store.
///
/// Carries no credential material: the password hash and token digests
/// stay in the store row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier
    pub id: PrincipalId,
    /// Unique, case-sensitive identity (usually an email address)
    pub identity: String,
    /// Registration time
    pub created_at: DateTime<Utc>,
    /// Last credential or session change
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_principal_id_parse_roundtrip() {
        let id = PrincipalId::new();
        let parsed = PrincipalId::parse(&id.to_string()).unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_principal_id_parse_rejects_garbage() {
        assert!(PrincipalId::parse("not-a-uuid").is_err());
    }

    #[test]
    fn test_principal_serializes_without_credentials() {
        let now = Utc::now();
        let principal = Principal {
            id: PrincipalId::new(),
            identity: "a@x.com".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_value(&principal).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        assert!(keys.contains(&"identity"));
        assert!(!keys.iter().any(|k| k.contains("hash") || k.contains("token")));
    }
}
