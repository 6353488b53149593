//! Identities, role claims and the callers that carry them.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Role claim attached to an identity by the identity provider.
///
/// The set is open: claims this service does not know about are preserved
/// verbatim in [`Role::Other`] and never match a known role.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    BarangayOfficial,
    Resident,
    Other(String),
}

impl Role {
    /// Returns the claim value exactly as stored by the identity provider.
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "Admin",
            Role::BarangayOfficial => "barangay_official",
            Role::Resident => "resident",
            Role::Other(other) => other,
        }
    }

    /// Claim values are case sensitive; `admin` is not `Admin`.
    pub fn from_claim(value: &str) -> Self {
        match value {
            "Admin" => Role::Admin,
            "barangay_official" => Role::BarangayOfficial,
            "resident" => Role::Resident,
            other => Role::Other(other.to_string()),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Role::from_claim(&s))
    }
}

/// A verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub uid: String,
    pub email: Option<String>,
    pub role: Option<Role>,
}

/// Who invoked an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    /// No credentials, or credentials that failed verification.
    Anonymous,
    User(Principal),
    /// The recurring scheduler. It carries no role claim.
    System,
}

impl Caller {
    /// Short label for diagnostics.
    pub fn label(&self) -> String {
        match self {
            Caller::Anonymous => "anonymous".to_string(),
            Caller::User(principal) => format!("user:{}", principal.uid),
            Caller::System => "system".to_string(),
        }
    }
}

/// An identity record as returned by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub uid: String,
    pub email: String,
    pub role: Option<Role>,
}

/// Snapshot of a `users/{id}` document. Fields are raw values, as in
/// [`ReportDocument`](crate::models::report::ReportDocument).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDocument {
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub name: Option<Value>,
}
