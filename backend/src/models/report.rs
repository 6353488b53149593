use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Snapshot of a `reports/{id}` document. Only the fields the audit trail reads.
///
/// Fields are kept as raw values: the client application owns the schema and a
/// committed document must never be rejected for a field's type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    #[serde(default)]
    pub address: Option<Value>,
    /// Ordinance reference; shape is owned by the client application.
    #[serde(default)]
    pub ordinance: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
    #[serde(default)]
    pub action_taken: Option<Value>,
}
