//! Change notifications delivered by the document store after a commit.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Reports,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Reports => "reports",
        }
    }
}

/// Wire envelope for a change notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeNotification<T> {
    /// Delivery id assigned by the notifier; stable across redeliveries.
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub before: Option<T>,
    pub after: T,
}

/// One committed mutation of a single document.
#[derive(Debug, Clone)]
pub struct DocumentChange<T> {
    pub collection: Collection,
    pub document_id: String,
    pub event_id: Option<String>,
    /// Empty for creations.
    pub before: Option<T>,
    pub after: T,
}

impl<T> DocumentChange<T> {
    pub fn from_notification(
        collection: Collection,
        document_id: impl Into<String>,
        notification: ChangeNotification<T>,
    ) -> Self {
        Self {
            collection,
            document_id: document_id.into(),
            event_id: notification.event_id,
            before: notification.before,
            after: notification.after,
        }
    }
}

/// Renders a document field for human-readable text: strings verbatim, any
/// other value as its JSON text.
pub fn field_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}
