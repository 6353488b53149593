//! Managed export capability: copies collections into object storage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::google_auth::AccessToken;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("export request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("export request rejected ({status}): {body}")]
    Rejected { status: u16, body: String },
    #[error("invalid export endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

/// Handle of an accepted, possibly still running, export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportHandle {
    pub operation: Option<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExportClient: Send + Sync {
    /// Returns once the export request is accepted, not when the export finishes.
    async fn export_collections(
        &self,
        output_uri_prefix: &str,
        collections: &[String],
        token: &AccessToken,
    ) -> Result<ExportHandle, ExportError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRequest<'a> {
    output_uri_prefix: &'a str,
    collection_ids: &'a [String],
}

#[derive(Debug, Deserialize)]
struct Operation {
    #[serde(default)]
    name: Option<String>,
}

/// Firestore Admin `exportDocuments` client for the default database.
pub struct FirestoreExportClient {
    http: reqwest::Client,
    base: Url,
    project_id: String,
}

impl FirestoreExportClient {
    pub fn new(http: reqwest::Client, base: Url, project_id: String) -> Self {
        Self {
            http,
            base,
            project_id,
        }
    }

    fn endpoint(&self) -> Result<Url, url::ParseError> {
        self.base.join(&format!(
            "v1/projects/{}/databases/(default):exportDocuments",
            self.project_id
        ))
    }
}

#[async_trait]
impl ExportClient for FirestoreExportClient {
    async fn export_collections(
        &self,
        output_uri_prefix: &str,
        collections: &[String],
        token: &AccessToken,
    ) -> Result<ExportHandle, ExportError> {
        let response = self
            .http
            .post(self.endpoint()?)
            .bearer_auth(token.secret())
            .json(&ExportRequest {
                output_uri_prefix,
                collection_ids: collections,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExportError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let operation: Operation = response.json().await?;
        Ok(ExportHandle {
            operation: operation.name,
        })
    }
}
