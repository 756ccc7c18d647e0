//! Google Drive storage provider.
//!
//! Creates folders via the Drive v3 `files` endpoint with a bearer
//! token. Only folder creation is needed: the project workflow builds a
//! top-level folder plus the standard subfolder set and never touches
//! file contents.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{AdapterError, Result};
use crate::traits::{CreatedFolder, StorageProvider};

/// Default Drive API base URL.
const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Folder MIME type in Drive.
const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Request timeout — collaborator calls must stay short so a slow
/// provider never stalls a whole message's processing.
const REQUEST_TIMEOUT_SECS: u64 = 8;

/// Google Drive folder-creation adapter.
pub struct DriveStorage {
    /// OAuth bearer token for the service account.
    access_token: String,
    /// API base URL, overridable for tests.
    base_url: String,
    http: reqwest::Client,
}

impl DriveStorage {
    /// Create a new Drive adapter with the given bearer token.
    pub fn new(access_token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("baubot/0.1")
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            access_token: access_token.into(),
            base_url: DRIVE_BASE_URL.to_owned(),
            http,
        }
    }

    /// Override the API base URL (tests against a local mock server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build the folder-creation request body.
    fn folder_metadata(name: &str, parent_id: Option<&str>) -> Value {
        let mut metadata = json!({
            "name": name,
            "mimeType": FOLDER_MIME_TYPE,
        });
        if let Some(parent) = parent_id {
            metadata["parents"] = json!([parent]);
        }
        metadata
    }
}

#[async_trait]
impl StorageProvider for DriveStorage {
    async fn create_folder(&self, name: &str, parent_id: Option<&str>) -> Result<CreatedFolder> {
        if self.access_token.is_empty() {
            return Err(AdapterError::Config(
                "no Drive access token configured".into(),
            ));
        }

        let url = format!(
            "{}/files?fields=id,webViewLink&supportsAllDrives=true",
            self.base_url
        );
        let body = Self::folder_metadata(name, parent_id);

        debug!(name = %name, parent = ?parent_id, "creating Drive folder");

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdapterError::RequestFailed {
                operation: "drive_create_folder".into(),
                reason: format!("failed to reach Drive API: {e}"),
            })?;

        let status = response.status();
        let payload: Value =
            response
                .json()
                .await
                .map_err(|e| AdapterError::InvalidResponse {
                    operation: "drive_create_folder".into(),
                    reason: format!("failed to parse response: {e}"),
                })?;

        if !status.is_success() {
            return Err(AdapterError::RequestFailed {
                operation: "drive_create_folder".into(),
                reason: format!("Drive API returned {status}: {payload}"),
            });
        }

        let folder_id = payload
            .get("id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| AdapterError::InvalidResponse {
                operation: "drive_create_folder".into(),
                reason: "response is missing `id`".into(),
            })?
            .to_string();

        let folder_link = payload
            .get("webViewLink")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        debug!(folder_id = %folder_id, name = %name, "Drive folder created");
        Ok(CreatedFolder {
            folder_id,
            folder_link,
        })
    }
}

// ── tests ────────────────────────────────────────────────────────────
