use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use super::{http_client, StateStore};
use crate::allocator::AllocatorState;
use crate::error::{Error, Result};

pub const DEFAULT_CONTENT_URL: &str = "https://content.dropboxapi.com";

/// Value of the `Dropbox-API-Arg` header
#[derive(Serialize)]
struct ApiArg<'a> {
    path: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mode: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mute: Option<bool>,
}

/// A single JSON file in a Dropbox app folder.
pub struct DropboxStore {
    http: reqwest::Client,
    content_url: String,
    token: String,
    path: String,
}

impl DropboxStore {
    pub fn new(token: &str, path: &str) -> Result<Self> {
        Self::with_content_url(DEFAULT_CONTENT_URL, token, path)
    }

    pub fn with_content_url(content_url: &str, token: &str, path: &str) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(10))?,
            content_url: content_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            path: path.to_string(),
        })
    }

    fn api_arg(&self, upload: bool) -> Result<String> {
        let arg = ApiArg {
            path: &self.path,
            mode: upload.then_some("overwrite"),
            mute: upload.then_some(true),
        };
        serde_json::to_string(&arg)
            .map_err(|e| Error::Internal(format!("failed to encode Dropbox-API-Arg: {}", e)))
    }
}

#[async_trait]
impl StateStore for DropboxStore {
    fn name(&self) -> &'static str {
        "dropbox"
    }

    async fn load(&self) -> Result<Option<AllocatorState>> {
        let res = self
            .http
            .post(format!("{}/2/files/download", self.content_url))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", self.api_arg(false)?)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("dropbox request failed: {}", e)))?;

        let status = res.status();
        if status == StatusCode::CONFLICT {
            // Endpoint errors come back as 409 with a tagged JSON summary
            let body = res.text().await.unwrap_or_default();
            if body.contains("not_found") {
                return Ok(None);
            }
            return Err(Error::Storage(format!("dropbox download failed: {}", body)));
        }
        if !status.is_success() {
            return Err(Error::Storage(format!("dropbox download returned {}", status)));
        }

        let bytes = res
            .bytes()
            .await
            .map_err(|e| Error::Storage(format!("dropbox download interrupted: {}", e)))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| Error::Storage(format!("malformed link history: {}", e)))
    }

    async fn save(&self, state: &AllocatorState) -> Result<()> {
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| Error::Internal(format!("failed to encode link history: {}", e)))?;

        let res = self
            .http
            .post(format!("{}/2/files/upload", self.content_url))
            .bearer_auth(&self.token)
            .header("Dropbox-API-Arg", self.api_arg(true)?)
            .header("Content-Type", "application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("dropbox request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(Error::Storage(format!(
                "dropbox upload returned {}: {}",
                status, body
            )));
        }
        Ok(())
    }
}
