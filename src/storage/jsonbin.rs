use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use super::{http_client, StateStore};
use crate::allocator::AllocatorState;
use crate::error::{Error, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.jsonbin.io";

/// JSONBin v3 bin holding the link history as its record.
pub struct JsonBinStore {
    http: reqwest::Client,
    base_url: String,
    bin_id: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct BinResponse {
    record: Option<serde_json::Value>,
}

impl JsonBinStore {
    pub fn new(bin_id: &str, api_key: &str) -> Result<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, bin_id, api_key)
    }

    pub fn with_base_url(base_url: &str, bin_id: &str, api_key: &str) -> Result<Self> {
        Ok(Self {
            http: http_client(Duration::from_secs(10))?,
            base_url: base_url.trim_end_matches('/').to_string(),
            bin_id: bin_id.to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn bin_url(&self) -> String {
        format!("{}/v3/b/{}", self.base_url, self.bin_id)
    }
}

#[async_trait]
impl StateStore for JsonBinStore {
    fn name(&self) -> &'static str {
        "jsonbin"
    }

    async fn load(&self) -> Result<Option<AllocatorState>> {
        let res = self
            .http
            .get(format!("{}/latest", self.bin_url()))
            .header("X-Master-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("jsonbin request failed: {}", e)))?;

        let status = res.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(Error::Storage(format!("jsonbin load returned {}", status)));
        }

        let body: BinResponse = res
            .json()
            .await
            .map_err(|e| Error::Storage(format!("malformed jsonbin response: {}", e)))?;

        match body.record {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(record) => serde_json::from_value(record)
                .map(Some)
                .map_err(|e| Error::Storage(format!("malformed link history: {}", e))),
        }
    }

    async fn save(&self, state: &AllocatorState) -> Result<()> {
        let res = self
            .http
            .put(self.bin_url())
            .header("X-Master-Key", &self.api_key)
            .json(state)
            .send()
            .await
            .map_err(|e| Error::Storage(format!("jsonbin request failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            return Err(Error::Storage(format!("jsonbin save returned {}", status)));
        }
        Ok(())
    }
}
