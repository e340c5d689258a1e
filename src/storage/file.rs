use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;

use super::StateStore;
use crate::allocator::AllocatorState;
use crate::error::{Error, Result};

/// Local JSON file, written through a temp file and rename.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl StateStore for FileStore {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self) -> Result<Option<AllocatorState>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        if text.trim().is_empty() {
            return Ok(None);
        }

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| Error::Storage(format!("malformed link history: {}", e)))
    }

    async fn save(&self, state: &AllocatorState) -> Result<()> {
        let body = serde_json::to_vec_pretty(state)
            .map_err(|e| Error::Internal(format!("failed to encode link history: {}", e)))?;

        let tmp = self.temp_path();
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| Error::Storage(format!("failed to write {}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| Error::Storage(format!("failed to replace {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}
