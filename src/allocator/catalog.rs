use std::path::Path;

use crate::error::{Error, Result};

/// Static list of distributable links, loaded once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<String>,
}

impl Catalog {
    pub fn new(items: Vec<String>) -> Self {
        Self { items }
    }

    /// Parse a line-delimited list. Lines are trimmed and blank lines skipped.
    pub fn parse(text: &str) -> Self {
        let items = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();
        Self { items }
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::Catalog(format!("failed to read {}: {}", path.display(), e)))?;
        Ok(Self::parse(&text))
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
