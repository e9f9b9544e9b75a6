//! JSON file source for offline runs.

use crate::error::SourceError;
use crate::models::RawItem;
use crate::source::NewsSource;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

/// Reads a JSON array of raw items from disk.
pub struct FileSource {
    path: PathBuf,
    max_items: usize,
}

impl FileSource {
    pub fn new(path: PathBuf, max_items: usize) -> Self {
        Self { path, max_items }
    }
}

#[async_trait]
impl NewsSource for FileSource {
    async fn fetch(&self) -> Result<Vec<RawItem>, SourceError> {
        let path = self.path.display().to_string();
        info!("Loading news items from {}", path);

        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: path.clone(),
                source,
            })?;

        let items: Vec<RawItem> =
            serde_json::from_str(&content).map_err(|source| SourceError::Json {
                path: path.clone(),
                source,
            })?;

        let total = items.len();
        let mut kept: Vec<RawItem> = items
            .into_iter()
            .filter(|item| !item.title.trim().is_empty())
            .collect();
        if kept.len() < total {
            warn!("Dropped {} items without a title from {}", total - kept.len(), path);
        }

        kept.truncate(self.max_items);
        Ok(kept)
    }

    fn name(&self) -> &str {
        "file"
    }
}
