use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::job::ResultRecord;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache entry {path} is not valid json: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("cache encode failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Date-keyed result cache: one `cache_YYYY-MM-DD.json` file per day.
///
/// Files are written to a temporary sibling first and renamed into place,
/// so a concurrent reader sees either the old entry or the new one.
#[derive(Debug, Clone)]
pub struct ResultCache {
    dir: PathBuf,
}

impl ResultCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        self.dir.join(format!("cache_{}.json", date.format("%Y-%m-%d")))
    }

    /// `Ok(None)` when no entry exists for `date`.
    #[instrument(skip(self), target = "cache", level = "debug")]
    pub async fn load(&self, date: NaiveDate) -> Result<Option<Vec<ResultRecord>>, CacheError> {
        let path = self.path_for(date);

        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cache entry");
                return Ok(None);
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        let records: Vec<ResultRecord> = serde_json::from_slice(&bytes)
            .map_err(|source| CacheError::Parse { path: path.clone(), source })?;

        debug!(path = %path.display(), count = records.len(), "cache hit");

        Ok(Some(records))
    }

    /// Replaces the entry for `date`.
    #[instrument(skip(self, records), fields(count = records.len()), target = "cache")]
    pub async fn store(&self, date: NaiveDate, records: &[ResultRecord]) -> Result<(), CacheError> {
        let path = self.path_for(date);
        let body = serde_json::to_vec_pretty(records)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|source| CacheError::Io { path: self.dir.clone(), source })?;

        let tmp = self
            .dir
            .join(format!(".cache_{}.{}.tmp", date.format("%Y-%m-%d"), Uuid::new_v4().simple()));

        if let Err(source) = tokio::fs::write(&tmp, &body).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Io { path: tmp, source });
        }

        if let Err(source) = tokio::fs::rename(&tmp, &path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(CacheError::Io { path, source });
        }

        info!(path = %path.display(), "cache entry written");

        Ok(())
    }
}
