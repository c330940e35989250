//! Batch analysis job.
//!
//! One job at a time screens the whole instrument universe:
//! cache check, universe load, chunked download, detection, ranking,
//! advisory + chart per pick, cache write. Progress and results are
//! published through `JobManager::snapshot`.

pub mod manager;
pub mod pipeline;
pub mod status;

pub use manager::{JobManager, StartOutcome};
pub use status::{JobState, JobStatus, ResultRecord, format_distance};

use std::path::{Path, PathBuf};

use market::universe::Universe;
use thiserror::Error;
use tracing::{info, warn};

/// Tuning of the batch job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobConfig {
    /// Symbols per download request.
    pub chunk_size: usize,
    /// Candidates sent to the advisory model, closest to support first.
    pub top_n: usize,
    /// Detector window in bars.
    pub lookback: usize,
    /// Codes screened even when missing from the universe file.
    pub mandatory: Vec<String>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            chunk_size: 50,
            top_n: 20,
            lookback: 120,
            mandatory: vec!["1513".to_string(), "6117".to_string()],
        }
    }
}

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to read universe file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the universe file. A missing file yields the mandatory codes only.
pub async fn load_universe(path: &Path, mandatory: &[String]) -> Result<Universe, UniverseError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => {
            let universe = Universe::parse(&text, mandatory);
            info!(path = %path.display(), codes = universe.len(), "universe loaded");
            Ok(universe)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "universe file missing; mandatory codes only");
            Ok(Universe::mandatory_only(mandatory))
        }
        Err(source) => Err(UniverseError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_universe_file_falls_back_to_mandatory() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = JobConfig::default();

        let u = load_universe(&dir.path().join("tickers.txt"), &cfg.mandatory)
            .await
            .unwrap();

        assert_eq!(u.symbols(), vec!["1513.TW".to_string(), "6117.TW".into()]);
    }

    #[tokio::test]
    async fn universe_file_is_merged_with_mandatory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tickers.txt");
        std::fs::write(&path, "2330 TSMC\n2330\nETF0050\n").unwrap();

        let u = load_universe(&path, &JobConfig::default().mandatory)
            .await
            .unwrap();

        assert_eq!(u.len(), 3);
    }

    #[tokio::test]
    async fn unreadable_universe_is_an_error() {
        let dir = tempfile::tempdir().unwrap();

        // a directory cannot be read as text
        let err = load_universe(dir.path(), &[]).await.unwrap_err();
        assert!(matches!(err, UniverseError::Read { .. }));
    }
}
