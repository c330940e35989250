use chrono::{DateTime, Utc};
use market::StructurePoints;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::advisory::Rating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Idle,
    Running,
    Completed,
    Error,
}

/// One screened candidate as shown to pollers and stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub symbol: String,
    /// Signed percent string, e.g. `+0.4%`.
    pub dist: String,
    pub distance: f64,
    pub advice: String,
    /// Base64 SVG chart; absent when rendering had nothing to draw.
    pub chart: Option<String>,
    pub status: Rating,
    pub points: Option<StructurePoints>,
}

/// Progress and results of the current (or last) batch job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    pub progress: String,
    pub results: Vec<ResultRecord>,
    pub error: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub job_id: Option<Uuid>,
}

impl JobStatus {
    pub fn idle(now: DateTime<Utc>) -> Self {
        Self {
            status: JobState::Idle,
            progress: String::new(),
            results: Vec::new(),
            error: None,
            last_updated: now,
            job_id: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.status == JobState::Running
    }
}

pub fn format_distance(distance: f64) -> String {
    if distance.is_finite() {
        format!("{:+.1}%", distance * 100.0)
    } else {
        "N/A".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_is_signed_with_one_decimal() {
        assert_eq!(format_distance(0.004), "+0.4%");
        assert_eq!(format_distance(-0.0123), "-1.2%");
        assert_eq!(format_distance(0.0), "+0.0%");
        assert_eq!(format_distance(f64::NAN), "N/A");
    }

    #[test]
    fn status_serializes_with_lowercase_state() {
        let now = Utc::now();
        let json = serde_json::to_value(JobStatus::idle(now)).unwrap();

        assert_eq!(json["status"], "idle");
        assert_eq!(json["results"], serde_json::json!([]));
        assert!(json["job_id"].is_null());
    }
}
