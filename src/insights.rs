use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timing, repository and inputs of one checkout step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutMetric {
    pub step_id: String,
    pub start_time: String,
    pub finish_time: String,
    pub duration: f64,
    pub repository: String,
    pub parameters: Vec<(String, String)>,
}

impl CheckoutMetric {
    /// Encodes `parameters` as a JSON list of `[key, value]` pairs.
    pub fn parameters_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.parameters)
    }
}

/// Everything extracted from one worker log.
#[derive(Debug, Serialize, Deserialize)]
pub struct CheckoutInsights {
    pub log_file: PathBuf,
    pub collected_at: DateTime<Utc>,
    pub run_id: String,
    pub main_repository: String,
    pub total_fragments: usize,
    pub checkouts: Vec<CheckoutMetric>,
    pub failed_checkouts: usize,
    pub failed_reports: usize,
}
