use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::extract::CaptureMode;
use crate::telemetry::app_insights_default_endpoint;

/// Configuration file structure for checkout-insights.
///
/// Every value can also be given on the command line or through the
/// environment; those take precedence over the file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    #[serde(default)]
    pub telemetry: TelemetryConfig,

    #[serde(default)]
    pub capture: CaptureConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DiagnosticsConfig {
    /// Directory holding the runner's `_diag` logs
    #[serde(default = "default_diagnostics_dir")]
    pub dir: PathBuf,

    /// File name prefix of worker logs
    #[serde(default = "default_worker_log_prefix")]
    pub worker_log_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TelemetryConfig {
    /// Application Insights instrumentation key
    pub key: Option<String>,

    /// Ingestion endpoint base URL
    #[serde(default = "app_insights_default_endpoint")]
    pub endpoint: String,

    /// Send events; when false metrics are only logged
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CaptureConfig {
    /// Discard a partially captured fragment when a job message interrupts it
    #[serde(default)]
    pub strict_job_message: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Format of the exported checkouts
    #[serde(default)]
    pub format: OutputFormat,

    /// Pretty-print JSON output
    #[serde(default)]
    pub pretty: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            dir: default_diagnostics_dir(),
            worker_log_prefix: default_worker_log_prefix(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            key: None,
            endpoint: app_insights_default_endpoint(),
            enabled: true,
        }
    }
}

impl CaptureConfig {
    pub fn mode(&self) -> CaptureMode {
        if self.strict_job_message {
            CaptureMode::Strict
        } else {
            CaptureMode::Lenient
        }
    }
}

fn default_diagnostics_dir() -> PathBuf {
    PathBuf::from("/home/runner/_diag")
}

fn default_worker_log_prefix() -> String {
    "Worker_".to_string()
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path
    /// 2. ./checkout-insights.toml
    /// 3. ./checkout-insights.json
    /// 4. ./checkout-insights.yaml
    /// 5. ./checkout-insights.yml
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }

        let candidates = [
            "checkout-insights.toml",
            "checkout-insights.json",
            "checkout-insights.yaml",
            "checkout-insights.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.diagnostics.dir, PathBuf::from("/home/runner/_diag"));
        assert_eq!(config.diagnostics.worker_log_prefix, "Worker_");
        assert_eq!(config.telemetry.key, None);
        assert!(config.telemetry.enabled);
        assert_eq!(config.capture.mode(), CaptureMode::Lenient);
        assert!(!config.output.pretty);
    }

    #[test]
    fn test_load_toml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        let toml_content = r#"
[diagnostics]
dir = "/opt/runner/_diag"

[telemetry]
key = "00000000-0000-0000-0000-000000000000"
enabled = false

[capture]
strict-job-message = true
"#;
        write!(temp_file, "{}", toml_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.diagnostics.dir, PathBuf::from("/opt/runner/_diag"));
        assert_eq!(config.diagnostics.worker_log_prefix, "Worker_");
        assert_eq!(
            config.telemetry.key.as_deref(),
            Some("00000000-0000-0000-0000-000000000000")
        );
        assert!(!config.telemetry.enabled);
        assert_eq!(config.capture.mode(), CaptureMode::Strict);
    }

    #[test]
    fn test_load_json_config() {
        let mut temp_file = NamedTempFile::with_suffix(".json").unwrap();
        let json_content = r#"{
  "diagnostics": { "worker-log-prefix": "Worker-" },
  "output": { "pretty": true, "format": "csv" }
}"#;
        write!(temp_file, "{}", json_content).unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.diagnostics.worker_log_prefix, "Worker-");
        assert!(config.output.pretty);
        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.telemetry.endpoint, app_insights_default_endpoint());
    }

    #[test]
    fn test_load_yaml_config() {
        let mut temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        write!(temp_file, "telemetry:\n  endpoint: https://example.test/\n").unwrap();

        let config = Config::load(Some(temp_file.path())).unwrap();
        assert_eq!(config.telemetry.endpoint, "https://example.test/");
        assert!(config.telemetry.enabled);
    }

    #[test]
    fn test_load_missing_explicit_path_fails() {
        assert!(Config::load(Some(Path::new("does-not-exist.toml"))).is_err());
    }
}
