use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::path::{Path, PathBuf};

use crate::config::{Config, OutputFormat};
use crate::extract::CaptureMode;
use crate::insights::CheckoutInsights;
use crate::log_source::find_latest_worker_log;
use crate::output::{export_insights, print_summary};
use crate::pipeline::process_worker_log;
use crate::telemetry::{AppInsightsClient, DryRunReporter, TelemetryReporter};

#[derive(Parser)]
#[command(name = "checkout-insights")]
#[command(author, version, about = "Checkout step telemetry from runner worker logs", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./checkout-insights.{toml,json,yaml,yml})
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Write the extracted checkouts to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    #[arg(short, long, global = true, value_enum)]
    format: Option<OutputFormat>,

    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// Discard a partially captured fragment when a job message interrupts it
    #[arg(long, global = true, default_value_t = false)]
    strict_job_message: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract checkouts from the newest worker log and send them as telemetry
    Report {
        #[arg(short, long, env = "RUNNER_WORKSPACE_DIAG")]
        diag_dir: Option<PathBuf>,

        /// Process this log instead of the newest one in the diagnostics directory
        #[arg(long)]
        file: Option<PathBuf>,

        #[arg(short, long, env = "TELEMETRY_KEY", hide_env_values = true)]
        telemetry_key: Option<String>,

        /// Log the events instead of sending them
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Extract checkouts from a worker log without sending anything
    Scan { file: PathBuf },
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let mut config = Config::load(self.config.as_deref())?;
        if self.strict_job_message {
            config.capture.strict_job_message = true;
        }
        if self.pretty {
            config.output.pretty = true;
        }
        if let Some(format) = self.format {
            config.output.format = format;
        }

        match &self.command {
            Commands::Report {
                diag_dir,
                file,
                telemetry_key,
                dry_run,
            } => {
                if let Some(dir) = diag_dir {
                    config.diagnostics.dir.clone_from(dir);
                }
                if let Some(key) = telemetry_key {
                    config.telemetry.key = Some(key.clone());
                }
                if *dry_run {
                    config.telemetry.enabled = false;
                }
                self.execute_report(&config, file.as_deref()).await
            }
            Commands::Scan { file } => self.execute_scan(&config, file).await,
        }
    }

    async fn execute_report(&self, config: &Config, file: Option<&Path>) -> Result<()> {
        let path = match file {
            Some(path) => path.to_path_buf(),
            None => {
                let dir = &config.diagnostics.dir;
                let Some(path) =
                    find_latest_worker_log(dir, &config.diagnostics.worker_log_prefix)
                else {
                    warn!(
                        "No log files found matching the pattern. Looking at directory {}",
                        dir.display()
                    );
                    return Ok(());
                };
                path
            }
        };

        info!("Processing file: {}", path.display());
        let mode = config.capture.mode();

        let insights = match (&config.telemetry.key, config.telemetry.enabled) {
            (Some(key), true) => {
                let mut client = AppInsightsClient::new(&config.telemetry.endpoint, key.clone())?;
                process(&path, &mut client, mode).await?
            }
            (None, true) => {
                warn!("No telemetry key configured, checkout events will only be logged");
                process_dry_run(&path, mode).await?
            }
            (_, false) => process_dry_run(&path, mode).await?,
        };

        self.write_insights(config, insights.as_ref())
    }

    async fn execute_scan(&self, config: &Config, file: &Path) -> Result<()> {
        info!("Scanning file: {}", file.display());
        let insights = process_dry_run(file, config.capture.mode()).await?;
        self.write_insights(config, insights.as_ref())
    }

    fn write_insights(&self, config: &Config, insights: Option<&CheckoutInsights>) -> Result<()> {
        let Some(insights) = insights else {
            info!("Nothing to report");
            return Ok(());
        };

        print_summary(insights);

        if let Some(output_path) = &self.output {
            let mut file = std::fs::File::create(output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            export_insights(
                insights,
                config.output.format,
                config.output.pretty,
                &mut file,
            )?;
            info!("Checkouts written to: {}", output_path.display());
        } else {
            export_insights(
                insights,
                config.output.format,
                config.output.pretty,
                &mut std::io::stdout().lock(),
            )?;
        }

        Ok(())
    }
}

async fn process_dry_run(path: &Path, mode: CaptureMode) -> Result<Option<CheckoutInsights>> {
    let mut reporter = DryRunReporter::new();
    let insights = process(path, &mut reporter, mode).await?;
    info!("Logged {} checkout events", reporter.delivered().len());
    Ok(insights)
}

async fn process<R: TelemetryReporter>(
    path: &Path,
    reporter: &mut R,
    mode: CaptureMode,
) -> Result<Option<CheckoutInsights>> {
    process_worker_log(path, reporter, mode)
        .await
        .with_context(|| format!("Failed to extract checkouts from {}", path.display()))
}
