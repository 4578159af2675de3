use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::styling::{bright, bright_green, bright_red, bright_yellow};

/// Progress tracking for the scan, correlate and report phases
pub struct PhaseProgress {
    pb: ProgressBar,
}

impl PhaseProgress {
    pub fn start_scanning() -> Self {
        eprintln!("{}  {}", bright("⚙️"), bright("Phases").underlined());
        let pb = create_spinner(bright_yellow("Phase 1/3: Scanning worker log").to_string());
        Self { pb }
    }

    pub fn finish_scanning_start_correlating(self) -> Self {
        self.pb
            .finish_with_message(bright_green("Phase 1/3: Scanned worker log ✓").to_string());
        let pb =
            create_spinner(bright_yellow("Phase 2/3: Correlating checkout steps").to_string());
        Self { pb }
    }

    pub fn finish_correlating_start_reporting(self) -> Self {
        self.pb.finish_with_message(
            bright_green("Phase 2/3: Correlated checkout steps ✓").to_string(),
        );
        let pb = create_spinner(bright_yellow("Phase 3/3: Reporting telemetry").to_string());
        Self { pb }
    }

    pub fn finish_reporting(self) {
        self.pb
            .finish_with_message(bright_green("Phase 3/3: Telemetry reported ✓").to_string());
        eprintln!();
    }

    /// Stops the current phase early with `reason`.
    pub fn abandon(self, reason: &str) {
        self.pb
            .abandon_with_message(bright_red(format!("{reason} ✗")).to_string());
        eprintln!();
    }
}

fn create_spinner(message: String) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_draw_target(ProgressDrawTarget::stderr());
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("  {msg} {spinner}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message);
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}
