mod exports;
mod progress;
mod styling;
mod summary;
mod tables;

pub use exports::export_insights;
pub use progress::PhaseProgress;
pub use styling::{dim, magenta_bold};
pub use summary::print_summary;

/// Prints the banner to stderr.
///
/// Displays the tool name, version, and description at the start of execution.
pub fn print_banner() {
    eprintln!(
        r"
{} {}
  {}
",
        magenta_bold("🔍 checkout-insights"),
        dim(env!("CARGO_PKG_VERSION")),
        dim("Checkout step telemetry from runner worker logs")
    );
}
