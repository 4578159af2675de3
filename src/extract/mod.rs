mod capture;
mod correlator;
mod fragment;
pub mod job_context;
mod timestamp;

pub use capture::{scan_lines, CaptureMode};
pub use correlator::Correlator;
pub use job_context::JobContext;
