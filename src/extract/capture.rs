use std::sync::LazyLock;

use log::{debug, error, warn};
use regex::Regex;
use serde_json::Value;

use super::fragment::parse_fragment;

static JOB_MESSAGE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[.*? INFO Worker\] Job message:.*").unwrap());

static ACTION_MESSAGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[.*? INFO ExecutionContext\] Publish step telemetry for current step \{")
        .unwrap()
});

const ACCESS_TOKEN_MARKER: &str = "\"AccessToken\"";
const FRAGMENT_TERMINATOR: &str = "}.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    NotCapturing,
    Capturing,
}

/// How a job message arriving mid-capture is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptureMode {
    /// Keep the partial buffer and keep appending to it, as the worker log
    /// emitter's consumers have always done.
    #[default]
    Lenient,
    /// Log the orphaned capture and start over with an empty buffer.
    Strict,
}

/// Result of a line that closed a fragment.
#[derive(Debug)]
pub enum Emission {
    Fragment(Value),
    ParseFailure(serde_json::Error),
}

/// Line-driven state machine that reassembles JSON fragments embedded in a
/// worker log.
///
/// The rules are evaluated in a fixed priority order for every line and the
/// first one that applies wins:
///
/// 1. a job message line forces capturing on (the buffer is left as is),
/// 2. a step telemetry line starts a new `{` buffer when idle,
/// 3. a line ending in `}.` closes and parses the buffer,
/// 4. an `"AccessToken"` line is skipped entirely,
/// 5. a new `[` log entry closes and parses the buffer without a closing brace,
/// 6. any other line is trimmed and appended while capturing.
#[derive(Debug)]
pub struct FragmentCapture {
    state: CaptureState,
    buffer: String,
    mode: CaptureMode,
}

impl Default for FragmentCapture {
    fn default() -> Self {
        Self::new(CaptureMode::default())
    }
}

impl FragmentCapture {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            state: CaptureState::NotCapturing,
            buffer: String::new(),
            mode,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    fn is_capturing(&self) -> bool {
        self.state == CaptureState::Capturing
    }

    /// Feeds one log line. Returns `Some` only when the line closed a fragment.
    pub fn feed(&mut self, line: &str) -> Option<Emission> {
        let trimmed = line.trim();

        if JOB_MESSAGE_PATTERN.is_match(line) {
            debug!("Recognized job message, starting capture");
            if self.is_capturing() && self.mode == CaptureMode::Strict {
                error!(
                    "Job message arrived while capturing, discarding {} buffered bytes",
                    self.buffer.len()
                );
                self.buffer.clear();
            }
            self.state = CaptureState::Capturing;
            None
        } else if !self.is_capturing() && ACTION_MESSAGE_PATTERN.is_match(line) {
            debug!("Recognized step telemetry message, starting capture");
            self.buffer = String::from("{");
            self.state = CaptureState::Capturing;
            None
        } else if self.is_capturing() && trimmed.ends_with(FRAGMENT_TERMINATOR) {
            debug!("Recognized end of fragment");
            self.buffer.push('}');
            Some(self.emit())
        } else if trimmed.starts_with(ACCESS_TOKEN_MARKER) {
            debug!("Skipping access token line");
            None
        } else if self.is_capturing() && line.starts_with('[') {
            debug!("New log entry while capturing, closing fragment");
            Some(self.emit())
        } else {
            if self.is_capturing() {
                self.buffer.push_str(trimmed);
            }
            None
        }
    }

    fn emit(&mut self) -> Emission {
        let raw = std::mem::take(&mut self.buffer);
        self.state = CaptureState::NotCapturing;

        match parse_fragment(&raw) {
            Ok(value) => Emission::Fragment(value),
            Err(e) => Emission::ParseFailure(e),
        }
    }
}

/// Runs a fresh capture over `lines` and returns the parsed fragments in order.
///
/// Parse failures are logged and skipped. `null` and empty-object fragments
/// carry no record and are dropped as well.
pub fn scan_lines<I, S>(lines: I, mode: CaptureMode) -> Vec<Value>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut capture = FragmentCapture::new(mode);
    let mut fragments = Vec::new();

    for (index, line) in lines.into_iter().enumerate() {
        match capture.feed(line.as_ref()) {
            Some(Emission::Fragment(value)) if is_empty_fragment(&value) => {
                debug!("Dropping empty fragment closed at line {}", index + 1);
            }
            Some(Emission::Fragment(value)) => fragments.push(value),
            Some(Emission::ParseFailure(e)) => {
                warn!("Failed to parse fragment closed at line {}: {e}", index + 1);
            }
            None => {}
        }
    }

    if capture.state() == CaptureState::Capturing {
        warn!(
            "Log ended mid-fragment, dropping {} buffered bytes",
            capture.buffer().len()
        );
    }

    fragments
}

fn is_empty_fragment(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const JOB_LINE: &str = "[2024-01-01 00:00:00Z INFO Worker] Job message:";
    const ACTION_LINE: &str =
        "[2024-01-01 00:00:05Z INFO ExecutionContext] Publish step telemetry for current step {";

    fn feed_all(capture: &mut FragmentCapture, lines: &[&str]) -> Vec<Emission> {
        lines.iter().filter_map(|line| capture.feed(line)).collect()
    }

    fn fragment(emission: &Emission) -> &Value {
        match emission {
            Emission::Fragment(value) => value,
            Emission::ParseFailure(e) => panic!("unexpected parse failure: {e}"),
        }
    }

    #[test]
    fn test_unrelated_lines_leave_state_untouched() {
        let mut capture = FragmentCapture::default();
        for line in [
            "[2024-01-01 00:00:00Z INFO HostContext] Well known directory 'Bin'",
            "plain text",
            "  \"a\": 1,",
            "",
        ] {
            assert!(capture.feed(line).is_none());
            assert_eq!(capture.state(), CaptureState::NotCapturing);
            assert_eq!(capture.buffer(), "");
        }
    }

    #[test]
    fn test_action_fragment_closed_by_terminator() {
        let mut capture = FragmentCapture::default();
        let emissions = feed_all(
            &mut capture,
            &[ACTION_LINE, "  \"a\": 1,", "  \"b\": 2", "}."],
        );

        assert_eq!(emissions.len(), 1);
        assert_eq!(fragment(&emissions[0]), &json!({"a": 1, "b": 2}));
        assert_eq!(capture.state(), CaptureState::NotCapturing);
        assert_eq!(capture.buffer(), "");
    }

    #[test]
    fn test_terminator_ignores_trailing_whitespace() {
        let mut capture = FragmentCapture::default();
        let emissions = feed_all(&mut capture, &[ACTION_LINE, "\"a\": 1", "}.  \r\n"]);

        assert_eq!(emissions.len(), 1);
        assert_eq!(fragment(&emissions[0]), &json!({"a": 1}));
    }

    #[test]
    fn test_job_message_fragment_closed_by_next_log_entry() {
        let mut capture = FragmentCapture::default();
        let emissions = feed_all(
            &mut capture,
            &[
                JOB_LINE,
                "{",
                "  \"run_id\": \"42\"",
                "}",
                "[2024-01-01 00:00:01Z INFO JobRunner] Job started",
            ],
        );

        assert_eq!(emissions.len(), 1);
        assert_eq!(fragment(&emissions[0]), &json!({"run_id": "42"}));
        assert_eq!(capture.state(), CaptureState::NotCapturing);
    }

    #[test]
    fn test_action_marker_does_not_restart_job_capture() {
        let mut capture = FragmentCapture::default();
        let emissions = feed_all(
            &mut capture,
            &[JOB_LINE, ACTION_LINE, "  \"a\": 1", "}."],
        );

        // The marker starts with '[' so it closes the (empty) job buffer.
        assert_eq!(emissions.len(), 1);
        assert!(matches!(emissions[0], Emission::ParseFailure(_)));
        assert_eq!(capture.state(), CaptureState::NotCapturing);
    }

    #[test]
    fn test_access_token_line_is_excluded() {
        let mut capture = FragmentCapture::default();
        let emissions = feed_all(
            &mut capture,
            &[
                ACTION_LINE,
                "  \"a\": 1,",
                "  \"AccessToken\": \"ghs_secret\",",
                "  \"b\": 2",
                "}.",
            ],
        );

        assert_eq!(emissions.len(), 1);
        let value = fragment(&emissions[0]);
        assert_eq!(value, &json!({"a": 1, "b": 2}));
        assert!(!value.to_string().contains("ghs_secret"));
    }

    #[test]
    fn test_access_token_line_outside_capture_is_noop() {
        let mut capture = FragmentCapture::default();
        assert!(capture.feed("\"AccessToken\": \"x\"").is_none());
        assert_eq!(capture.state(), CaptureState::NotCapturing);
        assert_eq!(capture.buffer(), "");
    }

    #[test]
    fn test_malformed_fragment_recovers_for_next_capture() {
        let mut capture = FragmentCapture::default();
        let emissions = feed_all(
            &mut capture,
            &[
                ACTION_LINE,
                "  \"a\": ",
                "}.",
                ACTION_LINE,
                "  \"b\": 2",
                "}.",
            ],
        );

        assert_eq!(emissions.len(), 2);
        assert!(matches!(emissions[0], Emission::ParseFailure(_)));
        assert_eq!(fragment(&emissions[1]), &json!({"b": 2}));
    }

    #[test]
    fn test_lenient_job_message_keeps_stale_buffer() {
        let mut capture = FragmentCapture::new(CaptureMode::Lenient);
        feed_all(&mut capture, &[ACTION_LINE, "\"a\": 1,"]);
        capture.feed(JOB_LINE);

        assert_eq!(capture.state(), CaptureState::Capturing);
        assert_eq!(capture.buffer(), "{\"a\": 1,");
    }

    #[test]
    fn test_strict_job_message_discards_orphaned_buffer() {
        let mut capture = FragmentCapture::new(CaptureMode::Strict);
        feed_all(&mut capture, &[ACTION_LINE, "\"a\": 1,"]);
        capture.feed(JOB_LINE);

        assert_eq!(capture.state(), CaptureState::Capturing);
        assert_eq!(capture.buffer(), "");
    }

    #[test]
    fn test_scan_lines_skips_failures_and_empty_fragments() {
        let lines = [
            JOB_LINE,
            "{}",
            "[2024-01-01 00:00:01Z INFO JobRunner] Job started",
            ACTION_LINE,
            "\"a\": ",
            "}.",
            ACTION_LINE,
            "\"action\": \"actions/checkout\"",
            "}.",
        ];

        let fragments = scan_lines(lines, CaptureMode::Lenient);
        assert_eq!(fragments, vec![json!({"action": "actions/checkout"})]);
    }
}
