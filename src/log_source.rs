use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use log::{debug, error, warn};

/// Reads a log file into lines.
///
/// A missing or unreadable file is logged and yields no lines, so the caller
/// treats it as "nothing to do".
pub fn read_lines(path: &Path) -> Vec<String> {
    match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            error!("File not found: {}", path.display());
            Vec::new()
        }
        Err(e) => {
            error!("IO error occurred while reading {}: {e}", path.display());
            Vec::new()
        }
    }
}

/// Picks the most recently modified file in `dir` whose name starts with `prefix`.
///
/// Returns `None` when the directory cannot be read or holds no matching file.
pub fn find_latest_worker_log(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Unable to read diagnostics directory {}: {e}", dir.display());
            return None;
        }
    };

    let latest = entries
        .filter_map(std::result::Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .filter_map(|entry| {
            let metadata = entry.metadata().ok()?;
            if !metadata.is_file() {
                return None;
            }
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path);

    match &latest {
        Some(path) => debug!("Most recent worker log: {}", path.display()),
        None => warn!(
            "No log files starting with '{prefix}' found in {}",
            dir.display()
        ),
    }

    latest
}
