use std::{
    env,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, OnceLock},
};

use chrono::Local;

use crate::{DESKTOP_LOG_FILE, DESKTOP_LOG_MAX_BYTES, LOG_DIR_NAME};

#[derive(Debug)]
struct LogSink {
    path: PathBuf,
    mirror_to_stderr: bool,
    write_lock: Mutex<()>,
}

static LOG_SINK: OnceLock<LogSink> = OnceLock::new();

pub(crate) fn resolve_desktop_log_path(root_dir: Option<&Path>, file_name: &str) -> PathBuf {
    root_dir
        .map(|root| root.join(LOG_DIR_NAME).join(file_name))
        .unwrap_or_else(|| env::temp_dir().join(LOG_DIR_NAME).join(file_name))
}

/// Routes every `append_*_log` call to `<user_dir>/logs/desktop.log`.
pub(crate) fn init_desktop_logging(user_dir: Option<&Path>, verbose: bool) -> PathBuf {
    let path = resolve_desktop_log_path(user_dir, DESKTOP_LOG_FILE);
    let sink = LOG_SINK.get_or_init(|| LogSink {
        path: path.clone(),
        mirror_to_stderr: verbose,
        write_lock: Mutex::new(()),
    });
    sink.path.clone()
}

pub(crate) fn format_log_line(timestamp: &str, channel: &str, message: &str) -> String {
    format!("[{timestamp}] [{channel}] {message}\n")
}

pub(crate) fn rotate_log_if_needed(path: &Path, max_bytes: u64) -> Result<bool, String> {
    let size = match fs::metadata(path) {
        Ok(metadata) => metadata.len(),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(error) => {
            return Err(format!(
                "Failed to read log metadata {}: {}",
                path.display(),
                error
            ))
        }
    };
    if size <= max_bytes {
        return Ok(false);
    }

    let mut rotated = path.as_os_str().to_owned();
    rotated.push(".1");
    fs::rename(path, PathBuf::from(&rotated))
        .map_err(|error| format!("Failed to rotate log {}: {}", path.display(), error))?;
    Ok(true)
}

fn write_line(path: &Path, line: &str) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| {
            format!(
                "Failed to create log directory {}: {}",
                parent.display(),
                error
            )
        })?;
    }
    rotate_log_if_needed(path, DESKTOP_LOG_MAX_BYTES)?;

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|error| format!("Failed to open log {}: {}", path.display(), error))?;
    file.write_all(line.as_bytes())
        .map_err(|error| format!("Failed to write log {}: {}", path.display(), error))
}

fn append_log(channel: &str, message: &str) {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string();
    let line = format_log_line(&timestamp, channel, message);

    let Some(sink) = LOG_SINK.get() else {
        eprint!("{line}");
        return;
    };

    if sink.mirror_to_stderr {
        eprint!("{line}");
    }

    let _guard = sink.write_lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if let Err(error) = write_line(&sink.path, &line) {
        eprintln!("{error}");
        if !sink.mirror_to_stderr {
            eprint!("{line}");
        }
    }
}

pub(crate) fn append_desktop_log(message: &str) {
    append_log("desktop", message);
}

pub(crate) fn append_startup_log(message: &str) {
    append_log("startup", message);
}

pub(crate) fn append_lifecycle_log(message: &str) {
    append_log("lifecycle", message);
}

pub(crate) fn append_shutdown_log(message: &str) {
    append_log("shutdown", message);
}

pub(crate) fn append_backend_log(message: &str) {
    append_log("backend", message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_log_line_tags_channel_and_terminates_line() {
        assert_eq!(
            format_log_line("2026-01-01 00:00:00.000", "startup", "desktop process starting"),
            "[2026-01-01 00:00:00.000] [startup] desktop process starting\n"
        );
    }

    #[test]
    fn resolve_desktop_log_path_uses_logs_dir_under_root() {
        let root = Path::new("/home/user/.config/node-red-desktop");
        assert_eq!(
            resolve_desktop_log_path(Some(root), DESKTOP_LOG_FILE),
            root.join("logs").join("desktop.log")
        );
        assert!(resolve_desktop_log_path(None, DESKTOP_LOG_FILE).ends_with("logs/desktop.log"));
    }

    #[test]
    fn rotate_log_if_needed_moves_oversized_log_aside() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("desktop.log");
        fs::write(&path, "0123456789").expect("write log");

        assert!(!rotate_log_if_needed(&path, 64).expect("rotate small log"));
        assert!(path.exists());

        assert!(rotate_log_if_needed(&path, 4).expect("rotate large log"));
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(dir.path().join("desktop.log.1")).expect("read rotated"),
            "0123456789"
        );
    }

    #[test]
    fn rotate_log_if_needed_ignores_missing_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(!rotate_log_if_needed(&dir.path().join("missing.log"), 1).expect("rotate"));
    }

    #[test]
    fn write_line_creates_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs").join("desktop.log");
        write_line(&path, "first\n").expect("first write");
        write_line(&path, "second\n").expect("second write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "first\nsecond\n");
    }
}
