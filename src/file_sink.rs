//! Size-bounded rotating file sink
//!
//! Records are appended to a single active file. When a write would push the
//! active file past `max_size`, the file is first renamed aside to
//! `<stem>-<timestamp><.ext>` and a fresh file is opened at the original path.
//! Timestamps in backup names are always UTC so that names sort the same way
//! on every host.
//!
//! Old backups are pruned after each rotation by count and by age. Pruning is
//! best effort: failures are reported through `tracing` once the sink lock has
//! been released and are never returned to the writer.

use crate::errors::{LogError, LogResult, SafeLock};
use crate::sink::LogSink;
use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

const BACKUP_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.3f";

/// Construction parameters for [`RotatingFileSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSinkOptions {
    pub path: PathBuf,
    /// Permission bits for a missing parent directory (unix only).
    pub dir_mode: u32,
    /// Permission bits re-applied to the log file.
    pub file_mode: u32,
    /// Backups older than this are removed. Zero keeps them regardless of age.
    pub max_age: Duration,
    /// Number of backups to retain. Zero keeps all of them.
    pub max_backups: usize,
    /// Maximum size of the active file in bytes.
    pub max_size: u64,
}

impl FileSinkOptions {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            dir_mode: 0o755,
            file_mode: 0o644,
            max_age: Duration::ZERO,
            max_backups: 0,
            max_size: 100 * 1024 * 1024,
        }
    }

    pub fn dir_mode(mut self, mode: u32) -> Self {
        self.dir_mode = mode;
        self
    }

    pub fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    pub fn max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    pub fn max_size(mut self, bytes: u64) -> Self {
        self.max_size = bytes;
        self
    }
}

#[derive(Debug, Default)]
struct FileState {
    file: Option<File>,
    size: u64,
    closed: bool,
}

/// File sink that rotates by size and prunes by count and age.
#[derive(Debug)]
pub struct RotatingFileSink {
    options: FileSinkOptions,
    state: Mutex<FileState>,
}

impl RotatingFileSink {
    /// Validates the target and prepares the file.
    ///
    /// The parent directory is created with `dir_mode` when missing, the file
    /// is created if needed and `file_mode` is re-applied to it. Any failure
    /// is returned here rather than on the first write.
    pub fn new(options: FileSinkOptions) -> LogResult<Self> {
        if options.max_size == 0 {
            return Err(LogError::config("max_size must be greater than zero"));
        }

        let path = options.path.as_path();
        let dir = log_dir(path);
        match fs::metadata(dir) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                create_dir(dir, options.dir_mode).map_err(|e| {
                    LogError::path(
                        dir.display().to_string(),
                        "failed to create log folder",
                        Some(e),
                    )
                })?;
            }
            Err(e) => {
                return Err(LogError::path(
                    dir.display().to_string(),
                    "unable to stat log folder",
                    Some(e),
                ));
            }
        }

        // create the file if it doesn't exist, otherwise make sure we can write to it
        let existing = open_append(path, options.file_mode)
            .and_then(|file| file.metadata())
            .map_err(|e| {
                LogError::path(
                    path.display().to_string(),
                    "failed to open log file for writing",
                    Some(e),
                )
            })?
            .len();

        enforce_mode(path, options.file_mode)?;

        Ok(Self {
            options,
            state: Mutex::new(FileState {
                size: existing,
                ..FileState::default()
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.options.path
    }

    /// Size of the active file in bytes, including what was on disk before the
    /// sink was constructed.
    pub fn size(&self) -> LogResult<u64> {
        Ok(self.state.safe_lock()?.size)
    }

    /// Forces a rotation regardless of the active file's size.
    pub fn rotate(&self) -> LogResult<()> {
        let failures = {
            let mut state = self.state.safe_lock()?;
            if state.closed {
                return Err(LogError::closed(self.name()));
            }
            self.rotate_locked(&mut state)?
        };
        report_prune_failures(failures);
        Ok(())
    }

    /// Rotated files that belong to this sink, newest first.
    pub fn backups(&self) -> LogResult<Vec<PathBuf>> {
        Ok(self
            .scan_backups()?
            .into_iter()
            .map(|(_, path)| path)
            .collect())
    }

    fn name(&self) -> String {
        format!("file:{}", self.options.path.display())
    }

    fn ensure_open(&self, state: &mut FileState) -> LogResult<()> {
        if state.file.is_none() {
            let file = open_append(&self.options.path, self.options.file_mode)
                .map_err(|e| LogError::io("opening log file", e))?;
            state.size = file
                .metadata()
                .map_err(|e| LogError::io("reading log file size", e))?
                .len();
            state.file = Some(file);
        }
        Ok(())
    }

    fn rotate_locked(&self, state: &mut FileState) -> LogResult<Vec<LogError>> {
        if let Some(mut file) = state.file.take() {
            file.flush()
                .map_err(|e| LogError::io("flushing log file", e))?;
        }

        let path = self.options.path.as_path();
        match fs::metadata(path) {
            Ok(_) => {
                let backup = self.next_backup_path(Utc::now());
                fs::rename(path, &backup).map_err(|e| LogError::io("rotating log file", e))?;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(LogError::io("inspecting log file", e)),
        }

        let file = open_append(path, self.options.file_mode)
            .map_err(|e| LogError::io("opening new log file", e))?;
        enforce_mode(path, self.options.file_mode)?;
        state.file = Some(file);
        state.size = 0;

        Ok(self.prune())
    }

    fn backup_name_parts(&self) -> (String, String) {
        let path = self.options.path.as_path();
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();
        (format!("{stem}-"), ext)
    }

    fn backup_path_at(&self, at: DateTime<Utc>) -> PathBuf {
        let (prefix, ext) = self.backup_name_parts();
        let name = format!("{prefix}{}{ext}", at.format(BACKUP_TIME_FORMAT));
        log_dir(&self.options.path).join(name)
    }

    // Backup timestamps must increase monotonically, otherwise a fresh backup
    // could sort behind older ones and be pruned first.
    fn next_backup_path(&self, now: DateTime<Utc>) -> PathBuf {
        let newest = self
            .scan_backups()
            .ok()
            .and_then(|backups| backups.first().map(|(stamp, _)| *stamp));
        let mut at = match newest {
            Some(newest) if newest >= now => newest + TimeDelta::milliseconds(1),
            _ => now,
        };
        let mut candidate = self.backup_path_at(at);
        while candidate.exists() {
            at += TimeDelta::milliseconds(1);
            candidate = self.backup_path_at(at);
        }
        candidate
    }

    fn scan_backups(&self) -> LogResult<Vec<(DateTime<Utc>, PathBuf)>> {
        let (prefix, ext) = self.backup_name_parts();
        let dir = log_dir(&self.options.path);
        let entries = fs::read_dir(dir).map_err(|e| LogError::io("reading log folder", e))?;

        let mut backups = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| LogError::io("reading log folder entry", e))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(stamp) = name
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_suffix(ext.as_str()))
            else {
                continue;
            };
            if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, BACKUP_TIME_FORMAT) {
                backups.push((naive.and_utc(), entry.path()));
            }
        }

        backups.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(backups)
    }

    fn prune(&self) -> Vec<LogError> {
        let FileSinkOptions {
            max_age,
            max_backups,
            ..
        } = self.options;
        if max_backups == 0 && max_age.is_zero() {
            return Vec::new();
        }

        let backups = match self.scan_backups() {
            Ok(backups) => backups,
            Err(e) => return vec![e],
        };

        let cutoff = if max_age.is_zero() {
            None
        } else {
            TimeDelta::from_std(max_age)
                .ok()
                .and_then(|age| Utc::now().checked_sub_signed(age))
        };

        let mut failures = Vec::new();
        for (idx, (stamp, path)) in backups.iter().enumerate() {
            let over_count = max_backups > 0 && idx >= max_backups;
            let too_old = cutoff.is_some_and(|cutoff| *stamp < cutoff);
            if over_count || too_old {
                if let Err(e) = fs::remove_file(path) {
                    failures.push(LogError::io(
                        format!("removing old log file {}", path.display()),
                        e,
                    ));
                }
            }
        }
        failures
    }
}

impl LogSink for RotatingFileSink {
    fn write(&self, buf: &[u8]) -> LogResult<usize> {
        let len = buf.len() as u64;
        let failures = {
            let mut state = self.state.safe_lock()?;
            if state.closed {
                return Err(LogError::closed(self.name()));
            }
            if len > self.options.max_size {
                return Err(LogError::WriteTooLarge {
                    len: buf.len(),
                    max: self.options.max_size,
                });
            }

            self.ensure_open(&mut state)?;
            let failures = if state.size + len > self.options.max_size {
                self.rotate_locked(&mut state)?
            } else {
                Vec::new()
            };

            let Some(file) = state.file.as_mut() else {
                return Err(LogError::closed(self.name()));
            };
            file.write_all(buf)
                .map_err(|e| LogError::io("writing log file", e))?;
            state.size += len;
            failures
        };

        report_prune_failures(failures);
        Ok(buf.len())
    }

    fn close(&self) -> LogResult<()> {
        let mut state = self.state.safe_lock()?;
        state.closed = true;
        if let Some(mut file) = state.file.take() {
            file.flush()
                .map_err(|e| LogError::io("flushing log file", e))?;
        }
        Ok(())
    }
}

fn report_prune_failures(failures: Vec<LogError>) {
    for failure in failures {
        tracing::warn!(error = %failure, "failed to prune rotated log file");
    }
}

fn log_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

#[cfg(unix)]
fn create_dir(dir: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(mode).create(dir)
}

#[cfg(not(unix))]
fn create_dir(dir: &Path, _mode: u32) -> io::Result<()> {
    fs::DirBuilder::new().recursive(true).create(dir)
}

#[cfg(unix)]
fn open_append(path: &Path, mode: u32) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(mode)
        .open(path)
}

#[cfg(not(unix))]
fn open_append(path: &Path, _mode: u32) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn enforce_mode(path: &Path, mode: u32) -> LogResult<()> {
    apply_mode(path, mode).map_err(|e| LogError::permissions(path.display().to_string(), e))
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(path: &Path, mode: u32) -> io::Result<()> {
    let mut perms = fs::metadata(path)?.permissions();
    perms.set_readonly(mode & 0o200 == 0);
    fs::set_permissions(path, perms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sink_in(dir: &TempDir, max_size: u64) -> RotatingFileSink {
        let options = FileSinkOptions::new(dir.path().join("app.log")).max_size(max_size);
        RotatingFileSink::new(options).unwrap()
    }

    #[test]
    fn construction_creates_missing_parent_and_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/logs/app.log");
        let sink = RotatingFileSink::new(FileSinkOptions::new(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(sink.path(), path.as_path());
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn construction_applies_modes() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/app.log");
        let options = FileSinkOptions::new(&path).dir_mode(0o750).file_mode(0o600);
        RotatingFileSink::new(options).unwrap();

        let file_mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600);
        let dir_mode = fs::metadata(path.parent().unwrap()).unwrap().permissions().mode() & 0o777;
        assert_eq!(dir_mode & !0o750, 0);
    }

    #[cfg(unix)]
    #[test]
    fn existing_file_gets_mode_reapplied() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, b"old").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o666)).unwrap();

        RotatingFileSink::new(FileSinkOptions::new(&path).file_mode(0o640)).unwrap();
        assert_eq!(fs::metadata(&path).unwrap().permissions().mode() & 0o777, 0o640);
    }

    #[test]
    fn stat_failure_other_than_missing_is_a_path_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, b"").unwrap();

        let err = RotatingFileSink::new(FileSinkOptions::new(blocker.join("sub/app.log")))
            .unwrap_err();
        assert!(matches!(err, LogError::Path { .. }), "got {err:?}");
    }

    #[test]
    fn mode_failure_is_a_permissions_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone.log");

        let err = enforce_mode(&missing, 0o644).unwrap_err();
        match err {
            LogError::Permissions { path, source } => {
                assert_eq!(path, missing.display().to_string());
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("expected permissions error, got {other:?}"),
        }
    }

    #[test]
    fn zero_max_size_is_rejected() {
        let dir = TempDir::new().unwrap();
        let err = RotatingFileSink::new(FileSinkOptions::new(dir.path().join("a.log")).max_size(0))
            .unwrap_err();
        assert!(matches!(err, LogError::Config { .. }));
    }

    #[test]
    fn crossing_write_rotates_once() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir, 100);
        let first = vec![b'a'; 60];
        let second = vec![b'b'; 60];

        sink.write(&first).unwrap();
        assert!(sink.backups().unwrap().is_empty());
        sink.write(&second).unwrap();

        let backups = sink.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read(&backups[0]).unwrap(), first);
        assert_eq!(fs::read(sink.path()).unwrap(), second);
        assert_eq!(sink.size().unwrap(), 60);
    }

    #[test]
    fn write_filling_exactly_to_max_does_not_rotate() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir, 100);
        sink.write(&[b'x'; 40]).unwrap();
        sink.write(&[b'y'; 60]).unwrap();
        assert!(sink.backups().unwrap().is_empty());
        assert_eq!(fs::metadata(sink.path()).unwrap().len(), 100);
    }

    #[test]
    fn oversized_write_is_rejected() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir, 10);
        let err = sink.write(&[b'z'; 11]).unwrap_err();
        assert!(matches!(err, LogError::WriteTooLarge { len: 11, max: 10 }));
        assert_eq!(fs::metadata(sink.path()).unwrap().len(), 0);
    }

    #[test]
    fn existing_content_counts_toward_size() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, [b'o'; 90]).unwrap();

        let sink = sink_in(&dir, 100);
        assert_eq!(sink.size().unwrap(), 90);
        sink.write(&[b'n'; 20]).unwrap();
        assert_eq!(sink.size().unwrap(), 20);

        let backups = sink.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read(&backups[0]).unwrap(), vec![b'o'; 90]);
        assert_eq!(fs::read(&path).unwrap(), vec![b'n'; 20]);
    }

    #[test]
    fn explicit_rotate_moves_current_file_aside() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir, 1000);
        sink.write(b"before\n").unwrap();
        sink.rotate().unwrap();
        sink.write(b"after\n").unwrap();

        let backups = sink.backups().unwrap();
        assert_eq!(backups.len(), 1);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "before\n");
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "after\n");
    }

    #[test]
    fn backups_are_pruned_by_count() {
        let dir = TempDir::new().unwrap();
        let options = FileSinkOptions::new(dir.path().join("app.log"))
            .max_size(1000)
            .max_backups(2);
        let sink = RotatingFileSink::new(options).unwrap();

        for round in 0..5 {
            sink.write(format!("round {round}\n").as_bytes()).unwrap();
            sink.rotate().unwrap();
        }

        let backups = sink.backups().unwrap();
        assert_eq!(backups.len(), 2);
        assert_eq!(fs::read_to_string(&backups[0]).unwrap(), "round 4\n");
        assert_eq!(fs::read_to_string(&backups[1]).unwrap(), "round 3\n");
    }

    #[test]
    fn backups_are_pruned_by_age() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join("app-2000-01-01T00-00-00.000.log");
        fs::write(&stale, b"ancient").unwrap();
        let unrelated = dir.path().join("other-2000-01-01T00-00-00.000.log");
        fs::write(&unrelated, b"keep").unwrap();

        let options = FileSinkOptions::new(dir.path().join("app.log"))
            .max_size(1000)
            .max_age(Duration::from_secs(24 * 60 * 60));
        let sink = RotatingFileSink::new(options).unwrap();
        assert_eq!(sink.backups().unwrap(), vec![stale.clone()]);

        sink.write(b"fresh\n").unwrap();
        sink.rotate().unwrap();

        assert!(!stale.exists());
        assert!(unrelated.exists());
        assert_eq!(sink.backups().unwrap().len(), 1);
    }

    #[test]
    fn backup_names_are_utc_and_unique() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir, 1000);
        let at = DateTime::parse_from_rfc3339("2026-10-18T08:30:00.250+02:00")
            .unwrap()
            .with_timezone(&Utc);

        let first = sink.next_backup_path(at);
        assert_eq!(
            first.file_name().unwrap().to_string_lossy(),
            "app-2026-10-18T06-30-00.250.log"
        );
        fs::write(&first, b"").unwrap();
        let second = sink.next_backup_path(at);
        assert_eq!(
            second.file_name().unwrap().to_string_lossy(),
            "app-2026-10-18T06-30-00.251.log"
        );
    }

    #[test]
    fn operations_after_close_fail() {
        let dir = TempDir::new().unwrap();
        let sink = sink_in(&dir, 100);
        sink.write(b"last words\n").unwrap();
        sink.close().unwrap();

        assert!(matches!(sink.write(b"more"), Err(LogError::Closed { .. })));
        assert!(matches!(sink.rotate(), Err(LogError::Closed { .. })));
        assert!(sink.close().is_ok());
        assert_eq!(fs::read_to_string(sink.path()).unwrap(), "last words\n");
    }
}
