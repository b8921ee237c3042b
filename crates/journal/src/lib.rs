//! Heurist instrumentation log.
//!
//! Implements [`control::OperationLog`] on top of plain text files, one file
//! per *epoch*. Every line has the shape
//!
//! ```text
//! <epochMillis>\t<operation> <args…>
//! ```
//!
//! and is flushed before [`FileJournal::record`] returns, so every dispatched
//! operation is on disk even if the process dies right after. Arguments are
//! escaped with [`control::ports::escape_arg`], so a caller-supplied value
//! can never add a line or shift the arguments that follow it.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File naming, buffering, and rotation live here. The
//! `control` crate sees only [`control::OperationLog`].
//!
//! ## File layout
//!
//! | Epoch | File |
//! |-------|------|
//! | 0 (process start) | `<dir>/<prefix>-<startMillis>-0.txt` |
//! | n (after n rotations) | `<dir>/<prefix>-<startMillis>-<n>.txt` |
//!
//! `startMillis` is fixed for the life of the process, so all epochs of one
//! run sort together. Files are opened in append mode and never rewritten.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use control::ports::{format_line, unescape_arg};
use control::{JournalError, OperationLog};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// File-name prefix used when none is configured.
pub const DEFAULT_PREFIX: &str = "episode";

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Where and under what name epoch files are written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Directory holding the epoch files. Created if missing.
    pub directory: PathBuf,
    /// Leading component of every file name.
    pub prefix: String,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl JournalConfig {
    /// Path of epoch `epoch` for a process that started at `started_millis`.
    pub fn epoch_path(&self, started_millis: i64, epoch: u64) -> PathBuf {
        self.directory
            .join(format!("{}-{started_millis}-{epoch}.txt", self.prefix))
    }
}

// ---------------------------------------------------------------------------
// File journal
// ---------------------------------------------------------------------------

struct EpochFile {
    epoch: u64,
    path: PathBuf,
    // `None` once the journal is closed.
    writer: Option<BufWriter<File>>,
}

/// Append-only, rotatable instrumentation log backed by epoch files.
///
/// # Thread Safety
///
/// One mutex guards the current epoch. It is held across each
/// write-and-flush and across rotation, so lines never interleave and no line
/// straddles two epochs.
pub struct FileJournal {
    config: JournalConfig,
    started_millis: i64,
    current: Mutex<EpochFile>,
}

impl FileJournal {
    /// Creates the directory if needed and opens epoch 0.
    pub fn open(config: JournalConfig) -> Result<Self, JournalError> {
        std::fs::create_dir_all(&config.directory).map_err(|source| JournalError::Io {
            path: config.directory.display().to_string(),
            source,
        })?;

        let started_millis = Utc::now().timestamp_millis();
        let path = config.epoch_path(started_millis, 0);
        let writer = open_epoch_file(&path)?;
        info!(path = %path.display(), "instrumentation log opened");

        Ok(Self {
            config,
            started_millis,
            current: Mutex::new(EpochFile {
                epoch: 0,
                path,
                writer: Some(writer),
            }),
        })
    }

    /// Path of the file currently written to.
    pub fn current_path(&self) -> PathBuf {
        self.current.lock().path.clone()
    }

    /// Process-start timestamp embedded in every file name.
    pub fn started_millis(&self) -> i64 {
        self.started_millis
    }

    pub fn config(&self) -> &JournalConfig {
        &self.config
    }

    /// Flushes and closes the current epoch. Later writes fail with
    /// [`JournalError::Closed`].
    pub fn close(&self) -> Result<(), JournalError> {
        let mut current = self.current.lock();
        match current.writer.take() {
            Some(mut writer) => writer.flush().map_err(|source| JournalError::Io {
                path: current.path.display().to_string(),
                source,
            }),
            None => Ok(()),
        }
    }
}

fn open_epoch_file(path: &Path) -> Result<BufWriter<File>, JournalError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(BufWriter::new)
        .map_err(|source| JournalError::Io {
            path: path.display().to_string(),
            source,
        })
}

impl OperationLog for FileJournal {
    fn record(&self, operation: &str, args: &[String]) -> Result<(), JournalError> {
        let body = format_line(operation, args);

        let mut current = self.current.lock();
        // Stamped under the lock: timestamps are non-decreasing within a file.
        let line = format!("{}\t{body}\n", Utc::now().timestamp_millis());
        let EpochFile { path, writer, .. } = &mut *current;
        let writer = writer.as_mut().ok_or(JournalError::Closed)?;
        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|source| JournalError::Io {
                path: path.display().to_string(),
                source,
            })
    }

    fn rotate(&self) -> Result<u64, JournalError> {
        let mut current = self.current.lock();
        let Some(old_writer) = current.writer.as_mut() else {
            return Err(JournalError::Closed);
        };
        if let Err(error) = old_writer.flush() {
            warn!(path = %current.path.display(), error = %error, "flush before rotation failed");
        }

        let epoch = current.epoch + 1;
        let path = self.config.epoch_path(self.started_millis, epoch);
        // The old epoch stays current if the next file cannot be opened.
        let writer = open_epoch_file(&path)?;

        info!(epoch, path = %path.display(), "instrumentation log rotated");
        *current = EpochFile {
            epoch,
            path,
            writer: Some(writer),
        };
        Ok(epoch)
    }

    fn epoch(&self) -> u64 {
        self.current.lock().epoch
    }
}

impl Drop for FileJournal {
    fn drop(&mut self) {
        if let Err(error) = self.close() {
            warn!(error = %error, "instrumentation log flush on shutdown failed");
        }
    }
}

impl std::fmt::Debug for FileJournal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let current = self.current.lock();
        f.debug_struct("FileJournal")
            .field("config", &self.config)
            .field("started_millis", &self.started_millis)
            .field("epoch", &current.epoch)
            .field("path", &current.path)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// One parsed line of an epoch file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    pub at_millis: i64,
    pub operation: String,
    pub args: Vec<String>,
}

impl JournalLine {
    /// Parses `<millis>\t<operation> <args…>`, decoding each escaped
    /// argument. Returns `None` for malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let (millis, body) = line.split_once('\t')?;
        let at_millis = millis.parse().ok()?;
        let mut words = body.split(' ');
        let operation = words.next().filter(|w| !w.is_empty())?.to_string();
        Some(Self {
            at_millis,
            operation,
            args: words.map(unescape_arg).collect(),
        })
    }
}

/// Reads every well-formed line of one epoch file. Malformed lines are skipped.
pub fn read_epoch(path: &Path) -> Result<Vec<JournalLine>, JournalError> {
    let io_error = |source| JournalError::Io {
        path: path.display().to_string(),
        source,
    };
    let file = File::open(path).map_err(io_error)?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(io_error)?;
        match JournalLine::parse(&line) {
            Some(parsed) => lines.push(parsed),
            None => warn!(path = %path.display(), line = %line, "skipping malformed journal line"),
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;

    fn journal(dir: &Path) -> FileJournal {
        FileJournal::open(JournalConfig {
            directory: dir.to_path_buf(),
            prefix: "test".to_string(),
        })
        .expect("open journal")
    }

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn opens_epoch_zero_with_start_timestamp_in_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = journal(dir.path());

        assert_eq!(journal.epoch(), 0);
        let name = journal
            .current_path()
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .expect("file name");
        assert_eq!(name, format!("test-{}-0.txt", journal.started_millis()));
    }

    #[test]
    fn each_record_is_one_flushed_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = journal(dir.path());

        journal
            .record("applyHeuristic", &args(&["abc", "1", "0", "1"]))
            .expect("record");
        journal.record("toString", &args(&["abc"])).expect("record");

        // No flush or close before reading: records must already be on disk.
        let lines = read_epoch(&journal.current_path()).expect("read");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].operation, "applyHeuristic");
        assert_eq!(lines[0].args, args(&["abc", "1", "0", "1"]));
        assert_eq!(lines[1].operation, "toString");
        assert!(lines[0].at_millis >= journal.started_millis());
    }

    #[test]
    fn rotation_partitions_lines_without_loss_or_duplication() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = journal(dir.path());
        let first = journal.current_path();

        journal.record("before", &args(&["1"])).expect("record");
        journal.record("before", &args(&["2"])).expect("record");
        assert_eq!(journal.rotate().expect("rotate"), 1);
        journal.record("after", &args(&["3"])).expect("record");
        let second = journal.current_path();

        assert_ne!(first, second);
        assert_eq!(second, journal.config().epoch_path(journal.started_millis(), 1));

        let before = read_epoch(&first).expect("read");
        let after = read_epoch(&second).expect("read");
        assert_eq!(
            before.iter().map(|l| l.args[0].as_str()).collect::<Vec<_>>(),
            vec!["1", "2"]
        );
        assert_eq!(
            after.iter().map(|l| l.args[0].as_str()).collect::<Vec<_>>(),
            vec!["3"]
        );
    }

    #[test]
    fn concurrent_writers_never_interleave_within_a_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = Arc::new(journal(dir.path()));

        let writers: Vec<_> = (0..8)
            .map(|t| {
                let journal = Arc::clone(&journal);
                thread::spawn(move || {
                    for i in 0..50 {
                        let payload = format!("{t}-{i}");
                        journal
                            .record("op", &[payload.clone(), payload.clone(), payload])
                            .expect("record");
                        if t == 0 && i == 25 {
                            journal.rotate().expect("rotate");
                        }
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().expect("writer thread");
        }

        let mut total = 0;
        let mut last_millis = i64::MIN;
        for epoch in 0..=journal.epoch() {
            let path = journal.config().epoch_path(journal.started_millis(), epoch);
            for line in read_epoch(&path).expect("read") {
                assert_eq!(line.args.len(), 3);
                assert!(line.args.iter().all(|a| a == &line.args[0]));
                assert!(line.at_millis >= last_millis, "timestamps went backwards");
                last_millis = line.at_millis;
                total += 1;
            }
        }
        assert_eq!(total, 8 * 50);
    }

    #[test]
    fn control_characters_in_arguments_cannot_forge_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = journal(dir.path());
        let forged = "MUTATION\n1\tinstantiateProblemDomain SAT 7";

        journal
            .record("getHeuristicsOfType", &args(&["sid", forged]))
            .expect("record");

        let lines = read_epoch(&journal.current_path()).expect("read");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].operation, "getHeuristicsOfType");
        assert_eq!(lines[0].args, args(&["sid", forged]));

        let raw = std::fs::read_to_string(journal.current_path()).expect("raw");
        assert_eq!(raw.lines().count(), 1);
    }

    #[test]
    fn empty_arguments_keep_their_position() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = journal(dir.path());

        journal
            .record("getHeuristicsOfType", &args(&["sid", ""]))
            .expect("record");

        let lines = read_epoch(&journal.current_path()).expect("read");
        assert_eq!(lines[0].args, args(&["sid", ""]));
    }

    #[test]
    fn closed_journal_refuses_writes_and_rotation() {
        let dir = tempfile::tempdir().expect("tempdir");
        let journal = journal(dir.path());
        journal.close().expect("close");

        assert!(matches!(journal.record("x", &[]), Err(JournalError::Closed)));
        assert!(matches!(journal.rotate(), Err(JournalError::Closed)));
    }

    #[test]
    fn parse_rejects_lines_without_timestamp() {
        assert_eq!(JournalLine::parse("getNumberOfHeuristics abc"), None);
        assert_eq!(
            JournalLine::parse("17\tgetNumberOfHeuristics abc"),
            Some(JournalLine {
                at_millis: 17,
                operation: "getNumberOfHeuristics".to_string(),
                args: vec!["abc".to_string()],
            })
        );
    }
}
