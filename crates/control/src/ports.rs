//! Port traits implemented by infrastructure crates.
//!
//! | Port | Implemented by |
//! |------|----------------|
//! | [`OperationLog`] | `journal::FileJournal` (epoch files on disk), [`MemoryLog`] |
//! | [`ControlPlane`] | `facade::LocalControlPlane` (in-process), `client::HttpControlPlane` (remote) |

use std::borrow::Cow;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{ControlError, CreateOutcome, JournalError, Operation, Outcome};

// ---------------------------------------------------------------------------
// Instrumentation log
// ---------------------------------------------------------------------------

/// Append-only, rotatable record of every dispatched operation.
///
/// Each call to [`record`](Self::record) produces exactly one line in the
/// current epoch. Implementations must not interleave concurrent lines and
/// must not let a rotation split a line.
pub trait OperationLog: Send + Sync {
    /// Appends `<operation> <args…>` to the current epoch.
    fn record(&self, operation: &str, args: &[String]) -> Result<(), JournalError>;

    /// Closes the current epoch and starts the next one. Returns the new epoch number.
    fn rotate(&self) -> Result<u64, JournalError>;

    /// The epoch lines are currently written to.
    fn epoch(&self) -> u64;
}

/// [`OperationLog`] that keeps lines in memory, grouped by epoch.
///
/// Used where no durable log is wanted (tests, embedding).
#[derive(Debug)]
pub struct MemoryLog {
    epochs: Mutex<Vec<Vec<String>>>,
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self {
            epochs: Mutex::new(vec![Vec::new()]),
        }
    }
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines written during `epoch`, without timestamps.
    pub fn lines(&self, epoch: u64) -> Vec<String> {
        usize::try_from(epoch)
            .ok()
            .and_then(|index| self.epochs.lock().get(index).cloned())
            .unwrap_or_default()
    }

    /// Every line across all epochs, oldest first.
    pub fn all_lines(&self) -> Vec<String> {
        self.epochs.lock().iter().flatten().cloned().collect()
    }
}

impl OperationLog for MemoryLog {
    fn record(&self, operation: &str, args: &[String]) -> Result<(), JournalError> {
        let line = format_line(operation, args);
        let mut epochs = self.epochs.lock();
        match epochs.last_mut() {
            Some(current) => current.push(line),
            None => epochs.push(vec![line]),
        }
        Ok(())
    }

    fn rotate(&self) -> Result<u64, JournalError> {
        let mut epochs = self.epochs.lock();
        epochs.push(Vec::new());
        Ok(epochs.len() as u64 - 1)
    }

    fn epoch(&self) -> u64 {
        self.epochs.lock().len().saturating_sub(1) as u64
    }
}

/// Renders the body of a log line: the operation name followed by its
/// space-separated arguments, each passed through [`escape_arg`].
pub fn format_line(operation: &str, args: &[String]) -> String {
    let mut line = operation.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&escape_arg(arg));
    }
    line
}

/// Percent-encodes the bytes that would split or break a log line:
/// `%`, space, tab, carriage return and line feed.
pub fn escape_arg(arg: &str) -> Cow<'_, str> {
    if !arg.contains(['%', ' ', '\t', '\r', '\n']) {
        return Cow::Borrowed(arg);
    }
    let mut escaped = String::with_capacity(arg.len() + 8);
    for ch in arg.chars() {
        match ch {
            '%' => escaped.push_str("%25"),
            ' ' => escaped.push_str("%20"),
            '\t' => escaped.push_str("%09"),
            '\r' => escaped.push_str("%0D"),
            '\n' => escaped.push_str("%0A"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}

/// Reverses [`escape_arg`]. A `%` not followed by two hex digits is kept as is.
pub fn unescape_arg(arg: &str) -> String {
    let bytes = arg.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = arg
                .get(i + 1..i + 3)
                .and_then(|digits| u8::from_str_radix(digits, 16).ok());
            if let Some(byte) = hex {
                decoded.push(byte);
                i += 3;
                continue;
            }
        }
        decoded.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

// ---------------------------------------------------------------------------
// Control plane
// ---------------------------------------------------------------------------

/// The uniform request/response surface over all sessions.
///
/// Both the in-process facade and the remote HTTP client implement this, so
/// callers (and tests) are written once against the trait.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Creates a session backed by `domain`, seeded with `seed`.
    ///
    /// An unknown `domain` yields [`CreateOutcome::Rejected`], not an error.
    async fn create_session(&self, domain: &str, seed: i64) -> Result<CreateOutcome, ControlError>;

    /// Runs `operation` against the session registered as `session_id`.
    async fn execute(&self, session_id: &str, operation: Operation) -> Result<Outcome, ControlError>;

    /// Rotates the instrumentation log, returning the new epoch.
    async fn rotate_log(&self) -> Result<u64, ControlError>;
}
