//! File-per-record audit storage.

use std::cmp::Reverse;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::model::{AuditRecord, AuditStatus};
use crate::error::{Error, Result};
use crate::gate::{SendContext, Verdict, parse_timestamp};

/// Number of records [`AuditLog::list`] returns by default.
pub const DEFAULT_LIST_LIMIT: usize = 20;

/// Longest recipient prefix kept in a file name.
const RECIPIENT_PREFIX_LEN: usize = 20;

const RECORD_EXT: &str = "json";
const PENDING_SUFFIX: &str = ".json.pending";

/// File name stem for a record: `<yyyyMMdd-HHmmss>-<local part>`.
///
/// The local part is cut to 20 characters and anything that is not safe
/// in a file name becomes `_`.
#[must_use]
pub fn file_stem(at: DateTime<Utc>, recipient: &str) -> String {
    let local = recipient.split('@').next().unwrap_or_default();
    let mut prefix: String = local
        .chars()
        .take(RECIPIENT_PREFIX_LEN)
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '+') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if prefix.is_empty() {
        prefix.push_str("unknown");
    }
    format!("{}-{prefix}", at.format("%Y%m%d-%H%M%S"))
}

/// A provisional entry written before transmission.
#[derive(Debug)]
pub struct PendingEntry {
    record: AuditRecord,
    pending_path: PathBuf,
    final_path: PathBuf,
}

impl PendingEntry {
    /// Where the provisional entry lives.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.pending_path
    }

    /// Where the finalized record will be written.
    #[must_use]
    pub fn final_path(&self) -> &Path {
        &self.final_path
    }

    /// The record as it will be finalized (status still pending).
    #[must_use]
    pub const fn record(&self) -> &AuditRecord {
        &self.record
    }
}

/// Audit trail rooted at one directory.
///
/// Holds no in-memory state: every read goes back to the directory.
#[derive(Debug, Clone)]
pub struct AuditLog {
    dir: PathBuf,
}

impl AuditLog {
    /// Creates an audit log over `dir`. The directory is not created here.
    #[must_use]
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// The audit directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes the provisional entry for a send that is about to happen.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp does not parse or the entry
    /// cannot be written.
    pub fn begin(&self, context: &SendContext, verdict: &Verdict) -> Result<PendingEntry> {
        let at = parse_timestamp(&context.timestamp).ok_or_else(|| Error::ValidationFailed {
            validator: verdict.validator_id.clone(),
            reason: "Invalid timestamp format".into(),
        })?;
        let stem = file_stem(at, &context.to);
        let record = AuditRecord::pending(context, verdict);

        for n in 0u32.. {
            let candidate = if n == 0 {
                stem.clone()
            } else {
                format!("{stem}-{n}")
            };
            let final_path = self.dir.join(format!("{candidate}.{RECORD_EXT}"));
            let pending_path = self.dir.join(format!("{candidate}{PENDING_SUFFIX}"));
            if final_path.exists() {
                continue;
            }

            match write_new(&pending_path, &record) {
                Ok(()) => {
                    debug!(path = %pending_path.display(), "Pending audit entry written");
                    return Ok(PendingEntry {
                        record,
                        pending_path,
                        final_path,
                    });
                }
                Err(Error::Io(e)) if e.kind() == io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(e),
            }
        }
        Err(Error::Io(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("no free audit file name for {stem}"),
        )))
    }

    /// Turns a pending entry into the final, immutable `sent` record.
    ///
    /// # Errors
    ///
    /// Returns an error if the final record cannot be written; the pending
    /// entry is left in place in that case.
    pub fn commit(&self, entry: PendingEntry) -> Result<(PathBuf, AuditRecord)> {
        let mut record = entry.record;
        record.status = AuditStatus::Sent;

        write_new(&entry.final_path, &record)?;
        if let Err(e) = fs::remove_file(&entry.pending_path) {
            warn!(path = %entry.pending_path.display(), "Could not remove pending entry: {e}");
        }

        info!(path = %entry.final_path.display(), to = %record.recipient, "Audit record written");
        Ok((entry.final_path, record))
    }

    /// Discards a pending entry after the provider rejected the send.
    ///
    /// # Errors
    ///
    /// Returns an error if the pending file exists but cannot be removed.
    pub fn abandon(&self, entry: PendingEntry) -> Result<()> {
        match fs::remove_file(&entry.pending_path) {
            Ok(()) => {
                debug!(path = %entry.pending_path.display(), "Pending audit entry discarded");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Records an accepted send in one step.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub fn record(&self, context: &SendContext, verdict: &Verdict) -> Result<PathBuf> {
        let entry = self.begin(context, verdict)?;
        let (path, _) = self.commit(entry)?;
        Ok(path)
    }

    /// Finalized records, newest first, at most `limit`.
    ///
    /// Unreadable files are skipped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn list(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        let mut records = self.read_entries(|name| {
            Path::new(name)
                .extension()
                .is_some_and(|ext| ext == RECORD_EXT)
        })?;
        records.truncate(limit);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    /// Provisional entries that were never finalized or discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory exists but cannot be read.
    pub fn pending(&self) -> Result<Vec<(PathBuf, AuditRecord)>> {
        self.read_entries(|name| name.ends_with(PENDING_SUFFIX))
    }

    fn read_entries(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<(PathBuf, AuditRecord)>> {
        let dir = match fs::read_dir(&self.dir) {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for item in dir {
            let path = item?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !keep(name) {
                continue;
            }
            match read_record(&path) {
                Ok(record) => entries.push((path, record)),
                Err(e) => warn!(path = %path.display(), "Skipping unreadable audit file: {e}"),
            }
        }

        // Newest first; within one instant the later collision suffix wins.
        entries.sort_by_cached_key(|(path, record)| {
            Reverse((
                parse_timestamp(&record.timestamp),
                sequence(path, record),
                path.clone(),
            ))
        });
        Ok(entries)
    }
}

/// Collision counter of an entry: `0` for `<stem>.json`, `n` for
/// `<stem>-n.json` (pending entries alike).
fn sequence(path: &Path, record: &AuditRecord) -> u32 {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return 0;
    };
    let Some(at) = parse_timestamp(&record.timestamp) else {
        return 0;
    };
    let name = name
        .strip_suffix(PENDING_SUFFIX)
        .or_else(|| name.strip_suffix(&format!(".{RECORD_EXT}")))
        .unwrap_or(name);

    name.strip_prefix(file_stem(at, &record.recipient).as_str())
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

fn read_record(path: &Path) -> Result<AuditRecord> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Writes `record` to a file that must not exist yet.
fn write_new(path: &Path, record: &AuditRecord) -> Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    let json = serde_json::to_string_pretty(record)?;
    file.write_all(json.as_bytes())?;
    file.sync_all()?;
    Ok(())
}
