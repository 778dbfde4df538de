// log.rs — Append-only JSONL decision log with a hash chain.
//
// One JSON object per line; each record carries the SHA-256 of the
// previous line. Any insertion, deletion, or edit breaks the chain and
// is caught by `verify_chain`. The format stays greppable and
// jq-friendly on purpose.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::AuditError;
use crate::hasher;
use crate::record::DecisionRecord;

/// An append-only decision log backed by a JSONL file.
///
/// Flushes after every record: an audit trail that loses tail entries on
/// a crash is not worth keeping.
pub struct DecisionLog {
    writer: BufWriter<File>,
    path: PathBuf,
    /// Hash of the last line written, for the next chain link.
    last_hash: Option<String>,
}

impl DecisionLog {
    /// Open (or create) a decision log at the given path.
    ///
    /// If the file already exists, the last line is re-hashed so new
    /// records chain onto the existing history.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();

        let last_hash = if path.exists() {
            Self::read_last_hash(&path)?
        } else {
            None
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| AuditError::OpenFailed {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            writer: BufWriter::new(file),
            path,
            last_hash,
        })
    }

    /// Append a record, linking it to the previous one.
    pub fn append(&mut self, record: &mut DecisionRecord) -> Result<(), AuditError> {
        record.previous_hash = self.last_hash.clone();

        let json = serde_json::to_string(record)?;
        self.last_hash = Some(hasher::hash_str(&json));

        writeln!(self.writer, "{}", json)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read all records, oldest first. Skips blank lines.
    pub fn read_all(path: impl AsRef<Path>) -> Result<Vec<DecisionRecord>, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut records = Vec::new();

        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(records)
    }

    /// Read the newest `count` records, oldest of those first.
    pub fn tail(path: impl AsRef<Path>, count: usize) -> Result<Vec<DecisionRecord>, AuditError> {
        let mut records = Self::read_all(path)?;
        let skip = records.len().saturating_sub(count);
        Ok(records.split_off(skip))
    }

    /// Verify the hash chain of a log file.
    ///
    /// Hashes the raw JSON lines (not re-serialized records, which could
    /// reorder fields) and checks every `previous_hash` link.
    pub fn verify_chain(path: impl AsRef<Path>) -> Result<bool, AuditError> {
        let file = File::open(path.as_ref()).map_err(|source| AuditError::OpenFailed {
            path: path.as_ref().to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut previous_hash: Option<String> = None;

        for (line_num, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: DecisionRecord = serde_json::from_str(&line)?;
            if record.previous_hash != previous_hash {
                return Err(AuditError::IntegrityViolation {
                    line: line_num + 1,
                    expected: previous_hash.unwrap_or_else(|| "None".to_string()),
                    actual: record.previous_hash.unwrap_or_else(|| "None".to_string()),
                });
            }

            previous_hash = Some(hasher::hash_str(&line));
        }

        Ok(true)
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Hash of the last non-blank line of an existing log.
    fn read_last_hash(path: &Path) -> Result<Option<String>, AuditError> {
        let file = File::open(path).map_err(|source| AuditError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        let reader = BufReader::new(file);
        let mut last_line: Option<String> = None;

        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                last_line = Some(line);
            }
        }

        Ok(last_line.map(|line| hasher::hash_str(&line)))
    }
}
