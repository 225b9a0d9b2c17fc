//! Session result counters and their on-disk text form.
//!
//! The file is plain `key: value` lines, overwritten on every flush:
//!
//! ```text
//! Correct Orders: 3
//! Wrong Orders: 1
//! Orders Spawned: 7
//! Objects Trashed: 2
//! ```
//!
//! Keys are compared with runs of whitespace collapsed, so older files
//! written as `Wrong  Orders` still load.

use std::fmt::Write as _;
use std::path::Path;

const CORRECT: &str = "Correct Orders";
const WRONG: &str = "Wrong Orders";
const SPAWNED: &str = "Orders Spawned";
const TRASHED: &str = "Objects Trashed";

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("results I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: expected `key: value`, got {text:?}")]
    MalformedLine { line: usize, text: String },
    #[error("line {line}: unknown key {key:?}")]
    UnknownKey { line: usize, key: String },
    #[error("line {line}: {key} has non-integer value {value:?}")]
    BadValue {
        line: usize,
        key: &'static str,
        value: String,
    },
    #[error("missing key {0:?}")]
    MissingKey(&'static str),
}

/// The four counters persisted at the end of a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultLedger {
    pub spawned: u32,
    pub correct: u32,
    pub wrong: u32,
    pub trashed: u32,
}

impl ResultLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_spawned(&mut self, count: u32) {
        self.spawned = self.spawned.saturating_add(count);
    }

    pub fn record_result(&mut self, correct: bool) {
        let slot = if correct {
            &mut self.correct
        } else {
            &mut self.wrong
        };
        *slot = slot.saturating_add(1);
    }

    pub fn record_trashed(&mut self) {
        self.trashed = self.trashed.saturating_add(1);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// The text blob written by [`flush`](Self::flush).
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (key, value) in [
            (CORRECT, self.correct),
            (WRONG, self.wrong),
            (SPAWNED, self.spawned),
            (TRASHED, self.trashed),
        ] {
            let _ = writeln!(out, "{key}: {value}");
        }
        out
    }

    /// Parse a blob produced by [`render`](Self::render). Blank lines are
    /// skipped; every key must be present.
    pub fn parse(text: &str) -> Result<Self, LedgerError> {
        let mut slots: [Option<u32>; 4] = [None; 4];
        let keys = [CORRECT, WRONG, SPAWNED, TRASHED];

        for (index, raw) in text.lines().enumerate() {
            let line = index + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let Some((key, value)) = raw.split_once(':') else {
                return Err(LedgerError::MalformedLine {
                    line,
                    text: raw.to_string(),
                });
            };
            let key = key.split_whitespace().collect::<Vec<_>>().join(" ");
            let Some(slot) = keys.iter().position(|k| *k == key) else {
                return Err(LedgerError::UnknownKey { line, key });
            };
            let value = value.trim();
            slots[slot] = Some(value.parse().map_err(|_| LedgerError::BadValue {
                line,
                key: keys[slot],
                value: value.to_string(),
            })?);
        }

        let get = |i: usize| slots[i].ok_or(LedgerError::MissingKey(keys[i]));
        Ok(Self {
            correct: get(0)?,
            wrong: get(1)?,
            spawned: get(2)?,
            trashed: get(3)?,
        })
    }

    /// Overwrite `path` with the current counters.
    pub fn flush(&self, path: &Path) -> Result<(), LedgerError> {
        std::fs::write(path, self.render())?;
        tracing::info!(path = %path.display(), ledger = ?self, "results saved");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, LedgerError> {
        Self::parse(&std::fs::read_to_string(path)?)
    }
}
