//! Integrity check of a phase store.

use crate::error::Result;
use crate::store::{IntegrityIssue, OpenMode, PhaseStore};
use log::warn;
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct CheckCommand;

impl CheckCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<CheckStats> {
        let store = PhaseStore::open(path.as_ref(), OpenMode::ReadOnly)?;
        let issues = store.integrity_issues();
        for issue in &issues {
            warn!("{}: {}", path.as_ref().display(), issue);
        }
        Ok(CheckStats {
            samples: store.sample_count(),
            file_size: store.file_size(),
            issues,
        })
    }
}

/// Result of a check.
#[derive(Debug, Clone, Default)]
pub struct CheckStats {
    pub samples: u32,
    pub file_size: u64,
    pub issues: Vec<IntegrityIssue>,
}

impl CheckStats {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for CheckStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            write!(
                f,
                "OK: {} samples, {} bytes",
                self.samples, self.file_size
            )
        } else {
            write!(
                f,
                "FAILED: {} problems in {} samples",
                self.issues.len(),
                self.samples
            )
        }
    }
}
