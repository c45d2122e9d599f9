//! Switch command implementation.
//!
//! Flips the phase of every record of a store in place. The file is
//! rewritten through its read-write map, so an interrupted run leaves a
//! partly switched store.

use crate::error::Result;
use crate::store::{OpenMode, PhaseStore};
use log::{info, warn};
use std::fmt;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct SwitchCommand;

impl SwitchCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn run<P: AsRef<Path>>(&self, path: P) -> Result<SwitchStats> {
        let mut store = PhaseStore::open(path.as_ref(), OpenMode::ReadWrite)?;
        if !store.integrity_check() {
            warn!(
                "{} does not pass the integrity check, switching anyway",
                path.as_ref().display()
            );
        }
        let records = store.switch_phase()?;
        store.flush()?;
        info!("Switched phase of {}", path.as_ref().display());
        Ok(SwitchStats {
            samples: store.sample_count(),
            records,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SwitchStats {
    pub samples: u32,
    pub records: usize,
}

impl fmt::Display for SwitchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Samples: {}, Records switched: {}", self.samples, self.records)
    }
}
