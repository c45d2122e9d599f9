//! Diff command implementation.
//!
//! Compares a store before and after rephasing. For each record that had a
//! low score in the original store it reports the original score, whether
//! rephasing switched its phase, and how many phase-informative reads the
//! rephased score carries.

use crate::error::{PhaseError, Result};
use crate::report::ReportWriter;
use crate::store::{OpenMode, PhaseStore};
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Diff command configuration.
#[derive(Debug, Clone)]
pub struct DiffCommand {
    pub low_score_threshold: f32,
    /// Store positions to compare; all when `None`.
    pub samples: Option<Vec<u32>>,
}

impl Default for DiffCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl DiffCommand {
    pub fn new() -> Self {
        Self {
            low_score_threshold: 0.99,
            samples: None,
        }
    }

    pub fn with_low_score_threshold(mut self, t: f32) -> Self {
        self.low_score_threshold = t;
        self
    }

    pub fn with_samples(mut self, samples: Vec<u32>) -> Self {
        self.samples = Some(samples);
        self
    }

    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, W: Write>(
        &self,
        original: P,
        rephased: Q,
        output: W,
    ) -> Result<DiffStats> {
        let original = PhaseStore::open(original, OpenMode::ReadOnly)?;
        let rephased = PhaseStore::open(rephased, OpenMode::ReadOnly)?;
        self.diff_stores(&original, &rephased, output)
    }

    pub fn diff_stores<W: Write>(
        &self,
        original: &PhaseStore,
        rephased: &PhaseStore,
        output: W,
    ) -> Result<DiffStats> {
        if original.sample_count() != rephased.sample_count() {
            return Err(PhaseError::InvalidArgument(format!(
                "{} has {} samples but {} has {}",
                original.path().display(),
                original.sample_count(),
                rephased.path().display(),
                rephased.sample_count()
            )));
        }
        let samples: Vec<u32> = match &self.samples {
            Some(s) => s.clone(),
            None => (0..original.sample_count()).collect(),
        };

        let mut out = ReportWriter::new(output);
        out.line("#sample\tsite\tpp\tswitched\tnum_pir")?;
        let mut stats = DiffStats::default();
        for n in samples {
            let before = original.records_for(n)?;
            let after = rephased.records_for(n)?;
            if before.len() != after.len() {
                return Err(PhaseError::SizeMismatch {
                    sample: n,
                    left: before.len() as u32,
                    right: after.len() as u32,
                });
            }
            stats.samples += 1;
            for (old, new) in before.iter().zip(after.iter()) {
                stats.records += 1;
                if !old.is_low_score(self.low_score_threshold) {
                    continue;
                }
                let switched = old.allele0 != new.allele0;
                let pir = new.evidence_reads();
                stats.low_score += 1;
                stats.switched += switched as u64;
                stats.rephased += new.is_rephased() as u64;
                out.int(n)?
                    .int(old.site_index)?
                    .float(old.phase_score)?
                    .int(switched as u8)?
                    .int(pir)?;
                out.end_line()?;
            }
        }
        out.flush()?;
        Ok(stats)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub samples: u32,
    pub records: u64,
    pub low_score: u64,
    pub rephased: u64,
    pub switched: u64,
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Samples: {}, Records: {}, Low score: {}, Rephased: {}, Switched: {}",
            self.samples, self.records, self.low_score, self.rephased, self.switched
        )
    }
}
