//! Show command implementation.
//!
//! Prints a per-sample table of a phase store, or the records of a single
//! sample, optionally annotated with the site loci of the call set.

use crate::error::{PhaseError, Result};
use crate::genotype::is_phased;
use crate::report::ReportWriter;
use crate::store::{OpenMode, PhaseStore};
use crate::variants::VariantCatalog;
use std::fmt;
use std::io::Write;
use std::path::Path;

/// Show command configuration.
#[derive(Debug, Clone)]
pub struct ShowCommand {
    /// Records with a score below this count as low-score.
    pub low_score_threshold: f32,
    /// Dump the records of this store position instead of the table.
    pub sample: Option<u32>,
}

impl Default for ShowCommand {
    fn default() -> Self {
        Self::new()
    }
}

impl ShowCommand {
    pub fn new() -> Self {
        Self {
            low_score_threshold: 0.99,
            sample: None,
        }
    }

    pub fn with_low_score_threshold(mut self, t: f32) -> Self {
        self.low_score_threshold = t;
        self
    }

    pub fn with_sample(mut self, sample: u32) -> Self {
        self.sample = Some(sample);
        self
    }

    /// Open the store at `path` read-only and show it.
    pub fn run<P: AsRef<Path>, W: Write>(
        &self,
        path: P,
        catalog: Option<&VariantCatalog>,
        output: W,
    ) -> Result<ShowStats> {
        let store = PhaseStore::open(path, OpenMode::ReadOnly)?;
        self.show_store(&store, catalog, output)
    }

    pub fn show_store<W: Write>(
        &self,
        store: &PhaseStore,
        catalog: Option<&VariantCatalog>,
        output: W,
    ) -> Result<ShowStats> {
        let mut out = ReportWriter::new(output);
        let mut stats = ShowStats {
            samples: store.sample_count(),
            file_size: store.file_size(),
            integrity_ok: store.integrity_check(),
            ..ShowStats::default()
        };

        match self.sample {
            Some(n) => {
                if n >= store.sample_count() {
                    return Err(PhaseError::InvalidArgument(format!(
                        "sample {} out of range, store has {} samples",
                        n,
                        store.sample_count()
                    )));
                }
                let block = store.records_for(n)?;
                out.line(&format!(
                    "# sample {} original_index {} records {}",
                    n,
                    block.original_index(),
                    block.len()
                ))?;
                for record in block.iter() {
                    if let Some(cat) = catalog {
                        out.field(&cat.locus(record.site_index))?;
                    }
                    let sep = if is_phased(record.allele1) { "|" } else { "/" };
                    out.int(record.site_index)?
                        .field(&format!(
                            "{}{}{}",
                            record.allele0_index(),
                            sep,
                            record.allele1_index()
                        ))?
                        .float(record.phase_score)?;
                    out.end_line()?;
                    stats.tally(&record, self.low_score_threshold);
                }
            }
            None => {
                out.line("#sample\toriginal_index\trecords\tlow_score\trephased")?;
                for n in 0..store.sample_count() {
                    let block = store.records_for(n)?;
                    let before = stats;
                    for record in block.iter() {
                        stats.tally(&record, self.low_score_threshold);
                    }
                    out.int(n)?
                        .int(block.original_index())?
                        .int(block.len())?
                        .int(stats.low_score - before.low_score)?
                        .int(stats.rephased - before.rephased)?;
                    out.end_line()?;
                }
            }
        }
        out.flush()?;
        Ok(stats)
    }
}

/// Totals over the records shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShowStats {
    pub samples: u32,
    pub file_size: u64,
    pub records: u64,
    pub low_score: u64,
    pub rephased: u64,
    pub integrity_ok: bool,
}

impl ShowStats {
    fn tally(&mut self, record: &crate::genotype::GenotypeRecord, threshold: f32) {
        self.records += 1;
        if record.is_low_score(threshold) {
            self.low_score += 1;
        }
        if record.is_rephased() {
            self.rephased += 1;
        }
    }
}

impl fmt::Display for ShowStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Samples: {}, Size: {} bytes, Records: {}, Low score: {}, Rephased: {}, Integrity: {}",
            self.samples,
            self.file_size,
            self.records,
            self.low_score,
            self.rephased,
            if self.integrity_ok { "ok" } else { "FAILED" }
        )
    }
}
