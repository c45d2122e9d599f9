//! Extraction of low-confidence heterozygous calls into a phase store.
//!
//! The call set is streamed once, site by site. Every heterozygous call of
//! every selected sample goes through that sample's [`EvidenceWindow`];
//! what the windows keep becomes the sample blocks of the store.

use crate::config::{ExtractConfig, SyntheticScore};
use crate::error::{PhaseError, Result};
use crate::genotype::{allele_index, GenotypeRecord};
use crate::parallel::PARALLEL_THRESHOLD;
use crate::store::StoreWriter;
use crate::window::{EvidenceWindow, LowScore};
use log::info;
use rayon::prelude::*;
use std::fmt;
use std::ops::Range;
use std::path::Path;

/// Score given to singleton calls that would otherwise be skipped.
pub const SINGLETON_SCORE: f32 = 0.97;

/// The data of one site line needed for extraction.
#[derive(Debug, Clone, Copy)]
pub struct VariantRow<'a> {
    pub is_snp: bool,
    /// Encoded alleles, two per sample, for every sample of the call set.
    pub genotypes: &'a [i32],
    /// `PP` values, one per sample, when the line carries them.
    pub phase_scores: Option<&'a [f32]>,
    /// INFO `AC` (first alternate).
    pub allele_count: Option<i32>,
    /// INFO `AN`.
    pub allele_number: Option<i32>,
    /// INFO `AF` (first alternate).
    pub allele_frequency: Option<f32>,
}

impl<'a> VariantRow<'a> {
    pub fn new(is_snp: bool, genotypes: &'a [i32]) -> Self {
        Self {
            is_snp,
            genotypes,
            phase_scores: None,
            allele_count: None,
            allele_number: None,
            allele_frequency: None,
        }
    }

    pub fn with_phase_scores(mut self, scores: &'a [f32]) -> Self {
        self.phase_scores = Some(scores);
        self
    }

    pub fn with_counts(mut self, ac: Option<i32>, an: Option<i32>) -> Self {
        self.allele_count = ac;
        self.allele_number = an;
        self
    }

    pub fn with_frequency(mut self, af: f32) -> Self {
        self.allele_frequency = Some(af);
        self
    }
}

/// Per-sample counts of an extraction run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SampleCounts {
    pub het_sites: u64,
    pub low_score: u64,
    pub low_score_snp: u64,
    pub non_snp: u64,
}

/// Summary of an extraction run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractStats {
    pub sites: u32,
    pub samples: u32,
    pub het_sites: u64,
    pub low_score: u64,
    pub kept: u64,
}

impl fmt::Display for ExtractStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sites read:        {}", self.sites)?;
        writeln!(f, "Samples:           {}", self.samples)?;
        writeln!(f, "Het calls:         {}", self.het_sites)?;
        writeln!(f, "Low-score calls:   {}", self.low_score)?;
        write!(f, "Records stored:    {}", self.kept)
    }
}

/// Synthetic score from a minor allele frequency.
#[inline]
fn score_from_frequency(freq: f32, threshold: f32) -> f32 {
    let maf = freq.min(1.0 - freq);
    if maf > threshold {
        f32::NAN
    } else {
        maf / 2.0
    }
}

/// Streams site lines into per-sample retention windows.
pub struct Extractor {
    config: ExtractConfig,
    range: Range<u32>,
    windows: Vec<EvidenceWindow<GenotypeRecord, LowScore>>,
    counts: Vec<SampleCounts>,
    site_index: u32,
}

impl Extractor {
    /// Prepare windows for the configured sample range of a call set with
    /// `total_samples` samples.
    pub fn new(config: ExtractConfig, total_samples: u32) -> Self {
        let range = config.sample_range(total_samples);
        let n = range.len();
        let window = EvidenceWindow::new(config.window_size, LowScore(config.pp_threshold));
        Self {
            windows: vec![window; n],
            counts: vec![SampleCounts::default(); n],
            config,
            range,
            site_index: 0,
        }
    }

    /// Selected call-set sample indices.
    pub fn sample_range(&self) -> Range<u32> {
        self.range.clone()
    }

    /// Index the next pushed row will get.
    pub fn next_site_index(&self) -> u32 {
        self.site_index
    }

    pub fn counts(&self) -> &[SampleCounts] {
        &self.counts
    }

    fn synthetic_score(&self, row: &VariantRow<'_>) -> Option<f32> {
        match self.config.synthetic {
            SyntheticScore::None => None,
            SyntheticScore::FromAf => row
                .allele_frequency
                .map(|af| score_from_frequency(af, self.config.maf_threshold)),
            SyntheticScore::FromMaf => {
                let selected = &row.genotypes
                    [self.range.start as usize * 2..self.range.end as usize * 2];
                let ac = row.allele_count.unwrap_or_else(|| {
                    selected.iter().filter(|&&g| allele_index(g) == 1).count() as i32
                });
                let an = row.allele_number.unwrap_or(selected.len() as i32);
                if an <= 0 {
                    return Some(f32::NAN);
                }
                Some(score_from_frequency(ac as f32 / an as f32, self.config.maf_threshold))
            }
        }
    }

    /// Consume one site line. Site indices are assigned in push order.
    pub fn push_row(&mut self, row: &VariantRow<'_>) -> Result<()> {
        let needed = self.range.end as usize * 2;
        if row.genotypes.len() < needed {
            return Err(PhaseError::InvalidArgument(format!(
                "site {} has {} genotype values, {} needed",
                self.site_index,
                row.genotypes.len(),
                needed
            )));
        }
        if let Some(scores) = row.phase_scores {
            if scores.len() < self.range.end as usize {
                return Err(PhaseError::InvalidArgument(format!(
                    "site {} has {} PP values, {} needed",
                    self.site_index,
                    scores.len(),
                    self.range.end
                )));
            }
        }

        let site_index = self.site_index;
        let synthetic = self.synthetic_score(row);
        let singleton = self.config.singleton_workaround && row.allele_count == Some(1);
        let threshold = self.config.pp_threshold;
        let start = self.range.start as usize;

        let process = |offset: usize,
                       window: &mut EvidenceWindow<GenotypeRecord, LowScore>,
                       counts: &mut SampleCounts| {
            let sample = start + offset;
            let a0 = row.genotypes[sample * 2];
            let a1 = row.genotypes[sample * 2 + 1];
            let (i0, i1) = (allele_index(a0), allele_index(a1));
            if i0 < 0 || i1 < 0 || i0 == i1 {
                return;
            }
            let mut pp = match (row.phase_scores, synthetic) {
                (Some(scores), _) => scores[sample],
                (None, Some(s)) => s,
                (None, None) => f32::NAN,
            };
            if singleton && !pp.is_nan() && pp >= threshold {
                pp = SINGLETON_SCORE;
            }

            let record = GenotypeRecord::new(site_index, a0, a1, pp);
            counts.het_sites += 1;
            if record.is_low_score(threshold) {
                counts.low_score += 1;
                if row.is_snp {
                    counts.low_score_snp += 1;
                }
            }
            if !row.is_snp {
                counts.non_snp += 1;
            }
            window.push(record);
        };

        if self.windows.len() >= PARALLEL_THRESHOLD {
            self.windows
                .par_iter_mut()
                .zip(self.counts.par_iter_mut())
                .enumerate()
                .for_each(|(i, (w, c))| process(i, w, c));
        } else {
            for (i, (w, c)) in self.windows.iter_mut().zip(self.counts.iter_mut()).enumerate() {
                process(i, w, c);
            }
        }

        self.site_index += 1;
        Ok(())
    }

    /// Finalize every window and return `(original index, records)` blocks.
    pub fn finish(self) -> (Vec<(u32, Vec<GenotypeRecord>)>, ExtractStats) {
        let mut stats = ExtractStats {
            sites: self.site_index,
            samples: self.range.len() as u32,
            ..ExtractStats::default()
        };
        for c in &self.counts {
            stats.het_sites += c.het_sites;
            stats.low_score += c.low_score;
        }
        let blocks: Vec<(u32, Vec<GenotypeRecord>)> = self
            .range
            .clone()
            .zip(self.windows)
            .map(|(sample, window)| (sample, window.into_kept()))
            .collect();
        stats.kept = blocks.iter().map(|(_, r)| r.len() as u64).sum();
        (blocks, stats)
    }

    /// Finalize and write the store to `path`.
    pub fn write_store<P: AsRef<Path>>(self, path: P) -> Result<ExtractStats> {
        let (blocks, stats) = self.finish();
        let mut writer = StoreWriter::create(path.as_ref(), blocks.len() as u32)?;
        for (original_index, records) in &blocks {
            writer.append_block(*original_index, records)?;
        }
        writer.finish()?;
        info!(
            "Wrote {} records for {} samples to {}",
            stats.kept,
            stats.samples,
            path.as_ref().display()
        );
        Ok(stats)
    }
}
