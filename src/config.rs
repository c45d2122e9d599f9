//! Runtime configuration for extraction and rephasing.
//!
//! All thresholds are carried in plain structs handed to constructors, so
//! two runs with different settings can coexist in one process (the test
//! suite relies on this).

use std::path::{Path, PathBuf};

/// Read and base filters applied to every pileup entry.
#[derive(Debug, Clone, PartialEq)]
pub struct PileupFilter {
    /// Minimum Phred base quality at the site.
    pub min_base_quality: u8,
    /// Minimum read mapping quality.
    pub min_mapping_quality: u8,
    /// Half-width of the region fetched around each site.
    pub flank: u64,
    /// Skip flag and quality filters; only the deletion/skip/indel
    /// check is kept.
    ///
    /// The htslib backend cannot undo its pileup's default flag mask:
    /// unmapped, secondary, QC-failed and duplicate reads never reach the
    /// collector there, with or without this switch.
    pub no_filter: bool,
}

impl Default for PileupFilter {
    fn default() -> Self {
        Self {
            min_base_quality: 30,
            min_mapping_quality: 50,
            flank: 300,
            no_filter: false,
        }
    }
}

impl PileupFilter {
    pub fn with_min_base_quality(mut self, q: u8) -> Self {
        self.min_base_quality = q;
        self
    }

    pub fn with_min_mapping_quality(mut self, q: u8) -> Self {
        self.min_mapping_quality = q;
        self
    }

    pub fn with_flank(mut self, flank: u64) -> Self {
        self.flank = flank;
        self
    }

    pub fn with_no_filter(mut self, no_filter: bool) -> Self {
        self.no_filter = no_filter;
        self
    }
}

/// Settings of the read-evidence rephasing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct RephaseConfig {
    /// Records whose effective score is below this are rephased.
    pub pp_threshold: f32,
    /// Stop walking the chain once a neighbour is farther than this (bp).
    pub max_distance: u64,
    /// Maximum number of chain links walked in each direction.
    pub max_steps: usize,
    /// Sites with no SNP neighbour within this distance leave the chain.
    pub chain_distance: u64,
    /// Neighbours vote only when their score is above this. A missing
    /// score counts as 1.0. `None` lets every visited neighbour vote.
    pub min_neighbor_score: Option<f32>,
    pub filter: PileupFilter,
}

impl Default for RephaseConfig {
    fn default() -> Self {
        Self {
            pp_threshold: 1.0,
            max_distance: 1000,
            max_steps: 100,
            chain_distance: 1000,
            min_neighbor_score: None,
            filter: PileupFilter::default(),
        }
    }
}

impl RephaseConfig {
    pub fn with_pp_threshold(mut self, t: f32) -> Self {
        self.pp_threshold = t;
        self
    }

    pub fn with_max_distance(mut self, d: u64) -> Self {
        self.max_distance = d;
        self
    }

    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn with_chain_distance(mut self, d: u64) -> Self {
        self.chain_distance = d;
        self
    }

    pub fn with_min_neighbor_score(mut self, score: Option<f32>) -> Self {
        self.min_neighbor_score = score;
        self
    }

    pub fn with_filter(mut self, filter: PileupFilter) -> Self {
        self.filter = filter;
        self
    }
}

/// Where an extraction run takes a phase score from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyntheticScore {
    /// Use the call set's own `PP` values.
    #[default]
    None,
    /// Derive from minor allele frequency computed from `AC`/`AN`.
    FromMaf,
    /// Derive from the `AF` INFO field.
    FromAf,
}

/// Settings of the extraction pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractConfig {
    /// Sliding window width; always odd.
    pub window_size: usize,
    /// Records with a score below this are retained with their context.
    pub pp_threshold: f32,
    /// First sample (inclusive) of the call set to extract.
    pub sample_start: u32,
    /// Last sample (exclusive); `None` means through the last sample.
    pub sample_end: Option<u32>,
    pub synthetic: SyntheticScore,
    /// Frequencies above this get no synthetic score.
    pub maf_threshold: f32,
    /// Clamp singleton sites scored at or above the threshold to 0.97.
    pub singleton_workaround: bool,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            pp_threshold: 0.99,
            sample_start: 0,
            sample_end: None,
            synthetic: SyntheticScore::None,
            maf_threshold: 0.001,
            singleton_workaround: false,
        }
    }
}

impl ExtractConfig {
    /// Set the window width, rounding even values up to the next odd one.
    pub fn with_window_size(mut self, size: usize) -> Self {
        self.window_size = if size % 2 == 0 { size + 1 } else { size };
        self
    }

    pub fn with_pp_threshold(mut self, t: f32) -> Self {
        self.pp_threshold = t;
        self
    }

    pub fn with_sample_range(mut self, start: u32, end: Option<u32>) -> Self {
        self.sample_start = start;
        self.sample_end = end;
        self
    }

    pub fn with_synthetic(mut self, synthetic: SyntheticScore) -> Self {
        self.synthetic = synthetic;
        self
    }

    pub fn with_maf_threshold(mut self, t: f32) -> Self {
        self.maf_threshold = t;
        self
    }

    pub fn with_singleton_workaround(mut self, enabled: bool) -> Self {
        self.singleton_workaround = enabled;
        self
    }

    /// Clamp the configured range to a call set of `total` samples.
    pub fn sample_range(&self, total: u32) -> std::ops::Range<u32> {
        let end = self.sample_end.map_or(total, |e| e.min(total));
        self.sample_start.min(end)..end
    }
}

/// Resolves the alignment file of a sample.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CramLocator {
    /// Root of the `{dir}/{name[0..2]}/{name}_{project}_0_0.cram` layout.
    pub directory: Option<PathBuf>,
    /// Project tag used in generated file names.
    pub project: String,
    /// Reference FASTA for CRAM decoding.
    pub reference: Option<PathBuf>,
}

impl CramLocator {
    pub fn new<P: Into<PathBuf>>(directory: P, project: impl Into<String>) -> Self {
        Self {
            directory: Some(directory.into()),
            project: project.into(),
            reference: None,
        }
    }

    pub fn with_reference<P: Into<PathBuf>>(mut self, reference: P) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Alignment path for `name`, preferring an explicit per-sample path.
    pub fn locate(&self, name: &str, explicit: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        let dir = self.directory.as_ref()?;
        let prefix: String = name.chars().take(2).collect();
        Some(
            dir.join(prefix)
                .join(format!("{}_{}_0_0.cram", name, self.project)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let f = PileupFilter::default();
        assert_eq!(f.min_base_quality, 30);
        assert_eq!(f.min_mapping_quality, 50);
        assert_eq!(f.flank, 300);
        assert!(!f.no_filter);

        let r = RephaseConfig::default();
        assert_eq!(r.pp_threshold, 1.0);
        assert_eq!(r.max_distance, 1000);
        assert_eq!(r.max_steps, 100);

        let e = ExtractConfig::default();
        assert_eq!(e.window_size, 5);
        assert_eq!(e.pp_threshold, 0.99);
    }

    #[test]
    fn test_window_size_forced_odd() {
        assert_eq!(ExtractConfig::default().with_window_size(4).window_size, 5);
        assert_eq!(ExtractConfig::default().with_window_size(7).window_size, 7);
    }

    #[test]
    fn test_sample_range_clamped() {
        let cfg = ExtractConfig::default().with_sample_range(10, Some(500));
        assert_eq!(cfg.sample_range(100), 10..100);
        assert_eq!(cfg.sample_range(5), 5..5);
        assert_eq!(ExtractConfig::default().sample_range(8), 0..8);
    }

    #[test]
    fn test_cram_locator() {
        let loc = CramLocator::new("/data/crams", "23193");
        assert_eq!(
            loc.locate("1234567", None),
            Some(PathBuf::from("/data/crams/12/1234567_23193_0_0.cram"))
        );
        assert_eq!(
            loc.locate("1234567", Some(Path::new("/x/s.cram"))),
            Some(PathBuf::from("/x/s.cram"))
        );
        assert_eq!(CramLocator::default().locate("abc", None), None);
    }
}
