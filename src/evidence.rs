//! Read evidence at heterozygous sites.
//!
//! For each site the collector looks at the pileup column over the site and
//! sorts the names of the reads it trusts into two sets: reads showing the
//! base of the record's first allele and reads showing the base of its
//! second allele. Reads shared by two sites are what links their phases.

use crate::config::PileupFilter;
use crate::error::Result;
use crate::genotype::GenotypeRecord;
use crate::samples::SampleInfo;
use crate::variants::VariantSite;
use rustc_hash::{FxHashMap, FxHashSet};
use std::fmt;
use std::mem;

pub const FLAG_PAIRED: u16 = 0x1;
pub const FLAG_PROPER_PAIR: u16 = 0x2;
pub const FLAG_UNMAPPED: u16 = 0x4;
pub const FLAG_MATE_UNMAPPED: u16 = 0x8;
pub const FLAG_REVERSE: u16 = 0x10;
pub const FLAG_MATE_REVERSE: u16 = 0x20;
pub const FLAG_SECONDARY: u16 = 0x100;
pub const FLAG_QC_FAIL: u16 = 0x200;
pub const FLAG_DUPLICATE: u16 = 0x400;

/// One read as seen in the pileup column of a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PileupEntry {
    pub read_name: String,
    pub flags: u16,
    pub mapping_quality: u8,
    /// Read base at the column (ASCII); meaningless for deletions.
    pub base: u8,
    pub base_quality: u8,
    pub is_del: bool,
    pub is_refskip: bool,
    /// Length of an insertion (> 0) or deletion (< 0) following the base.
    pub indel: i32,
}

impl PileupEntry {
    /// A plain aligned base of a properly paired read.
    pub fn base(read_name: impl Into<String>, base: u8) -> Self {
        Self {
            read_name: read_name.into(),
            flags: FLAG_PAIRED | FLAG_PROPER_PAIR | FLAG_MATE_REVERSE,
            mapping_quality: 60,
            base,
            base_quality: 40,
            is_del: false,
            is_refskip: false,
            indel: 0,
        }
    }

    /// Whether the read itself passes the flag and mapping-quality filter.
    pub fn passes_read_filter(&self, filter: &PileupFilter) -> bool {
        let f = self.flags;
        if f & (FLAG_UNMAPPED | FLAG_SECONDARY | FLAG_QC_FAIL | FLAG_DUPLICATE) != 0 {
            return false;
        }
        if f & FLAG_PAIRED != 0 {
            if f & FLAG_PROPER_PAIR == 0 || f & FLAG_MATE_UNMAPPED != 0 {
                return false;
            }
            if (f & FLAG_REVERSE != 0) == (f & FLAG_MATE_REVERSE != 0) {
                return false;
            }
        }
        self.mapping_quality >= filter.min_mapping_quality
    }

    /// Deletions, reference skips and bases followed by an insertion carry
    /// no usable base.
    #[inline]
    pub fn is_gap(&self) -> bool {
        self.is_del || self.is_refskip || self.indel > 0
    }
}

/// Region access to one sample's alignments.
pub trait AlignmentSource {
    /// Reads covering `position` on `contig`, fetched from a window of
    /// `flank` bases on each side. Unknown contigs yield no reads.
    fn pileup_at(&mut self, contig: &str, position: u64, flank: u64) -> Result<Vec<PileupEntry>>;
}

/// Opens the alignment source of a sample.
///
/// Failing to open or index the alignments is reported as
/// [`PhaseError::AlignmentAccess`](crate::error::PhaseError::AlignmentAccess),
/// which only skips that sample.
pub trait AlignmentOpener: Sync {
    type Source: AlignmentSource;

    fn open(&self, sample: &SampleInfo) -> Result<Self::Source>;
}

/// Alignments held in memory, keyed by contig and 0-based position.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    columns: FxHashMap<(String, u64), Vec<PileupEntry>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, contig: &str, position: u64, entry: PileupEntry) {
        self.columns
            .entry((contig.to_string(), position))
            .or_default()
            .push(entry);
    }

    pub fn with_reads(mut self, contig: &str, position: u64, reads: &[(&str, u8)]) -> Self {
        for &(name, base) in reads {
            self.add(contig, position, PileupEntry::base(name, base));
        }
        self
    }
}

impl AlignmentSource for MemorySource {
    fn pileup_at(&mut self, contig: &str, position: u64, _flank: u64) -> Result<Vec<PileupEntry>> {
        Ok(self
            .columns
            .get(&(contig.to_string(), position))
            .cloned()
            .unwrap_or_default())
    }
}

/// Names of the reads supporting each allele of one site.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadSets {
    pub a0: FxHashSet<String>,
    pub a1: FxHashSet<String>,
}

impl ReadSets {
    pub fn from_names(a0: &[&str], a1: &[&str]) -> Self {
        Self {
            a0: a0.iter().map(|s| s.to_string()).collect(),
            a1: a1.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.a0.is_empty() && self.a1.is_empty()
    }

    /// Exchange the two sets, following an allele swap.
    #[inline]
    pub fn swap(&mut self) {
        mem::swap(&mut self.a0, &mut self.a1);
    }
}

/// Counters of the collector, summed over all sites of a sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectorStats {
    pub columns: u64,
    pub bases_total: u64,
    pub bases_indel: u64,
    pub bases_lowqual: u64,
    pub bases_mismatch: u64,
    pub reads_filtered: u64,
    pub conflicting_reads: u64,
}

impl CollectorStats {
    pub fn merge(&mut self, other: &CollectorStats) {
        self.columns += other.columns;
        self.bases_total += other.bases_total;
        self.bases_indel += other.bases_indel;
        self.bases_lowqual += other.bases_lowqual;
        self.bases_mismatch += other.bases_mismatch;
        self.reads_filtered += other.reads_filtered;
        self.conflicting_reads += other.conflicting_reads;
    }
}

impl fmt::Display for CollectorStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "columns={} bases={} indel={} lowqual={} mismatch={} filtered_reads={} conflicting_reads={}",
            self.columns,
            self.bases_total,
            self.bases_indel,
            self.bases_lowqual,
            self.bases_mismatch,
            self.reads_filtered,
            self.conflicting_reads
        )
    }
}

/// Builds [`ReadSets`] from pileup columns.
#[derive(Debug, Clone, Default)]
pub struct ReadEvidenceCollector {
    filter: PileupFilter,
    stats: CollectorStats,
}

impl ReadEvidenceCollector {
    pub fn new(filter: PileupFilter) -> Self {
        Self {
            filter,
            stats: CollectorStats::default(),
        }
    }

    #[inline]
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    pub fn filter(&self) -> &PileupFilter {
        &self.filter
    }

    /// Fetch the column of `site` and classify its reads.
    pub fn collect<S: AlignmentSource + ?Sized>(
        &mut self,
        site: &VariantSite,
        contig: &str,
        record: &GenotypeRecord,
        source: &mut S,
    ) -> Result<ReadSets> {
        let entries = source.pileup_at(contig, site.position, self.filter.flank)?;
        Ok(self.classify(site, record, &entries))
    }

    /// Classify already fetched pileup entries of `site`.
    pub fn classify(
        &mut self,
        site: &VariantSite,
        record: &GenotypeRecord,
        entries: &[PileupEntry],
    ) -> ReadSets {
        let a0_base = site.allele_base(record.allele0_index()).to_ascii_uppercase();
        let a1_base = site.allele_base(record.allele1_index()).to_ascii_uppercase();
        let mut sets = ReadSets::default();
        self.stats.columns += 1;

        for entry in entries {
            if !self.filter.no_filter && !entry.passes_read_filter(&self.filter) {
                self.stats.reads_filtered += 1;
                continue;
            }
            self.stats.bases_total += 1;
            if entry.is_gap() {
                self.stats.bases_indel += 1;
                continue;
            }
            if !self.filter.no_filter && entry.base_quality < self.filter.min_base_quality {
                self.stats.bases_lowqual += 1;
                continue;
            }
            let base = entry.base.to_ascii_uppercase();
            if base == a0_base {
                sets.a0.insert(entry.read_name.clone());
            } else if base == a1_base {
                sets.a1.insert(entry.read_name.clone());
            } else {
                self.stats.bases_mismatch += 1;
            }
        }

        // Both mates of a pair can cover the site with different bases
        let conflicting: Vec<String> = sets.a0.intersection(&sets.a1).cloned().collect();
        for name in &conflicting {
            sets.a0.remove(name);
            sets.a1.remove(name);
        }
        self.stats.conflicting_reads += conflicting.len() as u64;
        sets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotype::{encode_phased, encode_unphased};

    fn snp() -> VariantSite {
        VariantSite {
            contig: 0,
            position: 1000,
            ref_base: b'A',
            alt_bases: [b'G', b'N', b'N', b'N'],
            is_snp: true,
        }
    }

    fn het01() -> GenotypeRecord {
        GenotypeRecord::new(0, encode_unphased(0), encode_phased(1), 0.5)
    }

    #[test]
    fn test_second_alternate_allele_uses_its_own_base() {
        let mut cat = crate::variants::VariantCatalog::new();
        cat.push("1", 1000, &[b"A", b"G", b"T"]);
        let site = *cat.get(0).unwrap();
        // 1|2 call
        let record = GenotypeRecord::new(0, encode_unphased(1), encode_phased(2), 0.2);
        let entries = [
            PileupEntry::base("g", b'G'),
            PileupEntry::base("t", b'T'),
            PileupEntry::base("a", b'A'),
        ];
        let mut collector = ReadEvidenceCollector::new(PileupFilter::default());
        let sets = collector.classify(&site, &record, &entries);
        assert_eq!(sets, ReadSets::from_names(&["g"], &["t"]));
        assert_eq!(collector.stats().bases_mismatch, 1);
    }

    #[test]
    fn test_classify_by_allele_base() {
        let mut c = ReadEvidenceCollector::default();
        let entries = vec![
            PileupEntry::base("r1", b'A'),
            PileupEntry::base("r2", b'g'),
            PileupEntry::base("r3", b'T'),
        ];
        let sets = c.classify(&snp(), &het01(), &entries);
        assert_eq!(sets, ReadSets::from_names(&["r1"], &["r2"]));
        assert_eq!(c.stats().bases_mismatch, 1);
    }

    #[test]
    fn test_switched_record_swaps_sets() {
        let mut c = ReadEvidenceCollector::new(PileupFilter::default());
        let entries = vec![PileupEntry::base("r1", b'A')];
        let sets = c.classify(&snp(), &het01().switched(), &entries);
        assert_eq!(sets, ReadSets::from_names(&[], &["r1"]));
    }

    #[test]
    fn test_read_filters() {
        let filter = PileupFilter::default();
        let ok = PileupEntry::base("r", b'A');
        assert!(ok.passes_read_filter(&filter));

        for flag in [FLAG_UNMAPPED, FLAG_SECONDARY, FLAG_QC_FAIL, FLAG_DUPLICATE, FLAG_MATE_UNMAPPED] {
            let e = PileupEntry {
                flags: ok.flags | flag,
                ..ok.clone()
            };
            assert!(!e.passes_read_filter(&filter), "flag 0x{:x}", flag);
        }

        let improper = PileupEntry {
            flags: FLAG_PAIRED | FLAG_MATE_REVERSE,
            ..ok.clone()
        };
        assert!(!improper.passes_read_filter(&filter));

        let same_strand = PileupEntry {
            flags: ok.flags | FLAG_REVERSE,
            ..ok.clone()
        };
        assert!(!same_strand.passes_read_filter(&filter));

        let unpaired = PileupEntry {
            flags: 0,
            ..ok.clone()
        };
        assert!(unpaired.passes_read_filter(&filter));

        let low_mapq = PileupEntry {
            mapping_quality: 49,
            ..ok
        };
        assert!(!low_mapq.passes_read_filter(&filter));
    }

    #[test]
    fn test_gaps_and_low_quality_skipped() {
        let mut c = ReadEvidenceCollector::default();
        let good = PileupEntry::base("ok", b'A');
        let entries = vec![
            PileupEntry {
                read_name: "del".into(),
                is_del: true,
                ..good.clone()
            },
            PileupEntry {
                read_name: "ins".into(),
                indel: 2,
                ..good.clone()
            },
            PileupEntry {
                read_name: "lowq".into(),
                base_quality: 10,
                ..good.clone()
            },
            good,
        ];
        let sets = c.classify(&snp(), &het01(), &entries);
        assert_eq!(sets, ReadSets::from_names(&["ok"], &[]));
        assert_eq!(c.stats().bases_indel, 2);
        assert_eq!(c.stats().bases_lowqual, 1);
    }

    #[test]
    fn test_no_filter_keeps_geometric_skip_only() {
        let mut c = ReadEvidenceCollector::new(PileupFilter::default().with_no_filter(true));
        let good = PileupEntry::base("dup", b'G');
        let entries = vec![
            PileupEntry {
                flags: FLAG_DUPLICATE,
                base_quality: 2,
                mapping_quality: 0,
                ..good.clone()
            },
            PileupEntry {
                read_name: "skip".into(),
                is_refskip: true,
                ..good
            },
        ];
        let sets = c.classify(&snp(), &het01(), &entries);
        assert_eq!(sets, ReadSets::from_names(&[], &["dup"]));
        assert_eq!(c.stats().bases_indel, 1);
    }

    #[test]
    fn test_conflicting_reads_removed() {
        let mut c = ReadEvidenceCollector::default();
        let entries = vec![
            PileupEntry::base("pair", b'A'),
            PileupEntry::base("pair", b'G'),
            PileupEntry::base("r2", b'G'),
        ];
        let sets = c.classify(&snp(), &het01(), &entries);
        assert_eq!(sets, ReadSets::from_names(&[], &["r2"]));
        assert_eq!(c.stats().conflicting_reads, 1);
    }

    #[test]
    fn test_memory_source_lookup() {
        let mut src = MemorySource::new().with_reads("1", 1000, &[("r1", b'A'), ("r2", b'G')]);
        let mut c = ReadEvidenceCollector::default();
        let sets = c.collect(&snp(), "1", &het01(), &mut src).unwrap();
        assert_eq!(sets, ReadSets::from_names(&["r1"], &["r2"]));
        assert!(src.pileup_at("2", 1000, 300).unwrap().is_empty());
    }
}
