//! Tests for the read-evidence rephasing pass: site verdicts, evidence
//! collection from pileups, and whole-store runs through the scheduler.

use pirphase::chain::HetSiteChain;
use pirphase::commands::RephaseCommand;
use pirphase::config::{PileupFilter, RephaseConfig};
use pirphase::error::{PhaseError, Result};
use pirphase::evidence::{
    AlignmentOpener, MemorySource, PileupEntry, ReadEvidenceCollector, ReadSets, FLAG_DUPLICATE,
};
use pirphase::genotype::{encode_phased, encode_unphased, GenotypeRecord};
use pirphase::rephase::{Rephaser, SiteState};
use pirphase::samples::{SampleInfo, SampleList};
use pirphase::store::{OpenMode, PhaseStore, StoreWriter};
use pirphase::variants::VariantCatalog;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn catalog(positions: &[u64]) -> VariantCatalog {
    let mut cat = VariantCatalog::new();
    for &p in positions {
        cat.push("chr2", p, &[b"A", b"G"]);
    }
    cat
}

/// `0/1` with the phase flag on the second allele, as stored by extraction.
fn het(site: u32, pp: f32) -> GenotypeRecord {
    GenotypeRecord::new(site, encode_unphased(0), encode_phased(1), pp)
}

// =============================================================================
// Site verdicts
// =============================================================================

#[test]
fn test_shared_reads_validate_phase() {
    let cat = catalog(&[1000, 1060]);
    let records = [het(0, 0.4), het(1, 1.5)];
    let mut chain = HetSiteChain::build(&cat, &records, 1000);
    chain.get_mut(0).unwrap().reads = ReadSets::from_names(&["r1", "r2"], &[]);
    chain.get_mut(1).unwrap().reads = ReadSets::from_names(&["r1", "r2"], &[]);

    let mut rephaser = Rephaser::new(RephaseConfig::default());
    let states = rephaser.resolve_all(&mut chain);

    assert_eq!(states[0], SiteState::Validated(2));
    let site = chain.get(0).unwrap();
    assert_eq!(site.record.phase_score, 0.4f32 + 2.0 + 1.0);
    assert_eq!(site.record.allele0, encode_unphased(0));
    assert_eq!(site.record.allele1, encode_phased(1));
    // The neighbour is already confident and is left alone.
    assert_eq!(states[1], SiteState::Unvisited);
    assert_eq!(rephaser.stats().rephase_success, 1);
    assert_eq!(rephaser.stats().rephase_switch, 0);
}

#[test]
fn test_opposite_reads_flip_phase() {
    let cat = catalog(&[1000, 1060]);
    let records = [het(0, 0.4), het(1, 1.5)];
    let mut chain = HetSiteChain::build(&cat, &records, 1000);
    chain.get_mut(0).unwrap().reads = ReadSets::from_names(&["r1", "r2"], &[]);
    chain.get_mut(1).unwrap().reads = ReadSets::from_names(&[], &["r1", "r2"]);

    let mut rephaser = Rephaser::new(RephaseConfig::default());
    let states = rephaser.resolve_all(&mut chain);

    assert_eq!(states[0], SiteState::Flipped(2));
    let site = chain.get(0).unwrap();
    assert_eq!(site.record.allele0, encode_unphased(1));
    assert_eq!(site.record.allele1, encode_phased(0));
    assert_eq!(site.record.phase_score, 0.4f32 + 2.0 + 1.0);
    assert!(site.reads.a0.is_empty());
    assert_eq!(site.reads.a1.len(), 2);
    assert_eq!(rephaser.stats().rephase_switch, 1);
}

#[test]
fn test_no_neighbour_in_reach_leaves_record_unchanged() {
    let cat = catalog(&[1000, 1500]);
    let records = [het(0, 0.4), het(1, 0.4)];
    let mut chain = HetSiteChain::build(&cat, &records, 1000);
    chain.get_mut(0).unwrap().reads = ReadSets::from_names(&["r1"], &[]);
    chain.get_mut(1).unwrap().reads = ReadSets::from_names(&["r1"], &[]);

    let mut rephaser = Rephaser::new(RephaseConfig::default().with_max_distance(100));
    let states = rephaser.resolve_all(&mut chain);

    assert_eq!(states, vec![SiteState::NoEvidence, SiteState::NoEvidence]);
    assert_eq!(chain.get(0).unwrap().record, records[0]);
    assert_eq!(chain.get(1).unwrap().record, records[1]);
}

#[test]
fn test_nan_score_counts_as_confident() {
    let cat = catalog(&[1000, 1060]);
    let records = [het(0, f32::NAN), het(1, 0.2)];
    let mut chain = HetSiteChain::build(&cat, &records, 1000);
    chain.get_mut(0).unwrap().reads = ReadSets::from_names(&["r1"], &[]);
    chain.get_mut(1).unwrap().reads = ReadSets::from_names(&["r1"], &[]);

    let mut rephaser = Rephaser::new(RephaseConfig::default());
    let states = rephaser.resolve_all(&mut chain);
    assert_eq!(states[0], SiteState::Unvisited);
    assert_eq!(states[1], SiteState::Validated(1));
    assert_eq!(chain.get(1).unwrap().record.phase_score, 0.2f32 + 1.0 + 1.0);
}

// =============================================================================
// Evidence collection
// =============================================================================

#[test]
fn test_collector_filters_reads() {
    let cat = catalog(&[500]);
    let site = *cat.get(0).unwrap();
    let record = het(0, 0.3);

    let mut dup = PileupEntry::base("dup", b'A');
    dup.flags |= FLAG_DUPLICATE;
    let mut lowq = PileupEntry::base("lowq", b'G');
    lowq.base_quality = 10;
    let mut ins = PileupEntry::base("ins", b'A');
    ins.indel = 2;
    let mut source = MemorySource::new();
    for entry in [
        PileupEntry::base("ref", b'a'),
        PileupEntry::base("alt", b'G'),
        PileupEntry::base("other", b'T'),
        dup,
        lowq,
        ins,
    ] {
        source.add("chr2", 500, entry);
    }

    let mut collector = ReadEvidenceCollector::new(PileupFilter::default());
    let reads = collector.collect(&site, "chr2", &record, &mut source).unwrap();
    assert_eq!(reads, ReadSets::from_names(&["ref"], &["alt"]));

    let stats = collector.stats();
    assert_eq!(stats.bases_indel, 1);
    assert_eq!(stats.bases_lowqual, 1);
    assert_eq!(stats.bases_mismatch, 1);
    assert_eq!(stats.reads_filtered, 1);
}

#[test]
fn test_read_seen_with_both_alleles_is_dropped() {
    let cat = catalog(&[500]);
    let site = *cat.get(0).unwrap();
    let source = &mut MemorySource::new().with_reads(
        "chr2",
        500,
        &[("r1", b'A'), ("r1", b'G'), ("r2", b'G')],
    );
    let mut collector = ReadEvidenceCollector::new(PileupFilter::default());
    let reads = collector.collect(&site, "chr2", &het(0, 0.3), source).unwrap();
    assert_eq!(reads, ReadSets::from_names(&[], &["r2"]));
}

// =============================================================================
// Whole store
// =============================================================================

struct FixedOpener {
    sources: Vec<(String, MemorySource)>,
}

impl AlignmentOpener for FixedOpener {
    type Source = MemorySource;

    fn open(&self, sample: &SampleInfo) -> Result<MemorySource> {
        self.sources
            .iter()
            .find(|(name, _)| *name == sample.name)
            .map(|(_, s)| s.clone())
            .ok_or_else(|| PhaseError::AlignmentAccess {
                path: PathBuf::from(format!("{}.cram", sample.name)),
                message: "no such file".into(),
            })
    }
}

/// Sites 0 and 1 are linked SNPs, site 2 is an indel and site 3 is
/// isolated. Every record starts at score 0.3.
fn cohort_store(path: &Path) -> (VariantCatalog, Vec<GenotypeRecord>) {
    let mut cat = VariantCatalog::new();
    cat.push("chr2", 1000, &[b"A".as_slice(), b"G".as_slice()]);
    cat.push("chr2", 1040, &[b"C".as_slice(), b"T".as_slice()]);
    cat.push("chr2", 1050, &[b"CA".as_slice(), b"C".as_slice()]);
    cat.push("chr2", 90_000, &[b"A".as_slice(), b"T".as_slice()]);

    let original: Vec<GenotypeRecord> = (0..4).map(|s| het(s, 0.3)).collect();
    let mut writer = StoreWriter::create(path, 4).unwrap();
    for sample in 0..4 {
        writer.append_block(sample, &original).unwrap();
    }
    writer.finish().unwrap();
    (cat, original)
}

/// Alignments for S0..S2 whose reads pair the first site's ALT with the
/// second site's REF. S3 has no alignments.
fn cohort_opener() -> FixedOpener {
    let flipped_reads = MemorySource::new()
        .with_reads("chr2", 1000, &[("r1", b'A'), ("r2", b'G')])
        .with_reads("chr2", 1040, &[("r1", b'T'), ("r2", b'C')]);
    FixedOpener {
        sources: (0..3)
            .map(|i| (format!("S{}", i), flipped_reads.clone()))
            .collect(),
    }
}

#[test]
fn test_rephase_store_end_to_end() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cohort.bin");
    let (cat, original) = cohort_store(&path);
    let samples = SampleList::parse(b"S0\nS1\nS2\nS3\n").unwrap();

    let run = RephaseCommand::new(RephaseConfig::default())
        .with_threads(2)
        .run(&path, &cat, &samples, &cohort_opener())
        .unwrap();
    assert_eq!(run.scheduled, 4);
    assert_eq!(run.rephased, 3);
    assert_eq!(run.skipped, 1);
    assert_eq!(run.totals.non_snp, 3);
    assert_eq!(run.totals.isolated, 3);
    assert_eq!(run.totals.rephase_success, 6);
    assert_eq!(run.totals.rephase_switch, 3);
    assert_eq!(run.records_written, 6);

    let store = PhaseStore::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(store.integrity_check());
    for sample in 0..3 {
        let block = store.records_for(sample).unwrap().to_vec();
        // The first site is flipped to agree with the second.
        assert_eq!(block[0].allele0_index(), 1);
        assert_eq!(block[1].allele0_index(), 0);
        assert!(block[0].is_rephased() && block[1].is_rephased());
        assert_eq!(block[2], original[2]);
        assert_eq!(block[3], original[3]);
    }
    assert_eq!(store.records_for(3).unwrap().to_vec(), original);
    assert_eq!(store.count_rephased().unwrap(), 6);
}

#[test]
fn test_second_pass_leaves_rephased_store_unchanged() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("cohort.bin");
    let (cat, _) = cohort_store(&path);
    let samples = SampleList::parse(b"S0\nS1\nS2\nS3\n").unwrap();
    // A threshold above 1.0 must not reopen records that already carry evidence.
    let command = RephaseCommand::new(RephaseConfig::default().with_pp_threshold(10.0));

    let first = command.run(&path, &cat, &samples, &cohort_opener()).unwrap();
    assert_eq!(first.records_written, 6);
    let after_first = fs::read(&path).unwrap();

    let second = command.run(&path, &cat, &samples, &cohort_opener()).unwrap();
    assert_eq!(second.rephased, 3);
    assert_eq!(second.totals.rephase_tries, 0);
    assert_eq!(second.totals.rephase_success, 0);
    assert_eq!(second.records_written, 0);
    assert_eq!(fs::read(&path).unwrap(), after_first);
}
