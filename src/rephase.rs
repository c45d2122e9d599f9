//! Phase verdicts from phase-informative reads.
//!
//! Every site of a sample's chain first gets its read sets from the pileup.
//! Then, in chain order, each site whose score is below the threshold is
//! compared with its neighbours: a read carrying the site's first allele
//! and a neighbour's first allele (or both second alleles) confirms the
//! stored phase; a read pairing first with second contradicts it. The
//! majority decides. Flips are applied to the chain immediately, so later
//! sites see the corrected orientation of earlier ones.

use crate::chain::{Direction, HetSiteChain};
use crate::config::RephaseConfig;
use crate::error::Result;
use crate::evidence::{AlignmentSource, CollectorStats, ReadEvidenceCollector, ReadSets};
use crate::genotype::{GenotypeRecord, REPHASED_SCORE};
use crate::store::SampleBlockMut;
use crate::variants::VariantCatalog;
use log::debug;
use std::fmt;

/// Read counts linking a site to its neighbours.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Evidence {
    pub correct_phase_reads: u32,
    pub reverse_phase_reads: u32,
}

impl Evidence {
    /// Evidence from the reads shared by `site` and `other`.
    pub fn between(site: &ReadSets, other: &ReadSets) -> Self {
        let mut ev = Evidence::default();
        for read in &site.a0 {
            if other.a0.contains(read) {
                ev.correct_phase_reads += 1;
            }
            if other.a1.contains(read) {
                ev.reverse_phase_reads += 1;
            }
        }
        for read in &site.a1 {
            if other.a0.contains(read) {
                ev.reverse_phase_reads += 1;
            }
            if other.a1.contains(read) {
                ev.correct_phase_reads += 1;
            }
        }
        ev
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.correct_phase_reads == 0 && self.reverse_phase_reads == 0
    }

    /// Reads both confirm and contradict the stored phase.
    #[inline]
    pub fn is_mixed(&self) -> bool {
        self.correct_phase_reads > 0 && self.reverse_phase_reads > 0
    }

    #[inline]
    pub fn add(&mut self, other: Evidence) {
        self.correct_phase_reads += other.correct_phase_reads;
        self.reverse_phase_reads += other.reverse_phase_reads;
    }
}

/// Where a chain site is in the rephasing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SiteState {
    #[default]
    Unvisited,
    EvidenceGathered(Evidence),
    /// Stored phase confirmed by this many reads.
    Validated(u32),
    /// Stored phase contradicted by this many reads and flipped.
    Flipped(u32),
    NoEvidence,
}

impl SiteState {
    /// Whether the record was rewritten.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        matches!(self, SiteState::Validated(_) | SiteState::Flipped(_))
    }
}

/// Outcome counters of rephasing, per sample or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RephaseStats {
    pub num_hets: usize,
    pub rephase_tries: usize,
    pub rephase_success: usize,
    pub rephase_switch: usize,
    pub rephase_mixed: usize,
    pub no_reads: usize,
    pub non_snp: usize,
    pub isolated: usize,
    pub collector: CollectorStats,
}

impl RephaseStats {
    pub fn merge(&mut self, other: &RephaseStats) {
        self.num_hets += other.num_hets;
        self.rephase_tries += other.rephase_tries;
        self.rephase_success += other.rephase_success;
        self.rephase_switch += other.rephase_switch;
        self.rephase_mixed += other.rephase_mixed;
        self.no_reads += other.no_reads;
        self.non_snp += other.non_snp;
        self.isolated += other.isolated;
        self.collector.merge(&other.collector);
    }
}

impl fmt::Display for RephaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Het SNPs in chains:  {}", self.num_hets)?;
        writeln!(f, "Non-SNP hets:        {}", self.non_snp)?;
        writeln!(f, "Isolated SNPs:       {}", self.isolated)?;
        writeln!(f, "Sites without reads: {}", self.no_reads)?;
        writeln!(f, "Rephase tries:       {}", self.rephase_tries)?;
        writeln!(f, "Rephased:            {}", self.rephase_success)?;
        writeln!(f, "  of which switched: {}", self.rephase_switch)?;
        writeln!(f, "  with mixed reads:  {}", self.rephase_mixed)?;
        write!(f, "Pileup: {}", self.collector)
    }
}

/// Rephases the chain of one sample.
#[derive(Debug, Clone)]
pub struct Rephaser {
    config: RephaseConfig,
    collector: ReadEvidenceCollector,
    stats: RephaseStats,
}

impl Rephaser {
    pub fn new(config: RephaseConfig) -> Self {
        Self {
            collector: ReadEvidenceCollector::new(config.filter.clone()),
            config,
            stats: RephaseStats::default(),
        }
    }

    pub fn config(&self) -> &RephaseConfig {
        &self.config
    }

    /// Counters so far, including the pileup counters.
    pub fn stats(&self) -> RephaseStats {
        RephaseStats {
            collector: *self.collector.stats(),
            ..self.stats
        }
    }

    /// Fill the read sets of every chain site from the pileup.
    pub fn collect<S: AlignmentSource + ?Sized>(
        &mut self,
        chain: &mut HetSiteChain<'_>,
        source: &mut S,
    ) -> Result<()> {
        for i in 0..chain.len() {
            let contig = chain.contig_name(i);
            if let Some(cs) = chain.get_mut(i) {
                cs.reads = self.collector.collect(&cs.site, contig, &cs.record, &mut *source)?;
            }
        }
        Ok(())
    }

    /// Sum the evidence between site `i` and its neighbours in both directions.
    pub fn gather(&self, chain: &HetSiteChain<'_>, i: usize) -> Evidence {
        let mut total = Evidence::default();
        let Some(site) = chain.get(i) else {
            return total;
        };
        for direction in [Direction::Back, Direction::Forward] {
            for j in chain.walk(i, direction, self.config.max_steps, self.config.max_distance) {
                let Some(other) = chain.get(j) else {
                    continue;
                };
                if let Some(min) = self.config.min_neighbor_score {
                    if other.record.effective_score() <= min {
                        continue;
                    }
                }
                total.add(Evidence::between(&site.reads, &other.reads));
            }
        }
        total
    }

    /// Decide site `i` from already collected read sets and apply the verdict.
    pub fn resolve(&mut self, chain: &mut HetSiteChain<'_>, i: usize) -> SiteState {
        let Some(record) = chain.get(i).map(|s| s.record) else {
            return SiteState::Unvisited;
        };
        if !record.needs_rephasing(self.config.pp_threshold) {
            return SiteState::Unvisited;
        }
        self.stats.rephase_tries += 1;

        let evidence = self.gather(chain, i);
        let gathered = SiteState::EvidenceGathered(evidence);
        debug!("{} {:?}", chain.locus(i), gathered);
        if evidence.is_empty() {
            return SiteState::NoEvidence;
        }
        if evidence.is_mixed() {
            debug!(
                "{}: {} reads confirm and {} contradict the phase",
                chain.locus(i),
                evidence.correct_phase_reads,
                evidence.reverse_phase_reads
            );
            self.stats.rephase_mixed += 1;
        }
        self.stats.rephase_success += 1;

        let old = record.effective_score();
        let locus = chain.locus(i);
        let Some(cs) = chain.get_mut(i) else {
            return SiteState::Unvisited;
        };
        let state = if evidence.correct_phase_reads > evidence.reverse_phase_reads {
            cs.record.phase_score = old + evidence.correct_phase_reads as f32 + REPHASED_SCORE;
            SiteState::Validated(evidence.correct_phase_reads)
        } else {
            self.stats.rephase_switch += 1;
            cs.record = GenotypeRecord {
                phase_score: old + evidence.reverse_phase_reads as f32 + REPHASED_SCORE,
                ..cs.record.switched()
            };
            cs.reads.swap();
            SiteState::Flipped(evidence.reverse_phase_reads)
        };
        debug!("{} -> {:?} ({})", locus, state, cs.record.describe());
        state
    }

    /// Resolve every site of a chain whose read sets are already filled.
    pub fn resolve_all(&mut self, chain: &mut HetSiteChain<'_>) -> Vec<SiteState> {
        self.stats.num_hets += chain.len();
        self.stats.non_snp += chain.stats().non_snp;
        self.stats.isolated += chain.stats().isolated;
        for i in 0..chain.len() {
            if chain.get(i).is_some_and(|s| s.reads.is_empty()) {
                debug!("No reads mapped to {}", chain.locus(i));
                self.stats.no_reads += 1;
            }
        }
        (0..chain.len()).map(|i| self.resolve(chain, i)).collect()
    }

    /// Collect read evidence for the chain and resolve all its sites.
    pub fn rephase<S: AlignmentSource + ?Sized>(
        &mut self,
        chain: &mut HetSiteChain<'_>,
        source: &mut S,
    ) -> Result<Vec<SiteState>> {
        self.collect(chain, source)?;
        Ok(self.resolve_all(chain))
    }

    /// Rephase one store block in place.
    ///
    /// Returns the number of records rewritten.
    pub fn rephase_block<S: AlignmentSource + ?Sized>(
        &mut self,
        block: &mut SampleBlockMut<'_>,
        catalog: &VariantCatalog,
        source: &mut S,
    ) -> Result<usize> {
        let records = block.to_vec();
        let mut chain = HetSiteChain::build(catalog, &records, self.config.chain_distance);
        let states = self.rephase(&mut chain, source)?;

        let mut written = 0;
        for (cs, state) in chain.iter().zip(&states) {
            if state.is_resolved() && block.set(cs.record_index, cs.record) {
                written += 1;
            }
        }
        Ok(written)
    }
}
