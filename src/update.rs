//! Writing rephased calls back into the call set.
//!
//! An [`UpdatePlan`] indexes every record of a rephased store that carries
//! read evidence (`pp > 1.0`) by site index. The call-set reader then asks
//! the plan to patch the `GT` and `PP` arrays of each site line in turn.

use crate::error::{PhaseError, Result};
use crate::genotype::GenotypeRecord;
use crate::store::PhaseStore;
use rustc_hash::FxHashMap;
use std::fmt;

/// Bit pattern htslib uses for a missing float value.
pub const MISSING_FLOAT_BITS: u32 = 0x7F80_0001;

/// Counters of an update run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub lines: u64,
    pub lines_updated: u64,
    pub values_updated: u64,
    pub switched: u64,
}

impl fmt::Display for UpdateStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lines:          {}", self.lines)?;
        writeln!(f, "Lines updated:  {}", self.lines_updated)?;
        writeln!(f, "Calls updated:  {}", self.values_updated)?;
        write!(f, "Calls switched: {}", self.switched)
    }
}

/// Rephased records of a store, grouped by site.
#[derive(Debug, Clone, Default)]
pub struct UpdatePlan {
    by_site: FxHashMap<u32, Vec<(u32, GenotypeRecord)>>,
    records: usize,
}

impl UpdatePlan {
    /// Collect the rephased records of every block. Each block's original
    /// index is the call-set column its records belong to.
    pub fn from_store(store: &PhaseStore) -> Result<Self> {
        let mut plan = UpdatePlan::default();
        for n in 0..store.sample_count() {
            let block = store.records_for(n)?;
            let column = block.original_index();
            for record in block.iter().filter(GenotypeRecord::is_rephased) {
                plan.insert(column, record);
            }
        }
        Ok(plan)
    }

    pub fn insert(&mut self, column: u32, record: GenotypeRecord) {
        self.by_site
            .entry(record.site_index)
            .or_default()
            .push((column, record));
        self.records += 1;
    }

    /// Number of records to apply.
    #[inline]
    pub fn len(&self) -> usize {
        self.records
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    /// Whether any record targets `site_index`.
    #[inline]
    pub fn touches(&self, site_index: u32) -> bool {
        self.by_site.contains_key(&site_index)
    }

    /// Patch one site line.
    ///
    /// `genotypes` holds two encoded alleles per sample and `scores` one
    /// `PP` value per sample. Returns the number of calls rewritten.
    pub fn apply(
        &self,
        site_index: u32,
        genotypes: &mut [i32],
        scores: &mut [f32],
        stats: &mut UpdateStats,
    ) -> Result<usize> {
        let Some(updates) = self.by_site.get(&site_index) else {
            return Ok(0);
        };
        for &(column, record) in updates {
            let c = column as usize;
            if c >= scores.len() || 2 * c + 1 >= genotypes.len() {
                return Err(PhaseError::InvalidArgument(format!(
                    "site {} has no sample column {}",
                    site_index, column
                )));
            }
            if genotypes[2 * c] != record.allele0 || genotypes[2 * c + 1] != record.allele1 {
                stats.switched += 1;
            }
            genotypes[2 * c] = record.allele0;
            genotypes[2 * c + 1] = record.allele1;
            scores[c] = record.phase_score;
        }
        stats.lines_updated += 1;
        stats.values_updated += updates.len() as u64;
        Ok(updates.len())
    }
}
