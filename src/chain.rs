//! Per-sample chain of heterozygous SNPs in genomic order.
//!
//! The chain is an index arena: sites live in one vector and link to their
//! neighbours by position in that vector. It is built from a store block,
//! used for one rephasing pass and dropped.

use crate::evidence::ReadSets;
use crate::genotype::GenotypeRecord;
use crate::variants::{VariantCatalog, VariantSite};

/// One heterozygous SNP of the sample.
#[derive(Debug, Clone)]
pub struct ChainSite {
    /// Position of the record in its store block.
    pub record_index: usize,
    pub record: GenotypeRecord,
    pub site: VariantSite,
    pub reads: ReadSets,
    prev: Option<usize>,
    next: Option<usize>,
}

impl ChainSite {
    #[inline]
    pub fn prev(&self) -> Option<usize> {
        self.prev
    }

    #[inline]
    pub fn next(&self) -> Option<usize> {
        self.next
    }
}

/// Walking direction along the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Back,
    Forward,
}

/// Counts of records left out while building a chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChainStats {
    pub records: usize,
    pub non_snp: usize,
    pub unknown_sites: usize,
    pub isolated: usize,
}

#[derive(Debug)]
pub struct HetSiteChain<'c> {
    catalog: &'c VariantCatalog,
    sites: Vec<ChainSite>,
    stats: ChainStats,
}

impl<'c> HetSiteChain<'c> {
    /// Build the chain of a sample from its stored records.
    ///
    /// Only SNPs enter the chain. A SNP whose nearest SNP neighbour on the
    /// same contig is farther than `chain_distance` is left out, since no
    /// read can link it to anything.
    pub fn build(
        catalog: &'c VariantCatalog,
        records: &[GenotypeRecord],
        chain_distance: u64,
    ) -> Self {
        let mut stats = ChainStats {
            records: records.len(),
            ..ChainStats::default()
        };

        let mut snps: Vec<(usize, GenotypeRecord, VariantSite)> = Vec::with_capacity(records.len());
        for (i, record) in records.iter().enumerate() {
            match catalog.get(record.site_index) {
                None => stats.unknown_sites += 1,
                Some(site) if !site.is_snp => stats.non_snp += 1,
                Some(site) => snps.push((i, *record, *site)),
            }
        }

        let gap = |a: usize, b: usize| snps[a].2.distance_to(&snps[b].2).unwrap_or(u64::MAX);
        let mut sites: Vec<ChainSite> = Vec::with_capacity(snps.len());
        for i in 0..snps.len() {
            let back = if i > 0 { gap(i - 1, i) } else { u64::MAX };
            let forward = if i + 1 < snps.len() { gap(i, i + 1) } else { u64::MAX };
            if back.min(forward) > chain_distance {
                stats.isolated += 1;
                continue;
            }
            let (record_index, record, site) = snps[i];
            let idx = sites.len();
            let prev = sites
                .last()
                .filter(|p| p.site.contig == site.contig)
                .map(|_| idx - 1);
            if let Some(p) = prev {
                sites[p].next = Some(idx);
            }
            sites.push(ChainSite {
                record_index,
                record,
                site,
                reads: ReadSets::default(),
                prev,
                next: None,
            });
        }

        Self {
            catalog,
            sites,
            stats,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    #[inline]
    pub fn stats(&self) -> &ChainStats {
        &self.stats
    }

    #[inline]
    pub fn catalog(&self) -> &'c VariantCatalog {
        self.catalog
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<&ChainSite> {
        self.sites.get(i)
    }

    #[inline]
    pub fn get_mut(&mut self, i: usize) -> Option<&mut ChainSite> {
        self.sites.get_mut(i)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChainSite> {
        self.sites.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ChainSite> {
        self.sites.iter_mut()
    }

    /// Contig name of chain site `i`.
    pub fn contig_name(&self, i: usize) -> &'c str {
        match self.sites.get(i) {
            Some(s) => self.catalog.contig_name(s.site.contig),
            None => "?",
        }
    }

    /// `contig:position` of chain site `i`, for logs.
    pub fn locus(&self, i: usize) -> String {
        match self.sites.get(i) {
            Some(s) => self.catalog.locus(s.record.site_index),
            None => format!("chain#{}", i),
        }
    }

    /// Neighbours of site `i` in one direction, nearest first.
    ///
    /// Stops after `max_steps` links or at the first neighbour farther than
    /// `max_distance` from site `i`.
    pub fn walk(
        &self,
        i: usize,
        direction: Direction,
        max_steps: usize,
        max_distance: u64,
    ) -> Vec<usize> {
        let mut out = Vec::new();
        let Some(origin) = self.sites.get(i) else {
            return out;
        };
        let step = |s: &ChainSite| match direction {
            Direction::Back => s.prev,
            Direction::Forward => s.next,
        };
        let mut cur = step(origin);
        while let Some(j) = cur {
            if out.len() >= max_steps {
                break;
            }
            let other = &self.sites[j];
            match origin.site.distance_to(&other.site) {
                Some(d) if d <= max_distance => out.push(j),
                _ => break,
            }
            cur = step(other);
        }
        out
    }

    /// Records of the chain, with their positions in the store block.
    pub fn records(&self) -> impl Iterator<Item = (usize, GenotypeRecord)> + '_ {
        self.sites.iter().map(|s| (s.record_index, s.record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog(sites: &[(&str, u64, bool)]) -> VariantCatalog {
        let mut cat = VariantCatalog::new();
        for &(contig, pos, snp) in sites {
            if snp {
                cat.push(contig, pos, &[&b"A"[..], &b"G"[..]]);
            } else {
                cat.push(contig, pos, &[&b"AT"[..], &b"A"[..]]);
            }
        }
        cat
    }

    fn records(n: u32) -> Vec<GenotypeRecord> {
        (0..n).map(|i| GenotypeRecord::new(i, 2, 5, 0.5)).collect()
    }

    #[test]
    fn test_non_snp_and_isolated_sites_left_out() {
        let cat = catalog(&[
            ("1", 100, true),
            ("1", 150, false),
            ("1", 400, true),
            ("1", 5000, true),
            ("2", 10, true),
            ("2", 900, true),
        ]);
        let chain = HetSiteChain::build(&cat, &records(6), 1000);

        let kept: Vec<u32> = chain.iter().map(|s| s.record.site_index).collect();
        assert_eq!(kept, vec![0, 2, 4, 5]);
        assert_eq!(chain.stats().non_snp, 1);
        assert_eq!(chain.stats().isolated, 1);
        assert_eq!(chain.get(1).unwrap().record_index, 2);
    }

    #[test]
    fn test_links_do_not_cross_contigs() {
        let cat = catalog(&[("1", 100, true), ("1", 200, true), ("2", 150, true), ("2", 160, true)]);
        let chain = HetSiteChain::build(&cat, &records(4), 1000);

        assert_eq!(chain.get(1).unwrap().next(), None);
        assert_eq!(chain.get(2).unwrap().prev(), None);
        assert_eq!(chain.walk(1, Direction::Forward, 100, 1000), Vec::<usize>::new());
        assert_eq!(chain.walk(1, Direction::Back, 100, 1000), vec![0]);
        assert_eq!(chain.contig_name(3), "2");
    }

    #[test]
    fn test_walk_limits() {
        let cat = catalog(&[
            ("1", 100, true),
            ("1", 300, true),
            ("1", 600, true),
            ("1", 1000, true),
            ("1", 1200, true),
        ]);
        let chain = HetSiteChain::build(&cat, &records(5), 1000);

        assert_eq!(chain.walk(0, Direction::Forward, 100, 1000), vec![1, 2, 3]);
        assert_eq!(chain.walk(0, Direction::Forward, 2, 1000), vec![1, 2]);
        assert_eq!(chain.walk(4, Direction::Back, 100, 600), vec![3, 2]);
        assert!(chain.walk(0, Direction::Back, 100, 1000).is_empty());
        assert!(chain.walk(9, Direction::Back, 100, 1000).is_empty());
    }

    #[test]
    fn test_unknown_site_counted() {
        let cat = catalog(&[("1", 100, true), ("1", 200, true)]);
        let mut recs = records(2);
        recs.push(GenotypeRecord::new(99, 2, 5, 0.5));
        let chain = HetSiteChain::build(&cat, &recs, 1000);
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.stats().unknown_sites, 1);
    }
}
