//! Per-site variant information looked up by sequential site index.
//!
//! The catalog is filled once from the call set's site lines (the first
//! line is site 0) and shared read-only by every rephasing job.

use rustc_hash::FxHashMap;

/// Alternate alleles tracked per site; later ones read as `N`.
pub const MAX_ALT_BASES: usize = 4;

/// Position and allele bases of one site of the call set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantSite {
    /// Interned contig id, see [`VariantCatalog::contig_name`].
    pub contig: u32,
    /// 0-based position.
    pub position: u64,
    /// First base of the reference allele.
    pub ref_base: u8,
    /// First base of each alternate allele, `N` past the last one.
    pub alt_bases: [u8; MAX_ALT_BASES],
    /// Single-nucleotide variant (every allele one base long).
    pub is_snp: bool,
}

impl VariantSite {
    /// Base expected on a read carrying allele `index` (0 = reference).
    #[inline]
    pub fn allele_base(&self, index: i32) -> u8 {
        match index {
            0 => self.ref_base,
            i if i > 0 => self
                .alt_bases
                .get(i as usize - 1)
                .copied()
                .unwrap_or(b'N'),
            _ => b'N',
        }
    }

    /// Distance in bp to `other`, `None` if on a different contig.
    #[inline]
    pub fn distance_to(&self, other: &VariantSite) -> Option<u64> {
        if self.contig != other.contig {
            return None;
        }
        Some(self.position.abs_diff(other.position))
    }
}

/// Site information for a whole call set.
#[derive(Debug, Clone, Default)]
pub struct VariantCatalog {
    contigs: Vec<String>,
    contig_ids: FxHashMap<String, u32>,
    sites: Vec<VariantSite>,
}

impl VariantCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, contig: &str) -> u32 {
        if let Some(&id) = self.contig_ids.get(contig) {
            return id;
        }
        let id = self.contigs.len() as u32;
        self.contigs.push(contig.to_string());
        self.contig_ids.insert(contig.to_string(), id);
        id
    }

    /// Append the next site; returns its site index.
    ///
    /// `alleles` are the reference allele followed by the alternates.
    pub fn push<A: AsRef<[u8]>>(&mut self, contig: &str, position: u64, alleles: &[A]) -> u32 {
        let contig = self.intern(contig);
        let first = |i: usize| {
            alleles
                .get(i)
                .and_then(|a| a.as_ref().first())
                .copied()
                .unwrap_or(b'N')
        };
        let site = VariantSite {
            contig,
            position,
            ref_base: first(0),
            alt_bases: std::array::from_fn(|i| first(i + 1)),
            is_snp: alleles.len() >= 2 && alleles.iter().all(|a| a.as_ref().len() == 1),
        };
        self.sites.push(site);
        (self.sites.len() - 1) as u32
    }

    #[inline]
    pub fn get(&self, site_index: u32) -> Option<&VariantSite> {
        self.sites.get(site_index as usize)
    }

    #[inline]
    pub fn contig_name(&self, id: u32) -> &str {
        self.contigs.get(id as usize).map_or("?", String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    pub fn contig_count(&self) -> usize {
        self.contigs.len()
    }

    /// `contig:position` (1-based) of a site, for logs.
    pub fn locus(&self, site_index: u32) -> String {
        match self.get(site_index) {
            Some(site) => format!("{}:{}", self.contig_name(site.contig), site.position + 1),
            None => format!("site#{}", site_index),
        }
    }
}
