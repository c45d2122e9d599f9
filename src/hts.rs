//! htslib-backed readers for alignments and call sets.
//!
//! Alignments are read through indexed BAM/CRAM readers, one per sample.
//! Call sets (VCF/BCF) are streamed once per stage: to build the
//! [`VariantCatalog`], to feed the [`Extractor`], and to write rephased
//! calls back.

use crate::config::CramLocator;
use crate::error::{PhaseError, Result};
use crate::evidence::{AlignmentOpener, AlignmentSource, PileupEntry};
use crate::extract::{Extractor, VariantRow};
use crate::samples::{SampleInfo, SampleList};
use crate::update::{UpdatePlan, UpdateStats, MISSING_FLOAT_BITS};
use crate::variants::VariantCatalog;
use log::{debug, info, warn};
use rust_htslib::bam::pileup::Indel;
use rust_htslib::bam::{self, Read as BamRead};
use rust_htslib::bcf::{self, Read as BcfRead};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Alignments
// ---------------------------------------------------------------------------

/// Opens indexed BAM/CRAM files located through a [`CramLocator`].
#[derive(Debug, Clone, Default)]
pub struct HtsOpener {
    locator: CramLocator,
}

impl HtsOpener {
    pub fn new(locator: CramLocator) -> Self {
        Self { locator }
    }

    pub fn locator(&self) -> &CramLocator {
        &self.locator
    }
}

impl AlignmentOpener for HtsOpener {
    type Source = HtsAlignmentSource;

    fn open(&self, sample: &SampleInfo) -> Result<HtsAlignmentSource> {
        let path = self
            .locator
            .locate(&sample.name, sample.alignment.as_deref())
            .ok_or_else(|| PhaseError::AlignmentAccess {
                path: PathBuf::from(&sample.name),
                message: "no alignment file given and no alignment directory configured".into(),
            })?;
        HtsAlignmentSource::open(&path, self.locator.reference.as_deref())
    }
}

/// Pileup access to one indexed alignment file.
pub struct HtsAlignmentSource {
    path: PathBuf,
    reader: bam::IndexedReader,
    tids: FxHashMap<String, Option<u32>>,
    chr_prefix: bool,
}

impl HtsAlignmentSource {
    pub fn open(path: &Path, reference: Option<&Path>) -> Result<Self> {
        let access = |e: rust_htslib::errors::Error| PhaseError::AlignmentAccess {
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        let mut reader = bam::IndexedReader::from_path(path).map_err(access)?;
        if let Some(fasta) = reference {
            reader.set_reference(fasta).map_err(access)?;
        }
        debug!("Opened alignments {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            tids: FxHashMap::default(),
            chr_prefix: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Target id of `contig`, retrying with a `chr` prefix once.
    ///
    /// Once the prefixed name matches, every later contig is looked up with
    /// the prefix first.
    fn tid(&mut self, contig: &str) -> Option<u32> {
        if let Some(&tid) = self.tids.get(contig) {
            return tid;
        }
        let header = self.reader.header();
        let prefixed = format!("chr{}", contig);
        let (first, second) = if self.chr_prefix {
            (prefixed.as_str(), contig)
        } else {
            (contig, prefixed.as_str())
        };
        let tid = match header.tid(first.as_bytes()) {
            Some(tid) => Some(tid),
            None => {
                let tid = header.tid(second.as_bytes());
                if tid.is_some() && second == prefixed {
                    debug!("{}: using chr-prefixed contig names", self.path.display());
                    self.chr_prefix = true;
                }
                tid
            }
        };
        if tid.is_none() {
            warn!(
                "Contig {} not found in {}, its sites get no reads",
                contig,
                self.path.display()
            );
        }
        self.tids.insert(contig.to_string(), tid);
        tid
    }
}

impl AlignmentSource for HtsAlignmentSource {
    fn pileup_at(&mut self, contig: &str, position: u64, flank: u64) -> Result<Vec<PileupEntry>> {
        let Some(tid) = self.tid(contig) else {
            return Ok(Vec::new());
        };
        let begin = position.saturating_sub(flank) as i64;
        let end = (position + flank + 1) as i64;
        self.reader
            .fetch((tid as i32, begin, end))
            .map_err(|e| PhaseError::AlignmentAccess {
                path: self.path.clone(),
                message: format!("fetch {}:{}: {}", contig, position + 1, e),
            })?;

        // htslib drops UNMAP, SECONDARY, QCFAIL and DUP reads here
        let mut entries = Vec::new();
        for pileup in self.reader.pileup() {
            let pileup = pileup?;
            let pos = pileup.pos() as u64;
            if pos < position {
                continue;
            }
            if pos > position {
                break;
            }
            for alignment in pileup.alignments() {
                let record = alignment.record();
                let (base, base_quality) = match alignment.qpos() {
                    Some(q) => (record.seq()[q], record.qual()[q]),
                    None => (b'N', 0),
                };
                let indel = match alignment.indel() {
                    Indel::Ins(len) => len as i32,
                    Indel::Del(len) => -(len as i32),
                    Indel::None => 0,
                };
                entries.push(PileupEntry {
                    read_name: String::from_utf8_lossy(record.qname()).into_owned(),
                    flags: record.flags(),
                    mapping_quality: record.mapq(),
                    base,
                    base_quality,
                    is_del: alignment.is_del(),
                    is_refskip: alignment.is_refskip(),
                    indel,
                });
            }
            break;
        }
        Ok(entries)
    }
}

// ---------------------------------------------------------------------------
// Call sets
// ---------------------------------------------------------------------------

fn open_call_set(path: &Path) -> Result<bcf::Reader> {
    bcf::Reader::from_path(path).map_err(PhaseError::from)
}

/// Number of samples in a call set header.
pub fn call_set_sample_count(path: &Path) -> Result<u32> {
    Ok(open_call_set(path)?.header().sample_count())
}

/// Samples of a call set header, indexed by column.
pub fn call_set_samples(path: &Path) -> Result<SampleList> {
    let reader = open_call_set(path)?;
    let samples = reader
        .header()
        .samples()
        .iter()
        .enumerate()
        .map(|(i, name)| SampleInfo::new(i as u32, String::from_utf8_lossy(name)))
        .collect();
    Ok(SampleList::from_samples(samples))
}

/// Load contig, position and alleles of every site line.
pub fn load_catalog(path: &Path) -> Result<VariantCatalog> {
    let mut reader = open_call_set(path)?;
    let header = reader.header().clone();
    let mut catalog = VariantCatalog::new();
    let mut record = reader.empty_record();
    let mut contig = String::new();
    let mut contig_rid = None;
    while let Some(next) = reader.read(&mut record) {
        next?;
        let rid = record.rid();
        if rid != contig_rid {
            contig = match rid {
                Some(rid) => String::from_utf8_lossy(header.rid2name(rid)?).into_owned(),
                None => String::new(),
            };
            contig_rid = rid;
        }
        catalog.push(&contig, record.pos().max(0) as u64, &record.alleles());
    }
    info!(
        "Loaded {} sites on {} contigs from {}",
        catalog.len(),
        catalog.contig_count(),
        path.display()
    );
    Ok(catalog)
}

/// Encoded `GT` values of a record, two per sample.
fn genotype_values(record: &bcf::Record, samples: usize, out: &mut Vec<i32>) -> Result<()> {
    out.clear();
    let gt = record.format(b"GT").integer()?;
    for call in gt.iter().take(samples) {
        out.push(call.first().copied().unwrap_or(0));
        out.push(call.get(1).copied().unwrap_or(0));
    }
    Ok(())
}

/// First `PP` value per sample, `None` when the line has no `PP`.
fn phase_score_values(record: &bcf::Record, samples: usize, out: &mut Vec<f32>) -> bool {
    out.clear();
    match record.format(b"PP").float() {
        Ok(pp) => {
            out.extend(
                pp.iter()
                    .take(samples)
                    .map(|v| v.first().copied().unwrap_or(f32::NAN)),
            );
            true
        }
        Err(_) => false,
    }
}

fn info_integer(record: &bcf::Record, tag: &[u8]) -> Option<i32> {
    record
        .info(tag)
        .integer()
        .ok()
        .flatten()
        .and_then(|v| v.first().copied())
}

fn info_float(record: &bcf::Record, tag: &[u8]) -> Option<f32> {
    record
        .info(tag)
        .float()
        .ok()
        .flatten()
        .and_then(|v| v.first().copied())
}

/// Stream every site line of a call set into `extractor`.
pub fn feed_extractor(path: &Path, extractor: &mut Extractor) -> Result<()> {
    let mut reader = open_call_set(path)?;
    let samples = reader.header().sample_count() as usize;
    let mut record = reader.empty_record();
    let mut genotypes = Vec::with_capacity(samples * 2);
    let mut scores = Vec::with_capacity(samples);
    while let Some(next) = reader.read(&mut record) {
        next?;
        let alleles = record.alleles();
        let is_snp = alleles.len() >= 2 && alleles.iter().all(|a| a.len() == 1);
        genotype_values(&record, samples, &mut genotypes)?;
        let has_pp = phase_score_values(&record, samples, &mut scores);

        let mut row = VariantRow::new(is_snp, &genotypes).with_counts(
            info_integer(&record, b"AC"),
            info_integer(&record, b"AN"),
        );
        if has_pp {
            row = row.with_phase_scores(&scores);
        }
        if let Some(af) = info_float(&record, b"AF") {
            row = row.with_frequency(af);
        }
        extractor.push_row(&row)?;

        let site = extractor.next_site_index();
        if site % 100_000 == 0 {
            debug!("{} sites read", site);
        }
    }
    Ok(())
}

/// Copy a call set to `output`, rewriting `GT` and `PP` of the calls
/// in `plan`. The output format follows the file extension (`.bcf` gives
/// BCF, anything else VCF; `.gz` compresses).
pub fn write_updated(input: &Path, output: &Path, plan: &UpdatePlan) -> Result<UpdateStats> {
    let mut reader = open_call_set(input)?;
    let samples = reader.header().sample_count() as usize;
    let header = bcf::Header::from_template(reader.header());
    let name = output.to_string_lossy();
    let format = if name.ends_with(".bcf") {
        bcf::Format::Bcf
    } else {
        bcf::Format::Vcf
    };
    let uncompressed = !(name.ends_with(".gz") || name.ends_with(".bcf"));
    let mut writer = bcf::Writer::from_path(output, &header, uncompressed, format)?;

    let mut stats = UpdateStats::default();
    let mut record = reader.empty_record();
    let mut genotypes = Vec::with_capacity(samples * 2);
    let mut scores = Vec::with_capacity(samples);
    let mut site_index = 0u32;
    while let Some(next) = reader.read(&mut record) {
        next?;
        writer.translate(&mut record);
        if plan.touches(site_index) {
            let mut raw = Vec::with_capacity(samples * 2);
            for call in record.format(b"GT").integer()?.iter().take(samples) {
                raw.extend_from_slice(call);
            }
            let ploidy = if samples == 0 { 0 } else { raw.len() / samples };
            genotype_values(&record, samples, &mut genotypes)?;
            if !phase_score_values(&record, samples, &mut scores) {
                scores = vec![f32::from_bits(MISSING_FLOAT_BITS); samples];
            }
            plan.apply(site_index, &mut genotypes, &mut scores, &mut stats)?;

            if ploidy >= 2 {
                for (s, pair) in genotypes.chunks_exact(2).enumerate() {
                    raw[s * ploidy] = pair[0];
                    raw[s * ploidy + 1] = pair[1];
                }
            }
            record.push_format_integer(b"GT", &raw)?;
            record.push_format_float(b"PP", &scores)?;
        }
        writer.write(&record)?;
        stats.lines += 1;
        site_index += 1;
    }
    info!(
        "Updated {} calls on {} of {} lines",
        stats.values_updated, stats.lines_updated, stats.lines
    );
    Ok(stats)
}
