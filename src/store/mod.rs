//! Memory-mapped phase store.
//!
//! A phase store holds, per sample, the heterozygous calls worth
//! re-examining with sequencing reads. Layout (little-endian):
//!
//! ```text
//! u32  format sentinel   0xAABBCCDD
//! u32  sample count      N
//! u64  offset table[N]   byte offset of each sample block
//! N sample blocks:
//!   u32  block sentinel  0xD00DC0DE
//!   u32  original sample index
//!   u32  record count    M
//!   M x 16-byte records  (site index, allele0, allele1, phase score)
//! ```
//!
//! Blocks are written once by the extraction stage. The rephasing stage
//! opens the file read-write and rewrites allele and score fields in place;
//! record counts and marks never change after creation.

mod block;
mod ops;
mod writer;

pub use block::{SampleBlock, SampleBlockMut};
pub use ops::{merge, merge_paths, Merger};
pub use writer::StoreWriter;

use crate::error::{PhaseError, Result};
use crate::genotype::{GenotypeRecord, RECORD_SIZE};
use log::warn;
use memmap2::{Mmap, MmapMut};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// First word of every phase store.
pub const FORMAT_SENTINEL: u32 = 0xAABB_CCDD;

/// First word of every sample block.
pub const BLOCK_SENTINEL: u32 = 0xD00D_C0DE;

/// Offset table filler written before the real offsets are known.
pub const PLACEHOLDER_OFFSET: u64 = 0xDEAD_C0DE_DEAD_C0DE;

/// Bytes taken by the format sentinel and the sample count.
pub const HEADER_SIZE: usize = 8;

/// Bytes taken by a block's mark, original index and record count.
pub const BLOCK_HEADER_SIZE: usize = 12;

/// Size in bytes of a sample block holding `record_count` records.
#[inline]
pub fn block_size(record_count: u32) -> u64 {
    BLOCK_HEADER_SIZE as u64 + record_count as u64 * RECORD_SIZE as u64
}

/// Byte offset of the first sample block in a store of `sample_count` samples.
#[inline]
pub fn data_start(sample_count: u32) -> u64 {
    HEADER_SIZE as u64 + sample_count as u64 * 8
}

#[inline]
fn read_u32(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

#[inline]
fn read_u64(bytes: &[u8], at: usize) -> u64 {
    let mut word = [0u8; 8];
    word.copy_from_slice(&bytes[at..at + 8]);
    u64::from_le_bytes(word)
}

/// How a store file is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    ReadOnly,
    ReadWrite,
}

enum Backing {
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

impl Backing {
    #[inline]
    fn bytes(&self) -> &[u8] {
        match self {
            Backing::ReadOnly(map) => map,
            Backing::ReadWrite(map) => map,
        }
    }
}

/// Location of one validated sample block inside the mapped file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct BlockSpan {
    offset: usize,
    original_index: u32,
    record_count: u32,
}

impl BlockSpan {
    #[inline]
    fn size(&self) -> usize {
        block_size(self.record_count) as usize
    }
}

/// A problem found by [`PhaseStore::integrity_issues`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntegrityIssue {
    pub sample: Option<u32>,
    pub offset: u64,
    pub message: String,
}

impl fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sample {
            Some(sample) => write!(
                f,
                "sample {} (byte offset {}): {}",
                sample, self.offset, self.message
            ),
            None => write!(f, "byte offset {}: {}", self.offset, self.message),
        }
    }
}

/// A memory-mapped phase store file.
pub struct PhaseStore {
    path: PathBuf,
    backing: Backing,
    sample_count: u32,
}

impl fmt::Debug for PhaseStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhaseStore")
            .field("path", &self.path)
            .field("sample_count", &self.sample_count)
            .field("file_size", &self.file_size())
            .field("writable", &self.is_writable())
            .finish()
    }
}

impl PhaseStore {
    /// Map a store file and validate its header.
    pub fn open<P: AsRef<Path>>(path: P, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = match mode {
            OpenMode::ReadOnly => File::open(&path),
            OpenMode::ReadWrite => OpenOptions::new().read(true).write(true).open(&path),
        }
        .map_err(|source| PhaseError::Open {
            path: path.clone(),
            source,
        })?;

        let len = file
            .metadata()
            .map_err(|source| PhaseError::Open {
                path: path.clone(),
                source,
            })?
            .len();
        if len < HEADER_SIZE as u64 {
            return Err(PhaseError::corrupt(
                path.display().to_string(),
                0,
                format!("file is {} bytes, smaller than the store header", len),
            ));
        }

        // SAFETY: the store is only modified through this mapping while it
        // is open; concurrent external writers are not supported.
        let backing = match mode {
            OpenMode::ReadOnly => unsafe { Mmap::map(&file) }.map(Backing::ReadOnly),
            OpenMode::ReadWrite => unsafe { MmapMut::map_mut(&file) }.map(Backing::ReadWrite),
        }
        .map_err(|source| PhaseError::Open {
            path: path.clone(),
            source,
        })?;

        let bytes = backing.bytes();
        let sentinel = read_u32(bytes, 0);
        if sentinel != FORMAT_SENTINEL {
            return Err(PhaseError::corrupt(
                path.display().to_string(),
                0,
                format!(
                    "bad format sentinel 0x{:08X}, expected 0x{:08X}",
                    sentinel, FORMAT_SENTINEL
                ),
            ));
        }
        let sample_count = read_u32(bytes, 4);
        if data_start(sample_count) > len {
            return Err(PhaseError::corrupt(
                path.display().to_string(),
                4,
                format!(
                    "offset table for {} samples does not fit in {} bytes",
                    sample_count, len
                ),
            ));
        }

        Ok(Self {
            path,
            backing,
            sample_count,
        })
    }

    /// Path the store was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of sample blocks in the store.
    #[inline]
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// Size of the mapped file in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.backing.bytes().len() as u64
    }

    #[inline]
    pub fn is_writable(&self) -> bool {
        matches!(self.backing, Backing::ReadWrite(_))
    }

    /// Raw offset table entry for sample `n` (not validated).
    pub fn offset_of(&self, n: u32) -> Result<u64> {
        self.check_index(n)?;
        Ok(read_u64(self.backing.bytes(), HEADER_SIZE + n as usize * 8))
    }

    fn display_path(&self) -> String {
        self.path.display().to_string()
    }

    fn check_index(&self, n: u32) -> Result<()> {
        if n >= self.sample_count {
            return Err(PhaseError::InvalidArgument(format!(
                "sample index {} out of range for {} ({} samples)",
                n,
                self.display_path(),
                self.sample_count
            )));
        }
        Ok(())
    }

    /// Locate and validate the block of sample `n`.
    fn span_of(&self, n: u32) -> Result<BlockSpan> {
        let offset = self.offset_of(n)?;
        let bytes = self.backing.bytes();
        let len = bytes.len() as u64;
        let header_end = offset.checked_add(BLOCK_HEADER_SIZE as u64);
        if offset < data_start(self.sample_count) || header_end.is_none_or(|end| end > len) {
            return Err(PhaseError::corrupt(
                self.display_path(),
                offset,
                format!("block offset of sample {} is outside the data region", n),
            ));
        }
        let at = offset as usize;
        let mark = read_u32(bytes, at);
        if mark != BLOCK_SENTINEL {
            return Err(PhaseError::corrupt(
                self.display_path(),
                offset,
                format!("bad block mark 0x{:08X} for sample {}", mark, n),
            ));
        }
        let span = BlockSpan {
            offset: at,
            original_index: read_u32(bytes, at + 4),
            record_count: read_u32(bytes, at + 8),
        };
        let block_end = offset.checked_add(block_size(span.record_count));
        if block_end.is_none_or(|end| end > len) {
            return Err(PhaseError::corrupt(
                self.display_path(),
                offset,
                format!(
                    "block of sample {} declares {} records past the end of the file",
                    n, span.record_count
                ),
            ));
        }
        Ok(span)
    }

    /// Read view of the records of sample `n`, after checking its mark.
    pub fn records_for(&self, n: u32) -> Result<SampleBlock<'_>> {
        let span = self.span_of(n)?;
        let raw = &self.backing.bytes()[span.offset..span.offset + span.size()];
        Ok(SampleBlock::new(n, span.original_index, raw))
    }

    /// Original (pre-subsampling) sample index stored in block `n`.
    pub fn original_index_of(&self, n: u32) -> Result<u32> {
        Ok(self.span_of(n)?.original_index)
    }

    /// Map from original sample index to position in this store.
    pub fn original_index_map(&self) -> Result<BTreeMap<u32, u32>> {
        let mut map = BTreeMap::new();
        for n in 0..self.sample_count {
            map.insert(self.original_index_of(n)?, n);
        }
        Ok(map)
    }

    /// Size in bytes of block `n`, header included.
    pub fn block_size_of(&self, n: u32) -> Result<u64> {
        Ok(self.span_of(n)?.size() as u64)
    }

    /// Overwrite one record of one sample in place.
    pub fn mutate(
        &mut self,
        sample: u32,
        record: usize,
        allele0: i32,
        allele1: i32,
        phase_score: f32,
    ) -> Result<()> {
        let span = self.span_of(sample)?;
        if record >= span.record_count as usize {
            return Err(PhaseError::InvalidArgument(format!(
                "record {} out of range for sample {} ({} records)",
                record, sample, span.record_count
            )));
        }
        let path = self.display_path();
        let map = match &mut self.backing {
            Backing::ReadWrite(map) => map,
            Backing::ReadOnly(_) => {
                return Err(PhaseError::InvalidArgument(format!(
                    "{} is mapped read-only",
                    path
                )))
            }
        };
        let at = span.offset + BLOCK_HEADER_SIZE + record * RECORD_SIZE;
        let site_index = read_u32(map, at);
        GenotypeRecord::new(site_index, allele0, allele1, phase_score)
            .write_into(&mut map[at..at + RECORD_SIZE]);
        Ok(())
    }

    /// Split a read-write store into one mutable view per sample block.
    ///
    /// Views never overlap, so each can be handed to a different worker.
    /// Fails if the offsets are not strictly increasing or blocks overlap.
    pub fn blocks_mut(&mut self) -> Result<Vec<SampleBlockMut<'_>>> {
        let spans = (0..self.sample_count)
            .map(|n| self.span_of(n))
            .collect::<Result<Vec<_>>>()?;
        for (n, pair) in spans.windows(2).enumerate() {
            if pair[0].offset + pair[0].size() > pair[1].offset {
                return Err(PhaseError::corrupt(
                    self.display_path(),
                    pair[1].offset as u64,
                    format!("block {} overlaps or precedes block {}", n + 1, n),
                ));
            }
        }

        let path = self.display_path();
        let map = match &mut self.backing {
            Backing::ReadWrite(map) => map,
            Backing::ReadOnly(_) => {
                return Err(PhaseError::InvalidArgument(format!(
                    "{} is mapped read-only",
                    path
                )))
            }
        };

        let mut views = Vec::with_capacity(spans.len());
        let mut rest: &mut [u8] = &mut map[..];
        let mut consumed = 0usize;
        for (n, span) in spans.iter().enumerate() {
            let (_, tail) = std::mem::take(&mut rest).split_at_mut(span.offset - consumed);
            let (block, tail) = tail.split_at_mut(span.size());
            rest = tail;
            consumed = span.offset + span.size();
            views.push(SampleBlockMut::new(n as u32, span.original_index, block));
        }
        Ok(views)
    }

    /// Raw bytes of block `n` (mark, index, count and records).
    pub fn block_bytes(&self, n: u32) -> Result<&[u8]> {
        let span = self.span_of(n)?;
        Ok(&self.backing.bytes()[span.offset..span.offset + span.size()])
    }

    /// Itemised integrity problems; empty when the file is consistent.
    ///
    /// Checks every block mark, that each block ends exactly where the next
    /// one starts, and that the file size matches header, offset table and
    /// block sizes.
    pub fn integrity_issues(&self) -> Vec<IntegrityIssue> {
        let spans: Vec<std::result::Result<BlockSpan, IntegrityIssue>> = (0..self.sample_count)
            .into_par_iter()
            .map(|n| {
                self.span_of(n).map_err(|e| IntegrityIssue {
                    sample: Some(n),
                    offset: self.offset_of(n).unwrap_or(0),
                    message: e.to_string(),
                })
            })
            .collect();

        let mut issues = Vec::new();
        let mut expected_size = data_start(self.sample_count);
        for (n, span) in spans.iter().enumerate() {
            match span {
                Ok(span) => {
                    expected_size += span.size() as u64;
                    if let Some(Ok(next)) = spans.get(n + 1) {
                        if span.offset + span.size() != next.offset {
                            issues.push(IntegrityIssue {
                                sample: Some(n as u32),
                                offset: span.offset as u64,
                                message: format!(
                                    "block ends at {} but block {} starts at {}",
                                    span.offset + span.size(),
                                    n + 1,
                                    next.offset
                                ),
                            });
                        }
                    }
                }
                Err(issue) => issues.push(issue.clone()),
            }
        }

        if expected_size != self.file_size() {
            issues.push(IntegrityIssue {
                sample: None,
                offset: self.file_size(),
                message: format!(
                    "file is {} bytes but offsets and blocks account for {}",
                    self.file_size(),
                    expected_size
                ),
            });
        }
        issues
    }

    /// Run all integrity checks, logging each problem. Never aborts.
    pub fn integrity_check(&self) -> bool {
        let issues = self.integrity_issues();
        for issue in &issues {
            warn!("{}: {}", self.display_path(), issue);
        }
        issues.is_empty()
    }

    /// Number of records with a present score strictly below `threshold`.
    pub fn count_below(&self, threshold: f32) -> Result<usize> {
        let mut total = 0;
        for n in 0..self.sample_count {
            total += self
                .records_for(n)?
                .iter()
                .filter(|r| r.is_low_score(threshold))
                .count();
        }
        Ok(total)
    }

    /// Number of records already validated or flipped by read evidence.
    pub fn count_rephased(&self) -> Result<usize> {
        let mut total = 0;
        for n in 0..self.sample_count {
            total += self.records_for(n)?.iter().filter(|r| r.is_rephased()).count();
        }
        Ok(total)
    }

    /// Flip the phase of every record of every sample in place.
    pub fn switch_phase(&mut self) -> Result<usize> {
        let mut switched = 0;
        for mut block in self.blocks_mut()? {
            switched += block.switch_phase();
        }
        Ok(switched)
    }

    /// Synchronise a read-write map with the file on disk.
    pub fn flush(&self) -> Result<()> {
        if let Backing::ReadWrite(map) = &self.backing {
            map.flush()?;
        }
        Ok(())
    }
}

impl Drop for PhaseStore {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("Failed to sync {} on close: {}", self.display_path(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotype::{encode_phased, encode_unphased};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn het(site: u32, pp: f32) -> GenotypeRecord {
        GenotypeRecord::new(site, encode_unphased(0), encode_phased(1), pp)
    }

    fn write_store(blocks: &[(u32, Vec<GenotypeRecord>)]) -> NamedTempFile {
        let file = NamedTempFile::new().unwrap();
        let mut writer = StoreWriter::create(file.path(), blocks.len() as u32).unwrap();
        for (orig, records) in blocks {
            writer.append_block(*orig, records).unwrap();
        }
        writer.finish().unwrap();
        file
    }

    #[test]
    fn test_round_trip() {
        let blocks = vec![
            (0, vec![het(1, 0.5), het(4, f32::NAN)]),
            (1, vec![]),
            (2, vec![het(2, 0.1), het(3, 0.95), het(9, 0.2)]),
        ];
        let file = write_store(&blocks);
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();

        assert_eq!(store.sample_count(), 3);
        assert!(store.integrity_check());
        for (n, (orig, records)) in blocks.iter().enumerate() {
            let block = store.records_for(n as u32).unwrap();
            assert_eq!(block.original_index(), *orig);
            assert_eq!(block.to_vec(), *records);
        }
    }

    #[test]
    fn test_blocks_never_overlap() {
        let blocks = vec![
            (0, vec![het(1, 0.5)]),
            (1, vec![het(2, 0.5), het(3, 0.5)]),
            (2, vec![]),
            (3, vec![het(7, 0.5)]),
        ];
        let file = write_store(&blocks);
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();

        for i in 0..store.sample_count() {
            for j in 0..store.sample_count() {
                if i == j {
                    continue;
                }
                let (oi, si) = (store.offset_of(i).unwrap(), store.block_size_of(i).unwrap());
                let (oj, sj) = (store.offset_of(j).unwrap(), store.block_size_of(j).unwrap());
                assert!(oi + si <= oj || oj + sj <= oi);
            }
        }
        assert_eq!(store.offset_of(0).unwrap(), data_start(4));
    }

    #[test]
    fn test_bad_sentinel_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&0x11223344u32.to_le_bytes()).unwrap();
        file.write_all(&0u32.to_le_bytes()).unwrap();
        file.flush().unwrap();

        let err = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, PhaseError::CorruptFormat { offset: 0, .. }));
    }

    #[test]
    fn test_truncated_file_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0xDD, 0xCC]).unwrap();
        file.flush().unwrap();
        assert!(matches!(
            PhaseStore::open(file.path(), OpenMode::ReadOnly),
            Err(PhaseError::CorruptFormat { .. })
        ));
    }

    #[test]
    fn test_missing_file_is_open_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PhaseStore::open(dir.path().join("absent.bin"), OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, PhaseError::Open { .. }));
    }

    #[test]
    fn test_bad_block_mark_detected() {
        let file = write_store(&[(0, vec![het(1, 0.5)]), (1, vec![het(2, 0.5)])]);
        {
            let mut store = PhaseStore::open(file.path(), OpenMode::ReadWrite).unwrap();
            let offset = store.offset_of(1).unwrap() as usize;
            if let Backing::ReadWrite(map) = &mut store.backing {
                map[offset..offset + 4].copy_from_slice(&0u32.to_le_bytes());
            }
        }
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();
        assert!(store.records_for(0).is_ok());
        assert!(matches!(
            store.records_for(1),
            Err(PhaseError::CorruptFormat { .. })
        ));
        assert!(!store.integrity_check());
    }

    #[test]
    fn test_offset_near_u64_max_is_corrupt() {
        let file = write_store(&[(0, vec![het(1, 0.5)])]);
        {
            let mut store = PhaseStore::open(file.path(), OpenMode::ReadWrite).unwrap();
            if let Backing::ReadWrite(map) = &mut store.backing {
                map[HEADER_SIZE..HEADER_SIZE + 8].copy_from_slice(&(u64::MAX - 4).to_le_bytes());
            }
        }
        let mut store = PhaseStore::open(file.path(), OpenMode::ReadWrite).unwrap();
        assert!(matches!(
            store.records_for(0),
            Err(PhaseError::CorruptFormat { .. })
        ));
        assert!(store.block_bytes(0).is_err());
        assert!(!store.integrity_check());
        assert_eq!(store.integrity_issues()[0].sample, Some(0));
        assert!(store.blocks_mut().is_err());
    }

    #[test]
    fn test_trailing_garbage_fails_integrity() {
        let file = write_store(&[(0, vec![het(1, 0.5)])]);
        {
            let mut f = OpenOptions::new().append(true).open(file.path()).unwrap();
            f.write_all(&[0u8; 3]).unwrap();
        }
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();
        let issues = store.integrity_issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].sample.is_none());
    }

    #[test]
    fn test_mutate_in_place_persists() {
        let file = write_store(&[(5, vec![het(1, 0.5), het(2, 0.25)])]);
        {
            let mut store = PhaseStore::open(file.path(), OpenMode::ReadWrite).unwrap();
            store
                .mutate(0, 1, encode_unphased(1), encode_phased(0), 3.25)
                .unwrap();
        }
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();
        let block = store.records_for(0).unwrap();
        assert_eq!(block.get(0), Some(het(1, 0.5)));
        let changed = block.get(1).unwrap();
        assert_eq!(changed.site_index, 2);
        assert_eq!(changed.allele0, encode_unphased(1));
        assert_eq!(changed.allele1, encode_phased(0));
        assert_eq!(changed.phase_score, 3.25);
        assert!(store.integrity_check());
    }

    #[test]
    fn test_mutate_read_only_rejected() {
        let file = write_store(&[(0, vec![het(1, 0.5)])]);
        let mut store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();
        assert!(store.mutate(0, 0, 2, 5, 2.0).is_err());
        assert!(store.mutate(1, 0, 2, 5, 2.0).is_err());
    }

    #[test]
    fn test_blocks_mut_are_disjoint_views() {
        let file = write_store(&[
            (10, vec![het(1, 0.5)]),
            (11, vec![het(2, 0.5), het(3, 0.5)]),
        ]);
        {
            let mut store = PhaseStore::open(file.path(), OpenMode::ReadWrite).unwrap();
            let mut views = store.blocks_mut().unwrap();
            assert_eq!(views.len(), 2);
            assert_eq!(views[1].original_index(), 11);
            let rec = views[1].get(1).unwrap();
            views[1].set(1, GenotypeRecord { phase_score: 2.5, ..rec });
            let first = views[0].get(0).unwrap();
            views[0].set(0, first.switched());
        }
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();
        assert_eq!(store.records_for(1).unwrap().get(1).unwrap().phase_score, 2.5);
        assert_eq!(
            store.records_for(0).unwrap().get(0).unwrap(),
            het(1, 0.5).switched()
        );
        assert!(store.integrity_check());
    }

    #[test]
    fn test_counts_and_switch() {
        let file = write_store(&[
            (0, vec![het(1, 0.5), het(2, f32::NAN), het(3, 4.5)]),
            (1, vec![het(4, 0.995)]),
        ]);
        let mut store = PhaseStore::open(file.path(), OpenMode::ReadWrite).unwrap();
        assert_eq!(store.count_below(0.99).unwrap(), 1);
        assert_eq!(store.count_rephased().unwrap(), 1);

        assert_eq!(store.switch_phase().unwrap(), 4);
        let rec = store.records_for(0).unwrap().get(0).unwrap();
        assert_eq!(rec.allele0, encode_unphased(1));
        assert_eq!(rec.allele1, encode_phased(0));
    }

    #[test]
    fn test_original_index_map() {
        let file = write_store(&[(7, vec![]), (3, vec![het(1, 0.1)])]);
        let store = PhaseStore::open(file.path(), OpenMode::ReadOnly).unwrap();
        let map = store.original_index_map().unwrap();
        assert_eq!(map.get(&7), Some(&0));
        assert_eq!(map.get(&3), Some(&1));
    }
}
