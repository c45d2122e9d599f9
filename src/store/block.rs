//! Indexed views over one sample block of a mapped store.

use super::BLOCK_HEADER_SIZE;
use crate::genotype::{GenotypeRecord, RECORD_SIZE};

/// Read-only view of one sample block.
///
/// The block's mark and record count have been validated against the file
/// length when the view was created, so record access only bounds-checks
/// the record index.
#[derive(Debug, Clone, Copy)]
pub struct SampleBlock<'a> {
    sample: u32,
    original_index: u32,
    raw: &'a [u8],
}

impl<'a> SampleBlock<'a> {
    pub(super) fn new(sample: u32, original_index: u32, raw: &'a [u8]) -> Self {
        Self {
            sample,
            original_index,
            raw,
        }
    }

    /// Position of this block in its store.
    #[inline]
    pub fn sample(&self) -> u32 {
        self.sample
    }

    /// Sample index in the call set the store was extracted from.
    #[inline]
    pub fn original_index(&self) -> u32 {
        self.original_index
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.raw.len() - BLOCK_HEADER_SIZE) / RECORD_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<GenotypeRecord> {
        if i >= self.len() {
            return None;
        }
        let at = BLOCK_HEADER_SIZE + i * RECORD_SIZE;
        Some(GenotypeRecord::read_from(&self.raw[at..at + RECORD_SIZE]))
    }

    pub fn iter(&self) -> impl Iterator<Item = GenotypeRecord> + 'a {
        let raw: &'a [u8] = self.raw;
        raw[BLOCK_HEADER_SIZE..]
            .chunks_exact(RECORD_SIZE)
            .map(GenotypeRecord::read_from)
    }

    pub fn to_vec(&self) -> Vec<GenotypeRecord> {
        self.iter().collect()
    }

    /// The whole block as stored, header included.
    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

/// Mutable view of one sample block.
///
/// Obtained from [`PhaseStore::blocks_mut`](super::PhaseStore::blocks_mut);
/// the views of one store never overlap, so they can be sent to different
/// worker threads. Only allele and score fields are ever rewritten.
#[derive(Debug)]
pub struct SampleBlockMut<'a> {
    sample: u32,
    original_index: u32,
    raw: &'a mut [u8],
}

impl<'a> SampleBlockMut<'a> {
    pub(super) fn new(sample: u32, original_index: u32, raw: &'a mut [u8]) -> Self {
        Self {
            sample,
            original_index,
            raw,
        }
    }

    #[inline]
    pub fn sample(&self) -> u32 {
        self.sample
    }

    #[inline]
    pub fn original_index(&self) -> u32 {
        self.original_index
    }

    #[inline]
    pub fn len(&self) -> usize {
        (self.raw.len() - BLOCK_HEADER_SIZE) / RECORD_SIZE
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn get(&self, i: usize) -> Option<GenotypeRecord> {
        if i >= self.len() {
            return None;
        }
        let at = BLOCK_HEADER_SIZE + i * RECORD_SIZE;
        Some(GenotypeRecord::read_from(&self.raw[at..at + RECORD_SIZE]))
    }

    /// Overwrite record `i`. The stored site index is kept.
    ///
    /// Returns `false` if `i` is out of range.
    #[inline]
    pub fn set(&mut self, i: usize, record: GenotypeRecord) -> bool {
        if i >= self.len() {
            return false;
        }
        let at = BLOCK_HEADER_SIZE + i * RECORD_SIZE;
        let site_index = u32::from_le_bytes([
            self.raw[at],
            self.raw[at + 1],
            self.raw[at + 2],
            self.raw[at + 3],
        ]);
        GenotypeRecord { site_index, ..record }.write_into(&mut self.raw[at..at + RECORD_SIZE]);
        true
    }

    pub fn to_vec(&self) -> Vec<GenotypeRecord> {
        self.raw[BLOCK_HEADER_SIZE..]
            .chunks_exact(RECORD_SIZE)
            .map(GenotypeRecord::read_from)
            .collect()
    }

    pub fn as_block(&self) -> SampleBlock<'_> {
        SampleBlock::new(self.sample, self.original_index, self.raw)
    }

    /// Flip the phase of every record in the block.
    pub fn switch_phase(&mut self) -> usize {
        for chunk in self.raw[BLOCK_HEADER_SIZE..].chunks_exact_mut(RECORD_SIZE) {
            GenotypeRecord::read_from(chunk).switched().write_into(chunk);
        }
        self.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::BLOCK_SENTINEL;

    fn raw_block(original_index: u32, records: &[GenotypeRecord]) -> Vec<u8> {
        let mut raw = Vec::new();
        raw.extend_from_slice(&BLOCK_SENTINEL.to_le_bytes());
        raw.extend_from_slice(&original_index.to_le_bytes());
        raw.extend_from_slice(&(records.len() as u32).to_le_bytes());
        for r in records {
            raw.extend_from_slice(&r.to_bytes());
        }
        raw
    }

    #[test]
    fn test_read_view_bounds() {
        let records = [
            GenotypeRecord::new(4, 2, 5, 0.5),
            GenotypeRecord::new(9, 4, 3, f32::NAN),
        ];
        let raw = raw_block(12, &records);
        let block = SampleBlock::new(0, 12, &raw);

        assert_eq!(block.len(), 2);
        assert_eq!(block.get(1), Some(records[1]));
        assert_eq!(block.get(2), None);
        assert_eq!(block.iter().count(), 2);
        assert_eq!(block.as_bytes().len(), BLOCK_HEADER_SIZE + 2 * RECORD_SIZE);
    }

    #[test]
    fn test_set_keeps_site_index() {
        let mut raw = raw_block(0, &[GenotypeRecord::new(42, 2, 5, 0.5)]);
        let mut block = SampleBlockMut::new(0, 0, &mut raw);

        assert!(block.set(0, GenotypeRecord::new(7, 4, 3, 2.5)));
        assert!(!block.set(1, GenotypeRecord::new(7, 4, 3, 2.5)));
        assert_eq!(block.get(0), Some(GenotypeRecord::new(42, 4, 3, 2.5)));
    }

    #[test]
    fn test_empty_block() {
        let mut raw = raw_block(3, &[]);
        let mut block = SampleBlockMut::new(1, 3, &mut raw);
        assert!(block.is_empty());
        assert_eq!(block.switch_phase(), 0);
        assert!(block.as_block().is_empty());
    }
}
