//! Append-only store writer.

use super::{
    block_size, data_start, BLOCK_HEADER_SIZE, BLOCK_SENTINEL, FORMAT_SENTINEL, HEADER_SIZE,
    PLACEHOLDER_OFFSET,
};
use crate::error::{PhaseError, Result};
use crate::genotype::{GenotypeRecord, RECORD_SIZE};
use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Buffer size for store output (8MB).
const DEFAULT_BUFFER_SIZE: usize = 8 * 1024 * 1024;

/// Writes a phase store block by block.
///
/// The header and a placeholder offset table are written up front; each
/// appended block records its offset, and [`finish`](Self::finish) seeks
/// back to fill in the table. The sample count is fixed at creation.
pub struct StoreWriter<W: Write + Seek> {
    out: W,
    label: String,
    capacity: u32,
    offsets: Vec<u64>,
    position: u64,
}

impl StoreWriter<BufWriter<File>> {
    /// Create (or truncate) `path` for a store of `sample_count` samples.
    pub fn create<P: AsRef<Path>>(path: P, sample_count: u32) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| PhaseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::new(
            BufWriter::with_capacity(DEFAULT_BUFFER_SIZE, file),
            sample_count,
            path.display().to_string(),
        )
    }
}

impl<W: Write + Seek> StoreWriter<W> {
    /// Start a store on an arbitrary seekable sink.
    pub fn new(mut out: W, sample_count: u32, label: impl Into<String>) -> Result<Self> {
        out.write_all(&FORMAT_SENTINEL.to_le_bytes())?;
        out.write_all(&sample_count.to_le_bytes())?;
        for _ in 0..sample_count {
            out.write_all(&PLACEHOLDER_OFFSET.to_le_bytes())?;
        }
        Ok(Self {
            out,
            label: label.into(),
            capacity: sample_count,
            offsets: Vec::with_capacity(sample_count as usize),
            position: data_start(sample_count),
        })
    }

    /// Number of blocks appended so far.
    #[inline]
    pub fn written(&self) -> u32 {
        self.offsets.len() as u32
    }

    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    fn claim_slot(&mut self) -> Result<()> {
        if self.offsets.len() as u32 >= self.capacity {
            return Err(PhaseError::TooManyBlocks {
                capacity: self.capacity,
            });
        }
        self.offsets.push(self.position);
        Ok(())
    }

    /// Append one sample block.
    pub fn append_block(&mut self, original_index: u32, records: &[GenotypeRecord]) -> Result<()> {
        self.claim_slot()?;
        let count = records.len() as u32;
        self.out.write_all(&BLOCK_SENTINEL.to_le_bytes())?;
        self.out.write_all(&original_index.to_le_bytes())?;
        self.out.write_all(&count.to_le_bytes())?;
        let mut buf = [0u8; RECORD_SIZE];
        for record in records {
            record.write_into(&mut buf);
            self.out.write_all(&buf)?;
        }
        self.position += block_size(count);
        Ok(())
    }

    /// Append a block copied verbatim from another store.
    ///
    /// The bytes must start with a block mark and be exactly as long as the
    /// record count they declare.
    pub fn append_raw_block(&mut self, raw: &[u8]) -> Result<()> {
        if raw.len() < BLOCK_HEADER_SIZE {
            return Err(PhaseError::corrupt(
                self.label.clone(),
                self.position,
                "copied block is shorter than a block header",
            ));
        }
        let mark = u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]);
        let count = u32::from_le_bytes([raw[8], raw[9], raw[10], raw[11]]);
        if mark != BLOCK_SENTINEL || raw.len() as u64 != block_size(count) {
            return Err(PhaseError::corrupt(
                self.label.clone(),
                self.position,
                format!(
                    "copied block has mark 0x{:08X} and {} bytes for {} records",
                    mark,
                    raw.len(),
                    count
                ),
            ));
        }
        self.claim_slot()?;
        self.out.write_all(raw)?;
        self.position += raw.len() as u64;
        Ok(())
    }

    /// Rewrite the offset table and hand back the sink.
    pub fn finish(mut self) -> Result<W> {
        if self.written() != self.capacity {
            return Err(PhaseError::IncompleteStore {
                written: self.written(),
                expected: self.capacity,
            });
        }
        self.out.seek(SeekFrom::Start(HEADER_SIZE as u64))?;
        for offset in &self.offsets {
            self.out.write_all(&offset.to_le_bytes())?;
        }
        self.out.seek(SeekFrom::End(0))?;
        self.out.flush()?;
        Ok(self.out)
    }
}
