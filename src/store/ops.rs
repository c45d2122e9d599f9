//! Whole-store operations producing new files: subsetting and merging.

use super::{OpenMode, PhaseStore, StoreWriter};
use crate::error::{PhaseError, Result};
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

impl PhaseStore {
    /// Copy the blocks at the given current positions into a new store.
    ///
    /// Blocks are written in the order of `indices`; each keeps its original
    /// sample index so provenance survives repeated subsetting.
    pub fn write_subset<P: AsRef<Path>>(&self, indices: &[u32], dest: P) -> Result<()> {
        let mut writer = StoreWriter::create(dest.as_ref(), indices.len() as u32)?;
        for &n in indices {
            writer.append_raw_block(self.block_bytes(n)?)?;
        }
        writer.finish()?;
        info!(
            "Wrote {} of {} samples from {} to {}",
            indices.len(),
            self.sample_count(),
            self.path().display(),
            dest.as_ref().display()
        );
        Ok(())
    }
}

/// Concatenates the blocks of several stores into one.
///
/// The destination table is sized up front; adding more blocks than it
/// was sized for is fatal.
pub struct Merger {
    writer: StoreWriter<BufWriter<File>>,
    dest: PathBuf,
    inputs: usize,
}

impl Merger {
    pub fn create<P: AsRef<Path>>(dest: P, total_samples: u32) -> Result<Self> {
        Ok(Self {
            writer: StoreWriter::create(dest.as_ref(), total_samples)?,
            dest: dest.as_ref().to_path_buf(),
            inputs: 0,
        })
    }

    /// Append every block of `store`, in store order.
    pub fn add(&mut self, store: &PhaseStore) -> Result<()> {
        if !store.integrity_check() {
            warn!(
                "Merging {} although it failed the integrity check",
                store.path().display()
            );
        }
        let remaining = self.writer.capacity() - self.writer.written();
        if store.sample_count() > remaining {
            return Err(PhaseError::TooManyBlocks {
                capacity: self.writer.capacity(),
            });
        }
        for n in 0..store.sample_count() {
            self.writer.append_raw_block(store.block_bytes(n)?)?;
        }
        self.inputs += 1;
        Ok(())
    }

    /// Write the offset table and close the destination.
    pub fn finish(self) -> Result<u32> {
        let written = self.writer.written();
        self.writer.finish()?;
        info!(
            "Merged {} stores into {} ({} samples)",
            self.inputs,
            self.dest.display(),
            written
        );
        Ok(written)
    }
}

/// Merge `stores` into `dest`, file order then in-file sample order.
///
/// Returns the number of samples written.
pub fn merge<P: AsRef<Path>>(stores: &[PhaseStore], dest: P) -> Result<u32> {
    let total: u64 = stores.iter().map(|s| s.sample_count() as u64).sum();
    let total = u32::try_from(total).map_err(|_| {
        PhaseError::InvalidArgument(format!("{} samples do not fit in one store", total))
    })?;
    let mut merger = Merger::create(dest, total)?;
    for store in stores {
        merger.add(store)?;
    }
    merger.finish()
}

/// Open every path read-only and merge them into `dest`.
pub fn merge_paths<P: AsRef<Path>>(inputs: &[PathBuf], dest: P) -> Result<u32> {
    let stores = inputs
        .iter()
        .map(|p| PhaseStore::open(p, OpenMode::ReadOnly))
        .collect::<Result<Vec<_>>>()?;
    merge(&stores, dest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotype::GenotypeRecord;
    use tempfile::tempdir;

    fn make_store(path: &Path, originals: &[u32]) {
        let mut writer = StoreWriter::create(path, originals.len() as u32).unwrap();
        for (i, &orig) in originals.iter().enumerate() {
            let records: Vec<_> = (0..i as u32)
                .map(|s| GenotypeRecord::new(s, 2, 5, 0.25))
                .collect();
            writer.append_block(orig, &records).unwrap();
        }
        writer.finish().unwrap();
    }

    #[test]
    fn test_subset_preserves_original_index() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("all.bin");
        let dst = dir.path().join("sub.bin");
        make_store(&src, &[100, 101, 102, 103]);

        let store = PhaseStore::open(&src, OpenMode::ReadOnly).unwrap();
        store.write_subset(&[3, 1], &dst).unwrap();

        let sub = PhaseStore::open(&dst, OpenMode::ReadOnly).unwrap();
        assert_eq!(sub.sample_count(), 2);
        assert!(sub.integrity_check());
        assert_eq!(sub.original_index_of(0).unwrap(), 103);
        assert_eq!(sub.original_index_of(1).unwrap(), 101);
        assert_eq!(
            sub.records_for(0).unwrap().to_vec(),
            store.records_for(3).unwrap().to_vec()
        );
    }

    #[test]
    fn test_subset_out_of_range_fails() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("all.bin");
        make_store(&src, &[0, 1]);
        let store = PhaseStore::open(&src, OpenMode::ReadOnly).unwrap();
        assert!(store.write_subset(&[2], dir.path().join("x.bin")).is_err());
    }

    #[test]
    fn test_merger_overflow() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("a.bin");
        make_store(&src, &[0, 1, 2]);
        let store = PhaseStore::open(&src, OpenMode::ReadOnly).unwrap();

        let mut merger = Merger::create(dir.path().join("m.bin"), 4).unwrap();
        merger.add(&store).unwrap();
        assert!(matches!(
            merger.add(&store),
            Err(PhaseError::TooManyBlocks { capacity: 4 })
        ));
    }
}
