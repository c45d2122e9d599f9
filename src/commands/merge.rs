//! Merge command implementation.
//!
//! Concatenates the blocks of several stores, typically the per-chunk
//! outputs of an extraction split over sample ranges, into one store.

use crate::error::{PhaseError, Result};
use crate::store::{merge_paths, OpenMode, PhaseStore};
use log::{info, warn};
use std::fmt;
use std::path::{Path, PathBuf};

/// Merge command configuration.
#[derive(Debug, Clone, Default)]
pub struct MergeCommand {
    pub inputs: Vec<PathBuf>,
}

impl MergeCommand {
    pub fn new(inputs: Vec<PathBuf>) -> Self {
        Self { inputs }
    }

    /// Inputs `{prefix}_0`, `{prefix}_1`, ... up to the first missing file.
    pub fn from_prefix(prefix: &str) -> Self {
        let inputs: Vec<PathBuf> = (0u32..)
            .map(|i| PathBuf::from(format!("{}_{}", prefix, i)))
            .take_while(|p| p.exists())
            .collect();
        info!("Found {} stores with prefix {}", inputs.len(), prefix);
        Self { inputs }
    }

    pub fn run<P: AsRef<Path>>(&self, dest: P) -> Result<MergeStats> {
        let dest = dest.as_ref();
        if self.inputs.is_empty() {
            return Err(PhaseError::InvalidArgument("no stores to merge".into()));
        }
        if self.inputs.iter().any(|p| p.as_path() == dest) {
            return Err(PhaseError::InvalidArgument(format!(
                "output {} is also an input",
                dest.display()
            )));
        }
        let samples = merge_paths(&self.inputs, dest)?;

        let merged = PhaseStore::open(dest, OpenMode::ReadOnly)?;
        let integrity_ok = merged.integrity_check();
        if !integrity_ok {
            warn!("Merged store {} has problems", dest.display());
        }
        Ok(MergeStats {
            inputs: self.inputs.len(),
            samples,
            file_size: merged.file_size(),
            integrity_ok,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inputs: usize,
    pub samples: u32,
    pub file_size: u64,
    pub integrity_ok: bool,
}

impl fmt::Display for MergeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Inputs: {}, Samples: {}, Size: {} bytes, Integrity: {}",
            self.inputs,
            self.samples,
            self.file_size,
            if self.integrity_ok { "ok" } else { "FAILED" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genotype::GenotypeRecord;
    use crate::store::StoreWriter;
    use tempfile::tempdir;

    fn write_store(path: &Path, originals: std::ops::Range<u32>) {
        let mut w = StoreWriter::create(path, originals.len() as u32).unwrap();
        for o in originals {
            w.append_block(o, &[GenotypeRecord::new(o, 2, 5, 0.5)])
                .unwrap();
        }
        w.finish().unwrap();
    }

    #[test]
    fn test_merge_by_prefix() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("chunk");
        let prefix = prefix.to_str().unwrap();
        write_store(Path::new(&format!("{}_0", prefix)), 0..2);
        write_store(Path::new(&format!("{}_1", prefix)), 2..5);
        write_store(Path::new(&format!("{}_3", prefix)), 9..10);

        let cmd = MergeCommand::from_prefix(prefix);
        assert_eq!(cmd.inputs.len(), 2);

        let dest = dir.path().join("all.bin");
        let stats = cmd.run(&dest).unwrap();
        assert_eq!(stats.samples, 5);
        assert!(stats.integrity_ok);

        let merged = PhaseStore::open(&dest, OpenMode::ReadOnly).unwrap();
        let originals: Vec<u32> = (0..5)
            .map(|n| merged.original_index_of(n).unwrap())
            .collect();
        assert_eq!(originals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_output_must_differ_from_inputs() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.bin");
        write_store(&a, 0..1);
        assert!(MergeCommand::new(vec![a.clone()]).run(&a).is_err());
        assert!(MergeCommand::default().run(dir.path().join("b.bin")).is_err());
    }
}
