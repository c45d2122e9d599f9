//! Split command implementation.
//!
//! Writes a new store holding a subset of the blocks of an existing one.
//! Blocks keep their original sample index.

use super::resolve_store_positions;
use crate::error::{PhaseError, Result};
use crate::samples::SampleList;
use crate::store::{OpenMode, PhaseStore};
use rand::rngs::SmallRng;
use rand::SeedableRng;
use std::fmt;
use std::path::Path;

/// Which blocks to keep.
#[derive(Debug, Clone)]
pub enum SplitSelection {
    /// Samples named in `subset`, resolved against the full call-set list.
    Names { all: SampleList, subset: SampleList },
    /// Store positions.
    Positions(Vec<u32>),
    /// `count` blocks drawn at random with a fixed seed.
    Random { count: usize, seed: u64 },
}

/// Split command configuration.
#[derive(Debug, Clone)]
pub struct SplitCommand {
    pub selection: SplitSelection,
}

impl SplitCommand {
    pub fn new(selection: SplitSelection) -> Self {
        Self { selection }
    }

    /// Sorted store positions selected from `store`.
    pub fn select(&self, store: &PhaseStore) -> Result<Vec<u32>> {
        let total = store.sample_count();
        let mut positions = match &self.selection {
            SplitSelection::Names { all, subset } => {
                return resolve_store_positions(store, all, subset)
            }
            SplitSelection::Positions(p) => {
                if let Some(&bad) = p.iter().find(|&&n| n >= total) {
                    return Err(PhaseError::InvalidArgument(format!(
                        "sample {} out of range, store has {} samples",
                        bad, total
                    )));
                }
                p.clone()
            }
            SplitSelection::Random { count, seed } => {
                if *count > total as usize {
                    return Err(PhaseError::InvalidArgument(format!(
                        "cannot draw {} of {} samples",
                        count, total
                    )));
                }
                let mut rng = SmallRng::seed_from_u64(*seed);
                rand::seq::index::sample(&mut rng, total as usize, *count)
                    .into_iter()
                    .map(|i| i as u32)
                    .collect()
            }
        };
        positions.sort_unstable();
        positions.dedup();
        Ok(positions)
    }

    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, input: P, output: Q) -> Result<SplitStats> {
        if input.as_ref() == output.as_ref() {
            return Err(PhaseError::InvalidArgument(
                "input and output must be different files".into(),
            ));
        }
        let store = PhaseStore::open(input, OpenMode::ReadOnly)?;
        let positions = self.select(&store)?;
        store.write_subset(&positions, output)?;
        Ok(SplitStats {
            samples_in: store.sample_count(),
            samples_out: positions.len() as u32,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SplitStats {
    pub samples_in: u32,
    pub samples_out: u32,
}

impl fmt::Display for SplitStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Kept {} of {} samples", self.samples_out, self.samples_in)
    }
}
