//! Command implementations for pirphase.
//!
//! Each tool is a command struct with builder-style setters and a `run`
//! method returning a statistics struct that implements `Display`.

pub mod check;
pub mod diff;
#[cfg(feature = "htslib")]
pub mod extract;
pub mod merge;
pub mod rephase;
pub mod show;
pub mod split;
pub mod switch;
#[cfg(feature = "htslib")]
pub mod update;

pub use check::{CheckCommand, CheckStats};
pub use diff::{DiffCommand, DiffStats};
#[cfg(feature = "htslib")]
pub use extract::ExtractCommand;
pub use merge::{MergeCommand, MergeStats};
pub use rephase::{RephaseCommand, RephaseRunStats};
pub use show::{ShowCommand, ShowStats};
pub use split::{SplitCommand, SplitSelection, SplitStats};
pub use switch::{SwitchCommand, SwitchStats};
#[cfg(feature = "htslib")]
pub use update::UpdateCommand;

use crate::error::Result;
use crate::samples::SampleList;
use crate::store::PhaseStore;
use log::warn;

/// Store positions of the samples of `subset`, sorted.
///
/// Names are looked up in `all`, the full sample list of the call set, to
/// get their call-set index; blocks are then found by original index.
/// Samples missing from either the list or the store are logged and
/// skipped.
pub fn resolve_store_positions(
    store: &PhaseStore,
    all: &SampleList,
    subset: &SampleList,
) -> Result<Vec<u32>> {
    let by_original = store.original_index_map()?;
    let mut positions: Vec<u32> = all
        .positions_of(subset)
        .into_iter()
        .filter_map(|pos| {
            let index = all.get(pos as usize)?.index;
            let found = by_original.get(&index).copied();
            if found.is_none() {
                warn!(
                    "Sample with index {} has no block in {}",
                    index,
                    store.path().display()
                );
            }
            found
        })
        .collect();
    positions.sort_unstable();
    positions.dedup();
    Ok(positions)
}
