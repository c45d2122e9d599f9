// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! pirphase: read-backed rephasing of heterozygous calls
//!
//! Statistically phased cohort call sets carry a per-call phase
//! confidence (`PP`). This library pulls the low-confidence heterozygous
//! calls of every sample into a compact memory-mapped store, re-examines
//! them against the sample's sequencing reads, and writes validated or
//! flipped phases back.
//!
//! # Features
//!
//! - **Phase store**: fixed-layout binary file with one block per sample,
//!   rewritten in place through disjoint per-sample views
//! - **Read evidence**: phase-informative reads linking neighbouring
//!   heterozygous sites decide whether a phase is kept or flipped
//! - **Bounded concurrency**: one worker per sample, at most N at a time
//! - **htslib backend** (default feature): VCF/BCF and BAM/CRAM access
//!
//! # Example
//!
//! ```rust,no_run
//! use pirphase::store::{OpenMode, PhaseStore};
//!
//! let store = PhaseStore::open("cohort.bin", OpenMode::ReadOnly).unwrap();
//! assert!(store.integrity_check());
//! for n in 0..store.sample_count() {
//!     let block = store.records_for(n).unwrap();
//!     println!("sample {} has {} records", block.original_index(), block.len());
//! }
//! ```

pub mod chain;
pub mod commands;
pub mod config;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod genotype;
#[cfg(feature = "htslib")]
pub mod hts;
pub mod parallel;
pub mod rephase;
pub mod report;
pub mod samples;
pub mod store;
pub mod update;
pub mod variants;
pub mod window;

// Re-export commonly used types
pub use error::{PhaseError, Result};
pub use genotype::GenotypeRecord;
pub use rephase::{Rephaser, SiteState};
pub use store::{OpenMode, PhaseStore, StoreWriter};
pub use window::EvidenceWindow;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::chain::HetSiteChain;
    pub use crate::commands::{
        DiffCommand, MergeCommand, RephaseCommand, ShowCommand, SplitCommand, SwitchCommand,
    };
    pub use crate::config::{ExtractConfig, PileupFilter, RephaseConfig};
    pub use crate::error::{PhaseError, Result};
    pub use crate::evidence::{AlignmentOpener, AlignmentSource, MemorySource};
    pub use crate::genotype::GenotypeRecord;
    pub use crate::rephase::{Rephaser, SiteState};
    pub use crate::samples::{SampleInfo, SampleList};
    pub use crate::store::{OpenMode, PhaseStore, StoreWriter};
    pub use crate::variants::VariantCatalog;
}
