//! Rephase command implementation.
//!
//! Every block of a read-write store is rephased against the alignments of
//! its sample. Blocks are split into disjoint mutable views and handed to a
//! [`BoundedScheduler`], so each worker owns exactly one sample's records.
//! A sample whose alignments cannot be read is skipped; the rest of the
//! batch continues.

use crate::config::RephaseConfig;
use crate::error::Result;
use crate::evidence::AlignmentOpener;
use crate::parallel::{BoundedScheduler, SchedulerStats};
use crate::rephase::{RephaseStats, Rephaser};
use crate::samples::{SampleInfo, SampleList};
use crate::store::{OpenMode, PhaseStore, SampleBlockMut};
use crate::variants::VariantCatalog;
use log::{error, info, warn};
use std::fmt;
use std::path::Path;
use std::sync::{Mutex, PoisonError};

/// Rephase command configuration.
#[derive(Debug, Clone, Default)]
pub struct RephaseCommand {
    pub config: RephaseConfig,
    /// Worker threads (0 = all cores).
    pub threads: usize,
    /// Only rephase samples named in this list.
    pub subset: Option<SampleList>,
}

impl RephaseCommand {
    pub fn new(config: RephaseConfig) -> Self {
        Self {
            config,
            threads: 0,
            subset: None,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_subset(mut self, subset: SampleList) -> Self {
        self.subset = Some(subset);
        self
    }

    /// Open `store` read-write and rephase it.
    pub fn run<P: AsRef<Path>, O: AlignmentOpener>(
        &self,
        store: P,
        catalog: &VariantCatalog,
        samples: &SampleList,
        opener: &O,
    ) -> Result<RephaseRunStats> {
        let mut store = PhaseStore::open(store, OpenMode::ReadWrite)?;
        if !store.integrity_check() {
            warn!(
                "{} does not pass the integrity check",
                store.path().display()
            );
        }
        self.rephase_store(&mut store, catalog, samples, opener)
    }

    /// Rephase every selected block of an open read-write store.
    pub fn rephase_store<O: AlignmentOpener>(
        &self,
        store: &mut PhaseStore,
        catalog: &VariantCatalog,
        samples: &SampleList,
        opener: &O,
    ) -> Result<RephaseRunStats> {
        let mut run = RephaseRunStats {
            samples_in_store: store.sample_count(),
            ..RephaseRunStats::default()
        };

        let mut jobs: Vec<(SampleInfo, SampleBlockMut<'_>)> = Vec::new();
        for block in store.blocks_mut()? {
            let Some(sample) = samples.by_index(block.original_index()) else {
                warn!(
                    "Block {} has original index {} which is not in the sample list",
                    block.sample(),
                    block.original_index()
                );
                run.unknown += 1;
                continue;
            };
            if let Some(subset) = &self.subset {
                if subset.position_of(&sample.name).is_none() {
                    run.not_selected += 1;
                    continue;
                }
            }
            jobs.push((sample.clone(), block));
        }
        run.scheduled = jobs.len() as u32;
        let scheduler = BoundedScheduler::new(self.threads);
        info!(
            "Rephasing {} of {} samples on {} threads",
            jobs.len(),
            run.samples_in_store,
            scheduler.threads()
        );

        let report = Mutex::new(run);
        let scheduled = scheduler.run(jobs, |(sample, mut block)| {
            let outcome = self.rephase_sample(&sample, &mut block, catalog, opener);
            let mut run = report.lock().unwrap_or_else(PoisonError::into_inner);
            match outcome {
                Ok((written, stats)) => {
                    info!(
                        "Sample {} ({}): {} of {} low-score sites rephased, {} switched",
                        sample.index,
                        sample.name,
                        stats.rephase_success,
                        stats.rephase_tries,
                        stats.rephase_switch
                    );
                    run.rephased += 1;
                    run.records_written += written as u64;
                    run.totals.merge(&stats);
                }
                Err(e) if e.is_per_sample() => {
                    warn!("Skipping sample {} ({}): {}", sample.index, sample.name, e);
                    run.skipped += 1;
                }
                Err(e) => {
                    error!("Sample {} ({}) failed: {}", sample.index, sample.name, e);
                    run.failed += 1;
                }
            }
        });
        let mut run = report.into_inner().unwrap_or_else(PoisonError::into_inner);
        run.scheduler = scheduled;
        run.failed += scheduled.panicked as u32;

        store.flush()?;
        Ok(run)
    }

    fn rephase_sample<O: AlignmentOpener>(
        &self,
        sample: &SampleInfo,
        block: &mut SampleBlockMut<'_>,
        catalog: &VariantCatalog,
        opener: &O,
    ) -> Result<(usize, RephaseStats)> {
        let mut source = opener.open(sample)?;
        let mut rephaser = Rephaser::new(self.config.clone());
        let written = rephaser.rephase_block(block, catalog, &mut source)?;
        Ok((written, rephaser.stats()))
    }
}

/// Summary of a rephasing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RephaseRunStats {
    pub samples_in_store: u32,
    pub scheduled: u32,
    pub rephased: u32,
    /// Samples skipped because their alignments could not be read.
    pub skipped: u32,
    pub failed: u32,
    /// Blocks whose original index is not in the sample list.
    pub unknown: u32,
    /// Blocks left out by the subset list.
    pub not_selected: u32,
    pub records_written: u64,
    pub totals: RephaseStats,
    pub scheduler: SchedulerStats,
}

impl fmt::Display for RephaseRunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Samples: {} in store, {} scheduled, {} rephased, {} skipped, {} failed",
            self.samples_in_store, self.scheduled, self.rephased, self.skipped, self.failed
        )?;
        writeln!(f, "Records rewritten: {}", self.records_written)?;
        write!(f, "{}", self.totals)
    }
}
