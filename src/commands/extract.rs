//! Extract command implementation.
//!
//! Streams a call set once and writes the retained heterozygous calls of
//! the selected sample range to a new phase store.

use crate::config::ExtractConfig;
use crate::error::Result;
use crate::extract::{ExtractStats, Extractor};
use crate::hts::{call_set_sample_count, feed_extractor};
use log::info;
use std::path::Path;

/// Extract command configuration.
#[derive(Debug, Clone, Default)]
pub struct ExtractCommand {
    pub config: ExtractConfig,
}

impl ExtractCommand {
    pub fn new(config: ExtractConfig) -> Self {
        Self { config }
    }

    pub fn run<P: AsRef<Path>, Q: AsRef<Path>>(&self, call_set: P, output: Q) -> Result<ExtractStats> {
        let call_set = call_set.as_ref();
        let total = call_set_sample_count(call_set)?;
        let mut extractor = Extractor::new(self.config.clone(), total);
        let range = extractor.sample_range();
        info!(
            "Extracting samples {}..{} of {} from {}",
            range.start,
            range.end,
            total,
            call_set.display()
        );
        feed_extractor(call_set, &mut extractor)?;
        extractor.write_store(output)
    }
}
