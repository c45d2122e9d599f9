//! Update command implementation.
//!
//! Copies a call set, rewriting `GT` and `PP` of every call that a
//! rephased store carries read evidence for.

use crate::error::{PhaseError, Result};
use crate::hts::write_updated;
use crate::store::{OpenMode, PhaseStore};
use crate::update::{UpdatePlan, UpdateStats};
use log::{info, warn};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct UpdateCommand;

impl UpdateCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn run<P: AsRef<Path>, Q: AsRef<Path>, R: AsRef<Path>>(
        &self,
        call_set: P,
        store: Q,
        output: R,
    ) -> Result<UpdateStats> {
        if call_set.as_ref() == output.as_ref() {
            return Err(PhaseError::InvalidArgument(
                "input and output call sets must be different files".into(),
            ));
        }
        let store = PhaseStore::open(store, OpenMode::ReadOnly)?;
        if !store.integrity_check() {
            warn!("{} does not pass the integrity check", store.path().display());
        }
        let plan = UpdatePlan::from_store(&store)?;
        info!(
            "{} rephased calls to write from {}",
            plan.len(),
            store.path().display()
        );
        write_updated(call_set.as_ref(), output.as_ref(), &plan)
    }
}
