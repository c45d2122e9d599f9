//! Error type shared by the store, the extraction stage and the rephasing stage.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading, writing or rephasing a phase store.
#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt phase store {path} at byte offset {offset}: {message}")]
    CorruptFormat {
        path: String,
        offset: u64,
        message: String,
    },

    #[error("Cannot access alignments {}: {message}", path.display())]
    AlignmentAccess { path: PathBuf, message: String },

    #[error("Record count mismatch for sample {sample}: {left} vs {right}")]
    SizeMismatch { sample: u32, left: u32, right: u32 },

    #[error("Offset table is full ({capacity} samples), cannot append another block")]
    TooManyBlocks { capacity: u32 },

    #[error("Store finished with {written} of {expected} sample blocks written")]
    IncompleteStore { written: u32, expected: u32 },

    #[error("Sample list error at line {line}: {message}")]
    SampleList { line: usize, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[cfg(feature = "htslib")]
    #[error("htslib error: {0}")]
    Hts(#[from] rust_htslib::errors::Error),
}

impl PhaseError {
    /// Build a `CorruptFormat` error for `path` at byte `offset`.
    pub fn corrupt(path: impl Into<String>, offset: u64, message: impl Into<String>) -> Self {
        PhaseError::CorruptFormat {
            path: path.into(),
            offset,
            message: message.into(),
        }
    }

    /// Whether this error only affects the sample being processed.
    ///
    /// The scheduler downgrades these to a skip and continues the batch.
    pub fn is_per_sample(&self) -> bool {
        matches!(self, PhaseError::AlignmentAccess { .. })
    }
}

pub type Result<T> = std::result::Result<T, PhaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_corrupt_message_carries_context() {
        let err = PhaseError::corrupt("cohort.bin", 4096, "bad block mark 0x00000000");
        let msg = err.to_string();
        assert!(msg.contains("cohort.bin"));
        assert!(msg.contains("4096"));
        assert!(msg.contains("bad block mark"));
    }

    #[test]
    fn test_only_alignment_errors_are_per_sample() {
        let access = PhaseError::AlignmentAccess {
            path: PathBuf::from("s1.cram"),
            message: "missing index".to_string(),
        };
        assert!(access.is_per_sample());
        assert!(!PhaseError::InvalidArgument("x".into()).is_per_sample());
        assert!(!PhaseError::SizeMismatch {
            sample: 0,
            left: 1,
            right: 2
        }
        .is_per_sample());
    }
}
