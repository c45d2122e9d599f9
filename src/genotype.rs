//! Genotype allele encoding and the fixed-size genotype record.
//!
//! Alleles use the same integer encoding as htslib's BCF genotype arrays:
//! `(allele + 1) << 1`, with the low bit set when the allele is phased
//! relative to the previous one. By convention the first allele of a diploid
//! call is always unphased and the second carries the phase flag.

/// Size in bytes of one serialized [`GenotypeRecord`].
pub const RECORD_SIZE: usize = 16;

/// Score above which a record is considered validated by reads.
pub const REPHASED_SCORE: f32 = 1.0;

/// Decode the allele index from an encoded allele (`-1` means missing).
#[inline]
pub fn allele_index(encoded: i32) -> i32 {
    (encoded >> 1) - 1
}

/// Whether an encoded allele carries the phased flag.
#[inline]
pub fn is_phased(encoded: i32) -> bool {
    encoded & 1 == 1
}

/// Encode an allele index without the phase flag.
#[inline]
pub fn encode_unphased(allele: i32) -> i32 {
    (allele + 1) << 1
}

/// Encode an allele index with the phase flag.
#[inline]
pub fn encode_phased(allele: i32) -> i32 {
    ((allele + 1) << 1) | 1
}

/// One heterozygous call of one sample, exactly as stored on disk.
///
/// `phase_score` is NaN when the call set carried no confidence, below 1.0
/// when the call still needs rephasing, and `original + reads + 1` once it
/// has been validated or flipped by read evidence.
#[derive(Debug, Clone, Copy)]
pub struct GenotypeRecord {
    pub site_index: u32,
    pub allele0: i32,
    pub allele1: i32,
    pub phase_score: f32,
}

impl PartialEq for GenotypeRecord {
    /// Bitwise comparison so that NaN scores compare equal to themselves.
    fn eq(&self, other: &Self) -> bool {
        self.site_index == other.site_index
            && self.allele0 == other.allele0
            && self.allele1 == other.allele1
            && self.phase_score.to_bits() == other.phase_score.to_bits()
    }
}

impl GenotypeRecord {
    #[inline]
    pub fn new(site_index: u32, allele0: i32, allele1: i32, phase_score: f32) -> Self {
        Self {
            site_index,
            allele0,
            allele1,
            phase_score,
        }
    }

    /// Decode a record from the first [`RECORD_SIZE`] bytes of `bytes`.
    ///
    /// # Panics
    ///
    /// Panics if `bytes` is shorter than [`RECORD_SIZE`]; callers slice
    /// record regions after validating the block length.
    #[inline]
    pub fn read_from(bytes: &[u8]) -> Self {
        let word = |i: usize| [bytes[i], bytes[i + 1], bytes[i + 2], bytes[i + 3]];
        Self {
            site_index: u32::from_le_bytes(word(0)),
            allele0: i32::from_le_bytes(word(4)),
            allele1: i32::from_le_bytes(word(8)),
            phase_score: f32::from_bits(u32::from_le_bytes(word(12))),
        }
    }

    /// Encode this record into the first [`RECORD_SIZE`] bytes of `bytes`.
    #[inline]
    pub fn write_into(&self, bytes: &mut [u8]) {
        bytes[0..4].copy_from_slice(&self.site_index.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.allele0.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.allele1.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.phase_score.to_bits().to_le_bytes());
    }

    /// Serialize to an owned 16-byte array.
    #[inline]
    pub fn to_bytes(&self) -> [u8; RECORD_SIZE] {
        let mut out = [0u8; RECORD_SIZE];
        self.write_into(&mut out);
        out
    }

    #[inline]
    pub fn allele0_index(&self) -> i32 {
        allele_index(self.allele0)
    }

    #[inline]
    pub fn allele1_index(&self) -> i32 {
        allele_index(self.allele1)
    }

    #[inline]
    pub fn is_heterozygous(&self) -> bool {
        self.allele0_index() != self.allele1_index()
    }

    /// The same call with its two alleles exchanged.
    ///
    /// The first allele stays unphased and the second carries the phase
    /// flag, so the encodings cannot simply be swapped.
    #[inline]
    pub fn switched(&self) -> Self {
        Self {
            allele0: encode_unphased(self.allele1_index()),
            allele1: encode_phased(self.allele0_index()),
            ..*self
        }
    }

    /// Score with missing confidence read as fully phased.
    #[inline]
    pub fn effective_score(&self) -> f32 {
        if self.phase_score.is_nan() {
            REPHASED_SCORE
        } else {
            self.phase_score
        }
    }

    /// Missing confidence, or a score of at least 1.0. Such records are
    /// never rephased again.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.phase_score.is_nan() || self.phase_score >= REPHASED_SCORE
    }

    /// Whether the record is a candidate for rephasing at `threshold`.
    /// Terminal records never are, whatever the threshold.
    #[inline]
    pub fn needs_rephasing(&self, threshold: f32) -> bool {
        !self.is_terminal() && self.phase_score < threshold
    }

    /// Whether the score is present and strictly below `threshold`.
    #[inline]
    pub fn is_low_score(&self, threshold: f32) -> bool {
        !self.phase_score.is_nan() && self.phase_score < threshold
    }

    /// Whether read evidence has already been written into this record.
    #[inline]
    pub fn is_rephased(&self) -> bool {
        !self.phase_score.is_nan() && self.phase_score > REPHASED_SCORE
    }

    /// Number of phase-informative reads encoded in a rephased score.
    #[inline]
    pub fn evidence_reads(&self) -> u32 {
        if self.is_rephased() {
            (self.phase_score - REPHASED_SCORE) as u32
        } else {
            0
        }
    }

    /// Render as `site a0|a1 pp` for logs.
    pub fn describe(&self) -> String {
        format!(
            "{} {}{}{} PP:{}",
            self.site_index,
            self.allele0_index(),
            if is_phased(self.allele1) { '|' } else { '/' },
            self.allele1_index(),
            self.phase_score
        )
    }
}
