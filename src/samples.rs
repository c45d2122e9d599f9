//! Sample list files.
//!
//! One sample per non-empty line, either a bare name (the sample's index is
//! its line number among non-empty lines) or `index,name[,alignment_path]`.
//! Lines starting with `#` are ignored.

use crate::error::{PhaseError, Result};
use log::warn;
use memchr::{memchr, memchr_iter};
use rustc_hash::FxHashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// A sample of the call set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleInfo {
    /// Column of the sample in the call set.
    pub index: u32,
    pub name: String,
    /// Explicit alignment file, overriding any directory layout.
    pub alignment: Option<PathBuf>,
}

impl SampleInfo {
    pub fn new(index: u32, name: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            alignment: None,
        }
    }

    pub fn with_alignment<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.alignment = Some(path.into());
        self
    }
}

/// An ordered list of samples with lookups by index and by name.
#[derive(Debug, Clone, Default)]
pub struct SampleList {
    samples: Vec<SampleInfo>,
    by_index: FxHashMap<u32, usize>,
    by_name: FxHashMap<String, usize>,
}

impl SampleList {
    pub fn from_samples(samples: Vec<SampleInfo>) -> Self {
        let mut list = SampleList::default();
        for sample in samples {
            list.insert(sample);
        }
        list
    }

    fn insert(&mut self, sample: SampleInfo) {
        let pos = self.samples.len();
        if self.by_name.insert(sample.name.clone(), pos).is_some() {
            warn!("Sample {} is listed more than once", sample.name);
        }
        self.by_index.insert(sample.index, pos);
        self.samples.push(sample);
    }

    /// Load a sample list file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| PhaseError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&data)
    }

    /// Parse sample list content.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut list = SampleList::default();
        let mut start = 0;
        let mut line_no = 0;
        let mut ordinal = 0u32;
        let ends = memchr_iter(b'\n', data).chain(std::iter::once(data.len()));
        for end in ends {
            if start > data.len() {
                break;
            }
            line_no += 1;
            let mut line = &data[start..end];
            start = end + 1;
            if let Some(stripped) = line.strip_suffix(b"\r") {
                line = stripped;
            }
            let line = line.trim_ascii();
            if line.is_empty() || line[0] == b'#' {
                continue;
            }
            list.insert(parse_line(line, ordinal, line_no)?);
            ordinal += 1;
        }
        Ok(list)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SampleInfo> {
        self.samples.iter()
    }

    pub fn get(&self, pos: usize) -> Option<&SampleInfo> {
        self.samples.get(pos)
    }

    /// Sample whose call-set index is `index`.
    pub fn by_index(&self, index: u32) -> Option<&SampleInfo> {
        self.by_index.get(&index).map(|&p| &self.samples[p])
    }

    /// Position of `name` in this list.
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    /// Positions in this list of the names in `subset`, in subset order.
    ///
    /// Names missing from this list are logged and skipped.
    pub fn positions_of(&self, subset: &SampleList) -> Vec<u32> {
        subset
            .iter()
            .filter_map(|s| match self.position_of(&s.name) {
                Some(pos) => Some(pos as u32),
                None => {
                    warn!("Sample {} not found in the full sample list", s.name);
                    None
                }
            })
            .collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.name.as_str())
    }
}

fn field_str(field: &[u8], line_no: usize) -> Result<&str> {
    std::str::from_utf8(field).map_err(|_| PhaseError::SampleList {
        line: line_no,
        message: "not valid UTF-8".to_string(),
    })
}

fn parse_line(line: &[u8], ordinal: u32, line_no: usize) -> Result<SampleInfo> {
    let Some(comma) = memchr(b',', line) else {
        return Ok(SampleInfo::new(ordinal, field_str(line, line_no)?));
    };

    let index_field = field_str(&line[..comma], line_no)?.trim();
    let index: u32 = index_field.parse().map_err(|_| PhaseError::SampleList {
        line: line_no,
        message: format!("invalid sample index '{}'", index_field),
    })?;

    let rest = &line[comma + 1..];
    let (name, path) = match memchr(b',', rest) {
        Some(c) => (&rest[..c], Some(&rest[c + 1..])),
        None => (rest, None),
    };
    let name = field_str(name, line_no)?.trim();
    if name.is_empty() {
        return Err(PhaseError::SampleList {
            line: line_no,
            message: "empty sample name".to_string(),
        });
    }

    let mut info = SampleInfo::new(index, name);
    if let Some(path) = path {
        let path = field_str(path, line_no)?.trim();
        if !path.is_empty() {
            info = info.with_alignment(path);
        }
    }
    Ok(info)
}
