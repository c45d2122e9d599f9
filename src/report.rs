//! Buffered tab-separated report output.
//!
//! Uses itoa for integer formatting and ryu for float formatting
//! to avoid allocation per field.

use crate::error::Result;
use std::io::{BufWriter, Write};

/// Buffer size for ReportWriter (1MB default).
const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Writer for the text reports of the store tools.
pub struct ReportWriter<W: Write> {
    writer: BufWriter<W>,
    itoa_buf: itoa::Buffer,
    ryu_buf: ryu::Buffer,
    at_line_start: bool,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(output: W) -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE, output)
    }

    pub fn with_capacity(capacity: usize, output: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(capacity, output),
            itoa_buf: itoa::Buffer::new(),
            ryu_buf: ryu::Buffer::new(),
            at_line_start: true,
        }
    }

    #[inline]
    fn separator(&mut self) -> Result<()> {
        if !self.at_line_start {
            self.writer.write_all(b"\t")?;
        }
        self.at_line_start = false;
        Ok(())
    }

    /// Write a text field.
    #[inline]
    pub fn field(&mut self, text: &str) -> Result<&mut Self> {
        self.separator()?;
        self.writer.write_all(text.as_bytes())?;
        Ok(self)
    }

    /// Write an integer field using itoa.
    #[inline]
    pub fn int<I: itoa::Integer>(&mut self, n: I) -> Result<&mut Self> {
        self.separator()?;
        self.writer.write_all(self.itoa_buf.format(n).as_bytes())?;
        Ok(self)
    }

    /// Write a float field using ryu; NaN is written as `nan`.
    #[inline]
    pub fn float(&mut self, f: f32) -> Result<&mut Self> {
        self.separator()?;
        if f.is_nan() {
            self.writer.write_all(b"nan")?;
        } else {
            self.writer.write_all(self.ryu_buf.format(f).as_bytes())?;
        }
        Ok(self)
    }

    /// Terminate the current line.
    #[inline]
    pub fn end_line(&mut self) -> Result<()> {
        self.writer.write_all(b"\n")?;
        self.at_line_start = true;
        Ok(())
    }

    /// Write a whole line as-is.
    pub fn line(&mut self, text: &str) -> Result<()> {
        self.writer.write_all(text.as_bytes())?;
        self.end_line()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> Result<W> {
        self.writer
            .into_inner()
            .map_err(|e| crate::error::PhaseError::Io(e.into_error()))
    }
}
