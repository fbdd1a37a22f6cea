//! Scratch files holding sorted runs.
//!
//! A run is a sequence of length-prefixed `postcard` frames (`u32` LE length,
//! then the encoded [`Row`]). Files are anonymous temp files created inside the
//! sort pass's directory: they disappear when closed, and the directory itself
//! is removed when the pass ends.

use crate::error::{PipelineError, Result};
use crate::Row;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

pub(crate) struct SpillWriter {
    out: BufWriter<File>,
    rows: usize,
}

impl SpillWriter {
    pub(crate) fn create(dir: &Path) -> Result<Self> {
        let file = tempfile::tempfile_in(dir)
            .map_err(|e| PipelineError::resource("create spill file", e))?;
        Ok(Self {
            out: BufWriter::new(file),
            rows: 0,
        })
    }

    pub(crate) fn write(&mut self, row: &Row) -> Result<()> {
        let frame = postcard::to_allocvec(row)?;
        let len = u32::try_from(frame.len()).map_err(|_| {
            PipelineError::resource(
                "write spill file",
                io::Error::new(io::ErrorKind::InvalidData, "row larger than 4 GiB"),
            )
        })?;
        self.out
            .write_all(&len.to_le_bytes())
            .and_then(|()| self.out.write_all(&frame))
            .map_err(|e| PipelineError::resource("write spill file", e))?;
        self.rows += 1;
        Ok(())
    }

    pub(crate) fn rows(&self) -> usize {
        self.rows
    }

    /// Flush and rewind the file for reading.
    pub(crate) fn finish(self) -> Result<SpillReader> {
        let mut file = self
            .out
            .into_inner()
            .map_err(|e| PipelineError::resource("flush spill file", e.into_error()))?;
        file.seek(SeekFrom::Start(0))
            .map_err(|e| PipelineError::resource("rewind spill file", e))?;
        Ok(SpillReader {
            input: BufReader::new(file),
            remaining: self.rows,
            frame: Vec::new(),
        })
    }
}

pub(crate) struct SpillReader {
    input: BufReader<File>,
    remaining: usize,
    frame: Vec<u8>,
}

impl SpillReader {
    fn read_row(&mut self) -> Result<Row> {
        let mut len = [0u8; 4];
        self.input
            .read_exact(&mut len)
            .map_err(|e| PipelineError::resource("read spill file", e))?;
        self.frame.resize(u32::from_le_bytes(len) as usize, 0);
        self.input
            .read_exact(&mut self.frame)
            .map_err(|e| PipelineError::resource("read spill file", e))?;
        Ok(postcard::from_bytes(&self.frame)?)
    }
}

impl Iterator for SpillReader {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.read_row())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{row, Value};

    #[test]
    fn frames_survive_a_spill() -> Result<()> {
        let dir = tempfile::tempdir().map_err(|e| PipelineError::resource("test dir", e))?;
        let rows = vec![
            row! { "text" => "héllo", "n" => 3 },
            row! { "pt" => Value::List(vec![Value::float(37.5), Value::float(-55.25)]), "ok" => true },
            row! { "none" => Value::Null },
        ];
        let mut w = SpillWriter::create(dir.path())?;
        for r in &rows {
            w.write(r)?;
        }
        assert_eq!(w.rows(), 3);
        let back = w.finish()?.collect::<Result<Vec<_>>>()?;
        assert_eq!(back, rows);
        Ok(())
    }
}
