//! Newline-delimited JSON streams between pipeline stages
//!
//! Writers stage output in a temporary file next to the target and rename it
//! into place on `finish`, so a reader never observes a half-written stream
//! and a rerun fully replaces the previous one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Lines, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Writes one JSON value per line, atomically replacing `target` on finish
pub struct JsonlWriter {
    out: BufWriter<NamedTempFile>,
    target: PathBuf,
    written: usize,
}

impl JsonlWriter {
    /// Open a staged writer for `target`, creating parent directories
    pub fn create<P: AsRef<Path>>(target: P) -> Result<Self> {
        let target = target.as_ref().to_path_buf();
        let dir = parent_dir(&target);
        std::fs::create_dir_all(&dir)?;
        let tmp = NamedTempFile::new_in(&dir)?;
        Ok(Self {
            out: BufWriter::new(tmp),
            target,
            written: 0,
        })
    }

    /// Append one record
    pub fn write<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and move the staged file over the target
    pub fn finish(self) -> Result<usize> {
        let tmp = self.out.into_inner().map_err(|e| e.into_error())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.target).map_err(|e| e.error)?;
        Ok(self.written)
    }
}

/// Lazily decodes one record per non-blank line
pub struct JsonlReader<T> {
    lines: Lines<BufReader<File>>,
    source_name: String,
    line_no: usize,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
            source_name: path.display().to_string(),
            line_no: 0,
            _marker: PhantomData,
        })
    }
}

impl<T: DeserializeOwned> Iterator for JsonlReader<T> {
    /// Parse failures surface as `Error::MalformedRecord` so callers can skip them
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Error::Io(e))),
            };
            self.line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(|e| {
                Error::malformed(self.source_name.clone(), self.line_no, e.to_string())
            }));
        }
    }
}

pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
