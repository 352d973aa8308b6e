//! Batched, append-only result writer.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::{ResultRecord, ResultsHeader};
use crate::{ResultsError, ResultsResult};

/// Destination for per-sub-step result rows.
///
/// Rows of one sub-step are always handed over together so an
/// implementation never persists a partial sub-step.
pub trait RecordSink {
    fn push_substep(&mut self, rows: Vec<ResultRecord>) -> ResultsResult<()>;

    /// Persist everything buffered so far.
    fn flush(&mut self) -> ResultsResult<()>;

    /// Rows accepted since the sink was opened, including earlier sessions
    /// when resumed.
    fn rows_written(&self) -> u64;
}

/// When buffered rows are written out.
#[derive(Clone, Copy, Debug)]
pub struct FlushPolicy {
    pub max_rows: usize,
    pub max_interval: Duration,
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self {
            max_rows: 10_000,
            max_interval: Duration::from_secs(20),
        }
    }
}

/// JSON-lines file sink. The first flush creates (or truncates) the file and
/// writes the header line; later flushes append.
#[derive(Debug)]
pub struct ResultSink {
    path: PathBuf,
    header: ResultsHeader,
    policy: FlushPolicy,
    buffer: Vec<ResultRecord>,
    last_flush: Instant,
    file_started: bool,
    rows_total: u64,
    flushes: u64,
}

impl ResultSink {
    pub fn create(path: PathBuf, header: ResultsHeader, policy: FlushPolicy) -> Self {
        Self {
            path,
            header,
            policy,
            buffer: Vec::new(),
            last_flush: Instant::now(),
            file_started: false,
            rows_total: 0,
            flushes: 0,
        }
    }

    /// Continue appending to an existing results file that already holds
    /// `rows_already` rows.
    pub fn resume(
        path: PathBuf,
        header: ResultsHeader,
        policy: FlushPolicy,
        rows_already: u64,
    ) -> ResultsResult<Self> {
        if !path.exists() {
            return Err(ResultsError::InvalidPath {
                message: format!("cannot resume missing results file {}", path.display()),
            });
        }
        let mut sink = Self::create(path, header, policy);
        sink.file_started = true;
        sink.rows_total = rows_already;
        Ok(sink)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn buffered_rows(&self) -> usize {
        self.buffer.len()
    }

    pub fn flush_count(&self) -> u64 {
        self.flushes
    }

    fn due(&self) -> bool {
        self.buffer.len() >= self.policy.max_rows
            || self.last_flush.elapsed() >= self.policy.max_interval
    }

    fn write_buffer(&mut self) -> ResultsResult<()> {
        let file = if self.file_started {
            OpenOptions::new().append(true).open(&self.path)?
        } else {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            File::create(&self.path)?
        };
        let mut writer = BufWriter::new(file);
        if !self.file_started {
            serde_json::to_writer(&mut writer, &self.header)?;
            writer.write_all(b"\n")?;
        }
        for record in &self.buffer {
            serde_json::to_writer(&mut writer, record)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;

        debug!(
            path = %self.path.display(),
            rows = self.buffer.len(),
            total = self.rows_total,
            "flushed results"
        );
        self.file_started = true;
        self.buffer.clear();
        self.last_flush = Instant::now();
        self.flushes += 1;
        Ok(())
    }
}

impl RecordSink for ResultSink {
    fn push_substep(&mut self, rows: Vec<ResultRecord>) -> ResultsResult<()> {
        self.rows_total += rows.len() as u64;
        self.buffer.extend(rows);
        if self.due() {
            self.write_buffer()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> ResultsResult<()> {
        if !self.file_started || !self.buffer.is_empty() {
            self.write_buffer()?;
        }
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.rows_total
    }
}

/// In-memory sink.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    pub rows: Vec<ResultRecord>,
    pub substeps: usize,
}

impl RecordSink for MemorySink {
    fn push_substep(&mut self, rows: Vec<ResultRecord>) -> ResultsResult<()> {
        self.rows.extend(rows);
        self.substeps += 1;
        Ok(())
    }

    fn flush(&mut self) -> ResultsResult<()> {
        Ok(())
    }

    fn rows_written(&self) -> u64 {
        self.rows.len() as u64
    }
}

/// Read a results file written by [`ResultSink`].
pub fn read_results(path: &Path) -> ResultsResult<(ResultsHeader, Vec<ResultRecord>)> {
    let malformed = |what: String| ResultsError::MalformedResults {
        path: path.display().to_string(),
        what,
    };

    let reader = BufReader::new(File::open(path)?);
    let mut lines = reader.lines();
    let header_line = lines
        .next()
        .ok_or_else(|| malformed("missing header line".to_string()))??;
    let header: ResultsHeader = serde_json::from_str(&header_line)
        .map_err(|e| malformed(format!("bad header: {e}")))?;

    let mut records = Vec::new();
    for (n, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line)
            .map_err(|e| malformed(format!("line {}: {e}", n + 2)))?;
        records.push(record);
    }
    Ok((header, records))
}
