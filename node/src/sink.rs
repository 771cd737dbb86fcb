//! Append-only event sinks.

use crate::event::EventRecord;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Write-only destination for event records. Nothing is ever read back.
pub trait EventSink: Send {
    /// Append one record.
    fn record(&mut self, event: &EventRecord) -> io::Result<()>;

    /// Release the sink. Called once, when the node stops.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// One line per record in a text file, flushed after every write.
#[derive(Debug)]
pub struct FileSink {
    file: Option<File>,
}

impl FileSink {
    /// Create (truncating) the file and write the header line.
    pub fn create(path: &Path, header: &str) -> io::Result<Self> {
        let mut file = File::create(path)?;
        writeln!(file, "{header}")?;
        file.flush()?;
        Ok(Self { file: Some(file) })
    }
}

impl EventSink for FileSink {
    fn record(&mut self, event: &EventRecord) -> io::Result<()> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "event log already closed"))?;
        writeln!(file, "{event}")?;
        file.flush()
    }

    fn close(&mut self) -> io::Result<()> {
        match self.file.take() {
            Some(file) => file.sync_all(),
            None => Ok(()),
        }
    }
}

/// In-memory sink. Clones share the same record list.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<EventRecord>>>,
    closed: Arc<AtomicBool>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_else(|p| p.into_inner().clone())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, event: &EventRecord) -> io::Result<()> {
        self.records.lock().unwrap_or_else(|p| p.into_inner()).push(*event);
        Ok(())
    }

    fn close(&mut self) -> io::Result<()> {
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
