use crate::models::MergedRecord;
use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Append-only CSV destination for merged records.
///
/// The header row is written only when the file does not exist yet, so
/// repeated runs keep extending the same table.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append `records`, writing the header first if the file is new
    pub fn append(&self, records: &[MergedRecord]) -> Result<()> {
        let is_new = !self.path.exists();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open {}", self.path.display()))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file);

        for record in records {
            writer
                .serialize(record)
                .with_context(|| format!("Failed to write row for {:?}", record.url))?;
        }
        writer
            .flush()
            .with_context(|| format!("Failed to flush {}", self.path.display()))?;

        debug!("Appended {} row(s) to {}", records.len(), self.path.display());
        Ok(())
    }
}

/// Handle to the task that owns the sink
pub struct SinkWriter {
    sender: mpsc::Sender<MergedRecord>,
    handle: JoinHandle<Result<usize>>,
}

impl SinkWriter {
    /// Move `sink` into a dedicated writer task fed by a bounded channel.
    ///
    /// Records are appended one by one in the order they are received.
    pub fn spawn(sink: CsvSink, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<MergedRecord>(capacity.max(1));

        let handle = tokio::spawn(async move {
            let mut written = 0;
            while let Some(record) = receiver.recv().await {
                if let Err(e) = sink.append(std::slice::from_ref(&record)) {
                    error!("Sink write failed: {:#}", e);
                    return Err(e);
                }
                written += 1;
            }
            info!("💾 Wrote {} record(s) to {}", written, sink.path().display());
            Ok(written)
        });

        Self { sender, handle }
    }

    /// A sender for crawl tasks; the writer stops once every sender is dropped
    pub fn sender(&self) -> mpsc::Sender<MergedRecord> {
        self.sender.clone()
    }

    /// Close the channel and wait for pending records to be written
    pub async fn finish(self) -> Result<usize> {
        let Self { sender, handle } = self;
        drop(sender);
        handle.await.context("Sink writer task panicked")?
    }
}
