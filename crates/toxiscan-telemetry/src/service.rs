//! Prediction log service for async prediction recording
//!
//! Provides:
//! - Non-blocking interface for recording predictions from request handlers
//! - Background persistence on a dedicated writer thread
//! - Query, statistics and monitoring interface

use crate::monitor::{MonitorReport, MonitorStatus};
use crate::persistence::{
    PersistenceConfig, PredictionQuery, PredictionReader, PredictionRecord,
    PredictionStatistics, PredictionWriter,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use toxiscan_core::{PredictionResult, PredictionSource, Result};
use tracing::{debug, error, info, warn};

/// Prediction log for managing persisted predictions
pub struct PredictionLog {
    /// Channel sender for async recording
    sender: mpsc::UnboundedSender<LogCommand>,

    reader: Arc<PredictionReader>,
}

/// Commands sent to the background writer
enum LogCommand {
    /// Record a prediction
    Record(Box<PredictionRecord>),

    /// Flush to disk and acknowledge once done
    Flush(oneshot::Sender<()>),

    /// Shutdown the writer
    Shutdown,
}

impl PredictionLog {
    /// Create a new prediction log and start its writer thread
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let reader = Arc::new(PredictionReader::new(config.clone()));

        // Open the writer up front so a bad data_dir fails startup
        let writer = PredictionWriter::new(config.clone())?;
        std::thread::Builder::new()
            .name("prediction-writer".to_string())
            .spawn(move || run_writer(writer, receiver))?;

        info!("Prediction log started with dir: {:?}", config.data_dir);

        Ok(Self { sender, reader })
    }

    /// Queue a prediction record for persistence
    pub fn record(&self, record: PredictionRecord) {
        if let Err(e) = self.sender.send(LogCommand::Record(Box::new(record))) {
            warn!("Failed to send prediction record: {}", e);
        }
    }

    /// Record a single prediction result
    pub fn record_result(
        &self,
        result: &PredictionResult,
        source: PredictionSource,
        video_id: Option<&str>,
    ) {
        let mut record = PredictionRecord::new(result.clone(), source);
        if let Some(video_id) = video_id {
            record = record.with_video_id(video_id);
        }
        self.record(record);
    }

    /// Record a batch of results from the same source
    pub fn record_batch(
        &self,
        results: &[PredictionResult],
        source: PredictionSource,
        video_id: Option<&str>,
    ) {
        for result in results {
            self.record_result(result, source, video_id);
        }
        debug!(count = results.len(), source = %source, "Queued prediction batch");
    }

    /// Flush and wait until every previously queued record is on disk
    pub async fn sync(&self) {
        let (ack, done) = oneshot::channel();
        if let Err(e) = self.sender.send(LogCommand::Flush(ack)) {
            warn!("Failed to send flush command: {}", e);
            return;
        }
        if done.await.is_err() {
            warn!("Prediction writer stopped before acknowledging flush");
        }
    }

    /// Query persisted predictions, newest first
    pub fn query(&self, query: &PredictionQuery) -> Result<Vec<PredictionRecord>> {
        self.reader.query(query)
    }

    /// Count predictions matching a query
    pub fn count(&self, query: &PredictionQuery) -> Result<usize> {
        self.reader.count(query)
    }

    /// Statistics over all persisted predictions
    pub fn statistics(&self) -> Result<PredictionStatistics> {
        self.reader.statistics()
    }

    /// Statistics over the most recent predictions
    pub fn recent_statistics(&self, limit: usize) -> Result<PredictionStatistics> {
        self.reader.recent_statistics(limit)
    }

    /// Compare recent confidence against the full history
    pub fn monitor(&self, recent_limit: usize) -> Result<MonitorReport> {
        let historical = self.reader.statistics()?;
        let recent = self.reader.recent_statistics(recent_limit)?;
        let report = MonitorReport::build(historical, recent, recent_limit);

        match report.status {
            MonitorStatus::Warning | MonitorStatus::Degraded => warn!(
                status = report.status.as_str(),
                confidence_drop = report.comparison.confidence_drop,
                "Prediction confidence dropped"
            ),
            _ => debug!(status = report.status.as_str(), "Monitor check"),
        }

        Ok(report)
    }
}

impl Drop for PredictionLog {
    fn drop(&mut self) {
        let _ = self.sender.send(LogCommand::Shutdown);
    }
}

/// Background writer loop
fn run_writer(mut writer: PredictionWriter, mut receiver: mpsc::UnboundedReceiver<LogCommand>) {
    while let Some(cmd) = receiver.blocking_recv() {
        match cmd {
            LogCommand::Record(record) => {
                if let Err(e) = writer.write_record(record.as_ref()) {
                    error!("Failed to write prediction record: {}", e);
                }
            }
            LogCommand::Flush(ack) => {
                if let Err(e) = writer.flush() {
                    error!("Failed to flush prediction writer: {}", e);
                }
                let _ = ack.send(());
            }
            LogCommand::Shutdown => {
                debug!("Prediction writer shutting down");
                break;
            }
        }
    }

    if let Err(e) = writer.flush() {
        error!("Failed to flush prediction writer on shutdown: {}", e);
    }
}
