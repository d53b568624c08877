//! Prediction log persistence layer
//!
//! Provides file-based persistence for predictions with:
//! - JSON-lines format for append-only writes
//! - Automatic rotation based on size/time
//! - Filtered, paginated queries (newest first)
//! - Aggregate statistics over all or recent predictions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use toxiscan_core::{PredictionResult, PredictionSource, Result};
use tracing::{debug, info, warn};

const CURRENT_FILE: &str = "predictions_current.jsonl";

/// Default page size for queries without an explicit limit
pub const DEFAULT_QUERY_LIMIT: usize = 100;

/// Configuration for prediction persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Disable to run without a prediction log
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Directory to store prediction files
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Maximum file size before rotation (bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Maximum age before rotation (seconds)
    #[serde(default = "default_max_file_age")]
    pub max_file_age_secs: u64,

    /// Retain rotated files for this many days
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Flush to disk after this many records
    #[serde(default = "default_flush_interval")]
    pub flush_interval: usize,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            data_dir: default_data_dir(),
            max_file_size: default_max_file_size(),
            max_file_age_secs: default_max_file_age(),
            retention_days: default_retention_days(),
            flush_interval: default_flush_interval(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data/predictions")
}

fn default_max_file_size() -> u64 {
    50 * 1024 * 1024 // 50MB
}

fn default_max_file_age() -> u64 {
    86400 // 24 hours
}

fn default_retention_days() -> u32 {
    30
}

fn default_flush_interval() -> usize {
    1 // Statistics endpoints read the files directly
}

/// One persisted prediction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Unique record ID
    pub id: String,

    /// The prediction as returned to the caller
    #[serde(flatten)]
    pub result: PredictionResult,

    /// Which endpoint produced the prediction
    pub source: PredictionSource,

    /// Video the comment belongs to, for `youtube` predictions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PredictionRecord {
    /// Create a new record stamped with the current time
    pub fn new(result: PredictionResult, source: PredictionSource) -> Self {
        Self {
            id: generate_record_id(),
            result,
            source,
            video_id: None,
            created_at: Utc::now(),
        }
    }

    /// Set video ID
    pub fn with_video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// Override the timestamp
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

fn generate_record_id() -> String {
    format!("pred_{}", uuid::Uuid::new_v4())
}

/// Prediction file writer with rotation support
pub struct PredictionWriter {
    config: PersistenceConfig,
    current_file: Option<BufWriter<File>>,
    current_path: Option<PathBuf>,
    current_size: u64,
    current_start: SystemTime,
    records_since_flush: usize,
}

impl PredictionWriter {
    /// Create a new writer, creating the data directory if needed
    pub fn new(config: PersistenceConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let mut writer = Self {
            config,
            current_file: None,
            current_path: None,
            current_size: 0,
            current_start: SystemTime::now(),
            records_since_flush: 0,
        };

        writer.open_new_file()?;
        Ok(writer)
    }

    /// Append a record
    pub fn write_record(&mut self, record: &PredictionRecord) -> Result<()> {
        if self.should_rotate() {
            self.rotate()?;
        }

        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let bytes = line.as_bytes();

        if let Some(ref mut writer) = self.current_file {
            writer.write_all(bytes)?;
            self.current_size += bytes.len() as u64;
            self.records_since_flush += 1;

            if self.records_since_flush >= self.config.flush_interval {
                writer.flush()?;
                self.records_since_flush = 0;
            }
        }

        Ok(())
    }

    /// Force flush to disk
    pub fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
            self.records_since_flush = 0;
        }
        Ok(())
    }

    fn should_rotate(&self) -> bool {
        if self.current_size >= self.config.max_file_size {
            return true;
        }

        let age = SystemTime::now()
            .duration_since(self.current_start)
            .unwrap_or_default();
        age.as_secs() >= self.config.max_file_age_secs
    }

    fn rotate(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.current_file {
            writer.flush()?;
        }
        self.current_file = None;

        if let Some(ref current_path) = self.current_path {
            let rotated_name = format!(
                "predictions_{}.jsonl",
                Utc::now().format("%Y%m%dT%H%M%S%.6f")
            );
            let rotated_path = self.config.data_dir.join(&rotated_name);

            if let Err(e) = std::fs::rename(current_path, &rotated_path) {
                warn!("Failed to rotate prediction file: {}", e);
            } else {
                info!("Rotated prediction file to: {:?}", rotated_path);
            }
        }

        self.open_new_file()?;

        if let Err(e) = self.cleanup_old_files() {
            warn!("Failed to cleanup old prediction files: {}", e);
        }

        Ok(())
    }

    fn open_new_file(&mut self) -> Result<()> {
        let path = self.config.data_dir.join(CURRENT_FILE);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;

        self.current_size = file.metadata()?.len();
        self.current_start = SystemTime::now();
        self.current_file = Some(BufWriter::new(file));
        self.current_path = Some(path);
        self.records_since_flush = 0;

        Ok(())
    }

    fn cleanup_old_files(&self) -> Result<()> {
        let retention_secs = self.config.retention_days as u64 * 86400;
        let cutoff = SystemTime::now() - Duration::from_secs(retention_secs);

        for entry in std::fs::read_dir(&self.config.data_dir)? {
            let entry = entry?;
            let path = entry.path();

            if path.file_name().is_some_and(|n| n == CURRENT_FILE) {
                continue;
            }

            if let Ok(modified) = entry.metadata().and_then(|m| m.modified()) {
                if modified < cutoff {
                    info!("Removing old prediction file: {:?}", path);
                    std::fs::remove_file(&path)?;
                }
            }
        }

        Ok(())
    }
}

/// Query filter for predictions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionQuery {
    pub is_toxic: Option<bool>,
    pub source: Option<PredictionSource>,
    pub video_id: Option<String>,

    /// Maximum results to return
    pub limit: Option<usize>,

    /// Offset for pagination
    pub offset: Option<usize>,
}

impl PredictionQuery {
    /// Create a new empty query
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by decision
    pub fn is_toxic(mut self, is_toxic: bool) -> Self {
        self.is_toxic = Some(is_toxic);
        self
    }

    /// Filter by source
    pub fn source(mut self, source: PredictionSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Filter by video ID
    pub fn video_id(mut self, video_id: impl Into<String>) -> Self {
        self.video_id = Some(video_id.into());
        self
    }

    /// Set limit and offset
    pub fn paginate(mut self, limit: usize, offset: usize) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Set just limit
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    fn matches(&self, record: &PredictionRecord) -> bool {
        if let Some(is_toxic) = self.is_toxic {
            if record.result.is_toxic != is_toxic {
                return false;
            }
        }

        if let Some(source) = self.source {
            if record.source != source {
                return false;
            }
        }

        if let Some(ref video_id) = self.video_id {
            if record.video_id.as_ref() != Some(video_id) {
                return false;
            }
        }

        true
    }
}

/// Aggregate statistics over a set of predictions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionStatistics {
    pub total_predictions: usize,
    pub toxic_count: usize,
    pub not_toxic_count: usize,
    pub toxic_percentage: f64,
    pub not_toxic_percentage: f64,
    pub average_confidence: f64,
}

impl PredictionStatistics {
    /// Compute statistics over the given records
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a PredictionRecord>) -> Self {
        let mut total = 0usize;
        let mut toxic = 0usize;
        let mut confidence_sum = 0.0;

        for record in records {
            total += 1;
            if record.result.is_toxic {
                toxic += 1;
            }
            confidence_sum += record.result.confidence;
        }

        if total == 0 {
            return Self::default();
        }

        let not_toxic = total - toxic;
        Self {
            total_predictions: total,
            toxic_count: toxic,
            not_toxic_count: not_toxic,
            toxic_percentage: toxic as f64 / total as f64 * 100.0,
            not_toxic_percentage: not_toxic as f64 / total as f64 * 100.0,
            average_confidence: confidence_sum / total as f64,
        }
    }
}

/// Prediction reader for querying persisted records
pub struct PredictionReader {
    config: PersistenceConfig,
}

impl PredictionReader {
    /// Create a new prediction reader
    pub fn new(config: PersistenceConfig) -> Self {
        Self { config }
    }

    /// All records, newest first
    fn load_all(&self) -> Result<Vec<PredictionRecord>> {
        let mut files = Vec::new();
        match std::fs::read_dir(&self.config.data_dir) {
            Ok(entries) => {
                for entry in entries {
                    let path = entry?.path();
                    if path.extension().is_some_and(|e| e == "jsonl") {
                        files.push(path);
                    }
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        }

        // Rotated files carry a timestamp and sort before the current file
        files.sort();

        let mut records = Vec::new();
        for path in &files {
            read_file(path, &mut records)?;
        }

        records.reverse();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Query records, newest first
    pub fn query(&self, query: &PredictionQuery) -> Result<Vec<PredictionRecord>> {
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(DEFAULT_QUERY_LIMIT);

        Ok(self
            .load_all()?
            .into_iter()
            .filter(|record| query.matches(record))
            .skip(offset)
            .take(limit)
            .collect())
    }

    /// Count records matching the query, ignoring pagination
    pub fn count(&self, query: &PredictionQuery) -> Result<usize> {
        Ok(self
            .load_all()?
            .iter()
            .filter(|record| query.matches(record))
            .count())
    }

    /// Statistics over every persisted prediction
    pub fn statistics(&self) -> Result<PredictionStatistics> {
        Ok(PredictionStatistics::from_records(&self.load_all()?))
    }

    /// Statistics over the `limit` most recent predictions
    pub fn recent_statistics(&self, limit: usize) -> Result<PredictionStatistics> {
        let records = self.load_all()?;
        Ok(PredictionStatistics::from_records(records.iter().take(limit)))
    }
}

fn read_file(path: &Path, records: &mut Vec<PredictionRecord>) -> Result<()> {
    let reader = BufReader::new(File::open(path)?);

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<PredictionRecord>(&line) {
            Ok(record) => records.push(record),
            Err(e) => debug!("Failed to parse prediction record: {}", e),
        }
    }

    Ok(())
}
