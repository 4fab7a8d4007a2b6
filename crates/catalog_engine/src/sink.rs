use catalog_core::{CategoryResult, CATEGORY_URL_COLUMN};
use chrono::{Local, NaiveDate};
use thiserror::Error;

use crate::config::OutputSettings;
use crate::filename::output_filename;
use crate::persist::{write_atomically, PersistError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReceipt {
    pub location: String,
    pub rows: usize,
}

/// Persists one finished category.
#[async_trait::async_trait]
pub trait ResultSink: Send + Sync {
    async fn write(&self, result: &CategoryResult) -> Result<SinkReceipt, SinkError>;
}

/// One CSV file per category: UTF-8 with BOM, `category_url` followed by
/// the configured field columns.
#[derive(Debug, Clone)]
pub struct CsvResultSink {
    settings: OutputSettings,
    columns: Vec<String>,
    captured: Option<NaiveDate>,
}

impl CsvResultSink {
    pub fn new(settings: OutputSettings, columns: Vec<String>) -> Self {
        let captured = settings.date_stamp.then(|| Local::now().date_naive());
        Self {
            settings,
            columns,
            captured,
        }
    }

    /// Overrides the date used in file names (only when date stamping is on).
    pub fn with_capture_date(mut self, date: NaiveDate) -> Self {
        if self.settings.date_stamp {
            self.captured = Some(date);
        }
        self
    }

    pub fn filename_for(&self, category_id: &str) -> String {
        output_filename(&self.settings.file_prefix, category_id, self.captured)
    }

    fn render(&self, result: &CategoryResult) -> Result<Vec<u8>, SinkError> {
        let mut writer = csv::Writer::from_writer(UTF8_BOM.to_vec());

        let mut header = Vec::with_capacity(self.columns.len() + 1);
        header.push(CATEGORY_URL_COLUMN);
        header.extend(self.columns.iter().map(String::as_str));
        writer.write_record(&header)?;

        let category_url = result.base_url.as_str();
        for record in &result.records {
            let mut row = Vec::with_capacity(header.len());
            row.push(category_url);
            row.extend(
                self.columns
                    .iter()
                    .map(|column| record.get(column).unwrap_or("")),
            );
            writer.write_record(&row)?;
        }

        writer.into_inner().map_err(|err| SinkError::Io(err.into_error()))
    }
}

#[async_trait::async_trait]
impl ResultSink for CsvResultSink {
    async fn write(&self, result: &CategoryResult) -> Result<SinkReceipt, SinkError> {
        let bytes = self.render(result)?;
        let filename = self.filename_for(&result.category_id);
        let path = write_atomically(&self.settings.directory, &filename, &bytes)?;
        Ok(SinkReceipt {
            location: path.display().to_string(),
            rows: result.records.len(),
        })
    }
}
