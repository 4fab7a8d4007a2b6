use std::path::{Path, PathBuf};

use anyhow::Context;
use catalog_engine::{write_atomically, CategoryOutcome, CategoryReport, HarvestReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SUMMARY_FILE: &str = "harvest_summary.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: String,
    pub finished_at: String,
    pub cancelled: bool,
    pub categories_written: usize,
    pub records_total: usize,
    pub failures: usize,
    pub categories: Vec<CategorySummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub id: String,
    pub status: String,
    pub records: usize,
    pub pages_visited: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub termination: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CategorySummary {
    fn from_report(report: &CategoryReport) -> Self {
        let (status, file, error) = match &report.outcome {
            CategoryOutcome::Persisted(receipt) => ("written", Some(receipt.location.clone()), None),
            CategoryOutcome::Empty => ("empty", None, None),
            CategoryOutcome::SinkFailed { message } => ("sink_failed", None, Some(message.clone())),
            CategoryOutcome::Failed { message } => ("failed", None, Some(message.clone())),
            CategoryOutcome::Skipped => ("skipped", None, None),
        };
        Self {
            id: report.category_id.clone(),
            status: status.to_string(),
            records: report.records,
            pages_visited: report.pages_visited,
            termination: report.termination.as_ref().map(ToString::to_string),
            file,
            error,
        }
    }
}

impl RunSummary {
    pub fn from_report(
        report: &HarvestReport,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            started_at: started_at.to_rfc3339(),
            finished_at: finished_at.to_rfc3339(),
            cancelled: report.cancelled,
            categories_written: report.persisted(),
            records_total: report.total_records(),
            failures: report.failures(),
            categories: report
                .categories
                .iter()
                .map(CategorySummary::from_report)
                .collect(),
        }
    }

    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let json = serde_json::to_vec_pretty(self).context("serialize run summary")?;
        let path = write_atomically(dir, SUMMARY_FILE, &json)
            .with_context(|| format!("write {SUMMARY_FILE} to {}", dir.display()))?;
        Ok(path)
    }

    /// One line per category, for the terminal.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for category in &self.categories {
            let detail = category
                .file
                .as_deref()
                .or(category.error.as_deref())
                .or(category.termination.as_deref())
                .unwrap_or("");
            out.push_str(&format!(
                "{:<40} {:<12} {:>6} records  {}\n",
                category.id, category.status, category.records, detail
            ));
        }
        out.push_str(&format!(
            "{} of {} categories written, {} records, {} failures{}\n",
            self.categories_written,
            self.categories.len(),
            self.records_total,
            self.failures,
            if self.cancelled { " (cancelled)" } else { "" }
        ));
        out
    }
}
