use std::any::Any;
use std::panic::AssertUnwindSafe;

use catalog_core::{CategorySource, TerminationReason};
use engine_logging::{engine_error, engine_info, engine_warn};
use futures_util::{FutureExt, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::HarvestConfig;
use crate::controller::PaginationController;
use crate::progress::{HarvestEvent, ProgressSink};
use crate::sink::{ResultSink, SinkReceipt};
use crate::{PageSource, PageSourceFactory};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryOutcome {
    Persisted(SinkReceipt),
    /// Pagination produced no records; nothing was written.
    Empty,
    SinkFailed { message: String },
    /// The category aborted (panic or page source unavailable).
    Failed { message: String },
    /// Cancellation arrived before the category started.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryReport {
    pub category_id: String,
    pub records: usize,
    pub pages_visited: u32,
    pub termination: Option<TerminationReason>,
    pub outcome: CategoryOutcome,
}

impl CategoryReport {
    fn without_result(category_id: String, outcome: CategoryOutcome) -> Self {
        Self {
            category_id,
            records: 0,
            pages_visited: 0,
            termination: None,
            outcome,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarvestReport {
    pub categories: Vec<CategoryReport>,
    pub cancelled: bool,
}

impl HarvestReport {
    pub fn persisted(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| matches!(c.outcome, CategoryOutcome::Persisted(_)))
            .count()
    }

    pub fn total_records(&self) -> usize {
        self.categories.iter().map(|c| c.records).sum()
    }

    pub fn failures(&self) -> usize {
        self.categories
            .iter()
            .filter(|c| {
                matches!(
                    c.outcome,
                    CategoryOutcome::SinkFailed { .. } | CategoryOutcome::Failed { .. }
                )
            })
            .count()
    }
}

/// Harvests every configured category and hands non-empty results to the sink.
///
/// Failures are isolated per category: a panic, a sink error or an
/// unavailable page source is reported and the run moves on.
pub struct HarvestSession<'a> {
    controller: PaginationController,
    sink: &'a dyn ResultSink,
    progress: &'a dyn ProgressSink,
    cancel: CancellationToken,
    concurrency: usize,
}

impl<'a> HarvestSession<'a> {
    pub fn new(
        config: &HarvestConfig,
        sink: &'a dyn ResultSink,
        progress: &'a dyn ProgressSink,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            controller: PaginationController::new(config),
            sink,
            progress,
            cancel,
            concurrency: config.concurrency.max(1),
        }
    }

    /// Sequential run sharing one page source across all categories.
    pub async fn run(
        &self,
        source: &dyn PageSource,
        categories: Vec<CategorySource>,
    ) -> HarvestReport {
        let mut reports = Vec::with_capacity(categories.len());
        for category in categories {
            if self.cancel.is_cancelled() {
                reports.push(self.skip(category));
                continue;
            }
            reports.push(self.harvest_isolated(source, category).await);
        }
        self.finish(reports)
    }

    /// Parallel run across categories, each with its own page source.
    /// Pages within a category are still fetched strictly in order.
    pub async fn run_concurrent(
        &self,
        factory: &dyn PageSourceFactory,
        categories: Vec<CategorySource>,
    ) -> HarvestReport {
        let mut indexed: Vec<(usize, CategoryReport)> =
            futures_util::stream::iter(categories.into_iter().enumerate())
                .map(|(index, category)| async move {
                    if self.cancel.is_cancelled() {
                        return (index, self.skip(category));
                    }
                    let report = match factory.create().await {
                        Ok(source) => self.harvest_isolated(source.as_ref(), category).await,
                        Err(err) => {
                            engine_error!("no page source for {}: {}", category.id, err);
                            self.fail(category.id, err.to_string())
                        }
                    };
                    (index, report)
                })
                .buffer_unordered(self.concurrency)
                .collect()
                .await;
        indexed.sort_by_key(|(index, _)| *index);
        self.finish(indexed.into_iter().map(|(_, report)| report).collect())
    }

    async fn harvest_isolated(
        &self,
        source: &dyn PageSource,
        category: CategorySource,
    ) -> CategoryReport {
        let category_id = category.id.clone();
        match AssertUnwindSafe(self.harvest(source, category))
            .catch_unwind()
            .await
        {
            Ok(report) => report,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                engine_error!("category {} aborted: {}", category_id, message);
                self.fail(category_id, message)
            }
        }
    }

    async fn harvest(&self, source: &dyn PageSource, category: CategorySource) -> CategoryReport {
        engine_info!("===== category {} ({}) =====", category.id, category.base_url);
        self.progress.emit(HarvestEvent::CategoryStarted {
            category_id: category.id.clone(),
        });

        let result = self
            .controller
            .run(source, category, &self.cancel, self.progress)
            .await;
        self.progress.emit(HarvestEvent::CategoryFinished {
            category_id: result.category_id.clone(),
            records: result.records.len(),
            termination: result.termination.clone(),
        });

        let outcome = if result.is_empty() {
            engine_warn!("category {} produced no records; nothing written", result.category_id);
            CategoryOutcome::Empty
        } else {
            match self.sink.write(&result).await {
                Ok(receipt) => {
                    engine_info!(
                        "category {}: {} records written to {}",
                        result.category_id,
                        receipt.rows,
                        receipt.location
                    );
                    self.progress.emit(HarvestEvent::CategoryPersisted {
                        category_id: result.category_id.clone(),
                        location: receipt.location.clone(),
                    });
                    CategoryOutcome::Persisted(receipt)
                }
                Err(err) => {
                    engine_error!("category {}: write failed: {}", result.category_id, err);
                    self.progress.emit(HarvestEvent::CategoryFailed {
                        category_id: result.category_id.clone(),
                        message: err.to_string(),
                    });
                    CategoryOutcome::SinkFailed {
                        message: err.to_string(),
                    }
                }
            }
        };

        CategoryReport {
            records: result.records.len(),
            pages_visited: result.pages_visited,
            termination: Some(result.termination),
            category_id: result.category_id,
            outcome,
        }
    }

    fn skip(&self, category: CategorySource) -> CategoryReport {
        engine_info!("category {} skipped: run cancelled", category.id);
        CategoryReport::without_result(category.id, CategoryOutcome::Skipped)
    }

    fn fail(&self, category_id: String, message: String) -> CategoryReport {
        self.progress.emit(HarvestEvent::CategoryFailed {
            category_id: category_id.clone(),
            message: message.clone(),
        });
        CategoryReport::without_result(category_id, CategoryOutcome::Failed { message })
    }

    fn finish(&self, categories: Vec<CategoryReport>) -> HarvestReport {
        let report = HarvestReport {
            categories,
            cancelled: self.cancel.is_cancelled(),
        };
        engine_info!(
            "harvest complete: {} categories, {} written, {} records, {} failures",
            report.categories.len(),
            report.persisted(),
            report.total_records(),
            report.failures()
        );
        report
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
