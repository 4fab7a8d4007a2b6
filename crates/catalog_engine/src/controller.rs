use std::collections::VecDeque;

use catalog_core::{
    update, CategoryResult, CategorySource, Effect, Msg, NavigationResult, PageCursor,
    PaginationState,
};
use engine_logging::{engine_debug, engine_info, engine_warn};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::config::{
    CatalogSchema, HarvestConfig, InterstitialSettings, PaginationSettings, ReadinessSettings,
    StabilizeSettings,
};
use crate::extract::ProbeExtractor;
use crate::interstitial::dismiss_interstitials;
use crate::navigator::{NavigationOutcome, RetryingNavigator};
use crate::pacing::pause_ms;
use crate::progress::{HarvestEvent, ProgressSink};
use crate::scroller::stabilize;
use crate::{PageSource, SourceError};

/// Runs the pagination state machine of one category against a page source.
#[derive(Debug, Clone)]
pub struct PaginationController {
    schema: CatalogSchema,
    pagination: PaginationSettings,
    readiness: ReadinessSettings,
    stabilize: StabilizeSettings,
    interstitials: InterstitialSettings,
    navigator: RetryingNavigator,
}

struct PageContext<'a> {
    source: &'a dyn PageSource,
    extractor: &'a ProbeExtractor,
    progress: &'a dyn ProgressSink,
}

impl PaginationController {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            pagination: config.pagination.clone(),
            readiness: config.readiness.clone(),
            stabilize: config.stabilize.clone(),
            interstitials: config.interstitials.clone(),
            navigator: RetryingNavigator::new(config.retry.clone()),
        }
    }

    /// Harvests every page of `category` until a terminal signal.
    ///
    /// Cancellation and the per-category deadline end the category with the
    /// records accumulated so far.
    pub async fn run(
        &self,
        source: &dyn PageSource,
        category: CategorySource,
        cancel: &CancellationToken,
        progress: &dyn ProgressSink,
    ) -> CategoryResult {
        let extractor = ProbeExtractor::new(
            category.id.clone(),
            self.schema.fields.clone(),
            self.schema.excluded_section.clone(),
        );
        let ctx = PageContext {
            source,
            extractor: &extractor,
            progress,
        };
        let deadline = self
            .pagination
            .category_deadline()
            .map(|limit| Instant::now() + limit);

        let (mut state, effects) = update(
            PaginationState::new(category, self.pagination.limits()),
            Msg::Begin,
        );
        let mut queue: VecDeque<Effect> = effects.into();

        while let Some(effect) = queue.pop_front() {
            let msg = match effect {
                Effect::Finish { reason } => {
                    engine_info!(
                        "category {} finished after {} page(s): {} ({} records)",
                        state.source().id,
                        state.pages_visited(),
                        reason,
                        state.records().len()
                    );
                    break;
                }
                effect => {
                    self.execute_guarded(&ctx, effect, state.cursor(), cancel, deadline)
                        .await
                }
            };
            let (next, effects) = update(state, msg);
            state = next;
            queue.extend(effects);
        }

        state.into_result()
    }

    async fn execute_guarded(
        &self,
        ctx: &PageContext<'_>,
        effect: Effect,
        cursor: &PageCursor,
        cancel: &CancellationToken,
        deadline: Option<Instant>,
    ) -> Msg {
        if cancel.is_cancelled() {
            return Msg::Cancelled;
        }
        let expiry = async {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                engine_warn!("category {} cancelled", cursor.category_id);
                Msg::Cancelled
            }
            _ = expiry => {
                engine_warn!("category {} hit its deadline", cursor.category_id);
                Msg::DeadlineExceeded
            }
            msg = self.execute(ctx, effect, cursor) => msg,
        }
    }

    async fn execute(&self, ctx: &PageContext<'_>, effect: Effect, cursor: &PageCursor) -> Msg {
        match effect {
            Effect::Navigate { url, cursor } => self.navigate(ctx, &url, &cursor).await,
            Effect::DismissInterstitials => {
                dismiss_interstitials(ctx.source, &self.schema, &self.interstitials).await;
                Msg::InterstitialsDismissed
            }
            Effect::AwaitReady => match self.await_ready(ctx.source).await {
                Ok(ready) => {
                    if !ready {
                        engine_info!(
                            "no cards on page {} of {}: end of category",
                            cursor.page_index + 1,
                            cursor.category_id
                        );
                    }
                    Msg::ReadinessResolved { ready }
                }
                Err(err) => page_fault("readiness poll", err),
            },
            Effect::Stabilize => {
                match stabilize(ctx.source, &self.schema.card_selector, &self.stabilize).await {
                    Ok(_) => Msg::Stabilized,
                    Err(err) => page_fault("stabilization", err),
                }
            }
            Effect::ExtractCards => self.extract_cards(ctx, cursor).await,
            Effect::ProbeContinuation => {
                match ctx.source.pagination_signal(&self.schema.next_control).await {
                    Ok(signal) => {
                        engine_debug!("page {} signal {:?}", cursor.page_index + 1, signal);
                        Msg::ContinuationProbed(signal)
                    }
                    Err(err) => page_fault("next-page probe", err),
                }
            }
            // Consumed by `run` before dispatch.
            Effect::Finish { .. } => Msg::Cancelled,
        }
    }

    async fn navigate(&self, ctx: &PageContext<'_>, url: &Url, cursor: &PageCursor) -> Msg {
        if !cursor.is_first_page() {
            pause_ms(self.pagination.between_pages_ms).await;
        }
        engine_info!("fetching page {}: {}", cursor.page_index + 1, url);
        match self.navigator.navigate(ctx.source, url.as_str()).await {
            NavigationOutcome::Success { .. } => Msg::Navigated(NavigationResult::Success),
            NavigationOutcome::Failed {
                attempts,
                last_error,
            } => {
                engine_warn!(
                    "giving up on {} after {} attempts: {}",
                    url,
                    attempts,
                    last_error
                );
                Msg::Navigated(NavigationResult::Failed)
            }
        }
    }

    async fn await_ready(&self, source: &dyn PageSource) -> Result<bool, SourceError> {
        let deadline = Instant::now() + self.readiness.timeout();
        loop {
            if source.card_count(&self.schema.card_selector).await? > 0 {
                return Ok(true);
            }
            if !source.is_dynamic() || Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(self.readiness.poll_interval()).await;
        }
    }

    async fn extract_cards(&self, ctx: &PageContext<'_>, cursor: &PageCursor) -> Msg {
        let cards = match ctx.source.find_all(&self.schema.card_selector).await {
            Ok(cards) => cards,
            Err(err) => return page_fault("card enumeration", err),
        };

        let mut records = Vec::with_capacity(cards.len());
        let mut excluded = 0;
        for card in &cards {
            match ctx.extractor.extract(ctx.source, card).await {
                Some(record) => records.push(record),
                None => excluded += 1,
            }
        }

        engine_info!(
            "page {} of {}: {} cards, {} records, {} excluded",
            cursor.page_index + 1,
            cursor.category_id,
            cards.len(),
            records.len(),
            excluded
        );
        ctx.progress.emit(HarvestEvent::PageHarvested {
            cursor: cursor.clone(),
            records: records.len(),
            excluded,
        });
        Msg::CardsExtracted { records }
    }
}

fn page_fault(stage: &str, err: SourceError) -> Msg {
    engine_warn!("{} failed: {}", stage, err);
    Msg::PageFault {
        message: format!("{stage}: {err}"),
    }
}
