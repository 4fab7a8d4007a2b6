use engine_logging::{engine_debug, engine_warn};

use crate::config::StabilizeSettings;
use crate::pacing::uniform_pause;
use crate::{PageSource, SourceError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StabilizeOutcome {
    /// Two consecutive polls reported the same count.
    Settled { polls: u32, cards: usize },
    /// `max_rounds` polls elapsed while the count kept changing.
    GuardTripped { polls: u32, cards: usize },
}

/// Scrolls until the number of rendered cards stops growing.
///
/// The initial count is read once; every round then scrolls, pauses and
/// re-counts. `polls` counts the re-counts, not the initial read.
pub async fn stabilize(
    source: &dyn PageSource,
    scope: &str,
    settings: &StabilizeSettings,
) -> Result<StabilizeOutcome, SourceError> {
    let mut last = source.card_count(scope).await?;
    let max_rounds = settings.max_rounds.max(1);

    for round in 1..=max_rounds {
        source.trigger_scroll(settings.scroll_px).await?;
        tokio::time::sleep(uniform_pause(settings.pause_min_ms, settings.pause_max_ms)).await;
        let current = source.card_count(scope).await?;
        if current == last {
            engine_debug!("card count settled at {} after {} polls", current, round);
            return Ok(StabilizeOutcome::Settled {
                polls: round,
                cards: current,
            });
        }
        last = current;
    }

    engine_warn!(
        "card count still changing after {} polls (last {}); continuing with what rendered",
        max_rounds,
        last
    );
    Ok(StabilizeOutcome::GuardTripped {
        polls: max_rounds,
        cards: last,
    })
}
