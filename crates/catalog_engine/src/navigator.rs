use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};

use crate::config::RetrySettings;
use crate::pacing::{pause_ms, uniform_pause};
use crate::{PageSource, SourceError, SourceErrorKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    Success { attempts: u32 },
    Failed { attempts: u32, last_error: SourceError },
}

/// Navigation with bounded retries and jittered backoff between attempts.
#[derive(Debug, Clone)]
pub struct RetryingNavigator {
    settings: RetrySettings,
}

impl RetryingNavigator {
    pub fn new(settings: RetrySettings) -> Self {
        Self { settings }
    }

    pub async fn navigate(&self, source: &dyn PageSource, url: &str) -> NavigationOutcome {
        let attempts = self.settings.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match source.navigate(url).await {
                Ok(()) => {
                    engine_debug!("navigated to {} (attempt {}/{})", url, attempt, attempts);
                    pause_ms(self.settings.after_navigation_ms).await;
                    return NavigationOutcome::Success { attempts: attempt };
                }
                Err(err) => {
                    engine_warn!(
                        "navigation to {} failed (attempt {}/{}): {}",
                        url,
                        attempt,
                        attempts,
                        err
                    );
                    last_error = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.backoff()).await;
                    }
                }
            }
        }

        NavigationOutcome::Failed {
            attempts,
            last_error: last_error.unwrap_or_else(|| {
                SourceError::new(SourceErrorKind::Network, "no navigation attempt made")
            }),
        }
    }

    pub fn backoff(&self) -> Duration {
        uniform_pause(self.settings.min_wait_ms, self.settings.max_wait_ms)
    }
}
