use engine_logging::{engine_debug, engine_info};

use crate::config::{CatalogSchema, InterstitialSettings};
use crate::pacing::pause_ms;
use crate::PageSource;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DismissReport {
    pub consent_accepted: bool,
    /// Close control that dismissed an overlay, if any.
    pub closed_with: Option<String>,
}

/// Best-effort removal of consent banners and promotional overlays.
///
/// Tries the consent control first, then the close controls in priority
/// order, stopping at the first one that was found and clicked. Errors are
/// logged and never surface to the caller.
pub async fn dismiss_interstitials(
    source: &dyn PageSource,
    schema: &CatalogSchema,
    settings: &InterstitialSettings,
) -> DismissReport {
    let mut report = DismissReport::default();
    pause_ms(settings.settle_ms).await;

    if let Some(consent) = schema.consent_control.as_deref() {
        match source.click(consent).await {
            Ok(true) => {
                engine_info!("consent accepted via {}", consent);
                report.consent_accepted = true;
                pause_ms(settings.after_click_ms).await;
            }
            Ok(false) => engine_debug!("no consent control {}", consent),
            Err(err) => engine_debug!("consent control {} unavailable: {}", consent, err),
        }
    }

    for selector in &schema.close_controls {
        match source.click(selector).await {
            Ok(true) => {
                engine_info!("overlay closed via {}", selector);
                report.closed_with = Some(selector.clone());
                pause_ms(settings.after_click_ms).await;
                break;
            }
            Ok(false) => {}
            Err(err) => engine_debug!("close control {} unavailable: {}", selector, err),
        }
    }

    report
}
