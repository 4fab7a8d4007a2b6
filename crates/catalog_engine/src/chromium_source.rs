//! Page source backed by a Chromium session over the DevTools protocol.
use catalog_core::{CardHandle, PaginationSignal};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::js::EvaluationResult;
use chromiumoxide::Page;
use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::{BrowserSettings, NextControl};
use crate::page_source::PageSourceFactory;
use crate::{PageSource, ProbeMiss, SourceError, SourceErrorKind};

pub struct ChromiumPageSource {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
}

#[derive(Debug, Deserialize)]
struct ProbeReply {
    state: String,
    #[serde(default)]
    values: Vec<String>,
    #[serde(default)]
    flag: bool,
}

#[derive(Clone, Copy)]
enum ProbeMode {
    First,
    All,
    Ancestor,
}

impl ProbeMode {
    fn as_js(self) -> &'static str {
        match self {
            ProbeMode::First => "first",
            ProbeMode::All => "all",
            ProbeMode::Ancestor => "ancestor",
        }
    }
}

impl ChromiumPageSource {
    pub async fn launch(settings: &BrowserSettings) -> Result<Self, SourceError> {
        let mut builder = BrowserConfig::builder()
            .window_size(settings.window_width, settings.window_height)
            .arg(format!("--user-agent={}", settings.user_agent));
        if !settings.headless {
            builder = builder.with_head();
        }
        let config = builder
            .build()
            .map_err(|err| SourceError::new(SourceErrorKind::Browser, err))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    engine_warn!("chromium handler event error: {}", err);
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(browser_error)?;
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
        })
    }

    pub async fn close(self) {
        let mut browser = self.browser.lock().await;
        if let Err(err) = browser.close().await {
            engine_warn!("failed to close chromium: {}", err);
        }
        self.handler.abort();
    }

    async fn eval<T: DeserializeOwned>(&self, script: String) -> Result<T, SourceError> {
        let result = self.page.evaluate(script).await.map_err(browser_error)?;
        decode_value(result)
    }

    async fn probe(
        &self,
        card: &CardHandle,
        selector: &str,
        mode: ProbeMode,
    ) -> Result<ProbeReply, ProbeMiss> {
        let script = format!(
            r#"(() => {{
                const card = document.querySelectorAll({scope})[{index}];
                if (!card) return {{ state: "detached" }};
                const text = (el) => (el.innerText || el.textContent || "").trim();
                switch ({mode}) {{
                    case "ancestor":
                        return {{ state: "ok", flag: !!(card.parentElement && card.parentElement.closest({selector})) }};
                    case "all":
                        return {{ state: "ok", values: Array.from(card.querySelectorAll({selector})).map(text).filter((t) => t.length > 0) }};
                    default: {{
                        const el = card.querySelector({selector});
                        return el ? {{ state: "ok", values: [text(el)] }} : {{ state: "missing" }};
                    }}
                }}
            }})()"#,
            scope = js_string(card.scope()),
            index = card.index(),
            mode = js_string(mode.as_js()),
            selector = js_string(selector),
        );
        let reply: ProbeReply = self.eval(script).await?;
        probe_outcome(reply)
    }
}

#[async_trait::async_trait]
impl PageSource for ChromiumPageSource {
    async fn navigate(&self, url: &str) -> Result<(), SourceError> {
        self.page.goto(url).await.map_err(browser_error)?;
        engine_debug!("chromium loaded {}", url);
        Ok(())
    }

    async fn card_count(&self, scope: &str) -> Result<usize, SourceError> {
        self.eval(format!(
            "document.querySelectorAll({}).length",
            js_string(scope)
        ))
        .await
    }

    async fn find_all(&self, scope: &str) -> Result<Vec<CardHandle>, SourceError> {
        let count = self.card_count(scope).await?;
        Ok((0..count).map(|index| CardHandle::new(scope, index)).collect())
    }

    async fn read_text(&self, card: &CardHandle, selector: &str) -> Result<String, ProbeMiss> {
        let reply = self.probe(card, selector, ProbeMode::First).await?;
        reply.values.into_iter().next().ok_or(ProbeMiss::NotFound)
    }

    async fn read_all_text(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<Vec<String>, ProbeMiss> {
        Ok(self.probe(card, selector, ProbeMode::All).await?.values)
    }

    async fn in_excluded_section(
        &self,
        card: &CardHandle,
        selector: &str,
    ) -> Result<bool, ProbeMiss> {
        Ok(self.probe(card, selector, ProbeMode::Ancestor).await?.flag)
    }

    async fn trigger_scroll(&self, amount_px: u32) -> Result<(), SourceError> {
        // scrollBy yields undefined; there is no value to decode.
        self.page
            .evaluate(format!("window.scrollBy(0, {amount_px})"))
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<bool, SourceError> {
        self.eval(format!(
            "(() => {{ const el = document.querySelector({}); if (!el) return false; el.click(); return true; }})()",
            js_string(selector)
        ))
        .await
    }

    async fn pagination_signal(&self, next: &NextControl) -> Result<PaginationSignal, SourceError> {
        let state: String = self
            .eval(format!(
                r#"(() => {{
                    const el = document.querySelector({selector});
                    if (!el) return "none";
                    const disabled = el.classList.contains({class})
                        || el.hasAttribute("disabled")
                        || el.getAttribute("aria-disabled") === "true";
                    return disabled ? "disabled" : "next";
                }})()"#,
                selector = js_string(&next.selector),
                class = js_string(&next.disabled_class),
            ))
            .await?;
        Ok(signal_from_state(&state))
    }
}

/// Launches a fresh browser per category.
#[derive(Debug, Clone)]
pub struct ChromiumSourceFactory {
    settings: BrowserSettings,
}

impl ChromiumSourceFactory {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait::async_trait]
impl PageSourceFactory for ChromiumSourceFactory {
    async fn create(&self) -> Result<Box<dyn PageSource>, SourceError> {
        Ok(Box::new(ChromiumPageSource::launch(&self.settings).await?))
    }
}

fn decode_value<T: DeserializeOwned>(result: EvaluationResult) -> Result<T, SourceError> {
    result
        .into_value::<T>()
        .map_err(|err| SourceError::new(SourceErrorKind::Browser, err.to_string()))
}

fn probe_outcome(reply: ProbeReply) -> Result<ProbeReply, ProbeMiss> {
    match reply.state.as_str() {
        "ok" => Ok(reply),
        "detached" => Err(ProbeMiss::Detached),
        _ => Err(ProbeMiss::NotFound),
    }
}

fn signal_from_state(state: &str) -> PaginationSignal {
    match state {
        "next" => PaginationSignal::HasNext,
        "disabled" => PaginationSignal::NextDisabled,
        _ => PaginationSignal::NoNext,
    }
}

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

fn browser_error(err: chromiumoxide::error::CdpError) -> SourceError {
    SourceError::new(SourceErrorKind::Browser, err.to_string())
}
