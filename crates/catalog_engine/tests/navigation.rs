mod support;

use std::time::Duration;

use catalog_core::PaginationSignal;
use catalog_engine::{
    dismiss_interstitials, stabilize, DismissReport, InterstitialSettings, NavigationOutcome,
    PageSource, RetrySettings, RetryingNavigator, SourceErrorKind, StabilizeOutcome,
    StabilizeSettings,
};
use pretty_assertions::assert_eq;
use support::{init_logging, schema, ScriptedPage, ScriptedSource, CARD, CONSENT};
use tokio::time::Instant;

const URL: &str = "https://shop.test/food/?offset=0";

#[tokio::test(start_paused = true)]
async fn navigation_gives_up_after_configured_attempts() {
    init_logging();
    let source = ScriptedSource::new().failing(URL, 10);
    let navigator = RetryingNavigator::new(RetrySettings::default());

    let started = Instant::now();
    let outcome = navigator.navigate(&source, URL).await;
    let elapsed = started.elapsed();

    match outcome {
        NavigationOutcome::Failed {
            attempts,
            last_error,
        } => {
            assert_eq!(attempts, 3);
            assert_eq!(last_error.kind, SourceErrorKind::Network);
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(source.navigations().len(), 3);
    // Two backoffs between three attempts, none after the last.
    assert!(elapsed >= Duration::from_millis(2 * 1_000), "{elapsed:?}");
    assert!(elapsed <= Duration::from_millis(2 * 2_500), "{elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn navigation_succeeds_after_transient_failures() {
    init_logging();
    let source = ScriptedSource::new()
        .page(URL, ScriptedPage::with_products(3, PaginationSignal::NoNext))
        .failing(URL, 2);
    let navigator = RetryingNavigator::new(RetrySettings::default());

    let outcome = navigator.navigate(&source, URL).await;

    assert_eq!(outcome, NavigationOutcome::Success { attempts: 3 });
    assert_eq!(source.navigations().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn stabilization_stops_when_count_repeats() {
    init_logging();
    let source = ScriptedSource::new().page(
        URL,
        ScriptedPage::with_products(5, PaginationSignal::HasNext).with_counts(vec![0, 5, 5]),
    );
    source.navigate(URL).await.unwrap();

    let outcome = stabilize(&source, CARD, &StabilizeSettings::default())
        .await
        .unwrap();

    assert_eq!(outcome, StabilizeOutcome::Settled { polls: 2, cards: 5 });
    assert_eq!(source.scrolls(), 2);
    assert_eq!(source.count_calls(), 3);
}

#[tokio::test(start_paused = true)]
async fn stabilization_keeps_scrolling_while_count_grows() {
    init_logging();
    let source = ScriptedSource::new().page(
        URL,
        ScriptedPage::with_products(24, PaginationSignal::HasNext)
            .with_counts(vec![8, 16, 24, 24]),
    );
    source.navigate(URL).await.unwrap();

    let outcome = stabilize(&source, CARD, &StabilizeSettings::default())
        .await
        .unwrap();

    assert_eq!(outcome, StabilizeOutcome::Settled { polls: 3, cards: 24 });
}

#[tokio::test(start_paused = true)]
async fn stabilization_guard_bounds_endless_growth() {
    init_logging();
    let source = ScriptedSource::new().page(
        URL,
        ScriptedPage::with_products(10, PaginationSignal::HasNext)
            .with_counts((1..=10).collect()),
    );
    source.navigate(URL).await.unwrap();
    let settings = StabilizeSettings {
        max_rounds: 4,
        ..StabilizeSettings::default()
    };

    let outcome = stabilize(&source, CARD, &settings).await.unwrap();

    assert_eq!(outcome, StabilizeOutcome::GuardTripped { polls: 4, cards: 5 });
    assert_eq!(source.scrolls(), 4);
}

#[tokio::test(start_paused = true)]
async fn consent_then_first_matching_close_control() {
    init_logging();
    let source = ScriptedSource::new()
        .clickable(CONSENT)
        .clickable(".icon-close");

    let report = dismiss_interstitials(&source, &schema(), &InterstitialSettings::default()).await;

    assert!(report.consent_accepted);
    assert_eq!(report.closed_with.as_deref(), Some(".icon-close"));
    assert_eq!(source.clicks(), vec![CONSENT.to_string(), ".icon-close".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn close_controls_stop_at_first_success() {
    init_logging();
    let source = ScriptedSource::new()
        .clickable(".modal-close")
        .clickable(".icon-close");

    let report = dismiss_interstitials(&source, &schema(), &InterstitialSettings::default()).await;

    assert!(!report.consent_accepted);
    assert_eq!(report.closed_with.as_deref(), Some(".modal-close"));
    assert_eq!(source.clicks(), vec![".modal-close".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn missing_interstitials_are_not_an_error() {
    init_logging();
    let source = ScriptedSource::new();

    let report = dismiss_interstitials(&source, &schema(), &InterstitialSettings::default()).await;

    assert_eq!(report, DismissReport::default());
    assert!(source.clicks().is_empty());
}
