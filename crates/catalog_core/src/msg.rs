use crate::{ExtractedRecord, PaginationSignal};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationResult {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Start harvesting the category at its first offset.
    Begin,
    /// The navigator finished with the given outcome.
    Navigated(NavigationResult),
    /// First-page overlays were handled (always best-effort).
    InterstitialsDismissed,
    /// Readiness polling finished; `ready` is false on timeout.
    ReadinessResolved { ready: bool },
    /// The lazy-loaded card count reached a fixed point (or its guard).
    Stabilized,
    /// Records of the current page, excluded cards already dropped.
    CardsExtracted { records: Vec<ExtractedRecord> },
    /// The next-page control was probed.
    ContinuationProbed(PaginationSignal),
    /// Rendering or extraction broke mid-page.
    PageFault { message: String },
    /// External cancellation.
    Cancelled,
    /// The per-category deadline expired.
    DeadlineExceeded,
}
