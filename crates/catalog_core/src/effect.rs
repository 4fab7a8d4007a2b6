use url::Url;

use crate::{PageCursor, TerminationReason};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate { url: Url, cursor: PageCursor },
    DismissInterstitials,
    AwaitReady,
    Stabilize,
    ExtractCards,
    ProbeContinuation,
    Finish { reason: TerminationReason },
}
