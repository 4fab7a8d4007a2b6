use crate::{Effect, Msg, NavigationResult, PaginationSignal, PaginationState, Phase, TerminationReason};

/// Pure update function: applies a message to the pagination state and
/// returns the effects the runner must execute next.
///
/// Messages that do not belong to the current phase are ignored.
pub fn update(mut state: PaginationState, msg: Msg) -> (PaginationState, Vec<Effect>) {
    if state.is_terminal() {
        return (state, Vec::new());
    }

    let effects = match (state.phase().clone(), msg) {
        (_, Msg::Cancelled) => terminate(&mut state, TerminationReason::Cancelled),
        (_, Msg::DeadlineExceeded) => terminate(&mut state, TerminationReason::DeadlineExceeded),
        (Phase::Start, Msg::Begin) => {
            if state.limits().max_pages == 0 {
                terminate(&mut state, TerminationReason::PageLimit)
            } else {
                vec![navigate(&state)]
            }
        }
        (Phase::Start, Msg::Navigated(NavigationResult::Failed)) => {
            terminate(&mut state, TerminationReason::NavigationFailed)
        }
        (Phase::Start, Msg::Navigated(NavigationResult::Success)) => {
            if state.needs_interstitials() {
                state.set_phase(Phase::Dismiss);
                vec![Effect::DismissInterstitials]
            } else {
                state.set_phase(Phase::AwaitReady);
                vec![Effect::AwaitReady]
            }
        }
        (Phase::Dismiss, Msg::InterstitialsDismissed) => {
            state.mark_interstitials_done();
            state.set_phase(Phase::AwaitReady);
            vec![Effect::AwaitReady]
        }
        (Phase::AwaitReady, Msg::ReadinessResolved { ready: false }) => {
            terminate(&mut state, TerminationReason::EndOfListing)
        }
        (Phase::AwaitReady, Msg::ReadinessResolved { ready: true }) => {
            state.set_phase(Phase::Stabilize);
            vec![Effect::Stabilize]
        }
        (Phase::Stabilize, Msg::Stabilized) => {
            state.set_phase(Phase::Extract);
            vec![Effect::ExtractCards]
        }
        (Phase::Extract, Msg::CardsExtracted { records }) => {
            state.accept_page(records);
            state.set_phase(Phase::DecideContinuation);
            vec![Effect::ProbeContinuation]
        }
        (Phase::DecideContinuation, Msg::ContinuationProbed(signal)) => match signal {
            PaginationSignal::NoNext => terminate(&mut state, TerminationReason::NoNextControl),
            PaginationSignal::NextDisabled => terminate(&mut state, TerminationReason::LastPage),
            PaginationSignal::HasNext => {
                if state.advance() {
                    state.set_phase(Phase::Start);
                    vec![navigate(&state)]
                } else {
                    terminate(&mut state, TerminationReason::PageLimit)
                }
            }
        },
        (Phase::DecideContinuation, Msg::PageFault { message }) => {
            // The page's records are already accepted; a retry would duplicate them.
            terminate(&mut state, TerminationReason::RenderFailed { message })
        }
        (
            Phase::Dismiss | Phase::AwaitReady | Phase::Stabilize | Phase::Extract,
            Msg::PageFault { message },
        ) => {
            if state.register_fault() {
                state.set_phase(Phase::Start);
                vec![navigate(&state)]
            } else {
                terminate(&mut state, TerminationReason::RenderFailed { message })
            }
        }
        _ => Vec::new(),
    };

    (state, effects)
}

fn navigate(state: &PaginationState) -> Effect {
    Effect::Navigate {
        url: state.current_url(),
        cursor: state.cursor().clone(),
    }
}

fn terminate(state: &mut PaginationState, reason: TerminationReason) -> Vec<Effect> {
    state.set_phase(Phase::Terminal(reason.clone()));
    vec![Effect::Finish { reason }]
}
