//! The two independent state machines a defer instance drives (§4.E, §8
//! property 3): the main channel's four-state lifecycle, and the simpler
//! prefetch channel that never touches the rendered view.

/// The main channel's rendered state. Transitions are monotonic: once
/// `Complete` or `Failed`, an instance never goes back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainState {
    Placeholder,
    Loading,
    Complete,
    Failed,
}

/// The allowed edges are exactly {Placeholder→Loading, Placeholder→Complete,
/// Loading→Complete, Loading→Failed, Placeholder→Failed}. Placeholder→Complete
/// and Placeholder→Failed exist because a memoized load can already have
/// settled by the time a second instance's trigger fires (§4.D).
fn main_transition_allowed(from: MainState, to: MainState) -> bool {
    use MainState::*;
    matches!(
        (from, to),
        (Placeholder, Loading)
            | (Placeholder, Complete)
            | (Placeholder, Failed)
            | (Loading, Complete)
            | (Loading, Failed)
    )
}

/// The prefetch channel's state. It only tracks whether the load has been
/// kicked off and how it settled; it never drives a rendered view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchState {
    NotStarted,
    InProgress,
    Complete,
    Failed,
}

fn prefetch_transition_allowed(from: PrefetchState, to: PrefetchState) -> bool {
    use PrefetchState::*;
    matches!(
        (from, to),
        (NotStarted, InProgress)
            | (NotStarted, Complete)
            | (NotStarted, Failed)
            | (InProgress, Complete)
            | (InProgress, Failed)
    )
}

/// Owns a [`MainState`] and rejects illegal transitions instead of silently
/// applying them, surfacing the violation through [`crate::diagnostics`]
/// (§4.E: an illegal transition is a defect in this runtime, not user error).
#[derive(Debug, Clone, Copy)]
pub struct MainChannel {
    state: MainState,
}

impl MainChannel {
    pub fn new() -> Self {
        Self {
            state: MainState::Placeholder,
        }
    }

    pub fn state(&self) -> MainState {
        self.state
    }

    /// Attempts the transition, reporting and refusing it if illegal.
    pub fn transition(&mut self, to: MainState) -> bool {
        if !main_transition_allowed(self.state, to) {
            crate::diagnostics::report(crate::diagnostics::DeferError::IllegalTransition);
            return false;
        }
        self.state = to;
        true
    }
}

impl Default for MainChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PrefetchChannel {
    state: PrefetchState,
}

impl PrefetchChannel {
    pub fn new() -> Self {
        Self {
            state: PrefetchState::NotStarted,
        }
    }

    pub fn state(&self) -> PrefetchState {
        self.state
    }

    pub fn transition(&mut self, to: PrefetchState) -> bool {
        if !prefetch_transition_allowed(self.state, to) {
            crate::diagnostics::report(crate::diagnostics::DeferError::IllegalTransition);
            return false;
        }
        self.state = to;
        true
    }
}

impl Default for PrefetchChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingDiagnostics;

    #[test]
    fn main_channel_follows_happy_path() {
        let mut channel = MainChannel::new();
        assert!(channel.transition(MainState::Loading));
        assert!(channel.transition(MainState::Complete));
        assert_eq!(channel.state(), MainState::Complete);
    }

    #[test]
    fn main_channel_allows_placeholder_straight_to_complete() {
        let mut channel = MainChannel::new();
        assert!(channel.transition(MainState::Complete));
    }

    #[test]
    fn main_channel_rejects_backwards_transition() {
        let recorder = RecordingDiagnostics::new();
        crate::diagnostics::provide_diagnostics(recorder.clone());

        let mut channel = MainChannel::new();
        channel.transition(MainState::Complete);
        let rejected = channel.transition(MainState::Loading);

        assert!(!rejected);
        assert_eq!(channel.state(), MainState::Complete);
        assert!(!recorder.is_empty());
    }

    #[test]
    fn main_channel_rejects_transition_out_of_terminal_failed() {
        let mut channel = MainChannel::new();
        channel.transition(MainState::Failed);
        assert!(!channel.transition(MainState::Complete));
        assert_eq!(channel.state(), MainState::Failed);
    }

    #[test]
    fn prefetch_channel_follows_happy_path() {
        let mut channel = PrefetchChannel::new();
        assert!(channel.transition(PrefetchState::InProgress));
        assert!(channel.transition(PrefetchState::Complete));
    }

    #[test]
    fn prefetch_channel_rejects_resurrection_after_failure() {
        let mut channel = PrefetchChannel::new();
        channel.transition(PrefetchState::Failed);
        assert!(!channel.transition(PrefetchState::InProgress));
    }
}
