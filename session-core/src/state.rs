//! The session state machine: states, transitions, and upper-layer
//! notifications.
//!
//! The transition table below is exhaustive — every event a session can
//! receive is either consumed by a matching arm or rejected as invalid for
//! the current state. There is no fallback "ignore unknown event" arm: a
//! transition attempted from a state that does not expect it is a logic
//! error in the caller, and [`SessionStateMachine::apply`] returns
//! [`TransitionError::InvalidForState`] rather than silently doing nothing.

/// The seven states a session slot can be in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Closed,
    Creating,
    ScActivating,
    ScOrphaned,
    UserActivating,
    UserActivated,
    Closing,
}

/// The events that drive state transitions. Mirrors the arrows in the
/// transition table: each variant is one labeled edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Client issues `create_session`, or the server receives a
    /// `create_session` request.
    CreateSession,
    /// `create_session` succeeded: response parsed, nonce present,
    /// signature verified.
    CreateSessionOk,
    /// Any failure during session creation.
    CreateSessionFailed,
    /// `activate_session` accepted; user-token activation begins.
    ActivateSessionOk,
    /// The secure channel underneath this session was lost.
    ChannelLost,
    /// `activate_session_response` accepted and the user signature checked
    /// out.
    UserActivationOk,
    /// The user was rejected, or signature verification failed.
    UserActivationFailed,
    /// A new channel or new user identity is being activated onto an
    /// already-activated session.
    Reactivate,
    /// `close_session` was requested.
    CloseSession,
    /// The close response (or close timeout) arrived.
    CloseComplete,
    /// The keep-alive timer fired past the timeout threshold.
    KeepAliveExpired,
}

/// Notification kinds delivered to the upper layer on specific transitions.
/// These are abstract event kinds, not method names — the caller decides
/// how to surface them (callback, channel send, etc).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    Activated,
    Reactivating,
    ActivationFailure,
    Closed,
}

/// Errors from attempting an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    #[error("event {event:?} is not valid from state {state:?}")]
    InvalidForState {
        state: SessionState,
        event: SessionEvent,
    },
}

/// A state machine instance bound to one session slot.
#[derive(Debug, Clone, Copy)]
pub struct SessionStateMachine {
    state: SessionState,
}

impl SessionStateMachine {
    pub fn new() -> Self {
        Self {
            state: SessionState::Closed,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Applies `event`, returning the notification to raise (if any) on
    /// success, or the rejected event on failure.
    pub fn apply(
        &mut self,
        event: SessionEvent,
    ) -> Result<Option<Notification>, TransitionError> {
        use SessionEvent::*;
        use SessionState::*;

        let (next, notification) = match (self.state, event) {
            (Closed, CreateSession) => (Creating, None),

            (Creating, CreateSessionOk) => (ScActivating, None),
            (Creating, CreateSessionFailed) => (Closed, Some(Notification::ActivationFailure)),

            (ScActivating, ActivateSessionOk) => (UserActivating, None),
            (ScActivating, ChannelLost) => (ScOrphaned, Some(Notification::Reactivating)),

            (UserActivating, UserActivationOk) => (UserActivated, Some(Notification::Activated)),
            (UserActivating, UserActivationFailed) => {
                (Closed, Some(Notification::ActivationFailure))
            }

            (UserActivated, ChannelLost) => (ScOrphaned, Some(Notification::Reactivating)),
            (UserActivated, Reactivate) => (ScActivating, Some(Notification::Reactivating)),
            (UserActivated, CloseSession) => (Closing, None),
            (UserActivated, KeepAliveExpired) => (Closed, Some(Notification::Closed)),

            (Closing, CloseComplete) => (Closed, Some(Notification::Closed)),

            (ScOrphaned, ActivateSessionOk) => (ScActivating, None),

            _ => {
                return Err(TransitionError::InvalidForState {
                    state: self.state,
                    event,
                });
            }
        };

        self.state = next;
        Ok(notification)
    }
}

impl Default for SessionStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionEvent::*;
    use SessionState::*;

    #[test]
    fn full_happy_path_to_activated() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(sm.state(), Closed);
        assert_eq!(sm.apply(CreateSession).unwrap(), None);
        assert_eq!(sm.state(), Creating);
        assert_eq!(sm.apply(CreateSessionOk).unwrap(), None);
        assert_eq!(sm.state(), ScActivating);
        assert_eq!(sm.apply(ActivateSessionOk).unwrap(), None);
        assert_eq!(sm.state(), UserActivating);
        assert_eq!(
            sm.apply(UserActivationOk).unwrap(),
            Some(Notification::Activated)
        );
        assert_eq!(sm.state(), UserActivated);
    }

    #[test]
    fn creation_failure_emits_activation_failure_and_returns_to_closed() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        assert_eq!(
            sm.apply(CreateSessionFailed).unwrap(),
            Some(Notification::ActivationFailure)
        );
        assert_eq!(sm.state(), Closed);
    }

    #[test]
    fn channel_loss_orphans_an_activated_session() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        sm.apply(ActivateSessionOk).unwrap();
        sm.apply(UserActivationOk).unwrap();
        assert_eq!(sm.state(), UserActivated);
        assert_eq!(
            sm.apply(ChannelLost).unwrap(),
            Some(Notification::Reactivating)
        );
        assert_eq!(sm.state(), ScOrphaned);
    }

    #[test]
    fn orphaned_session_reactivates_on_new_channel() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        sm.apply(ActivateSessionOk).unwrap();
        sm.apply(UserActivationOk).unwrap();
        sm.apply(ChannelLost).unwrap();
        assert_eq!(sm.apply(ActivateSessionOk).unwrap(), None);
        assert_eq!(sm.state(), ScActivating);
    }

    #[test]
    fn channel_loss_during_sc_activating_also_emits_reactivating() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        assert_eq!(sm.state(), ScActivating);
        assert_eq!(
            sm.apply(ChannelLost).unwrap(),
            Some(Notification::Reactivating)
        );
        assert_eq!(sm.state(), ScOrphaned);
    }

    #[test]
    fn reactivation_from_activated_emits_reactivating() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        sm.apply(ActivateSessionOk).unwrap();
        sm.apply(UserActivationOk).unwrap();
        assert_eq!(
            sm.apply(Reactivate).unwrap(),
            Some(Notification::Reactivating)
        );
        assert_eq!(sm.state(), ScActivating);
    }

    #[test]
    fn close_session_then_response_closes() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        sm.apply(ActivateSessionOk).unwrap();
        sm.apply(UserActivationOk).unwrap();
        assert_eq!(sm.apply(CloseSession).unwrap(), None);
        assert_eq!(sm.state(), Closing);
        assert_eq!(sm.apply(CloseComplete).unwrap(), Some(Notification::Closed));
        assert_eq!(sm.state(), Closed);
    }

    #[test]
    fn keep_alive_expiry_closes_without_activation_failure() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        sm.apply(ActivateSessionOk).unwrap();
        sm.apply(UserActivationOk).unwrap();
        assert_eq!(
            sm.apply(KeepAliveExpired).unwrap(),
            Some(Notification::Closed)
        );
        assert_eq!(sm.state(), Closed);
    }

    #[test]
    fn user_rejection_closes_with_activation_failure() {
        let mut sm = SessionStateMachine::new();
        sm.apply(CreateSession).unwrap();
        sm.apply(CreateSessionOk).unwrap();
        sm.apply(ActivateSessionOk).unwrap();
        assert_eq!(
            sm.apply(UserActivationFailed).unwrap(),
            Some(Notification::ActivationFailure)
        );
        assert_eq!(sm.state(), Closed);
    }

    #[test]
    fn event_invalid_for_current_state_is_rejected() {
        let mut sm = SessionStateMachine::new();
        assert_eq!(
            sm.apply(UserActivationOk),
            Err(TransitionError::InvalidForState {
                state: Closed,
                event: UserActivationOk
            })
        );
    }
}
