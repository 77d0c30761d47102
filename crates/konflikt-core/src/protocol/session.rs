//! The peer session state machine shared by client and server peer
//! connections: a single forward-only path from first byte on the wire to
//! teardown, plus the reconnect backoff schedule a client follows between
//! attempts.

use std::time::Duration;

use thiserror::Error;

use crate::domain::layout::InstanceId;

/// How long to wait for the WebSocket handshake to complete before giving up.
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// How long to wait for the peer's handshake message once the transport is open.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);
/// Interval between `heartbeat` messages once a session reaches [`SessionState::Ready`].
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
/// Starting delay before a client's first reconnect attempt.
pub const RECONNECT_BACKOFF_INITIAL: Duration = Duration::from_secs(1);
/// Ceiling the doubling reconnect backoff never exceeds.
pub const RECONNECT_BACKOFF_MAX: Duration = Duration::from_secs(30);
/// How long a cursor must dwell past a screen edge before a
/// `deactivation_request` is sent, to absorb jitter at the boundary.
pub const DEACTIVATION_DEBOUNCE: Duration = Duration::from_millis(500);

/// A peer connection's lifecycle stage. Transitions only ever move forward
/// through this order; `Closing`/`Closed` sit at the end so an error or a
/// clean disconnect can reach them from any earlier state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Connecting,
    Open,
    HandshakeSent,
    Ready,
    Closing,
    Closed,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("cannot transition from {from:?} to {to:?}")]
    InvalidTransition { from: SessionState, to: SessionState },
}

/// Tracks one peer connection's state and identity.
#[derive(Debug, Clone)]
pub struct PeerSession {
    state: SessionState,
    peer_instance_id: Option<InstanceId>,
}

impl PeerSession {
    pub fn new() -> Self {
        Self { state: SessionState::Connecting, peer_instance_id: None }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn peer_instance_id(&self) -> Option<&str> {
        self.peer_instance_id.as_deref()
    }

    /// Moves the session forward to `next`. Rejects any transition that
    /// does not strictly advance through the [`SessionState`] order,
    /// including re-entering the current state.
    pub fn transition(&mut self, next: SessionState) -> Result<(), SessionError> {
        if next <= self.state {
            return Err(SessionError::InvalidTransition { from: self.state, to: next });
        }
        self.state = next;
        Ok(())
    }

    /// Records the peer's identity once the handshake names it. Call this
    /// alongside (not instead of) the `HandshakeSent`/`Ready` transition.
    pub fn set_peer_instance_id(&mut self, id: InstanceId) {
        self.peer_instance_id = Some(id);
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }
}

impl Default for PeerSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the backoff delay before the `attempt`-th reconnect try
/// (0-indexed: `attempt == 0` is the first retry after the initial
/// connection failed), doubling from [`RECONNECT_BACKOFF_INITIAL`] up to
/// [`RECONNECT_BACKOFF_MAX`].
pub fn reconnect_backoff(attempt: u32) -> Duration {
    let scale = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
    let millis = RECONNECT_BACKOFF_INITIAL.as_millis() as u64;
    let delay_millis = millis.saturating_mul(scale);
    Duration::from_millis(delay_millis).min(RECONNECT_BACKOFF_MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_succeed_in_order() {
        let mut session = PeerSession::new();
        session.transition(SessionState::Open).unwrap();
        session.transition(SessionState::HandshakeSent).unwrap();
        session.transition(SessionState::Ready).unwrap();
        assert!(session.is_ready());
    }

    #[test]
    fn skipping_ahead_is_allowed() {
        let mut session = PeerSession::new();
        session.transition(SessionState::Ready).unwrap();
        assert_eq!(session.state(), SessionState::Ready);
    }

    #[test]
    fn moving_backward_is_rejected() {
        let mut session = PeerSession::new();
        session.transition(SessionState::Ready).unwrap();
        let err = session.transition(SessionState::Open).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition { from: SessionState::Ready, to: SessionState::Open }
        );
    }

    #[test]
    fn re_entering_the_current_state_is_rejected() {
        let mut session = PeerSession::new();
        let err = session.transition(SessionState::Connecting).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidTransition {
                from: SessionState::Connecting,
                to: SessionState::Connecting
            }
        );
    }

    #[test]
    fn closing_is_reachable_from_any_state() {
        for start in [SessionState::Open, SessionState::Ready] {
            let mut session = PeerSession::new();
            session.transition(start).unwrap();
            session.transition(SessionState::Closing).unwrap();
            assert_eq!(session.state(), SessionState::Closing);
        }

        let mut fresh = PeerSession::new();
        fresh.transition(SessionState::Closing).unwrap();
        assert_eq!(fresh.state(), SessionState::Closing);
    }

    #[test]
    fn reconnect_backoff_doubles_up_to_the_ceiling() {
        assert_eq!(reconnect_backoff(0), Duration::from_secs(1));
        assert_eq!(reconnect_backoff(1), Duration::from_secs(2));
        assert_eq!(reconnect_backoff(4), Duration::from_secs(16));
        assert_eq!(reconnect_backoff(5), Duration::from_secs(30));
        assert_eq!(reconnect_backoff(10), Duration::from_secs(30));
    }
}
