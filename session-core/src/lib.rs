//! Session lifecycle: slot table, state machine, keep-alive timing, and the
//! crypto orchestration that ties a session's handshake to a
//! [`crypto_provider::CryptoProvider`].
//!
//! This crate does not own a secure channel or do wire (de)serialization —
//! it owns exactly the state a session needs between the two: which slot a
//! session lives in, what state it is in, and what crypto operations have to
//! run at each step of `create_session`/`activate_session`.

pub mod crypto;
pub mod slot;
pub mod state;
pub mod timer;

pub use crypto::{SessionCryptoError, client_activate_session_request_crypto,
    client_create_session_request, client_create_session_response_check,
    server_activate_session_check, server_create_session_request_crypto};
pub use slot::{MAX_SESSIONS, MIN_SESSION_TIMEOUT_MS, SessionId, SessionSlot, SignatureData,
    SlotError, SlotTable};
pub use state::{Notification, SessionEvent, SessionState, SessionStateMachine, TransitionError};
pub use timer::{TimerEvaluation, evaluate as evaluate_keep_alive_timer};
