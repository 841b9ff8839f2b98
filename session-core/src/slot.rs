//! The fixed-size session slot table.
//!
//! Slot 0 is the reserved "indeterminate" sentinel — the same property the
//! wire protocol relies on, since a numeric node id of 0 is reserved. Valid
//! session indices are `1..=MAX_SESSIONS`. On the server side the slot index
//! doubles as the numeric session token, so allocation and token assignment
//! are the same operation.

use secret_buffer::SecretBuffer;
use std::time::Instant;

/// Upper bound on concurrently open sessions. A production deployment sizes
/// this to its expected peer count; the state machine itself has no
/// intrinsic limit beyond array capacity.
pub const MAX_SESSIONS: usize = 64;

/// The minimum `revised_session_timeout` the server will honor, in
/// milliseconds. A client-requested timeout below this is rounded up.
pub const MIN_SESSION_TIMEOUT_MS: u64 = 10_000;

/// A session index in `[1, MAX_SESSIONS]`. `0` is never a valid value here;
/// "no session" is represented as `Option<SessionId>` at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u32);

impl SessionId {
    /// Constructs a session id from a slot index, panicking if it is 0 or
    /// exceeds [`MAX_SESSIONS`]. Only the slot table itself constructs ids.
    fn from_index(index: usize) -> Self {
        assert!(index >= 1 && index <= MAX_SESSIONS, "slot index out of range");
        Self(index as u32)
    }

    /// The numeric value carried in the server's session token, and the
    /// same value used as the client-side correlation id.
    pub fn numeric(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Transient outgoing signature material: computed once, read once, then
/// cleared. Holding it any longer than the send path risks a stale
/// signature surviving a nonce refresh.
#[derive(Default)]
pub struct SignatureData {
    pub signature: Vec<u8>,
    pub algorithm_uri: String,
}

impl SignatureData {
    pub fn clear(&mut self) {
        self.signature.clear();
        self.algorithm_uri.clear();
    }
}

/// Per-slot state, matching §3.6 of the session core's data model.
pub struct SessionSlot {
    occupied: bool,
    pub nonce_client: Option<SecretBuffer>,
    pub nonce_server: Option<SecretBuffer>,
    pub signature_data: SignatureData,
    pub user_server: Option<u64>,
    pub user_client: Option<u64>,
    pub app_context: u64,
    pub expiration_timer_id: Option<u64>,
    revised_session_timeout_ms: u64,
    pub latest_msg_received: Option<Instant>,
}

impl SessionSlot {
    fn new_empty() -> Self {
        Self {
            occupied: false,
            nonce_client: None,
            nonce_server: None,
            signature_data: SignatureData::default(),
            user_server: None,
            user_client: None,
            app_context: 0,
            expiration_timer_id: None,
            revised_session_timeout_ms: MIN_SESSION_TIMEOUT_MS,
            latest_msg_received: None,
        }
    }

    /// Clears every secret and transient field, returning the slot to a
    /// state indistinguishable from freshly allocated. Dropping the
    /// `SecretBuffer`s here wipes their contents.
    fn reset(&mut self) {
        self.occupied = false;
        self.nonce_client = None;
        self.nonce_server = None;
        self.signature_data.clear();
        self.user_server = None;
        self.user_client = None;
        self.app_context = 0;
        self.expiration_timer_id = None;
        self.revised_session_timeout_ms = MIN_SESSION_TIMEOUT_MS;
        self.latest_msg_received = None;
    }

    /// The revised session timeout presently in effect, in milliseconds.
    pub fn revised_session_timeout_ms(&self) -> u64 {
        self.revised_session_timeout_ms
    }

    /// Sets the revised session timeout, clamping `requested` up to
    /// [`MIN_SESSION_TIMEOUT_MS`] — a client-requested timeout below the
    /// floor is silently rounded up, never honored as-is.
    pub fn set_revised_session_timeout_ms(&mut self, requested: u64) {
        self.revised_session_timeout_ms = requested.max(MIN_SESSION_TIMEOUT_MS);
    }
}

/// Errors from slot allocation and lookup.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("no free session slot available")]
    Exhausted,
    #[error("session index {0} is out of range")]
    OutOfRange(u32),
}

/// The fixed-size slot table: `MAX_SESSIONS + 1` slots, index 0 reserved.
pub struct SlotTable {
    slots: Vec<SessionSlot>,
}

impl SlotTable {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(MAX_SESSIONS + 1);
        for _ in 0..=MAX_SESSIONS {
            slots.push(SessionSlot::new_empty());
        }
        Self { slots }
    }

    /// Allocates the lowest-numbered free slot and returns its id.
    pub fn allocate(&mut self, app_context: u64) -> Result<SessionId, SlotError> {
        for index in 1..=MAX_SESSIONS {
            if !self.slots[index].occupied {
                self.slots[index].occupied = true;
                self.slots[index].app_context = app_context;
                return Ok(SessionId::from_index(index));
            }
        }
        Err(SlotError::Exhausted)
    }

    /// Releases `id` back to the free pool, wiping all secret material.
    pub fn release(&mut self, id: SessionId) {
        self.slots[id.index()].reset();
    }

    pub fn get(&self, id: SessionId) -> &SessionSlot {
        &self.slots[id.index()]
    }

    pub fn get_mut(&mut self, id: SessionId) -> &mut SessionSlot {
        &mut self.slots[id.index()]
    }

    /// Resolves a server-side numeric session token back to its session id.
    /// On the server, the token's numeric value equals the slot index.
    pub fn session_for_token(&self, token_numeric: u32) -> Option<SessionId> {
        let index = token_numeric as usize;
        if index >= 1 && index <= MAX_SESSIONS && self.slots[index].occupied {
            Some(SessionId::from_index(index))
        } else {
            None
        }
    }
}

impl Default for SlotTable {
    fn default() -> Self {
        Self::new()
    }
}
