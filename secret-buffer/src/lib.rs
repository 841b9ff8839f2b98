//! A zeroizing holder for key material.
//!
//! # Overview
//!
//! [`SecretBuffer`] owns a fixed-length byte region that is wiped with zeros
//! the moment it is dropped. It is the building block every other crate in
//! this workspace uses to hold nonces, symmetric keys, and signing keys: the
//! crypto provider never returns a bare `Vec<u8>` for secret material, it
//! returns a `SecretBuffer`.
//!
//! ## Exposure
//!
//! Reading or writing the contents requires an explicit borrow through
//! [`SecretBuffer::expose`] or [`SecretBuffer::expose_modify`]. There is no
//! separate "unexpose" call: the borrow checker is the un-exposure mechanism,
//! and the returned slice cannot outlive the buffer that produced it. This is
//! the same lifetime relation the C API this crate replaces enforced by
//! convention ("expose paired with unexpose") — here it is enforced by the
//! type system instead.
//!
//! ## Security notes
//!
//! - The length of a buffer is fixed at construction and never changes.
//! - Dropping a `SecretBuffer` always zeroizes its storage first, on every
//!   code path, including panicking unwinds.
//! - There is no `Clone` impl. Duplicating secret material is something a
//!   caller has to do deliberately and explicitly, never by accident.

use std::fs;
use std::path::Path;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Errors that can occur while constructing a [`SecretBuffer`].
#[derive(Debug, thiserror::Error)]
pub enum SecretBufferError {
    #[error("requested secret buffer length is zero")]
    ZeroLength,
    #[error("failed to read secret buffer from file: {0}")]
    Io(#[from] std::io::Error),
}

/// Owned, zeroizing storage for key material of a fixed length.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer {
    bytes: Vec<u8>,
}

impl SecretBuffer {
    /// Allocates a new buffer of `len` bytes, zero-filled.
    pub fn new(len: usize) -> Result<Self, SecretBufferError> {
        if len == 0 {
            return Err(SecretBufferError::ZeroLength);
        }
        Ok(Self {
            bytes: vec![0u8; len],
        })
    }

    /// Copies `len` bytes out of `source` into a freshly allocated buffer.
    ///
    /// The caller retains ownership of `source`; wiping the source, if
    /// desired, is the caller's responsibility.
    pub fn new_from_exposed(source: &[u8]) -> Result<Self, SecretBufferError> {
        if source.is_empty() {
            return Err(SecretBufferError::ZeroLength);
        }
        Ok(Self {
            bytes: source.to_vec(),
        })
    }

    /// Reads the entire contents of `path` into a new buffer.
    ///
    /// The read is not atomic with respect to concurrent writers of `path`;
    /// callers that need that guarantee must arrange it at the filesystem
    /// level (e.g. write-then-rename).
    pub fn new_from_file(path: impl AsRef<Path>) -> Result<Self, SecretBufferError> {
        let mut bytes = fs::read(path.as_ref())?;
        if bytes.is_empty() {
            bytes.zeroize();
            return Err(SecretBufferError::ZeroLength);
        }
        Ok(Self { bytes })
    }

    /// The fixed length of this buffer, in bytes.
    pub fn length(&self) -> usize {
        self.bytes.len()
    }

    /// Borrows the contents for reading.
    pub fn expose(&self) -> &[u8] {
        &self.bytes
    }

    /// Borrows the contents for in-place modification.
    pub fn expose_modify(&mut self) -> &mut [u8] {
        &mut self.bytes
    }

    /// Wipes and releases the buffer early, before its natural drop point.
    ///
    /// Calling this is never required for correctness — `Drop` already
    /// zeroizes — but it lets a caller shrink the window during which a
    /// secret sits resident for longer than necessary.
    pub fn delete_clear(self) {
        // Consuming `self` runs `Drop`, which zeroizes. There is nothing
        // further to do; this exists so call sites can name the intent.
    }
}

impl std::fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("length", &self.bytes.len())
            .finish_non_exhaustive()
    }
}
