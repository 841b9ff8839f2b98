//! Password-Based Key Derivation Function: PBKDF2-HMAC-SHA256.
//!
//! ## Overview
//!
//! This module is not required by the OPC UA Secure Channel protocol itself;
//! it hashes a secret and is used to authenticate users with a password
//! identity token. A configuration is built in two phases — create it empty
//! with [`Pbkdf2Config::new`], then configure salt, iteration count, and
//! output length — and running it consumes the secret and yields a byte
//! string.
//!
//! ## Security notes
//!
//! - Callers SHOULD NOT pass a secret longer than 32 bytes: HMAC-SHA256 is
//!   considered to have 256 bits of maximum input entropy, so a longer
//!   secret does not protect more.
//! - Use as large an iteration count as your latency budget allows.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

/// `i32::MAX`, the spec-mandated ceiling on salt length and output length.
const INT32_MAX: usize = i32::MAX as usize;

/// Errors from building or running a [`Pbkdf2Config`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Pbkdf2Error {
    #[error("salt must not be empty")]
    EmptySalt,
    #[error("salt length {0} exceeds INT32_MAX")]
    SaltTooLong(usize),
    #[error("iteration count must be greater than zero")]
    ZeroIterations,
    #[error("output length must be greater than zero")]
    ZeroOutputLength,
    #[error("output length {0} exceeds INT32_MAX")]
    OutputLengthTooLong(usize),
    #[error("configuration is incomplete: missing {0}")]
    Incomplete(&'static str),
}

/// A two-phase PBKDF2-HMAC-SHA256 configuration: create empty, then set
/// salt, iteration count, and output length before running.
#[derive(Default, Clone)]
pub struct Pbkdf2Config {
    salt: Option<Vec<u8>>,
    iterations: Option<u32>,
    output_length: Option<usize>,
}

impl Pbkdf2Config {
    /// Creates an empty, unconfigured configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the salt. Must be non-empty and no longer than `INT32_MAX` bytes.
    pub fn with_salt(mut self, salt: &[u8]) -> Result<Self, Pbkdf2Error> {
        if salt.is_empty() {
            return Err(Pbkdf2Error::EmptySalt);
        }
        if salt.len() > INT32_MAX {
            return Err(Pbkdf2Error::SaltTooLong(salt.len()));
        }
        self.salt = Some(salt.to_vec());
        Ok(self)
    }

    /// Sets the iteration count. Must be greater than zero.
    pub fn with_iterations(mut self, iterations: u32) -> Result<Self, Pbkdf2Error> {
        if iterations == 0 {
            return Err(Pbkdf2Error::ZeroIterations);
        }
        self.iterations = Some(iterations);
        Ok(self)
    }

    /// Sets the desired output length, in bytes. Must be greater than zero
    /// and no more than `INT32_MAX`.
    pub fn with_output_length(mut self, len: usize) -> Result<Self, Pbkdf2Error> {
        if len == 0 {
            return Err(Pbkdf2Error::ZeroOutputLength);
        }
        if len > INT32_MAX {
            return Err(Pbkdf2Error::OutputLengthTooLong(len));
        }
        self.output_length = Some(len);
        Ok(self)
    }

    /// Runs the configuration against `secret`, producing `output_length`
    /// bytes of derived key material.
    pub fn run(self, secret: &[u8]) -> Result<Vec<u8>, Pbkdf2Error> {
        let salt = self.salt.ok_or(Pbkdf2Error::Incomplete("salt"))?;
        let iterations = self
            .iterations
            .ok_or(Pbkdf2Error::Incomplete("iterations"))?;
        let output_length = self
            .output_length
            .ok_or(Pbkdf2Error::Incomplete("output_length"))?;

        let mut output = vec![0u8; output_length];
        pbkdf2_hmac::<Sha256>(secret, &salt, iterations, &mut output);
        Ok(output)
    }
}
