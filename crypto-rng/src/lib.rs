//! A minimal wrapper around the operating system's secure random source.
//!
//! ## Features
//!
//! - Cryptographically secure: uses the operating system's secure random
//!   source via [`getrandom`].
//! - Simple API: one function, fills a caller-provided buffer.
//!
//! ## Security notes
//!
//! - Entropy quality is as good as the platform's `getrandom` implementation.
//! - The random bytes generated are suitable for cryptographic keys, nonces,
//!   initialization vectors, and other security-critical randomness.
//! - Failure of the underlying source is surfaced as an error rather than a
//!   panic, so that a caller can convert it into the core's `NOK` status
//!   kind instead of aborting the process.
//!
//! ## Usage
//!
//! ```rust
//! use crypto_rng::fill_buffer;
//!
//! let mut random_bytes = [0u8; 32];
//! fill_buffer(&mut random_bytes).unwrap();
//! ```

/// Error returned when the underlying entropy source is unavailable.
#[derive(Debug, thiserror::Error)]
#[error("random source unavailable: {0}")]
pub struct RngError(#[from] getrandom::Error);

/// Fills `buffer` with cryptographically secure random bytes.
///
/// # Errors
///
/// Returns [`RngError`] if the platform's random source could not be read.
/// This is extremely rare in practice and typically indicates a serious
/// system problem; callers MUST NOT fall back to a weaker source on error.
pub fn fill_buffer(buffer: &mut [u8]) -> Result<(), RngError> {
    getrandom::getrandom(buffer)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn different_calls_produce_different_results() {
        let mut buffer1 = [0u8; 32];
        let mut buffer2 = [0u8; 32];
        fill_buffer(&mut buffer1).unwrap();
        fill_buffer(&mut buffer2).unwrap();
        assert_ne!(buffer1, buffer2);
    }

    #[test]
    fn small_size_does_not_error() {
        let mut buffer = [0u8; 1];
        fill_buffer(&mut buffer).unwrap();
    }

    #[test]
    fn empty_buffer_does_not_error() {
        let mut buffer = [];
        fill_buffer(&mut buffer).unwrap();
    }

    #[test]
    fn large_size_is_filled() {
        let mut buffer = vec![0u8; 10000];
        let original = buffer.clone();
        fill_buffer(&mut buffer).unwrap();
        assert_ne!(buffer, original);
    }

    #[test]
    fn ten_thousand_nonces_are_pairwise_distinct() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let mut nonce = [0u8; 32];
            fill_buffer(&mut nonce).unwrap();
            assert!(seen.insert(nonce), "duplicate nonce observed");
        }
    }
}
