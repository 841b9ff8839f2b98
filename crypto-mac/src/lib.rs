//! HMAC signing and verification over SHA-1 and SHA-256, selected per
//! Security Policy.
//!
//! `Basic256` signs with HMAC-SHA1; every other client-server policy signs
//! with HMAC-SHA256. PubSub message authentication also uses HMAC-SHA256.
//!
//! Verification compares the computed tag against the supplied tag in
//! constant time — tampering a single byte of either the message or the
//! signature must flip the result to a failure, never a successful match by
//! timing side channel.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Errors from HMAC signing/verification.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MacError {
    #[error("HMAC key of length {0} is invalid")]
    InvalidKeyLength(usize),
    #[error("signature verification failed")]
    VerificationFailed,
}

/// A key used for HMAC signing. Kept generic over length because policies
/// use differently-sized signing keys (20, 24, or 32 bytes).
#[derive(Zeroize, ZeroizeOnDrop, Clone)]
pub struct MacKey(Vec<u8>);

impl MacKey {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Computes an HMAC-SHA1 tag over `message`.
pub fn sign_sha1(key: &MacKey, message: &[u8]) -> Result<Vec<u8>, MacError> {
    let mut mac =
        HmacSha1::new_from_slice(&key.0).map_err(|_| MacError::InvalidKeyLength(key.0.len()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verifies an HMAC-SHA1 tag over `message` in constant time.
pub fn verify_sha1(key: &MacKey, message: &[u8], tag: &[u8]) -> Result<(), MacError> {
    let expected = sign_sha1(key, message)?;
    if bool::from(expected.as_slice().ct_eq(tag)) {
        Ok(())
    } else {
        Err(MacError::VerificationFailed)
    }
}

/// Computes an HMAC-SHA256 tag over `message`.
pub fn sign_sha256(key: &MacKey, message: &[u8]) -> Result<Vec<u8>, MacError> {
    let mut mac = HmacSha256::new_from_slice(&key.0)
        .map_err(|_| MacError::InvalidKeyLength(key.0.len()))?;
    mac.update(message);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Verifies an HMAC-SHA256 tag over `message` in constant time.
pub fn verify_sha256(key: &MacKey, message: &[u8], tag: &[u8]) -> Result<(), MacError> {
    let expected = sign_sha256(key, message)?;
    if bool::from(expected.as_slice().ct_eq(tag)) {
        Ok(())
    } else {
        Err(MacError::VerificationFailed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_sign_verify_roundtrip() {
        let key = MacKey::from_bytes(&[1u8; 24]);
        let tag = sign_sha1(&key, b"hello world").unwrap();
        assert_eq!(tag.len(), 20);
        verify_sha1(&key, b"hello world", &tag).unwrap();
    }

    #[test]
    fn sha256_sign_verify_roundtrip() {
        let key = MacKey::from_bytes(&[2u8; 32]);
        let tag = sign_sha256(&key, b"hello world").unwrap();
        assert_eq!(tag.len(), 32);
        verify_sha256(&key, b"hello world", &tag).unwrap();
    }

    #[test]
    fn tampered_message_fails_verification() {
        let key = MacKey::from_bytes(&[2u8; 32]);
        let tag = sign_sha256(&key, b"hello world").unwrap();
        assert_eq!(
            verify_sha256(&key, b"hello worle", &tag),
            Err(MacError::VerificationFailed)
        );
    }

    #[test]
    fn tampered_tag_fails_verification() {
        let key = MacKey::from_bytes(&[2u8; 32]);
        let mut tag = sign_sha256(&key, b"hello world").unwrap();
        tag[0] ^= 0xff;
        assert_eq!(
            verify_sha256(&key, b"hello world", &tag),
            Err(MacError::VerificationFailed)
        );
    }

    #[test]
    fn wrong_key_fails_verification() {
        let key_a = MacKey::from_bytes(&[2u8; 32]);
        let key_b = MacKey::from_bytes(&[3u8; 32]);
        let tag = sign_sha256(&key_a, b"hello world").unwrap();
        assert_eq!(
            verify_sha256(&key_b, b"hello world", &tag),
            Err(MacError::VerificationFailed)
        );
    }

    #[test]
    fn sha1_and_sha256_tags_have_distinct_lengths() {
        let key = MacKey::from_bytes(&[5u8; 32]);
        assert_ne!(
            sign_sha1(&key, b"x").unwrap().len(),
            sign_sha256(&key, b"x").unwrap().len()
        );
    }
}
