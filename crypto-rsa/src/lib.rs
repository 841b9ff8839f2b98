//! RSA asymmetric encryption (OAEP) and signing (PKCS#1 v1.5 and PSS).
//!
//! ## Overview
//!
//! Every client-server Security Policy except `None` uses RSA for two
//! purposes: encrypting a nonce/key blob during the handshake (OAEP) and
//! signing the `(certificate ∥ nonce)` challenge that authenticates each
//! side to the other (PKCS#1 v1.5 or PSS, depending on policy).
//!
//! The functions here operate on a single RSA block; chunking a longer
//! plaintext into `max_plaintext_size`-sized pieces and concatenating the
//! resulting ciphertext blocks is the caller's responsibility, since the
//! chunk count is itself something a caller needs to reason about (the
//! total output length must equal `chunks * ciphertext_block_size`).

use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::pss::Pss;
use rsa::{Oaep, RsaPrivateKey, RsaPublicKey};
use sha1::{Digest as _, Sha1};
use sha2::Sha256;

/// Which hash OAEP padding uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OaepHash {
    Sha1,
    Sha256,
}

/// Which hash the signing digest uses, for PKCS#1 v1.5 signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningDigest {
    Sha1,
    Sha256,
}

/// Errors from the RSA primitives.
#[derive(Debug, thiserror::Error)]
pub enum RsaCryptoError {
    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("RSA key generation failed: {0}")]
    KeyGen(rsa::Error),
}

fn hash_len(hash: OaepHash) -> usize {
    match hash {
        OaepHash::Sha1 => 20,
        OaepHash::Sha256 => 32,
    }
}

/// The RSA modulus size, in bytes (`k` in PKCS#1 notation).
pub fn key_size_bytes(public_key: &RsaPublicKey) -> usize {
    use rsa::traits::PublicKeyParts;
    public_key.size()
}

/// The RSA modulus size, in bits.
pub fn key_size_bits(public_key: &RsaPublicKey) -> usize {
    key_size_bytes(public_key) * 8
}

/// The maximum plaintext length that fits in a single OAEP block for a key
/// of `key_size_bytes` with the given hash: `k - 2*hLen - 2`.
pub fn max_plaintext_size(key_size_bytes: usize, hash: OaepHash) -> usize {
    key_size_bytes.saturating_sub(2 * hash_len(hash) + 2)
}

/// The ciphertext size produced per OAEP block: equal to the key size.
pub fn ciphertext_block_size(key_size_bytes: usize) -> usize {
    key_size_bytes
}

/// Encrypts a single chunk with RSA-OAEP. `plaintext.len()` must not exceed
/// [`max_plaintext_size`] for this key and hash.
pub fn encrypt_oaep(
    public_key: &RsaPublicKey,
    hash: OaepHash,
    plaintext: &[u8],
) -> Result<Vec<u8>, RsaCryptoError> {
    let mut rng = rand::rngs::OsRng;
    let ciphertext = match hash {
        OaepHash::Sha1 => public_key.encrypt(&mut rng, Oaep::new::<Sha1>(), plaintext)?,
        OaepHash::Sha256 => public_key.encrypt(&mut rng, Oaep::new::<Sha256>(), plaintext)?,
    };
    Ok(ciphertext)
}

/// Decrypts a single OAEP block.
pub fn decrypt_oaep(
    private_key: &RsaPrivateKey,
    hash: OaepHash,
    ciphertext: &[u8],
) -> Result<Vec<u8>, RsaCryptoError> {
    let plaintext = match hash {
        OaepHash::Sha1 => private_key.decrypt(Oaep::new::<Sha1>(), ciphertext)?,
        OaepHash::Sha256 => private_key.decrypt(Oaep::new::<Sha256>(), ciphertext)?,
    };
    Ok(plaintext)
}

/// Hashes `message` with `digest` and signs it with RSASSA-PKCS#1 v1.5.
pub fn sign_pkcs1v15(
    private_key: &RsaPrivateKey,
    digest: SigningDigest,
    message: &[u8],
) -> Result<Vec<u8>, RsaCryptoError> {
    let signature = match digest {
        SigningDigest::Sha1 => {
            let hashed = Sha1::digest(message);
            private_key.sign(Pkcs1v15Sign::new::<Sha1>(), &hashed)?
        }
        SigningDigest::Sha256 => {
            let hashed = Sha256::digest(message);
            private_key.sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)?
        }
    };
    Ok(signature)
}

/// Verifies an RSASSA-PKCS#1 v1.5 signature over `message`.
pub fn verify_pkcs1v15(
    public_key: &RsaPublicKey,
    digest: SigningDigest,
    message: &[u8],
    signature: &[u8],
) -> Result<(), RsaCryptoError> {
    match digest {
        SigningDigest::Sha1 => {
            let hashed = Sha1::digest(message);
            public_key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, signature)?;
        }
        SigningDigest::Sha256 => {
            let hashed = Sha256::digest(message);
            public_key.verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)?;
        }
    }
    Ok(())
}

/// Hashes `message` with SHA-256 and signs it with RSASSA-PSS.
pub fn sign_pss(private_key: &RsaPrivateKey, message: &[u8]) -> Result<Vec<u8>, RsaCryptoError> {
    let mut rng = rand::rngs::OsRng;
    let hashed = Sha256::digest(message);
    let signature = private_key.sign_with_rng(&mut rng, Pss::new::<Sha256>(), &hashed)?;
    Ok(signature)
}

/// Verifies an RSASSA-PSS signature over `message`.
pub fn verify_pss(
    public_key: &RsaPublicKey,
    message: &[u8],
    signature: &[u8],
) -> Result<(), RsaCryptoError> {
    let hashed = Sha256::digest(message);
    public_key.verify(Pss::new::<Sha256>(), &hashed, signature)?;
    Ok(())
}

/// Generates an RSA key pair of the given modulus size, in bits. Exposed
/// for tests and for tooling that provisions test certificates; production
/// key material is expected to come from the Key/Certificate Manager.
pub fn generate_keypair(bits: usize) -> Result<(RsaPrivateKey, RsaPublicKey), RsaCryptoError> {
    let mut rng = rand::rngs::OsRng;
    let private_key =
        RsaPrivateKey::new(&mut rng, bits).map_err(RsaCryptoError::KeyGen)?;
    let public_key = RsaPublicKey::from(&private_key);
    Ok((private_key, public_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_keypair() -> (RsaPrivateKey, RsaPublicKey) {
        // 1024 bits keeps the test suite fast; production use spans
        // 2048-4096 per policy.
        generate_keypair(1024).unwrap()
    }

    #[test]
    fn oaep_sha1_roundtrip() {
        let (sk, pk) = small_keypair();
        let plaintext = b"a short session nonce";
        let ciphertext = encrypt_oaep(&pk, OaepHash::Sha1, plaintext).unwrap();
        assert_eq!(ciphertext.len(), ciphertext_block_size(key_size_bytes(&pk)));
        let decrypted = decrypt_oaep(&sk, OaepHash::Sha1, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn oaep_sha256_roundtrip() {
        let (sk, pk) = small_keypair();
        let plaintext = b"a different nonce value";
        let ciphertext = encrypt_oaep(&pk, OaepHash::Sha256, plaintext).unwrap();
        let decrypted = decrypt_oaep(&sk, OaepHash::Sha256, &ciphertext).unwrap();
        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn max_plaintext_size_matches_formula() {
        assert_eq!(max_plaintext_size(128, OaepHash::Sha1), 128 - 40 - 2);
        assert_eq!(max_plaintext_size(128, OaepHash::Sha256), 128 - 64 - 2);
    }

    #[test]
    fn pkcs1v15_sha256_sign_verify_roundtrip() {
        let (sk, pk) = small_keypair();
        let message = b"client_certificate || client_nonce";
        let signature = sign_pkcs1v15(&sk, SigningDigest::Sha256, message).unwrap();
        verify_pkcs1v15(&pk, SigningDigest::Sha256, message, &signature).unwrap();
    }

    #[test]
    fn pkcs1v15_sha1_sign_verify_roundtrip() {
        let (sk, pk) = small_keypair();
        let message = b"server_certificate || server_nonce";
        let signature = sign_pkcs1v15(&sk, SigningDigest::Sha1, message).unwrap();
        verify_pkcs1v15(&pk, SigningDigest::Sha1, message, &signature).unwrap();
    }

    #[test]
    fn pkcs1v15_tampered_signature_byte_fails() {
        let (sk, pk) = small_keypair();
        let message = b"some challenge bytes";
        let mut signature = sign_pkcs1v15(&sk, SigningDigest::Sha256, message).unwrap();
        *signature.last_mut().unwrap() ^= 0xff;
        assert!(verify_pkcs1v15(&pk, SigningDigest::Sha256, message, &signature).is_err());
    }

    #[test]
    fn pss_sign_verify_roundtrip() {
        let (sk, pk) = small_keypair();
        let message = b"pss-authenticated challenge";
        let signature = sign_pss(&sk, message).unwrap();
        verify_pss(&pk, message, &signature).unwrap();
    }

    #[test]
    fn pss_tampered_message_fails() {
        let (sk, pk) = small_keypair();
        let signature = sign_pss(&sk, b"original message").unwrap();
        assert!(verify_pss(&pk, b"different message", &signature).is_err());
    }

    #[test]
    fn key_from_different_pair_fails_verification() {
        let (sk_a, _pk_a) = small_keypair();
        let (_sk_b, pk_b) = small_keypair();
        let message = b"cross-key check";
        let signature = sign_pkcs1v15(&sk_a, SigningDigest::Sha256, message).unwrap();
        assert!(verify_pkcs1v15(&pk_b, SigningDigest::Sha256, message, &signature).is_err());
    }
}
