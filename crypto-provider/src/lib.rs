//! The cryptographic provider: binds a Security Policy to concrete
//! primitive operations.
//!
//! ## Overview
//!
//! [`CryptoProvider`] is the single entry point the rest of the stack uses
//! for cryptography. It is constructed once from a Security Policy URI (or
//! a PubSub Security Policy URI) and held by reference for the lifetime of
//! the channel or dataset it protects — see the design note on hoisting
//! provider construction out of the per-call path.
//!
//! Every operation here composes the single-purpose crates below it:
//! [`security_policy`] for parameters, [`crypto_rng`] for entropy,
//! [`crypto_cipher`] for AES, [`crypto_mac`] for HMAC, [`crypto_rsa`] for
//! RSA, [`crypto_kdf`] for the TLS-PRF, and [`pki_validator`] for chain
//! trust. None of those crates know about Security Policies; this crate is
//! where policy selection meets primitive.
//!
//! ## Error handling
//!
//! Every fallible operation returns a [`CryptoProviderError`], which maps to
//! one of the core status kinds via [`CryptoProviderError::kind`]. Buffer
//! length mismatches are checked and reported as
//! [`StatusKind::InvalidParameters`] before any crypto state is touched.

use key_manager::Certificate;
use pki_validator::{PkiError, PkiValidator};
use rsa::RsaPublicKey;
use secret_buffer::SecretBuffer;
use security_policy::{HashAlgorithm, PubSubSecurityPolicy, SecurityPolicy, SignaturePadding};
use tracing::warn;

/// The core status-kind taxonomy every primitive operation maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Ok,
    InvalidParameters,
    Nok,
    NotSupported,
}

/// Errors from the cryptographic provider.
#[derive(Debug, thiserror::Error)]
pub enum CryptoProviderError {
    #[error("unknown or unsupported security policy URI: {0}")]
    UnknownPolicy(String),
    #[error("operation is not defined for this security policy")]
    NotApplicable,
    #[error("buffer length {actual} does not match the required length {expected}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("entropy source failure: {0}")]
    Rng(#[from] crypto_rng::RngError),
    #[error("symmetric cipher failure: {0}")]
    Cipher(#[from] crypto_cipher::CipherError),
    #[error("symmetric MAC failure: {0}")]
    Mac(#[from] crypto_mac::MacError),
    #[error("RSA operation failure: {0}")]
    Rsa(#[from] crypto_rsa::RsaCryptoError),
    #[error("secret buffer failure: {0}")]
    SecretBuffer(#[from] secret_buffer::SecretBufferError),
    #[error("certificate chain validation failed: {0}")]
    Pki(#[from] PkiError),
    #[error("certificate's RSA key does not meet this policy's size bounds")]
    KeyOutOfBounds,
}

impl CryptoProviderError {
    /// Maps this error onto the core status-kind taxonomy.
    pub fn kind(&self) -> StatusKind {
        match self {
            CryptoProviderError::UnknownPolicy(_)
            | CryptoProviderError::NotApplicable
            | CryptoProviderError::LengthMismatch { .. } => StatusKind::InvalidParameters,
            _ => StatusKind::Nok,
        }
    }
}

/// The bound policy: either a client-server Security Policy or a PubSub
/// Security Policy. Construction is the only place this distinction is
/// made; every operation below dispatches on it internally.
enum BoundPolicy {
    ClientServer(SecurityPolicy),
    PubSub(PubSubSecurityPolicy),
}

/// Binds a Security Policy to concrete cryptographic primitives.
pub struct CryptoProvider {
    policy: BoundPolicy,
}

impl CryptoProvider {
    /// Constructs a provider for a client-server Security Policy URI.
    pub fn from_security_policy_uri(uri: &str) -> Result<Self, CryptoProviderError> {
        let policy: SecurityPolicy = uri
            .parse()
            .map_err(|_| CryptoProviderError::UnknownPolicy(uri.to_string()))?;
        Ok(Self {
            policy: BoundPolicy::ClientServer(policy),
        })
    }

    /// Constructs a provider for the PubSub Security Policy URI.
    pub fn from_pubsub_policy_uri(uri: &str) -> Result<Self, CryptoProviderError> {
        let policy: PubSubSecurityPolicy = uri
            .parse()
            .map_err(|_| CryptoProviderError::UnknownPolicy(uri.to_string()))?;
        Ok(Self {
            policy: BoundPolicy::PubSub(policy),
        })
    }

    fn client_server(&self) -> Result<SecurityPolicy, CryptoProviderError> {
        match self.policy {
            BoundPolicy::ClientServer(p) => Ok(p),
            BoundPolicy::PubSub(_) => Err(CryptoProviderError::NotApplicable),
        }
    }

    fn pubsub(&self) -> Result<PubSubSecurityPolicy, CryptoProviderError> {
        match self.policy {
            BoundPolicy::PubSub(p) => Ok(p),
            BoundPolicy::ClientServer(_) => Err(CryptoProviderError::NotApplicable),
        }
    }

    // ---- Length queries -------------------------------------------------

    pub fn symmetric_key_length(&self) -> Result<usize, CryptoProviderError> {
        self.client_server()?
            .params()
            .sym_key_size
            .ok_or(CryptoProviderError::NotApplicable)
    }

    pub fn symmetric_sign_key_length(&self) -> Result<usize, CryptoProviderError> {
        self.client_server()?
            .params()
            .sym_sign_key_size
            .ok_or(CryptoProviderError::NotApplicable)
    }

    pub fn symmetric_signature_length(&self) -> Result<usize, CryptoProviderError> {
        self.client_server()?
            .params()
            .sym_signature_size
            .ok_or(CryptoProviderError::NotApplicable)
    }

    pub fn symmetric_block_size(&self) -> Result<usize, CryptoProviderError> {
        self.client_server()?
            .params()
            .sym_block_size
            .ok_or(CryptoProviderError::NotApplicable)
    }

    pub fn nonce_length(&self) -> Result<usize, CryptoProviderError> {
        Ok(self.client_server()?.params().nonce_size)
    }

    pub fn certificate_thumbprint_length(&self) -> Result<usize, CryptoProviderError> {
        Ok(self.client_server()?.params().certificate_thumbprint_size)
    }

    pub fn asymmetric_key_length_bits(
        &self,
        public_key: &RsaPublicKey,
    ) -> Result<usize, CryptoProviderError> {
        self.client_server()?;
        Ok(crypto_rsa::key_size_bits(public_key))
    }

    pub fn asymmetric_key_length_bytes(
        &self,
        public_key: &RsaPublicKey,
    ) -> Result<usize, CryptoProviderError> {
        self.client_server()?;
        Ok(crypto_rsa::key_size_bytes(public_key))
    }

    pub fn asymmetric_max_plaintext_size(
        &self,
        public_key: &RsaPublicKey,
    ) -> Result<usize, CryptoProviderError> {
        let policy = self.client_server()?;
        let hash = policy
            .params()
            .oaep_hash
            .ok_or(CryptoProviderError::NotApplicable)?;
        let key_bytes = crypto_rsa::key_size_bytes(public_key);
        Ok(crypto_rsa::max_plaintext_size(key_bytes, to_oaep(hash)))
    }

    pub fn asymmetric_ciphertext_size(
        &self,
        public_key: &RsaPublicKey,
    ) -> Result<usize, CryptoProviderError> {
        self.client_server()?;
        Ok(crypto_rsa::ciphertext_block_size(crypto_rsa::key_size_bytes(
            public_key,
        )))
    }

    pub fn asymmetric_signature_length(
        &self,
        public_key: &RsaPublicKey,
    ) -> Result<usize, CryptoProviderError> {
        self.client_server()?;
        Ok(crypto_rsa::key_size_bytes(public_key))
    }

    /// The algorithm URI carried in `SignatureData.algorithm` for this
    /// policy's asymmetric signature scheme.
    pub fn asymmetric_signature_algorithm_uri(&self) -> Result<&'static str, CryptoProviderError> {
        Ok(self.client_server()?.params().asymmetric_signature_algorithm_uri)
    }

    pub fn pubsub_key_nonce_length(&self) -> Result<usize, CryptoProviderError> {
        Ok(self.pubsub()?.key_nonce_size())
    }

    pub fn pubsub_message_random_length(&self) -> Result<usize, CryptoProviderError> {
        Ok(self.pubsub()?.message_random_size())
    }

    // ---- Random -----------------------------------------------------------

    /// Fills `buffer` with entropy from the underlying secure random source.
    pub fn random(&self, buffer: &mut [u8]) -> Result<(), CryptoProviderError> {
        crypto_rng::fill_buffer(buffer)?;
        Ok(())
    }

    /// Produces a secret buffer of this policy's nonce length, filled from
    /// entropy. For `SecurityPolicy::None`, the nonce length is still the
    /// uniform 32 bytes carried by every policy's parameter row.
    pub fn generate_secure_channel_nonce(&self) -> Result<SecretBuffer, CryptoProviderError> {
        let len = self.nonce_length()?;
        let mut buffer = SecretBuffer::new(len)?;
        crypto_rng::fill_buffer(buffer.expose_modify())?;
        Ok(buffer)
    }

    /// Produces 4 bytes of entropy as a `u32`, for numeric identifiers that
    /// must be unpredictable but need not be secret.
    pub fn generate_random_id(&self) -> Result<u32, CryptoProviderError> {
        let mut bytes = [0u8; 4];
        crypto_rng::fill_buffer(&mut bytes)?;
        Ok(u32::from_be_bytes(bytes))
    }

    // ---- Key derivation -----------------------------------------------

    /// Implements the TLS-PRF with this policy's HMAC hash: HMAC-SHA1 for
    /// `Basic256`, HMAC-SHA256 for every other client-server policy.
    pub fn derive_pseudo_random_data(
        &self,
        secret: &[u8],
        seed: &[u8],
        out_len: usize,
    ) -> Result<Vec<u8>, CryptoProviderError> {
        let policy = self.client_server()?;
        Ok(crypto_kdf::derive_pseudo_random_data(
            to_prf(policy.prf_hash()),
            secret,
            seed,
            out_len,
        ))
    }

    /// Derives both sides' `sign_key ∥ encrypt_key ∥ iv` key sets from the
    /// client and server nonces.
    pub fn derive_key_sets(
        &self,
        client_nonce: &[u8],
        server_nonce: &[u8],
    ) -> Result<(crypto_kdf::DerivedKeySet, crypto_kdf::DerivedKeySet), CryptoProviderError> {
        let policy = self.client_server()?;
        let params = policy.params();
        let lengths = crypto_kdf::KeySetLengths {
            sign_key_len: params
                .sym_sign_key_size
                .ok_or(CryptoProviderError::NotApplicable)?,
            encrypt_key_len: params
                .sym_key_size
                .ok_or(CryptoProviderError::NotApplicable)?,
            iv_len: params
                .sym_block_size
                .ok_or(CryptoProviderError::NotApplicable)?,
        };
        Ok(crypto_kdf::derive_key_sets(
            to_prf(policy.prf_hash()),
            client_nonce,
            server_nonce,
            lengths,
        ))
    }

    // ---- Symmetric encryption -------------------------------------------

    /// Encrypts `buffer` in place with AES-CBC. `buffer.len()` must already
    /// be a whole number of block sizes; this never adds padding.
    pub fn symmetric_encrypt(
        &self,
        key: &[u8],
        iv: &[u8; 16],
        buffer: &mut [u8],
    ) -> Result<(), CryptoProviderError> {
        let iv = crypto_cipher::Block16::from_bytes(*iv);
        match key.len() {
            16 => {
                let key = crypto_cipher::Key128::from_bytes(key.try_into().unwrap());
                crypto_cipher::cbc_encrypt_128(&key, &iv, buffer)?;
            }
            32 => {
                let key = crypto_cipher::Key256::from_bytes(key.try_into().unwrap());
                crypto_cipher::cbc_encrypt_256(&key, &iv, buffer)?;
            }
            other => {
                return Err(CryptoProviderError::LengthMismatch {
                    expected: 16,
                    actual: other,
                });
            }
        }
        Ok(())
    }

    /// Decrypts `buffer` in place with AES-CBC.
    pub fn symmetric_decrypt(
        &self,
        key: &[u8],
        iv: &[u8; 16],
        buffer: &mut [u8],
    ) -> Result<(), CryptoProviderError> {
        let iv = crypto_cipher::Block16::from_bytes(*iv);
        match key.len() {
            16 => {
                let key = crypto_cipher::Key128::from_bytes(key.try_into().unwrap());
                crypto_cipher::cbc_decrypt_128(&key, &iv, buffer)?;
            }
            32 => {
                let key = crypto_cipher::Key256::from_bytes(key.try_into().unwrap());
                crypto_cipher::cbc_decrypt_256(&key, &iv, buffer)?;
            }
            other => {
                return Err(CryptoProviderError::LengthMismatch {
                    expected: 16,
                    actual: other,
                });
            }
        }
        Ok(())
    }

    // ---- Symmetric signing ----------------------------------------------

    /// Signs `message` with HMAC, using this policy's digest: SHA-1 for
    /// `Basic256`, SHA-256 otherwise.
    pub fn symmetric_sign(
        &self,
        key: &[u8],
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoProviderError> {
        let policy = self.client_server()?;
        let mac_key = crypto_mac::MacKey::from_bytes(key);
        let tag = match policy.prf_hash() {
            HashAlgorithm::Sha1 => crypto_mac::sign_sha1(&mac_key, message)?,
            HashAlgorithm::Sha256 => crypto_mac::sign_sha256(&mac_key, message)?,
        };
        Ok(tag)
    }

    /// Verifies an HMAC tag over `message`, in constant time.
    pub fn symmetric_verify(
        &self,
        key: &[u8],
        message: &[u8],
        tag: &[u8],
    ) -> Result<(), CryptoProviderError> {
        let policy = self.client_server()?;
        let mac_key = crypto_mac::MacKey::from_bytes(key);
        match policy.prf_hash() {
            HashAlgorithm::Sha1 => crypto_mac::verify_sha1(&mac_key, message, tag)?,
            HashAlgorithm::Sha256 => crypto_mac::verify_sha256(&mac_key, message, tag)?,
        };
        Ok(())
    }

    // ---- Asymmetric encryption --------------------------------------------

    /// Encrypts `plaintext` with RSA-OAEP, chunked into
    /// `asymmetric_max_plaintext_size`-sized blocks, each producing one
    /// ciphertext block of `asymmetric_ciphertext_size`.
    pub fn asymmetric_encrypt(
        &self,
        public_key: &RsaPublicKey,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoProviderError> {
        let policy = self.client_server()?;
        let hash = to_oaep(
            policy
                .params()
                .oaep_hash
                .ok_or(CryptoProviderError::NotApplicable)?,
        );
        let chunk_size = self.asymmetric_max_plaintext_size(public_key)?;
        let mut out = Vec::new();
        for chunk in plaintext.chunks(chunk_size.max(1)) {
            out.extend(crypto_rsa::encrypt_oaep(public_key, hash, chunk)?);
        }
        Ok(out)
    }

    /// Decrypts ciphertext produced by [`Self::asymmetric_encrypt`]. Each
    /// input block must be exactly `asymmetric_ciphertext_size`.
    pub fn asymmetric_decrypt(
        &self,
        private_key: &rsa::RsaPrivateKey,
        block_size: usize,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoProviderError> {
        let policy = self.client_server()?;
        let hash = to_oaep(
            policy
                .params()
                .oaep_hash
                .ok_or(CryptoProviderError::NotApplicable)?,
        );
        if block_size == 0 || ciphertext.len() % block_size != 0 {
            return Err(CryptoProviderError::LengthMismatch {
                expected: block_size,
                actual: ciphertext.len(),
            });
        }
        let mut out = Vec::new();
        for block in ciphertext.chunks(block_size) {
            out.extend(crypto_rsa::decrypt_oaep(private_key, hash, block)?);
        }
        Ok(out)
    }

    // ---- Asymmetric signing -----------------------------------------------

    /// Hashes `message` with this policy's signing digest and signs it with
    /// RSASSA-PKCS#1 v1.5 or RSASSA-PSS, per policy.
    pub fn asymmetric_sign(
        &self,
        private_key: &rsa::RsaPrivateKey,
        message: &[u8],
    ) -> Result<Vec<u8>, CryptoProviderError> {
        let policy = self.client_server()?;
        let params = policy.params();
        let digest = to_signing(
            params
                .signing_digest
                .ok_or(CryptoProviderError::NotApplicable)?,
        );
        let signature = match params
            .signature_padding
            .ok_or(CryptoProviderError::NotApplicable)?
        {
            SignaturePadding::Pkcs1v15 => crypto_rsa::sign_pkcs1v15(private_key, digest, message)?,
            SignaturePadding::Pss => crypto_rsa::sign_pss(private_key, message)?,
        };
        Ok(signature)
    }

    /// Verifies a signature produced by [`Self::asymmetric_sign`].
    pub fn asymmetric_verify(
        &self,
        public_key: &RsaPublicKey,
        message: &[u8],
        signature: &[u8],
    ) -> Result<(), CryptoProviderError> {
        let policy = self.client_server()?;
        let params = policy.params();
        let digest = to_signing(
            params
                .signing_digest
                .ok_or(CryptoProviderError::NotApplicable)?,
        );
        match params
            .signature_padding
            .ok_or(CryptoProviderError::NotApplicable)?
        {
            SignaturePadding::Pkcs1v15 => {
                crypto_rsa::verify_pkcs1v15(public_key, digest, message, signature)?
            }
            SignaturePadding::Pss => crypto_rsa::verify_pss(public_key, message, signature)?,
        };
        Ok(())
    }

    // ---- PubSub CTR --------------------------------------------------------

    /// Applies AES-256-CTR keystream to `buffer` in place. The counter block
    /// is `key_nonce(4B) ∥ message_random(4B) ∥ sequence_number(4B,
    /// little-endian) ∥ block_counter=0(4B)`.
    ///
    /// The source marks the sequence-number endianness TBD; this workspace
    /// fixes it to little-endian (see the design ledger).
    pub fn pubsub_ctr_crypt(
        &self,
        key: &[u8; 32],
        key_nonce: &[u8; 4],
        message_random: &[u8; 4],
        sequence_number: u32,
        buffer: &mut [u8],
    ) -> Result<(), CryptoProviderError> {
        self.pubsub()?;
        let mut counter_block = [0u8; 16];
        counter_block[0..4].copy_from_slice(key_nonce);
        counter_block[4..8].copy_from_slice(message_random);
        counter_block[8..12].copy_from_slice(&sequence_number.to_le_bytes());
        // block_counter starts at 0, left zeroed.
        let key = crypto_cipher::Key256::from_bytes(*key);
        let block = crypto_cipher::Block16::from_bytes(counter_block);
        crypto_cipher::ctr_apply_256(&key, &block, buffer);
        Ok(())
    }

    // ---- Certificate verification ------------------------------------------

    /// Delegates chain validation to `pki`, then checks that the
    /// certificate's RSA key falls within this policy's bit-size bounds.
    pub fn certificate_verify(
        &self,
        pki: &PkiValidator,
        cert: &Certificate,
    ) -> Result<(), CryptoProviderError> {
        if let Err(err) = pki.validate(cert) {
            warn!(subject = %cert.subject(), error = %err, "certificate chain validation failed");
            return Err(err.into());
        }

        let policy = self.client_server()?;
        let (min_bits, max_bits) = policy
            .params()
            .asym_key_bits
            .ok_or(CryptoProviderError::NotApplicable)?;
        let public_key = cert
            .public_key()
            .map_err(|_| CryptoProviderError::KeyOutOfBounds)?;
        let bits = crypto_rsa::key_size_bits(public_key.inner()) as u32;
        if bits < min_bits || bits > max_bits {
            warn!(subject = %cert.subject(), bits, min_bits, max_bits, "certificate key size out of policy bounds");
            return Err(CryptoProviderError::KeyOutOfBounds);
        }
        Ok(())
    }
}

fn to_oaep(hash: HashAlgorithm) -> crypto_rsa::OaepHash {
    match hash {
        HashAlgorithm::Sha1 => crypto_rsa::OaepHash::Sha1,
        HashAlgorithm::Sha256 => crypto_rsa::OaepHash::Sha256,
    }
}

fn to_signing(hash: HashAlgorithm) -> crypto_rsa::SigningDigest {
    match hash {
        HashAlgorithm::Sha1 => crypto_rsa::SigningDigest::Sha1,
        HashAlgorithm::Sha256 => crypto_rsa::SigningDigest::Sha256,
    }
}

fn to_prf(hash: HashAlgorithm) -> crypto_kdf::PrfHash {
    match hash {
        HashAlgorithm::Sha1 => crypto_kdf::PrfHash::Sha1,
        HashAlgorithm::Sha256 => crypto_kdf::PrfHash::Sha256,
    }
}
