//! Parsing, serialization, and derivation for certificates and private keys.
//!
//! ## Overview
//!
//! This crate owns every operation that touches the byte representation of
//! X.509 certificates and RSA private keys: parsing DER (single certificate
//! or chain), parsing PEM/DER private keys (optionally password-protected),
//! deriving a certificate's public key, serializing both back to bytes for
//! storage, and parsing CRLs. It does not decide whether a certificate
//! should be trusted — that is the PKI validator's job, one layer up.
//!
//! ## Security notes
//!
//! - A private-key password is forwarded to the PKCS#8 decryption routine
//!   exactly once and is never retained by this crate.
//! - Deserialized private keys live inside `rsa::RsaPrivateKey`, which
//!   zeroizes its internal buffers on drop.

use der::{Decode, Encode};
use rsa::pkcs1v15::Pkcs1v15Sign;
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use x509_cert::crl::CertificateList;
use x509_cert::Certificate as X509Certificate;

/// `sha1WithRSAEncryption`, RFC 3279.
const OID_SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
/// `sha256WithRSAEncryption`, RFC 4055.
const OID_SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";

/// Errors from certificate and key parsing/serialization.
#[derive(Debug, thiserror::Error)]
pub enum KeyManagerError {
    #[error("failed to parse DER certificate: {0}")]
    CertificateDer(der::Error),
    #[error("failed to parse private key: {0}")]
    PrivateKey(String),
    #[error("failed to derive public key from certificate: {0}")]
    PublicKeyDerivation(String),
    #[error("I/O error reading key or certificate material: {0}")]
    Io(#[from] std::io::Error),
    #[error("certificate chain input was empty")]
    EmptyChain,
    #[error("failed to parse DER certificate revocation list: {0}")]
    CrlDer(der::Error),
    #[error("certificate signature does not verify against the issuer's public key")]
    SignatureInvalid,
    #[error("certificate signature algorithm {0} is not supported")]
    UnsupportedSignatureAlgorithm(String),
}

/// A parsed, DER-backed X.509 certificate.
pub struct Certificate {
    inner: X509Certificate,
    der: Vec<u8>,
}

/// An ordered chain of certificates, leaf first.
pub struct CertificateChain(pub Vec<Certificate>);

/// A parsed RSA private key.
pub struct PrivateKey(RsaPrivateKey);

/// A parsed RSA public key.
pub struct PublicKey(RsaPublicKey);

impl Certificate {
    /// Parses a single DER-encoded certificate.
    pub fn from_der(bytes: &[u8]) -> Result<Self, KeyManagerError> {
        let inner = X509Certificate::from_der(bytes).map_err(KeyManagerError::CertificateDer)?;
        Ok(Self {
            inner,
            der: bytes.to_vec(),
        })
    }

    /// Reads and parses a single DER-encoded certificate from `path`.
    pub fn from_der_file(path: impl AsRef<std::path::Path>) -> Result<Self, KeyManagerError> {
        let bytes = std::fs::read(path)?;
        Self::from_der(&bytes)
    }

    /// The DER encoding of this certificate, as originally parsed.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// The certificate's validity window.
    pub fn validity(&self) -> (x509_cert::time::Time, x509_cert::time::Time) {
        let v = &self.inner.tbs_certificate.validity;
        (v.not_before, v.not_after)
    }

    /// The certificate's issuer distinguished name, rendered for diagnostics.
    pub fn issuer(&self) -> String {
        self.inner.tbs_certificate.issuer.to_string()
    }

    /// The certificate's subject distinguished name, rendered for
    /// diagnostics.
    pub fn subject(&self) -> String {
        self.inner.tbs_certificate.subject.to_string()
    }

    /// The SHA-1 thumbprint of the DER encoding — 20 bytes, matching the
    /// certificate-thumbprint length every Security Policy uses.
    pub fn thumbprint(&self) -> [u8; 20] {
        let digest = Sha1::digest(&self.der);
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        out
    }

    /// Derives this certificate's RSA public key.
    pub fn public_key(&self) -> Result<PublicKey, KeyManagerError> {
        let spki = &self.inner.tbs_certificate.subject_public_key_info;
        let spki_der = spki
            .to_der()
            .map_err(|e| KeyManagerError::PublicKeyDerivation(e.to_string()))?;
        let key = RsaPublicKey::from_public_key_der(&spki_der)
            .map_err(|e| KeyManagerError::PublicKeyDerivation(e.to_string()))?;
        Ok(PublicKey(key))
    }

    pub(crate) fn inner(&self) -> &X509Certificate {
        &self.inner
    }

    /// Verifies that this certificate's signature was produced by
    /// `issuer_public_key` over this certificate's TBS structure. Supports
    /// the two signature algorithms this stack's Security Policies use:
    /// `sha1WithRSAEncryption` and `sha256WithRSAEncryption`, both
    /// RSASSA-PKCS#1-v1.5.
    pub fn verify_signed_by(&self, issuer_public_key: &PublicKey) -> Result<(), KeyManagerError> {
        let tbs_der = self
            .inner
            .tbs_certificate
            .to_der()
            .map_err(KeyManagerError::CertificateDer)?;
        let signature = self.inner.signature.raw_bytes();
        let oid = self.inner.signature_algorithm.oid.to_string();

        let verified = match oid.as_str() {
            OID_SHA1_WITH_RSA => {
                let hashed = Sha1::digest(&tbs_der);
                issuer_public_key
                    .0
                    .verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, signature)
            }
            OID_SHA256_WITH_RSA => {
                let hashed = Sha256::digest(&tbs_der);
                issuer_public_key
                    .0
                    .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature)
            }
            other => return Err(KeyManagerError::UnsupportedSignatureAlgorithm(other.to_string())),
        };

        verified.map_err(|_| KeyManagerError::SignatureInvalid)
    }
}

impl CertificateChain {
    /// Parses an ordered sequence of DER-encoded certificates, leaf first.
    pub fn from_der_list(blobs: &[&[u8]]) -> Result<Self, KeyManagerError> {
        if blobs.is_empty() {
            return Err(KeyManagerError::EmptyChain);
        }
        let certs = blobs
            .iter()
            .map(|b| Certificate::from_der(b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(certs))
    }

    pub fn leaf(&self) -> &Certificate {
        &self.0[0]
    }
}

impl PrivateKey {
    /// Parses an unencrypted PKCS#8 PEM private key.
    pub fn from_pkcs8_pem(pem: &str) -> Result<Self, KeyManagerError> {
        let key = RsaPrivateKey::from_pkcs8_pem(pem)
            .map_err(|e| KeyManagerError::PrivateKey(e.to_string()))?;
        Ok(Self(key))
    }

    /// Parses an unencrypted PKCS#8 DER private key.
    pub fn from_pkcs8_der(bytes: &[u8]) -> Result<Self, KeyManagerError> {
        let key = RsaPrivateKey::from_pkcs8_der(bytes)
            .map_err(|e| KeyManagerError::PrivateKey(e.to_string()))?;
        Ok(Self(key))
    }

    /// Parses a password-encrypted PKCS#8 DER private key. The password is
    /// forwarded to the decryption routine exactly once and is not retained.
    pub fn from_encrypted_pkcs8_der(
        bytes: &[u8],
        password: &[u8],
    ) -> Result<Self, KeyManagerError> {
        let encrypted = pkcs8::EncryptedPrivateKeyInfo::try_from(bytes)
            .map_err(|e| KeyManagerError::PrivateKey(e.to_string()))?;
        let decrypted = encrypted
            .decrypt(password)
            .map_err(|e| KeyManagerError::PrivateKey(e.to_string()))?;
        let key = RsaPrivateKey::from_pkcs8_der(decrypted.as_bytes())
            .map_err(|e| KeyManagerError::PrivateKey(e.to_string()))?;
        Ok(Self(key))
    }

    /// Serializes this key as unencrypted PKCS#8 DER, for storage.
    pub fn to_pkcs8_der(&self) -> Result<Vec<u8>, KeyManagerError> {
        self.0
            .to_pkcs8_der()
            .map(|doc| doc.as_bytes().to_vec())
            .map_err(|e| KeyManagerError::PrivateKey(e.to_string()))
    }

    pub fn inner(&self) -> &RsaPrivateKey {
        &self.0
    }
}

impl PublicKey {
    pub fn inner(&self) -> &RsaPublicKey {
        &self.0
    }
}

/// A single parsed certificate revocation list. Each CRL belongs to exactly
/// one issuing CA; a validator holds one per CA in its trust lists.
pub struct Crl {
    inner: CertificateList,
}

/// A collection of CRLs, as loaded from a store or path list. One CRL per
/// issuing CA is expected; the PKI validator enforces that invariant.
#[derive(Default)]
pub struct CrlList(pub Vec<Crl>);

impl Crl {
    /// Parses a single DER-encoded CRL.
    pub fn from_der(bytes: &[u8]) -> Result<Self, KeyManagerError> {
        let inner = CertificateList::from_der(bytes).map_err(KeyManagerError::CrlDer)?;
        Ok(Self { inner })
    }

    /// Reads and parses a single DER-encoded CRL from `path`.
    pub fn from_der_file(path: impl AsRef<std::path::Path>) -> Result<Self, KeyManagerError> {
        let bytes = std::fs::read(path)?;
        Self::from_der(&bytes)
    }

    /// The CRL issuer's distinguished name, used to match a CRL to the CA it
    /// revokes certificates for.
    pub fn issuer(&self) -> String {
        self.inner.tbs_cert_list.issuer.to_string()
    }

    /// Whether `serial` appears among this CRL's revoked certificate entries.
    pub fn is_revoked(&self, serial: &[u8]) -> bool {
        let Some(revoked) = &self.inner.tbs_cert_list.revoked_certificates else {
            return false;
        };
        revoked
            .iter()
            .any(|entry| entry.serial_number.as_bytes() == serial)
    }
}

impl CrlList {
    /// Parses a list of DER-encoded CRLs.
    pub fn from_der_list(blobs: &[&[u8]]) -> Result<Self, KeyManagerError> {
        let crls = blobs
            .iter()
            .map(|b| Crl::from_der(b))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self(crls))
    }

    /// Finds the CRL belonging to the given issuer name, if any.
    pub fn find_for_issuer(&self, issuer: &str) -> Option<&Crl> {
        self.0.iter().find(|crl| crl.issuer() == issuer)
    }
}

impl Certificate {
    /// This certificate's serial number, as used for CRL entry matching.
    pub fn serial_number(&self) -> &[u8] {
        self.inner.tbs_certificate.serial_number.as_bytes()
    }
}
