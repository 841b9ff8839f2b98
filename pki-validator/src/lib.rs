//! Certificate chain trust validation against configured trust lists and
//! revocation lists.
//!
//! ## Overview
//!
//! A [`PkiValidator`] is built from one of three construction variants —
//! [`PkiValidator::minimal`] (a single trusted CA plus its CRL),
//! [`PkiValidator::from_lists`] (explicit trusted/untrusted root and
//! intermediate lists, issued certificates, and CRLs), or
//! [`PkiValidator::from_store`] (the same lists, loaded from a conventional
//! directory layout) — and then used to [`PkiValidator::validate`]
//! certificates against those lists.
//!
//! Validation walks the presented certificate's issuer chain. A trusted root
//! terminates the walk with success; its own parent, if any, is never
//! consulted. A certificate appearing in the issued-certificates list is
//! trusted on its own, but its issuing chain must still be present (in
//! either the trusted or untrusted lists) so that its CRL status can be
//! checked. Matching an issuer by distinguished name is not enough to trust
//! it: every non-root certificate in the chain must also verify against its
//! alleged issuer's public key, or validation fails with
//! [`ValidationErrorKind::SignatureInvalid`]. Every non-leaf certificate in
//! the chain is cross-checked against its issuer's CRL; every certificate's
//! validity dates are checked against the current time.

use key_manager::{Certificate, CrlList, KeyManagerError};
use std::path::Path;

/// The concrete reason a certificate failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    Expired,
    Revoked,
    Untrusted,
    ChainIncomplete,
    SignatureInvalid,
}

/// Errors from constructing or running a [`PkiValidator`].
#[derive(Debug, thiserror::Error)]
pub enum PkiError {
    #[error("failed to load certificate or CRL material: {0}")]
    KeyManager(#[from] KeyManagerError),
    #[error("issuer {0} has no matching CRL in the provided trust lists")]
    MissingCrl(String),
    #[error("certificate failed validation: {0:?}")]
    Invalid(ValidationErrorKind),
}

/// Certificate trust roles, mirroring the path-based construction variant.
struct TrustLists {
    trusted_roots: Vec<Certificate>,
    trusted_intermediates: Vec<Certificate>,
    untrusted_roots: Vec<Certificate>,
    untrusted_intermediates: Vec<Certificate>,
    issued_certs: Vec<Certificate>,
    crls: CrlList,
}

/// Validates certificates against a configured set of trust anchors and
/// revocation lists.
pub struct PkiValidator {
    lists: TrustLists,
}

impl PkiValidator {
    /// Minimal construction: one trusted CA certificate and its CRL. This is
    /// the safest configuration — every certificate must chain directly to
    /// this single authority.
    pub fn minimal(ca_cert_der: &[u8], crl_der: &[u8]) -> Result<Self, PkiError> {
        let root = Certificate::from_der(ca_cert_der)?;
        let crl = CrlList::from_der_list(&[crl_der])?;
        Ok(Self {
            lists: TrustLists {
                trusted_roots: vec![root],
                trusted_intermediates: Vec::new(),
                untrusted_roots: Vec::new(),
                untrusted_intermediates: Vec::new(),
                issued_certs: Vec::new(),
                crls: crl,
            },
        })
    }

    /// Path-based construction from explicit DER-encoded trust lists.
    ///
    /// `trusted_intermediates` and `untrusted_intermediates` MUST be ordered
    /// child-before-parent. Every CA appearing in any issuer list must have
    /// a matching CRL, or construction fails.
    pub fn from_lists(
        trusted_roots: &[&[u8]],
        trusted_intermediates: &[&[u8]],
        untrusted_roots: &[&[u8]],
        untrusted_intermediates: &[&[u8]],
        issued_certs: &[&[u8]],
        crls: &[&[u8]],
    ) -> Result<Self, PkiError> {
        let parse_all = |blobs: &[&[u8]]| -> Result<Vec<Certificate>, PkiError> {
            blobs
                .iter()
                .map(|b| Certificate::from_der(b).map_err(PkiError::from))
                .collect()
        };
        let trusted_roots = parse_all(trusted_roots)?;
        let trusted_intermediates = parse_all(trusted_intermediates)?;
        let untrusted_roots = parse_all(untrusted_roots)?;
        let untrusted_intermediates = parse_all(untrusted_intermediates)?;
        let issued_certs = parse_all(issued_certs)?;
        let crls = CrlList::from_der_list(crls)?;

        let lists = TrustLists {
            trusted_roots,
            trusted_intermediates,
            untrusted_roots,
            untrusted_intermediates,
            issued_certs,
            crls,
        };
        lists.check_crl_completeness()?;
        Ok(Self { lists })
    }

    /// Store-based construction from a directory using the conventional
    /// layout: `trusted/roots`, `trusted/intermediates`, `untrusted/roots`,
    /// `untrusted/intermediates`, `issued`, `crl`, each holding `.der` files.
    pub fn from_store(root: impl AsRef<Path>) -> Result<Self, PkiError> {
        let root = root.as_ref();
        let read_der_dir = |dir: std::path::PathBuf| -> Result<Vec<Vec<u8>>, PkiError> {
            let mut out = Vec::new();
            if !dir.is_dir() {
                return Ok(out);
            }
            let mut entries: Vec<_> = std::fs::read_dir(&dir)
                .map_err(KeyManagerError::from)?
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().map(|ext| ext == "der").unwrap_or(false))
                .collect();
            entries.sort();
            for path in entries {
                out.push(std::fs::read(path).map_err(KeyManagerError::from)?);
            }
            Ok(out)
        };

        let trusted_roots = read_der_dir(root.join("trusted/roots"))?;
        let trusted_intermediates = read_der_dir(root.join("trusted/intermediates"))?;
        let untrusted_roots = read_der_dir(root.join("untrusted/roots"))?;
        let untrusted_intermediates = read_der_dir(root.join("untrusted/intermediates"))?;
        let issued_certs = read_der_dir(root.join("issued"))?;
        let crls = read_der_dir(root.join("crl"))?;

        let as_slices = |v: &[Vec<u8>]| v.iter().map(|b| b.as_slice()).collect::<Vec<_>>();
        Self::from_lists(
            &as_slices(&trusted_roots),
            &as_slices(&trusted_intermediates),
            &as_slices(&untrusted_roots),
            &as_slices(&untrusted_intermediates),
            &as_slices(&issued_certs),
            &as_slices(&crls),
        )
    }

    /// Validates `cert` against the configured trust lists, returning the
    /// concrete failure kind on error.
    pub fn validate(&self, cert: &Certificate) -> Result<(), PkiError> {
        self.lists.check_validity_dates(cert)?;

        let is_issued = self.lists.issued_cert_thumbprint_match(cert);

        let mut current = cert;
        let mut visited_thumbprints = vec![current.thumbprint()];
        loop {
            if self.lists.is_trusted_root(current) {
                return Ok(());
            }

            if current.subject() != current.issuer() {
                self.lists.check_crl(current)?;
            }

            let Some(parent) = self.lists.find_issuer(current) else {
                if is_issued || self.lists.is_trusted_root(cert) {
                    return Err(PkiError::Invalid(ValidationErrorKind::ChainIncomplete));
                }
                return Err(PkiError::Invalid(ValidationErrorKind::Untrusted));
            };

            self.lists.check_validity_dates(parent)?;

            let issuer_public_key = parent
                .public_key()
                .map_err(|_| PkiError::Invalid(ValidationErrorKind::SignatureInvalid))?;
            current
                .verify_signed_by(&issuer_public_key)
                .map_err(|_| PkiError::Invalid(ValidationErrorKind::SignatureInvalid))?;

            let parent_thumbprint = parent.thumbprint();
            if visited_thumbprints.contains(&parent_thumbprint) {
                return Err(PkiError::Invalid(ValidationErrorKind::ChainIncomplete));
            }
            visited_thumbprints.push(parent_thumbprint);
            current = parent;
        }
    }
}

impl TrustLists {
    fn all_issuer_certs(&self) -> impl Iterator<Item = &Certificate> {
        self.trusted_roots
            .iter()
            .chain(self.trusted_intermediates.iter())
            .chain(self.untrusted_roots.iter())
            .chain(self.untrusted_intermediates.iter())
    }

    fn check_crl_completeness(&self) -> Result<(), PkiError> {
        for ca in self.all_issuer_certs() {
            let subject = ca.subject();
            if self.crls.find_for_issuer(&subject).is_none() {
                return Err(PkiError::MissingCrl(subject));
            }
        }
        Ok(())
    }

    fn is_trusted_root(&self, cert: &Certificate) -> bool {
        self.trusted_roots
            .iter()
            .any(|root| root.thumbprint() == cert.thumbprint())
    }

    fn issued_cert_thumbprint_match(&self, cert: &Certificate) -> bool {
        self.issued_certs
            .iter()
            .any(|issued| issued.thumbprint() == cert.thumbprint())
    }

    fn find_issuer<'a>(&'a self, cert: &Certificate) -> Option<&'a Certificate> {
        let issuer_name = cert.issuer();
        self.all_issuer_certs()
            .find(|candidate| candidate.subject() == issuer_name)
    }

    fn check_validity_dates(&self, cert: &Certificate) -> Result<(), PkiError> {
        let (not_before, not_after) = cert.validity();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default();
        let not_before = not_before.to_date_time().unix_duration();
        let not_after = not_after.to_date_time().unix_duration();
        if now < not_before || now > not_after {
            return Err(PkiError::Invalid(ValidationErrorKind::Expired));
        }
        Ok(())
    }

    fn check_crl(&self, cert: &Certificate) -> Result<(), PkiError> {
        let issuer_name = cert.issuer();
        let Some(crl) = self.crls.find_for_issuer(&issuer_name) else {
            return Err(PkiError::Invalid(ValidationErrorKind::ChainIncomplete));
        };
        if crl.is_revoked(cert.serial_number()) {
            return Err(PkiError::Invalid(ValidationErrorKind::Revoked));
        }
        Ok(())
    }
}
