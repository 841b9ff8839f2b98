//! The Security Policy registry.
//!
//! A Security Policy is a named, static bundle of algorithm choices and key
//! sizes, keyed by a URI. Everything downstream — the crypto provider, the
//! key/certificate manager, the PKI validator — asks a [`SecurityPolicy`] for
//! parameters rather than hard-coding them, so that adding a policy is a
//! matter of adding one table row plus the supporting primitive, not
//! threading a new constant through every call site.
//!
//! Policies are bit-exact: the parameters below (key sizes, signature
//! lengths, hash choices) are fixed by the OPC UA specification and must not
//! drift.

use std::str::FromStr;

/// A hash algorithm used by a security policy, either for OAEP padding or
/// for signing digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

/// The asymmetric signature scheme a policy uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignaturePadding {
    /// RSASSA-PKCS#1 v1.5.
    Pkcs1v15,
    /// RSASSA-PSS.
    Pss,
}

/// The client-server Security Policies this workspace supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecurityPolicy {
    None,
    Basic256,
    Basic256Sha256,
    Aes128Sha256RsaOaep,
    Aes256Sha256RsaPss,
}

/// The PubSub-only Security Policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PubSubSecurityPolicy {
    Aes256Ctr,
}

/// Error returned when a policy URI is not recognized, or a query is made
/// that does not apply to the given policy.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PolicyError {
    #[error("unknown security policy URI: {0}")]
    UnknownUri(String),
    #[error("operation not defined for this security policy")]
    NotApplicable,
}

/// Bit-exact parameters of a client-server Security Policy.
///
/// Any field set to `None` means the operation the field describes is not
/// supported by the policy (e.g. `Policy::None` has no symmetric key sizes
/// because it performs no cryptography at all).
#[derive(Debug, Clone, Copy)]
pub struct SecurityPolicyParams {
    pub uri: &'static str,
    /// AES block size, bytes.
    pub sym_block_size: Option<usize>,
    /// AES key size, bytes.
    pub sym_key_size: Option<usize>,
    /// HMAC key size, bytes.
    pub sym_sign_key_size: Option<usize>,
    /// HMAC tag length, bytes.
    pub sym_signature_size: Option<usize>,
    /// Inclusive minimum/maximum RSA modulus size, in bits.
    pub asym_key_bits: Option<(u32, u32)>,
    pub oaep_hash: Option<HashAlgorithm>,
    pub signing_digest: Option<HashAlgorithm>,
    pub signature_padding: Option<SignaturePadding>,
    /// Algorithm URI carried in `SignatureData.algorithm`.
    pub asymmetric_signature_algorithm_uri: &'static str,
    pub asymmetric_encryption_algorithm_uri: &'static str,
    pub certificate_thumbprint_size: usize,
    pub nonce_size: usize,
    pub requires_asymmetric_encryption: bool,
}

const NONE_PARAMS: SecurityPolicyParams = SecurityPolicyParams {
    uri: "http://opcfoundation.org/UA/SecurityPolicy#None",
    sym_block_size: None,
    sym_key_size: None,
    sym_sign_key_size: None,
    sym_signature_size: None,
    asym_key_bits: None,
    oaep_hash: None,
    signing_digest: None,
    signature_padding: None,
    asymmetric_signature_algorithm_uri: "",
    asymmetric_encryption_algorithm_uri: "",
    certificate_thumbprint_size: 20,
    nonce_size: 32,
    requires_asymmetric_encryption: false,
};

const BASIC256_PARAMS: SecurityPolicyParams = SecurityPolicyParams {
    uri: "http://opcfoundation.org/UA/SecurityPolicy#Basic256",
    sym_block_size: Some(16),
    sym_key_size: Some(32),
    sym_sign_key_size: Some(24),
    sym_signature_size: Some(20),
    asym_key_bits: Some((1024, 2048)),
    oaep_hash: Some(HashAlgorithm::Sha1),
    signing_digest: Some(HashAlgorithm::Sha1),
    signature_padding: Some(SignaturePadding::Pkcs1v15),
    asymmetric_signature_algorithm_uri: "http://www.w3.org/2000/09/xmldsig#rsa-sha1",
    asymmetric_encryption_algorithm_uri: "http://www.w3.org/2001/04/xmlenc#rsa-oaep",
    certificate_thumbprint_size: 20,
    nonce_size: 32,
    requires_asymmetric_encryption: true,
};

const BASIC256SHA256_PARAMS: SecurityPolicyParams = SecurityPolicyParams {
    uri: "http://opcfoundation.org/UA/SecurityPolicy#Basic256Sha256",
    sym_block_size: Some(16),
    sym_key_size: Some(32),
    sym_sign_key_size: Some(32),
    sym_signature_size: Some(32),
    asym_key_bits: Some((2048, 4096)),
    oaep_hash: Some(HashAlgorithm::Sha1),
    signing_digest: Some(HashAlgorithm::Sha256),
    signature_padding: Some(SignaturePadding::Pkcs1v15),
    asymmetric_signature_algorithm_uri: "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
    asymmetric_encryption_algorithm_uri: "http://www.w3.org/2001/04/xmlenc#rsa-oaep",
    certificate_thumbprint_size: 20,
    nonce_size: 32,
    requires_asymmetric_encryption: true,
};

const AES128_SHA256_RSAOAEP_PARAMS: SecurityPolicyParams = SecurityPolicyParams {
    uri: "http://opcfoundation.org/UA/SecurityPolicy#Aes128_Sha256_RsaOaep",
    sym_block_size: Some(16),
    sym_key_size: Some(16),
    sym_sign_key_size: Some(32),
    sym_signature_size: Some(32),
    asym_key_bits: Some((2048, 4096)),
    oaep_hash: Some(HashAlgorithm::Sha1),
    signing_digest: Some(HashAlgorithm::Sha256),
    signature_padding: Some(SignaturePadding::Pkcs1v15),
    asymmetric_signature_algorithm_uri: "http://www.w3.org/2001/04/xmldsig-more#rsa-sha256",
    asymmetric_encryption_algorithm_uri: "http://www.w3.org/2001/04/xmlenc#rsa-oaep",
    certificate_thumbprint_size: 20,
    nonce_size: 32,
    requires_asymmetric_encryption: true,
};

const AES256_SHA256_RSAPSS_PARAMS: SecurityPolicyParams = SecurityPolicyParams {
    uri: "http://opcfoundation.org/UA/SecurityPolicy#Aes256_Sha256_RsaPss",
    sym_block_size: Some(16),
    sym_key_size: Some(32),
    sym_sign_key_size: Some(32),
    sym_signature_size: Some(32),
    asym_key_bits: Some((2048, 4096)),
    oaep_hash: Some(HashAlgorithm::Sha256),
    signing_digest: Some(HashAlgorithm::Sha256),
    signature_padding: Some(SignaturePadding::Pss),
    asymmetric_signature_algorithm_uri: "http://opcfoundation.org/UA/security/rsa-pss-sha2-256",
    asymmetric_encryption_algorithm_uri: "http://opcfoundation.org/UA/security/rsa-oaep-sha2-256",
    certificate_thumbprint_size: 20,
    nonce_size: 32,
    requires_asymmetric_encryption: true,
};

impl SecurityPolicy {
    /// The bit-exact parameter table row for this policy.
    pub const fn params(self) -> &'static SecurityPolicyParams {
        match self {
            SecurityPolicy::None => &NONE_PARAMS,
            SecurityPolicy::Basic256 => &BASIC256_PARAMS,
            SecurityPolicy::Basic256Sha256 => &BASIC256SHA256_PARAMS,
            SecurityPolicy::Aes128Sha256RsaOaep => &AES128_SHA256_RSAOAEP_PARAMS,
            SecurityPolicy::Aes256Sha256RsaPss => &AES256_SHA256_RSAPSS_PARAMS,
        }
    }

    /// The policy's URI.
    pub fn uri(self) -> &'static str {
        self.params().uri
    }

    /// The HMAC hash used in `derive_pseudo_random_data`'s A(i)/seed chain.
    ///
    /// Every policy except `Basic256` uses HMAC-SHA256 for this purpose,
    /// even policies whose OAEP padding hash is SHA-1.
    pub fn prf_hash(self) -> HashAlgorithm {
        match self {
            SecurityPolicy::Basic256 => HashAlgorithm::Sha1,
            _ => HashAlgorithm::Sha256,
        }
    }
}

impl FromStr for SecurityPolicy {
    type Err = PolicyError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
            SecurityPolicy::Aes128Sha256RsaOaep,
            SecurityPolicy::Aes256Sha256RsaPss,
        ] {
            if policy.uri() == uri {
                return Ok(policy);
            }
        }
        Err(PolicyError::UnknownUri(uri.to_string()))
    }
}

impl PubSubSecurityPolicy {
    pub fn uri(self) -> &'static str {
        match self {
            PubSubSecurityPolicy::Aes256Ctr => {
                "http://opcfoundation.org/UA/SecurityPolicy#PubSub_Aes256_CTR"
            }
        }
    }

    /// Symmetric key size for the PubSub CTR cipher, bytes.
    pub fn sym_key_size(self) -> usize {
        32
    }

    /// HMAC key size used to protect PubSub messages, bytes.
    pub fn sym_sign_key_size(self) -> usize {
        32
    }

    pub fn sym_signature_size(self) -> usize {
        32
    }

    /// Length of the derived per-message key-nonce, bytes.
    pub fn key_nonce_size(self) -> usize {
        4
    }

    /// Length of the per-message random value mixed into the counter block,
    /// bytes.
    pub fn message_random_size(self) -> usize {
        4
    }
}

impl FromStr for PubSubSecurityPolicy {
    type Err = PolicyError;

    fn from_str(uri: &str) -> Result<Self, Self::Err> {
        if uri == PubSubSecurityPolicy::Aes256Ctr.uri() {
            Ok(PubSubSecurityPolicy::Aes256Ctr)
        } else {
            Err(PolicyError::UnknownUri(uri.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_uri() {
        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
            SecurityPolicy::Aes128Sha256RsaOaep,
            SecurityPolicy::Aes256Sha256RsaPss,
        ] {
            assert_eq!(SecurityPolicy::from_str(policy.uri()).unwrap(), policy);
        }
    }

    #[test]
    fn unknown_uri_is_rejected() {
        assert!(matches!(
            SecurityPolicy::from_str("http://example.com/not-a-policy"),
            Err(PolicyError::UnknownUri(_))
        ));
    }

    #[test]
    fn basic256_uses_sha1_prf() {
        assert_eq!(SecurityPolicy::Basic256.prf_hash(), HashAlgorithm::Sha1);
    }

    #[test]
    fn other_policies_use_sha256_prf() {
        assert_eq!(
            SecurityPolicy::Basic256Sha256.prf_hash(),
            HashAlgorithm::Sha256
        );
        assert_eq!(
            SecurityPolicy::Aes128Sha256RsaOaep.prf_hash(),
            HashAlgorithm::Sha256
        );
        assert_eq!(
            SecurityPolicy::Aes256Sha256RsaPss.prf_hash(),
            HashAlgorithm::Sha256
        );
    }

    #[test]
    fn none_policy_has_no_symmetric_parameters() {
        let params = SecurityPolicy::None.params();
        assert!(params.sym_block_size.is_none());
        assert!(params.sym_key_size.is_none());
        assert!(!params.requires_asymmetric_encryption);
    }

    #[test]
    fn nonce_and_thumbprint_sizes_are_uniform() {
        for policy in [
            SecurityPolicy::None,
            SecurityPolicy::Basic256,
            SecurityPolicy::Basic256Sha256,
            SecurityPolicy::Aes128Sha256RsaOaep,
            SecurityPolicy::Aes256Sha256RsaPss,
        ] {
            assert_eq!(policy.params().nonce_size, 32);
            assert_eq!(policy.params().certificate_thumbprint_size, 20);
        }
    }

    #[test]
    fn aes256_rsapss_uses_pss_and_sha256_oaep() {
        let params = SecurityPolicy::Aes256Sha256RsaPss.params();
        assert_eq!(params.signature_padding, Some(SignaturePadding::Pss));
        assert_eq!(params.oaep_hash, Some(HashAlgorithm::Sha256));
    }

    #[test]
    fn pubsub_policy_roundtrips() {
        let p = PubSubSecurityPolicy::Aes256Ctr;
        assert_eq!(PubSubSecurityPolicy::from_str(p.uri()).unwrap(), p);
        assert_eq!(p.sym_key_size(), 32);
        assert_eq!(p.key_nonce_size() + p.message_random_size(), 8);
    }
}
