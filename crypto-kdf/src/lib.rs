//! The TLS-PRF–style pseudo-random function used to derive Secure Channel
//! key sets from the client and server nonces.
//!
//! ## Overview
//!
//! `P_hash(secret, seed)` is the classic TLS 1.0/1.1 pseudo-random function:
//!
//! ```text
//! A(0) = seed
//! A(i) = HMAC_hash(secret, A(i-1))
//! P_hash(secret, seed) = HMAC_hash(secret, A(1) || seed)
//!                      || HMAC_hash(secret, A(2) || seed)
//!                      || ...
//! ```
//!
//! truncated to the requested output length. `Basic256` chains with
//! HMAC-SHA1; every other client-server policy chains with HMAC-SHA256.
//!
//! A Secure Channel key set is derived by running this PRF twice: once with
//! the server nonce as secret and the client nonce as seed (producing the
//! client's sign/encrypt/IV triple), and once with the roles reversed
//! (producing the server's triple). Both sides compute both triples and
//! agree, because both hold both nonces.

use hmac::{Hmac, Mac};
use sha1::Sha1;
use sha2::Sha256;
use zeroize::Zeroize;

type HmacSha1 = Hmac<Sha1>;
type HmacSha256 = Hmac<Sha256>;

/// Which HMAC hash chains the PRF, selected by Security Policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrfHash {
    Sha1,
    Sha256,
}

/// Computes `P_hash(secret, seed)`, truncated to `out_len` bytes.
pub fn derive_pseudo_random_data(
    hash: PrfHash,
    secret: &[u8],
    seed: &[u8],
    out_len: usize,
) -> Vec<u8> {
    match hash {
        PrfHash::Sha1 => p_hash::<Sha1Mac>(secret, seed, out_len),
        PrfHash::Sha256 => p_hash::<Sha256Mac>(secret, seed, out_len),
    }
}

/// The three slice lengths making up a key set: `(sign_key, encrypt_key, iv)`.
#[derive(Debug, Clone, Copy)]
pub struct KeySetLengths {
    pub sign_key_len: usize,
    pub encrypt_key_len: usize,
    pub iv_len: usize,
}

impl KeySetLengths {
    fn total(&self) -> usize {
        self.sign_key_len + self.encrypt_key_len + self.iv_len
    }
}

/// One side's derived key material: `sign_key || encrypt_key || iv`, split.
pub struct DerivedKeySet {
    pub sign_key: Vec<u8>,
    pub encrypt_key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Drop for DerivedKeySet {
    fn drop(&mut self) {
        self.sign_key.zeroize();
        self.encrypt_key.zeroize();
        self.iv.zeroize();
    }
}

fn split(mut material: Vec<u8>, lengths: KeySetLengths) -> DerivedKeySet {
    let iv = material.split_off(lengths.sign_key_len + lengths.encrypt_key_len);
    let encrypt_key = material.split_off(lengths.sign_key_len);
    let sign_key = material;
    DerivedKeySet {
        sign_key,
        encrypt_key,
        iv,
    }
}

/// Derives both sides' key sets from the client and server nonces.
///
/// Returns `(client_key_set, server_key_set)`.
pub fn derive_key_sets(
    hash: PrfHash,
    client_nonce: &[u8],
    server_nonce: &[u8],
    lengths: KeySetLengths,
) -> (DerivedKeySet, DerivedKeySet) {
    let client_material =
        derive_pseudo_random_data(hash, server_nonce, client_nonce, lengths.total());
    let server_material =
        derive_pseudo_random_data(hash, client_nonce, server_nonce, lengths.total());
    (
        split(client_material, lengths),
        split(server_material, lengths),
    )
}

trait PrfMac {
    fn new_from_secret(secret: &[u8]) -> Self;
    fn chain(self, data: &[u8]) -> Vec<u8>;
}

struct Sha1Mac(HmacSha1);
impl PrfMac for Sha1Mac {
    fn new_from_secret(secret: &[u8]) -> Self {
        Sha1Mac(HmacSha1::new_from_slice(secret).expect("HMAC accepts keys of any length"))
    }
    fn chain(self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.0;
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

struct Sha256Mac(HmacSha256);
impl PrfMac for Sha256Mac {
    fn new_from_secret(secret: &[u8]) -> Self {
        Sha256Mac(HmacSha256::new_from_slice(secret).expect("HMAC accepts keys of any length"))
    }
    fn chain(self, data: &[u8]) -> Vec<u8> {
        let mut mac = self.0;
        mac.update(data);
        mac.finalize().into_bytes().to_vec()
    }
}

fn hmac_once<M: PrfMac>(secret: &[u8], data: &[u8]) -> Vec<u8> {
    M::new_from_secret(secret).chain(data)
}

fn p_hash<M: PrfMac>(secret: &[u8], seed: &[u8], out_len: usize) -> Vec<u8> {
    let mut output = Vec::with_capacity(out_len + 32);
    let mut a = seed.to_vec();
    while output.len() < out_len {
        a = hmac_once::<M>(secret, &a);
        let mut block_input = a.clone();
        block_input.extend_from_slice(seed);
        let block = hmac_once::<M>(secret, &block_input);
        output.extend_from_slice(&block);
    }
    a.zeroize();
    output.truncate(out_len);
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p_hash_sha256_is_deterministic() {
        let a = derive_pseudo_random_data(PrfHash::Sha256, b"secret", b"seed", 48);
        let b = derive_pseudo_random_data(PrfHash::Sha256, b"secret", b"seed", 48);
        assert_eq!(a, b);
    }

    #[test]
    fn p_hash_sha1_and_sha256_differ() {
        let a = derive_pseudo_random_data(PrfHash::Sha1, b"secret", b"seed", 32);
        let b = derive_pseudo_random_data(PrfHash::Sha256, b"secret", b"seed", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn p_hash_produces_exact_requested_length() {
        for len in [1usize, 20, 32, 64, 97, 128] {
            let out = derive_pseudo_random_data(PrfHash::Sha256, b"s", b"seed", len);
            assert_eq!(out.len(), len);
        }
    }

    #[test]
    fn different_seed_changes_output() {
        let a = derive_pseudo_random_data(PrfHash::Sha256, b"secret", b"seed-a", 32);
        let b = derive_pseudo_random_data(PrfHash::Sha256, b"secret", b"seed-b", 32);
        assert_ne!(a, b);
    }

    #[test]
    fn key_sets_have_exact_slice_lengths() {
        let lengths = KeySetLengths {
            sign_key_len: 32,
            encrypt_key_len: 32,
            iv_len: 16,
        };
        let (client, server) =
            derive_key_sets(PrfHash::Sha256, b"client-nonce", b"server-nonce", lengths);
        assert_eq!(client.sign_key.len(), 32);
        assert_eq!(client.encrypt_key.len(), 32);
        assert_eq!(client.iv.len(), 16);
        assert_eq!(server.sign_key.len(), 32);
        assert_eq!(server.encrypt_key.len(), 32);
        assert_eq!(server.iv.len(), 16);
    }

    #[test]
    fn client_and_server_key_sets_differ() {
        let lengths = KeySetLengths {
            sign_key_len: 20,
            encrypt_key_len: 16,
            iv_len: 16,
        };
        let (client, server) = derive_key_sets(PrfHash::Sha1, b"cn", b"sn", lengths);
        assert_ne!(client.sign_key, server.sign_key);
    }

    #[test]
    fn both_sides_agree_when_run_independently() {
        // Client and server each hold both nonces and derive independently;
        // they must land on the same two key sets.
        let lengths = KeySetLengths {
            sign_key_len: 32,
            encrypt_key_len: 32,
            iv_len: 16,
        };
        let (client_a, server_a) = derive_key_sets(PrfHash::Sha256, b"cn", b"sn", lengths);
        let (client_b, server_b) = derive_key_sets(PrfHash::Sha256, b"cn", b"sn", lengths);
        assert_eq!(client_a.sign_key, client_b.sign_key);
        assert_eq!(server_a.encrypt_key, server_b.encrypt_key);
    }
}
