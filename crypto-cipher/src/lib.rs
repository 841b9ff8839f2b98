//! AES block-cipher primitives: CBC (for Secure Channel message bodies) and
//! CTR (for PubSub dataset payloads).
//!
//! ## Overview
//!
//! This crate wraps the `aes`, `cbc`, and `ctr` crates behind the shapes the
//! cryptographic provider needs:
//!
//! - CBC operates in place over a caller-owned buffer whose length must
//!   already be a whole number of blocks — this crate never adds or removes
//!   padding, matching the Secure Channel wire format, which pads at the
//!   message-chunking layer instead.
//! - CTR is exposed as keystream application over a fully caller-constructed
//!   16-byte counter block, since the PubSub counter block layout
//!   (`key_nonce ∥ message_random ∥ sequence_number ∥ block_counter`) is a
//!   protocol detail the caller assembles, not this crate.
//!
//! ## Security notes
//!
//! - Reusing an IV (CBC) or counter block (CTR) with the same key
//!   dramatically weakens or breaks confidentiality. Callers must never
//!   reuse either across messages.
//! - CBC encryption and decryption are distinct operations; CTR encryption
//!   and decryption are the same XOR-with-keystream operation and are
//!   exposed as a single function.

use aes::Aes128;
use aes::Aes256;
use aes::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, StreamCipher};
use cbc::cipher::block_padding::NoPadding;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const BLOCK_SIZE: usize = 16;

/// Errors from the block-cipher primitives.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CipherError {
    #[error("buffer length {0} is not a whole number of {BLOCK_SIZE}-byte blocks")]
    NotBlockAligned(usize),
    #[error("CBC padding/decryption failure")]
    Unpad,
}

/// A 128-bit AES key.
#[derive(Zeroize, ZeroizeOnDrop, Clone)]
pub struct Key128([u8; 16]);

/// A 256-bit AES key.
#[derive(Zeroize, ZeroizeOnDrop, Clone)]
pub struct Key256([u8; 32]);

/// A 16-byte initialization vector or counter block. Not secret, but wiped
/// anyway since it frequently sits next to key material.
#[derive(Zeroize, ZeroizeOnDrop, Clone)]
pub struct Block16([u8; 16]);

impl Key128 {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl Key256 {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Block16 {
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

fn check_block_aligned(buffer: &[u8]) -> Result<(), CipherError> {
    if buffer.len() % BLOCK_SIZE != 0 {
        return Err(CipherError::NotBlockAligned(buffer.len()));
    }
    Ok(())
}

/// Encrypts `buffer` in place with AES-128-CBC. `buffer.len()` must be a
/// multiple of [`BLOCK_SIZE`].
pub fn cbc_encrypt_128(key: &Key128, iv: &Block16, buffer: &mut [u8]) -> Result<(), CipherError> {
    check_block_aligned(buffer)?;
    let encryptor = cbc::Encryptor::<Aes128>::new(&key.0.into(), &iv.0.into());
    encryptor
        .encrypt_padded_mut::<NoPadding>(buffer, buffer.len())
        .map_err(|_| CipherError::Unpad)?;
    Ok(())
}

/// Decrypts `buffer` in place with AES-128-CBC.
pub fn cbc_decrypt_128(key: &Key128, iv: &Block16, buffer: &mut [u8]) -> Result<(), CipherError> {
    check_block_aligned(buffer)?;
    let decryptor = cbc::Decryptor::<Aes128>::new(&key.0.into(), &iv.0.into());
    decryptor
        .decrypt_padded_mut::<NoPadding>(buffer)
        .map_err(|_| CipherError::Unpad)?;
    Ok(())
}

/// Encrypts `buffer` in place with AES-256-CBC.
pub fn cbc_encrypt_256(key: &Key256, iv: &Block16, buffer: &mut [u8]) -> Result<(), CipherError> {
    check_block_aligned(buffer)?;
    let encryptor = cbc::Encryptor::<Aes256>::new(&key.0.into(), &iv.0.into());
    encryptor
        .encrypt_padded_mut::<NoPadding>(buffer, buffer.len())
        .map_err(|_| CipherError::Unpad)?;
    Ok(())
}

/// Decrypts `buffer` in place with AES-256-CBC.
pub fn cbc_decrypt_256(key: &Key256, iv: &Block16, buffer: &mut [u8]) -> Result<(), CipherError> {
    check_block_aligned(buffer)?;
    let decryptor = cbc::Decryptor::<Aes256>::new(&key.0.into(), &iv.0.into());
    decryptor
        .decrypt_padded_mut::<NoPadding>(buffer)
        .map_err(|_| CipherError::Unpad)?;
    Ok(())
}

/// Applies the AES-256-CTR keystream to `buffer` in place, starting from
/// `counter_block` as the initial 128-bit counter value. Encryption and
/// decryption are the same operation.
pub fn ctr_apply_256(key: &Key256, counter_block: &Block16, buffer: &mut [u8]) {
    let mut cipher = ctr::Ctr128BE::<Aes256>::new(&key.0.into(), &counter_block.0.into());
    cipher.apply_keystream(buffer);
}
