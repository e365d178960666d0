use aes_gcm::Aes256Gcm;
use chacha20poly1305::aead::AeadInPlace;
use chacha20poly1305::{ChaCha20Poly1305, KeyInit, Tag};
use zeroize::Zeroize;

use crate::CryptoError;

pub const NONCE_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;
pub const KEY_SIZE: usize = 32;

/// The AEAD algorithms named by the protocol grammar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CipherSuite {
    ChaChaPoly,
    AesGcm,
}

impl CipherSuite {
    /// 96-bit AEAD nonce from the 64-bit counter: four zero bytes then the
    /// counter, little-endian for ChaChaPoly and big-endian for AESGCM.
    pub fn format_nonce(self, counter: u64) -> [u8; NONCE_SIZE] {
        let mut nonce = [0u8; NONCE_SIZE];
        match self {
            CipherSuite::ChaChaPoly => nonce[4..].copy_from_slice(&counter.to_le_bytes()),
            CipherSuite::AesGcm => nonce[4..].copy_from_slice(&counter.to_be_bytes()),
        }
        nonce
    }
}

/// Seals `buf[..len]` in place and appends the 16-byte tag.
pub fn encrypt(
    suite: CipherSuite,
    key: &[u8],
    counter: u64,
    associated_data: &[u8],
    buf: &mut [u8],
    len: usize,
) -> Result<(), CryptoError> {
    if buf.len() < len + TAG_SIZE {
        return Err(CryptoError::DestTooSmall);
    }
    let nonce = suite.format_nonce(counter);
    let tag = match suite {
        CipherSuite::ChaChaPoly => ChaCha20Poly1305::new_from_slice(key)?
            .encrypt_in_place_detached((&nonce).into(), associated_data, &mut buf[..len]),
        CipherSuite::AesGcm => Aes256Gcm::new_from_slice(key)?.encrypt_in_place_detached(
            (&nonce).into(),
            associated_data,
            &mut buf[..len],
        ),
    }
    .map_err(|_| CryptoError::EncryptionError)?;
    buf[len..len + TAG_SIZE].copy_from_slice(&tag);
    Ok(())
}

/// Opens `buf` (ciphertext followed by the tag) in place, returning the
/// plaintext length. The buffer is zeroized if verification fails.
pub fn decrypt(
    suite: CipherSuite,
    key: &[u8],
    counter: u64,
    associated_data: &[u8],
    buf: &mut [u8],
) -> Result<usize, CryptoError> {
    if buf.len() < TAG_SIZE {
        return Err(CryptoError::DestTooSmall);
    }
    let len = buf.len() - TAG_SIZE;
    let nonce = suite.format_nonce(counter);
    let (data, tag) = buf.split_at_mut(len);
    let tag = Tag::from_slice(tag);
    let result = match suite {
        CipherSuite::ChaChaPoly => ChaCha20Poly1305::new_from_slice(key)?
            .decrypt_in_place_detached((&nonce).into(), associated_data, data, tag),
        CipherSuite::AesGcm => Aes256Gcm::new_from_slice(key)?.decrypt_in_place_detached(
            (&nonce).into(),
            associated_data,
            data,
            tag,
        ),
    };
    result.map_err(|_| {
        data.zeroize();
        CryptoError::DecryptionError
    })?;
    Ok(len)
}
