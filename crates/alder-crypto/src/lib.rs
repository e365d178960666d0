mod aead;
mod dh;
mod hash;
mod hkdf;
mod secret;

pub use aead::{decrypt, encrypt, CipherSuite, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use dh::{
    derive_public, diffie_hellman, generate_private, is_null_public_key, DhAlg, MAX_DH_LEN,
};
pub use hash::{HashAlg, MAX_HASH_LEN};
pub use hkdf::Hkdf;
pub use secret::SecretBytes;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CryptoError {
    InvalidKeyLength,
    InvalidPublicKey,
    OsRngError,
    DestTooSmall,
    HkdfExpandTooLong,
    EncryptionError,
    DecryptionError,
}

impl From<digest::InvalidLength> for CryptoError {
    fn from(_: digest::InvalidLength) -> Self {
        CryptoError::InvalidKeyLength
    }
}

impl From<rand::rand_core::OsError> for CryptoError {
    fn from(_: rand::rand_core::OsError) -> Self {
        CryptoError::OsRngError
    }
}

pub fn fill_random(dest: &mut [u8]) -> Result<(), CryptoError> {
    use rand::TryRngCore;
    Ok(rand::rngs::OsRng.try_fill_bytes(dest)?)
}
