use alder_crypto::{decrypt, encrypt, CipherSuite, SecretBytes, KEY_SIZE, TAG_SIZE};

use crate::NoiseError;

/// AEAD state keyed during the handshake and emitted by split: an optional
/// 32-byte key plus the 64-bit counter nonce discipline. While unkeyed,
/// encrypt and decrypt pass data through untouched.
pub struct CipherState {
    suite: CipherSuite,
    key: Option<SecretBytes<KEY_SIZE>>,
    n: u64,
    nonce_overflow: bool,
}

impl CipherState {
    pub fn new(suite: CipherSuite) -> Self {
        Self {
            suite,
            key: None,
            n: 0,
            nonce_overflow: false,
        }
    }

    pub fn suite(&self) -> CipherSuite {
        self.suite
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    /// Bytes an encrypt will append: 16 once keyed, 0 while passing through.
    pub fn mac_len(&self) -> usize {
        if self.has_key() {
            TAG_SIZE
        } else {
            0
        }
    }

    /// Takes the key (zeroizing the source) and resets the nonce.
    pub fn init_key(&mut self, key: &mut [u8; KEY_SIZE]) {
        self.key = Some(SecretBytes::take(key));
        self.n = 0;
        self.nonce_overflow = false;
    }

    /// The counter the next AEAD call will use.
    pub fn nonce(&self) -> u64 {
        self.n
    }

    /// Repositions the counter, for transports that frame out of order.
    pub fn set_nonce(&mut self, n: u64) {
        self.n = n;
        self.nonce_overflow = false;
    }

    fn advance_nonce(&mut self) {
        match self.n.checked_add(1) {
            Some(next) => self.n = next,
            None => self.nonce_overflow = true,
        }
    }

    /// Seals `buf[..len]` in place and appends the tag, returning the new
    /// length. Pass-through while unkeyed.
    pub fn encrypt_with_ad(
        &mut self,
        associated_data: &[u8],
        buf: &mut [u8],
        len: usize,
    ) -> Result<usize, NoiseError> {
        let Some(key) = &self.key else {
            return Ok(len);
        };
        if self.nonce_overflow {
            return Err(NoiseError::InvalidNonce);
        }
        encrypt(self.suite, key.as_slice(), self.n, associated_data, buf, len)?;
        self.advance_nonce();
        Ok(len + TAG_SIZE)
    }

    /// Opens `buf` (ciphertext plus tag) in place, returning the plaintext
    /// length. The counter advances only when authentication succeeds.
    pub fn decrypt_with_ad(
        &mut self,
        associated_data: &[u8],
        buf: &mut [u8],
    ) -> Result<usize, NoiseError> {
        let Some(key) = &self.key else {
            return Ok(buf.len());
        };
        if self.nonce_overflow {
            return Err(NoiseError::InvalidNonce);
        }
        if buf.len() < TAG_SIZE {
            return Err(NoiseError::InvalidLength);
        }
        let len = decrypt(self.suite, key.as_slice(), self.n, associated_data, buf)?;
        self.advance_nonce();
        Ok(len)
    }
}
