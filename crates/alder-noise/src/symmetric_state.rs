use alder_crypto::{HashAlg, SecretBytes, KEY_SIZE, MAX_HASH_LEN};
use zeroize::Zeroize;

use crate::protocol::MAX_PROTOCOL_NAME;
use crate::{CipherState, NoiseError, ProtocolId};

/// The chaining key, the transcript hash and the embedded cipher.
///
/// `h` is a running hash over everything both parties have seen and is
/// public; `ck` is the secret every session key is ratcheted from.
pub struct SymmetricState {
    id: ProtocolId,
    cipher: CipherState,
    hash: HashAlg,
    ck: SecretBytes<MAX_HASH_LEN>,
    h: [u8; MAX_HASH_LEN],
}

impl SymmetricState {
    pub fn new(id: ProtocolId) -> Self {
        let mut state = Self {
            id,
            cipher: CipherState::new(id.cipher),
            hash: id.hash,
            ck: SecretBytes::zeroed(id.hash.hash_len()),
            h: [0u8; MAX_HASH_LEN],
        };
        state.init_from_name();
        state
    }

    /// Writes the protocol name into `h` (zero-padded when it fits the hash
    /// output, hashed down once otherwise) and copies it to `ck`.
    fn init_from_name(&mut self) {
        let hash_len = self.hash.hash_len();
        let mut name = [0u8; MAX_PROTOCOL_NAME];
        let name_len = self.id.write_name(&mut name);
        self.h = [0u8; MAX_HASH_LEN];
        if name_len <= hash_len {
            self.h[..name_len].copy_from_slice(&name[..name_len]);
        } else {
            self.hash.hash_one(&name[..name_len], &mut self.h[..hash_len]);
        }
        self.ck.as_mut_slice().copy_from_slice(&self.h[..hash_len]);
    }

    /// Fallback support: re-derives `(ck, h)` for the new protocol id and
    /// drops the cipher key.
    pub(crate) fn reinitialize(&mut self, id: ProtocolId) {
        self.id = id;
        self.cipher = CipherState::new(id.cipher);
        self.init_from_name();
    }

    pub fn id(&self) -> ProtocolId {
        self.id
    }

    pub fn hash_len(&self) -> usize {
        self.hash.hash_len()
    }

    pub fn mac_len(&self) -> usize {
        self.cipher.mac_len()
    }

    pub fn has_key(&self) -> bool {
        self.cipher.has_key()
    }

    /// The transcript hash over everything absorbed so far.
    pub fn handshake_hash(&self) -> &[u8] {
        &self.h[..self.hash.hash_len()]
    }

    /// h = Hash(h || data)
    pub fn mix_hash(&mut self, data: &[u8]) {
        let hash_len = self.hash.hash_len();
        let mut next = [0u8; MAX_HASH_LEN];
        self.hash.hash_two(&self.h[..hash_len], data, &mut next[..hash_len]);
        self.h[..hash_len].copy_from_slice(&next[..hash_len]);
    }

    /// Ratchets `ck` and installs a fresh cipher key from `input`.
    pub fn mix_key(&mut self, input_key_material: &[u8]) -> Result<(), NoiseError> {
        let hash_len = self.hash.hash_len();
        let mut next_ck = [0u8; MAX_HASH_LEN];
        let mut temp_k = [0u8; MAX_HASH_LEN];
        self.hash.hkdf2(
            self.ck.as_slice(),
            input_key_material,
            &mut next_ck[..hash_len],
            &mut temp_k[..hash_len],
        )?;
        self.ck.as_mut_slice().copy_from_slice(&next_ck[..hash_len]);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&temp_k[..KEY_SIZE]);
        self.cipher.init_key(&mut key);
        next_ck.zeroize();
        temp_k.zeroize();
        Ok(())
    }

    /// Ratchets `ck`, mixes the middle output into `h` and installs a fresh
    /// cipher key, all from one HKDF call.
    pub fn mix_key_and_hash(&mut self, input_key_material: &[u8]) -> Result<(), NoiseError> {
        let hash_len = self.hash.hash_len();
        let mut next_ck = [0u8; MAX_HASH_LEN];
        let mut temp_h = [0u8; MAX_HASH_LEN];
        let mut temp_k = [0u8; MAX_HASH_LEN];
        self.hash.hkdf3(
            self.ck.as_slice(),
            input_key_material,
            &mut next_ck[..hash_len],
            &mut temp_h[..hash_len],
            &mut temp_k[..hash_len],
        )?;
        self.ck.as_mut_slice().copy_from_slice(&next_ck[..hash_len]);
        self.mix_hash(&temp_h[..hash_len]);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&temp_k[..KEY_SIZE]);
        self.cipher.init_key(&mut key);
        next_ck.zeroize();
        temp_h.zeroize();
        temp_k.zeroize();
        Ok(())
    }

    /// Absorbs a pre-shared key into `ck` and `h` ahead of the handshake.
    /// The cipher stays unkeyed; the first `e` token keys it.
    pub(crate) fn mix_pre_shared_key(&mut self, key: &[u8]) -> Result<(), NoiseError> {
        let hash_len = self.hash.hash_len();
        let mut next_ck = [0u8; MAX_HASH_LEN];
        let mut temp = [0u8; MAX_HASH_LEN];
        self.hash.hkdf2(
            self.ck.as_slice(),
            key,
            &mut next_ck[..hash_len],
            &mut temp[..hash_len],
        )?;
        self.ck.as_mut_slice().copy_from_slice(&next_ck[..hash_len]);
        self.mix_hash(&temp[..hash_len]);
        next_ck.zeroize();
        temp.zeroize();
        Ok(())
    }

    /// Seals `buf[..len]` with the transcript as associated data, absorbs
    /// the result into `h` and returns the sealed length.
    pub fn encrypt_and_hash(&mut self, buf: &mut [u8], len: usize) -> Result<usize, NoiseError> {
        let hash_len = self.hash.hash_len();
        let out_len = self.cipher.encrypt_with_ad(&self.h[..hash_len], buf, len)?;
        self.mix_hash(&buf[..out_len]);
        Ok(out_len)
    }

    /// Opens `buf` in place with the transcript as associated data. The
    /// transcript absorbs the ciphertext, and only once authentication
    /// succeeds, so a MAC failure leaves `h` untouched.
    pub fn decrypt_and_hash(&mut self, buf: &mut [u8]) -> Result<usize, NoiseError> {
        let hash_len = self.hash.hash_len();
        let mut next_h = [0u8; MAX_HASH_LEN];
        self.hash.hash_two(&self.h[..hash_len], buf, &mut next_h[..hash_len]);
        let len = self.cipher.decrypt_with_ad(&self.h[..hash_len], buf)?;
        self.h[..hash_len].copy_from_slice(&next_h[..hash_len]);
        Ok(len)
    }

    /// Derives the two transport ciphers, counters at zero. A non-empty
    /// `secondary_key` is folded in as the HKDF input keying material.
    pub fn split(&self, secondary_key: &[u8]) -> Result<(CipherState, CipherState), NoiseError> {
        let hash_len = self.hash.hash_len();
        let mut k1 = [0u8; MAX_HASH_LEN];
        let mut k2 = [0u8; MAX_HASH_LEN];
        self.hash.hkdf2(
            self.ck.as_slice(),
            secondary_key,
            &mut k1[..hash_len],
            &mut k2[..hash_len],
        )?;
        let mut c1 = CipherState::new(self.id.cipher);
        let mut c2 = CipherState::new(self.id.cipher);
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&k1[..KEY_SIZE]);
        c1.init_key(&mut key);
        key.copy_from_slice(&k2[..KEY_SIZE]);
        c2.init_key(&mut key);
        k1.zeroize();
        k2.zeroize();
        Ok((c1, c2))
    }
}
