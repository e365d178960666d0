use alder_crypto::{
    derive_public, diffie_hellman, generate_private, is_null_public_key, DhAlg, SecretBytes,
    MAX_DH_LEN,
};

use crate::NoiseError;

/// One Diffie-Hellman key slot: the curve plus optional private and public
/// halves. A handshake owns up to five of these (local/remote, static and
/// ephemeral, plus a fixed ephemeral for test vectors).
pub struct DhState {
    alg: DhAlg,
    private: Option<SecretBytes<MAX_DH_LEN>>,
    public: Option<[u8; MAX_DH_LEN]>,
}

impl DhState {
    pub fn new(alg: DhAlg) -> Self {
        Self {
            alg,
            private: None,
            public: None,
        }
    }

    pub fn algorithm(&self) -> DhAlg {
        self.alg
    }

    pub fn private_key_len(&self) -> usize {
        self.alg.private_key_len()
    }

    pub fn public_key_len(&self) -> usize {
        self.alg.public_key_len()
    }

    pub fn shared_key_len(&self) -> usize {
        self.alg.shared_key_len()
    }

    /// Generates a fresh keypair.
    pub fn generate_keypair(&mut self) -> Result<(), NoiseError> {
        let len = self.alg.private_key_len();
        let mut private = [0u8; MAX_DH_LEN];
        generate_private(self.alg, &mut private[..len])?;
        self.set_keypair_private(&mut private[..len])
    }

    /// Installs a caller-supplied keypair; the private source is zeroized.
    pub fn set_keypair(&mut self, private: &mut [u8], public: &[u8]) -> Result<(), NoiseError> {
        if private.len() != self.alg.private_key_len()
            || public.len() != self.alg.public_key_len()
        {
            return Err(NoiseError::InvalidLength);
        }
        let mut stored = [0u8; MAX_DH_LEN];
        stored[..public.len()].copy_from_slice(public);
        self.private = Some(SecretBytes::take(private));
        self.public = Some(stored);
        Ok(())
    }

    /// Installs a private key and derives its public half; the private
    /// source is zeroized.
    pub fn set_keypair_private(&mut self, private: &mut [u8]) -> Result<(), NoiseError> {
        if private.len() != self.alg.private_key_len() {
            return Err(NoiseError::InvalidLength);
        }
        let mut public = [0u8; MAX_DH_LEN];
        derive_public(self.alg, private, &mut public[..self.alg.public_key_len()])?;
        self.private = Some(SecretBytes::take(private));
        self.public = Some(public);
        Ok(())
    }

    /// Installs a peer public key, dropping any private half.
    pub fn set_public_key(&mut self, public: &[u8]) -> Result<(), NoiseError> {
        if public.len() != self.alg.public_key_len() {
            return Err(NoiseError::InvalidLength);
        }
        let mut stored = [0u8; MAX_DH_LEN];
        stored[..public.len()].copy_from_slice(public);
        self.private = None;
        self.public = Some(stored);
        Ok(())
    }

    pub fn public_key(&self) -> Option<&[u8]> {
        self.public
            .as_ref()
            .map(|public| &public[..self.alg.public_key_len()])
    }

    pub fn has_keypair(&self) -> bool {
        self.private.is_some() && self.public.is_some()
    }

    pub fn has_public_key(&self) -> bool {
        self.public.is_some()
    }

    /// Drops both halves; the private key is zeroized.
    pub fn clear_key(&mut self) {
        self.private = None;
        self.public = None;
    }

    /// True when the stored public key is the all-zero group element.
    pub fn is_null_public_key(&self) -> bool {
        self.public_key().is_some_and(is_null_public_key)
    }

    /// DH(self.private, peer.public) into `shared[..shared_key_len]`.
    pub fn calculate(&self, peer: &DhState, shared: &mut [u8]) -> Result<(), NoiseError> {
        let private = self.private.as_ref().ok_or(NoiseError::InvalidState)?;
        let public = peer.public_key().ok_or(NoiseError::InvalidState)?;
        diffie_hellman(
            self.alg,
            private.as_slice(),
            public,
            &mut shared[..self.alg.shared_key_len()],
        )?;
        Ok(())
    }

    /// Copies another slot's keypair (the fixed-ephemeral path).
    pub(crate) fn copy_keypair_from(&mut self, other: &DhState) -> Result<(), NoiseError> {
        let other_private = other.private.as_ref().ok_or(NoiseError::InvalidState)?;
        let other_public = other.public.ok_or(NoiseError::InvalidState)?;
        let mut private = [0u8; MAX_DH_LEN];
        let len = other_private.len();
        private[..len].copy_from_slice(other_private.as_slice());
        self.private = Some(SecretBytes::take(&mut private[..len]));
        self.public = Some(other_public);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::DhState;
    use crate::{DhAlg, NoiseError};

    #[test]
    fn generated_keypairs_agree() {
        for alg in [DhAlg::X25519, DhAlg::X448] {
            let mut alice = DhState::new(alg);
            let mut bob = DhState::new(alg);
            alice.generate_keypair().unwrap();
            bob.generate_keypair().unwrap();

            let mut ab = [0u8; 56];
            let mut ba = [0u8; 56];
            alice.calculate(&bob, &mut ab).unwrap();
            bob.calculate(&alice, &mut ba).unwrap();
            assert_eq!(ab[..alg.shared_key_len()], ba[..alg.shared_key_len()]);
        }
    }

    #[test]
    fn set_public_key_only_has_no_keypair() {
        let mut state = DhState::new(DhAlg::X25519);
        state.set_public_key(&[1u8; 32]).unwrap();
        assert!(state.has_public_key());
        assert!(!state.has_keypair());
        assert!(!state.is_null_public_key());

        state.set_public_key(&[0u8; 32]).unwrap();
        assert!(state.is_null_public_key());
    }

    #[test]
    fn set_keypair_with_explicit_public() {
        let mut derived = DhState::new(DhAlg::X25519);
        let mut explicit = DhState::new(DhAlg::X25519);
        let mut private_a = [0x42u8; 32];
        let mut private_b = [0x42u8; 32];
        derived.set_keypair_private(&mut private_a).unwrap();
        let public = derived.public_key().unwrap().to_vec();
        explicit.set_keypair(&mut private_b, &public).unwrap();
        assert_eq!(private_b, [0u8; 32]);
        assert!(explicit.has_keypair());
        assert_eq!(explicit.public_key(), derived.public_key());
    }

    #[test]
    fn calculate_without_keys_is_invalid_state() {
        let no_private = DhState::new(DhAlg::X25519);
        let mut with_keys = DhState::new(DhAlg::X25519);
        with_keys.generate_keypair().unwrap();
        let mut shared = [0u8; 32];
        assert_eq!(
            no_private.calculate(&with_keys, &mut shared),
            Err(NoiseError::InvalidState)
        );
        assert_eq!(
            with_keys.calculate(&no_private, &mut shared),
            Err(NoiseError::InvalidState)
        );
    }

    #[test]
    fn key_length_checks() {
        let mut state = DhState::new(DhAlg::X448);
        assert_eq!(
            state.set_public_key(&[0u8; 32]),
            Err(NoiseError::InvalidLength)
        );
        let mut short = [0u8; 32];
        assert_eq!(
            state.set_keypair_private(&mut short),
            Err(NoiseError::InvalidLength)
        );
    }

    #[test]
    fn clear_key_forgets_both_halves() {
        let mut state = DhState::new(DhAlg::X25519);
        state.generate_keypair().unwrap();
        state.clear_key();
        assert!(!state.has_keypair());
        assert!(!state.has_public_key());
        assert!(state.public_key().is_none());
    }
}
