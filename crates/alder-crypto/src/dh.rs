use x25519_dalek::{PublicKey as X25519Public, StaticSecret};
use x448::{PublicKey as X448Public, Secret as X448Secret};
use zeroize::Zeroize;

use crate::{fill_random, CryptoError};

/// Largest key length over the supported curves.
pub const MAX_DH_LEN: usize = 56;

/// The Diffie-Hellman functions named by the protocol grammar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DhAlg {
    X25519,
    X448,
}

impl DhAlg {
    pub const fn private_key_len(self) -> usize {
        match self {
            DhAlg::X25519 => 32,
            DhAlg::X448 => 56,
        }
    }

    pub const fn public_key_len(self) -> usize {
        self.private_key_len()
    }

    pub const fn shared_key_len(self) -> usize {
        self.private_key_len()
    }
}

/// Fills `private` with a fresh scalar; clamping happens inside the curve
/// types at use time.
pub fn generate_private(alg: DhAlg, private: &mut [u8]) -> Result<(), CryptoError> {
    if private.len() != alg.private_key_len() {
        return Err(CryptoError::InvalidKeyLength);
    }
    fill_random(private)
}

/// Derives the public key for `private` into `public`.
pub fn derive_public(alg: DhAlg, private: &[u8], public: &mut [u8]) -> Result<(), CryptoError> {
    if private.len() != alg.private_key_len() || public.len() != alg.public_key_len() {
        return Err(CryptoError::InvalidKeyLength);
    }
    match alg {
        DhAlg::X25519 => {
            let secret = StaticSecret::from(to_array::<32>(private)?);
            public.copy_from_slice(X25519Public::from(&secret).as_bytes());
        }
        DhAlg::X448 => {
            let secret = X448Secret::from_bytes(private).ok_or(CryptoError::InvalidKeyLength)?;
            public.copy_from_slice(X448Public::from(&secret).as_bytes());
        }
    }
    Ok(())
}

/// DH(private, public) into `shared`. X448 refuses low-order peer points.
pub fn diffie_hellman(
    alg: DhAlg,
    private: &[u8],
    public: &[u8],
    shared: &mut [u8],
) -> Result<(), CryptoError> {
    if private.len() != alg.private_key_len()
        || public.len() != alg.public_key_len()
        || shared.len() != alg.shared_key_len()
    {
        return Err(CryptoError::InvalidKeyLength);
    }
    match alg {
        DhAlg::X25519 => {
            let secret = StaticSecret::from(to_array::<32>(private)?);
            let peer = X25519Public::from(to_array::<32>(public)?);
            let mut output = secret.diffie_hellman(&peer).to_bytes();
            shared.copy_from_slice(&output);
            output.zeroize();
        }
        DhAlg::X448 => {
            let secret = X448Secret::from_bytes(private).ok_or(CryptoError::InvalidKeyLength)?;
            let peer = X448Public::from_bytes(public).ok_or(CryptoError::InvalidPublicKey)?;
            let output = secret
                .as_diffie_hellman(&peer)
                .ok_or(CryptoError::InvalidPublicKey)?;
            shared.copy_from_slice(output.as_bytes());
        }
    }
    Ok(())
}

/// True for the all-zero group element, which collapses the shared secret.
pub fn is_null_public_key(public: &[u8]) -> bool {
    public.iter().fold(0u8, |acc, b| acc | b) == 0
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], CryptoError> {
    <[u8; N]>::try_from(bytes).map_err(|_| CryptoError::InvalidKeyLength)
}

#[cfg(test)]
mod tests {
    use super::{
        derive_public, diffie_hellman, generate_private, is_null_public_key, DhAlg, MAX_DH_LEN,
    };

    fn agreement(alg: DhAlg) {
        let len = alg.private_key_len();
        let mut a_priv = [0u8; MAX_DH_LEN];
        let mut b_priv = [0u8; MAX_DH_LEN];
        let mut a_pub = [0u8; MAX_DH_LEN];
        let mut b_pub = [0u8; MAX_DH_LEN];
        generate_private(alg, &mut a_priv[..len]).unwrap();
        generate_private(alg, &mut b_priv[..len]).unwrap();
        derive_public(alg, &a_priv[..len], &mut a_pub[..len]).unwrap();
        derive_public(alg, &b_priv[..len], &mut b_pub[..len]).unwrap();

        let mut ab = [0u8; MAX_DH_LEN];
        let mut ba = [0u8; MAX_DH_LEN];
        diffie_hellman(alg, &a_priv[..len], &b_pub[..len], &mut ab[..len]).unwrap();
        diffie_hellman(alg, &b_priv[..len], &a_pub[..len], &mut ba[..len]).unwrap();
        assert_eq!(ab, ba);
        assert!(!is_null_public_key(&ab[..len]));
    }

    #[test]
    fn x25519_agreement() {
        agreement(DhAlg::X25519);
    }

    #[test]
    fn x448_agreement() {
        agreement(DhAlg::X448);
    }

    #[test]
    fn public_derivation_is_deterministic() {
        let private = [0x42u8; 32];
        let mut first = [0u8; 32];
        let mut second = [0u8; 32];
        derive_public(DhAlg::X25519, &private, &mut first).unwrap();
        derive_public(DhAlg::X25519, &private, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn null_public_key_detection() {
        assert!(is_null_public_key(&[0u8; 32]));
        let mut key = [0u8; 32];
        key[31] = 1;
        assert!(!is_null_public_key(&key));
    }

    #[test]
    fn length_mismatch_rejected() {
        let mut shared = [0u8; 32];
        assert!(diffie_hellman(DhAlg::X25519, &[0u8; 31], &[0u8; 32], &mut shared).is_err());
        assert!(diffie_hellman(DhAlg::X448, &[0u8; 32], &[0u8; 56], &mut shared).is_err());
    }
}
