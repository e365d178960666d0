use blake2::{Blake2b512, Blake2s256};
use digest::{Digest, KeyInit};
use hmac::{Mac, SimpleHmac};
use sha2::{Sha256, Sha512};
use zeroize::Zeroize;

use crate::{CryptoError, Hkdf};

/// Largest output over the supported hash algorithms.
pub const MAX_HASH_LEN: usize = 64;

/// The hash functions named by the protocol grammar.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HashAlg {
    Blake2s,
    Blake2b,
    Sha256,
    Sha512,
}

impl HashAlg {
    pub const fn hash_len(self) -> usize {
        match self {
            HashAlg::Blake2s | HashAlg::Sha256 => 32,
            HashAlg::Blake2b | HashAlg::Sha512 => 64,
        }
    }

    pub const fn block_len(self) -> usize {
        match self {
            HashAlg::Blake2s | HashAlg::Sha256 => 64,
            HashAlg::Blake2b | HashAlg::Sha512 => 128,
        }
    }

    /// Hash(data) into out, which must hold `hash_len` bytes.
    pub fn hash_one(self, data: &[u8], out: &mut [u8]) {
        self.hash_two(data, &[], out)
    }

    /// Hash(a || b), the MixHash shape.
    pub fn hash_two(self, a: &[u8], b: &[u8], out: &mut [u8]) {
        match self {
            HashAlg::Blake2s => digest_two::<Blake2s256>(a, b, out),
            HashAlg::Blake2b => digest_two::<Blake2b512>(a, b, out),
            HashAlg::Sha256 => digest_two::<Sha256>(a, b, out),
            HashAlg::Sha512 => digest_two::<Sha512>(a, b, out),
        }
    }

    /// Noise HKDF with two outputs of `hash_len` bytes each.
    pub fn hkdf2(
        self,
        key: &[u8],
        material: &[u8],
        out1: &mut [u8],
        out2: &mut [u8],
    ) -> Result<(), CryptoError> {
        match self {
            HashAlg::Blake2s => hkdf_n::<SimpleHmac<Blake2s256>, 32, 2>(key, material, [out1, out2]),
            HashAlg::Blake2b => hkdf_n::<SimpleHmac<Blake2b512>, 64, 2>(key, material, [out1, out2]),
            HashAlg::Sha256 => hkdf_n::<SimpleHmac<Sha256>, 32, 2>(key, material, [out1, out2]),
            HashAlg::Sha512 => hkdf_n::<SimpleHmac<Sha512>, 64, 2>(key, material, [out1, out2]),
        }
    }

    /// Noise HKDF with three outputs of `hash_len` bytes each.
    pub fn hkdf3(
        self,
        key: &[u8],
        material: &[u8],
        out1: &mut [u8],
        out2: &mut [u8],
        out3: &mut [u8],
    ) -> Result<(), CryptoError> {
        match self {
            HashAlg::Blake2s => {
                hkdf_n::<SimpleHmac<Blake2s256>, 32, 3>(key, material, [out1, out2, out3])
            }
            HashAlg::Blake2b => {
                hkdf_n::<SimpleHmac<Blake2b512>, 64, 3>(key, material, [out1, out2, out3])
            }
            HashAlg::Sha256 => {
                hkdf_n::<SimpleHmac<Sha256>, 32, 3>(key, material, [out1, out2, out3])
            }
            HashAlg::Sha512 => {
                hkdf_n::<SimpleHmac<Sha512>, 64, 3>(key, material, [out1, out2, out3])
            }
        }
    }
}

fn digest_two<D: Digest>(a: &[u8], b: &[u8], out: &mut [u8]) {
    let mut hasher = D::new();
    hasher.update(a);
    hasher.update(b);
    let result = hasher.finalize();
    let len = out.len().min(<D as Digest>::output_size());
    out[..len].copy_from_slice(&result[..len]);
}

fn hkdf_n<H: Mac + KeyInit, const N: usize, const K: usize>(
    key: &[u8],
    material: &[u8],
    outs: [&mut [u8]; K],
) -> Result<(), CryptoError> {
    let mut keys = [[0u8; N]; K];
    Hkdf::<H, N>::derive_keys(&mut keys, key, material)?;
    for (out, derived) in outs.into_iter().zip(keys.iter()) {
        if out.len() < N {
            keys.zeroize();
            return Err(CryptoError::DestTooSmall);
        }
        out[..N].copy_from_slice(derived);
    }
    keys.zeroize();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{HashAlg, MAX_HASH_LEN};

    fn digest_hex(alg: HashAlg, data: &[u8]) -> String {
        let mut out = [0u8; MAX_HASH_LEN];
        alg.hash_one(data, &mut out[..alg.hash_len()]);
        hex::encode(&out[..alg.hash_len()])
    }

    #[test]
    fn sha256_vectors() {
        assert_eq!(
            digest_hex(HashAlg::Sha256, b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(
            digest_hex(HashAlg::Sha256, b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn sha512_vector() {
        assert_eq!(
            digest_hex(HashAlg::Sha512, b"abc"),
            "ddaf35a193617abacc417349ae20413112e6fa4e89a97ea20a9eeee64b55d39a\
             2192992a274fc1a836ba3c23a3feebbd454d4423643ce80e2a9ac94fa54ca49f"
        );
    }

    // RFC 7693 appendix samples
    #[test]
    fn blake2_vectors() {
        assert_eq!(
            digest_hex(HashAlg::Blake2s, b"abc"),
            "508c5e8c327c14e2e1a72ba34eeb452f37458b209ed63a294d999b4c86675982"
        );
        assert_eq!(
            digest_hex(HashAlg::Blake2b, b"abc"),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
    }

    #[test]
    fn hash_two_is_concatenation() {
        let mut split = [0u8; 32];
        let mut joined = [0u8; 32];
        HashAlg::Sha256.hash_two(b"hello ", b"world", &mut split);
        HashAlg::Sha256.hash_one(b"hello world", &mut joined);
        assert_eq!(split, joined);
    }

    #[test]
    fn hkdf2_is_hkdf3_prefix() {
        for alg in [
            HashAlg::Blake2s,
            HashAlg::Blake2b,
            HashAlg::Sha256,
            HashAlg::Sha512,
        ] {
            let len = alg.hash_len();
            let mut a1 = [0u8; MAX_HASH_LEN];
            let mut a2 = [0u8; MAX_HASH_LEN];
            let mut b1 = [0u8; MAX_HASH_LEN];
            let mut b2 = [0u8; MAX_HASH_LEN];
            let mut b3 = [0u8; MAX_HASH_LEN];
            alg.hkdf2(b"chaining key", b"psk", &mut a1[..len], &mut a2[..len])
                .unwrap();
            alg.hkdf3(
                b"chaining key",
                b"psk",
                &mut b1[..len],
                &mut b2[..len],
                &mut b3[..len],
            )
            .unwrap();
            assert_eq!(a1, b1);
            assert_eq!(a2, b2);
            assert_ne!(&b3[..len], &[0u8; MAX_HASH_LEN][..len]);
        }
    }
}
