use crate::CryptoError;
use digest::KeyInit;
use hmac::Mac;
use std::marker::PhantomData;
use zeroize::Zeroize;

/// Generic HKDF following RFC 5869.
/// H: keyed MAC (eg. SimpleHmac<Blake2s256>).
/// N: MAC output size in bytes.
pub struct Hkdf<H: Mac + KeyInit, const N: usize>(PhantomData<H>);

impl<H: Mac + KeyInit, const N: usize> Hkdf<H, N> {
    /// HKDF-Extract (salt, IKM) -> Pseudorandom Key
    pub fn extract(
        dest: &mut [u8; N],
        salt: &[u8],
        initial_key_material: &[u8],
    ) -> Result<(), CryptoError> {
        let mut s = [0u8; N];
        match salt.len() {
            n if n >= N => s.copy_from_slice(&salt[..N]),
            n => s[..n].copy_from_slice(salt),
        }
        let mut mac = <H as KeyInit>::new_from_slice(&s)?;
        s.zeroize();
        mac.update(initial_key_material);
        let mut result = mac.finalize().into_bytes();
        dest.copy_from_slice(&result[..N]);
        result.as_mut_slice().zeroize();
        Ok(())
    }

    /// HKDF-Expand (PRK, context, L) -> Output Keying Material
    pub fn expand(dest: &mut [u8], prk: &[u8; N], context: &[u8]) -> Result<(), CryptoError> {
        let rounds = dest.len().div_ceil(N);
        if rounds > 255 {
            Err(CryptoError::HkdfExpandTooLong)?
        }

        let mut head = 0;
        let mut t = [0u8; N];
        let mut t_len = 0;

        for i in 1..=rounds {
            let mut mac = <H as KeyInit>::new_from_slice(prk)?;
            mac.update(&t[..t_len]); // T(i-1)
            mac.update(context);
            mac.update(&[i as u8]); // Counter

            let mut block = mac.finalize().into_bytes();
            t.copy_from_slice(&block[..N]);
            t_len = N;
            block.as_mut_slice().zeroize();

            // take min of hash_len (N) or remaining
            let taking = N.min(dest.len() - head);
            dest[head..head + taking].copy_from_slice(&t[..taking]);
            head += taking;
        }

        t.zeroize();
        Ok(())
    }

    /// Single HKDF (extract + expand)
    pub fn derive(
        dest: &mut [u8],
        salt: &[u8],
        initial_key_material: &[u8],
        context: &[u8],
    ) -> Result<(), CryptoError> {
        let mut prk = [0u8; N];
        Self::extract(&mut prk, salt, initial_key_material)?;
        let result = Self::expand(dest, &prk, context);
        prk.zeroize();
        result
    }

    /// Multiple HKDF with an empty context: K chained N-byte outputs.
    /// This is the derivation the Noise specification calls HKDF, with
    /// out1 = HMAC(prk, 1), out2 = HMAC(prk, out1 || 2), and so on.
    pub fn derive_keys<const K: usize>(
        dest: &mut [[u8; N]; K],
        salt: &[u8],
        initial_key_material: &[u8],
    ) -> Result<(), CryptoError> {
        if K == 0 || K > 255 {
            Err(CryptoError::HkdfExpandTooLong)?
        }

        let mut prk = [0u8; N];
        Self::extract(&mut prk, salt, initial_key_material)?;

        for i in 0..K {
            let mut mac = match <H as KeyInit>::new_from_slice(&prk) {
                Ok(mac) => mac,
                Err(e) => {
                    prk.zeroize();
                    return Err(e.into());
                }
            };
            if i > 0 {
                mac.update(&dest[i - 1]); // T(i-1)
            }
            mac.update(&[(i + 1) as u8]); // Counter
            let mut block = mac.finalize().into_bytes();
            dest[i].copy_from_slice(&block[..N]);
            block.as_mut_slice().zeroize();
        }

        prk.zeroize();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::Hkdf;
    use hex_literal::hex;
    use hmac::SimpleHmac;
    use sha2::Sha256;

    type HkdfSha256 = Hkdf<SimpleHmac<Sha256>, 32>;

    // RFC 5869 A.1
    #[test]
    fn rfc5869_basic() {
        let ikm = [0x0bu8; 22];
        let salt = hex!("000102030405060708090a0b0c");
        let info = hex!("f0f1f2f3f4f5f6f7f8f9");

        let mut prk = [0u8; 32];
        HkdfSha256::extract(&mut prk, &salt, &ikm).unwrap();
        assert_eq!(
            hex::encode(prk),
            "077709362c2e32df0ddc3f0dc47bba6390b6c73bb50f9c3122ec844ad7c2b3e5"
        );

        let mut okm = [0u8; 42];
        HkdfSha256::expand(&mut okm, &prk, &info).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    // RFC 5869 A.3 (empty salt and context)
    #[test]
    fn rfc5869_empty_salt() {
        let ikm = [0x0bu8; 22];
        let mut okm = [0u8; 42];
        HkdfSha256::derive(&mut okm, &[], &ikm, &[]).unwrap();
        assert_eq!(
            hex::encode(okm),
            "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d9d201395faa4b61a96c8"
        );
    }

    #[test]
    fn derive_keys_matches_flat_expand() {
        let mut flat = [0u8; 64];
        HkdfSha256::derive(&mut flat, b"chaining key", b"input material", &[]).unwrap();

        let mut keys = [[0u8; 32]; 2];
        HkdfSha256::derive_keys(&mut keys, b"chaining key", b"input material").unwrap();
        assert_eq!(keys[0], flat[..32]);
        assert_eq!(keys[1], flat[32..]);
    }

    #[test]
    fn derive_keys_third_output_extends_second() {
        let mut two = [[0u8; 32]; 2];
        let mut three = [[0u8; 32]; 3];
        HkdfSha256::derive_keys(&mut two, b"ck", b"ikm").unwrap();
        HkdfSha256::derive_keys(&mut three, b"ck", b"ikm").unwrap();
        assert_eq!(two[0], three[0]);
        assert_eq!(two[1], three[1]);
    }
}
