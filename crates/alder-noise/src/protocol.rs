use alder_crypto::{CipherSuite, DhAlg, HashAlg};

use crate::{HandshakePattern, NoiseError};

/// Longest full protocol name this grammar can produce.
pub const MAX_PROTOCOL_NAME: usize = 64;

/// Name prefix selecting the plain or pre-shared-key handshake family.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Prefix {
    Noise,
    NoisePsk,
}

impl Prefix {
    fn name_token(self) -> &'static str {
        match self {
            Prefix::Noise => "Noise",
            Prefix::NoisePsk => "NoisePSK",
        }
    }
}

/// The five algorithm choices behind a full protocol name such as
/// `Noise_XX_25519_ChaChaPoly_BLAKE2s`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ProtocolId {
    pub prefix: Prefix,
    pub pattern: HandshakePattern,
    pub dh: DhAlg,
    pub cipher: CipherSuite,
    pub hash: HashAlg,
}

impl ProtocolId {
    pub fn new(
        prefix: Prefix,
        pattern: HandshakePattern,
        dh: DhAlg,
        cipher: CipherSuite,
        hash: HashAlg,
    ) -> Self {
        Self {
            prefix,
            pattern,
            dh,
            cipher,
            hash,
        }
    }

    /// Parses a full protocol name.
    pub fn from_name(name: &str) -> Result<Self, NoiseError> {
        if name.len() > MAX_PROTOCOL_NAME {
            return Err(NoiseError::InvalidLength);
        }
        let mut parts = name.split('_');
        let prefix = match parts.next() {
            Some("Noise") => Prefix::Noise,
            Some("NoisePSK") => Prefix::NoisePsk,
            _ => return Err(NoiseError::UnknownName),
        };
        let pattern = parts
            .next()
            .and_then(HandshakePattern::from_name_token)
            .ok_or(NoiseError::UnknownName)?;
        let dh = match parts.next() {
            Some("25519") => DhAlg::X25519,
            Some("448") => DhAlg::X448,
            _ => return Err(NoiseError::UnknownName),
        };
        let cipher = match parts.next() {
            Some("ChaChaPoly") => CipherSuite::ChaChaPoly,
            Some("AESGCM") => CipherSuite::AesGcm,
            _ => return Err(NoiseError::UnknownName),
        };
        let hash = match parts.next() {
            Some("BLAKE2s") => HashAlg::Blake2s,
            Some("BLAKE2b") => HashAlg::Blake2b,
            Some("SHA256") => HashAlg::Sha256,
            Some("SHA512") => HashAlg::Sha512,
            _ => return Err(NoiseError::UnknownName),
        };
        if parts.next().is_some() {
            return Err(NoiseError::UnknownName);
        }
        Ok(Self::new(prefix, pattern, dh, cipher, hash))
    }

    /// Writes the full name into `out`, returning its length. Used where the
    /// name seeds the chaining key and transcript hash without allocating.
    pub(crate) fn write_name(&self, out: &mut [u8; MAX_PROTOCOL_NAME]) -> usize {
        let dh = match self.dh {
            DhAlg::X25519 => "25519",
            DhAlg::X448 => "448",
        };
        let cipher = match self.cipher {
            CipherSuite::ChaChaPoly => "ChaChaPoly",
            CipherSuite::AesGcm => "AESGCM",
        };
        let hash = match self.hash {
            HashAlg::Blake2s => "BLAKE2s",
            HashAlg::Blake2b => "BLAKE2b",
            HashAlg::Sha256 => "SHA256",
            HashAlg::Sha512 => "SHA512",
        };
        let mut head = 0;
        for part in [
            self.prefix.name_token(),
            "_",
            self.pattern.name_token(),
            "_",
            dh,
            "_",
            cipher,
            "_",
            hash,
        ] {
            out[head..head + part.len()].copy_from_slice(part.as_bytes());
            head += part.len();
        }
        head
    }

    /// The full protocol name as a string.
    pub fn name(&self) -> String {
        let mut buf = [0u8; MAX_PROTOCOL_NAME];
        let len = self.write_name(&mut buf);
        String::from_utf8_lossy(&buf[..len]).into_owned()
    }
}
