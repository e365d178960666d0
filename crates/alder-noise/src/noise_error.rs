use alder_crypto::CryptoError;

/// Errors surfaced by the handshake core.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NoiseError {
    /// Message, payload or key size outside the contract.
    InvalidLength,
    /// Operation called out of sequence.
    InvalidState,
    /// The peer supplied a public key that contributes nothing to the session.
    InvalidPublicKey,
    /// The 64-bit AEAD nonce space is exhausted.
    InvalidNonce,
    /// The operation does not apply to the negotiated protocol.
    NotApplicable,
    /// AEAD authentication failed.
    MacFailure,
    /// A local static keypair must be supplied before starting.
    LocalKeyRequired,
    /// A remote static public key must be supplied before starting.
    RemoteKeyRequired,
    /// A pre-shared key must be supplied before starting.
    PskRequired,
    /// The protocol name does not resolve to known algorithms.
    UnknownName,
    /// Failure inside a crypto primitive.
    Crypto(CryptoError),
}

impl From<CryptoError> for NoiseError {
    fn from(value: CryptoError) -> Self {
        match value {
            CryptoError::DecryptionError => NoiseError::MacFailure,
            CryptoError::InvalidPublicKey => NoiseError::InvalidPublicKey,
            other => NoiseError::Crypto(other),
        }
    }
}
