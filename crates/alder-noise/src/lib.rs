// Following the Noise protocol specification: noiseprotocol.org/noise.html

/// Pre-shared keys are exactly 32 bytes.
pub const PSK_LEN: usize = 32;

mod cipher_state;
mod dh_state;
mod handshake_pattern;
mod handshake_state;
mod noise_error;
mod protocol;
mod symmetric_state;

pub use alder_crypto::{CipherSuite, DhAlg, HashAlg, KEY_SIZE, MAX_DH_LEN, MAX_HASH_LEN, TAG_SIZE};

pub use cipher_state::CipherState;
pub use dh_state::DhState;
pub use handshake_pattern::{HandshakePattern, PatternFlags, Token};
pub use handshake_state::{Action, HandshakeState, Role};
pub use noise_error::NoiseError;
pub use protocol::{Prefix, ProtocolId, MAX_PROTOCOL_NAME};
pub use symmetric_state::SymmetricState;
