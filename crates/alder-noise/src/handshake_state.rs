use alder_crypto::MAX_DH_LEN;
use tracing::debug;
use zeroize::Zeroize;

use crate::{
    CipherState, DhState, HandshakePattern, NoiseError, PatternFlags, Prefix, ProtocolId,
    SymmetricState, Token, PSK_LEN,
};

/// Which side of the handshake this state drives.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Initiator,
    Responder,
}

/// The next operation the application is expected to perform.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Action {
    /// Not started; configuration calls are still legal.
    None,
    /// Produce the next handshake message with `write_message`.
    WriteMessage,
    /// Feed the peer's next handshake message to `read_message`.
    ReadMessage,
    /// The handshake failed; only `fallback` may still apply.
    Failed,
    /// The pattern is complete; call `split`.
    Split,
}

/// Pre-start obligations still outstanding, derived from the pattern flags.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct Requirements(u8);

impl Requirements {
    const PROLOGUE: u8 = 0x01;
    const LOCAL_REQUIRED: u8 = 0x02;
    const REMOTE_REQUIRED: u8 = 0x04;
    const LOCAL_PREMSG: u8 = 0x08;
    const REMOTE_PREMSG: u8 = 0x10;
    const FALLBACK_PREMSG: u8 = 0x20;
    const PSK: u8 = 0x40;

    fn derive(flags: PatternFlags, prefix: Prefix, is_fallback: bool) -> Self {
        let mut requirements = Self(Self::PROLOGUE);
        if flags.contains(PatternFlags::LOCAL_STATIC) {
            requirements.insert(Self::LOCAL_REQUIRED);
        }
        if flags.contains(PatternFlags::LOCAL_REQUIRED) {
            requirements.insert(Self::LOCAL_REQUIRED | Self::LOCAL_PREMSG);
        }
        if flags.contains(PatternFlags::REMOTE_REQUIRED) {
            requirements.insert(Self::REMOTE_REQUIRED | Self::REMOTE_PREMSG);
        }
        if is_fallback
            && flags.contains(PatternFlags::LOCAL_EPHEM_REQ | PatternFlags::REMOTE_EPHEM_REQ)
        {
            requirements.insert(Self::FALLBACK_PREMSG);
        }
        if prefix == Prefix::NoisePsk {
            requirements.insert(Self::PSK);
        }
        requirements
    }

    fn contains(self, bits: u8) -> bool {
        self.0 & bits != 0
    }

    fn insert(&mut self, bits: u8) {
        self.0 |= bits;
    }

    fn remove(&mut self, bits: u8) {
        self.0 &= !bits;
    }
}

/// The pattern interpreter: owns the symmetric state and up to five DH
/// slots, and walks the pattern token by token through `write_message` and
/// `read_message` until the transcript is ready to `split`.
///
/// A state serves exactly one handshake and is not synchronized; drive it
/// from one thread. All secret material is zeroized on drop.
pub struct HandshakeState {
    symmetric: SymmetricState,
    role: Role,
    action: Action,
    requirements: Requirements,
    tokens: &'static [Token],
    cursor: usize,
    dh_local_static: Option<DhState>,
    dh_local_ephemeral: Option<DhState>,
    dh_remote_static: Option<DhState>,
    dh_remote_ephemeral: Option<DhState>,
    dh_fixed_ephemeral: Option<DhState>,
    split_done: bool,
}

impl HandshakeState {
    pub fn new_by_id(id: ProtocolId, role: Role) -> Self {
        let flags = match role {
            Role::Initiator => id.pattern.flags(),
            Role::Responder => id.pattern.flags().reversed(),
        };
        let slot = |bit: u8| flags.contains(bit).then(|| DhState::new(id.dh));
        Self {
            symmetric: SymmetricState::new(id),
            role,
            action: Action::None,
            requirements: Requirements::derive(flags, id.prefix, false),
            tokens: id.pattern.tokens(),
            cursor: 0,
            dh_local_static: slot(PatternFlags::LOCAL_STATIC),
            dh_local_ephemeral: slot(PatternFlags::LOCAL_EPHEMERAL),
            dh_remote_static: slot(PatternFlags::REMOTE_STATIC),
            dh_remote_ephemeral: slot(PatternFlags::REMOTE_EPHEMERAL),
            dh_fixed_ephemeral: None,
            split_done: false,
        }
    }

    pub fn new_by_name(name: &str, role: Role) -> Result<Self, NoiseError> {
        Ok(Self::new_by_id(ProtocolId::from_name(name)?, role))
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn protocol_id(&self) -> ProtocolId {
        self.symmetric.id()
    }

    pub fn action(&self) -> Action {
        self.action
    }

    /// The slot holding the local static keypair, when the pattern has one.
    pub fn local_keypair(&self) -> Option<&DhState> {
        self.dh_local_static.as_ref()
    }

    pub fn local_keypair_mut(&mut self) -> Option<&mut DhState> {
        self.dh_local_static.as_mut()
    }

    /// The slot holding the remote static public key, when the pattern has
    /// one. Filled by the application before `start` for `_K`-style
    /// patterns, or by the peer's `s` token during the handshake.
    pub fn remote_public_key(&self) -> Option<&DhState> {
        self.dh_remote_static.as_ref()
    }

    pub fn remote_public_key_mut(&mut self) -> Option<&mut DhState> {
        self.dh_remote_static.as_mut()
    }

    /// Test-vector support: a pre-set keypair copied into the local
    /// ephemeral whenever the pattern would generate one. Not for
    /// production use.
    pub fn fixed_ephemeral_mut(&mut self) -> Option<&mut DhState> {
        self.dh_local_ephemeral.as_ref()?;
        let alg = self.symmetric.id().dh;
        Some(self.dh_fixed_ephemeral.get_or_insert_with(|| DhState::new(alg)))
    }

    /// Mixes the prologue into the transcript. Legal once, before `start`;
    /// starting without it absorbs an empty prologue.
    pub fn set_prologue(&mut self, prologue: &[u8]) -> Result<(), NoiseError> {
        if self.action != Action::None || !self.requirements.contains(Requirements::PROLOGUE) {
            return Err(NoiseError::InvalidState);
        }
        self.symmetric.mix_hash(prologue);
        self.requirements.remove(Requirements::PROLOGUE);
        Ok(())
    }

    pub fn needs_pre_shared_key(&self) -> bool {
        self.requirements.contains(Requirements::PSK)
    }

    pub fn has_pre_shared_key(&self) -> bool {
        !self.requirements.contains(Requirements::PSK)
            && self.symmetric.id().prefix == Prefix::NoisePsk
    }

    /// Absorbs the 32-byte pre-shared key into `ck` and `h`. If no prologue
    /// has been set yet this locks in an empty one.
    pub fn set_pre_shared_key(&mut self, key: &[u8]) -> Result<(), NoiseError> {
        if key.len() != PSK_LEN {
            return Err(NoiseError::InvalidLength);
        }
        if self.symmetric.id().prefix != Prefix::NoisePsk {
            return Err(NoiseError::NotApplicable);
        }
        if self.action != Action::None || !self.requirements.contains(Requirements::PSK) {
            return Err(NoiseError::InvalidState);
        }
        if self.requirements.contains(Requirements::PROLOGUE) {
            self.set_prologue(&[])?;
        }
        self.symmetric.mix_pre_shared_key(key)?;
        self.requirements.remove(Requirements::PSK);
        Ok(())
    }

    pub fn needs_local_keypair(&self) -> bool {
        self.requirements.contains(Requirements::LOCAL_REQUIRED) && !self.has_local_keypair()
    }

    pub fn has_local_keypair(&self) -> bool {
        self.dh_local_static
            .as_ref()
            .is_some_and(DhState::has_keypair)
    }

    pub fn needs_remote_public_key(&self) -> bool {
        self.requirements.contains(Requirements::REMOTE_REQUIRED) && !self.has_remote_public_key()
    }

    pub fn has_remote_public_key(&self) -> bool {
        self.dh_remote_static
            .as_ref()
            .is_some_and(DhState::has_public_key)
    }

    /// Checks every outstanding requirement, absorbs the pre-message public
    /// keys in role order and opens the message phase.
    pub fn start(&mut self) -> Result<(), NoiseError> {
        if self.action != Action::None {
            return Err(NoiseError::InvalidState);
        }
        if self.symmetric.id().pattern == HandshakePattern::XXFallback
            && !self.requirements.contains(Requirements::FALLBACK_PREMSG)
        {
            // XXfallback is only reachable through fallback().
            return Err(NoiseError::NotApplicable);
        }
        if self.requirements.contains(Requirements::LOCAL_REQUIRED) && !self.has_local_keypair() {
            return Err(NoiseError::LocalKeyRequired);
        }
        if self.requirements.contains(Requirements::REMOTE_REQUIRED)
            && !self.has_remote_public_key()
        {
            return Err(NoiseError::RemoteKeyRequired);
        }
        if self.requirements.contains(Requirements::PSK) {
            return Err(NoiseError::PskRequired);
        }
        if self.requirements.contains(Requirements::PROLOGUE) {
            self.set_prologue(&[])?;
        }

        // Pre-message public keys: the initiator's premessages hash first.
        match self.role {
            Role::Initiator => {
                if self.requirements.contains(Requirements::LOCAL_PREMSG) {
                    Self::mix_public_key(&mut self.symmetric, &self.dh_local_static);
                }
                if self.requirements.contains(Requirements::REMOTE_PREMSG) {
                    Self::mix_public_key(&mut self.symmetric, &self.dh_remote_static);
                }
                if self.requirements.contains(Requirements::FALLBACK_PREMSG) {
                    Self::mix_public_key(&mut self.symmetric, &self.dh_remote_ephemeral);
                }
            }
            Role::Responder => {
                if self.requirements.contains(Requirements::REMOTE_PREMSG) {
                    Self::mix_public_key(&mut self.symmetric, &self.dh_remote_static);
                }
                if self.requirements.contains(Requirements::LOCAL_PREMSG) {
                    Self::mix_public_key(&mut self.symmetric, &self.dh_local_static);
                }
                if self.requirements.contains(Requirements::FALLBACK_PREMSG) {
                    Self::mix_public_key(&mut self.symmetric, &self.dh_local_ephemeral);
                }
            }
        }

        self.action = match self.role {
            Role::Initiator => Action::WriteMessage,
            Role::Responder => Action::ReadMessage,
        };
        debug!(role = ?self.role, protocol = %self.symmetric.id().name(), "handshake started");
        Ok(())
    }

    fn mix_public_key(symmetric: &mut SymmetricState, dh: &Option<DhState>) {
        if let Some(public) = dh.as_ref().and_then(|dh| dh.public_key()) {
            symmetric.mix_hash(public);
        }
    }

    /// Writes the next handshake message into `message`, sealing `payload`
    /// behind the pattern tokens, and returns the number of bytes written.
    /// On failure the state latches `Failed` and the buffer is scrubbed.
    pub fn write_message(
        &mut self,
        payload: Option<&[u8]>,
        message: &mut [u8],
    ) -> Result<usize, NoiseError> {
        if self.action != Action::WriteMessage {
            return Err(NoiseError::InvalidState);
        }
        match self.write_tokens(payload, message) {
            Ok(size) => Ok(size),
            Err(err) => {
                self.action = Action::Failed;
                message.zeroize();
                debug!(error = ?err, "write_message failed");
                Err(err)
            }
        }
    }

    fn write_tokens(
        &mut self,
        payload: Option<&[u8]>,
        message: &mut [u8],
    ) -> Result<usize, NoiseError> {
        let mut head = 0;
        loop {
            match self.tokens[self.cursor] {
                Token::End => {
                    // The cursor stays on End; split is the only exit now.
                    self.action = Action::Split;
                    break;
                }
                Token::FlipDir => {
                    self.cursor += 1;
                    self.action = Action::ReadMessage;
                    break;
                }
                token => {
                    head += self.write_token(token, message, head)?;
                    self.cursor += 1;
                }
            }
        }

        // The payload (possibly empty) rides behind the handshake values.
        let payload = payload.unwrap_or(&[]);
        let mac_len = self.symmetric.mac_len();
        if message.len().saturating_sub(head) < payload.len() + mac_len {
            return Err(NoiseError::InvalidLength);
        }
        message[head..head + payload.len()].copy_from_slice(payload);
        let sealed = self
            .symmetric
            .encrypt_and_hash(&mut message[head..], payload.len())?;
        Ok(head + sealed)
    }

    fn write_token(
        &mut self,
        token: Token,
        message: &mut [u8],
        head: usize,
    ) -> Result<usize, NoiseError> {
        let rest = &mut message[head..];
        match token {
            Token::E => {
                let local = self
                    .dh_local_ephemeral
                    .as_mut()
                    .ok_or(NoiseError::InvalidState)?;
                match self.dh_fixed_ephemeral.as_ref() {
                    Some(fixed) => local.copy_keypair_from(fixed)?,
                    None => local.generate_keypair()?,
                }
                let len = local.public_key_len();
                if rest.len() < len {
                    return Err(NoiseError::InvalidLength);
                }
                rest[..len].copy_from_slice(local.public_key().ok_or(NoiseError::InvalidState)?);
                self.symmetric.mix_hash(&rest[..len]);
                // With pre-shared keys the ephemeral also keys the cipher.
                if self.symmetric.id().prefix == Prefix::NoisePsk {
                    self.symmetric.mix_key(&rest[..len])?;
                }
                Ok(len)
            }
            Token::S => {
                let local = self
                    .dh_local_static
                    .as_ref()
                    .ok_or(NoiseError::InvalidState)?;
                let len = local.public_key_len();
                let mac_len = self.symmetric.mac_len();
                if rest.len() < len + mac_len {
                    return Err(NoiseError::InvalidLength);
                }
                rest[..len].copy_from_slice(local.public_key().ok_or(NoiseError::InvalidState)?);
                self.symmetric.encrypt_and_hash(&mut rest[..len + mac_len], len)
            }
            Token::EE | Token::ES | Token::SE | Token::SS => {
                self.mix_dh(token)?;
                Ok(0)
            }
            Token::FlipDir | Token::End => Err(NoiseError::InvalidState),
        }
    }

    /// Reads a handshake message, returning the number of payload bytes
    /// copied into `payload`. The message buffer holds decrypted material
    /// in place while processing and is scrubbed before returning.
    pub fn read_message(
        &mut self,
        message: &mut [u8],
        payload: Option<&mut [u8]>,
    ) -> Result<usize, NoiseError> {
        if self.action != Action::ReadMessage {
            return Err(NoiseError::InvalidState);
        }
        let result = self.read_tokens(message, payload);
        message.zeroize();
        match result {
            Ok(size) => Ok(size),
            Err(err) => {
                self.action = Action::Failed;
                debug!(error = ?err, "read_message failed");
                Err(err)
            }
        }
    }

    fn read_tokens(
        &mut self,
        message: &mut [u8],
        payload: Option<&mut [u8]>,
    ) -> Result<usize, NoiseError> {
        let mut head = 0;
        loop {
            match self.tokens[self.cursor] {
                Token::End => {
                    self.action = Action::Split;
                    break;
                }
                Token::FlipDir => {
                    self.cursor += 1;
                    self.action = Action::WriteMessage;
                    break;
                }
                token => {
                    head += self.read_token(token, message, head)?;
                    self.cursor += 1;
                }
            }
        }

        // Whatever is left is the sealed payload.
        let len = self.symmetric.decrypt_and_hash(&mut message[head..])?;
        match payload {
            Some(payload) => {
                if len > payload.len() {
                    return Err(NoiseError::InvalidLength);
                }
                payload[..len].copy_from_slice(&message[head..head + len]);
                Ok(len)
            }
            None => Ok(0),
        }
    }

    fn read_token(
        &mut self,
        token: Token,
        message: &mut [u8],
        head: usize,
    ) -> Result<usize, NoiseError> {
        let rest = &mut message[head..];
        match token {
            Token::E => {
                let len = self
                    .dh_remote_ephemeral
                    .as_ref()
                    .ok_or(NoiseError::InvalidState)?
                    .public_key_len();
                if rest.len() < len {
                    return Err(NoiseError::InvalidLength);
                }
                self.symmetric.mix_hash(&rest[..len]);
                let remote = self
                    .dh_remote_ephemeral
                    .as_mut()
                    .ok_or(NoiseError::InvalidState)?;
                remote.set_public_key(&rest[..len])?;
                if remote.is_null_public_key() {
                    // A null ephemeral contributes nothing and silently
                    // downgrades the session; reject it outright.
                    return Err(NoiseError::InvalidPublicKey);
                }
                if self.symmetric.id().prefix == Prefix::NoisePsk {
                    self.symmetric.mix_key(&rest[..len])?;
                }
                Ok(len)
            }
            Token::S => {
                let remote_len = self
                    .dh_remote_static
                    .as_ref()
                    .ok_or(NoiseError::InvalidState)?
                    .public_key_len();
                let len = remote_len + self.symmetric.mac_len();
                if rest.len() < len {
                    return Err(NoiseError::InvalidLength);
                }
                let plain = self.symmetric.decrypt_and_hash(&mut rest[..len])?;
                self.dh_remote_static
                    .as_mut()
                    .ok_or(NoiseError::InvalidState)?
                    .set_public_key(&rest[..plain])?;
                Ok(len)
            }
            Token::EE | Token::ES | Token::SE | Token::SS => {
                self.mix_dh(token)?;
                Ok(0)
            }
            Token::FlipDir | Token::End => Err(NoiseError::InvalidState),
        }
    }

    /// Runs the DH for a pattern token and ratchets the chaining key. ES
    /// and SE select operands by role, so both sides derive the same
    /// secret whichever of them wrote the message.
    fn mix_dh(&mut self, token: Token) -> Result<(), NoiseError> {
        let (private, public) = match (token, self.role) {
            (Token::EE, _) => (&self.dh_local_ephemeral, &self.dh_remote_ephemeral),
            (Token::SS, _) => (&self.dh_local_static, &self.dh_remote_static),
            (Token::ES, Role::Initiator) | (Token::SE, Role::Responder) => {
                (&self.dh_local_ephemeral, &self.dh_remote_static)
            }
            (Token::ES, Role::Responder) | (Token::SE, Role::Initiator) => {
                (&self.dh_local_static, &self.dh_remote_ephemeral)
            }
            _ => return Err(NoiseError::InvalidState),
        };
        let private = private.as_ref().ok_or(NoiseError::InvalidState)?;
        let public = public.as_ref().ok_or(NoiseError::InvalidState)?;
        let len = private.shared_key_len();
        let mut shared = [0u8; MAX_DH_LEN];
        let result = match private.calculate(public, &mut shared[..len]) {
            Ok(()) => self.symmetric.mix_key(&shared[..len]),
            Err(err) => Err(err),
        };
        shared.zeroize();
        result
    }

    /// Converts a failed or in-flight IK handshake into XXfallback with the
    /// roles reversed (Noise Pipes). The prologue and any pre-shared key
    /// must be supplied again before `start`.
    pub fn fallback(&mut self) -> Result<(), NoiseError> {
        let mut id = self.symmetric.id();
        if id.pattern != HandshakePattern::IK {
            return Err(NoiseError::NotApplicable);
        }
        match self.role {
            Role::Initiator => {
                // Must have sent the first message already.
                if self.action != Action::Failed && self.action != Action::ReadMessage {
                    return Err(NoiseError::InvalidState);
                }
                if !self
                    .dh_local_ephemeral
                    .as_ref()
                    .is_some_and(DhState::has_public_key)
                {
                    return Err(NoiseError::InvalidState);
                }
            }
            Role::Responder => {
                // Must have received the initiator's first message.
                if self.action != Action::Failed && self.action != Action::WriteMessage {
                    return Err(NoiseError::InvalidState);
                }
                if !self
                    .dh_remote_ephemeral
                    .as_ref()
                    .is_some_and(DhState::has_public_key)
                {
                    return Err(NoiseError::InvalidState);
                }
            }
        }

        id.pattern = HandshakePattern::XXFallback;
        if let Some(remote_static) = self.dh_remote_static.as_mut() {
            remote_static.clear_key();
        }
        match self.role {
            Role::Initiator => {
                // The peer re-supplies its ephemeral in the fallback run.
                if let Some(remote_ephemeral) = self.dh_remote_ephemeral.as_mut() {
                    remote_ephemeral.clear_key();
                }
                self.role = Role::Responder;
            }
            Role::Responder => {
                if let Some(local_ephemeral) = self.dh_local_ephemeral.as_mut() {
                    local_ephemeral.clear_key();
                }
                self.role = Role::Initiator;
            }
        }

        self.tokens = id.pattern.tokens();
        self.cursor = 0;
        self.action = Action::None;
        let flags = match self.role {
            Role::Initiator => id.pattern.flags(),
            Role::Responder => id.pattern.flags().reversed(),
        };
        self.requirements = Requirements::derive(flags, id.prefix, true);
        self.symmetric.reinitialize(id);
        debug!(role = ?self.role, "fell back to XXfallback");
        Ok(())
    }

    /// Splits the transport ciphers as `(send, recv)`.
    pub fn split(&mut self) -> Result<(CipherState, CipherState), NoiseError> {
        self.split_with_key(&[])
    }

    /// Splits the transport ciphers, folding an optional 32-byte secondary
    /// key from a parallel handshake into the derivation. The responder's
    /// pair is swapped so each side's send meets the other's recv.
    pub fn split_with_key(
        &mut self,
        secondary_key: &[u8],
    ) -> Result<(CipherState, CipherState), NoiseError> {
        if !secondary_key.is_empty() && secondary_key.len() != PSK_LEN {
            return Err(NoiseError::InvalidLength);
        }
        if self.action != Action::Split || self.split_done {
            return Err(NoiseError::InvalidState);
        }
        let (c1, c2) = self.symmetric.split(secondary_key)?;
        self.split_done = true;
        debug!(role = ?self.role, "transport keys split");
        match self.role {
            Role::Initiator => Ok((c1, c2)),
            Role::Responder => Ok((c2, c1)),
        }
    }

    /// Copies the final transcript hash into `hash` once the handshake has
    /// completed; shorter buffers truncate, longer ones are zero-padded.
    /// The value identifies the session for channel binding.
    pub fn get_handshake_hash(&self, hash: &mut [u8]) -> Result<(), NoiseError> {
        if self.action != Action::Split {
            return Err(NoiseError::InvalidState);
        }
        let h = self.symmetric.handshake_hash();
        if h.len() <= hash.len() {
            hash[..h.len()].copy_from_slice(h);
            hash[h.len()..].fill(0);
        } else {
            hash.copy_from_slice(&h[..hash.len()]);
        }
        Ok(())
    }
}
