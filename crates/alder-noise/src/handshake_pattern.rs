/// One step of a handshake message pattern.
///
/// `ES` is always the initiator's ephemeral with the responder's static and
/// `SE` the reverse, regardless of which side writes the message; the
/// handshake state crosses the operands over by role.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum Token {
    /// Ephemeral public key
    E,
    /// Static public key (encrypted once a key has been mixed)
    S,
    /// Ephemeral-ephemeral DH
    EE,
    /// Ephemeral-static DH (initiator ephemeral, responder static)
    ES,
    /// Static-ephemeral DH (initiator static, responder ephemeral)
    SE,
    /// Static-static DH
    SS,
    /// Direction change
    FlipDir,
    /// End of pattern
    End,
}

/// Key layout flags carried ahead of each token stream, stated from the
/// initiator's point of view; `reversed` restates them for the responder.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct PatternFlags(u8);

impl PatternFlags {
    /// The handshake transmits a local static key.
    pub const LOCAL_STATIC: u8 = 0x01;
    /// The handshake generates a local ephemeral key.
    pub const LOCAL_EPHEMERAL: u8 = 0x02;
    /// The local static key is a pre-message.
    pub const LOCAL_REQUIRED: u8 = 0x04;
    /// The local ephemeral key is a pre-message (fallback only).
    pub const LOCAL_EPHEM_REQ: u8 = 0x08;
    /// The handshake receives a remote static key.
    pub const REMOTE_STATIC: u8 = 0x10;
    /// The handshake receives a remote ephemeral key.
    pub const REMOTE_EPHEMERAL: u8 = 0x20;
    /// The remote static key is a pre-message.
    pub const REMOTE_REQUIRED: u8 = 0x40;
    /// The remote ephemeral key is a pre-message (fallback only).
    pub const REMOTE_EPHEM_REQ: u8 = 0x80;

    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn contains(self, bits: u8) -> bool {
        self.0 & bits != 0
    }

    /// Swaps the local and remote nibbles so the responder reads the pattern
    /// as if it were local.
    pub const fn reversed(self) -> Self {
        Self(((self.0 & 0x0f) << 4) | ((self.0 >> 4) & 0x0f))
    }
}

/// The handshake patterns the protocol grammar names.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum HandshakePattern {
    /// One-way, anonymous sender, known recipient static
    N,
    /// One-way, both statics known ahead of time
    K,
    /// One-way, sender transmits its static
    X,
    /// No authentication, no static keys (anonymous)
    NN,
    /// Initiator knows responder static, only responder authenticated
    NK,
    /// Responder transmits static, initiator anonymous
    NX,
    /// Initiator transmits static, responder anonymous
    XN,
    /// Authenticates responder, initiator transmits static late
    XK,
    /// Mutual authentication with transmitted statics
    XX,
    /// Responder knows initiator static
    KN,
    /// Mutual static key authentication from pre-messages
    KK,
    /// Responder transmits static, initiator static known
    KX,
    /// Initiator sends its static immediately, responder anonymous
    IN,
    /// Initiator sends its static immediately, responder static known
    IK,
    /// Both statics transmitted, none known ahead of time
    IX,
    /// Recovery pattern for Noise Pipes after a failed IK
    XXFallback,
}

impl HandshakePattern {
    pub const ALL: [HandshakePattern; 16] = [
        HandshakePattern::N,
        HandshakePattern::K,
        HandshakePattern::X,
        HandshakePattern::NN,
        HandshakePattern::NK,
        HandshakePattern::NX,
        HandshakePattern::XN,
        HandshakePattern::XK,
        HandshakePattern::XX,
        HandshakePattern::KN,
        HandshakePattern::KK,
        HandshakePattern::KX,
        HandshakePattern::IN,
        HandshakePattern::IK,
        HandshakePattern::IX,
        HandshakePattern::XXFallback,
    ];

    pub fn flags(self) -> PatternFlags {
        use HandshakePattern::*;
        const LS: u8 = PatternFlags::LOCAL_STATIC;
        const LE: u8 = PatternFlags::LOCAL_EPHEMERAL;
        const LR: u8 = PatternFlags::LOCAL_REQUIRED;
        const RS: u8 = PatternFlags::REMOTE_STATIC;
        const RE: u8 = PatternFlags::REMOTE_EPHEMERAL;
        const RR: u8 = PatternFlags::REMOTE_REQUIRED;
        const REF: u8 = PatternFlags::REMOTE_EPHEM_REQ;
        PatternFlags::new(match self {
            N => LE | RS | RR,
            K => LS | LE | LR | RS | RR,
            X => LS | LE | RS | RR,
            NN => LE | RE,
            NK => LE | RS | RE | RR,
            NX => LE | RS | RE,
            XN => LS | LE | RE,
            XK => LS | LE | RS | RE | RR,
            XX => LS | LE | RS | RE,
            KN => LS | LE | LR | RE,
            KK => LS | LE | LR | RS | RE | RR,
            KX => LS | LE | LR | RS | RE,
            IN => LS | LE | RE,
            IK => LS | LE | RS | RE | RR,
            IX => LS | LE | RS | RE,
            XXFallback => LS | LE | RS | RE | REF,
        })
    }

    pub fn tokens(self) -> &'static [Token] {
        use Token::*;
        match self {
            HandshakePattern::N => &[E, ES, End],
            HandshakePattern::K => &[E, ES, SS, End],
            HandshakePattern::X => &[E, ES, S, SS, End],
            HandshakePattern::NN => &[E, FlipDir, E, EE, End],
            HandshakePattern::NK => &[E, ES, FlipDir, E, EE, End],
            HandshakePattern::NX => &[E, FlipDir, E, EE, S, ES, End],
            HandshakePattern::XN => &[E, FlipDir, E, EE, FlipDir, S, SE, End],
            HandshakePattern::XK => &[E, ES, FlipDir, E, EE, FlipDir, S, SE, End],
            HandshakePattern::XX => &[E, FlipDir, E, EE, S, ES, FlipDir, S, SE, End],
            HandshakePattern::KN => &[E, FlipDir, E, EE, SE, End],
            HandshakePattern::KK => &[E, ES, SS, FlipDir, E, EE, SE, End],
            HandshakePattern::KX => &[E, FlipDir, E, EE, SE, S, ES, End],
            HandshakePattern::IN => &[E, S, FlipDir, E, EE, SE, End],
            HandshakePattern::IK => &[E, ES, S, SS, FlipDir, E, EE, SE, End],
            HandshakePattern::IX => &[E, S, FlipDir, E, EE, SE, S, ES, End],
            HandshakePattern::XXFallback => &[E, EE, S, SE, FlipDir, S, ES, End],
        }
    }

    pub(crate) fn name_token(self) -> &'static str {
        match self {
            HandshakePattern::N => "N",
            HandshakePattern::K => "K",
            HandshakePattern::X => "X",
            HandshakePattern::NN => "NN",
            HandshakePattern::NK => "NK",
            HandshakePattern::NX => "NX",
            HandshakePattern::XN => "XN",
            HandshakePattern::XK => "XK",
            HandshakePattern::XX => "XX",
            HandshakePattern::KN => "KN",
            HandshakePattern::KK => "KK",
            HandshakePattern::KX => "KX",
            HandshakePattern::IN => "IN",
            HandshakePattern::IK => "IK",
            HandshakePattern::IX => "IX",
            HandshakePattern::XXFallback => "XXfallback",
        }
    }

    pub(crate) fn from_name_token(token: &str) -> Option<Self> {
        HandshakePattern::ALL
            .into_iter()
            .find(|pattern| pattern.name_token() == token)
    }
}

#[cfg(test)]
mod tests {
    use super::{HandshakePattern, PatternFlags, Token};

    #[test]
    fn flag_reversal_is_an_involution() {
        for pattern in HandshakePattern::ALL {
            let flags = pattern.flags();
            assert_eq!(flags.reversed().reversed(), flags);
        }
    }

    #[test]
    fn reversal_swaps_local_and_remote() {
        let flags = PatternFlags::new(PatternFlags::LOCAL_STATIC | PatternFlags::REMOTE_EPHEM_REQ);
        let reversed = flags.reversed();
        assert!(reversed.contains(PatternFlags::REMOTE_STATIC));
        assert!(reversed.contains(PatternFlags::LOCAL_EPHEM_REQ));
        assert!(!reversed.contains(PatternFlags::LOCAL_STATIC));
    }

    #[test]
    fn every_pattern_terminates() {
        for pattern in HandshakePattern::ALL {
            let tokens = pattern.tokens();
            assert_eq!(tokens.last(), Some(&Token::End), "{pattern:?}");
            let ends = tokens.iter().filter(|&&t| t == Token::End).count();
            assert_eq!(ends, 1, "{pattern:?}");
        }
    }

    #[test]
    fn tokens_are_covered_by_flags() {
        for pattern in HandshakePattern::ALL {
            let flags = pattern.flags();
            // Track which side writes; the first message is the initiator's.
            let mut local = flags;
            let mut remote = flags.reversed();
            for &token in pattern.tokens() {
                match token {
                    Token::E => {
                        assert!(local.contains(PatternFlags::LOCAL_EPHEMERAL), "{pattern:?}");
                        assert!(remote.contains(PatternFlags::REMOTE_EPHEMERAL), "{pattern:?}");
                    }
                    Token::S => {
                        assert!(local.contains(PatternFlags::LOCAL_STATIC), "{pattern:?}");
                        assert!(remote.contains(PatternFlags::REMOTE_STATIC), "{pattern:?}");
                    }
                    Token::EE => {
                        assert!(local.contains(PatternFlags::LOCAL_EPHEMERAL), "{pattern:?}");
                        assert!(local.contains(PatternFlags::REMOTE_EPHEMERAL), "{pattern:?}");
                    }
                    Token::SS => {
                        assert!(local.contains(PatternFlags::LOCAL_STATIC), "{pattern:?}");
                        assert!(local.contains(PatternFlags::REMOTE_STATIC), "{pattern:?}");
                    }
                    Token::ES | Token::SE => {
                        assert!(local.contains(PatternFlags::LOCAL_EPHEMERAL | PatternFlags::LOCAL_STATIC));
                        assert!(local.contains(PatternFlags::REMOTE_EPHEMERAL | PatternFlags::REMOTE_STATIC));
                    }
                    Token::FlipDir => std::mem::swap(&mut local, &mut remote),
                    Token::End => {}
                }
            }
        }
    }

    #[test]
    fn fallback_premessage_flag_is_unique_to_xxfallback() {
        for pattern in HandshakePattern::ALL {
            let premsg = pattern
                .flags()
                .contains(PatternFlags::LOCAL_EPHEM_REQ | PatternFlags::REMOTE_EPHEM_REQ);
            assert_eq!(premsg, pattern == HandshakePattern::XXFallback);
        }
    }
}
