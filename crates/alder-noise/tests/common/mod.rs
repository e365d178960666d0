#![allow(dead_code)]

use alder_noise::{Action, CipherState, HandshakeState, TAG_SIZE};

pub const MSG_MAX: usize = 1024;

/// Generates local statics and shares whichever statics the patterns
/// require ahead of time.
pub fn setup_keys(alice: &mut HandshakeState, bob: &mut HandshakeState) {
    for state in [&mut *alice, &mut *bob] {
        if let Some(local) = state.local_keypair_mut() {
            local.generate_keypair().unwrap();
        }
    }
    share_remote_static(alice, bob);
    share_remote_static(bob, alice);
}

fn share_remote_static(to: &mut HandshakeState, from: &HandshakeState) {
    if to.needs_remote_public_key() {
        let public = from
            .local_keypair()
            .expect("peer pattern carries a static")
            .public_key()
            .expect("peer static generated")
            .to_vec();
        to.remote_public_key_mut()
            .unwrap()
            .set_public_key(&public)
            .unwrap();
    }
}

/// Alternates write/read until both sides are ready to split. Payloads are
/// taken per message in order (empty once exhausted); returns what each
/// reader received, message by message.
pub fn drive_to_split(
    alice: &mut HandshakeState,
    bob: &mut HandshakeState,
    payloads: &[&[u8]],
) -> Vec<Vec<u8>> {
    let mut received = Vec::new();
    let mut remaining = payloads.iter();
    loop {
        match (alice.action(), bob.action()) {
            (Action::Split, Action::Split) => return received,
            (Action::WriteMessage, _) => {
                let payload = remaining.next().copied().unwrap_or(b"");
                received.push(step(alice, bob, payload));
            }
            (_, Action::WriteMessage) => {
                let payload = remaining.next().copied().unwrap_or(b"");
                received.push(step(bob, alice, payload));
            }
            other => panic!("handshake stalled: {other:?}"),
        }
    }
}

/// One message: writer seals `payload`, reader opens it.
pub fn step(writer: &mut HandshakeState, reader: &mut HandshakeState, payload: &[u8]) -> Vec<u8> {
    let mut message = [0u8; MSG_MAX];
    let len = writer.write_message(Some(payload), &mut message).unwrap();
    let mut payload_buf = [0u8; MSG_MAX];
    let n = reader
        .read_message(&mut message[..len], Some(&mut payload_buf))
        .unwrap();
    payload_buf[..n].to_vec()
}

/// Seals `plaintext` with `send` and opens it with `recv`.
pub fn transport_roundtrip(send: &mut CipherState, recv: &mut CipherState, plaintext: &[u8]) {
    let mut buf = vec![0u8; plaintext.len() + TAG_SIZE];
    buf[..plaintext.len()].copy_from_slice(plaintext);
    let sealed = send.encrypt_with_ad(b"", &mut buf, plaintext.len()).unwrap();
    let opened = recv.decrypt_with_ad(b"", &mut buf[..sealed]).unwrap();
    assert_eq!(&buf[..opened], plaintext);
}

pub fn handshake_hash(state: &HandshakeState) -> Vec<u8> {
    let mut hash = [0u8; 64];
    state.get_handshake_hash(&mut hash).unwrap();
    hash.to_vec()
}

/// Pins the ephemeral either side will use, for reproducible transcripts.
pub fn set_fixed_ephemeral(state: &mut HandshakeState, seed: u8) {
    let len = state.protocol_id().dh.private_key_len();
    let mut private = vec![seed; len];
    state
        .fixed_ephemeral_mut()
        .expect("pattern generates a local ephemeral")
        .set_keypair_private(&mut private)
        .unwrap();
}
