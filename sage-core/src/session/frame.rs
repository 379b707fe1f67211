//! Session wire frames
//!
//! An AEAD-protected frame: session id, direction tag, monotonic counter
//! and ciphertext. The id, direction and counter are bound into the AEAD
//! associated data, so none of them can be altered without failing
//! authentication.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SageError};

/// Direction of a session frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    InitiatorToResponder,
    ResponderToInitiator,
}

impl Direction {
    /// Single-byte tag bound into the frame AAD.
    pub fn tag(&self) -> u8 {
        match self {
            Direction::InitiatorToResponder => 0x01,
            Direction::ResponderToInitiator => 0x02,
        }
    }

    /// The opposite direction.
    pub fn flipped(&self) -> Self {
        match self {
            Direction::InitiatorToResponder => Direction::ResponderToInitiator,
            Direction::ResponderToInitiator => Direction::InitiatorToResponder,
        }
    }
}

/// One encrypted session frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionFrame {
    /// Session this frame belongs to.
    pub session_id: [u8; 16],
    /// Per-direction monotonic counter, starting at 1.
    pub counter: u64,
    /// Which directional key sealed this frame.
    pub direction: Direction,
    /// AEAD ciphertext with appended tag.
    pub ciphertext: Vec<u8>,
}

impl SessionFrame {
    /// Associated data binding id, direction and counter.
    pub fn aad(&self) -> [u8; 25] {
        build_aad(&self.session_id, self.direction, self.counter)
    }

    /// CBOR encoding for transport.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| SageError::MalformedFrame(e.to_string()))?;
        Ok(buf)
    }

    /// Decode a CBOR frame.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        ciborium::de::from_reader(bytes).map_err(|e| SageError::MalformedFrame(e.to_string()))
    }
}

/// `session_id || direction_tag || counter_be`.
pub fn build_aad(session_id: &[u8; 16], direction: Direction, counter: u64) -> [u8; 25] {
    let mut aad = [0u8; 25];
    aad[..16].copy_from_slice(session_id);
    aad[16] = direction.tag();
    aad[17..].copy_from_slice(&counter.to_be_bytes());
    aad
}

/// Per-frame nonce: `base_nonce XOR u96(counter)`, counter in the low
/// (rightmost) eight bytes, big-endian.
pub fn frame_nonce(base_nonce: &[u8; 12], counter: u64) -> [u8; 12] {
    let mut nonce = *base_nonce;
    for (i, byte) in counter.to_be_bytes().iter().enumerate() {
        nonce[4 + i] ^= byte;
    }
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_roundtrip() {
        let frame = SessionFrame {
            session_id: [9u8; 16],
            counter: 42,
            direction: Direction::InitiatorToResponder,
            ciphertext: vec![1, 2, 3],
        };
        let bytes = frame.to_bytes().unwrap();
        let back = SessionFrame::from_bytes(&bytes).unwrap();
        assert_eq!(back.session_id, frame.session_id);
        assert_eq!(back.counter, 42);
        assert_eq!(back.direction, frame.direction);
        assert_eq!(back.ciphertext, frame.ciphertext);
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            SessionFrame::from_bytes(b"not cbor at all"),
            Err(SageError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_nonce_xor_distinct_per_counter() {
        let base = [0xAAu8; 12];
        let n1 = frame_nonce(&base, 1);
        let n2 = frame_nonce(&base, 2);
        assert_ne!(n1, n2);
        // XOR is an involution: applying the counter again restores the base
        let restored = frame_nonce(&n1, 1);
        assert_eq!(restored, base);
    }

    #[test]
    fn test_aad_encodes_all_fields() {
        let a = build_aad(&[1u8; 16], Direction::InitiatorToResponder, 7);
        let b = build_aad(&[1u8; 16], Direction::ResponderToInitiator, 7);
        let c = build_aad(&[1u8; 16], Direction::InitiatorToResponder, 8);
        let d = build_aad(&[2u8; 16], Direction::InitiatorToResponder, 7);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);
    }

    #[test]
    fn test_direction_flip() {
        assert_eq!(
            Direction::InitiatorToResponder.flipped(),
            Direction::ResponderToInitiator
        );
    }
}
