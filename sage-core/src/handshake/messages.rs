//! Handshake wire messages
//!
//! Five payload kinds framed as CBOR. Every frame except the cookie
//! challenge carries an RFC 9421 signature over its canonical CBOR body:
//! the envelope holds the sender, freshness fields and the detached
//! signature headers, and verification rebuilds the exact canonical
//! message the sender signed. The cookie challenge is deliberately
//! unauthenticated so the responder spends no cryptography on an unproven
//! source.

use sage_crypto::SignatureAlgorithm;
use sage_did::Did;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::pow::PowPuzzle;
use crate::error::{Result, SageError};
use crate::message::CanonicalMessage;
use crate::signing::{MessageSigner, MessageVerifier, SignedHeaders};

/// First flight: the initiator's ephemeral KEM share and transcript hash.
///
/// Freshness (timestamp, nonce) and the initiator's signature ride in the
/// frame envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub i_did: Did,
    pub i_ephemeral_kem_pk: Vec<u8>,
    pub info_hash: [u8; 32],
}

/// Unauthenticated admission challenge from the responder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CookieChallenge {
    pub cookie: Vec<u8>,
    pub puzzle: PowPuzzle,
}

/// The invitation resent with the returned cookie and a PoW solution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolvedInvitation {
    pub invitation: Invitation,
    pub cookie: Vec<u8>,
    pub pow_solution: u64,
}

/// Responder's acceptance: KEM ciphertext, transcript echo and ack MAC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Accept {
    pub r_did: Did,
    pub enc: Vec<u8>,
    pub info_hash_echo: [u8; 32],
    pub ack_tag: [u8; 32],
}

/// Optional final flight confirming the initiator saw the ack tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AckConfirm {
    pub ack_tag_confirmation: [u8; 32],
}

/// Any handshake payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HandshakePayload {
    Invitation(Invitation),
    CookieChallenge(CookieChallenge),
    SolvedInvitation(SolvedInvitation),
    Accept(Accept),
    AckConfirm(AckConfirm),
}

impl HandshakePayload {
    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            HandshakePayload::Invitation(_) => "invitation",
            HandshakePayload::CookieChallenge(_) => "cookie_challenge",
            HandshakePayload::SolvedInvitation(_) => "solved_invitation",
            HandshakePayload::Accept(_) => "accept",
            HandshakePayload::AckConfirm(_) => "ack_confirm",
        }
    }

    /// Canonical CBOR bytes, the exact body the envelope signature covers.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::ser::into_writer(self, &mut buf)
            .map_err(|e| SageError::MalformedFrame(e.to_string()))?;
        Ok(buf)
    }
}

/// Signature envelope of a signed handshake frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameEnvelope {
    pub sender: Did,
    pub message_id: Uuid,
    pub timestamp: u64,
    pub nonce: String,
    pub algorithm: SignatureAlgorithm,
    pub signature: String,
    pub signature_input: String,
}

/// One handshake frame on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandshakeFrame {
    pub payload: HandshakePayload,
    /// Absent only for [`HandshakePayload::CookieChallenge`].
    pub envelope: Option<FrameEnvelope>,
}

impl HandshakeFrame {
    /// Sign `payload` and wrap it with a fresh envelope.
    pub fn seal(payload: HandshakePayload, sender: &Did, signer: &MessageSigner) -> Result<Self> {
        let body = payload.canonical_bytes()?;
        let message = CanonicalMessage::new(sender.clone(), body, signer.algorithm());
        let headers = signer.sign(&message)?;

        Ok(Self {
            payload,
            envelope: Some(FrameEnvelope {
                sender: sender.clone(),
                message_id: message.message_id,
                timestamp: message.timestamp,
                nonce: message.nonce,
                algorithm: message.algorithm,
                signature: headers.signature,
                signature_input: headers.signature_input,
            }),
        })
    }

    /// Wrap an unauthenticated cookie challenge.
    pub fn unsigned(payload: CookieChallenge) -> Self {
        Self {
            payload: HandshakePayload::CookieChallenge(payload),
            envelope: None,
        }
    }

    /// The sender claimed by the envelope.
    pub fn sender(&self) -> Option<&Did> {
        self.envelope.as_ref().map(|e| &e.sender)
    }

    /// Rebuild the canonical message the sender signed.
    pub fn to_canonical_message(&self) -> Result<CanonicalMessage> {
        let envelope = self
            .envelope
            .as_ref()
            .ok_or_else(|| SageError::MalformedFrame("frame is unsigned".to_string()))?;
        let body = self.payload.canonical_bytes()?;
        Ok(
            CanonicalMessage::new(envelope.sender.clone(), body, envelope.algorithm)
                .with_message_id(envelope.message_id)
                .with_timestamp(envelope.timestamp)
                .with_nonce(envelope.nonce.clone()),
        )
    }

    /// Verify the envelope signature (and consume its nonce).
    pub async fn verify(&self, verifier: &MessageVerifier) -> Result<()> {
        let envelope = self
            .envelope
            .as_ref()
            .ok_or_else(|| SageError::MalformedFrame("frame is unsigned".to_string()))?;
        let message = self.to_canonical_message()?;
        let headers = SignedHeaders {
            signature: envelope.signature.clone(),
            signature_input: envelope.signature_input.clone(),
            content_digest: None,
        };
        verifier.verify(&message, &headers).await
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
