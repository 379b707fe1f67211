//! Proof-of-work admission puzzles
//!
//! A solution is a 64-bit value such that
//! `leading_zero_bits(SHA-256(challenge || solution_be)) >= difficulty`.
//! The challenge is derived from the cookie, so the responder stays
//! stateless: verifying a solved invitation only needs the returned cookie
//! and the difficulty embedded in it.

use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

use crate::error::{HandshakeFailure, Result, SageError};

/// One puzzle as presented to the initiator.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PowPuzzle {
    /// 32-byte challenge.
    pub challenge: [u8; 32],
    /// Required leading zero bits.
    pub difficulty: u8,
}

impl PowPuzzle {
    /// Derive the puzzle a cookie demands: `challenge = SHA-256(cookie)`.
    pub fn from_cookie(cookie: &[u8], difficulty: u8) -> Self {
        Self {
            challenge: Sha256::digest(cookie).into(),
            difficulty,
        }
    }

    /// Check a solution against the required difficulty.
    pub fn verify(&self, solution: u64) -> Result<()> {
        let digest = Sha256::new()
            .chain_update(self.challenge)
            .chain_update(solution.to_be_bytes())
            .finalize();
        if leading_zero_bits(&digest) < u32::from(self.difficulty) {
            return Err(SageError::HandshakeFailed(HandshakeFailure::Pow));
        }
        Ok(())
    }

    /// Brute-force a solution, bounded by `max_attempts`.
    ///
    /// CPU-bound; callers should run this off the hot path (the initiator
    /// pays, the responder only verifies).
    pub fn solve(&self, max_attempts: u64) -> Option<u64> {
        (0..max_attempts).find(|candidate| self.verify(*candidate).is_ok())
    }
}

/// Count leading zero bits of a digest.
fn leading_zero_bits(digest: &[u8]) -> u32 {
    let mut bits = 0;
    for byte in digest {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// Chooses the PoW difficulty, optionally scaling with handshake load.
///
/// With auto-adjust on, each doubling of concurrently pending handshakes
/// past a base load adds one bit, capped four bits above the configured
/// baseline.
pub struct DifficultyController {
    base_bits: u8,
    autoadjust: bool,
    pending: AtomicUsize,
}

impl DifficultyController {
    /// Pending handshakes before the first extra bit.
    const BASE_LOAD: usize = 64;
    /// Cap on extra bits above the baseline.
    const MAX_EXTRA_BITS: u8 = 4;

    pub fn new(base_bits: u8, autoadjust: bool) -> Self {
        Self {
            base_bits,
            autoadjust,
            pending: AtomicUsize::new(0),
        }
    }

    /// Difficulty demanded from the next initiator.
    pub fn current(&self) -> u8 {
        if !self.autoadjust {
            return self.base_bits;
        }
        let pending = self.pending.load(Ordering::Relaxed);
        let mut extra = 0u8;
        let mut threshold = Self::BASE_LOAD;
        while pending >= threshold && extra < Self::MAX_EXTRA_BITS {
            extra += 1;
            threshold *= 2;
        }
        if extra > 0 {
            debug!(pending, extra, "PoW difficulty raised under load");
        }
        self.base_bits.saturating_add(extra)
    }

    /// Record a handshake entering the pending phase.
    pub fn handshake_started(&self) {
        self.pending.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handshake leaving the pending phase.
    pub fn handshake_finished(&self) {
        let _ = self
            .pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |p| p.checked_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solve_and_verify_low_difficulty() {
        let puzzle = PowPuzzle::from_cookie(b"cookie-bytes", 8);
        let solution = puzzle.solve(1 << 20).expect("8 bits is quickly solvable");
        puzzle.verify(solution).unwrap();
    }

    #[test]
    fn test_insufficient_solution_rejected() {
        let puzzle = PowPuzzle::from_cookie(b"cookie-bytes", 8);
        let solution = puzzle.solve(1 << 20).unwrap();

        // The same solution against a much harder instance of the same
        // challenge is overwhelmingly unlikely to pass
        let harder = PowPuzzle { challenge: puzzle.challenge, difficulty: 64 };
        assert!(matches!(
            harder.verify(solution),
            Err(SageError::HandshakeFailed(HandshakeFailure::Pow))
        ));
    }

    #[test]
    fn test_challenge_derivation_is_stable() {
        let a = PowPuzzle::from_cookie(b"same", 10);
        let b = PowPuzzle::from_cookie(b"same", 10);
        assert_eq!(a, b);
        let c = PowPuzzle::from_cookie(b"different", 10);
        assert_ne!(a.challenge, c.challenge);
    }

    #[test]
    fn test_leading_zero_bits() {
        assert_eq!(leading_zero_bits(&[0x00, 0x00, 0xFF]), 16);
        assert_eq!(leading_zero_bits(&[0x00, 0x0F]), 12);
        assert_eq!(leading_zero_bits(&[0x80]), 0);
        assert_eq!(leading_zero_bits(&[0x00, 0x00]), 16);
    }

    #[test]
    fn test_difficulty_fixed_without_autoadjust() {
        let controller = DifficultyController::new(18, false);
        for _ in 0..1000 {
            controller.handshake_started();
        }
        assert_eq!(controller.current(), 18);
    }

    #[test]
    fn test_difficulty_scales_with_load() {
        let controller = DifficultyController::new(18, true);
        assert_eq!(controller.current(), 18);

        for _ in 0..64 {
            controller.handshake_started();
        }
        assert_eq!(controller.current(), 19);

        for _ in 0..64 {
            controller.handshake_started();
        }
        assert_eq!(controller.current(), 20);

        for _ in 0..128 {
            controller.handshake_finished();
        }
        assert_eq!(controller.current(), 18);
    }

    #[test]
    fn test_difficulty_capped() {
        let controller = DifficultyController::new(18, true);
        for _ in 0..100_000 {
            controller.handshake_started();
        }
        assert_eq!(controller.current(), 22);
    }
}
