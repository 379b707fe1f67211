//! Constant-time comparison helpers
//!
//! All secret and tag comparisons go through these functions to avoid
//! timing side-channels.

use subtle::ConstantTimeEq;

use crate::error::CryptoError;
use crate::Result;

/// Constant-time equality check for byte slices.
///
/// Length mismatch returns false immediately; lengths are public here.
pub fn ct_eq_bytes(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    bool::from(a.ct_eq(b))
}

/// Constant-time equality with a typed error on mismatch.
pub fn ct_verify_eq(a: &[u8], b: &[u8]) -> Result<()> {
    if !ct_eq_bytes(a, b) {
        return Err(CryptoError::InvalidSignature);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_slices() {
        assert!(ct_eq_bytes(&[1, 2, 3], &[1, 2, 3]));
        assert!(ct_verify_eq(&[1, 2, 3], &[1, 2, 3]).is_ok());
    }

    #[test]
    fn test_unequal_slices() {
        assert!(!ct_eq_bytes(&[1, 2, 3], &[1, 2, 4]));
        assert!(!ct_eq_bytes(&[1, 2, 3], &[1, 2]));
        assert!(ct_verify_eq(&[1, 2, 3], &[3, 2, 1]).is_err());
    }
}
