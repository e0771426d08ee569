//! Hashing and signing adapter.
//!
//! The consensus service verifies proposals the way an Ethereum wallet
//! verifies `personal_sign` messages, so this module pins that convention:
//!
//! - digests are Keccak-256 ([`Hash256::compute`]);
//! - a message `m` is signed as
//!   `keccak256("\x19Ethereum Signed Message:\n" || len(m) || m)` (EIP-191,
//!   version `0x45`), where `len(m)` is the decimal byte length;
//! - signatures are 65 bytes `r || s || v` with `v = 27 + recovery_id`,
//!   hex-encoded without a `0x` prefix.
//!
//! Failures (malformed keys, malformed signatures) are returned to the
//! caller as [`CryptoError`]; nothing here retries.

use std::fmt;

use crate::types::{Address, Hash256};

pub mod local;

pub use local::{LocalSigner, recover_signer};

/// Prefix of EIP-191 "personal message" hashing.
pub const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Length in bytes of a serialized recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// Errors raised by the crypto adapter.
#[derive(Debug)]
pub enum CryptoError {
    /// Private key material is not 32 valid hex-encoded bytes or is out of
    /// range for the curve.
    InvalidPrivateKey(String),
    /// Signature bytes are malformed (length, hex, `v` byte).
    InvalidSignature(String),
    /// Public key recovery failed.
    Recovery(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::InvalidPrivateKey(msg) => write!(f, "invalid private key: {msg}"),
            CryptoError::InvalidSignature(msg) => write!(f, "invalid signature: {msg}"),
            CryptoError::Recovery(msg) => write!(f, "signature recovery failed: {msg}"),
        }
    }
}

impl std::error::Error for CryptoError {}

/// Signing capability used by the consensus loop and the query facade.
///
/// Implementations must apply the EIP-191 prefixing described in the
/// module docs so that the remote verifier can recover [`Self::address`].
pub trait MessageSigner: Send + Sync {
    /// Address whose key produces the signatures.
    fn address(&self) -> Address;

    /// Signs `message` (typically a 32-byte state hash).
    fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, CryptoError>;
}

/// EIP-191 personal-message digest of `message`.
pub fn eip191_hash(message: &[u8]) -> Hash256 {
    let mut buf = Vec::with_capacity(EIP191_PREFIX.len() + 20 + message.len());
    buf.extend_from_slice(EIP191_PREFIX.as_bytes());
    buf.extend_from_slice(message.len().to_string().as_bytes());
    buf.extend_from_slice(message);
    Hash256::compute(&buf)
}

/// 65-byte `r || s || v` signature.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct RecoverableSignature(pub [u8; SIGNATURE_LEN]);

impl RecoverableSignature {
    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    /// The `v` byte (27 or 28).
    pub fn v(&self) -> u8 {
        self.0[SIGNATURE_LEN - 1]
    }

    /// Lower-case hex without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a hex signature, with or without `0x`.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let body = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(body).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
        if bytes.len() != SIGNATURE_LEN {
            return Err(CryptoError::InvalidSignature(format!(
                "expected {SIGNATURE_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; SIGNATURE_LEN];
        out.copy_from_slice(&bytes);
        Ok(RecoverableSignature(out))
    }
}

impl fmt::Debug for RecoverableSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecoverableSignature({})", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eip191_hash_matches_reference_vector() {
        // web3.js `accounts.hashMessage("Some data")`.
        assert_eq!(
            eip191_hash(b"Some data").to_hex(),
            "1da44b586eb0729ff70a73c326926f6ed5a25f5b056e7f47fbc6e58d86871655"
        );
    }

    #[test]
    fn eip191_hash_encodes_length_in_decimal() {
        let msg = [0xAB; 32];
        let mut manual = b"\x19Ethereum Signed Message:\n32".to_vec();
        manual.extend_from_slice(&msg);
        assert_eq!(eip191_hash(&msg), Hash256::compute(&manual));
    }

    #[test]
    fn signature_hex_parsing_checks_length() {
        let err = RecoverableSignature::from_hex("0xdead").unwrap_err();
        assert!(matches!(err, CryptoError::InvalidSignature(_)));

        let sig = RecoverableSignature([7u8; SIGNATURE_LEN]);
        let parsed = RecoverableSignature::from_hex(&format!("0x{}", sig.to_hex())).unwrap();
        assert_eq!(parsed, sig);
    }
}
