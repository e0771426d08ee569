//! Core domain types used by the client.
//!
//! This module defines strongly-typed hashes, account addresses, tensors
//! and the neural-state payloads exchanged with the consensus service. The
//! goal is to avoid "naked" byte buffers and loosely-typed JSON in public
//! APIs and instead use domain-specific newtypes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Neural state and the remote snapshots returned by the query endpoints.
pub mod state;
/// Dense numeric tensors carried inside a neural state.
pub mod tensor;

pub use state::{ConsensusMetrics, NeuralState, NodeMetrics, ReputationResponse};
pub use tensor::{Tensor, TensorError};

/// Length in bytes of all 256-bit hash types used in this module.
pub const HASH_LEN: usize = 32;

/// Length in bytes of an account address.
pub const ADDRESS_LEN: usize = 20;

/// Strongly-typed 256-bit hash wrapper (Keccak-256).
///
/// This is the pre-standard Keccak-256 (as used by Ethereum-style verifiers),
/// not the NIST-standardised SHA3-256. The two differ in padding and
/// produce different digests for the same input.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    /// Computes a new [`Hash256`] as the Keccak-256 hash of `data`.
    pub fn compute(data: &[u8]) -> Self {
        Hash256(Keccak256::digest(data).into())
    }

    /// Returns the underlying 32-byte hash as a borrowed array.
    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Lower-case hex encoding without a `0x` prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Account address derived from a secp256k1 public key.
///
/// The address is the last 20 bytes of the Keccak-256 hash of the
/// uncompressed public key (without its `0x04` prefix byte). It is
/// displayed in the EIP-55 mixed-case checksum form, e.g.
/// `0x2c7536E3605D9C16a7a3D7b1898e529396a65c23`.
#[derive(Clone, Copy, Eq, PartialEq, Hash)]
pub struct Address(pub [u8; ADDRESS_LEN]);

impl Address {
    /// Derives an address from the 64-byte uncompressed public key body
    /// (`x || y`, i.e. without the SEC1 `0x04` tag).
    pub fn from_public_key_body(pk_body: &[u8]) -> Self {
        let hash = Hash256::compute(pk_body);
        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&hash.0[HASH_LEN - ADDRESS_LEN..]);
        Address(out)
    }

    /// Returns the raw address bytes.
    pub fn as_bytes(&self) -> &[u8; ADDRESS_LEN] {
        &self.0
    }

    /// EIP-55 checksum encoding, `0x`-prefixed.
    pub fn to_checksum(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = Hash256::compute(lower.as_bytes());

        let mut out = String::with_capacity(2 + lower.len());
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash.0[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum())
    }
}

/// Error returned when parsing an [`Address`] from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAddressError(pub String);

impl fmt::Display for ParseAddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid address: {}", self.0)
    }
}

impl std::error::Error for ParseAddressError {}

impl FromStr for Address {
    type Err = ParseAddressError;

    /// Parses a 20-byte hex address, with or without `0x`. Checksum casing
    /// is accepted but not enforced.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let body = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        let bytes = hex::decode(body).map_err(|e| ParseAddressError(format!("{s:?}: {e}")))?;
        if bytes.len() != ADDRESS_LEN {
            return Err(ParseAddressError(format!(
                "{s:?}: expected {ADDRESS_LEN} bytes, got {}",
                bytes.len()
            )));
        }

        let mut out = [0u8; ADDRESS_LEN];
        out.copy_from_slice(&bytes);
        Ok(Address(out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak_of_empty_input_matches_reference() {
        assert_eq!(
            Hash256::compute(b"").to_hex(),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn address_checksum_matches_eip55_vectors() {
        // Reference vectors from EIP-55.
        for expected in [
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed",
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let addr: Address = expected.parse().expect("vector should parse");
            assert_eq!(addr.to_checksum(), expected);
        }
    }

    #[test]
    fn address_parse_rejects_wrong_length() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(err.to_string().contains("expected 20 bytes"), "{err}");
    }

    #[test]
    fn address_parse_accepts_missing_prefix() {
        let a: Address = "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        let b: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        assert_eq!(a, b);
    }
}
