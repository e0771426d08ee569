//! In-process secp256k1 signer.

use std::fmt;

use secp256k1::ecdsa::{RecoverableSignature as EcdsaRecoverable, RecoveryId};
use secp256k1::{All, Message, PublicKey, Secp256k1, SecretKey};

use super::{CryptoError, MessageSigner, RecoverableSignature, SIGNATURE_LEN, eip191_hash};
use crate::types::Address;

/// Signer holding a secp256k1 private key in memory.
///
/// Signatures are deterministic (RFC 6979), so signing the same message
/// twice with the same key yields identical bytes.
pub struct LocalSigner {
    secp: Secp256k1<All>,
    secret: SecretKey,
    address: Address,
}

impl LocalSigner {
    /// Parses a hex-encoded 32-byte private key, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self, CryptoError> {
        let trimmed = private_key.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes =
            hex::decode(body).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Builds a signer from raw private key bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let secp = Secp256k1::new();
        let public = PublicKey::from_secret_key(&secp, &secret);
        Ok(Self {
            address: address_of(&public),
            secp,
            secret,
        })
    }
}

impl fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Never print key material.
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl MessageSigner for LocalSigner {
    fn address(&self) -> Address {
        self.address
    }

    fn sign_message(&self, message: &[u8]) -> Result<RecoverableSignature, CryptoError> {
        let digest = eip191_hash(message);
        let msg = Message::from_digest(digest.0);
        let sig = self.secp.sign_ecdsa_recoverable(&msg, &self.secret);
        let (rec_id, compact) = sig.serialize_compact();

        let mut out = [0u8; SIGNATURE_LEN];
        out[..64].copy_from_slice(&compact);
        out[64] = 27 + rec_id.to_i32() as u8;
        Ok(RecoverableSignature(out))
    }
}

/// Recovers the address that produced `signature` over `message`.
///
/// `message` is the same payload that was handed to
/// [`MessageSigner::sign_message`]; the EIP-191 prefix is applied here.
pub fn recover_signer(
    message: &[u8],
    signature: &RecoverableSignature,
) -> Result<Address, CryptoError> {
    let v = signature.v();
    let rec_id = match v {
        27 | 28 => i32::from(v - 27),
        0 | 1 => i32::from(v),
        other => {
            return Err(CryptoError::InvalidSignature(format!(
                "unsupported v byte {other}"
            )));
        }
    };
    let rec_id =
        RecoveryId::from_i32(rec_id).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    let sig = EcdsaRecoverable::from_compact(&signature.0[..64], rec_id)
        .map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;

    let digest = eip191_hash(message);
    let msg = Message::from_digest(digest.0);
    let public = Secp256k1::verification_only()
        .recover_ecdsa(&msg, &sig)
        .map_err(|e| CryptoError::Recovery(e.to_string()))?;

    Ok(address_of(&public))
}

fn address_of(public: &PublicKey) -> Address {
    let uncompressed = public.serialize_uncompressed();
    Address::from_public_key_body(&uncompressed[1..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Hash256;

    // Well-known test key from the web3.js documentation.
    const TEST_KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const TEST_ADDRESS: &str = "0x2c7536E3605D9C16a7a3D7b1898e529396a65c23";

    #[test]
    fn derives_checksummed_address_from_key() {
        let signer = LocalSigner::from_hex(TEST_KEY).expect("valid key");
        assert_eq!(signer.address().to_string(), TEST_ADDRESS);
    }

    #[test]
    fn accepts_key_without_prefix() {
        let signer = LocalSigner::from_hex(TEST_KEY.trim_start_matches("0x")).unwrap();
        assert_eq!(signer.address().to_string(), TEST_ADDRESS);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(matches!(
            LocalSigner::from_hex("0xnot-hex"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(matches!(
            LocalSigner::from_hex("0x1234"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        // Zero is not a valid secp256k1 scalar.
        assert!(matches!(
            LocalSigner::from_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn signature_recovers_to_signer_address() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let hash = Hash256::compute(b"neural state payload");

        let sig = signer.sign_message(hash.as_bytes()).unwrap();
        assert!(sig.v() == 27 || sig.v() == 28);

        let recovered = recover_signer(hash.as_bytes(), &sig).unwrap();
        assert_eq!(recovered, signer.address());
    }

    #[test]
    fn signing_is_deterministic() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let a = signer.sign_message(b"same message").unwrap();
        let b = signer.sign_message(b"same message").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn recovery_with_other_message_yields_other_address() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let sig = signer.sign_message(b"original").unwrap();
        match recover_signer(b"tampered", &sig) {
            Ok(addr) => assert_ne!(addr, signer.address()),
            Err(CryptoError::Recovery(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn debug_output_hides_key() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let dbg = format!("{signer:?}");
        assert!(!dbg.contains("4c0883a6"), "{dbg}");
        assert!(dbg.contains("LocalSigner"));
    }
}
