//! Ed25519 keys and signatures
//! The chain mandates ed25519 for both Cosmos-mode and Ethereum-envelope
//! signing; addresses are derived from the public key hash

use crate::types::Address;
use cryptoxide::ed25519::{self, PUBLIC_KEY_LENGTH, SIGNATURE_LENGTH};
use sha2::{Digest, Sha256};
use std::{convert::TryFrom, fmt};
use thiserror::Error;

/// Ed25519 public key. Can be used to verify a [`Signature`]
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PublicKey(#[serde(with = "serde_bytes_array")] [u8; Self::SIZE]);

/// Ed25519 signature
#[derive(Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Signature(#[serde(with = "serde_bytes_array")] [u8; Self::SIZE]);

/// Error type used when retrieving a [`PublicKey`] or [`Signature`] via the
/// [`TryFrom`] trait
#[derive(Debug, Error)]
pub enum TryFromKeyError {
    #[error("Invalid size, expecting {expected}")]
    InvalidSize { expected: usize },
}

impl PublicKey {
    pub const SIZE: usize = PUBLIC_KEY_LENGTH;

    /// Verify a signature over `message` against this key
    #[inline]
    pub fn verify<T: AsRef<[u8]>>(&self, message: T, signature: &Signature) -> bool {
        ed25519::verify(message.as_ref(), &self.0, &signature.0)
    }

    /// Derive the account address: trailing 20 bytes of SHA-256 of the key
    pub fn address(&self) -> Address {
        let digest = Sha256::digest(self.0);
        digest[digest.len() - 20..].to_vec()
    }

    /// Gas charged per signature verified with this algorithm
    pub const VERIFY_GAS_COST: u64 = 590;
}

impl Signature {
    pub const SIZE: usize = SIGNATURE_LENGTH;
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey<Ed25519>").field(&hex::encode(self.0)).finish()
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature<Ed25519>").field(&hex::encode(self.0)).finish()
    }
}

impl AsRef<[u8]> for PublicKey {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl From<[u8; PublicKey::SIZE]> for PublicKey {
    fn from(bytes: [u8; PublicKey::SIZE]) -> Self {
        Self(bytes)
    }
}

impl From<[u8; Signature::SIZE]> for Signature {
    fn from(bytes: [u8; Signature::SIZE]) -> Self {
        Self(bytes)
    }
}

impl<'a> TryFrom<&'a [u8]> for PublicKey {
    type Error = TryFromKeyError;
    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] =
            value.try_into().map_err(|_| TryFromKeyError::InvalidSize { expected: Self::SIZE })?;
        Ok(Self(bytes))
    }
}

impl<'a> TryFrom<&'a [u8]> for Signature {
    type Error = TryFromKeyError;
    fn try_from(value: &'a [u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; Self::SIZE] =
            value.try_into().map_err(|_| TryFromKeyError::InvalidSize { expected: Self::SIZE })?;
        Ok(Self(bytes))
    }
}

/// Serde support for fixed-size byte arrays as sequences
mod serde_bytes_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer, const N: usize>(
        bytes: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        hex::encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        let v = hex::decode(&s).map_err(serde::de::Error::custom)?;
        v.try_into().map_err(|_| serde::de::Error::custom("wrong length"))
    }
}

/// Build a keypair from a 32-byte seed; returns (secret, public)
/// Used by signing helpers and tests
pub fn keypair_from_seed(seed: &[u8; 32]) -> ([u8; 64], PublicKey) {
    let (secret, public) = ed25519::keypair(seed);
    (secret, PublicKey(public))
}

/// Sign a message with an expanded secret key
pub fn sign(secret: &[u8; 64], message: &[u8]) -> Signature {
    Signature(ed25519::signature(message, secret))
}
