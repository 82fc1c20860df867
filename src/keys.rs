//! Key material and signing primitives.
//!
//! The curve and hash implementations come from `p256`, `k256`, `sha2` and `sha3`; this module
//! only selects between them and fixes the message framing (domain tags) used on the ledger.

use crate::address::remove_hex_prefix;
use p256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use rand::Rng;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use sha3::{Digest, Sha3_256};
use std::{fmt, str::FromStr};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Length in bytes of every domain tag
pub const DOMAIN_TAG_LENGTH: usize = 32;
/// Tag prefixed to transaction payloads and envelopes before hashing
pub const TRANSACTION_DOMAIN_TAG: &str = "GALLEY-V0.0-transaction";
/// Tag prefixed to arbitrary user messages before hashing
pub const USER_DOMAIN_TAG: &str = "GALLEY-V0.0-user";

#[allow(missing_docs)]
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("Unsupported algorithm: {0:?}")]
    UnsupportedAlgorithm(String),
    #[error("Malformed private key: {0}")]
    MalformedPrivateKey(String),
    #[error("Malformed public key: {0}")]
    MalformedPublicKey(String),
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
    #[error("Failed to compute signature: {0}")]
    Signing(String),
    #[error("Could not derive a valid key from seed")]
    Seed,
}

#[allow(missing_docs)]
pub type KeyResult<T> = Result<T, KeyError>;

/// Curve used by an account key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum SignatureAlgorithm {
    #[serde(rename = "ECDSA_P256")]
    EcdsaP256,
    #[serde(rename = "ECDSA_secp256k1")]
    EcdsaSecp256k1,
}

impl SignatureAlgorithm {
    /// Canonical name, as it appears in configuration
    pub fn name(&self) -> &'static str {
        match self {
            SignatureAlgorithm::EcdsaP256 => "ECDSA_P256",
            SignatureAlgorithm::EcdsaSecp256k1 => "ECDSA_secp256k1",
        }
    }
}

impl Default for SignatureAlgorithm {
    fn default() -> Self {
        SignatureAlgorithm::EcdsaP256
    }
}

impl FromStr for SignatureAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ECDSA_P256" => Ok(SignatureAlgorithm::EcdsaP256),
            "ECDSA_secp256k1" => Ok(SignatureAlgorithm::EcdsaSecp256k1),
            other => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Digest applied to a message before it is signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum HashAlgorithm {
    #[serde(rename = "SHA2_256")]
    Sha2_256,
    #[serde(rename = "SHA3_256")]
    Sha3_256,
}

impl HashAlgorithm {
    /// Canonical name, as it appears in configuration
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha2_256 => "SHA2_256",
            HashAlgorithm::Sha3_256 => "SHA3_256",
        }
    }

    /// Hash `message` with this algorithm
    pub fn digest(&self, message: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha2_256 => Sha256::digest(message).to_vec(),
            HashAlgorithm::Sha3_256 => Sha3_256::digest(message).to_vec(),
        }
    }
}

impl Default for HashAlgorithm {
    fn default() -> Self {
        HashAlgorithm::Sha3_256
    }
}

impl FromStr for HashAlgorithm {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHA2_256" => Ok(HashAlgorithm::Sha2_256),
            "SHA3_256" => Ok(HashAlgorithm::Sha3_256),
            other => Err(KeyError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Secret signing key for one of the supported curves
pub enum PrivateKey {
    /// NIST P-256
    P256(p256::ecdsa::SigningKey),
    /// secp256k1
    Secp256k1(k256::ecdsa::SigningKey),
}

impl PrivateKey {
    /// Decode a private key from hex (with or without the `0x` prefix)
    pub fn from_hex(algorithm: SignatureAlgorithm, hex_key: &str) -> KeyResult<Self> {
        let bytes = Secret::new(
            hex::decode(remove_hex_prefix(hex_key.trim()))
                .map_err(|e| KeyError::MalformedPrivateKey(e.to_string()))?,
        );
        Self::from_bytes(algorithm, bytes.expose_secret())
    }

    /// Decode a private key from its raw scalar bytes
    pub fn from_bytes(algorithm: SignatureAlgorithm, bytes: &[u8]) -> KeyResult<Self> {
        let key = match algorithm {
            SignatureAlgorithm::EcdsaP256 => PrivateKey::P256(
                p256::ecdsa::SigningKey::from_slice(bytes)
                    .map_err(|e| KeyError::MalformedPrivateKey(e.to_string()))?,
            ),
            SignatureAlgorithm::EcdsaSecp256k1 => PrivateKey::Secp256k1(
                k256::ecdsa::SigningKey::from_slice(bytes)
                    .map_err(|e| KeyError::MalformedPrivateKey(e.to_string()))?,
            ),
        };
        Ok(key)
    }

    /// Derive a key deterministically from a seed phrase.
    ///
    /// The phrase is hashed with SHA3-256, and rehashed until the digest is a valid scalar for
    /// the curve. The same phrase always yields the same key.
    pub fn from_seed(algorithm: SignatureAlgorithm, seed_phrase: &str) -> KeyResult<Self> {
        let mut candidate = Sha3_256::digest(seed_phrase.as_bytes()).to_vec();
        for _ in 0..16 {
            if let Ok(key) = Self::from_bytes(algorithm, &candidate) {
                return Ok(key);
            }
            candidate = Sha3_256::digest(&candidate).to_vec();
        }
        Err(KeyError::Seed)
    }

    /// Generate a fresh random key
    pub fn generate(algorithm: SignatureAlgorithm) -> KeyResult<Self> {
        for _ in 0..16 {
            let candidate = Secret::new(rand::thread_rng().gen::<[u8; 32]>());
            if let Ok(key) = Self::from_bytes(algorithm, candidate.expose_secret()) {
                return Ok(key);
            }
        }
        Err(KeyError::Seed)
    }

    /// Curve of this key
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PrivateKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PrivateKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    /// Matching public key
    pub fn public_key(&self) -> PublicKey {
        match self {
            PrivateKey::P256(key) => PublicKey::P256(key.verifying_key().clone()),
            PrivateKey::Secp256k1(key) => PublicKey::Secp256k1(key.verifying_key().clone()),
        }
    }

    /// Hex of the raw scalar. Only used when a freshly generated key has to be handed back to
    /// the caller.
    pub fn to_hex(&self) -> Secret<String> {
        let bytes = match self {
            PrivateKey::P256(key) => key.to_bytes().to_vec(),
            PrivateKey::Secp256k1(key) => key.to_bytes().to_vec(),
        };
        Secret::new(hex::encode(bytes))
    }

    /// Sign an already hashed message. Returns the raw `r || s` signature.
    pub fn sign_prehash(&self, digest: &[u8]) -> KeyResult<Vec<u8>> {
        match self {
            PrivateKey::P256(key) => {
                let sig: p256::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| KeyError::Signing(e.to_string()))?;
                Ok(sig.to_bytes().to_vec())
            }
            PrivateKey::Secp256k1(key) => {
                let sig: k256::ecdsa::Signature = key
                    .sign_prehash(digest)
                    .map_err(|e| KeyError::Signing(e.to_string()))?;
                Ok(sig.to_bytes().to_vec())
            }
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, <redacted>)", self.algorithm())
    }
}

/// Public half of an account key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicKey {
    /// NIST P-256
    P256(p256::ecdsa::VerifyingKey),
    /// secp256k1
    Secp256k1(k256::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Decode a 64 byte uncompressed point (no SEC1 tag), hex encoded
    pub fn from_hex(algorithm: SignatureAlgorithm, hex_key: &str) -> KeyResult<Self> {
        let raw = hex::decode(remove_hex_prefix(hex_key.trim()))
            .map_err(|e| KeyError::MalformedPublicKey(e.to_string()))?;
        if raw.len() != 64 {
            return Err(KeyError::MalformedPublicKey(format!(
                "expected 64 bytes, got {}",
                raw.len()
            )));
        }
        let mut sec1 = Vec::with_capacity(65);
        sec1.push(0x04);
        sec1.extend_from_slice(&raw);
        let key = match algorithm {
            SignatureAlgorithm::EcdsaP256 => PublicKey::P256(
                p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|e| KeyError::MalformedPublicKey(e.to_string()))?,
            ),
            SignatureAlgorithm::EcdsaSecp256k1 => PublicKey::Secp256k1(
                k256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                    .map_err(|e| KeyError::MalformedPublicKey(e.to_string()))?,
            ),
        };
        Ok(key)
    }

    /// Curve of this key
    pub fn algorithm(&self) -> SignatureAlgorithm {
        match self {
            PublicKey::P256(_) => SignatureAlgorithm::EcdsaP256,
            PublicKey::Secp256k1(_) => SignatureAlgorithm::EcdsaSecp256k1,
        }
    }

    /// 64 byte uncompressed point without the SEC1 tag, hex encoded
    pub fn to_hex(&self) -> String {
        let point = match self {
            PublicKey::P256(key) => key.to_encoded_point(false).as_bytes().to_vec(),
            PublicKey::Secp256k1(key) => key.to_encoded_point(false).as_bytes().to_vec(),
        };
        hex::encode(&point[1..])
    }

    /// Check a raw `r || s` signature over an already hashed message
    pub fn verify_prehash(&self, digest: &[u8], signature: &[u8]) -> KeyResult<bool> {
        let valid = match self {
            PublicKey::P256(key) => {
                let sig = p256::ecdsa::Signature::from_slice(signature)
                    .map_err(|e| KeyError::MalformedSignature(e.to_string()))?;
                key.verify_prehash(digest, &sig).is_ok()
            }
            PublicKey::Secp256k1(key) => {
                let sig = k256::ecdsa::Signature::from_slice(signature)
                    .map_err(|e| KeyError::MalformedSignature(e.to_string()))?;
                key.verify_prehash(digest, &sig).is_ok()
            }
        };
        Ok(valid)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Something that can produce signatures for a ledger account key
pub trait Signer: Send + Sync {
    /// Sign `message`, framed by `domain_tag`. Implementations hash the framed message
    /// with their declared hash algorithm.
    fn sign(&self, domain_tag: &str, message: &[u8]) -> KeyResult<Vec<u8>>;
}

/// Signer holding the private key in memory
#[derive(Debug)]
pub struct InMemorySigner {
    key: PrivateKey,
    hash_algorithm: HashAlgorithm,
}

impl InMemorySigner {
    /// Constructor for the [`InMemorySigner`] struct
    pub fn new(key: PrivateKey, hash_algorithm: HashAlgorithm) -> Self {
        InMemorySigner {
            key,
            hash_algorithm,
        }
    }

    /// Public key of the held private key
    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }
}

impl Signer for InMemorySigner {
    fn sign(&self, domain_tag: &str, message: &[u8]) -> KeyResult<Vec<u8>> {
        let digest = self.hash_algorithm.digest(&tagged_message(domain_tag, message));
        self.key.sign_prehash(&digest)
    }
}

/// Right-pad `tag` with zeros to [`DOMAIN_TAG_LENGTH`] and append `message`
pub fn tagged_message(tag: &str, message: &[u8]) -> Vec<u8> {
    let mut framed = vec![0u8; DOMAIN_TAG_LENGTH];
    let tag = tag.as_bytes();
    let len = tag.len().min(DOMAIN_TAG_LENGTH);
    framed[..len].copy_from_slice(&tag[..len]);
    framed.extend_from_slice(message);
    framed
}

/// Verify a signature produced by a [`Signer`] for `domain_tag`
pub fn verify(
    public_key: &PublicKey,
    hash_algorithm: HashAlgorithm,
    domain_tag: &str,
    message: &[u8],
    signature: &[u8],
) -> KeyResult<bool> {
    let digest = hash_algorithm.digest(&tagged_message(domain_tag, message));
    public_key.verify_prehash(&digest, signature)
}

/// Sign an arbitrary off-chain message
pub fn sign_user_message<S: Signer + ?Sized>(signer: &S, message: &[u8]) -> KeyResult<Vec<u8>> {
    signer.sign(USER_DOMAIN_TAG, message)
}

/// Check a signature produced by [`sign_user_message`]
pub fn verify_user_signature(
    public_key: &PublicKey,
    hash_algorithm: HashAlgorithm,
    message: &[u8],
    signature: &[u8],
) -> KeyResult<bool> {
    verify(
        public_key,
        hash_algorithm,
        USER_DOMAIN_TAG,
        message,
        signature,
    )
}
