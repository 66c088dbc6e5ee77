//! TSS message types and their wire encoding

use blstrs::{G1Projective, Scalar};
use elliptic_curve::group::{Curve, Group};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha384};

use crate::pairing::elgamal::{ElGamalCiphertext, CHUNK_COUNT};
use crate::types::{g1_from_bytes, ShareId};
use crate::{Error, Result};

/// Wire format version written by [`TssMessage::to_bytes`]
pub const MESSAGE_VERSION: u8 = 1;

/// Largest encoded message accepted by [`TssMessage::from_bytes`]
pub const MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Feldman commitment to the coefficients of a sharing polynomial
///
/// Entry `k` is `a_k·G`, which lets anyone compute `P(x)·G` without
/// learning `P`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeldmanCommitment {
    coefficients: Vec<G1Projective>,
}

impl FeldmanCommitment {
    /// Wrap committed coefficients, constant term first
    pub fn new(coefficients: Vec<G1Projective>) -> Self {
        Self { coefficients }
    }

    /// Committed coefficients, constant term first
    pub fn coefficients(&self) -> &[G1Projective] {
        &self.coefficients
    }

    /// Number of committed coefficients (the polynomial degree plus one)
    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    /// True for an empty commitment
    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// `P(x)·G`
    pub fn evaluate(&self, x: &Scalar) -> G1Projective {
        self.coefficients
            .iter()
            .rev()
            .fold(G1Projective::identity(), |acc, coefficient| acc * x + coefficient)
    }
}

/// Broadcast artifact of one keying contribution
///
/// Carries the encrypted evaluation of the issuer's polynomial for every
/// share of the target directory, plus the public commitment to that
/// polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TssMessage {
    /// Share whose secret was dealt
    pub issuer: ShareId,
    /// Commitment to the dealt polynomial
    pub commitment: FeldmanCommitment,
    /// One encrypted evaluation per destination share
    pub ciphertext: ElGamalCiphertext,
}

impl TssMessage {
    /// Encode to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let wire = WireMessage {
            version: MESSAGE_VERSION,
            issuer: self.issuer.0,
            commitment: compress_all(self.commitment.coefficients()),
            shared_randomness: compress_all(self.ciphertext.shared_randomness()),
            recipients: self
                .ciphertext
                .recipients()
                .iter()
                .map(|chunks| compress_all(chunks))
                .collect(),
        };
        bincode::serde::encode_to_vec(&wire, wire_config())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Decode from bytes
    ///
    /// Rejects unknown versions, trailing bytes, ciphertexts without exactly
    /// [`CHUNK_COUNT`] chunks per entry and points outside the subgroup.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() > MAX_MESSAGE_SIZE {
            return Err(Error::Deserialization(format!(
                "TSS message of {} bytes exceeds the {} byte limit",
                bytes.len(),
                MAX_MESSAGE_SIZE
            )));
        }
        let (wire, read): (WireMessage, usize) =
            bincode::serde::decode_from_slice(bytes, wire_config())
                .map_err(|e| Error::Deserialization(e.to_string()))?;
        if read != bytes.len() {
            return Err(Error::Deserialization(format!(
                "{} trailing bytes after TSS message",
                bytes.len() - read
            )));
        }
        if wire.version != MESSAGE_VERSION {
            return Err(Error::Deserialization(format!(
                "Unsupported TSS message version: {}",
                wire.version
            )));
        }
        if wire.shared_randomness.len() != CHUNK_COUNT {
            return Err(Error::Deserialization(format!(
                "Expected {} randomness chunks, got {}",
                CHUNK_COUNT,
                wire.shared_randomness.len()
            )));
        }
        if let Some(chunks) = wire.recipients.iter().find(|c| c.len() != CHUNK_COUNT) {
            return Err(Error::Deserialization(format!(
                "Expected {} chunks per recipient, got {}",
                CHUNK_COUNT,
                chunks.len()
            )));
        }

        let recipients = wire
            .recipients
            .iter()
            .map(|chunks| decompress_all(chunks))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            issuer: ShareId(wire.issuer),
            commitment: FeldmanCommitment::new(decompress_all(&wire.commitment)?),
            ciphertext: ElGamalCiphertext::from_parts(
                decompress_all(&wire.shared_randomness)?,
                recipients,
            ),
        })
    }

    /// SHA-384 digest of the encoded message
    pub fn hash(&self) -> Result<[u8; 48]> {
        let mut digest = [0u8; 48];
        digest.copy_from_slice(&Sha384::digest(self.to_bytes()?));
        Ok(digest)
    }
}

impl Serialize for TssMessage {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let bytes = self.to_bytes().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&hex::encode(bytes))
    }
}

impl<'de> Deserialize<'de> for TssMessage {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(serde::de::Error::custom)?;
        TssMessage::from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

/// Wire layout of a [`TssMessage`], points in compressed form
#[derive(Serialize, Deserialize)]
struct WireMessage {
    version: u8,
    issuer: u32,
    commitment: Vec<Vec<u8>>,
    shared_randomness: Vec<Vec<u8>>,
    recipients: Vec<Vec<Vec<u8>>>,
}

fn wire_config() -> impl bincode::config::Config {
    bincode::config::standard().with_limit::<MAX_MESSAGE_SIZE>()
}

fn compress_all(points: &[G1Projective]) -> Vec<Vec<u8>> {
    points
        .iter()
        .map(|point| point.to_affine().to_compressed().to_vec())
        .collect()
}

fn decompress_all(points: &[Vec<u8>]) -> Result<Vec<G1Projective>> {
    points.iter().map(|bytes| g1_from_bytes(bytes)).collect()
}
