//! Core types for the TSS protocol

use std::fmt;

use blstrs::{G1Affine, G1Projective, Scalar};
use serde::{Deserialize, Serialize};

use crate::pairing::{PairingPrivateKey, PairingPublicKey, PairingSignature, PUBLIC_KEY_SIZE};
use crate::{Error, Result};

/// Unique identifier for a committee member
pub type ParticipantId = u64;

/// Identifier of one secret share
///
/// Share ids start at 1; the id doubles as the x-coordinate of the share on
/// the sharing polynomial, so 0 is reserved for the secret itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShareId(pub u32);

impl ShareId {
    /// Field image of this id
    pub fn x(&self) -> Scalar {
        Scalar::from(u64::from(self.0))
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "share#{}", self.0)
    }
}

impl From<u32> for ShareId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Shard of the aggregate private key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivateShare {
    /// Share this key belongs to
    pub share_id: ShareId,
    /// Secret value
    pub private_key: PairingPrivateKey,
}

impl PrivateShare {
    /// Create a new private share
    pub fn new(share_id: ShareId, private_key: PairingPrivateKey) -> Self {
        Self {
            share_id,
            private_key,
        }
    }

    /// Public counterpart of this share
    pub fn public_share(&self) -> PublicShare {
        PublicShare::new(self.share_id, self.private_key.public_key())
    }
}

/// Public contribution of a share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicShare {
    /// Share this key belongs to
    pub share_id: ShareId,
    /// Public key of the share
    pub public_key: PairingPublicKey,
}

impl PublicShare {
    /// Create a new public share
    pub fn new(share_id: ShareId, public_key: PairingPublicKey) -> Self {
        Self {
            share_id,
            public_key,
        }
    }
}

/// Partial signature produced with one private share
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareSignature {
    /// Share that produced the signature
    pub share_id: ShareId,
    /// Partial signature
    pub signature: PairingSignature,
}

impl ShareSignature {
    /// Create a new share signature
    pub fn new(share_id: ShareId, signature: PairingSignature) -> Self {
        Self {
            share_id,
            signature,
        }
    }
}

/// Decode a compressed G1 point, rejecting points outside the subgroup
pub(crate) fn g1_from_bytes(bytes: &[u8]) -> Result<G1Projective> {
    let array: [u8; PUBLIC_KEY_SIZE] = bytes.try_into().map_err(|_| {
        Error::Deserialization(format!(
            "Invalid G1 point length: expected {}, got {}",
            PUBLIC_KEY_SIZE,
            bytes.len()
        ))
    })?;
    Option::<G1Affine>::from(G1Affine::from_compressed(&array))
        .map(G1Projective::from)
        .ok_or_else(|| Error::Deserialization("Invalid G1 point".into()))
}

pub(crate) mod scalar_serde {
    use blstrs::Scalar;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(scalar: &Scalar, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(scalar.to_bytes_le()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Scalar, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(serde::de::Error::custom)?;
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("Invalid scalar length"))?;
        Option::<Scalar>::from(Scalar::from_bytes_le(&array))
            .ok_or_else(|| serde::de::Error::custom("Non-canonical scalar"))
    }
}

pub(crate) mod g1_serde {
    use blstrs::G1Projective;
    use elliptic_curve::group::Curve;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(point: &G1Projective, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(point.to_affine().to_compressed()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<G1Projective, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(serde::de::Error::custom)?;
        super::g1_from_bytes(&bytes).map_err(serde::de::Error::custom)
    }
}

pub(crate) mod g2_serde {
    use blstrs::G2Projective;
    use elliptic_curve::group::Curve;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::pairing::PairingSignature;

    pub fn serialize<S>(point: &G2Projective, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(point.to_affine().to_compressed()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<G2Projective, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let bytes = hex::decode(encoded).map_err(serde::de::Error::custom)?;
        PairingSignature::from_bytes(&bytes)
            .map(|signature| *signature.point())
            .map_err(serde::de::Error::custom)
    }
}
