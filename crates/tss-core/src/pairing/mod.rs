//! Pairing-based keys and signatures over BLS12-381
//!
//! Public keys live in G1 and signatures in G2, so a signature check is
//! `e(G1, sig) == e(pk, H(m))`. The same key pair doubles as the ElGamal
//! key used to deliver share evaluations (see [`elgamal`]).

pub mod elgamal;

use std::fmt;

use blstrs::{pairing, G1Projective, G2Affine, G2Projective, Scalar};
use elliptic_curve::{
    ff::Field,
    group::{Curve, Group},
};
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::{Error, Result};

/// Compressed G1 point size
pub const PUBLIC_KEY_SIZE: usize = 48;

/// Compressed G2 point size
pub const SIGNATURE_SIZE: usize = 96;

/// Scalar size (little-endian)
pub const PRIVATE_KEY_SIZE: usize = 32;

/// Signature scheme parameters shared by every party of a committee
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureSchema {
    dst: &'static [u8],
}

impl SignatureSchema {
    /// Domain separation tag of the basic BLS scheme with G2 signatures
    pub const DEFAULT_DST: &'static [u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_NUL_";

    /// Create a schema with a custom hash-to-curve domain separation tag
    pub const fn new(dst: &'static [u8]) -> Self {
        Self { dst }
    }

    /// Hash-to-curve domain separation tag
    pub fn dst(&self) -> &'static [u8] {
        self.dst
    }

    fn hash_to_g2(&self, message: &[u8]) -> G2Projective {
        G2Projective::hash_to_curve(message, self.dst, &[])
    }
}

impl Default for SignatureSchema {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DST)
    }
}

/// Secret scalar of a pairing key pair
#[derive(Clone, Serialize, Deserialize)]
pub struct PairingPrivateKey(#[serde(with = "crate::types::scalar_serde")] Scalar);

impl PairingPrivateKey {
    /// Generate a new random private key
    pub fn random<R: RngCore + CryptoRng>(rng: &mut R) -> Self {
        Self(Scalar::random(rng))
    }

    /// Wrap an existing scalar
    pub fn from_scalar(scalar: Scalar) -> Self {
        Self(scalar)
    }

    /// Inner scalar
    pub fn scalar(&self) -> &Scalar {
        &self.0
    }

    /// Get the corresponding public key
    pub fn public_key(&self) -> PairingPublicKey {
        PairingPublicKey(G1Projective::generator() * self.0)
    }

    /// Sign a message
    pub fn sign(&self, schema: &SignatureSchema, message: &[u8]) -> PairingSignature {
        PairingSignature(schema.hash_to_g2(message) * self.0)
    }

    /// Export to bytes (little-endian)
    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_SIZE] {
        self.0.to_bytes_le()
    }

    /// Create from raw bytes (32 bytes, little-endian, canonical)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; PRIVATE_KEY_SIZE] = bytes.try_into().map_err(|_| {
            Error::Deserialization(format!(
                "Invalid private key length: expected {}, got {}",
                PRIVATE_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Option::<Scalar>::from(Scalar::from_bytes_le(&array))
            .map(Self)
            .ok_or_else(|| Error::Deserialization("Non-canonical private key scalar".into()))
    }
}

impl Zeroize for PairingPrivateKey {
    fn zeroize(&mut self) {
        self.0 = Scalar::ZERO;
    }
}

impl Drop for PairingPrivateKey {
    fn drop(&mut self) {
        self.zeroize();
    }
}

impl fmt::Debug for PairingPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PairingPrivateKey(..)")
    }
}

/// Public key in G1
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingPublicKey(#[serde(with = "crate::types::g1_serde")] G1Projective);

impl PairingPublicKey {
    /// Wrap an existing G1 element
    pub fn from_point(point: G1Projective) -> Self {
        Self(point)
    }

    /// Inner group element
    pub fn point(&self) -> &G1Projective {
        &self.0
    }

    /// Verify `signature` over `message`
    pub fn verify(
        &self,
        schema: &SignatureSchema,
        message: &[u8],
        signature: &PairingSignature,
    ) -> bool {
        let hashed = schema.hash_to_g2(message).to_affine();
        pairing(&G1Projective::generator().to_affine(), &signature.0.to_affine())
            == pairing(&self.0.to_affine(), &hashed)
    }

    /// Export to compressed bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_affine().to_compressed()
    }

    /// Create from compressed bytes (48 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        crate::types::g1_from_bytes(bytes).map(Self)
    }
}

impl fmt::Debug for PairingPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingPublicKey({})", hex::encode(self.to_bytes()))
    }
}

/// Signature in G2
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingSignature(#[serde(with = "crate::types::g2_serde")] G2Projective);

impl PairingSignature {
    /// Wrap an existing G2 element
    pub fn from_point(point: G2Projective) -> Self {
        Self(point)
    }

    /// Inner group element
    pub fn point(&self) -> &G2Projective {
        &self.0
    }

    /// Verify this signature against `public_key`
    pub fn verify(
        &self,
        schema: &SignatureSchema,
        public_key: &PairingPublicKey,
        message: &[u8],
    ) -> bool {
        public_key.verify(schema, message, self)
    }

    /// Export to compressed bytes
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0.to_affine().to_compressed()
    }

    /// Create from compressed bytes (96 bytes)
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let array: [u8; SIGNATURE_SIZE] = bytes.try_into().map_err(|_| {
            Error::Deserialization(format!(
                "Invalid signature length: expected {}, got {}",
                SIGNATURE_SIZE,
                bytes.len()
            ))
        })?;
        Option::<G2Affine>::from(G2Affine::from_compressed(&array))
            .map(|affine| Self(G2Projective::from(affine)))
            .ok_or_else(|| Error::Deserialization("Invalid signature point".into()))
    }
}

impl fmt::Debug for PairingSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PairingSignature({})", hex::encode(self.to_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_sign_and_verify() {
        let mut rng = ChaCha20Rng::seed_from_u64(7);
        let schema = SignatureSchema::default();
        let sk = PairingPrivateKey::random(&mut rng);
        let pk = sk.public_key();

        let sig = sk.sign(&schema, b"hello");
        assert!(pk.verify(&schema, b"hello", &sig));
        assert!(!pk.verify(&schema, b"goodbye", &sig));

        let other = PairingPrivateKey::random(&mut rng).public_key();
        assert!(!sig.verify(&schema, &other, b"hello"));
    }

    #[test]
    fn test_schema_dst_separates_signatures() {
        let mut rng = ChaCha20Rng::seed_from_u64(8);
        let sk = PairingPrivateKey::random(&mut rng);
        let custom = SignatureSchema::new(b"LEDGER_TSS_TEST_DST");

        let sig = sk.sign(&custom, b"msg");
        assert!(sk.public_key().verify(&custom, b"msg", &sig));
        assert!(!sk.public_key().verify(&SignatureSchema::default(), b"msg", &sig));
    }

    #[test]
    fn test_key_bytes() {
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let sk = PairingPrivateKey::random(&mut rng);
        let restored = PairingPrivateKey::from_bytes(&sk.to_bytes()).unwrap();
        assert_eq!(restored.public_key(), sk.public_key());

        let pk = sk.public_key();
        assert_eq!(PairingPublicKey::from_bytes(&pk.to_bytes()).unwrap(), pk);
        assert!(PairingPublicKey::from_bytes(&[0u8; 12]).is_err());
        assert!(PairingSignature::from_bytes(&[0xffu8; SIGNATURE_SIZE]).is_err());
    }

    #[test]
    fn test_private_key_debug_is_redacted() {
        let mut rng = ChaCha20Rng::seed_from_u64(10);
        let sk = PairingPrivateKey::random(&mut rng);
        assert_eq!(format!("{:?}", sk), "PairingPrivateKey(..)");
    }
}
