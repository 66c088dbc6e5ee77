//! Chunked ElGamal encryption of field elements
//!
//! A scalar is split into 32 little-endian bytes and every byte `b` is
//! encrypted in the exponent as `b·G + r_j·PK`. Decryption recovers `b·G`
//! and maps it back to `b` through a 256-entry lookup table, the
//! [`ElGamalCache`].
//!
//! One batch of blinding scalars `r_0..r_31` is shared by every recipient of
//! a ciphertext, so the per-recipient cost is one point per chunk.

use std::collections::HashMap;

use blstrs::{G1Projective, Scalar};
use elliptic_curve::{
    ff::Field,
    group::{Curve, Group},
};
use rand_core::{CryptoRng, RngCore};

use super::{PairingPrivateKey, PairingPublicKey, PUBLIC_KEY_SIZE};
use crate::{Error, Result};

/// Number of byte chunks per encrypted scalar
pub const CHUNK_COUNT: usize = 32;

/// Discrete-log table for single byte plaintexts
///
/// Building it costs 256 point additions; share one instance across every
/// decryption.
pub struct ElGamalCache {
    lookup: HashMap<[u8; PUBLIC_KEY_SIZE], u8>,
}

impl ElGamalCache {
    /// Build the table for `0·G .. 255·G`
    pub fn new() -> Self {
        let generator = G1Projective::generator();
        let mut point = G1Projective::identity();
        let mut lookup = HashMap::with_capacity(256);

        for value in 0..=u8::MAX {
            lookup.insert(point.to_affine().to_compressed(), value);
            point += generator;
        }

        Self { lookup }
    }

    fn byte_of(&self, point: &G1Projective) -> Option<u8> {
        self.lookup.get(&point.to_affine().to_compressed()).copied()
    }
}

impl Default for ElGamalCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Multi-recipient ciphertext with shared blinding randomness
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElGamalCiphertext {
    /// `r_j·G` for every chunk
    shared_randomness: Vec<G1Projective>,
    /// Per recipient, `b_j·G + r_j·PK` for every chunk
    recipients: Vec<Vec<G1Projective>>,
}

impl ElGamalCiphertext {
    /// Encrypt one scalar per recipient
    pub fn encrypt<R: RngCore + CryptoRng>(
        rng: &mut R,
        recipients: &[(PairingPublicKey, Scalar)],
    ) -> Self {
        let generator = G1Projective::generator();
        let blinding: Vec<Scalar> = (0..CHUNK_COUNT).map(|_| Scalar::random(&mut *rng)).collect();
        let shared_randomness = blinding.iter().map(|r| generator * r).collect();

        let recipients = recipients
            .iter()
            .map(|(public_key, value)| {
                value
                    .to_bytes_le()
                    .iter()
                    .zip(&blinding)
                    .map(|(byte, r)| {
                        generator * Scalar::from(u64::from(*byte)) + public_key.point() * r
                    })
                    .collect()
            })
            .collect();

        Self {
            shared_randomness,
            recipients,
        }
    }

    /// Decrypt the scalar addressed to recipient `index`
    pub fn decrypt(
        &self,
        index: usize,
        private_key: &PairingPrivateKey,
        cache: &ElGamalCache,
    ) -> Result<Scalar> {
        let chunks = self.recipients.get(index).ok_or_else(|| {
            Error::Crypto(format!(
                "Ciphertext has no entry {} ({} recipients)",
                index,
                self.recipients.len()
            ))
        })?;
        if chunks.len() != CHUNK_COUNT || self.shared_randomness.len() != CHUNK_COUNT {
            return Err(Error::Crypto("Malformed ciphertext chunk layout".into()));
        }

        let mut bytes = [0u8; CHUNK_COUNT];
        for (j, (chunk, randomness)) in chunks.iter().zip(&self.shared_randomness).enumerate() {
            let plain = chunk - randomness * private_key.scalar();
            bytes[j] = cache.byte_of(&plain).ok_or_else(|| {
                Error::Crypto(format!("Chunk {} is not decryptable with this key", j))
            })?;
        }

        Option::<Scalar>::from(Scalar::from_bytes_le(&bytes))
            .ok_or_else(|| Error::Crypto("Decrypted value is not a canonical scalar".into()))
    }

    /// Number of recipients
    pub fn recipient_count(&self) -> usize {
        self.recipients.len()
    }

    /// Every entry carries exactly [`CHUNK_COUNT`] chunks
    pub fn is_well_formed(&self) -> bool {
        self.shared_randomness.len() == CHUNK_COUNT
            && self.recipients.iter().all(|chunks| chunks.len() == CHUNK_COUNT)
    }

    pub(crate) fn from_parts(
        shared_randomness: Vec<G1Projective>,
        recipients: Vec<Vec<G1Projective>>,
    ) -> Self {
        Self {
            shared_randomness,
            recipients,
        }
    }

    pub(crate) fn shared_randomness(&self) -> &[G1Projective] {
        &self.shared_randomness
    }

    pub(crate) fn recipients(&self) -> &[Vec<G1Projective>] {
        &self.recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_encrypt_decrypt_multiple_recipients() {
        let mut rng = ChaCha20Rng::seed_from_u64(11);
        let cache = ElGamalCache::new();
        let keys: Vec<PairingPrivateKey> =
            (0..3).map(|_| PairingPrivateKey::random(&mut rng)).collect();
        let values: Vec<Scalar> = (0..3).map(|_| Scalar::random(&mut rng)).collect();

        let recipients: Vec<_> = keys
            .iter()
            .zip(&values)
            .map(|(key, value)| (key.public_key(), *value))
            .collect();
        let ciphertext = ElGamalCiphertext::encrypt(&mut rng, &recipients);

        assert_eq!(ciphertext.recipient_count(), 3);
        assert!(ciphertext.is_well_formed());
        for (index, key) in keys.iter().enumerate() {
            assert_eq!(ciphertext.decrypt(index, key, &cache).unwrap(), values[index]);
        }
    }

    #[test]
    fn test_wrong_key_cannot_decrypt() {
        let mut rng = ChaCha20Rng::seed_from_u64(12);
        let cache = ElGamalCache::new();
        let owner = PairingPrivateKey::random(&mut rng);
        let intruder = PairingPrivateKey::random(&mut rng);

        let ciphertext =
            ElGamalCiphertext::encrypt(&mut rng, &[(owner.public_key(), Scalar::from(1234u64))]);

        assert!(ciphertext.decrypt(0, &intruder, &cache).is_err());
        assert!(ciphertext.decrypt(1, &owner, &cache).is_err());
    }

    #[test]
    fn test_cache_covers_every_byte() {
        let cache = ElGamalCache::new();
        let point = G1Projective::generator() * Scalar::from(255u64);
        assert_eq!(cache.byte_of(&point), Some(255));
        assert_eq!(cache.byte_of(&G1Projective::identity()), Some(0));
        assert_eq!(cache.byte_of(&(G1Projective::generator() * Scalar::from(256u64))), None);
    }
}
