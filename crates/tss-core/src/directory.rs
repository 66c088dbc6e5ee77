//! Participant directory: the committee a keying round runs for
//!
//! A directory maps every participant to its share count and encryption
//! key, records the local participant and its decryption key, and fixes the
//! threshold. It is built once per keying epoch and never mutated.

use std::collections::BTreeMap;

use tracing::debug;

use crate::claims::{ShareClaim, ShareClaims};
use crate::pairing::{PairingPrivateKey, PairingPublicKey, SignatureSchema};
use crate::types::{ParticipantId, ShareId};
use crate::{Error, Result};

#[derive(Debug, Clone, Copy)]
struct ParticipantEntry {
    share_count: u32,
    public_key: PairingPublicKey,
}

/// Builder for [`ParticipantDirectory`]
///
/// Per-field constraints are checked when a value is set; constraints that
/// span fields are checked by [`ParticipantDirectoryBuilder::build`].
#[derive(Debug, Default)]
pub struct ParticipantDirectoryBuilder {
    self_entry: Option<(ParticipantId, PairingPrivateKey)>,
    participants: BTreeMap<ParticipantId, ParticipantEntry>,
    threshold: Option<usize>,
}

impl ParticipantDirectoryBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the local participant and its decryption key
    pub fn with_self(mut self, id: ParticipantId, private_key: PairingPrivateKey) -> Result<Self> {
        if let Some((existing, _)) = &self.self_entry {
            return Err(Error::InvalidConfig(format!(
                "Current participant was already set to {}",
                existing
            )));
        }
        self.self_entry = Some((id, private_key));
        Ok(self)
    }

    /// Register a participant owning `share_count` shares
    pub fn with_participant(
        mut self,
        id: ParticipantId,
        share_count: u32,
        public_key: PairingPublicKey,
    ) -> Result<Self> {
        if self.participants.contains_key(&id) {
            return Err(Error::InvalidConfig(format!(
                "Participant with id {} was previously added to the directory",
                id
            )));
        }
        if share_count == 0 {
            return Err(Error::InvalidConfig(format!(
                "Invalid number of shares for participant {}: 0",
                id
            )));
        }
        self.participants.insert(
            id,
            ParticipantEntry {
                share_count,
                public_key,
            },
        );
        Ok(self)
    }

    /// Set the number of shares required to recover the secret
    pub fn with_threshold(mut self, threshold: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::InvalidConfig(format!(
                "Invalid threshold: {}",
                threshold
            )));
        }
        self.threshold = Some(threshold);
        Ok(self)
    }

    /// Validate and freeze the directory
    pub fn build(self, schema: SignatureSchema) -> Result<ParticipantDirectory> {
        if self.participants.is_empty() {
            return Err(Error::InvalidConfig(
                "There should be at least one participant in the directory".into(),
            ));
        }

        let total_shares: u64 = self
            .participants
            .values()
            .map(|entry| u64::from(entry.share_count))
            .sum();
        let total_shares = u32::try_from(total_shares).map_err(|_| {
            Error::InvalidConfig(format!("Too many shares: {}", total_shares))
        })?;

        let threshold = self
            .threshold
            .ok_or_else(|| Error::InvalidConfig("Threshold was not set".into()))?;
        if threshold > total_shares as usize {
            return Err(Error::InvalidConfig(format!(
                "Threshold exceeds the number of shares: threshold {}, shares {}",
                threshold, total_shares
            )));
        }

        let (self_id, private_key) = match self.self_entry {
            Some((id, key)) if self.participants.contains_key(&id) => (id, key),
            _ => {
                return Err(Error::InvalidConfig(
                    "The participant list does not contain a reference to the current participant"
                        .into(),
                ))
            }
        };

        let mut claims = Vec::with_capacity(total_shares as usize);
        let mut next_id = 1u32;
        for (participant_id, entry) in &self.participants {
            for _ in 0..entry.share_count {
                claims.push(ShareClaim {
                    share_id: ShareId(next_id),
                    owner: *participant_id,
                    public_key: entry.public_key,
                });
                next_id += 1;
            }
        }
        let share_claims = ShareClaims::new(claims);
        let share_ids = share_claims.claims().iter().map(|c| c.share_id).collect();
        let owned_share_ids = share_claims.owned_by(self_id).collect();

        debug!(
            self_id,
            participants = self.participants.len(),
            total_shares,
            threshold,
            "Participant directory built"
        );

        Ok(ParticipantDirectory {
            schema,
            self_id,
            private_key,
            threshold,
            share_claims,
            share_ids,
            owned_share_ids,
        })
    }
}

/// Immutable description of a committee
#[derive(Debug, Clone)]
pub struct ParticipantDirectory {
    schema: SignatureSchema,
    self_id: ParticipantId,
    private_key: PairingPrivateKey,
    threshold: usize,
    share_claims: ShareClaims,
    share_ids: Vec<ShareId>,
    owned_share_ids: Vec<ShareId>,
}

impl ParticipantDirectory {
    /// Start building a directory
    pub fn builder() -> ParticipantDirectoryBuilder {
        ParticipantDirectoryBuilder::new()
    }

    /// Signature schema of the committee
    pub fn schema(&self) -> &SignatureSchema {
        &self.schema
    }

    /// Minimum number of shares needed to recover the secret
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Every share of the committee, ascending
    pub fn share_ids(&self) -> &[ShareId] {
        &self.share_ids
    }

    /// Total number of shares
    pub fn total_shares(&self) -> usize {
        self.share_ids.len()
    }

    /// Shares owned by the local participant
    pub fn owned_share_ids(&self) -> &[ShareId] {
        &self.owned_share_ids
    }

    /// Ownership claims for every share, in ciphertext order
    pub fn share_claims(&self) -> &ShareClaims {
        &self.share_claims
    }

    /// Encryption key of the owner of `share_id`
    pub fn public_key_for(&self, share_id: ShareId) -> Option<&PairingPublicKey> {
        self.share_claims.get(share_id).map(|claim| &claim.public_key)
    }

    /// Local participant id
    pub fn self_id(&self) -> ParticipantId {
        self.self_id
    }

    /// Decryption key of the local participant
    pub fn private_key(&self) -> &PairingPrivateKey {
        &self.private_key
    }
}

/// Translate roster weights into share counts
///
/// The heaviest participant gets `max_shares_per_participant` shares; the
/// rest get their weight's proportion of that, rounded up. Zero weights map
/// to zero shares.
pub fn allocate_shares(
    weights: &BTreeMap<ParticipantId, u64>,
    max_shares_per_participant: u32,
) -> BTreeMap<ParticipantId, u32> {
    let max_weight = weights.values().copied().max().unwrap_or(0);
    weights
        .iter()
        .map(|(id, weight)| {
            let shares = if max_weight == 0 {
                0
            } else {
                let numerator = u128::from(max_shares_per_participant) * u128::from(*weight);
                numerator.div_ceil(u128::from(max_weight)) as u32
            };
            (*id, shares)
        })
        .collect()
}

/// Threshold used when none is configured: a strict majority of shares
pub fn default_threshold(total_shares: usize) -> usize {
    (total_shares + 2) / 2
}
