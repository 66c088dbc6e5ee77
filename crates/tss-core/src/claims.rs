//! Share claims: which participant owns which share

use std::collections::HashMap;

use crate::pairing::PairingPublicKey;
use crate::types::{ParticipantId, ShareId};

/// Ownership claim over one share
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShareClaim {
    /// Claimed share
    pub share_id: ShareId,
    /// Participant that owns the share
    pub owner: ParticipantId,
    /// Encryption key of the owner
    pub public_key: PairingPublicKey,
}

/// Ordered list of share claims
///
/// The order is the ciphertext order of every TSS message built from these
/// claims: the entry for a share sits at [`ShareClaims::index_of`].
#[derive(Debug, Clone)]
pub struct ShareClaims {
    claims: Vec<ShareClaim>,
    index: HashMap<ShareId, usize>,
}

impl ShareClaims {
    /// Create claims from an ordered list
    ///
    /// When a share id is claimed twice, the first claim wins the index.
    pub fn new(claims: Vec<ShareClaim>) -> Self {
        let mut index = HashMap::with_capacity(claims.len());
        for (position, claim) in claims.iter().enumerate() {
            index.entry(claim.share_id).or_insert(position);
        }
        Self { claims, index }
    }

    /// All claims in ciphertext order
    pub fn claims(&self) -> &[ShareClaim] {
        &self.claims
    }

    /// Position of `share_id` in the claim list
    pub fn index_of(&self, share_id: ShareId) -> Option<usize> {
        self.index.get(&share_id).copied()
    }

    /// Claim for `share_id`
    pub fn get(&self, share_id: ShareId) -> Option<&ShareClaim> {
        self.index_of(share_id).map(|position| &self.claims[position])
    }

    /// Number of claims
    pub fn len(&self) -> usize {
        self.claims.len()
    }

    /// True when nothing is claimed
    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    /// Share ids owned by `owner`
    pub fn owned_by(&self, owner: ParticipantId) -> impl Iterator<Item = ShareId> + '_ {
        self.claims
            .iter()
            .filter(move |claim| claim.owner == owner)
            .map(|claim| claim.share_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::PairingPrivateKey;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn claims() -> ShareClaims {
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let key = PairingPrivateKey::random(&mut rng).public_key();
        ShareClaims::new(vec![
            ShareClaim { share_id: ShareId(1), owner: 10, public_key: key },
            ShareClaim { share_id: ShareId(2), owner: 10, public_key: key },
            ShareClaim { share_id: ShareId(3), owner: 20, public_key: key },
        ])
    }

    #[test]
    fn test_index_lookup() {
        let claims = claims();
        assert_eq!(claims.len(), 3);
        assert_eq!(claims.index_of(ShareId(3)), Some(2));
        assert_eq!(claims.index_of(ShareId(4)), None);
        assert_eq!(claims.get(ShareId(2)).map(|c| c.owner), Some(10));
    }

    #[test]
    fn test_owned_by() {
        let claims = claims();
        let owned: Vec<_> = claims.owned_by(10).collect();
        assert_eq!(owned, vec![ShareId(1), ShareId(2)]);
        assert_eq!(claims.owned_by(30).count(), 0);
    }
}
