//! Key refresh (rekeying)
//!
//! Rekeying deals the *existing* private share instead of a fresh secret.
//! Every new share is then a Lagrange combination of the old shares, so the
//! interpolated value at zero, and with it the ledger ID, is unchanged.

use rand_core::{CryptoRng, RngCore};
use tracing::{info, instrument};

use super::dkg::generate_tss_message;
use super::messages::TssMessage;
use crate::claims::ShareClaims;
use crate::types::PrivateShare;
use crate::Result;

/// Re-deal `old_share` to the shares of `share_claims`
#[instrument(skip_all, fields(share = %old_share.share_id))]
pub fn generate_rekey_message<R: RngCore + CryptoRng>(
    rng: &mut R,
    share_claims: &ShareClaims,
    old_share: &PrivateShare,
    threshold: usize,
) -> Result<TssMessage> {
    let message = generate_tss_message(rng, share_claims, old_share, threshold)?;

    info!(recipients = share_claims.len(), "Key refresh message generated");

    Ok(message)
}
