//! TSS service: one entry point for keying, rekeying and signing
//!
//! The service owns the signature schema, the caller's randomness source and
//! a shared [`ElGamalCache`]. Everything else it needs comes in through the
//! [`ParticipantDirectory`] of the round at hand.

use std::collections::HashSet;

#[cfg(feature = "multi-thread")]
use rayon::prelude::*;
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, info, instrument, warn};

use crate::directory::ParticipantDirectory;
use crate::keygen::{self, TssMessage};
use crate::lagrange;
use crate::pairing::elgamal::ElGamalCache;
use crate::pairing::{PairingPublicKey, PairingSignature, SignatureSchema};
use crate::sign;
use crate::types::{PrivateShare, PublicShare, ShareId, ShareSignature};
use crate::Result;

/// Facade over the TSS engine
///
/// Only message generation touches the randomness source, and it takes
/// `&mut self`; share the service across threads behind a lock if it must
/// generate from several of them.
pub struct TssService<R> {
    schema: SignatureSchema,
    rng: R,
    cache: ElGamalCache,
}

impl<R: RngCore + CryptoRng> TssService<R> {
    /// Create a service drawing randomness from `rng`
    pub fn new(schema: SignatureSchema, rng: R) -> Self {
        Self {
            schema,
            rng,
            cache: ElGamalCache::new(),
        }
    }

    /// Genesis keying: deal a fresh random secret for every owned share
    #[instrument(skip_all, fields(self_id = directory.self_id()))]
    pub fn generate_genesis_messages(
        &mut self,
        directory: &ParticipantDirectory,
    ) -> Result<Vec<TssMessage>> {
        let messages = directory
            .owned_share_ids()
            .iter()
            .map(|share_id| {
                keygen::generate_genesis_message(
                    &mut self.rng,
                    directory.share_claims(),
                    *share_id,
                    directory.threshold(),
                )
            })
            .collect::<Result<Vec<_>>>()?;

        info!(
            self_id = directory.self_id(),
            messages = messages.len(),
            threshold = directory.threshold(),
            "Genesis TSS messages generated"
        );
        Ok(messages)
    }

    /// Rekeying: re-deal `old_share` to the shares of `directory`
    pub fn generate_rekey_message(
        &mut self,
        directory: &ParticipantDirectory,
        old_share: &PrivateShare,
    ) -> Result<TssMessage> {
        keygen::generate_rekey_message(
            &mut self.rng,
            directory.share_claims(),
            old_share,
            directory.threshold(),
        )
    }
}

impl<R> TssService<R> {
    /// Signature schema of this service
    pub fn schema(&self) -> &SignatureSchema {
        &self.schema
    }

    /// Structural check of a peer's message
    pub fn verify_tss_message(&self, directory: &ParticipantDirectory, message: &TssMessage) -> bool {
        keygen::verify_tss_message(directory, message)
    }

    /// Decode a message received from the network
    pub fn tss_message_from_bytes(&self, bytes: &[u8]) -> Result<TssMessage> {
        TssMessage::from_bytes(bytes)
    }

    /// Decode and verify received messages, keeping the usable ones
    ///
    /// Undecodable or malformed messages are dropped, as is any message whose
    /// issuer already contributed an earlier one.
    pub fn validate_tss_messages<B: AsRef<[u8]>>(
        &self,
        directory: &ParticipantDirectory,
        encoded: &[B],
    ) -> Vec<TssMessage> {
        let mut issuers: HashSet<ShareId> = HashSet::with_capacity(encoded.len());
        let mut valid = Vec::with_capacity(encoded.len());

        for (position, bytes) in encoded.iter().enumerate() {
            let message = match TssMessage::from_bytes(bytes.as_ref()) {
                Ok(message) => message,
                Err(e) => {
                    warn!(position, error = %e, "Discarding undecodable TSS message");
                    continue;
                }
            };
            if !keygen::verify_tss_message(directory, &message) {
                warn!(position, issuer = %message.issuer, "Discarding invalid TSS message");
                continue;
            }
            if !issuers.insert(message.issuer) {
                warn!(position, issuer = %message.issuer, "Discarding repeated TSS message");
                continue;
            }
            valid.push(message);
        }

        debug!(received = encoded.len(), valid = valid.len(), "TSS messages validated");
        valid
    }

    /// Enough messages to recover shares
    pub fn is_threshold_met(&self, directory: &ParticipantDirectory, messages: &[TssMessage]) -> bool {
        messages.len() >= directory.threshold()
    }

    /// Recover the local participant's new private shares
    ///
    /// `Ok(None)` while fewer than threshold messages are available.
    #[instrument(skip_all, fields(self_id = directory.self_id(), messages = messages.len()))]
    pub fn decrypt_private_shares(
        &self,
        directory: &ParticipantDirectory,
        messages: &[TssMessage],
    ) -> Result<Option<Vec<PrivateShare>>> {
        let threshold = directory.threshold();
        if messages.len() < threshold {
            debug!(threshold, "Not enough TSS messages to decrypt private shares");
            return Ok(None);
        }

        let cache = &self.cache;
        let decrypt = |share_id: &ShareId| {
            keygen::decrypt_private_share(
                *share_id,
                directory.private_key(),
                messages,
                cache,
                directory.share_claims(),
                threshold,
            )
        };

        #[cfg(feature = "multi-thread")]
        let shares: Vec<Option<PrivateShare>> = directory
            .owned_share_ids()
            .par_iter()
            .map(decrypt)
            .collect::<Result<_>>()?;
        #[cfg(not(feature = "multi-thread"))]
        let shares: Vec<Option<PrivateShare>> = directory
            .owned_share_ids()
            .iter()
            .map(decrypt)
            .collect::<Result<_>>()?;

        info!(shares = shares.len(), "Private shares decrypted");
        Ok(shares.into_iter().collect())
    }

    /// Derive the public share of every share in the directory
    ///
    /// `Ok(None)` while fewer than threshold messages are available.
    #[instrument(skip_all, fields(messages = messages.len()))]
    pub fn compute_public_shares(
        &self,
        directory: &ParticipantDirectory,
        messages: &[TssMessage],
    ) -> Result<Option<Vec<PublicShare>>> {
        let threshold = directory.threshold();
        if messages.len() < threshold {
            debug!(threshold, "Not enough TSS messages to compute public shares");
            return Ok(None);
        }

        let compute =
            |share_id: &ShareId| keygen::compute_public_share(*share_id, messages, threshold);

        #[cfg(feature = "multi-thread")]
        let shares: Vec<Option<PublicShare>> = directory
            .share_ids()
            .par_iter()
            .map(compute)
            .collect::<Result<_>>()?;
        #[cfg(not(feature = "multi-thread"))]
        let shares: Vec<Option<PublicShare>> = directory
            .share_ids()
            .iter()
            .map(compute)
            .collect::<Result<_>>()?;

        debug!(shares = shares.len(), "Public shares computed");
        Ok(shares.into_iter().collect())
    }

    /// Interpolate public shares into the ledger ID
    pub fn aggregate_public_shares(&self, shares: &[PublicShare]) -> Result<PairingPublicKey> {
        lagrange::aggregate_public_shares(shares)
    }

    /// Ledger ID defined by a set of verified messages
    pub fn ledger_id(
        &self,
        directory: &ParticipantDirectory,
        messages: &[TssMessage],
    ) -> Result<Option<PairingPublicKey>> {
        let Some(public_shares) = self.compute_public_shares(directory, messages)? else {
            return Ok(None);
        };
        let ledger_id = self.aggregate_public_shares(&public_shares)?;
        info!(ledger_id = hex::encode(ledger_id.to_bytes()), "Ledger ID computed");
        Ok(Some(ledger_id))
    }

    /// Sign `message` with one private share
    pub fn sign(&self, private_share: &PrivateShare, message: &[u8]) -> ShareSignature {
        sign::sign_share(&self.schema, private_share, message)
    }

    /// Verify one share signature over `message`
    ///
    /// Uses the service's schema, the one [`TssService::sign`] hashes with.
    pub fn verify_signature(
        &self,
        directory: &ParticipantDirectory,
        public_shares: &[PublicShare],
        share_signature: &ShareSignature,
        message: &[u8],
    ) -> bool {
        sign::verify_share_signature(
            &self.schema,
            directory,
            public_shares,
            share_signature,
            message,
        )
    }

    /// Interpolate share signatures into a signature under the ledger ID
    pub fn aggregate_signatures(&self, partials: &[ShareSignature]) -> Result<PairingSignature> {
        lagrange::aggregate_signatures(partials)
    }
}
