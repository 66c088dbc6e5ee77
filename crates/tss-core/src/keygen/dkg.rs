//! Share dealing, message verification and share recovery

use blstrs::{G1Projective, Scalar};
use elliptic_curve::{ff::Field, group::Group};
use rand_core::{CryptoRng, RngCore};
use tracing::{debug, instrument};

use super::messages::{FeldmanCommitment, TssMessage};
use crate::claims::ShareClaims;
use crate::directory::ParticipantDirectory;
use crate::lagrange::interpolate_at_zero;
use crate::pairing::elgamal::{ElGamalCache, ElGamalCiphertext};
use crate::pairing::{PairingPrivateKey, PairingPublicKey};
use crate::types::{PrivateShare, PublicShare, ShareId};
use crate::{Error, Result};

/// Random polynomial of degree t-1 with a fixed constant term
struct SecretPolynomial {
    coefficients: Vec<Scalar>,
}

impl SecretPolynomial {
    fn random<R: RngCore + CryptoRng>(rng: &mut R, secret: Scalar, threshold: usize) -> Self {
        let mut coefficients = Vec::with_capacity(threshold);
        coefficients.push(secret);
        for _ in 1..threshold {
            coefficients.push(Scalar::random(&mut *rng));
        }
        Self { coefficients }
    }

    fn evaluate(&self, x: &Scalar) -> Scalar {
        self.coefficients
            .iter()
            .rev()
            .fold(Scalar::ZERO, |acc, coefficient| acc * x + coefficient)
    }

    fn commit(&self) -> FeldmanCommitment {
        let generator = G1Projective::generator();
        FeldmanCommitment::new(self.coefficients.iter().map(|a| generator * a).collect())
    }
}

impl Drop for SecretPolynomial {
    fn drop(&mut self) {
        for coefficient in &mut self.coefficients {
            *coefficient = Scalar::ZERO;
        }
    }
}

/// Deal `secret_share` to every claimed share
///
/// Samples a polynomial `P` of degree `threshold - 1` with `P(0)` equal to
/// the secret, encrypts `P(x_s)` for every claimed share `s` under its
/// owner's key and commits to `P`.
#[instrument(skip_all, fields(issuer = %secret_share.share_id, threshold = threshold))]
pub fn generate_tss_message<R: RngCore + CryptoRng>(
    rng: &mut R,
    share_claims: &ShareClaims,
    secret_share: &PrivateShare,
    threshold: usize,
) -> Result<TssMessage> {
    if threshold == 0 {
        return Err(Error::InvalidConfig(format!(
            "Invalid threshold: {}",
            threshold
        )));
    }

    let polynomial =
        SecretPolynomial::random(&mut *rng, *secret_share.private_key.scalar(), threshold);

    let evaluations: Vec<(PairingPublicKey, Scalar)> = share_claims
        .claims()
        .iter()
        .map(|claim| (claim.public_key, polynomial.evaluate(&claim.share_id.x())))
        .collect();
    let ciphertext = ElGamalCiphertext::encrypt(rng, &evaluations);
    let commitment = polynomial.commit();

    debug!(recipients = share_claims.len(), "TSS message generated");

    Ok(TssMessage {
        issuer: secret_share.share_id,
        commitment,
        ciphertext,
    })
}

/// Deal a fresh random secret for `share_id`
pub fn generate_genesis_message<R: RngCore + CryptoRng>(
    rng: &mut R,
    share_claims: &ShareClaims,
    share_id: ShareId,
    threshold: usize,
) -> Result<TssMessage> {
    let secret = PrivateShare::new(share_id, PairingPrivateKey::random(&mut *rng));
    generate_tss_message(rng, share_claims, &secret, threshold)
}

/// Check that `message` is well formed for `directory`
///
/// Structural only: a peer can still deal inconsistent ciphertexts. Never
/// panics, so it is safe on untrusted input.
pub fn verify_tss_message(directory: &ParticipantDirectory, message: &TssMessage) -> bool {
    if message.issuer.0 == 0 {
        debug!("TSS message rejected: issuer share id 0");
        return false;
    }
    if message.ciphertext.recipient_count() != directory.total_shares() {
        debug!(
            issuer = %message.issuer,
            expected = directory.total_shares(),
            actual = message.ciphertext.recipient_count(),
            "TSS message rejected: wrong number of ciphertext entries"
        );
        return false;
    }
    if !message.ciphertext.is_well_formed() {
        debug!(issuer = %message.issuer, "TSS message rejected: malformed ciphertext");
        return false;
    }
    if message.commitment.len() != directory.threshold() {
        debug!(
            issuer = %message.issuer,
            expected = directory.threshold(),
            actual = message.commitment.len(),
            "TSS message rejected: commitment does not match threshold"
        );
        return false;
    }
    true
}

/// Recover the private share `my_share_id` from dealt messages
///
/// Returns `Ok(None)` while fewer than `threshold` messages are available.
/// The messages must already have passed [`verify_tss_message`] and come
/// from distinct issuers.
#[instrument(skip_all, fields(share = %my_share_id, messages = messages.len(), threshold = threshold))]
pub fn decrypt_private_share(
    my_share_id: ShareId,
    my_private_key: &PairingPrivateKey,
    messages: &[TssMessage],
    cache: &ElGamalCache,
    share_claims: &ShareClaims,
    threshold: usize,
) -> Result<Option<PrivateShare>> {
    if messages.len() < threshold {
        return Ok(None);
    }
    let index = share_claims
        .index_of(my_share_id)
        .ok_or(Error::InvalidShareId(my_share_id))?;

    let points = messages
        .iter()
        .map(|message| {
            let partial = message.ciphertext.decrypt(index, my_private_key, cache)?;
            Ok((message.issuer, partial))
        })
        .collect::<Result<Vec<_>>>()?;

    let secret = interpolate_at_zero(&points, "TSS message")?;
    Ok(Some(PrivateShare::new(
        my_share_id,
        PairingPrivateKey::from_scalar(secret),
    )))
}

/// Derive the public share of `target` from the messages' commitments
///
/// Returns `Ok(None)` while fewer than `threshold` messages are available.
pub fn compute_public_share(
    target: ShareId,
    messages: &[TssMessage],
    threshold: usize,
) -> Result<Option<PublicShare>> {
    if messages.len() < threshold {
        return Ok(None);
    }
    let x = target.x();
    let points: Vec<(ShareId, G1Projective)> = messages
        .iter()
        .map(|message| (message.issuer, message.commitment.evaluate(&x)))
        .collect();

    let public_key = interpolate_at_zero(&points, "TSS message")?;
    Ok(Some(PublicShare::new(
        target,
        PairingPublicKey::from_point(public_key),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::SignatureSchema;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    fn directory(rng: &mut ChaCha20Rng, threshold: usize) -> (ParticipantDirectory, PairingPrivateKey) {
        let mine = PairingPrivateKey::random(rng);
        let other = PairingPrivateKey::random(rng);
        let directory = ParticipantDirectory::builder()
            .with_self(1, mine.clone())
            .unwrap()
            .with_participant(1, 2, mine.public_key())
            .unwrap()
            .with_participant(2, 1, other.public_key())
            .unwrap()
            .with_threshold(threshold)
            .unwrap()
            .build(SignatureSchema::default())
            .unwrap();
        (directory, mine)
    }

    #[test]
    fn test_polynomial_keeps_secret_at_zero() {
        let mut rng = ChaCha20Rng::seed_from_u64(20);
        let secret = Scalar::from(42u64);
        let polynomial = SecretPolynomial::random(&mut rng, secret, 3);
        assert_eq!(polynomial.evaluate(&Scalar::ZERO), secret);
        assert_eq!(
            polynomial.commit().evaluate(&Scalar::from(5u64)),
            G1Projective::generator() * polynomial.evaluate(&Scalar::from(5u64))
        );
    }

    #[test]
    fn test_generated_message_verifies() {
        let mut rng = ChaCha20Rng::seed_from_u64(21);
        let (directory, _) = directory(&mut rng, 2);
        let message =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 2).unwrap();

        assert_eq!(message.issuer, ShareId(1));
        assert_eq!(message.commitment.len(), 2);
        assert!(verify_tss_message(&directory, &message));
    }

    #[test]
    fn test_verify_rejects_wrong_shape() {
        let mut rng = ChaCha20Rng::seed_from_u64(22);
        let (directory, _) = directory(&mut rng, 2);

        let wrong_threshold =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 3).unwrap();
        assert!(!verify_tss_message(&directory, &wrong_threshold));

        let partial_claims = ShareClaims::new(directory.share_claims().claims()[..2].to_vec());
        let missing_entry =
            generate_genesis_message(&mut rng, &partial_claims, ShareId(1), 2).unwrap();
        assert!(!verify_tss_message(&directory, &missing_entry));

        let mut zero_issuer =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 2).unwrap();
        zero_issuer.issuer = ShareId(0);
        assert!(!verify_tss_message(&directory, &zero_issuer));
    }

    #[test]
    fn test_verify_rejects_wrong_chunk_counts() {
        let mut rng = ChaCha20Rng::seed_from_u64(27);
        let (directory, _) = directory(&mut rng, 2);
        let message =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 2).unwrap();
        let randomness = message.ciphertext.shared_randomness().to_vec();
        let recipients = message.ciphertext.recipients().to_vec();

        let mut short_entry = message.clone();
        let mut truncated = recipients.clone();
        truncated[1].pop();
        assert_eq!(truncated[1].len(), 31);
        short_entry.ciphertext = ElGamalCiphertext::from_parts(randomness.clone(), truncated);
        assert!(!verify_tss_message(&directory, &short_entry));

        let mut no_randomness = message.clone();
        no_randomness.ciphertext = ElGamalCiphertext::from_parts(Vec::new(), recipients.clone());
        assert!(!verify_tss_message(&directory, &no_randomness));

        let mut rebuilt = message;
        rebuilt.ciphertext = ElGamalCiphertext::from_parts(randomness, recipients);
        assert!(verify_tss_message(&directory, &rebuilt));
    }

    #[test]
    fn test_zero_threshold_is_rejected() {
        let mut rng = ChaCha20Rng::seed_from_u64(23);
        let (directory, _) = directory(&mut rng, 1);
        assert!(generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 0).is_err());
    }

    #[test]
    fn test_insufficient_messages_yield_none() {
        let mut rng = ChaCha20Rng::seed_from_u64(24);
        let (directory, mine) = directory(&mut rng, 2);
        let cache = ElGamalCache::new();
        let message =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 2).unwrap();

        let private = decrypt_private_share(
            ShareId(1),
            &mine,
            std::slice::from_ref(&message),
            &cache,
            directory.share_claims(),
            2,
        )
        .unwrap();
        assert!(private.is_none());
        assert!(compute_public_share(ShareId(1), &[message], 2).unwrap().is_none());
    }

    #[test]
    fn test_decrypted_share_matches_public_share() {
        let mut rng = ChaCha20Rng::seed_from_u64(25);
        let (directory, mine) = directory(&mut rng, 2);
        let cache = ElGamalCache::new();
        let messages: Vec<_> = directory
            .share_ids()
            .iter()
            .map(|id| {
                generate_genesis_message(&mut rng, directory.share_claims(), *id, 2).unwrap()
            })
            .collect();

        for share_id in directory.owned_share_ids() {
            let private = decrypt_private_share(
                *share_id,
                &mine,
                &messages,
                &cache,
                directory.share_claims(),
                2,
            )
            .unwrap()
            .unwrap();
            let public = compute_public_share(*share_id, &messages, 2).unwrap().unwrap();
            assert_eq!(private.public_share(), public);
        }
    }

    #[test]
    fn test_duplicate_issuers_are_an_error() {
        let mut rng = ChaCha20Rng::seed_from_u64(26);
        let (directory, mine) = directory(&mut rng, 2);
        let cache = ElGamalCache::new();
        let message =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 2).unwrap();
        let messages = vec![message.clone(), message];

        assert!(matches!(
            compute_public_share(ShareId(2), &messages, 2),
            Err(Error::DuplicateShareId(_))
        ));
        assert!(decrypt_private_share(
            ShareId(1),
            &mine,
            &messages,
            &cache,
            directory.share_claims(),
            2
        )
        .is_err());
    }

    #[test]
    fn test_unknown_share_id() {
        let mut rng = ChaCha20Rng::seed_from_u64(27);
        let (directory, mine) = directory(&mut rng, 1);
        let cache = ElGamalCache::new();
        let message =
            generate_genesis_message(&mut rng, directory.share_claims(), ShareId(1), 1).unwrap();

        assert!(matches!(
            decrypt_private_share(
                ShareId(9),
                &mine,
                &[message],
                &cache,
                directory.share_claims(),
                1
            ),
            Err(Error::InvalidShareId(ShareId(9)))
        ));
    }
}
