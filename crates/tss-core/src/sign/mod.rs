//! Threshold signing
//!
//! Each private share signs independently; `t` share signatures over the
//! same message aggregate (see [`crate::lagrange::aggregate_signatures`])
//! into a plain BLS signature under the ledger ID.

use tracing::debug;

use crate::directory::ParticipantDirectory;
use crate::pairing::SignatureSchema;
use crate::types::{PrivateShare, PublicShare, ShareSignature};

/// Sign `message` with one private share
pub fn sign_share(
    schema: &SignatureSchema,
    private_share: &PrivateShare,
    message: &[u8],
) -> ShareSignature {
    ShareSignature::new(
        private_share.share_id,
        private_share.private_key.sign(schema, message),
    )
}

/// Verify a share signature against the public share of its signer
///
/// Returns `false` when the signer's share is not part of `directory` or has
/// no entry in `public_shares`.
pub fn verify_share_signature(
    schema: &SignatureSchema,
    directory: &ParticipantDirectory,
    public_shares: &[PublicShare],
    share_signature: &ShareSignature,
    message: &[u8],
) -> bool {
    let share_id = share_signature.share_id;
    if directory.share_claims().index_of(share_id).is_none() {
        debug!(share = %share_id, "Share signature from a share outside the directory");
        return false;
    }
    match public_shares.iter().find(|share| share.share_id == share_id) {
        Some(public_share) => {
            public_share
                .public_key
                .verify(schema, message, &share_signature.signature)
        }
        None => {
            debug!(share = %share_id, "No public share for share signature");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pairing::PairingPrivateKey;
    use crate::types::ShareId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn test_share_signature_verification() {
        let mut rng = ChaCha20Rng::seed_from_u64(30);
        let schema = SignatureSchema::default();
        let key = PairingPrivateKey::random(&mut rng);
        let directory = ParticipantDirectory::builder()
            .with_self(1, key.clone())
            .unwrap()
            .with_participant(1, 2, key.public_key())
            .unwrap()
            .with_threshold(1)
            .unwrap()
            .build(schema)
            .unwrap();

        let share = PrivateShare::new(ShareId(2), PairingPrivateKey::random(&mut rng));
        let public_shares = vec![share.public_share()];
        let signature = sign_share(&schema, &share, b"block 17");
        let verify = |signature: &ShareSignature, shares: &[PublicShare], message: &[u8]| {
            verify_share_signature(&schema, &directory, shares, signature, message)
        };

        assert_eq!(signature.share_id, ShareId(2));
        assert!(verify(&signature, &public_shares, b"block 17"));
        assert!(!verify(&signature, &public_shares, b"block 18"));
        assert!(!verify(&signature, &[], b"block 17"));

        let outsider = sign_share(
            &schema,
            &PrivateShare::new(ShareId(5), PairingPrivateKey::random(&mut rng)),
            b"block 17",
        );
        assert!(!verify(&outsider, &public_shares, b"block 17"));

        let other_schema = SignatureSchema::new(b"LEDGER_TSS_OTHER_DST");
        assert!(!verify_share_signature(
            &other_schema,
            &directory,
            &public_shares,
            &signature,
            b"block 17"
        ));
    }
}
