//! Lagrange interpolation at zero and the aggregation primitives
//!
//! Private shares, public shares and share signatures are all evaluations of
//! one degree `t-1` polynomial (in the field, in G1, in G2). Interpolating
//! `t` of them at `x = 0` recovers the aggregate private key, the ledger ID
//! or the aggregate signature respectively.
//!
//! The unchecked aggregators do not know the threshold. Fewer than `t`
//! inputs still interpolate, to a value that is simply wrong; signature
//! verification against the ledger ID is what catches it. Use the
//! `*_checked` variants when the threshold is at hand.

use std::collections::HashSet;
use std::iter::Sum;
use std::ops::Mul;

use blstrs::Scalar;
use elliptic_curve::ff::Field;

use crate::pairing::{PairingPrivateKey, PairingPublicKey, PairingSignature};
use crate::types::{PrivateShare, PublicShare, ShareId, ShareSignature};
use crate::{Error, Result};

/// Lagrange coefficients at zero for the given x-coordinates
///
/// `λ_i = Π_{j≠i} (0 - x_j) / (x_i - x_j)`
pub fn coefficients_at_zero(share_ids: &[ShareId]) -> Result<Vec<Scalar>> {
    if share_ids.is_empty() {
        return Err(Error::EmptyAggregation("share id"));
    }
    let mut seen = HashSet::with_capacity(share_ids.len());
    for id in share_ids {
        if !seen.insert(*id) {
            return Err(Error::DuplicateShareId(*id));
        }
    }

    let xs: Vec<Scalar> = share_ids.iter().map(ShareId::x).collect();
    xs.iter()
        .enumerate()
        .map(|(i, x_i)| {
            let mut numerator = Scalar::ONE;
            let mut denominator = Scalar::ONE;
            for (j, x_j) in xs.iter().enumerate() {
                if i != j {
                    numerator *= -*x_j;
                    denominator *= *x_i - *x_j;
                }
            }
            Option::<Scalar>::from(denominator.invert())
                .map(|inverse| numerator * inverse)
                .ok_or_else(|| Error::Crypto("Lagrange denominator is not invertible".into()))
        })
        .collect()
}

/// Interpolate `(x, value)` points at zero
pub(crate) fn interpolate_at_zero<T>(points: &[(ShareId, T)], item: &'static str) -> Result<T>
where
    T: Copy + Sum + Mul<Scalar, Output = T>,
{
    if points.is_empty() {
        return Err(Error::EmptyAggregation(item));
    }
    let ids: Vec<ShareId> = points.iter().map(|(id, _)| *id).collect();
    let lambdas = coefficients_at_zero(&ids)?;
    Ok(points
        .iter()
        .zip(lambdas)
        .map(|((_, value), lambda)| *value * lambda)
        .sum())
}

/// Recover the aggregate private key from private shares
///
/// Does not check the threshold.
pub fn aggregate_private_shares(shares: &[PrivateShare]) -> Result<PairingPrivateKey> {
    let points: Vec<_> = shares
        .iter()
        .map(|share| (share.share_id, *share.private_key.scalar()))
        .collect();
    interpolate_at_zero(&points, "private share").map(PairingPrivateKey::from_scalar)
}

/// Recover the aggregate public key (the ledger ID) from public shares
///
/// Does not check the threshold.
pub fn aggregate_public_shares(shares: &[PublicShare]) -> Result<PairingPublicKey> {
    let points: Vec<_> = shares
        .iter()
        .map(|share| (share.share_id, *share.public_key.point()))
        .collect();
    interpolate_at_zero(&points, "public share").map(PairingPublicKey::from_point)
}

/// Recover the aggregate signature from share signatures
///
/// Does not check the threshold.
pub fn aggregate_signatures(signatures: &[ShareSignature]) -> Result<PairingSignature> {
    let points: Vec<_> = signatures
        .iter()
        .map(|share| (share.share_id, *share.signature.point()))
        .collect();
    interpolate_at_zero(&points, "share signature").map(PairingSignature::from_point)
}

fn ensure_threshold(actual: usize, threshold: usize) -> Result<()> {
    if actual < threshold {
        return Err(Error::ThresholdNotMet {
            required: threshold,
            actual,
        });
    }
    Ok(())
}

/// [`aggregate_private_shares`] refusing fewer than `threshold` shares
pub fn aggregate_private_shares_checked(
    shares: &[PrivateShare],
    threshold: usize,
) -> Result<PairingPrivateKey> {
    ensure_threshold(shares.len(), threshold)?;
    aggregate_private_shares(shares)
}

/// [`aggregate_public_shares`] refusing fewer than `threshold` shares
pub fn aggregate_public_shares_checked(
    shares: &[PublicShare],
    threshold: usize,
) -> Result<PairingPublicKey> {
    ensure_threshold(shares.len(), threshold)?;
    aggregate_public_shares(shares)
}

/// [`aggregate_signatures`] refusing fewer than `threshold` signatures
pub fn aggregate_signatures_checked(
    signatures: &[ShareSignature],
    threshold: usize,
) -> Result<PairingSignature> {
    ensure_threshold(signatures.len(), threshold)?;
    aggregate_signatures(signatures)
}
