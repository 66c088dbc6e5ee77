//! # TSS Core
//!
//! Threshold signatures over BLS12-381 with rekeying.
//!
//! A committee of participants, weighted into shares, jointly controls a
//! public key (the ledger ID) whose private key never exists in one place.
//! This crate provides:
//! - Keying: dealing shares with encrypted, publicly committed TSS messages
//! - Rekeying: re-dealing existing shares while the ledger ID stays fixed
//! - Threshold signing and Lagrange aggregation
//!
//! ## Example
//!
//! ```rust,ignore
//! use tss_core::{ParticipantDirectory, SignatureSchema, TssService};
//!
//! let mut service = TssService::new(SignatureSchema::default(), rand::rngs::OsRng);
//! let messages = service.generate_genesis_messages(&directory)?;
//! // ... broadcast, collect and verify every participant's messages ...
//! let shares = service.decrypt_private_shares(&directory, &collected)?;
//! let ledger_id = service.ledger_id(&directory, &collected)?;
//! ```

pub mod claims;
pub mod directory;
pub mod error;
pub mod keygen;
pub mod lagrange;
pub mod pairing;
pub mod service;
pub mod sign;
pub mod types;

pub use claims::{ShareClaim, ShareClaims};
pub use directory::{ParticipantDirectory, ParticipantDirectoryBuilder};
pub use error::{Error, Result};
pub use keygen::TssMessage;
pub use pairing::{PairingPrivateKey, PairingPublicKey, PairingSignature, SignatureSchema};
pub use service::TssService;
pub use types::{ParticipantId, PrivateShare, PublicShare, ShareId, ShareSignature};

/// Protocol version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
