//! Keying and rekeying: the TSS engine
//!
//! Every share of the committee deals its secret with a [`TssMessage`].
//! Once `t` verified messages are collected, each participant decrypts its
//! own new private shares and anyone can derive every public share.

mod dkg;
mod key_refresh;
mod messages;

pub use dkg::{
    compute_public_share, decrypt_private_share, generate_genesis_message, generate_tss_message,
    verify_tss_message,
};
pub use key_refresh::generate_rekey_message;
pub use messages::*;
