//! # Invitegate (Private Beta Login Gate)
//!
//! `invitegate` decides, after a user authenticates, whether the login may
//! proceed or whether the user must first redeem an invitation code.
//!
//! ## Two-phase workflow
//!
//! - **Execute:** every login is checked against the user's `isPrivateBetaUser`
//!   flag. Unverified users are redirected to the invitation form; verified users
//!   pass through untouched.
//! - **Continue:** after the form is submitted, a non-empty `INVITATION_CODE`
//!   marks the user as verified and the code is retired from the shared pool.
//!
//! ## Invitation registry
//!
//! The pool of valid codes lives in a single record of the identity provider's
//! management API. Retiring a code is a read-modify-write without concurrency
//! control: two users consuming codes at the same time may lose one of the
//! removals. Access decisions never depend on that write succeeding.

pub mod api;
pub mod cli;
pub mod gate;
pub mod registry;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
