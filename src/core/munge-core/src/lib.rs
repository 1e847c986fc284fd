//! # munge-core
//!
//! Credential handle and secret-buffer discipline for MUNGE.
//!
//! This crate provides:
//! - [`Handle`]: owns one service context plus at most one payload and one
//!   encoded credential, erasing both before release
//! - [`CredentialContext`]: the seam to the external credential service
//! - [`Credential`]: one-shot encode/decode built on a handle
//! - [`dev::DevContext`]: an in-process, non-secure service for development
//!
//! The libmunge-backed context lives in the `munge-ffi` crate.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod context;
pub mod credential;
pub mod dev;
pub mod error;
pub mod handle;
pub mod option;
pub mod secret;
pub mod status;

pub use config::ContextConfig;
pub use context::{CredentialContext, Decoded};
pub use credential::Credential;
pub use error::{CredentialError, HandleError};
pub use handle::Handle;
pub use option::{OptionId, Ttl};
pub use secret::{read_to_secret, secure_erase, EncodedCredential, SecretBuffer};
pub use status::Status;
