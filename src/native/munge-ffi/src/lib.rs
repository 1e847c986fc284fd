//! # munge-ffi
//!
//! libmunge binding for `munge-core`.
//!
//! Linking against the system libmunge is opt-in through the `libmunge`
//! feature, so the rest of the workspace builds on hosts without the MUNGE
//! development headers. Without it only the [`native`] buffer helpers exist.
//!
//! ```ignore
//! use munge_core::{Credential, Ttl};
//!
//! let encoded = munge_ffi::encode(&Credential::new().with_payload("hi").with_ttl(Ttl::Seconds(60)))?;
//! let decoded = munge_ffi::decode(&encoded)?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod native;

#[cfg(feature = "libmunge")]
mod context;
#[cfg(feature = "libmunge")]
pub mod sys;

#[cfg(feature = "libmunge")]
pub use context::MungeContext;

#[cfg(feature = "libmunge")]
use munge_core::{ContextConfig, Credential, CredentialError};

/// Encodes `credential` through the local munged with default options.
#[cfg(feature = "libmunge")]
pub fn encode(credential: &Credential) -> Result<String, CredentialError> {
    credential.encode_with::<MungeContext>(&ContextConfig::default())
}

/// Decodes `credential` through the local munged with default options.
#[cfg(feature = "libmunge")]
pub fn decode(credential: &str) -> Result<Credential, CredentialError> {
    Credential::decode_with::<MungeContext>(credential, &ContextConfig::default())
}
