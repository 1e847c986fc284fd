//! Context configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::option::{OptionId, Ttl};

/// Options applied to a context before encoding or decoding.
///
/// Every field is optional; absent fields leave the service default in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContextConfig {
    /// Daemon socket path.
    pub socket: Option<PathBuf>,
    /// Credential time-to-live.
    pub ttl: Option<Ttl>,
    /// Cipher type id.
    pub cipher: Option<i32>,
    /// MAC type id.
    pub mac: Option<i32>,
    /// Compression type id.
    pub zip: Option<i32>,
    /// Only this UID may decode.
    pub uid_restriction: Option<u32>,
    /// Only this GID may decode.
    pub gid_restriction: Option<u32>,
}

impl ContextConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Integer options in the order they are applied.
    pub fn int_options(&self) -> Vec<(OptionId, i32)> {
        let mut options = Vec::new();
        if let Some(cipher) = self.cipher {
            options.push((OptionId::CIPHER_TYPE, cipher));
        }
        if let Some(mac) = self.mac {
            options.push((OptionId::MAC_TYPE, mac));
        }
        if let Some(zip) = self.zip {
            options.push((OptionId::ZIP_TYPE, zip));
        }
        if let Some(ttl) = self.ttl {
            options.push((OptionId::TTL, ttl.as_raw()));
        }
        // Identity values travel as the service's 32-bit id type.
        if let Some(uid) = self.uid_restriction {
            options.push((OptionId::UID_RESTRICTION, uid as i32));
        }
        if let Some(gid) = self.gid_restriction {
            options.push((OptionId::GID_RESTRICTION, gid as i32));
        }
        options
    }
}
