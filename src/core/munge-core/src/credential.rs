//! High-level credential API.
//!
//! Each call builds a short-lived [`Handle`], runs one operation, and lets the
//! handle erase its buffers on the way out.

use std::fmt;

use tracing::debug;

use crate::config::ContextConfig;
use crate::context::CredentialContext;
use crate::error::{CredentialError, HandleError};
use crate::handle::Handle;
use crate::option::{OptionId, Ttl};
use crate::secret::SecretBuffer;
use crate::status::Status;

/// A credential to encode, or the contents of a decoded one.
#[derive(Clone, Default)]
pub struct Credential {
    uid: Option<u32>,
    gid: Option<u32>,
    payload: SecretBuffer,
    ttl: Ttl,
}

impl Credential {
    /// Creates an empty credential with the service's default TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the payload carried by the credential.
    pub fn with_payload(mut self, payload: impl Into<Vec<u8>>) -> Self {
        self.payload = SecretBuffer::new(payload.into());
        self
    }

    /// Sets the time-to-live. `Seconds(0)` is stored as `Default`.
    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl.normalized();
        self
    }

    /// UID of the process that encoded the credential (decoded only).
    pub fn uid(&self) -> Option<u32> {
        self.uid
    }

    /// GID of the process that encoded the credential (decoded only).
    pub fn gid(&self) -> Option<u32> {
        self.gid
    }

    /// Payload bytes.
    pub fn payload(&self) -> &[u8] {
        self.payload.as_bytes()
    }

    /// Time-to-live.
    pub fn ttl(&self) -> Ttl {
        self.ttl
    }

    /// Encodes this credential with a fresh `C` context.
    ///
    /// `config` is applied first; a non-default TTL on the credential
    /// overrides the configured one.
    pub fn encode_with<C: CredentialContext>(
        &self,
        config: &ContextConfig,
    ) -> Result<String, CredentialError> {
        let mut handle = Handle::<C>::create()?;
        configure(&mut handle, config)?;

        if self.ttl != Ttl::Default {
            handle
                .set_option(OptionId::TTL, self.ttl.as_raw())
                .map_err(|e| option_error(&handle, e))?;
        }

        if !self.payload.is_empty() {
            handle.set_payload(self.payload.as_bytes());
        }

        handle.encode().map_err(|e| match e {
            HandleError::Service(status) => CredentialError::Encode {
                status,
                message: handle.describe(status),
            },
            other => CredentialError::Handle(other),
        })?;

        let encoded = handle
            .encoded_credential()
            .ok_or_else(|| CredentialError::Encode {
                status: Status::SNAFU,
                message: "service returned no credential".into(),
            })?
            .to_str()?
            .to_owned();

        debug!(len = encoded.len(), "credential encoded");
        Ok(encoded)
    }

    /// Decodes `credential` with a fresh `C` context.
    ///
    /// The TTL recorded in the credential is read back from the context.
    pub fn decode_with<C: CredentialContext>(
        credential: &str,
        config: &ContextConfig,
    ) -> Result<Self, CredentialError> {
        let mut handle = Handle::<C>::create()?;
        configure(&mut handle, config)?;
        handle.set_encoded_credential(credential)?;

        handle.decode().map_err(|e| match e {
            HandleError::Service(status) => decode_error(&handle, status),
            other => CredentialError::Handle(other),
        })?;

        let ttl = handle
            .get_option(OptionId::TTL)
            .map_err(|e| option_error(&handle, e))?;

        let decoded = Self {
            uid: handle.credential_uid(),
            gid: handle.credential_gid(),
            payload: handle.take_payload().unwrap_or_default(),
            ttl: Ttl::from_raw(ttl)?,
        };
        debug!(uid = ?decoded.uid, gid = ?decoded.gid, "credential decoded");
        Ok(decoded)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("uid", &self.uid)
            .field("gid", &self.gid)
            .field("payload", &self.payload)
            .field("ttl", &self.ttl)
            .finish()
    }
}

fn configure<C: CredentialContext>(
    handle: &mut Handle<C>,
    config: &ContextConfig,
) -> Result<(), CredentialError> {
    handle
        .configure(config)
        .map_err(|e| option_error(handle, e))
}

fn option_error<C: CredentialContext>(handle: &Handle<C>, error: HandleError) -> CredentialError {
    match error {
        HandleError::Service(status) => CredentialError::Option {
            status,
            message: handle.describe(status),
        },
        other => CredentialError::Handle(other),
    }
}

fn decode_error<C: CredentialContext>(handle: &Handle<C>, status: Status) -> CredentialError {
    match status {
        Status::CRED_INVALID => CredentialError::CredInvalid,
        Status::CRED_EXPIRED => CredentialError::CredExpired,
        Status::CRED_REWOUND => CredentialError::CredRewound,
        Status::CRED_REPLAYED => CredentialError::CredReplayed,
        Status::CRED_UNAUTHORIZED => CredentialError::CredUnauthorized,
        other => CredentialError::Decode {
            status: other,
            message: handle.describe(other),
        },
    }
}
