//! Credential handle: one context, at most one payload, at most one credential.

use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use nix::unistd::{getegid, geteuid};
use tracing::{debug, trace};

use crate::config::ContextConfig;
use crate::context::CredentialContext;
use crate::error::HandleError;
use crate::option::OptionId;
use crate::secret::{EncodedCredential, SecretBuffer};
use crate::status::Status;

/// Owns a service context plus the payload and credential buffers around it.
///
/// Buffers are zeroed before release, whether they are replaced, taken, or
/// dropped with the handle. A handle is not meant to be shared between
/// threads; every operation takes `&mut self`.
pub struct Handle<C: CredentialContext> {
    context: C,
    status: Option<Status>,
    credential_uid: Option<u32>,
    credential_gid: Option<u32>,
    payload: Option<SecretBuffer>,
    encoded: Option<EncodedCredential>,
}

impl<C: CredentialContext> Handle<C> {
    /// Creates a handle with a fresh service context.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Allocation`] if the context cannot be created.
    pub fn create() -> Result<Self, HandleError> {
        let context = C::create()?;
        trace!("credential handle created");

        Ok(Self {
            context,
            status: None,
            credential_uid: None,
            credential_gid: None,
            payload: None,
            encoded: None,
        })
    }

    /// Forwards an integer option to the service.
    pub fn set_option(&mut self, option: OptionId, value: i32) -> Result<(), HandleError> {
        self.context
            .set_int(option, value)
            .map_err(HandleError::Service)
    }

    /// Reads an integer option from the service.
    pub fn get_option(&mut self, option: OptionId) -> Result<i32, HandleError> {
        self.context.get_int(option).map_err(HandleError::Service)
    }

    /// Points the context at a daemon socket.
    pub fn set_socket(&mut self, path: &Path) -> Result<(), HandleError> {
        let path = CString::new(path.as_os_str().as_bytes()).map_err(|_| {
            HandleError::InvalidInput(format!("socket path contains a NUL byte: {}", path.display()))
        })?;
        self.context
            .set_socket(&path)
            .map_err(HandleError::Service)
    }

    /// Applies every option present in `config`, stopping at the first rejection.
    pub fn configure(&mut self, config: &ContextConfig) -> Result<(), HandleError> {
        if let Some(socket) = &config.socket {
            self.set_socket(socket)?;
        }
        for (option, value) in config.int_options() {
            debug!(%option, value, "setting context option");
            self.set_option(option, value)?;
        }
        Ok(())
    }

    /// Replaces the payload, erasing the previous one.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.payload = Some(SecretBuffer::from_slice(payload));
    }

    /// Erases and drops the payload.
    pub fn clear_payload(&mut self) {
        self.payload = None;
    }

    /// Moves the payload out of the handle.
    pub fn take_payload(&mut self) -> Option<SecretBuffer> {
        self.payload.take()
    }

    /// Replaces the encoded credential used by [`decode`](Self::decode).
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidInput`] if the string contains a NUL byte;
    /// the previous credential is kept in that case.
    pub fn set_encoded_credential(&mut self, credential: &str) -> Result<(), HandleError> {
        self.encoded = Some(EncodedCredential::from_text(credential)?);
        Ok(())
    }

    /// Encodes the current payload into a credential.
    ///
    /// The effective UID and GID are recorded before the service is called,
    /// so they are overwritten even when encoding fails. On failure the
    /// previous credential is erased and left absent.
    pub fn encode(&mut self) -> Result<(), HandleError> {
        self.credential_uid = Some(geteuid().as_raw());
        self.credential_gid = Some(getegid().as_raw());

        let payload = self
            .payload
            .as_ref()
            .map(SecretBuffer::as_bytes)
            .unwrap_or_default();

        let (encoded, status) = match self.context.encode(payload) {
            Ok(credential) => (Some(credential), Status::SUCCESS),
            Err(status) => (None, status),
        };
        self.encoded = encoded;

        self.record("encode", status)
    }

    /// Decodes the current credential.
    ///
    /// On success the payload and identity are replaced with the decoded
    /// values. On failure they are left untouched.
    pub fn decode(&mut self) -> Result<(), HandleError> {
        let credential = self.encoded.as_ref().map(EncodedCredential::as_c_str);

        let status = match self.context.decode(credential) {
            Ok(decoded) => {
                self.payload = decoded.payload;
                self.credential_uid = Some(decoded.uid);
                self.credential_gid = Some(decoded.gid);
                Status::SUCCESS
            }
            Err(status) => status,
        };

        self.record("decode", status)
    }

    fn record(&mut self, operation: &'static str, status: Status) -> Result<(), HandleError> {
        self.status = Some(status);
        debug!(operation, status = status.code(), "credential operation finished");
        status.into_result().map_err(HandleError::Service)
    }

    /// Service description of `status`.
    pub fn describe(&self, status: Status) -> String {
        self.context.describe(status)
    }

    /// Last encode/decode result, or `None` if neither has run.
    pub fn status(&self) -> Option<Status> {
        self.status
    }

    /// UID recorded by the last encode or successful decode.
    pub fn credential_uid(&self) -> Option<u32> {
        self.credential_uid
    }

    /// GID recorded by the last encode or successful decode.
    pub fn credential_gid(&self) -> Option<u32> {
        self.credential_gid
    }

    /// Current payload.
    pub fn payload(&self) -> Option<&[u8]> {
        self.payload.as_ref().map(SecretBuffer::as_bytes)
    }

    /// Current encoded credential.
    pub fn encoded_credential(&self) -> Option<&EncodedCredential> {
        self.encoded.as_ref()
    }

    /// Destroys the handle: erases both buffers, then releases the context.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<C: CredentialContext> Drop for Handle<C> {
    fn drop(&mut self) {
        let payload_len = self.payload.take().map(|buf| buf.len());
        let credential_len = self.encoded.take().map(|cred| cred.len());
        trace!(?payload_len, ?credential_len, "credential handle destroyed");
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::ffi::CStr;

    use super::*;
    use crate::context::Decoded;
    use crate::option::Ttl;

    thread_local! {
        static FAIL_CREATE: Cell<bool> = const { Cell::new(false) };
        static LIVE_CONTEXTS: Cell<usize> = const { Cell::new(0) };
    }

    /// Scripted context that echoes the payload back as the credential.
    struct EchoContext {
        options: HashMap<i32, i32>,
        socket: Option<String>,
        encode_status: Status,
    }

    impl CredentialContext for EchoContext {
        fn create() -> Result<Self, HandleError> {
            if FAIL_CREATE.with(Cell::get) {
                return Err(HandleError::Allocation);
            }
            LIVE_CONTEXTS.with(|n| n.set(n.get() + 1));
            Ok(Self {
                options: HashMap::new(),
                socket: None,
                encode_status: Status::SUCCESS,
            })
        }

        fn set_int(&mut self, option: OptionId, value: i32) -> Result<(), Status> {
            if option.code() > 10 {
                return Err(Status::BAD_ARG);
            }
            self.options.insert(option.code(), value);
            Ok(())
        }

        fn get_int(&mut self, option: OptionId) -> Result<i32, Status> {
            self.options
                .get(&option.code())
                .copied()
                .ok_or(Status::BAD_ARG)
        }

        fn set_socket(&mut self, path: &CStr) -> Result<(), Status> {
            self.socket = Some(path.to_string_lossy().into_owned());
            Ok(())
        }

        fn encode(&mut self, payload: &[u8]) -> Result<EncodedCredential, Status> {
            self.encode_status.into_result()?;
            let text = String::from_utf8_lossy(payload);
            EncodedCredential::new(format!("ECHO:{text}:")).map_err(|_| Status::SNAFU)
        }

        fn decode(&mut self, credential: Option<&CStr>) -> Result<Decoded, Status> {
            let credential = credential.ok_or(Status::BAD_ARG)?;
            let text = credential.to_str().map_err(|_| Status::BAD_CRED)?;
            let body = text
                .strip_prefix("ECHO:")
                .and_then(|rest| rest.strip_suffix(':'))
                .ok_or(Status::BAD_CRED)?;
            Ok(Decoded {
                payload: (!body.is_empty()).then(|| SecretBuffer::from_slice(body.as_bytes())),
                uid: 4242,
                gid: 4343,
            })
        }
    }

    impl Drop for EchoContext {
        fn drop(&mut self) {
            LIVE_CONTEXTS.with(|n| n.set(n.get() - 1));
        }
    }

    #[test]
    fn test_create_initial_state() {
        let handle = Handle::<EchoContext>::create().unwrap();
        assert_eq!(handle.status(), None);
        assert_eq!(handle.credential_uid(), None);
        assert_eq!(handle.credential_gid(), None);
        assert!(handle.payload().is_none());
        assert!(handle.encoded_credential().is_none());
    }

    #[test]
    fn test_create_then_destroy_releases_context_once() {
        let before = LIVE_CONTEXTS.with(Cell::get);
        let handle = Handle::<EchoContext>::create().unwrap();
        assert_eq!(LIVE_CONTEXTS.with(Cell::get), before + 1);
        handle.destroy();
        assert_eq!(LIVE_CONTEXTS.with(Cell::get), before);
    }

    #[test]
    fn test_create_failure_is_allocation_error() {
        FAIL_CREATE.with(|f| f.set(true));
        let result = Handle::<EchoContext>::create();
        FAIL_CREATE.with(|f| f.set(false));
        assert!(matches!(result, Err(HandleError::Allocation)));
    }

    #[test]
    fn test_encode_then_decode_recovers_payload() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.set_payload(b"hello");
        handle.encode().unwrap();
        assert_eq!(handle.status(), Some(Status::SUCCESS));
        assert!(!handle.encoded_credential().unwrap().is_empty());

        handle.clear_payload();
        handle.decode().unwrap();
        assert_eq!(handle.status(), Some(Status::SUCCESS));
        assert_eq!(handle.payload(), Some(&b"hello"[..]));
        assert_eq!(handle.credential_uid(), Some(4242));
        assert_eq!(handle.credential_gid(), Some(4343));
    }

    #[test]
    fn test_encode_records_effective_identity() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.encode().unwrap();
        assert_eq!(handle.credential_uid(), Some(geteuid().as_raw()));
        assert_eq!(handle.credential_gid(), Some(getegid().as_raw()));
    }

    #[test]
    fn test_encode_failure_still_overwrites_identity() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.set_payload(b"x");
        handle.set_encoded_credential("ECHO:stale:").unwrap();
        handle.decode().unwrap();
        assert_eq!(handle.credential_uid(), Some(4242));

        handle.context.encode_status = Status::SOCKET;
        let result = handle.encode();

        assert_eq!(result, Err(HandleError::Service(Status::SOCKET)));
        assert_eq!(handle.status(), Some(Status::SOCKET));
        assert_eq!(handle.credential_uid(), Some(geteuid().as_raw()));
        assert_eq!(handle.credential_gid(), Some(getegid().as_raw()));
        assert!(handle.encoded_credential().is_none());
    }

    #[test]
    fn test_decode_without_credential_fails() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        let result = handle.decode();
        assert_eq!(result, Err(HandleError::Service(Status::BAD_ARG)));
        assert_eq!(handle.status(), Some(Status::BAD_ARG));
        assert!(handle.payload().is_none());
    }

    #[test]
    fn test_decode_garbage_leaves_payload_absent() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.set_encoded_credential("not a credential").unwrap();
        let result = handle.decode();
        assert_eq!(result, Err(HandleError::Service(Status::BAD_CRED)));
        assert!(!handle.status().unwrap().is_success());
        assert!(handle.payload().is_none());
        assert_eq!(handle.credential_uid(), None);
    }

    #[test]
    fn test_option_roundtrip_returns_last_value() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.set_option(OptionId::TTL, 60).unwrap();
        handle.set_option(OptionId::TTL, 800).unwrap();
        assert_eq!(handle.get_option(OptionId::TTL).unwrap(), 800);
    }

    #[test]
    fn test_option_error_passes_code_through() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        let result = handle.set_option(OptionId::from_raw(99), 1);
        assert_eq!(result, Err(HandleError::Service(Status::BAD_ARG)));
        assert_eq!(handle.status(), None);
    }

    #[test]
    fn test_configure_applies_options() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        let config = ContextConfig {
            socket: Some("/run/munge/munge.socket.2".into()),
            ttl: Some(Ttl::Seconds(120)),
            uid_restriction: Some(1000),
            ..ContextConfig::default()
        };
        handle.configure(&config).unwrap();
        assert_eq!(handle.get_option(OptionId::TTL).unwrap(), 120);
        assert_eq!(handle.get_option(OptionId::UID_RESTRICTION).unwrap(), 1000);
        assert_eq!(
            handle.context.socket.as_deref(),
            Some("/run/munge/munge.socket.2")
        );
    }

    #[test]
    fn test_set_encoded_credential_rejects_nul() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.set_encoded_credential("ECHO:keep:").unwrap();
        let result = handle.set_encoded_credential("bad\0cred");
        assert!(matches!(result, Err(HandleError::InvalidInput(_))));
        assert_eq!(
            handle.encoded_credential().unwrap().to_str().unwrap(),
            "ECHO:keep:"
        );
    }

    #[test]
    fn test_take_payload_leaves_handle_empty() {
        let mut handle = Handle::<EchoContext>::create().unwrap();
        handle.set_payload(b"moved");
        let payload = handle.take_payload().unwrap();
        assert_eq!(payload.as_bytes(), b"moved");
        assert!(handle.payload().is_none());
    }
}
