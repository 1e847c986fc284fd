//! Credential service seam.

use std::ffi::CStr;

use crate::error::HandleError;
use crate::option::OptionId;
use crate::secret::{EncodedCredential, SecretBuffer};
use crate::status::Status;

/// Output of a successful decode.
#[derive(Debug)]
pub struct Decoded {
    /// Recovered payload, absent when the credential carried none.
    pub payload: Option<SecretBuffer>,
    /// UID of the encoding process.
    pub uid: u32,
    /// GID of the encoding process.
    pub gid: u32,
}

/// A context owned by one [`Handle`](crate::Handle) for one credential service.
///
/// Dropping the context performs the service's own teardown exactly once.
/// Failures carry the service's [`Status`] unchanged.
pub trait CredentialContext: Sized {
    /// Creates a fresh context.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::Allocation`] if the service cannot allocate one.
    fn create() -> Result<Self, HandleError>;

    /// Sets an integer option.
    fn set_int(&mut self, option: OptionId, value: i32) -> Result<(), Status>;

    /// Reads an integer option.
    ///
    /// Timestamp options are narrowed to `i32`; a value that does not fit is
    /// reported as [`Status::OVERFLOW`]. String and address options have no
    /// integer value.
    fn get_int(&mut self, option: OptionId) -> Result<i32, Status>;

    /// Points the context at a daemon socket.
    fn set_socket(&mut self, path: &CStr) -> Result<(), Status>;

    /// Encodes `payload` into a credential.
    fn encode(&mut self, payload: &[u8]) -> Result<EncodedCredential, Status>;

    /// Decodes a credential. `None` is forwarded for the service to reject.
    fn decode(&mut self, credential: Option<&CStr>) -> Result<Decoded, Status>;

    /// Human-readable description of `status`, preferring context detail.
    fn describe(&self, status: Status) -> String {
        status.description().to_owned()
    }
}
