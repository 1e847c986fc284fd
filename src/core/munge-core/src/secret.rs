//! Owned secret buffers that erase their contents before release.
//!
//! Erasure goes through `zeroize`, whose volatile writes cannot be removed
//! as dead stores.

use std::ffi::{CStr, CString};
use std::fmt;
use std::io::{self, Read};

use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::HandleError;

/// Overwrites every byte of `buf` with zero.
pub fn secure_erase(buf: &mut [u8]) {
    buf.zeroize();
}

const READ_CHUNK: usize = 4096;

/// Reads `reader` to the end into a zeroizing buffer.
///
/// `size_hint` sizes the first allocation. When the data outgrows it, the
/// bytes move into a fresh buffer and the outgrown one is erased before it
/// is freed, so no intermediate block is released with secret contents.
///
/// # Errors
///
/// Returns the first I/O error other than [`io::ErrorKind::Interrupted`].
pub fn read_to_secret<R: Read>(
    mut reader: R,
    size_hint: usize,
) -> io::Result<Zeroizing<Vec<u8>>> {
    let mut buf = Zeroizing::new(Vec::with_capacity(size_hint.max(READ_CHUNK)));
    let mut chunk = Zeroizing::new([0u8; READ_CHUNK]);

    loop {
        let n = match reader.read(chunk.as_mut_slice()) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if buf.len() + n > buf.capacity() {
            let wanted = (buf.len() + n).max(buf.capacity().saturating_mul(2));
            let mut grown = Zeroizing::new(Vec::with_capacity(wanted));
            grown.extend_from_slice(&buf);
            buf = grown;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    Ok(buf)
}

/// Plaintext payload bytes, zeroed when dropped or replaced.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct SecretBuffer {
    bytes: Vec<u8>,
}

impl SecretBuffer {
    /// Takes ownership of `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Copies `bytes` into a new buffer.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the plaintext bytes.
    ///
    /// The returned slice is not erased on its own; copies are the caller's.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true when the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<Vec<u8>> for SecretBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretBuffer")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// An encoded credential string, stored nul-terminated.
pub struct EncodedCredential {
    inner: CString,
}

impl EncodedCredential {
    /// Builds a credential from a string.
    ///
    /// An owned `String` is erased once its text has been copied.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidInput`] if the string contains a NUL byte.
    pub fn new(credential: impl Into<String>) -> Result<Self, HandleError> {
        let credential = Zeroizing::new(credential.into());
        Self::from_text(&credential)
    }

    /// Copies a credential out of a borrowed string.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidInput`] if the string contains a NUL byte.
    pub fn from_text(credential: &str) -> Result<Self, HandleError> {
        // Room for the terminator up front: CString::new must not reallocate.
        let mut bytes = Zeroizing::new(Vec::with_capacity(credential.len() + 1));
        bytes.extend_from_slice(credential.as_bytes());

        match CString::new(std::mem::take(&mut *bytes)) {
            Ok(inner) => Ok(Self { inner }),
            Err(e) => {
                let position = e.nul_position();
                let mut rejected = e.into_vec();
                rejected.zeroize();
                Err(HandleError::InvalidInput(format!(
                    "credential contains a NUL byte at position {position}"
                )))
            }
        }
    }

    /// Copies a credential out of a C string.
    pub fn from_c_str(credential: &CStr) -> Self {
        Self {
            inner: credential.to_owned(),
        }
    }

    /// Returns the credential as a C string.
    #[inline]
    pub fn as_c_str(&self) -> &CStr {
        &self.inner
    }

    /// Returns the credential text.
    ///
    /// # Errors
    ///
    /// Returns [`HandleError::InvalidInput`] if the bytes are not UTF-8.
    pub fn to_str(&self) -> Result<&str, HandleError> {
        self.inner
            .to_str()
            .map_err(|e| HandleError::InvalidInput(format!("credential is not UTF-8: {e}")))
    }

    /// Length in bytes, excluding the terminator.
    pub fn len(&self) -> usize {
        self.inner.as_bytes().len()
    }

    /// Returns true for an empty credential string.
    pub fn is_empty(&self) -> bool {
        self.inner.as_bytes().is_empty()
    }
}

impl Drop for EncodedCredential {
    fn drop(&mut self) {
        let mut bytes = std::mem::take(&mut self.inner).into_bytes_with_nul();
        secure_erase(&mut bytes);
    }
}

impl fmt::Debug for EncodedCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncodedCredential")
            .field("len", &self.len())
            .field("credential", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secure_erase_zeroes_every_byte() {
        let mut buf = *b"hunter2-but-longer";
        secure_erase(&mut buf);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_secure_erase_empty() {
        let mut buf: [u8; 0] = [];
        secure_erase(&mut buf);
    }

    #[test]
    fn test_secret_buffer_zeroize() {
        let mut secret = SecretBuffer::from_slice(b"payload");
        assert_eq!(secret.len(), 7);
        secret.zeroize();
        assert!(secret.is_empty());
    }

    #[test]
    fn test_secret_buffer_debug_redacted() {
        let secret = SecretBuffer::from_slice(b"swordfish");
        let debug_str = format!("{:?}", secret);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("swordfish"));
    }

    #[test]
    fn test_encoded_credential_roundtrip_text() {
        let cred = EncodedCredential::new("MUNGE:AwQDAAB:").unwrap();
        assert_eq!(cred.to_str().unwrap(), "MUNGE:AwQDAAB:");
        assert_eq!(cred.len(), 14);
        assert_eq!(cred.as_c_str().to_bytes_with_nul().last(), Some(&0));
    }

    #[test]
    fn test_encoded_credential_rejects_interior_nul() {
        let result = EncodedCredential::new("MUNGE:\0tail");
        assert!(matches!(result, Err(HandleError::InvalidInput(_))));
    }

    #[test]
    fn test_encoded_credential_from_text_rejects_interior_nul() {
        let result = EncodedCredential::from_text("MUNGE:abc\0");
        assert!(matches!(result, Err(HandleError::InvalidInput(_))));
        assert_eq!(
            EncodedCredential::from_text("MUNGE:abc:").unwrap().to_str().unwrap(),
            "MUNGE:abc:"
        );
    }

    #[test]
    fn test_read_to_secret_grows_past_hint() {
        let source: Vec<u8> = (0..3 * READ_CHUNK + 17).map(|i| (i % 251) as u8).collect();
        let buf = read_to_secret(source.as_slice(), 0).unwrap();
        assert_eq!(buf.as_slice(), source.as_slice());
    }

    #[test]
    fn test_read_to_secret_exact_hint_keeps_allocation() {
        let source = vec![7u8; 10_000];
        let buf = read_to_secret(source.as_slice(), source.len()).unwrap();
        assert_eq!(buf.len(), 10_000);
        assert_eq!(buf.capacity(), 10_000);
    }

    #[test]
    fn test_read_to_secret_retries_interrupted() {
        struct Flaky {
            interrupted: bool,
            data: &'static [u8],
        }

        impl Read for Flaky {
            fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
                if !self.interrupted {
                    self.interrupted = true;
                    return Err(io::ErrorKind::Interrupted.into());
                }
                self.data.read(out)
            }
        }

        let reader = Flaky {
            interrupted: false,
            data: b"after interrupt",
        };
        let buf = read_to_secret(reader, 0).unwrap();
        assert_eq!(buf.as_slice(), b"after interrupt");
    }

    #[test]
    fn test_read_to_secret_propagates_errors() {
        struct Broken;

        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::ErrorKind::PermissionDenied.into())
            }
        }

        let err = read_to_secret(Broken, 0).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn test_encoded_credential_from_c_str() {
        let cred = EncodedCredential::from_c_str(c"MUNGE:xyz:");
        assert_eq!(cred.to_str().unwrap(), "MUNGE:xyz:");
        assert!(!cred.is_empty());
    }

    #[test]
    fn test_encoded_credential_debug_redacted() {
        let cred = EncodedCredential::new("MUNGE:secret:").unwrap();
        let debug_str = format!("{:?}", cred);
        assert!(debug_str.contains("[REDACTED]"));
        assert!(!debug_str.contains("secret:"));
    }
}
