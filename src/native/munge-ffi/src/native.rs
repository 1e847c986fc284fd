//! Owned views of buffers a C library hands over with `malloc(3)`.
//!
//! Both types erase their bytes before calling `free(3)`.

use std::ffi::{c_char, c_void, CStr};
use std::ptr::NonNull;

use munge_core::secure_erase;

/// A `malloc`ed byte buffer with a known length.
pub struct NativeBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl NativeBuffer {
    /// Takes ownership of `ptr`. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `malloc` (or a compatible allocator),
    /// be valid for reads and writes of `len` bytes, and not be freed by
    /// anyone else.
    pub unsafe fn from_raw(ptr: *mut c_void, len: usize) -> Option<Self> {
        NonNull::new(ptr.cast::<u8>()).map(|ptr| Self { ptr, len })
    }

    /// Returns the buffer contents.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `from_raw` guarantees `len` readable bytes at `ptr`.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true when the buffer holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for NativeBuffer {
    fn drop(&mut self) {
        // SAFETY: we own the block and it is writable for `len` bytes.
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) };
        secure_erase(bytes);
        // SAFETY: the block came from malloc and is freed exactly once here.
        unsafe { libc::free(self.ptr.as_ptr().cast()) };
    }
}

/// A `malloc`ed nul-terminated string.
pub struct NativeString {
    ptr: NonNull<c_char>,
}

impl NativeString {
    /// Takes ownership of `ptr`. Returns `None` for a null pointer.
    ///
    /// # Safety
    ///
    /// A non-null `ptr` must come from `malloc`, point to a nul-terminated
    /// string that is writable up to and including the terminator, and not be
    /// freed by anyone else.
    pub unsafe fn from_raw(ptr: *mut c_char) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr })
    }

    /// Returns the string.
    pub fn as_c_str(&self) -> &CStr {
        // SAFETY: `from_raw` guarantees a valid nul-terminated string.
        unsafe { CStr::from_ptr(self.ptr.as_ptr()) }
    }
}

impl Drop for NativeString {
    fn drop(&mut self) {
        let len = self.as_c_str().to_bytes().len();
        // SAFETY: we own the string; it is writable for `len` bytes before the nul.
        let bytes = unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr().cast::<u8>(), len) };
        secure_erase(bytes);
        // SAFETY: the block came from malloc and is freed exactly once here.
        unsafe { libc::free(self.ptr.as_ptr().cast()) };
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn malloc_copy(bytes: &[u8]) -> *mut c_void {
        // SAFETY: allocation of at least one byte; copy stays in bounds.
        unsafe {
            let ptr = libc::malloc(bytes.len().max(1));
            assert!(!ptr.is_null());
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.cast::<u8>(), bytes.len());
            ptr
        }
    }

    #[test]
    fn test_null_buffer_is_none() {
        // SAFETY: null is always accepted.
        let buffer = unsafe { NativeBuffer::from_raw(std::ptr::null_mut(), 16) };
        assert!(buffer.is_none());
    }

    #[test]
    fn test_buffer_contents() {
        let ptr = malloc_copy(b"native payload");
        // SAFETY: fresh malloc block of 14 bytes, owned by the test.
        let buffer = unsafe { NativeBuffer::from_raw(ptr, 14) }.unwrap();
        assert_eq!(buffer.as_bytes(), b"native payload");
        assert_eq!(buffer.len(), 14);
        assert!(!buffer.is_empty());
    }

    #[test]
    fn test_null_string_is_none() {
        // SAFETY: null is always accepted.
        let string = unsafe { NativeString::from_raw(std::ptr::null_mut()) };
        assert!(string.is_none());
    }

    #[test]
    fn test_string_contents() {
        let ptr = malloc_copy(b"MUNGE:AwQFAAA:\0");
        // SAFETY: fresh malloc block holding a nul-terminated string.
        let string = unsafe { NativeString::from_raw(ptr.cast()) }.unwrap();
        assert_eq!(string.as_c_str(), c"MUNGE:AwQFAAA:");
    }
}
