//! libmunge-backed [`CredentialContext`].

use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr::{self, NonNull};

use libc::{gid_t, uid_t};
use munge_core::{
    CredentialContext, Decoded, EncodedCredential, HandleError, OptionId, SecretBuffer, Status,
};
use tracing::{debug, trace};

use crate::native::{NativeBuffer, NativeString};
use crate::sys;

/// A libmunge context, destroyed with `munge_ctx_destroy` on drop.
pub struct MungeContext {
    ctx: NonNull<sys::munge_ctx>,
}

impl MungeContext {
    fn as_ptr(&self) -> sys::munge_ctx_t {
        self.ctx.as_ptr()
    }
}

fn check(rc: sys::munge_err_t) -> Result<(), Status> {
    Status::from_raw(rc).into_result()
}

impl CredentialContext for MungeContext {
    fn create() -> Result<Self, HandleError> {
        // SAFETY: no preconditions; returns null when allocation fails.
        let ctx = unsafe { sys::munge_ctx_create() };
        let ctx = NonNull::new(ctx).ok_or(HandleError::Allocation)?;
        debug!("munge context created");
        Ok(Self { ctx })
    }

    fn set_int(&mut self, option: OptionId, value: i32) -> Result<(), Status> {
        // libmunge reads a pointer for these; an int in that slot is undefined behavior.
        if option.is_pointer_valued() {
            return Err(Status::BAD_ARG);
        }
        // SAFETY: live context; integer options take an int vararg.
        let rc = unsafe { sys::munge_ctx_set(self.as_ptr(), option.code(), value) };
        check(rc)
    }

    fn get_int(&mut self, option: OptionId) -> Result<i32, Status> {
        // libmunge writes a pointer for these; there is no integer to read back.
        if option.is_pointer_valued() {
            return Err(Status::BAD_ARG);
        }
        if option.is_time_valued() {
            let mut time: libc::time_t = 0;
            // SAFETY: live context; time options write a time_t through the pointer.
            let rc = unsafe {
                sys::munge_ctx_get(self.as_ptr(), option.code(), ptr::addr_of_mut!(time))
            };
            check(rc)?;
            return time_to_int(time);
        }

        let mut value: c_int = 0;
        // SAFETY: live context; int and uid/gid options write an int-sized value.
        let rc = unsafe {
            sys::munge_ctx_get(self.as_ptr(), option.code(), ptr::addr_of_mut!(value))
        };
        check(rc)?;
        Ok(value)
    }

    fn set_socket(&mut self, path: &CStr) -> Result<(), Status> {
        // SAFETY: live context; libmunge copies the nul-terminated path.
        let rc = unsafe {
            sys::munge_ctx_set(
                self.as_ptr(),
                OptionId::SOCKET.code(),
                path.as_ptr(),
            )
        };
        check(rc)
    }

    fn encode(&mut self, payload: &[u8]) -> Result<EncodedCredential, Status> {
        let len = c_int::try_from(payload.len()).map_err(|_| Status::BAD_LENGTH)?;
        let buf: *const c_void = if payload.is_empty() {
            ptr::null()
        } else {
            payload.as_ptr().cast()
        };
        let mut cred: *mut c_char = ptr::null_mut();

        // SAFETY: live context; `buf` is valid for `len` bytes or null with len 0.
        let rc = unsafe { sys::munge_encode(&mut cred, self.as_ptr(), buf, len) };
        // SAFETY: libmunge leaves `cred` null or pointing at a malloc'd string we now own.
        let cred = unsafe { NativeString::from_raw(cred) };
        check(rc)?;

        let cred = cred.ok_or(Status::SNAFU)?;
        trace!(len = cred.as_c_str().to_bytes().len(), "munge credential encoded");
        Ok(EncodedCredential::from_c_str(cred.as_c_str()))
    }

    fn decode(&mut self, credential: Option<&CStr>) -> Result<Decoded, Status> {
        let cred = credential.map_or(ptr::null(), CStr::as_ptr);
        let mut buf: *mut c_void = ptr::null_mut();
        let mut len: c_int = 0;
        let mut uid: uid_t = 0;
        let mut gid: gid_t = 0;

        // SAFETY: live context; `cred` is null or nul-terminated; out-pointers are valid.
        let rc = unsafe {
            sys::munge_decode(cred, self.as_ptr(), &mut buf, &mut len, &mut uid, &mut gid)
        };
        let len = usize::try_from(len).unwrap_or(0);
        // SAFETY: libmunge leaves `buf` null or pointing at `len` malloc'd bytes we now own.
        let payload = unsafe { NativeBuffer::from_raw(buf, len) };
        check(rc)?;

        Ok(Decoded {
            payload: payload
                .filter(|p| !p.is_empty())
                .map(|p| SecretBuffer::from_slice(p.as_bytes())),
            uid,
            gid,
        })
    }

    fn describe(&self, status: Status) -> String {
        // SAFETY: live context; the returned string is owned by libmunge.
        let mut msg = unsafe { sys::munge_ctx_strerror(self.as_ptr()) };
        if msg.is_null() {
            // SAFETY: returns a static string for any code.
            msg = unsafe { sys::munge_strerror(status.code()) };
        }
        if msg.is_null() {
            return status.description().to_owned();
        }
        // SAFETY: non-null strings from libmunge are nul-terminated.
        unsafe { CStr::from_ptr(msg) }
            .to_string_lossy()
            .into_owned()
    }
}

/// Narrows a libmunge timestamp, reporting `OVERFLOW` past `i32::MAX`.
fn time_to_int(time: libc::time_t) -> Result<i32, Status> {
    i32::try_from(time).map_err(|_| Status::OVERFLOW)
}

impl Drop for MungeContext {
    fn drop(&mut self) {
        // SAFETY: the context is live and destroyed exactly once here.
        unsafe { sys::munge_ctx_destroy(self.as_ptr()) };
        trace!("munge context destroyed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_to_int_in_range() {
        assert_eq!(time_to_int(0), Ok(0));
        assert_eq!(time_to_int(1_700_000_000), Ok(1_700_000_000));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_time_to_int_overflow() {
        let past_2038 = libc::time_t::from(i32::MAX) + 1;
        assert_eq!(time_to_int(past_2038), Err(Status::OVERFLOW));
    }
}
