//! Raw libmunge declarations (`munge.h`).

#![allow(non_camel_case_types)]

use std::marker::{PhantomData, PhantomPinned};

use libc::{c_char, c_int, c_void, gid_t, uid_t};

/// Opaque libmunge context.
#[repr(C)]
pub struct munge_ctx {
    _data: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// Pointer to a libmunge context.
pub type munge_ctx_t = *mut munge_ctx;

/// libmunge error code (`munge_err_t`).
pub type munge_err_t = c_int;

#[link(name = "munge")]
extern "C" {
    /// Allocates a context; null on allocation failure.
    pub fn munge_ctx_create() -> munge_ctx_t;

    /// Releases a context.
    pub fn munge_ctx_destroy(ctx: munge_ctx_t);

    /// Description of the last error recorded in `ctx`, or null.
    pub fn munge_ctx_strerror(ctx: munge_ctx_t) -> *const c_char;

    /// Sets a context option; the variadic argument type depends on `opt`.
    pub fn munge_ctx_set(ctx: munge_ctx_t, opt: c_int, ...) -> munge_err_t;

    /// Reads a context option into the pointer passed as the variadic argument.
    pub fn munge_ctx_get(ctx: munge_ctx_t, opt: c_int, ...) -> munge_err_t;

    /// Encodes `len` bytes at `buf`; `*cred` receives a malloc'd string.
    pub fn munge_encode(
        cred: *mut *mut c_char,
        ctx: munge_ctx_t,
        buf: *const c_void,
        len: c_int,
    ) -> munge_err_t;

    /// Decodes `cred`; `*buf` receives a malloc'd payload of `*len` bytes.
    pub fn munge_decode(
        cred: *const c_char,
        ctx: munge_ctx_t,
        buf: *mut *mut c_void,
        len: *mut c_int,
        uid: *mut uid_t,
        gid: *mut gid_t,
    ) -> munge_err_t;

    /// Static description of an error code.
    pub fn munge_strerror(e: munge_err_t) -> *const c_char;
}
