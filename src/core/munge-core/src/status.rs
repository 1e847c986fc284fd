//! Result codes reported by the credential service.
//!
//! Codes are passed through unchanged; `0` is success and every other value
//! is a failure whose meaning belongs to the service.

use std::fmt;

/// A credential service result code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Status(i32);

impl Status {
    /// Success.
    pub const SUCCESS: Self = Self(0);
    /// Internal error.
    pub const SNAFU: Self = Self(1);
    /// Invalid argument.
    pub const BAD_ARG: Self = Self(2);
    /// Exceeded maximum message length.
    pub const BAD_LENGTH: Self = Self(3);
    /// Buffer overflow.
    pub const OVERFLOW: Self = Self(4);
    /// Out of memory.
    pub const NO_MEMORY: Self = Self(5);
    /// Socket communication error.
    pub const SOCKET: Self = Self(6);
    /// Socket timeout.
    pub const TIMEOUT: Self = Self(7);
    /// Invalid credential format.
    pub const BAD_CRED: Self = Self(8);
    /// Invalid credential version.
    pub const BAD_VERSION: Self = Self(9);
    /// Invalid cipher type.
    pub const BAD_CIPHER: Self = Self(10);
    /// Invalid MAC type.
    pub const BAD_MAC: Self = Self(11);
    /// Invalid compression type.
    pub const BAD_ZIP: Self = Self(12);
    /// Unrecognized security realm.
    pub const BAD_REALM: Self = Self(13);
    /// Invalid credential.
    pub const CRED_INVALID: Self = Self(14);
    /// Expired credential.
    pub const CRED_EXPIRED: Self = Self(15);
    /// Rewound credential.
    pub const CRED_REWOUND: Self = Self(16);
    /// Replayed credential.
    pub const CRED_REPLAYED: Self = Self(17);
    /// Unauthorized credential decode.
    pub const CRED_UNAUTHORIZED: Self = Self(18);

    /// Wraps a raw service code.
    pub const fn from_raw(code: i32) -> Self {
        Self(code)
    }

    /// Returns the raw service code.
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Returns true for the success code.
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Static description matching the service's own wording.
    pub fn description(self) -> &'static str {
        match self.0 {
            0 => "Success",
            1 => "Internal error",
            2 => "Invalid argument",
            3 => "Exceeded maximum message length",
            4 => "Buffer overflow",
            5 => "Out of memory",
            6 => "Socket communication error",
            7 => "Socket timeout",
            8 => "Invalid credential format",
            9 => "Invalid credential version",
            10 => "Invalid cipher type",
            11 => "Invalid MAC type",
            12 => "Invalid compression type",
            13 => "Unrecognized security realm",
            14 => "Invalid credential",
            15 => "Expired credential",
            16 => "Rewound credential",
            17 => "Replayed credential",
            18 => "Unauthorized credential decode",
            _ => "Unknown error",
        }
    }

    /// Converts into a `Result`, keeping the code on failure.
    pub fn into_result(self) -> Result<(), Status> {
        if self.is_success() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.0)
    }
}

impl From<i32> for Status {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_zero() {
        assert!(Status::SUCCESS.is_success());
        assert_eq!(Status::from_raw(0), Status::SUCCESS);
        assert!(Status::SUCCESS.into_result().is_ok());
    }

    #[test]
    fn test_nonzero_is_failure_and_passes_through() {
        for code in [1, 8, 15, 18, 42, -7] {
            let status = Status::from_raw(code);
            assert!(!status.is_success());
            assert_eq!(status.into_result(), Err(status));
            assert_eq!(status.code(), code);
        }
    }

    #[test]
    fn test_descriptions() {
        assert_eq!(Status::CRED_EXPIRED.description(), "Expired credential");
        assert_eq!(Status::BAD_CRED.description(), "Invalid credential format");
        assert_eq!(Status::from_raw(99).description(), "Unknown error");
    }

    #[test]
    fn test_display_includes_code() {
        assert_eq!(Status::CRED_REPLAYED.to_string(), "Replayed credential (17)");
    }
}
