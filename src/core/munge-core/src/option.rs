//! Context option identifiers and the time-to-live type.

use std::fmt;

use serde::Deserialize;

use crate::error::CredentialError;

/// Identifier of a service context option.
///
/// Values are forwarded to the service without range checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptionId(i32);

impl OptionId {
    /// Symmetric cipher type.
    pub const CIPHER_TYPE: Self = Self(0);
    /// MAC type.
    pub const MAC_TYPE: Self = Self(1);
    /// Compression type.
    pub const ZIP_TYPE: Self = Self(2);
    /// Security realm (string valued).
    pub const REALM: Self = Self(3);
    /// Time-to-live in seconds.
    pub const TTL: Self = Self(4);
    /// Source IPv4 address (address valued).
    pub const ADDR4: Self = Self(5);
    /// Time the credential was encoded.
    pub const ENCODE_TIME: Self = Self(6);
    /// Time the credential was decoded.
    pub const DECODE_TIME: Self = Self(7);
    /// Path of the daemon socket (string valued).
    pub const SOCKET: Self = Self(8);
    /// UID allowed to decode.
    pub const UID_RESTRICTION: Self = Self(9);
    /// GID allowed to decode.
    pub const GID_RESTRICTION: Self = Self(10);

    /// Wraps a raw option id.
    pub const fn from_raw(id: i32) -> Self {
        Self(id)
    }

    /// Returns the raw option id.
    pub const fn code(self) -> i32 {
        self.0
    }

    /// Options whose value is a pointer rather than an integer.
    pub const fn is_pointer_valued(self) -> bool {
        matches!(self.0, 3 | 5 | 8)
    }

    /// Options whose value is a `time_t` rather than an `int`.
    pub const fn is_time_valued(self) -> bool {
        matches!(self.0, 6 | 7)
    }
}

impl fmt::Display for OptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            0 => "cipher-type",
            1 => "mac-type",
            2 => "zip-type",
            3 => "realm",
            4 => "ttl",
            5 => "addr4",
            6 => "encode-time",
            7 => "decode-time",
            8 => "socket",
            9 => "uid-restriction",
            10 => "gid-restriction",
            other => return write!(f, "option-{other}"),
        };
        f.write_str(name)
    }
}

/// Credential time-to-live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "i32")]
pub enum Ttl {
    /// Use the service default.
    #[default]
    Default,
    /// Use the maximum the service allows.
    Maximum,
    /// Explicit number of seconds. `Seconds(0)` means the same as
    /// [`Ttl::Default`]; [`Ttl::seconds`] and [`Ttl::normalized`] fold it.
    Seconds(u32),
}

impl Ttl {
    /// Service value meaning "default".
    pub const RAW_DEFAULT: i32 = 0;
    /// Service value meaning "maximum".
    pub const RAW_MAXIMUM: i32 = -1;

    /// Explicit TTL; zero seconds is the service default.
    pub const fn seconds(n: u32) -> Self {
        Self::Seconds(n).normalized()
    }

    /// Folds `Seconds(0)` into `Default`.
    #[must_use]
    pub const fn normalized(self) -> Self {
        match self {
            Self::Seconds(0) => Self::Default,
            other => other,
        }
    }

    /// Parses a raw service value, rejecting anything below `-1`.
    pub fn from_raw(raw: i32) -> Result<Self, CredentialError> {
        match raw {
            Self::RAW_DEFAULT => Ok(Self::Default),
            Self::RAW_MAXIMUM => Ok(Self::Maximum),
            n if n > 0 => Ok(Self::Seconds(n.unsigned_abs())),
            n => Err(CredentialError::InvalidTtl(n)),
        }
    }

    /// Returns the raw service value.
    pub fn as_raw(self) -> i32 {
        match self {
            Self::Default => Self::RAW_DEFAULT,
            Self::Maximum => Self::RAW_MAXIMUM,
            Self::Seconds(n) => i32::try_from(n).unwrap_or(i32::MAX),
        }
    }
}

impl TryFrom<i32> for Ttl {
    type Error = CredentialError;

    fn try_from(raw: i32) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}
