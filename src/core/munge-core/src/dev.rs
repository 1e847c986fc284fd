//! In-process development credential service.
//!
//! `DevContext` speaks the same [`CredentialContext`] contract as the
//! libmunge binding but never talks to a daemon. Credentials are plain
//! base64 JSON with no signature or encryption: anyone can forge one.
//! Use it for tests and local development only.
//!
//! Format: `DEV:<base64(json claims)>:`

use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD, Engine};
use nix::unistd::{getegid, geteuid};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::context::{CredentialContext, Decoded};
use crate::error::HandleError;
use crate::option::{OptionId, Ttl};
use crate::secret::{EncodedCredential, SecretBuffer};
use crate::status::Status;

/// TTL applied when none is configured, in seconds.
pub const DEFAULT_TTL: u32 = 300;

/// TTL applied for [`Ttl::Maximum`], in seconds.
pub const MAXIMUM_TTL: u32 = 3600;

const PREFIX: &str = "DEV:";
const SUFFIX: char = ':';
const NONCE_SIZE: usize = 16;

/// Seconds a credential may be dated ahead of the decoder's clock.
const CLOCK_SKEW: u64 = 5;

/// Value of an identity restriction meaning "anyone".
const ANY_ID: i32 = -1;

#[derive(Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
struct Claims {
    uid: u32,
    gid: u32,
    ttl: u32,
    encoded_at: u64,
    nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uid_restriction: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gid_restriction: Option<u32>,
    payload: String,
}

/// Development context. See the module docs for its (lack of) guarantees.
#[derive(Debug, Default)]
pub struct DevContext {
    options: HashMap<i32, i32>,
    socket: Option<CString>,
    last_error: Option<(Status, String)>,
}

impl DevContext {
    /// Socket path set on this context, if any. Recorded but never used.
    pub fn socket(&self) -> Option<&CStr> {
        self.socket.as_deref()
    }

    fn fail(&mut self, status: Status, detail: impl Into<String>) -> Status {
        self.last_error = Some((status, detail.into()));
        status
    }

    fn option(&self, option: OptionId) -> Option<i32> {
        self.options.get(&option.code()).copied()
    }

    fn restriction(&self, option: OptionId) -> Option<u32> {
        self.option(option)
            .filter(|&id| id != ANY_ID)
            .map(|id| id as u32)
    }

    fn resolved_ttl(&self) -> u32 {
        match self.option(OptionId::TTL) {
            None | Some(Ttl::RAW_DEFAULT) => DEFAULT_TTL,
            Some(Ttl::RAW_MAXIMUM) => MAXIMUM_TTL,
            Some(seconds) => seconds.unsigned_abs().min(MAXIMUM_TTL),
        }
    }

    fn record_decoded(&mut self, claims: &Claims, decoded_at: u64) {
        self.options
            .insert(OptionId::TTL.code(), i32::try_from(claims.ttl).unwrap_or(i32::MAX));
        self.options
            .insert(OptionId::ENCODE_TIME.code(), clamp_time(claims.encoded_at));
        self.options
            .insert(OptionId::DECODE_TIME.code(), clamp_time(decoded_at));
        self.options.insert(
            OptionId::UID_RESTRICTION.code(),
            claims.uid_restriction.map_or(ANY_ID, |id| id as i32),
        );
        self.options.insert(
            OptionId::GID_RESTRICTION.code(),
            claims.gid_restriction.map_or(ANY_ID, |id| id as i32),
        );
    }
}

impl CredentialContext for DevContext {
    fn create() -> Result<Self, HandleError> {
        trace!("development credential context created");
        Ok(Self::default())
    }

    fn set_int(&mut self, option: OptionId, value: i32) -> Result<(), Status> {
        let rejection = match option {
            OptionId::CIPHER_TYPE if value < 0 => Some(Status::BAD_CIPHER),
            OptionId::MAC_TYPE if value < 0 => Some(Status::BAD_MAC),
            OptionId::ZIP_TYPE if value < 0 => Some(Status::BAD_ZIP),
            OptionId::TTL if value < Ttl::RAW_MAXIMUM => Some(Status::BAD_ARG),
            OptionId::CIPHER_TYPE
            | OptionId::MAC_TYPE
            | OptionId::ZIP_TYPE
            | OptionId::TTL
            | OptionId::UID_RESTRICTION
            | OptionId::GID_RESTRICTION => None,
            _ => Some(Status::BAD_ARG),
        };
        if let Some(status) = rejection {
            return Err(self.fail(status, format!("Invalid value {value} for option {option}")));
        }

        self.options.insert(option.code(), value);
        Ok(())
    }

    fn get_int(&mut self, option: OptionId) -> Result<i32, Status> {
        let default = match option {
            OptionId::CIPHER_TYPE | OptionId::MAC_TYPE | OptionId::ZIP_TYPE => 1,
            OptionId::TTL | OptionId::ENCODE_TIME | OptionId::DECODE_TIME => 0,
            OptionId::UID_RESTRICTION | OptionId::GID_RESTRICTION => ANY_ID,
            _ => {
                return Err(self.fail(
                    Status::BAD_ARG,
                    format!("Option {option} is not integer valued"),
                ))
            }
        };
        Ok(self.option(option).unwrap_or(default))
    }

    fn set_socket(&mut self, path: &CStr) -> Result<(), Status> {
        self.socket = Some(path.to_owned());
        Ok(())
    }

    fn encode(&mut self, payload: &[u8]) -> Result<EncodedCredential, Status> {
        if i32::try_from(payload.len()).is_err() {
            return Err(self.fail(Status::BAD_LENGTH, "Payload exceeds maximum length"));
        }

        let mut nonce = Zeroizing::new([0u8; NONCE_SIZE]);
        OsRng.fill_bytes(nonce.as_mut_slice());

        let claims = Claims {
            uid: geteuid().as_raw(),
            gid: getegid().as_raw(),
            ttl: self.resolved_ttl(),
            encoded_at: now(),
            nonce: STANDARD.encode(nonce.as_slice()),
            uid_restriction: self.restriction(OptionId::UID_RESTRICTION),
            gid_restriction: self.restriction(OptionId::GID_RESTRICTION),
            payload: STANDARD.encode(payload),
        };
        self.options
            .insert(OptionId::ENCODE_TIME.code(), clamp_time(claims.encoded_at));

        seal(&claims).map_err(|status| self.fail(status, "Failed to serialize credential"))
    }

    fn decode(&mut self, credential: Option<&CStr>) -> Result<Decoded, Status> {
        let Some(credential) = credential else {
            return Err(self.fail(Status::BAD_ARG, "No credential specified"));
        };
        let text = credential
            .to_str()
            .map_err(|_| self.fail(Status::BAD_CRED, "Credential is not ASCII"))?;
        let claims = open(text).map_err(|status| self.fail(status, "Failed to parse credential"))?;
        let payload = Zeroizing::new(
            STANDARD
                .decode(&claims.payload)
                .map_err(|_| self.fail(Status::BAD_CRED, "Failed to decode payload"))?,
        );

        let decoded_at = now();
        self.record_decoded(&claims, decoded_at);

        if claims.encoded_at > decoded_at + CLOCK_SKEW {
            return Err(self.fail(Status::CRED_REWOUND, "Rewound credential"));
        }
        if decoded_at > claims.encoded_at + u64::from(claims.ttl) {
            return Err(self.fail(Status::CRED_EXPIRED, "Expired credential"));
        }
        let uid = geteuid().as_raw();
        let gid = getegid().as_raw();
        if claims.uid_restriction.is_some_and(|id| id != uid)
            || claims.gid_restriction.is_some_and(|id| id != gid)
        {
            return Err(self.fail(
                Status::CRED_UNAUTHORIZED,
                format!("Unauthorized credential decode for UID={uid} GID={gid}"),
            ));
        }

        Ok(Decoded {
            payload: (!payload.is_empty()).then(|| SecretBuffer::from_slice(&payload)),
            uid: claims.uid,
            gid: claims.gid,
        })
    }

    fn describe(&self, status: Status) -> String {
        match &self.last_error {
            Some((last, detail)) if *last == status => detail.clone(),
            _ => status.description().to_owned(),
        }
    }
}

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

fn clamp_time(secs: u64) -> i32 {
    i32::try_from(secs).unwrap_or(i32::MAX)
}

fn seal(claims: &Claims) -> Result<EncodedCredential, Status> {
    let json = Zeroizing::new(serde_json::to_vec(claims).map_err(|_| Status::SNAFU)?);
    let body = Zeroizing::new(STANDARD.encode(json.as_slice()));
    EncodedCredential::new(format!("{PREFIX}{}{SUFFIX}", body.as_str())).map_err(|_| Status::SNAFU)
}

fn open(text: &str) -> Result<Claims, Status> {
    let body = text
        .strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .ok_or(Status::BAD_CRED)?;
    let json = Zeroizing::new(STANDARD.decode(body).map_err(|_| Status::BAD_CRED)?);
    serde_json::from_slice(&json).map_err(|_| Status::BAD_CRED)
}
