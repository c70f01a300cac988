/// Plaintext frame carried inside the encrypted callback body
///
/// Layout: `nonce(16) || [u32 BE payload length] || payload || tenant_id`.
/// The length prefix is present in `LengthPrefixed` mode only.
use std::fmt;
use std::str::FromStr;

use subtle::ConstantTimeEq;

use super::error::CallbackError;

pub const NONCE_LEN: usize = 16;
const LENGTH_PREFIX_LEN: usize = 4;

/// How the payload boundary is located inside a decrypted frame.
/// A deployment picks one; encrypt and decrypt always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameMode {
    /// Payload length is carried explicitly and the trailer must equal the
    /// tenant id byte for byte.
    #[default]
    LengthPrefixed,
    /// Everything after the nonce is the payload; the tenant id must occur
    /// in it and is stripped when it is the trailer.
    Containment,
}

impl FromStr for FrameMode {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "length-prefixed" | "strict" => Ok(FrameMode::LengthPrefixed),
            "containment" | "lenient" => Ok(FrameMode::Containment),
            other => Err(CallbackError::Configuration(format!(
                "unknown frame mode '{}', expected 'length-prefixed' or 'containment'",
                other
            ))),
        }
    }
}

impl fmt::Display for FrameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameMode::LengthPrefixed => f.write_str("length-prefixed"),
            FrameMode::Containment => f.write_str("containment"),
        }
    }
}

pub struct CallbackFrame<'a> {
    pub nonce: [u8; NONCE_LEN],
    pub payload: &'a str,
    pub tenant_id: &'a str,
}

impl CallbackFrame<'_> {
    pub fn pack(&self, mode: FrameMode) -> Result<Vec<u8>, CallbackError> {
        let payload = self.payload.as_bytes();
        let tenant = self.tenant_id.as_bytes();

        let mut out = Vec::with_capacity(NONCE_LEN + LENGTH_PREFIX_LEN + payload.len() + tenant.len());
        out.extend_from_slice(&self.nonce);
        if mode == FrameMode::LengthPrefixed {
            let len = u32::try_from(payload.len())
                .map_err(|_| CallbackError::Decode("payload too large for frame".to_string()))?;
            out.extend_from_slice(&len.to_be_bytes());
        }
        out.extend_from_slice(payload);
        out.extend_from_slice(tenant);
        Ok(out)
    }
}

/// Extract the payload from an unpadded frame and verify its tenant id
pub fn unpack(frame: &[u8], tenant_id: &str, mode: FrameMode) -> Result<String, CallbackError> {
    if frame.len() < NONCE_LEN {
        return Err(CallbackError::Decode("frame shorter than nonce".to_string()));
    }
    let body = &frame[NONCE_LEN..];

    match mode {
        FrameMode::LengthPrefixed => unpack_length_prefixed(body, tenant_id),
        FrameMode::Containment => unpack_containment(body, tenant_id),
    }
}

fn unpack_length_prefixed(body: &[u8], tenant_id: &str) -> Result<String, CallbackError> {
    if body.len() < LENGTH_PREFIX_LEN {
        return Err(CallbackError::Decode("frame missing length prefix".to_string()));
    }
    let (prefix, rest) = body.split_at(LENGTH_PREFIX_LEN);
    let payload_len = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]) as usize;

    if payload_len > rest.len() {
        return Err(CallbackError::Decode("payload length overruns frame".to_string()));
    }
    let (payload, trailer) = rest.split_at(payload_len);

    let tenant = tenant_id.as_bytes();
    if trailer.len() != tenant.len() || !bool::from(trailer.ct_eq(tenant)) {
        return Err(CallbackError::TenantMismatch);
    }

    String::from_utf8(payload.to_vec())
        .map_err(|_| CallbackError::Decode("payload is not valid UTF-8".to_string()))
}

fn unpack_containment(body: &[u8], tenant_id: &str) -> Result<String, CallbackError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| CallbackError::Decode("payload is not valid UTF-8".to_string()))?;

    if tenant_id.is_empty() || !text.contains(tenant_id) {
        return Err(CallbackError::TenantMismatch);
    }

    Ok(text.strip_suffix(tenant_id).unwrap_or(text).to_string())
}
