/// Callback credentials shared with the platform
use base64::{engine::general_purpose, Engine as _};
use std::fmt;

use super::error::CallbackError;

/// Raw AES-256 key length
pub const KEY_LEN: usize = 32;

/// Token, decoded encoding key and tenant id. Read-only after startup.
#[derive(Clone, PartialEq, Eq)]
pub struct CallbackCredentials {
    token: String,
    encoding_key: [u8; KEY_LEN],
    tenant_id: String,
}

impl CallbackCredentials {
    /// Build credentials from operator configuration
    ///
    /// `encoding_key` is base64. The platform hands out 43-character keys
    /// with the trailing `=` dropped; missing padding is restored before
    /// decoding.
    pub fn new(token: &str, encoding_key: &str, tenant_id: &str) -> Result<Self, CallbackError> {
        let key = decode_encoding_key(encoding_key)?;
        Self::from_raw_key(token, key, tenant_id)
    }

    pub fn from_raw_key(
        token: &str,
        encoding_key: [u8; KEY_LEN],
        tenant_id: &str,
    ) -> Result<Self, CallbackError> {
        if token.trim().is_empty() {
            return Err(CallbackError::Configuration("token must not be empty".to_string()));
        }
        if tenant_id.trim().is_empty() {
            return Err(CallbackError::Configuration("tenant id must not be empty".to_string()));
        }

        Ok(Self {
            token: token.to_string(),
            encoding_key,
            tenant_id: tenant_id.to_string(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn encoding_key(&self) -> &[u8; KEY_LEN] {
        &self.encoding_key
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }
}

impl fmt::Debug for CallbackCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackCredentials")
            .field("token", &"<redacted>")
            .field("encoding_key", &"<redacted>")
            .field("tenant_id", &self.tenant_id)
            .finish()
    }
}

/// Decode the operator-supplied key to exactly 32 bytes
///
/// Short or long keys are rejected rather than truncated or zero-padded.
pub fn decode_encoding_key(encoded: &str) -> Result<[u8; KEY_LEN], CallbackError> {
    let mut encoded = encoded.trim().to_string();
    if encoded.is_empty() {
        return Err(CallbackError::Configuration("encoding key must not be empty".to_string()));
    }
    while encoded.len() % 4 != 0 {
        encoded.push('=');
    }

    let bytes = general_purpose::STANDARD
        .decode(&encoded)
        .map_err(|e| CallbackError::Configuration(format!("encoding key is not valid base64: {}", e)))?;

    <[u8; KEY_LEN]>::try_from(bytes.as_slice()).map_err(|_| {
        CallbackError::Configuration(format!(
            "encoding key must decode to {} bytes, got {}",
            KEY_LEN,
            bytes.len()
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(bytes: &[u8]) -> String {
        general_purpose::STANDARD.encode(bytes)
    }

    #[test]
    fn test_decode_padded_key() {
        let key = [7u8; KEY_LEN];
        assert_eq!(decode_encoding_key(&encode(&key)).unwrap(), key);
    }

    #[test]
    fn test_decode_platform_style_key() {
        let key = [0x5Au8; KEY_LEN];
        let encoded = encode(&key);
        let unpadded = encoded.trim_end_matches('=');
        assert_eq!(unpadded.len(), 43);
        assert_eq!(decode_encoding_key(unpadded).unwrap(), key);
    }

    #[test]
    fn test_short_key_is_configuration_error() {
        let result = decode_encoding_key(&encode(&[1u8; 31]));
        assert!(matches!(result, Err(CallbackError::Configuration(_))));
    }

    #[test]
    fn test_long_key_is_configuration_error() {
        let result = decode_encoding_key(&encode(&[1u8; 33]));
        assert!(matches!(result, Err(CallbackError::Configuration(_))));
    }

    #[test]
    fn test_garbage_key_is_configuration_error() {
        assert!(matches!(
            decode_encoding_key("not base64 at all!"),
            Err(CallbackError::Configuration(_))
        ));
        assert!(matches!(decode_encoding_key("  "), Err(CallbackError::Configuration(_))));
    }

    #[test]
    fn test_empty_token_or_tenant_rejected() {
        let key = encode(&[0u8; KEY_LEN]);
        assert!(CallbackCredentials::new("", &key, "corp1").is_err());
        assert!(CallbackCredentials::new("token", &key, " ").is_err());
        assert!(CallbackCredentials::new("token", &key, "corp1").is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = CallbackCredentials::from_raw_key("s3cret-token", [9u8; KEY_LEN], "corp1").unwrap();
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("s3cret-token"));
        assert!(printed.contains("corp1"));
    }
}
