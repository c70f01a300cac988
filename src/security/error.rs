/// Error taxonomy for the callback protocol
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    /// Request not authentic. Terminal for the request, never retried.
    #[error("signature mismatch")]
    SignatureMismatch,

    /// Malformed base64/hex input or a frame that does not parse
    #[error("decode error: {0}")]
    Decode(String),

    /// Block alignment or key failure during the symmetric transform
    #[error("cipher error: {0}")]
    Cipher(String),

    #[error("invalid PKCS#7 padding")]
    Padding,

    /// Decrypted frame does not reference the configured tenant
    #[error("tenant id mismatch")]
    TenantMismatch,

    /// Missing or malformed credentials at startup
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CallbackError {
    /// True for every failure on the decryption path. These are all reported
    /// to the caller as the same outcome.
    pub fn is_decryption_failure(&self) -> bool {
        matches!(
            self,
            CallbackError::Decode(_)
                | CallbackError::Cipher(_)
                | CallbackError::Padding
                | CallbackError::TenantMismatch
        )
    }

    /// Text returned to the external caller. Decryption failures collapse into
    /// one message so the response cannot be used as a padding oracle.
    pub fn public_message(&self) -> &'static str {
        match self {
            CallbackError::SignatureMismatch => "signature verification failed",
            CallbackError::Configuration(_) => "callback endpoint is not configured",
            _ => "decryption failed",
        }
    }
}

impl ResponseError for CallbackError {
    fn status_code(&self) -> StatusCode {
        match self {
            CallbackError::SignatureMismatch => StatusCode::UNAUTHORIZED,
            CallbackError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.public_message())
    }
}
