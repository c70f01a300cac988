/// Callback request parameters and envelope formats
use serde::{Deserialize, Serialize};

use crate::security::{CallbackError, SealedMessage};

/// Query parameters the platform attaches to every callback
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub msg_signature: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub nonce: String,
    /// Present on URL verification only
    #[serde(default)]
    pub echostr: Option<String>,
}

impl CallbackQuery {
    pub fn has_signature_fields(&self) -> bool {
        !self.msg_signature.is_empty() && !self.timestamp.is_empty() && !self.nonce.is_empty()
    }

    /// All four URL-verification parameters present and non-empty
    pub fn is_url_verification(&self) -> bool {
        self.has_signature_fields() && self.echostr.as_deref().is_some_and(|e| !e.is_empty())
    }
}

/// Document format of a callback body. Replies use the request's format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyFormat {
    Xml,
    Json,
}

impl BodyFormat {
    pub fn detect(body: &str) -> Self {
        if body.trim_start().starts_with('<') {
            BodyFormat::Xml
        } else {
            BodyFormat::Json
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            BodyFormat::Xml => "application/xml; charset=utf-8",
            BodyFormat::Json => "application/json",
        }
    }

    /// Parse a document of this format into `T`
    pub fn parse<T>(&self, body: &str) -> Result<T, CallbackError>
    where
        T: for<'de> Deserialize<'de>,
    {
        match self {
            BodyFormat::Xml => quick_xml::de::from_str(body)
                .map_err(|e| CallbackError::Decode(format!("invalid xml document: {}", e))),
            BodyFormat::Json => serde_json::from_str(body)
                .map_err(|e| CallbackError::Decode(format!("invalid json document: {}", e))),
        }
    }

    /// Render `value` as a document of this format (XML root is `<xml>`)
    pub fn render<T: Serialize>(&self, value: &T) -> Result<String, CallbackError> {
        match self {
            BodyFormat::Xml => quick_xml::se::to_string_with_root("xml", value)
                .map_err(|e| CallbackError::Decode(format!("failed to render xml: {}", e))),
            BodyFormat::Json => serde_json::to_string(value)
                .map_err(|e| CallbackError::Decode(format!("failed to render json: {}", e))),
        }
    }
}

/// Encrypted message envelope posted by the platform
#[derive(Debug, Clone, Deserialize)]
pub struct EncryptedEnvelope {
    #[serde(rename = "ToUserName", default)]
    pub to_user_name: Option<String>,
    #[serde(rename = "AgentID", default)]
    pub agent_id: Option<String>,
    #[serde(rename = "Encrypt")]
    pub encrypt: String,
}

impl EncryptedEnvelope {
    pub fn parse(body: &str) -> Result<(Self, BodyFormat), CallbackError> {
        let format = BodyFormat::detect(body);
        let envelope: Self = format.parse(body)?;
        if envelope.encrypt.trim().is_empty() {
            return Err(CallbackError::Decode("envelope has an empty Encrypt field".to_string()));
        }
        Ok((envelope, format))
    }
}

/// Render a sealed reply in the given format
pub fn render_sealed(sealed: &SealedMessage, format: BodyFormat) -> Result<String, CallbackError> {
    format.render(sealed)
}
