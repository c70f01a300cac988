/// Outbound message API payloads
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MessageFormat {
    #[default]
    Text,
    Markdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageContent {
    pub content: String,
}

/// Body of `POST /cgi-bin/message/send`
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage {
    pub touser: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub toparty: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totag: Option<String>,
    pub msgtype: MessageFormat,
    pub agentid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<MessageContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown: Option<MessageContent>,
}

/// Message recipients. Users default to `@all` when nothing is targeted.
#[derive(Debug, Clone, Default)]
pub struct Recipients {
    pub user_ids: Vec<String>,
    pub dept_ids: Vec<String>,
    pub tag_ids: Vec<String>,
}

impl OutboundMessage {
    pub fn new(format: MessageFormat, content: &str, agentid: &str, recipients: &Recipients) -> Self {
        let join = |ids: &[String]| if ids.is_empty() { None } else { Some(ids.join("|")) };

        let toparty = join(&recipients.dept_ids);
        let totag = join(&recipients.tag_ids);
        let touser = match join(&recipients.user_ids) {
            Some(users) => users,
            None if toparty.is_none() && totag.is_none() => "@all".to_string(),
            None => String::new(),
        };

        let body = MessageContent {
            content: content.to_string(),
        };
        let (text, markdown) = match format {
            MessageFormat::Text => (Some(body), None),
            MessageFormat::Markdown => (None, Some(body)),
        };

        Self {
            touser,
            toparty,
            totag,
            msgtype: format,
            agentid: agentid.to_string(),
            text,
            markdown,
        }
    }
}

/// Common `{errcode, errmsg}` status returned by every API call
#[derive(Debug, Clone, Deserialize)]
pub struct ApiStatus {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessTokenResponse {
    #[serde(default)]
    pub errcode: i64,
    #[serde(default)]
    pub errmsg: String,
    pub access_token: Option<String>,
    pub expires_in: Option<u64>,
}

/// `POST /send` request from the control panel
#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, message = "Message content must not be empty"))]
    pub content: String,
    pub user_ids: Option<Vec<String>>,
    #[serde(default)]
    pub msgtype: MessageFormat,
}
