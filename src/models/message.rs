/// Decrypted callback content and passive replies
use serde::{Deserialize, Serialize};

use super::callback::BodyFormat;
use crate::security::CallbackError;

/// Message or event delivered by the platform, after decryption
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IncomingMessage {
    #[serde(rename = "ToUserName", default)]
    pub to_user_name: String,
    #[serde(rename = "FromUserName", default)]
    pub from_user_name: String,
    #[serde(rename = "CreateTime", default)]
    pub create_time: Option<i64>,
    #[serde(rename = "MsgType", default)]
    pub msg_type: String,
    #[serde(rename = "Content", default)]
    pub content: Option<String>,
    #[serde(rename = "Event", default)]
    pub event: Option<String>,
    #[serde(rename = "MsgId", default)]
    pub msg_id: Option<String>,
    #[serde(rename = "AgentID", default)]
    pub agent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageKind<'a> {
    Text(&'a str),
    Event(&'a str),
    Other(&'a str),
}

impl IncomingMessage {
    pub fn parse(plaintext: &str, format: BodyFormat) -> Result<Self, CallbackError> {
        format.parse(plaintext)
    }

    pub fn kind(&self) -> MessageKind<'_> {
        match self.msg_type.as_str() {
            "text" => MessageKind::Text(self.content.as_deref().unwrap_or_default()),
            "event" => MessageKind::Event(self.event.as_deref().unwrap_or_default()),
            other => MessageKind::Other(other),
        }
    }
}

/// Passive text reply, encrypted before it is returned
#[derive(Debug, Clone, Serialize)]
pub struct ReplyMessage {
    #[serde(rename = "ToUserName")]
    pub to_user_name: String,
    #[serde(rename = "FromUserName")]
    pub from_user_name: String,
    #[serde(rename = "CreateTime")]
    pub create_time: i64,
    #[serde(rename = "MsgType")]
    pub msg_type: String,
    #[serde(rename = "Content")]
    pub content: String,
}

impl ReplyMessage {
    /// Reply to `incoming` with swapped sender and recipient
    pub fn text(incoming: &IncomingMessage, content: String, create_time: i64) -> Self {
        Self {
            to_user_name: incoming.from_user_name.clone(),
            from_user_name: incoming.to_user_name.clone(),
            create_time,
            msg_type: "text".to_string(),
            content,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_text_xml() {
        let xml = "<xml><ToUserName><![CDATA[corp1]]></ToUserName>\
                   <FromUserName><![CDATA[alice]]></FromUserName>\
                   <CreateTime>1700000000</CreateTime>\
                   <MsgType><![CDATA[text]]></MsgType>\
                   <Content><![CDATA[请发送信息更新]]></Content>\
                   <MsgId>1234567890</MsgId><AgentID>1000002</AgentID></xml>";
        let msg = IncomingMessage::parse(xml, BodyFormat::Xml).unwrap();
        assert_eq!(msg.from_user_name, "alice");
        assert_eq!(msg.create_time, Some(1700000000));
        assert_eq!(msg.kind(), MessageKind::Text("请发送信息更新"));
    }

    #[test]
    fn test_parse_event_json() {
        let json = r#"{"ToUserName":"corp1","FromUserName":"bob","MsgType":"event","Event":"subscribe"}"#;
        let msg = IncomingMessage::parse(json, BodyFormat::Json).unwrap();
        assert_eq!(msg.kind(), MessageKind::Event("subscribe"));
    }

    #[test]
    fn test_unknown_type() {
        let json = r#"{"MsgType":"image","FromUserName":"bob"}"#;
        let msg = IncomingMessage::parse(json, BodyFormat::Json).unwrap();
        assert_eq!(msg.kind(), MessageKind::Other("image"));
    }

    #[test]
    fn test_reply_swaps_parties() {
        let incoming = IncomingMessage {
            to_user_name: "corp1".to_string(),
            from_user_name: "alice".to_string(),
            msg_type: "text".to_string(),
            ..Default::default()
        };
        let reply = ReplyMessage::text(&incoming, "2".to_string(), 1700000001);
        assert_eq!(reply.to_user_name, "alice");
        assert_eq!(reply.from_user_name, "corp1");

        let xml = BodyFormat::Xml.render(&reply).unwrap();
        assert!(xml.contains("<Content>2</Content>"));
        assert!(xml.contains("<MsgType>text</MsgType>"));
    }
}
