// Common test utilities for server integration tests

use actix_web::web;
use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::sync::Arc;

use wecom_callback::config::AppConfig;
use wecom_callback::handlers;
use wecom_callback::security::{sign, CallbackCodec};
use wecom_callback::services::{MessageDispatcher, SchedulerHandle, WeComClient};

pub const TOKEN: &str = "QDG6eK";
pub const CORP_ID: &str = "wx5823bf96d3bd56c7";
pub const TIMESTAMP: &str = "1409659813";
pub const NONCE: &str = "1372623149";

/// Environment for a test deployment. The API base points at a closed port
/// so nothing leaves the machine.
pub fn test_env() -> HashMap<&'static str, String> {
    let key = general_purpose::STANDARD.encode([0x42u8; 32]);
    HashMap::from([
        ("WECHAT_CORPID", CORP_ID.to_string()),
        ("WECHAT_CORPSECRET", "test-secret".to_string()),
        ("WECHAT_AGENTID", "1000002".to_string()),
        ("WECHAT_TOKEN", TOKEN.to_string()),
        ("WECHAT_ENCODING_AES_KEY", key.trim_end_matches('=').to_string()),
        ("WECOM_API_BASE", "http://127.0.0.1:9".to_string()),
        ("TIMER_AUTOSTART", "false".to_string()),
    ])
}

pub fn load_config(env: &HashMap<&'static str, String>) -> AppConfig {
    AppConfig::from_lookup(|key| env.get(key).cloned()).expect("test config should load")
}

/// Shared application state, registered the same way the binary does it
pub struct TestState {
    pub codec: web::Data<CallbackCodec>,
    pub client: web::Data<WeComClient>,
    pub dispatcher: web::Data<MessageDispatcher>,
    pub scheduler: web::Data<SchedulerHandle>,
    pub config: web::Data<AppConfig>,
}

impl TestState {
    pub fn new(config: AppConfig) -> Self {
        let codec = CallbackCodec::new(config.callback.clone(), config.frame_mode);
        let client = Arc::new(WeComClient::new(config.wecom.clone()).expect("client should build"));
        let scheduler = SchedulerHandle::spawn(
            client.clone(),
            config.timer.interval,
            config.timer.message.clone(),
        );

        Self {
            codec: web::Data::new(codec),
            client: web::Data::from(client),
            dispatcher: web::Data::new(MessageDispatcher::with_defaults()),
            scheduler: web::Data::new(scheduler),
            config: web::Data::new(config),
        }
    }

    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.codec.clone())
            .app_data(self.client.clone())
            .app_data(self.dispatcher.clone())
            .app_data(self.scheduler.clone())
            .app_data(self.config.clone());
        handlers::configure(cfg, self.config.admin_token.as_deref());
    }

    /// Codec with the same credentials, standing in for the platform side
    pub fn platform(&self) -> CallbackCodec {
        CallbackCodec::new(self.config.callback.clone(), self.config.frame_mode)
    }
}

/// Query string for a signed callback over `encrypted`
pub fn signed_query(encrypted: &str) -> String {
    format!(
        "msg_signature={}&timestamp={}&nonce={}",
        sign(TOKEN, TIMESTAMP, NONCE, encrypted),
        TIMESTAMP,
        NONCE
    )
}

pub fn text_message_xml(content: &str) -> String {
    format!(
        "<xml><ToUserName><![CDATA[{}]]></ToUserName>\
         <FromUserName><![CDATA[zhangsan]]></FromUserName>\
         <CreateTime>1348831860</CreateTime>\
         <MsgType><![CDATA[text]]></MsgType>\
         <Content><![CDATA[{}]]></Content>\
         <MsgId>1234567890123456</MsgId>\
         <AgentID>1000002</AgentID></xml>",
        CORP_ID, content
    )
}

pub fn encrypted_envelope_xml(encrypted: &str) -> String {
    format!(
        "<xml><ToUserName><![CDATA[{}]]></ToUserName>\
         <Encrypt><![CDATA[{}]]></Encrypt>\
         <AgentID><![CDATA[1000002]]></AgentID></xml>",
        CORP_ID, encrypted
    )
}
