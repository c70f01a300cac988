/// Application configuration loaded from the environment
use std::env;
use std::fmt;
use std::time::Duration;

use crate::security::{CallbackCredentials, CallbackError, FrameMode};

pub const DEFAULT_API_BASE: &str = "https://qyapi.weixin.qq.com";
pub const DEFAULT_WELCOME_MESSAGE: &str = "欢迎使用量化交易机器人！";

/// Outbound API settings
#[derive(Clone)]
pub struct WeComConfig {
    pub corpid: String,
    pub corpsecret: String,
    pub agentid: String,
    pub user_ids: Vec<String>,
    pub dept_ids: Vec<String>,
    pub tag_ids: Vec<String>,
    pub api_base: String,
}

impl fmt::Debug for WeComConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeComConfig")
            .field("corpid", &self.corpid)
            .field("corpsecret", &"<redacted>")
            .field("agentid", &self.agentid)
            .field("user_ids", &self.user_ids)
            .field("dept_ids", &self.dept_ids)
            .field("tag_ids", &self.tag_ids)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl WeComConfig {
    pub fn is_valid(&self) -> bool {
        !self.corpid.is_empty() && !self.corpsecret.is_empty() && !self.agentid.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct TimerConfig {
    pub interval: Duration,
    pub message: String,
    pub autostart: bool,
}

#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub callback: CallbackCredentials,
    pub frame_mode: FrameMode,
    pub wecom: WeComConfig,
    pub timer: TimerConfig,
    pub welcome_message: String,
    pub admin_token: Option<String>,
    pub cors_origins: Vec<String>,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("callback", &self.callback)
            .field("frame_mode", &self.frame_mode)
            .field("wecom", &self.wecom)
            .field("timer", &self.timer)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<redacted>"))
            .field("cors_origins", &self.cors_origins)
            .finish()
    }
}

impl AppConfig {
    /// Load from process environment (after `dotenv`)
    pub fn from_env() -> Result<Self, CallbackError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Missing required keys are fatal.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CallbackError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| CallbackError::Configuration(format!("{} is not set", key)))
        };

        let corpid = require("WECHAT_CORPID")?;
        let token = require("WECHAT_TOKEN")?;
        let encoding_key = require("WECHAT_ENCODING_AES_KEY")?;
        let callback = CallbackCredentials::new(&token, &encoding_key, &corpid)?;

        let frame_mode = match get("CALLBACK_FRAME_MODE") {
            Some(mode) => mode.parse()?,
            None => FrameMode::default(),
        };

        let wecom = WeComConfig {
            corpid,
            corpsecret: require("WECHAT_CORPSECRET")?,
            agentid: require("WECHAT_AGENTID")?,
            user_ids: split_list(get("WECHAT_USER_IDS")),
            dept_ids: split_list(get("WECHAT_DEPT_IDS")),
            tag_ids: split_list(get("WECHAT_TAG_IDS")),
            api_base: get("WECOM_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string())
                .trim_end_matches('/')
                .to_string(),
        };

        let port = match get("SERVER_PORT").or_else(|| get("PORT")) {
            Some(port) => port
                .parse::<u16>()
                .map_err(|_| CallbackError::Configuration(format!("invalid port '{}'", port)))?,
            None => 5000,
        };

        let interval_secs = match get("TIMER_INTERVAL_SECS") {
            Some(secs) => secs
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .ok_or_else(|| CallbackError::Configuration(format!("invalid timer interval '{}'", secs)))?,
            None => 60,
        };

        let timer = TimerConfig {
            interval: Duration::from_secs(interval_secs),
            message: get("TIMER_MESSAGE").unwrap_or_else(|| "1".to_string()),
            autostart: get("TIMER_AUTOSTART")
                .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(true),
        };

        let mut cors_origins = split_list(get("CORS_ALLOWED_ORIGINS"));
        if cors_origins.is_empty() {
            cors_origins.push("http://localhost:5173".to_string());
        }

        Ok(Self {
            host: get("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port,
            callback,
            frame_mode,
            wecom,
            timer,
            welcome_message: get("WELCOME_MESSAGE").unwrap_or_else(|| DEFAULT_WELCOME_MESSAGE.to_string()),
            admin_token: get("ADMIN_TOKEN"),
            cors_origins,
        })
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}
