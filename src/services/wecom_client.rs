/// Outbound client for the platform's message API
use std::future::Future;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

use crate::config::WeComConfig;
use crate::models::{AccessTokenResponse, ApiStatus, MessageFormat, OutboundMessage, Recipients};

/// Tokens are refreshed this long before the platform expires them
pub const TOKEN_SAFETY_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_TOKEN_TTL_SECS: u64 = 7200;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// errcodes meaning the access token is invalid or expired
const TOKEN_ERRCODES: [i64; 3] = [40001, 40014, 42001];

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("api error {errcode}: {errmsg}")]
    Api { errcode: i64, errmsg: String },

    #[error("access token missing from response")]
    MissingToken,
}

impl ClientError {
    fn is_token_error(&self) -> bool {
        matches!(self, ClientError::Api { errcode, .. } if TOKEN_ERRCODES.contains(errcode))
    }
}

/// Anything that can push a message to users. The scheduler only needs this.
pub trait MessageSender: Send + Sync + 'static {
    fn send_text(&self, content: &str) -> impl Future<Output = Result<(), ClientError>> + Send;
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

/// Access-token cache with a single-writer refresh
///
/// Readers take the read lock only. A refresh holds `refresh_lock` for the
/// whole fetch and re-checks the cache once it has the lock, so concurrent
/// callers trigger at most one fetch.
#[derive(Debug, Default)]
pub struct AccessTokenCache {
    token: RwLock<Option<CachedToken>>,
    refresh_lock: Mutex<()>,
}

impl AccessTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    async fn cached(&self) -> Option<String> {
        let guard = self.token.read().await;
        guard
            .as_ref()
            .filter(|t| Instant::now() < t.refresh_at)
            .map(|t| t.value.clone())
    }

    /// Return a valid token, calling `fetch` when none is cached.
    /// `fetch` yields the token and its lifetime in seconds.
    pub async fn get_or_refresh<F, Fut>(&self, fetch: F) -> Result<String, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<(String, u64), ClientError>>,
    {
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let _refresh = self.refresh_lock.lock().await;
        if let Some(token) = self.cached().await {
            return Ok(token);
        }

        let (value, expires_in) = fetch().await?;
        let lifetime = Duration::from_secs(expires_in).saturating_sub(TOKEN_SAFETY_MARGIN);
        *self.token.write().await = Some(CachedToken {
            value: value.clone(),
            refresh_at: Instant::now() + lifetime,
        });

        Ok(value)
    }

    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }
}

pub struct WeComClient {
    http: reqwest::Client,
    config: WeComConfig,
    tokens: AccessTokenCache,
}

impl WeComClient {
    pub fn new(config: WeComConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            config,
            tokens: AccessTokenCache::new(),
        })
    }

    pub fn config(&self) -> &WeComConfig {
        &self.config
    }

    /// Recipients from configuration
    pub fn default_recipients(&self) -> Recipients {
        Recipients {
            user_ids: self.config.user_ids.clone(),
            dept_ids: self.config.dept_ids.clone(),
            tag_ids: self.config.tag_ids.clone(),
        }
    }

    async fn fetch_token(&self) -> Result<(String, u64), ClientError> {
        let url = format!("{}/cgi-bin/gettoken", self.config.api_base);
        let response: AccessTokenResponse = self
            .http
            .get(&url)
            .query(&[
                ("corpid", self.config.corpid.as_str()),
                ("corpsecret", self.config.corpsecret.as_str()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.errcode != 0 {
            log::error!("Failed to get access token: {} {}", response.errcode, response.errmsg);
            return Err(ClientError::Api {
                errcode: response.errcode,
                errmsg: response.errmsg,
            });
        }

        let token = response.access_token.ok_or(ClientError::MissingToken)?;
        log::info!("Obtained access token");
        Ok((token, response.expires_in.unwrap_or(DEFAULT_TOKEN_TTL_SECS)))
    }

    pub async fn access_token(&self) -> Result<String, ClientError> {
        self.tokens.get_or_refresh(|| self.fetch_token()).await
    }

    async fn post_message(&self, message: &OutboundMessage) -> Result<(), ClientError> {
        let token = self.access_token().await?;
        let url = format!("{}/cgi-bin/message/send", self.config.api_base);

        let status: ApiStatus = self
            .http
            .post(&url)
            .query(&[("access_token", token.as_str())])
            .json(message)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if status.errcode != 0 {
            return Err(ClientError::Api {
                errcode: status.errcode,
                errmsg: status.errmsg,
            });
        }
        Ok(())
    }

    /// Send a message; retried once when the cached token was rejected
    pub async fn send(
        &self,
        format: MessageFormat,
        content: &str,
        recipients: &Recipients,
    ) -> Result<(), ClientError> {
        let message = OutboundMessage::new(format, content, &self.config.agentid, recipients);

        let result = match self.post_message(&message).await {
            Err(e) if e.is_token_error() => {
                log::warn!("Access token rejected ({}), refreshing", e);
                self.tokens.invalidate().await;
                self.post_message(&message).await
            }
            other => other,
        };

        match &result {
            Ok(()) => log::info!("📨 Sent {:?} message ({} chars)", format, content.chars().count()),
            Err(e) => log::error!("Failed to send {:?} message: {}", format, e),
        }
        result
    }

    pub async fn send_text_to(&self, content: &str, user_ids: Option<Vec<String>>) -> Result<(), ClientError> {
        let recipients = match user_ids {
            Some(user_ids) => Recipients {
                user_ids,
                ..Default::default()
            },
            None => self.default_recipients(),
        };
        self.send(MessageFormat::Text, content, &recipients).await
    }

    pub async fn send_markdown(&self, content: &str) -> Result<(), ClientError> {
        self.send(MessageFormat::Markdown, content, &self.default_recipients()).await
    }
}

impl MessageSender for WeComClient {
    fn send_text(&self, content: &str) -> impl Future<Output = Result<(), ClientError>> + Send {
        self.send_text_to(content, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_token_is_cached() {
        let cache = AccessTokenCache::new();
        let fetches = AtomicUsize::new(0);

        for _ in 0..3 {
            let token = cache
                .get_or_refresh(|| async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(("tok".to_string(), 7200))
                })
                .await
                .unwrap();
            assert_eq!(token, "tok");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_short_lived_token_is_not_cached() {
        let cache = AccessTokenCache::new();
        let fetches = AtomicUsize::new(0);

        // Lifetime below the safety margin expires immediately
        for _ in 0..2 {
            cache
                .get_or_refresh(|| async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    Ok(("tok".to_string(), 200))
                })
                .await
                .unwrap();
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let cache = AccessTokenCache::new();
        cache.get_or_refresh(|| async { Ok(("old".to_string(), 7200)) }).await.unwrap();
        cache.invalidate().await;
        let token = cache.get_or_refresh(|| async { Ok(("new".to_string(), 7200)) }).await.unwrap();
        assert_eq!(token, "new");
    }

    #[tokio::test]
    async fn test_fetch_error_is_not_cached() {
        let cache = AccessTokenCache::new();
        let err = cache
            .get_or_refresh(|| async {
                Err(ClientError::Api {
                    errcode: 40013,
                    errmsg: "invalid corpid".to_string(),
                })
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Api { errcode: 40013, .. }));

        let token = cache.get_or_refresh(|| async { Ok(("tok".to_string(), 7200)) }).await.unwrap();
        assert_eq!(token, "tok");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_callers_fetch_once() {
        let cache = Arc::new(AccessTokenCache::new());
        let fetches = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let cache = cache.clone();
                let fetches = fetches.clone();
                tokio::spawn(async move {
                    cache
                        .get_or_refresh(|| async {
                            fetches.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(20)).await;
                            Ok(("tok".to_string(), 7200))
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), "tok");
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_token_error_classification() {
        assert!(ClientError::Api { errcode: 42001, errmsg: String::new() }.is_token_error());
        assert!(!ClientError::Api { errcode: 60020, errmsg: String::new() }.is_token_error());
        assert!(!ClientError::MissingToken.is_token_error());
    }
}
