use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE},
    Client,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::request::SendRequest;
use super::traits::{validate_request, PushProvider};
use crate::config::ProviderConfig;
use crate::dispatch::{DispatchOutcome, TokenSender};
use crate::errors::{AppError, AppResult};
use crate::stats::Platform;

pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_USER_AGENT: &str = concat!("push-gateway/", env!("CARGO_PKG_VERSION"));

/// Generic HTTP adapter that forwards each token to a vendor relay endpoint
///
/// Every token becomes one `POST {endpoint}` with body
/// `{"token": "...", "notification": {...}}`. A 2xx answer is a success and
/// its JSON body becomes the outcome data; any other status is a failure
/// carrying the status code and response text.
pub struct RelayProvider {
    platform: Platform,
    endpoint: Url,
    auth_token: Option<String>,
    app_id: Option<String>,
    timeout_secs: u64,
    client: Client,
}

impl RelayProvider {
    pub fn new(platform: Platform, config: &ProviderConfig, user_agent: &str) -> AppResult<Self> {
        let client = Client::builder()
            .tcp_keepalive(Duration::from_secs(60))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(32)
            .user_agent(user_agent)
            .build()
            .map_err(|e| AppError::provider_with_source("failed to create HTTP client", e))?;

        Self::with_client(platform, config, client)
    }

    /// Use a caller-built HTTP client; the configured timeout still applies per request
    pub fn with_client(platform: Platform, config: &ProviderConfig, client: Client) -> AppResult<Self> {
        let endpoint = Url::parse(&config.endpoint)?;
        Ok(Self {
            platform,
            endpoint,
            auth_token: config.auth_token.clone(),
            app_id: config.app_id.clone(),
            timeout_secs: config.timeout_secs.unwrap_or(DEFAULT_PROVIDER_TIMEOUT_SECS),
            client,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Vendor-neutral payload shared by every token of the request
    pub fn build_payload(&self, request: &SendRequest) -> Value {
        let mut payload = json!({
            "platform": self.platform.as_str(),
            "title": request.title,
            "content": request.content,
        });

        let app_id = request.app_id.as_ref().or(self.app_id.as_ref());
        let optional = [
            ("app_id", app_id.map(|v| json!(v))),
            ("app_name", request.app_name.as_ref().map(|v| json!(v))),
            ("priority", request.priority.as_ref().map(|v| json!(v))),
            ("ttl", request.ttl.map(|v| json!(v))),
            ("category", request.category.as_ref().map(|v| json!(v))),
            ("click_action", request.click_action.as_ref().map(|v| json!(v))),
            ("icon", request.icon.as_ref().map(|v| json!(v))),
        ];
        if let Some(object) = payload.as_object_mut() {
            for (key, value) in optional {
                if let Some(value) = value {
                    object.insert(key.to_string(), value);
                }
            }
            if !request.data.is_empty() {
                object.insert("data".to_string(), json!(request.data));
            }
        }

        payload
    }

    fn build_headers(&self) -> AppResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &self.auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|_| AppError::invalid_config_value("auth_token", "<redacted>"))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }
}

impl PushProvider for RelayProvider {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn check_notification(&self, request: &SendRequest) -> AppResult<()> {
        validate_request(request)?;

        if let (Some(expected), Some(given)) = (&self.app_id, &request.app_id) {
            if expected != given {
                return Err(AppError::validation(
                    "app_id",
                    format!("'{given}' is not configured for {}", self.platform),
                ));
            }
        }

        Ok(())
    }

    fn prepare(&self, request: &SendRequest) -> AppResult<Arc<dyn TokenSender>> {
        Ok(Arc::new(RelaySender {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            headers: self.build_headers()?,
            payload: self.build_payload(request),
            timeout_secs: self.timeout_secs,
        }))
    }
}

struct RelaySender {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    payload: Value,
    timeout_secs: u64,
}

#[async_trait]
impl TokenSender for RelaySender {
    async fn send(&self, token: &str) -> AppResult<DispatchOutcome> {
        let body = json!({ "token": token, "notification": &self.payload });

        let response = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(&body)
            .timeout(Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::NetworkTimeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    e.into()
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        debug!(status = status.as_u16(), endpoint = %self.endpoint, "Relay answered");

        if status.is_success() {
            let data = serde_json::from_str::<Value>(&text).ok();
            return Ok(DispatchOutcome::success(data));
        }

        let message = if text.trim().is_empty() {
            status.canonical_reason().unwrap_or("unknown status").to_string()
        } else {
            text
        };
        Ok(DispatchOutcome::with_code(i32::from(status.as_u16()), message))
    }
}
