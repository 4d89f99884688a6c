use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{header, Method, Url};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::{config::ClientConfig, csrf, RequestError, RequestResult};

/// Where collections are read from and written to. `endpoint` is relative
/// to the api root, e.g. `/bowsers` or `/bowsers/BWR001`.
///
/// Implementations return the decoded JSON body as is; unwrapping envelopes
/// is left to [`crate::envelope`].
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> RequestResult<Value>;
}

/// A backend chosen at runtime, shared between stores.
pub type SharedBackend = Arc<dyn Backend>;

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> RequestResult<Value> {
        self.as_ref().request(method, endpoint, body).await
    }
}

fn is_mutating(method: &Method) -> bool {
    ![Method::GET, Method::HEAD, Method::OPTIONS].contains(method)
}

/// The REST backend, over reqwest. Keeps a cookie store so the session
/// cookie that goes with the CSRF token is sent back.
pub struct HttpBackend {
    client: reqwest::Client,
    api_url: String,
    csrf_token: RwLock<Option<String>>,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> RequestResult<Self> {
        let mut builder = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout());
        if let Some(proxy_url) = &config.proxy {
            log::info!("Using proxy '{}' for the water supply api.", proxy_url);
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        Ok(Self {
            client: builder.build()?,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            csrf_token: RwLock::new(config.csrf_token.clone()),
        })
    }

    pub async fn csrf_token(&self) -> Option<String> {
        self.csrf_token.read().await.clone()
    }

    pub async fn set_csrf_token(&self, token: Option<String>) {
        *self.csrf_token.write().await = token;
    }

    /// Loads `page` and adopts the token from its csrf meta tag. Returns
    /// whether a token was found.
    pub async fn discover_csrf_token(&self, page: &str) -> RequestResult<bool> {
        let url = Url::parse(&self.api_url)
            .and_then(|api| api.join(page))
            .map_err(|_| RequestError::InvalidUrl(page.to_owned()))?;
        log::debug!("Looking for a csrf token on '{}'.", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        let html = response.text().await?;
        if !status.is_success() {
            return Err(RequestError::Http {
                status,
                url: url.to_string(),
                message: None,
            });
        }
        match csrf::extract_token(&html) {
            Some(token) => {
                self.set_csrf_token(Some(token)).await;
                Ok(true)
            }
            None => {
                log::warn!("No csrf token found on '{}'.", url);
                Ok(false)
            }
        }
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Value>,
    ) -> RequestResult<Value> {
        let url = format!("{}{}", self.api_url, endpoint);
        log::debug!("{} {}", method, url);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");
        if is_mutating(&method) {
            if let Some(token) = self.csrf_token.read().await.as_ref() {
                request = request.header(csrf::CSRF_HEADER, token);
            }
        }
        if let Some(body) = &body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(RequestError::Http {
                status,
                url,
                message: error_message(&text),
            });
        }
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

/// Best effort message from an error body: `message` or `error` of a JSON
/// object, otherwise the start of the text.
fn error_message(text: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        if let Some(message) = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(Value::as_str)
        {
            return Some(message.to_owned());
        }
    }
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.chars().take(200).collect())
    }
}
