use crate::error::ApiError;
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Issues a single GET against a YouTube Data API endpoint and returns the
/// decoded JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError>;
}

/// Transport backed by `reqwest`, authenticating with a static API key.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl HttpTransport {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self, ApiError> {
        // Without the trailing slash `join` would replace the last path segment.
        let base_url = if base_url.ends_with('/') {
            Url::parse(base_url)?
        } else {
            Url::parse(&format!("{base_url}/"))?
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value, ApiError> {
        // Documentation: https://developers.google.com/youtube/v3/docs
        let url = self.base_url.join(endpoint)?;
        debug!("GET {url} {params:?}");

        let response = self
            .client
            .get(url)
            .query(params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
