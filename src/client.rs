use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::capabilities::HttpClient;
use crate::error::DashboardError;

/// JSON GET against the presence API. Paths are resolved against `base_url`.
#[derive(Clone)]
pub struct ReqwestClient {
    base_url: String,
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else if url.starts_with('/') {
            format!("{}{}", self.base_url, url)
        } else {
            format!("{}/{}", self.base_url, url)
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestClient {
    async fn get_json(&self, url: &str) -> Result<Value, DashboardError> {
        let full = self.resolve(url);
        debug!(url = %full, "GET");
        self.client
            .get(&full)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| DashboardError::fetch(url, e))?
            .json::<Value>()
            .await
            .map_err(|e| DashboardError::fetch(url, e))
    }
}
