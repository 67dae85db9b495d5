//! json-over-http relay client

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::DecryptConfig;
use crate::relay::{DecryptRequest, DecryptResponse, Relay};
use crate::{Error, Result};

/// relay reached at `{relay_url}/v1/user-decrypt`
pub struct HttpRelay {
    url: String,
    http: reqwest::Client,
}

impl HttpRelay {
    pub fn new(config: &DecryptConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::RelayUnavailable(e.to_string()))?;

        Ok(Self {
            url: format!("{}/v1/user-decrypt", config.relay_url.trim_end_matches('/')),
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Relay for HttpRelay {
    async fn user_decrypt(&self, request: &DecryptRequest) -> Result<DecryptResponse> {
        debug!(url = %self.url, handles = request.handles.len(), "posting user decrypt");

        let resp = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::RelayUnavailable(format!("timed out: {e}"))
                } else {
                    Error::RelayUnavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        if status.is_client_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::RelayRejected(format!("{status}: {body}")));
        }
        if !status.is_success() {
            return Err(Error::RelayUnavailable(format!("relay returned {status}")));
        }

        resp.json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))
    }
}
