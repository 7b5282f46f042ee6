use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::models::types::{Result, TransitError};
use crate::network::traits::DataFetcher;

const USER_AGENT: &str = concat!("mpk-viewer/", env!("CARGO_PKG_VERSION"));

/// `DataFetcher` backed by a shared `reqwest::Client`
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TransitError::Request(e.to_string()))?;
        Ok(Self { client })
    }
}

impl DataFetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<u8>>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| TransitError::Request(e.to_string()))?;

            let status = response.status();
            let body = response
                .bytes()
                .await
                .map_err(|e| TransitError::Request(e.to_string()))?;

            if !status.is_success() {
                tracing::debug!(%url, status = status.as_u16(), "Request returned an error status");
                return Err(TransitError::Status {
                    status: status.as_u16(),
                    url: url.to_string(),
                    body: body.to_vec(),
                });
            }

            Ok(body.to_vec())
        })
    }
}
