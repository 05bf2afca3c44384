//! HTTP client for the proxy engine's admin endpoint.

use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use url::Url;

/// How long one push may take end to end. There is no cancellation of an
/// in-flight push; this bound is the only limit.
const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum PushError {
    #[error("invalid engine admin address: {0}")]
    Address(#[from] url::ParseError),

    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The engine refused the document; the body text is kept verbatim.
    #[error("{0}")]
    Rejected(String),
}

/// Client for the engine's `/load` reload endpoint.
#[derive(Debug, Clone)]
pub struct EngineClient {
    endpoint: Url,
    client: reqwest::Client,
}

impl EngineClient {
    /// Creates a client for the given admin base address, e.g.
    /// "http://localhost:2019".
    pub fn new(admin: &str) -> Result<Self, PushError> {
        let endpoint = Url::parse(admin)?.join("/load")?;
        let client = reqwest::Client::builder()
            .timeout(PUSH_TIMEOUT)
            .build()?;
        Ok(Self { endpoint, client })
    }

    /// Pushes the compiled document; the engine applies it atomically.
    pub async fn load(&self, document: &Value) -> Result<(), PushError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(document)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PushError::Rejected(body));
        }
        Ok(())
    }
}
