//! Explicit HTTP session owned by a connector instance.
//!
//! Cookie and header state lives on the session instead of in process
//! globals. Default headers are fixed at construction; per-request
//! overrides are merged over them for exactly one request and cannot leak
//! into later ones, on any exit path.

use log::debug;
use reqwest::header::HeaderMap;
use reqwest::Client;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;

/// One request in flight at a time; cookies set by the server persist
/// across calls on the same instance.
#[derive(Debug)]
pub struct Session {
    client: Client,
}

impl Session {
    /// Builds a session with a persistent cookie store and the given
    /// default header set.
    pub fn new(default_headers: HeaderMap) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .default_headers(default_headers)
            .build()?;
        Ok(Self { client })
    }

    /// Form-encoded submit using only the session's default headers.
    pub async fn post_form(&self, url: &str, fields: &[(&str, &str)]) -> Result<String> {
        debug!("POST {}", url);
        let response = self.client.post(url).form(&fields).send().await?;
        Self::into_body(response).await
    }

    /// Body-less submit with scoped header overrides.
    pub async fn post(&self, url: &str, overrides: HeaderMap) -> Result<String> {
        debug!("POST {}", url);
        let response = self.client.post(url).headers(overrides).send().await?;
        Self::into_body(response).await
    }

    async fn into_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SessionError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}
