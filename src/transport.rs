use std::time::Duration;

use reqwest::blocking::{Client, Response};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::portal;
use crate::settings::Settings;

/// Status and decoded body of one HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One session against the portal. Implementations keep cookies between calls.
///
/// Transport failures map to `Error::Network`; non-success statuses are
/// returned as a `Reply` for the caller to judge.
pub trait Transport {
    fn get(&mut self, url: &str) -> Result<Reply>;
    fn post_form(&mut self, url: &str, form: &[(String, String)]) -> Result<Reply>;
}

/// Blocking reqwest client with its own cookie store.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(settings.user_agent.as_str());
        if settings.legacy_tls {
            warn!("legacy TLS enabled, accepting TLS 1.0 and newer");
            builder = builder.min_tls_version(reqwest::tls::Version::TLS_1_0);
        }
        let client = builder
            .build()
            .map_err(|e| Error::network(&settings.base_url, e))?;
        Ok(HttpTransport { client })
    }

    fn read(url: &str, response: Response) -> Result<Reply> {
        let status = response.status().as_u16();
        let body = response
            .text_with_charset(portal::CHARSET)
            .map_err(|e| Error::network(url, e))?;
        debug!(url, status, bytes = body.len(), "response");
        Ok(Reply { status, body })
    }
}

impl Transport for HttpTransport {
    fn get(&mut self, url: &str) -> Result<Reply> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| Error::network(url, e))?;
        Self::read(url, response)
    }

    fn post_form(&mut self, url: &str, form: &[(String, String)]) -> Result<Reply> {
        let response = self
            .client
            .post(url)
            .form(form)
            .send()
            .map_err(|e| Error::network(url, e))?;
        Self::read(url, response)
    }
}
