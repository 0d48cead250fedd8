use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Transport failure: DNS, TLS, connect or timeout.
    #[error("network error for {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("parse error: {0}")]
    Parse(String),

    #[error("nothing matched {path}")]
    NotFound { path: String },

    /// Inferred from missing card data after a successful login response.
    #[error("authentication failed: card data not found after login")]
    Authentication,

    #[error("cannot read amount from {input:?}")]
    Format { input: String },

    #[error("invalid path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub fn network(
        url: &str,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Error::Network {
            url: url.to_string(),
            source: source.into(),
        }
    }
}
