use std::path::PathBuf;

/// Failures talking to the dashboard backend.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server rejected our credentials. Stored credentials have already been cleared.
    #[error("session expired or invalid, log in again")]
    Unauthorized,

    #[error("{method} {path} failed with HTTP {status}: {message}")]
    Status {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected response from {path}: {message}")]
    Decode { path: String, message: String },

    #[error("task {0} not found")]
    TaskNotFound(String),

    #[error("user {0} not found")]
    UserNotFound(String),

    #[error("{0} is not available in offline mode")]
    Unsupported(&'static str),

    #[error("local dataset unavailable: {0}")]
    Local(#[from] StorageError),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

/// Failures reading or writing keyed local slots.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("cannot access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot encode slot {key}: {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures decoding the signed login token.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("redirect carries no token parameter")]
    Missing,

    #[error("malformed redirect url: {0}")]
    BadUrl(String),

    #[error("token must have 3 parts, found {0}")]
    Shape(usize),

    #[error("token payload is not base64: {0}")]
    Encoding(String),

    #[error("token payload is not valid claims: {0}")]
    Claims(String),

    #[error("token expired at {0}")]
    Expired(i64),

    #[error("could not store credentials: {0}")]
    Persist(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {name}")]
    Value { name: &'static str, value: String },
}

/// Top-level error for the application container and CLI.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),

    #[error("{0}")]
    Usage(String),
}

