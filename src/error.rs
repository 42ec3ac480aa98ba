use std::path::PathBuf;

use thiserror::Error;

/// Page could not be acquired. The pipeline moves on to the next source.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    #[error(transparent)]
    Browser(#[from] BrowserError),
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("could not start browser session: {0}")]
    Launch(String),
    #[error("browser command failed: {0}")]
    Command(String),
    #[error("tokio runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<fantoccini::error::NewSessionError> for BrowserError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        BrowserError::Launch(e.to_string())
    }
}

impl From<fantoccini::error::CmdError> for BrowserError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        BrowserError::Command(e.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("no candidate selector matched on {url} (tried: {tried})")]
    Parse { url: String, tried: String },
}

impl From<BrowserError> for ExtractError {
    fn from(e: BrowserError) -> Self {
        ExtractError::Fetch(FetchError::Browser(e))
    }
}

/// Failure confined to one listing element.
#[derive(Debug, Error)]
pub enum ElementError {
    #[error("cannot resolve link `{href}`: {source}")]
    Link {
        href: String,
        #[source]
        source: url::ParseError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid selector `{0}`")]
    Selector(String),
    #[error("invalid url `{url}`: {source}")]
    Url {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("user agent `{0}` is not a valid header value")]
    UserAgent(String),
    #[error("url `{0}` cannot resolve relative links")]
    NotABase(String),
    #[error("source `{0}` has no container selectors")]
    NoContainers(String),
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("csv encoding failed: {0}")]
    Csv(#[from] csv::Error),
}
