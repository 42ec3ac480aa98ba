use std::time::Duration;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::redirect;

use crate::error::{ConfigError, FetchError};

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client shared by every static source.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, user_agent: Option<&str>) -> Result<Self, ConfigError> {
        let redirect_policy = redirect::Policy::custom(|attempt| {
            if attempt.previous().len() > MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else {
                attempt.follow()
            }
        });

        let ua = user_agent.unwrap_or(DEFAULT_USER_AGENT);
        let ua_value = HeaderValue::from_str(ua).map_err(|_| ConfigError::UserAgent(ua.to_string()))?;
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, ua_value);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .redirect(redirect_policy)
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(HttpFetcher { client })
    }

    /// One GET, no retries. Non-2xx answers are errors.
    pub fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let transport = |source| FetchError::Transport { url: url.to_string(), source };

        let resp = self.client.get(url).send().map_err(transport)?;
        let status = resp.status();
        debug!("GET {} -> {}", url, status);
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        resp.text().map_err(transport)
    }
}
