//! Rendered-page extraction through an injected browser driver.
//!
//! The crate stays synchronous; the WebDriver implementation drives its async
//! client from a private current-thread runtime.

use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::Utc;
use fantoccini::{Client, ClientBuilder, Locator};
use fantoccini::error::CmdError;
use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use tokio::runtime::Runtime;
use url::Url;

use crate::error::{BrowserError, ExtractError};
use crate::extractor::Extractor;
use crate::models::Record;
use crate::parser::{ListingSelectors, keep_valid, parse_element};

/// Starts browser sessions.
pub trait BrowserDriver {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One live browser. `close` must be safe to call more than once.
pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;
    /// `Ok(false)` when nothing matched before the timeout.
    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, BrowserError>;
    /// Outer HTML of at most `limit` elements matching `selector`.
    fn query(&mut self, selector: &str, limit: usize) -> Result<Vec<String>, BrowserError>;
    fn page_source(&mut self) -> Result<String, BrowserError>;
    fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError>;
    fn close(&mut self) -> Result<(), BrowserError>;
}

/// Closes the wrapped session when dropped.
pub struct SessionGuard(Box<dyn BrowserSession>);

impl SessionGuard {
    pub fn new(session: Box<dyn BrowserSession>) -> Self {
        SessionGuard(session)
    }
}

impl Deref for SessionGuard {
    type Target = dyn BrowserSession;

    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

impl DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0.as_mut()
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.close() {
            warn!("failed to close browser session: {}", e);
        }
    }
}

/// How long to let the page render before querying it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitStrategy {
    Fixed(Duration),
    /// Wait until any container candidate is present, up to the timeout.
    Selector(Duration),
}

pub struct RenderedExtractor<D> {
    pub url: Url,
    pub selectors: ListingSelectors,
    pub max_items: usize,
    pub wait: WaitStrategy,
    pub driver: D,
    /// Where to drop a screenshot and HTML dump when nothing matched.
    pub diagnostics: Option<PathBuf>,
}

impl<D: BrowserDriver> Extractor for RenderedExtractor<D> {
    fn extract(&self, source: &str) -> Result<Vec<Record>, ExtractError> {
        let mut session = SessionGuard::new(self.driver.launch()?);
        session.navigate(self.url.as_str())?;

        match self.wait {
            WaitStrategy::Fixed(delay) => thread::sleep(delay),
            WaitStrategy::Selector(timeout) => {
                if !session.wait_for(&self.selectors.containers.as_group(), timeout)? {
                    debug!("{}: no container appeared within {:?}", source, timeout);
                }
            }
        }

        for pattern in self.selectors.containers.patterns() {
            let fragments = session.query(pattern, self.max_items)?;
            if fragments.is_empty() {
                continue;
            }
            debug!("{}: `{}` matched {} elements", source, pattern, fragments.len());
            let records = fragments
                .iter()
                .take(self.max_items)
                .enumerate()
                .filter_map(|(index, html)| {
                    keep_valid(source, index, parse_element(html, &self.url, &self.selectors))
                })
                .collect();
            return Ok(records);
        }

        if let Some(dir) = &self.diagnostics {
            dump_diagnostics(dir, source, &mut session);
        }
        Err(ExtractError::Parse {
            url: self.url.to_string(),
            tried: self.selectors.containers.as_group(),
        })
    }
}

/// Best effort; failures here are only logged.
fn dump_diagnostics(dir: &Path, source: &str, session: &mut SessionGuard) {
    if let Err(e) = fs::create_dir_all(dir) {
        warn!("cannot create diagnostics dir {}: {}", dir.display(), e);
        return;
    }
    let stem = format!("{}_{}", source, Utc::now().format("%Y%m%dT%H%M%S"));

    match session.screenshot() {
        Ok(png) => write_dump(dir.join(format!("{stem}.png")), &png),
        Err(e) => warn!("{}: screenshot failed: {}", source, e),
    }
    match session.page_source() {
        Ok(html) => write_dump(dir.join(format!("{stem}.html")), html.as_bytes()),
        Err(e) => warn!("{}: page source unavailable: {}", source, e),
    }
}

fn write_dump(path: PathBuf, bytes: &[u8]) {
    match fs::write(&path, bytes) {
        Ok(()) => info!("wrote diagnostics {}", path.display()),
        Err(e) => warn!("cannot write {}: {}", path.display(), e),
    }
}

/// W3C WebDriver endpoint such as chromedriver or geckodriver.
#[derive(Debug, Clone)]
pub struct WebDriver {
    pub endpoint: String,
    pub user_agent: Option<String>,
}

impl WebDriver {
    fn capabilities(&self) -> Map<String, Value> {
        let mut chrome_args = vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--window-size=1920,1080".to_string(),
        ];
        if let Some(ua) = &self.user_agent {
            chrome_args.push(format!("--user-agent={ua}"));
        }

        let mut caps = Map::new();
        caps.insert("goog:chromeOptions".into(), json!({ "args": chrome_args }));
        caps.insert("moz:firefoxOptions".into(), json!({ "args": ["-headless"] }));
        caps
    }
}

impl BrowserDriver for WebDriver {
    fn launch(&self) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut builder = ClientBuilder::native();
        builder.capabilities(self.capabilities());
        let client = runtime.block_on(builder.connect(&self.endpoint))?;
        debug!("browser session opened via {}", self.endpoint);

        Ok(Box::new(WebDriverSession { runtime, client, closed: false }))
    }
}

struct WebDriverSession {
    runtime: Runtime,
    client: Client,
    closed: bool,
}

impl BrowserSession for WebDriverSession {
    fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        Ok(self.runtime.block_on(self.client.goto(url))?)
    }

    fn wait_for(&mut self, selector: &str, timeout: Duration) -> Result<bool, BrowserError> {
        let waited = self.runtime.block_on(
            self.client
                .wait()
                .at_most(timeout)
                .for_element(Locator::Css(selector)),
        );
        match waited {
            Ok(_) => Ok(true),
            Err(CmdError::WaitTimeout) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn query(&mut self, selector: &str, limit: usize) -> Result<Vec<String>, BrowserError> {
        let client = &self.client;
        let fragments = self.runtime.block_on(async {
            let elements = client.find_all(Locator::Css(selector)).await?;
            let mut out = Vec::with_capacity(elements.len().min(limit));
            for el in elements.into_iter().take(limit) {
                out.push(el.html(false).await?);
            }
            Ok::<_, CmdError>(out)
        })?;
        Ok(fragments)
    }

    fn page_source(&mut self) -> Result<String, BrowserError> {
        Ok(self.runtime.block_on(self.client.source())?)
    }

    fn screenshot(&mut self) -> Result<Vec<u8>, BrowserError> {
        Ok(self.runtime.block_on(self.client.screenshot())?)
    }

    fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        Ok(self.runtime.block_on(self.client.clone().close())?)
    }
}
