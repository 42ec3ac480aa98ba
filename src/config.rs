use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use url::Url;

use crate::browser::{RenderedExtractor, WaitStrategy, WebDriver};
use crate::error::ConfigError;
use crate::extractor::{Extractor, StaticExtractor};
use crate::fetcher::HttpFetcher;
use crate::parser::{ListingSelectors, SelectorCascade};
use crate::pipeline::{Placeholders, Source};

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Snapshot lifetime-deal listings to CSV")]
pub struct Args {
    /// JSON file describing sources; built-in AppSumo sources otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for the dated and latest CSV snapshots
    #[arg(short, long, default_value = "data")]
    pub output_dir: PathBuf,

    /// File name stem, as in <name>_<date>.csv
    #[arg(short, long)]
    pub name: Option<String>,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Elements processed per page at most
    #[arg(long, default_value_t = 30)]
    pub max_items: usize,

    /// WebDriver endpoint for rendered sources
    #[arg(long, default_value = "http://localhost:4444")]
    pub webdriver: String,

    /// Selector wait timeout for rendered sources
    #[arg(long, default_value_t = 10)]
    pub browser_wait_secs: u64,

    /// Write a screenshot and HTML dump here when a rendered page has no listings
    #[arg(long)]
    pub diagnostics_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub name: Option<String>,
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Static,
    Rendered,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    #[serde(default)]
    pub priority: u32,
    pub kind: SourceKind,
    pub url: String,
    pub selectors: SelectorConfig,
    pub max_items: Option<usize>,
    /// Fixed render delay instead of waiting for a container selector
    pub delay_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectorConfig {
    pub containers: Vec<String>,
    #[serde(default)]
    pub name: Vec<String>,
    #[serde(default)]
    pub price: Vec<String>,
    #[serde(default)]
    pub category: Vec<String>,
    #[serde(default)]
    pub link: Vec<String>,
}

impl SelectorConfig {
    pub fn compile(&self, source: &str) -> Result<ListingSelectors, ConfigError> {
        let containers = SelectorCascade::new(self.containers.iter().cloned())?;
        if containers.is_empty() {
            return Err(ConfigError::NoContainers(source.to_string()));
        }
        Ok(ListingSelectors {
            containers,
            name: SelectorCascade::new(self.name.iter().cloned())?,
            price: SelectorCascade::new(self.price.iter().cloned())?,
            category: SelectorCascade::new(self.category.iter().cloned())?,
            link: SelectorCascade::new(self.link.iter().cloned())?,
        })
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn appsumo_selectors() -> SelectorConfig {
    SelectorConfig {
        containers: strings(&[
            ".deal-card",
            "[data-testid='deal-card']",
            "div[class*='ProductCard']",
            "article[class*='product']",
            "a[href^='/products/']",
        ]),
        name: strings(&[".deal-title", "[data-testid='deal-title']", "h3", "h2", "[class*='title']"]),
        price: strings(&[".deal-price", "[data-testid='deal-price']", "[class*='price']"]),
        category: strings(&[".deal-category", "[data-testid='deal-category']", "[class*='category']"]),
        link: strings(&["a[href^='/products/']", "a[href]"]),
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })
    }

    /// AppSumo over plain HTTP first, then through a real browser.
    pub fn builtin() -> Self {
        let url = "https://appsumo.com/lifetime-deals/".to_string();
        FileConfig {
            name: Some("appsumo".into()),
            sources: vec![
                SourceConfig {
                    name: "appsumo".into(),
                    priority: 0,
                    kind: SourceKind::Static,
                    url: url.clone(),
                    selectors: appsumo_selectors(),
                    max_items: None,
                    delay_secs: None,
                },
                SourceConfig {
                    name: "appsumo-browser".into(),
                    priority: 1,
                    kind: SourceKind::Rendered,
                    url,
                    selectors: appsumo_selectors(),
                    max_items: None,
                    delay_secs: None,
                },
            ],
        }
    }
}

/// Everything the binary needs for one run.
pub struct Settings {
    pub name: String,
    pub output_dir: PathBuf,
    pub sources: Vec<Source>,
    pub placeholders: Placeholders,
}

impl Settings {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        let file = match &args.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::builtin(),
        };
        Self::build(args, file)
    }

    pub fn build(args: &Args, file: FileConfig) -> Result<Self, ConfigError> {
        let fetcher = HttpFetcher::new(
            Duration::from_secs(args.timeout_secs),
            args.user_agent.as_deref(),
        )?;

        let mut link_base = None;
        let mut sources = Vec::with_capacity(file.sources.len());
        for sc in &file.sources {
            let url = Url::parse(&sc.url).map_err(|source| ConfigError::Url {
                url: sc.url.clone(),
                source,
            })?;
            if url.cannot_be_a_base() {
                return Err(ConfigError::NotABase(sc.url.clone()));
            }
            link_base.get_or_insert_with(|| url.clone());

            let selectors = sc.selectors.compile(&sc.name)?;
            let max_items = sc.max_items.unwrap_or(args.max_items).max(1);

            let extractor: Box<dyn Extractor> = match sc.kind {
                SourceKind::Static => Box::new(StaticExtractor {
                    url,
                    selectors,
                    max_items,
                    fetcher: fetcher.clone(),
                }),
                SourceKind::Rendered => Box::new(RenderedExtractor {
                    url,
                    selectors,
                    max_items,
                    wait: match sc.delay_secs {
                        Some(secs) => WaitStrategy::Fixed(Duration::from_secs(secs)),
                        None => WaitStrategy::Selector(Duration::from_secs(args.browser_wait_secs)),
                    },
                    driver: WebDriver {
                        endpoint: args.webdriver.clone(),
                        user_agent: args.user_agent.clone(),
                    },
                    diagnostics: args.diagnostics_dir.clone(),
                }),
            };
            sources.push(Source::new(sc.name.clone(), sc.priority, extractor));
        }

        let mut placeholders = Placeholders::default();
        if let Some(base) = link_base {
            placeholders.link_base = base;
        }

        Ok(Settings {
            name: args.name.clone().or(file.name).unwrap_or_else(|| "deals".into()),
            output_dir: args.output_dir.clone(),
            sources,
            placeholders,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        Args::parse_from(std::iter::once("deal_snapshot").chain(extra.iter().copied()))
    }

    #[test]
    fn defaults_use_builtin_appsumo_sources() {
        let settings = Settings::from_args(&args(&[])).unwrap();
        assert_eq!(settings.name, "appsumo");
        assert_eq!(settings.output_dir, PathBuf::from("data"));
        let names: Vec<_> = settings.sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["appsumo", "appsumo-browser"]);
        assert_eq!(settings.placeholders.link_base.host_str(), Some("appsumo.com"));
    }

    #[test]
    fn loads_sources_from_json() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sources.json");
        fs::write(
            &path,
            r#"{
                "name": "deals",
                "sources": [
                    { "name": "mirror", "priority": 5, "kind": "static",
                      "url": "https://dealmirror.com/product-category/all/",
                      "selectors": { "containers": ["li.product"], "name": ["h2"], "link": ["a"] } },
                    { "name": "rendered", "kind": "rendered", "url": "https://example.com",
                      "selectors": { "containers": [".card"] }, "delay_secs": 3 }
                ]
            }"#,
        )
        .unwrap();

        let cli = args(&["--config", path.to_str().unwrap(), "--name", "override"]);
        let settings = Settings::from_args(&cli).unwrap();
        assert_eq!(settings.name, "override");
        assert_eq!(settings.sources.len(), 2);
        assert_eq!(settings.sources[0].priority, 5);
        assert_eq!(settings.sources[1].priority, 0);
    }

    #[test]
    fn rejects_bad_selectors_and_urls() {
        let mut file = FileConfig::builtin();
        file.sources[0].selectors.price = vec!["span[[".into()];
        assert!(matches!(
            Settings::build(&args(&[]), file),
            Err(ConfigError::Selector(_))
        ));

        let mut file = FileConfig::builtin();
        file.sources[1].url = "not a url".into();
        assert!(matches!(Settings::build(&args(&[]), file), Err(ConfigError::Url { .. })));

        let mut file = FileConfig::builtin();
        file.sources[0].url = "data:text/html,<p>deals</p>".into();
        assert!(matches!(Settings::build(&args(&[]), file), Err(ConfigError::NotABase(_))));

        let mut file = FileConfig::builtin();
        file.sources[0].selectors.containers.clear();
        assert!(matches!(
            Settings::build(&args(&[]), file),
            Err(ConfigError::NoContainers(_))
        ));
    }
}
