use log::{info, warn};
use url::Url;

use crate::extractor::Extractor;
use crate::models::{PLACEHOLDER_PREFIX, Record};

/// A named origin plus the strategy used against it. Lower priority runs first.
pub struct Source {
    pub name: String,
    pub priority: u32,
    pub extractor: Box<dyn Extractor>,
}

impl Source {
    pub fn new(name: impl Into<String>, priority: u32, extractor: Box<dyn Extractor>) -> Self {
        Source { name: name.into(), priority, extractor }
    }
}

/// Synthetic records used when every source comes back empty.
#[derive(Debug, Clone)]
pub struct Placeholders {
    pub count: usize,
    pub link_base: Url,
}

impl Default for Placeholders {
    fn default() -> Self {
        Placeholders {
            count: 3,
            link_base: Url::parse("https://example.invalid/").expect("static url"),
        }
    }
}

impl Placeholders {
    pub fn generate(&self) -> Vec<Record> {
        (1..=self.count.max(1))
            .map(|i| {
                let link = self
                    .link_base
                    .join(&format!("placeholder/{i}"))
                    .map(String::from)
                    .unwrap_or_else(|_| self.link_base.to_string());
                Record::new(
                    format!("{PLACEHOLDER_PREFIX} Lifetime deal {i}"),
                    "$0",
                    "placeholder",
                    link,
                )
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Source(String),
    Placeholder,
}

#[derive(Debug)]
pub struct Harvest {
    pub origin: Origin,
    pub records: Vec<Record>,
}

/// Ordered, short-circuiting fallback across sources. Never fails.
pub struct Pipeline {
    sources: Vec<Source>,
    placeholders: Placeholders,
}

impl Pipeline {
    pub fn new(mut sources: Vec<Source>, placeholders: Placeholders) -> Self {
        sources.sort_by_key(|s| s.priority);
        Pipeline { sources, placeholders }
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.name.as_str())
    }

    pub fn run(&self) -> Vec<Record> {
        self.harvest().records
    }

    pub fn harvest(&self) -> Harvest {
        for source in &self.sources {
            info!("trying source `{}`", source.name);
            let records = match source.extractor.extract(&source.name) {
                Ok(records) => records,
                Err(e) => {
                    warn!("source `{}` unavailable: {}", source.name, e);
                    continue;
                }
            };

            let total = records.len();
            let accepted: Vec<Record> = records
                .into_iter()
                .filter(|r| r.is_valid() && !r.is_placeholder())
                .collect();
            if accepted.is_empty() {
                warn!("source `{}` yielded no usable records ({} raw)", source.name, total);
                continue;
            }

            info!("source `{}` yielded {} records", source.name, accepted.len());
            return Harvest {
                origin: Origin::Source(source.name.clone()),
                records: accepted,
            };
        }

        warn!("all sources failed; emitting placeholder data");
        Harvest {
            origin: Origin::Placeholder,
            records: self.placeholders.generate(),
        }
    }
}
