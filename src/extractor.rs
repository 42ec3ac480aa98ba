use url::Url;

use crate::error::ExtractError;
use crate::fetcher::HttpFetcher;
use crate::models::Record;
use crate::parser::{ListingSelectors, parse_listing};

/// Turns one page into zero or more valid records.
pub trait Extractor {
    fn extract(&self, source: &str) -> Result<Vec<Record>, ExtractError>;
}

/// Plain HTTP GET followed by a document parse.
#[derive(Debug)]
pub struct StaticExtractor {
    pub url: Url,
    pub selectors: ListingSelectors,
    pub max_items: usize,
    pub fetcher: HttpFetcher,
}

impl Extractor for StaticExtractor {
    fn extract(&self, source: &str) -> Result<Vec<Record>, ExtractError> {
        let html = self.fetcher.fetch_html(self.url.as_str())?;
        parse_listing(source, &html, &self.url, &self.selectors, self.max_items)
    }
}
