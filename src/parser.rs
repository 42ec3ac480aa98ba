use log::{debug, warn};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{ConfigError, ElementError, ExtractError};
use crate::models::{NOT_FOUND, Record};

/// Ordered CSS selectors; the first one that yields something wins.
#[derive(Debug, Clone)]
pub struct SelectorCascade {
    patterns: Vec<String>,
    compiled: Vec<Selector>,
}

impl SelectorCascade {
    pub fn new<I, S>(patterns: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let compiled = patterns
            .iter()
            .map(|p| Selector::parse(p).map_err(|_| ConfigError::Selector(p.clone())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SelectorCascade { patterns, compiled })
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// All patterns as a single CSS selector group.
    pub fn as_group(&self) -> String {
        self.patterns.join(", ")
    }

    /// First selector with at least one match in the document.
    pub fn first_matching<'a>(&self, doc: &'a Html) -> Option<(&str, Vec<ElementRef<'a>>)> {
        self.patterns
            .iter()
            .zip(&self.compiled)
            .find_map(|(pattern, selector)| {
                let found: Vec<_> = doc.select(selector).collect();
                (!found.is_empty()).then(|| (pattern.as_str(), found))
            })
    }

    fn first_text(&self, el: ElementRef) -> Option<String> {
        self.compiled
            .iter()
            .flat_map(|s| el.select(s))
            .find_map(element_text)
    }

    fn first_attr(&self, el: ElementRef, attr: &str) -> Option<String> {
        self.compiled
            .iter()
            .flat_map(|s| el.select(s))
            .filter_map(|m| m.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    }
}

/// Selector cascades for one listing page.
#[derive(Debug, Clone)]
pub struct ListingSelectors {
    pub containers: SelectorCascade,
    pub name: SelectorCascade,
    pub price: SelectorCascade,
    pub category: SelectorCascade,
    pub link: SelectorCascade,
}

fn element_text(el: ElementRef) -> Option<String> {
    let text = el
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    (!text.is_empty()).then_some(text)
}

/// Parse a listing page into valid records.
///
/// Fails with [`ExtractError::Parse`] when no container selector matches.
/// Element-level failures are logged and skipped.
pub fn parse_listing(
    source: &str,
    html: &str,
    page_url: &Url,
    selectors: &ListingSelectors,
    max_items: usize,
) -> Result<Vec<Record>, ExtractError> {
    let doc = Html::parse_document(html);

    let Some((pattern, elements)) = selectors.containers.first_matching(&doc) else {
        return Err(ExtractError::Parse {
            url: page_url.to_string(),
            tried: selectors.containers.as_group(),
        });
    };
    debug!("{}: `{}` matched {} elements", source, pattern, elements.len());

    let records = elements
        .into_iter()
        .take(max_items)
        .enumerate()
        .filter_map(|(index, el)| keep_valid(source, index, extract_record(el, page_url, selectors)))
        .collect();
    Ok(records)
}

/// Parse one element's outer HTML, as handed back by a browser session.
pub fn parse_element(
    fragment: &str,
    page_url: &Url,
    selectors: &ListingSelectors,
) -> Result<Record, ElementError> {
    let doc = Html::parse_fragment(fragment);
    let root = doc.root_element();
    let el = root.children().find_map(ElementRef::wrap).unwrap_or(root);
    extract_record(el, page_url, selectors)
}

/// Log and drop failed or invalid records.
pub(crate) fn keep_valid(
    source: &str,
    index: usize,
    result: Result<Record, ElementError>,
) -> Option<Record> {
    match result {
        Ok(record) if record.is_valid() => Some(record),
        Ok(_) => {
            debug!("{}: element {} has neither name nor price, dropped", source, index);
            None
        }
        Err(e) => {
            warn!("{}: skipping element {}: {}", source, index, e);
            None
        }
    }
}

fn extract_record(
    el: ElementRef,
    page_url: &Url,
    selectors: &ListingSelectors,
) -> Result<Record, ElementError> {
    let text_or_na = |cascade: &SelectorCascade| {
        cascade.first_text(el).unwrap_or_else(|| NOT_FOUND.into())
    };

    let name = text_or_na(&selectors.name);
    let price = text_or_na(&selectors.price);
    let category = text_or_na(&selectors.category);

    // A card that is itself an anchor carries its own href.
    let own_href = (el.value().name() == "a")
        .then(|| el.value().attr("href"))
        .flatten()
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string);

    let link = match own_href.or_else(|| selectors.link.first_attr(el, "href")) {
        Some(href) => resolve_link(page_url, &href)?,
        // No anchor: point at the site itself so the link stays absolute.
        None => page_url
            .join("/")
            .map(String::from)
            .unwrap_or_else(|_| page_url.to_string()),
    };

    Ok(Record::new(name, price, category, link))
}

fn resolve_link(base: &Url, href: &str) -> Result<String, ElementError> {
    base.join(href)
        .map(String::from)
        .map_err(|source| ElementError::Link { href: href.to_string(), source })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn deal_selectors() -> ListingSelectors {
        ListingSelectors {
            containers: SelectorCascade::new([".missing-card", ".deal-card"]).unwrap(),
            name: SelectorCascade::new([".deal-title", "h3"]).unwrap(),
            price: SelectorCascade::new([".deal-price"]).unwrap(),
            category: SelectorCascade::new([".deal-category"]).unwrap(),
            link: SelectorCascade::new(["a[href]"]).unwrap(),
        }
    }

    fn base() -> Url {
        Url::parse("https://example.com").unwrap()
    }

    #[test]
    fn relative_href_becomes_absolute() {
        let html = r#"
            <div class="deal-card">
              <a href="/products/x"><span class="deal-title">  Writer   Pro </span></a>
              <span class="deal-price">$49</span>
              <span class="deal-category">Marketing</span>
            </div>"#;

        let records = parse_listing("test", html, &base(), &deal_selectors(), 30).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.name, "Writer Pro");
        assert_eq!(r.price, "$49");
        assert_eq!(r.category, "Marketing");
        assert_eq!(r.link, "https://example.com/products/x");
    }

    #[test]
    fn no_container_match_is_a_parse_error() {
        let html = "<html><body><p>Access denied</p></body></html>";
        let err = parse_listing("test", html, &base(), &deal_selectors(), 30).unwrap_err();
        assert!(matches!(err, ExtractError::Parse { .. }));
    }

    #[test]
    fn missing_sub_fields_fall_back_to_sentinel() {
        let html = r#"<div class="deal-card"><h3>Only a title</h3></div>"#;
        let records = parse_listing("test", html, &base(), &deal_selectors(), 30).unwrap();
        assert_eq!(records[0].name, "Only a title");
        assert_eq!(records[0].price, NOT_FOUND);
        assert_eq!(records[0].category, NOT_FOUND);
        assert_eq!(records[0].link, "https://example.com/");
    }

    #[test]
    fn anchorless_card_links_to_site_root() {
        let page = Url::parse("https://example.com/lifetime-deals/").unwrap();
        let html = r#"<div class="deal-card"><h3>No anchor</h3><span class="deal-price">$9</span></div>"#;
        let records = parse_listing("test", html, &page, &deal_selectors(), 30).unwrap();

        let link = Url::parse(&records[0].link).unwrap();
        assert_eq!(link.as_str(), "https://example.com/");
    }

    #[test]
    fn invalid_and_broken_elements_are_skipped() {
        let html = r#"
            <div class="deal-card"><span class="deal-category">No name or price</span></div>
            <div class="deal-card"><a href="http://[broken"><h3>Bad link</h3></a></div>
            <div class="deal-card"><span class="deal-price">$19</span></div>"#;
        let records = parse_listing("test", html, &base(), &deal_selectors(), 30).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, "$19");
        assert_eq!(records[0].name, NOT_FOUND);
    }

    #[test]
    fn element_count_is_capped() {
        let html: String = (0..10)
            .map(|i| format!(r#"<div class="deal-card"><h3>Deal {i}</h3></div>"#))
            .collect();
        let records = parse_listing("test", &html, &base(), &deal_selectors(), 4).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[3].name, "Deal 3");
    }

    #[test]
    fn anchor_card_uses_its_own_href() {
        let sel = ListingSelectors {
            containers: SelectorCascade::new(["a.card"]).unwrap(),
            ..deal_selectors()
        };
        let html = r#"<a class="card" href="deals/y"><h3>Anchor</h3></a>"#;
        let records = parse_listing("test", html, &base(), &sel, 30).unwrap();
        assert_eq!(records[0].link, "https://example.com/deals/y");
    }

    #[test]
    fn fragment_parsing_matches_document_parsing() {
        let fragment = r#"<div class="deal-card"><a href="/p/z">Z</a><span class="deal-price">$5</span></div>"#;
        let record = parse_element(fragment, &base(), &deal_selectors()).unwrap();
        assert_eq!(record.price, "$5");
        assert_eq!(record.link, "https://example.com/p/z");
    }

    #[test]
    fn bad_selector_is_rejected_up_front() {
        assert!(matches!(
            SelectorCascade::new(["div[[["]),
            Err(ConfigError::Selector(_))
        ));
    }
}
