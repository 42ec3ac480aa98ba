use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Marks a field the extractor could not find.
pub const NOT_FOUND: &str = "N/A";

/// Name prefix shared by every synthetic record.
pub const PLACEHOLDER_PREFIX: &str = "[placeholder]";

/// Column order of every snapshot file.
pub const COLUMNS: [&str; 5] = ["name", "price", "category", "link", "scraped_at"];

/// One deal listing as written to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub price: String,
    pub category: String,
    pub link: String,
    #[serde(rename = "scraped_at")]
    pub captured_at: DateTime<Utc>,
}

impl Record {
    pub fn new(
        name: impl Into<String>,
        price: impl Into<String>,
        category: impl Into<String>,
        link: impl Into<String>,
    ) -> Self {
        Record {
            name: name.into(),
            price: price.into(),
            category: category.into(),
            link: link.into(),
            captured_at: Utc::now(),
        }
    }

    /// At least one of name/price was found.
    pub fn is_valid(&self) -> bool {
        self.name != NOT_FOUND || self.price != NOT_FOUND
    }

    pub fn is_placeholder(&self) -> bool {
        self.name.starts_with(PLACEHOLDER_PREFIX)
    }
}
