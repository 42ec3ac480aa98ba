pub mod archiver;
pub mod browser;
pub mod config;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod logger;
pub mod models;
pub mod parser;
pub mod pipeline;

pub use archiver::CsvSink;
pub use extractor::Extractor;
pub use models::Record;
pub use pipeline::{Harvest, Origin, Pipeline, Placeholders, Source};
