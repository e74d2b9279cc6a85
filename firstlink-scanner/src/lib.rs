pub mod config;
pub mod error;
pub mod extract;
pub mod fetcher;
pub mod links;
pub mod page;
pub mod source;

pub use config::{LinkRules, SiteConfig};
pub use error::ScanError;
pub use extract::Extractor;
pub use fetcher::WikiFetcher;
pub use page::{ExtractedPage, NextLink};
pub use source::PageSource;
