use serde::{Deserialize, Serialize};

/// Where a page points next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextLink {
    /// Address of the first qualifying article link.
    Article(String),
    /// The page has a body but no link qualified.
    NotFound,
    /// No content container was found on the page.
    MissingContent,
}

impl NextLink {
    pub fn address(&self) -> Option<&str> {
        match self {
            NextLink::Article(address) => Some(address),
            NextLink::NotFound | NextLink::MissingContent => None,
        }
    }

    pub fn describe(&self) -> &str {
        match self {
            NextLink::Article(address) => address,
            NextLink::NotFound => "NOT_FOUND",
            NextLink::MissingContent => "",
        }
    }
}

/// The result of fetching and extracting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedPage {
    /// Final address of the document, after redirects.
    pub address: String,
    pub title: String,
    pub next: NextLink,
}

impl ExtractedPage {
    pub fn new(address: impl Into<String>, title: impl Into<String>, next: NextLink) -> Self {
        Self {
            address: address.into(),
            title: title.into(),
            next,
        }
    }
}
