use crate::config::{LinkRules, SiteConfig};
use crate::error::{Result, ScanError};
use crate::links::find_first_link;
use crate::page::{ExtractedPage, NextLink};
use scraper::{Html, Selector};
use tracing::debug;

/// Turns an article's HTML into its title and the next address to follow.
///
/// Selectors are compiled once from the [`SiteConfig`]; the extractor is
/// stateless afterwards and can be shared between walks.
#[derive(Debug, Clone)]
pub struct Extractor {
    title: Selector,
    containers: Vec<Selector>,
    rules: LinkRules,
}

impl Extractor {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        let title = parse_selector(&config.title_selector)?;
        let containers = config
            .content_selectors
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            title,
            containers,
            rules: config.links.clone(),
        })
    }

    pub fn extract(&self, address: &str, html: &str) -> Result<ExtractedPage> {
        let document = Html::parse_document(html);

        let title = document
            .select(&self.title)
            .next()
            .map(|heading| heading.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())
            .ok_or_else(|| ScanError::ParseError(format!("No title heading in {}", address)))?;

        let container = self
            .containers
            .iter()
            .find_map(|selector| document.select(selector).next());

        let next = match container {
            Some(container) => match find_first_link(container, &self.rules) {
                Some(href) => NextLink::Article(href),
                None => NextLink::NotFound,
            },
            None => {
                debug!("No content container in {}", address);
                NextLink::MissingContent
            }
        };

        Ok(ExtractedPage::new(address, title, next))
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScanError::Config(format!("Invalid selector '{}': {}", selector, e)))
}
