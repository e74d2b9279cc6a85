use crate::config::SiteConfig;
use crate::error::{Result, ScanError};
use crate::extract::Extractor;
use crate::page::ExtractedPage;
use crate::source::PageSource;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// HTTP page source for a MediaWiki site.
pub struct WikiFetcher {
    client: Client,
    base: Url,
    random_path: String,
    extractor: Extractor,
}

impl WikiFetcher {
    pub fn new(config: &SiteConfig) -> Result<Self> {
        config.validate()?;

        let timeout_secs = config.timeout_secs.max(1);
        let client = Client::builder()
            .user_agent("firstlink/0.1 (https://github.com/trapdoorsec/firstlink)")
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(timeout_secs.div_ceil(2)))
            .pool_max_idle_per_host(50)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        let base = Url::parse(&config.base_url)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;

        Ok(Self {
            client,
            base,
            random_path: config.random_path.clone(),
            extractor: Extractor::new(config)?,
        })
    }

    /// Resolve a site-relative path (or pass through an absolute URL).
    pub fn resolve(&self, address: &str) -> Result<Url> {
        self.base
            .join(address)
            .map_err(|e| ScanError::InvalidUrl(format!("{}: {}", address, e)))
    }

    /// Fetch a document, returning its final URL and body.
    pub async fn fetch_document(&self, address: &str) -> Result<(String, String)> {
        let url = self.resolve(address)?;
        debug!("Fetching {}", url);

        let start = Instant::now();
        let response = self.client.get(url.clone()).send().await?;
        let final_url = response.url().to_string();
        let status = response.status();

        if !status.is_success() {
            return Err(ScanError::Status {
                url: final_url,
                status: status.as_u16(),
            });
        }

        let is_html = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("text/html"))
            .unwrap_or(false);
        if !is_html {
            return Err(ScanError::ParseError(format!("{} is not an HTML document", final_url)));
        }

        let body = response.text().await?;
        debug!("Fetched {} ({} bytes in {:?})", final_url, body.len(), start.elapsed());
        Ok((final_url, body))
    }

    async fn load(&self, address: &str) -> Result<ExtractedPage> {
        let (final_url, body) = self.fetch_document(address).await?;
        let page = self.extractor.extract(&final_url, &body)?;
        debug!("{}\n  title: {}\n  link:  {}", page.address, page.title, page.next.describe());
        Ok(page)
    }
}

impl PageSource for WikiFetcher {
    async fn random_page(&self) -> Result<ExtractedPage> {
        self.load(&self.random_path).await
    }

    async fn page(&self, address: &str) -> Result<ExtractedPage> {
        self.load(address).await
    }
}
