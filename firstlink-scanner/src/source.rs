use crate::error::Result;
use crate::page::ExtractedPage;
use std::future::Future;

/// Anything that can hand out extracted pages: the live wiki, or a fixture.
///
/// Implementations must not touch shared walk state; they are called with
/// no locks held and may block for as long as the network does.
pub trait PageSource: Send + Sync + 'static {
    /// Fetch a fresh random entry page.
    fn random_page(&self) -> impl Future<Output = Result<ExtractedPage>> + Send;

    /// Fetch the page at `address` (absolute URL or site-relative path).
    fn page(&self, address: &str) -> impl Future<Output = Result<ExtractedPage>> + Send;
}
