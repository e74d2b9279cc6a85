// In-memory page source shared by the integration tests

#![allow(dead_code)]

use firstlink_core::PageGraph;
use firstlink_scanner::{ExtractedPage, NextLink, PageSource, ScanError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn address(title: &str) -> String {
    format!("/wiki/{}", title)
}

/// Pages keyed by address, plus a queue of titles handed out as random
/// entries.
#[derive(Default)]
pub struct MapSource {
    pages: HashMap<String, ExtractedPage>,
    entries: Mutex<VecDeque<String>>,
    delays: HashMap<String, Duration>,
    failing: HashSet<String>,
    panicking: HashSet<String>,
    probe: Option<Arc<PageGraph>>,
}

impl MapSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// A page titled `title` whose first link goes to `next` (or nowhere).
    pub fn page(mut self, title: &str, next: Option<&str>) -> Self {
        let link = match next {
            Some(next) => NextLink::Article(address(next)),
            None => NextLink::NotFound,
        };
        self.pages
            .insert(address(title), ExtractedPage::new(address(title), title, link));
        self
    }

    /// A page reached through `alias` that reports itself as `title`, like a
    /// wiki redirect.
    pub fn redirect(mut self, alias: &str, title: &str, next: Option<&str>) -> Self {
        let link = match next {
            Some(next) => NextLink::Article(address(next)),
            None => NextLink::NotFound,
        };
        self.pages
            .insert(address(alias), ExtractedPage::new(address(title), title, link));
        self
    }

    pub fn entries(self, titles: &[&str]) -> Self {
        self.entries
            .lock()
            .unwrap()
            .extend(titles.iter().map(|t| t.to_string()));
        self
    }

    pub fn delay(mut self, title: &str, delay: Duration) -> Self {
        self.delays.insert(address(title), delay);
        self
    }

    pub fn failing(mut self, title: &str) -> Self {
        self.failing.insert(address(title));
        self
    }

    /// Loading this page panics the task that asked for it.
    pub fn panicking(mut self, title: &str) -> Self {
        self.panicking.insert(address(title));
        self
    }

    /// Take the graph lock during every fetch. A walk that held the lock
    /// across a fetch would deadlock here.
    pub fn probe(mut self, graph: Arc<PageGraph>) -> Self {
        self.probe = Some(graph);
        self
    }

    async fn load(&self, address: &str) -> Result<ExtractedPage, ScanError> {
        if let Some(delay) = self.delays.get(address) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(ref graph) = self.probe {
            graph.len().await;
        }
        if self.panicking.contains(address) {
            panic!("page source blew up on {}", address);
        }
        if self.failing.contains(address) {
            return Err(ScanError::Status {
                url: address.to_string(),
                status: 500,
            });
        }

        self.pages
            .get(address)
            .cloned()
            .ok_or_else(|| ScanError::Status {
                url: address.to_string(),
                status: 404,
            })
    }
}

impl PageSource for MapSource {
    async fn random_page(&self) -> Result<ExtractedPage, ScanError> {
        let next = self.entries.lock().unwrap().pop_front();
        match next {
            Some(title) => self.load(&address(&title)).await,
            None => Err(ScanError::ParseError("no entries left".to_string())),
        }
    }

    async fn page(&self, address: &str) -> Result<ExtractedPage, ScanError> {
        self.load(address).await
    }
}

pub async fn visits(graph: &PageGraph, title: &str) -> u64 {
    graph
        .get(title)
        .await
        .unwrap_or_else(|| panic!("missing page {}", title))
        .visits
}
