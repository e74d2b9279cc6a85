// A single walk: fetch, extract, extend the graph, repeat until it converges.

use crate::graph::{GraphError, MergeReport, PageGraph, Step};
use firstlink_scanner::{NextLink, PageSource, ScanError};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum WalkError {
    #[error("Walk {walk_id} failed to load {address}: {source}")]
    Scan {
        walk_id: usize,
        address: String,
        #[source]
        source: ScanError,
    },

    #[error("Walk {walk_id} could not update the graph: {source}")]
    Graph {
        walk_id: usize,
        #[source]
        source: GraphError,
    },
}

impl WalkError {
    pub fn walk_id(&self) -> usize {
        match self {
            WalkError::Scan { walk_id, .. } | WalkError::Graph { walk_id, .. } => *walk_id,
        }
    }

    /// Short failure class for summaries: fetch, parse, scan or graph.
    pub fn kind(&self) -> &'static str {
        match self {
            WalkError::Scan { source, .. } if source.is_fetch() => "fetch",
            WalkError::Scan { source, .. } if source.is_parse() => "parse",
            WalkError::Scan { .. } => "scan",
            WalkError::Graph { .. } => "graph",
        }
    }
}

/// Where a walk begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStart {
    Random,
    Address(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum WalkOutcome {
    /// Ran into a known page and merged into its chain.
    Converged(MergeReport),
    /// The entry page was already in the graph; nothing was recorded.
    DuplicateEntry,
    /// The last page had no followable link.
    DeadEnd { title: String, link: NextLink },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub walk_id: usize,
    pub entry: String,
    /// Titles of the pages this walk created, in order.
    pub created: Vec<String>,
    pub outcome: WalkOutcome,
}

/// Runs walks against a shared graph. Cheap to clone.
pub struct Walker<S> {
    graph: Arc<PageGraph>,
    source: Arc<S>,
    merge_timeout: Option<Duration>,
}

impl<S> Clone for Walker<S> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            source: self.source.clone(),
            merge_timeout: self.merge_timeout,
        }
    }
}

impl<S: PageSource> Walker<S> {
    pub fn new(graph: Arc<PageGraph>, source: Arc<S>) -> Self {
        Self {
            graph,
            source,
            merge_timeout: None,
        }
    }

    pub fn with_merge_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.merge_timeout = timeout;
        self
    }

    pub async fn run(&self, walk_id: usize, start: WalkStart) -> Result<WalkSummary, WalkError> {
        let entry = match &start {
            WalkStart::Random => self.source.random_page().await,
            WalkStart::Address(address) => self.source.page(address).await,
        }
        .map_err(|source| WalkError::Scan {
            walk_id,
            address: match &start {
                WalkStart::Random => "<random>".to_string(),
                WalkStart::Address(address) => address.clone(),
            },
            source,
        })?;

        if !self.graph.begin(&entry.title).await {
            debug!("Walk {} entry '{}' already known, abandoning", walk_id, entry.title);
            return Ok(WalkSummary {
                walk_id,
                entry: entry.title,
                created: Vec::new(),
                outcome: WalkOutcome::DuplicateEntry,
            });
        }
        info!("Walk {} starts at '{}'", walk_id, entry.title);

        let mut created = vec![entry.title.clone()];
        let entry_title = entry.title.clone();
        let mut current = entry;

        loop {
            let Some(address) = current.next.address().map(str::to_string) else {
                debug!(
                    "Walk {} reached a dead end at '{}' ({:?})",
                    walk_id, current.title, current.next
                );
                self.graph
                    .seal(&current.title)
                    .await
                    .map_err(|source| WalkError::Graph { walk_id, source })?;
                return Ok(WalkSummary {
                    walk_id,
                    entry: entry_title,
                    created,
                    outcome: WalkOutcome::DeadEnd {
                        title: current.title,
                        link: current.next,
                    },
                });
            };

            let page = match self.source.page(&address).await {
                Ok(page) => page,
                Err(source) => {
                    self.abandon(walk_id, &current.title).await;
                    return Err(WalkError::Scan {
                        walk_id,
                        address,
                        source,
                    });
                }
            };
            debug!("Walk {}: '{}' -> '{}'", walk_id, current.title, page.title);

            match self
                .graph
                .extend(&current.title, &page.title, self.merge_timeout)
                .await
            {
                Ok(Step::Created) => {
                    created.push(page.title.clone());
                    current = page;
                }
                Ok(Step::Converged(report)) => {
                    info!(
                        "Walk {} converged into '{}' after {} new pages ({} nodes updated)",
                        walk_id,
                        report.hit,
                        created.len(),
                        report.incremented.len()
                    );
                    return Ok(WalkSummary {
                        walk_id,
                        entry: entry_title,
                        created,
                        outcome: WalkOutcome::Converged(report),
                    });
                }
                Err(source) => {
                    self.abandon(walk_id, &current.title).await;
                    return Err(WalkError::Graph { walk_id, source });
                }
            }
        }
    }

    /// Seal the tail so merges waiting on it stop instead of hanging.
    async fn abandon(&self, walk_id: usize, tail: &str) {
        if let Err(e) = self.graph.seal(tail).await {
            warn!("Walk {} could not seal '{}': {}", walk_id, tail, e);
        }
    }
}
