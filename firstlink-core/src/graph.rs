// The shared page graph.
//
// Every walk appends to one functional graph (each page has at most one
// outgoing edge) keyed by title. All access goes through `PageGraph`,
// which holds the only lock; callers never see the map or a guard.
//
// A node's edge starts out `Pending` while the walk that created it (its
// owner) is still fetching the next page. A convergence merge that runs
// into a pending edge parks on that node's readiness signal with the lock
// released. Owners always resolve their pending edge: by linking it, or by
// sealing it when their walk ends early.

use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::time::Instant;
use tracing::{debug, trace};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("Unknown page: {0}")]
    UnknownNode(String),

    #[error("Edge from '{from}' already points at '{existing}', refusing to relink to '{attempted}'")]
    EdgeAlreadySet {
        from: String,
        existing: String,
        attempted: String,
    },

    #[error("Edge from '{from}' was sealed as a dead end")]
    EdgeSealed { from: String },

    #[error("Gave up waiting {waited:?} for '{title}' to get an outgoing edge")]
    MergeTimeout { title: String, waited: Duration },
}

pub type Result<T> = std::result::Result<T, GraphError>;

/// Outgoing edge of a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NextEdge {
    /// The owning walk has not fetched the successor yet.
    Pending,
    Linked(String),
    /// The owning walk ended here without a successor.
    DeadEnd,
}

struct PageNode {
    next: NextEdge,
    /// Titles of predecessors. Advisory only: may contain duplicates and
    /// nothing relies on it being complete.
    referrers: Vec<String>,
    visits: u64,
    ready: Arc<Notify>,
}

impl PageNode {
    fn new(referrer: Option<&str>) -> Self {
        Self {
            next: NextEdge::Pending,
            referrers: referrer.map(|r| vec![r.to_string()]).unwrap_or_default(),
            visits: 1,
            ready: Arc::new(Notify::new()),
        }
    }
}

/// Read-only copy of a node, taken under the lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub title: String,
    pub next: NextEdge,
    pub referrers: Vec<String>,
    pub visits: u64,
}

impl NodeSummary {
    pub fn next_title(&self) -> Option<&str> {
        match &self.next {
            NextEdge::Linked(title) => Some(title),
            NextEdge::Pending | NextEdge::DeadEnd => None,
        }
    }
}

/// What one convergence merge did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeReport {
    /// The already-known page the walk ran into.
    pub hit: String,
    /// Nodes whose counter this pass incremented, in chain order.
    pub incremented: Vec<String>,
    /// How often the pass had to wait for a pending edge.
    pub waits: usize,
    /// True when the pass stopped on a node it had already touched.
    pub closed_cycle: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// The page was new; the walk continues from it.
    Created,
    /// The page was known; the walk is over.
    Converged(MergeReport),
}

type Nodes = HashMap<String, PageNode>;

#[derive(Default)]
pub struct PageGraph {
    nodes: Mutex<Nodes>,
}

impl PageGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry page with no predecessor. Returns false if the title
    /// is already known, in which case the graph is untouched.
    pub async fn begin(&self, title: &str) -> bool {
        let mut nodes = self.nodes.lock().await;
        if nodes.contains_key(title) {
            return false;
        }
        nodes.insert(title.to_string(), PageNode::new(None));
        true
    }

    /// Record that the page `from` links to the page `title`.
    ///
    /// An unseen title becomes a new node owned by the caller. A known title
    /// is a convergence: the edge is attached and a merge pass propagates
    /// one visit along the existing chain. `merge_timeout` caps the total
    /// time that pass may spend waiting on pending edges.
    pub async fn extend(
        &self,
        from: &str,
        title: &str,
        merge_timeout: Option<Duration>,
    ) -> Result<Step> {
        let mut nodes = self.nodes.lock().await;

        let known = nodes.contains_key(title);
        link_edge(&mut nodes, from, title)?;

        if !known {
            nodes.insert(title.to_string(), PageNode::new(Some(from)));
            trace!("Created '{}' after '{}'", title, from);
            return Ok(Step::Created);
        }

        let hit = node_mut(&mut nodes, title)?;
        hit.visits += 1;
        hit.referrers.push(from.to_string());
        debug!("'{}' converged into known page '{}'", from, title);

        let report = self.propagate(nodes, title, merge_timeout).await?;
        Ok(Step::Converged(report))
    }

    /// Mark a node as having no successor. Linked edges are left alone.
    pub async fn seal(&self, title: &str) -> Result<()> {
        let mut nodes = self.nodes.lock().await;
        let node = node_mut(&mut nodes, title)?;
        if node.next == NextEdge::Pending {
            node.next = NextEdge::DeadEnd;
            node.ready.notify_waiters();
        }
        Ok(())
    }

    pub async fn get(&self, title: &str) -> Option<NodeSummary> {
        let nodes = self.nodes.lock().await;
        nodes.get(title).map(|node| summarize(title, node))
    }

    pub async fn contains(&self, title: &str) -> bool {
        self.nodes.lock().await.contains_key(title)
    }

    pub async fn len(&self) -> usize {
        self.nodes.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.nodes.lock().await.is_empty()
    }

    pub async fn total_visits(&self) -> u64 {
        self.nodes.lock().await.values().map(|n| n.visits).sum()
    }

    /// Copy every node out, ordered by title.
    pub async fn snapshot(&self) -> Vec<NodeSummary> {
        let nodes = self.nodes.lock().await;
        let mut summaries: Vec<NodeSummary> = nodes
            .iter()
            .map(|(title, node)| summarize(title, node))
            .collect();
        summaries.sort_by(|a, b| a.title.cmp(&b.title));
        summaries
    }

    /// Walk the existing chain after `hit`, adding one visit to every node
    /// not yet touched by this pass. The hit itself was already counted.
    async fn propagate(
        &self,
        mut nodes: MutexGuard<'_, Nodes>,
        hit: &str,
        merge_timeout: Option<Duration>,
    ) -> Result<MergeReport> {
        let deadline = merge_timeout.map(|limit| Instant::now() + limit);
        let mut touched: HashSet<String> = HashSet::from([hit.to_string()]);
        let mut report = MergeReport {
            hit: hit.to_string(),
            incremented: vec![hit.to_string()],
            waits: 0,
            closed_cycle: false,
        };
        let mut current = hit.to_string();

        loop {
            let node = node_mut(&mut nodes, &current)?;
            match node.next.clone() {
                NextEdge::Linked(next) => {
                    if touched.contains(&next) {
                        report.closed_cycle = true;
                        return Ok(report);
                    }
                    node_mut(&mut nodes, &next)?.visits += 1;
                    touched.insert(next.clone());
                    report.incremented.push(next.clone());
                    current = next;
                }
                NextEdge::DeadEnd => return Ok(report),
                NextEdge::Pending => {
                    let ready = node.ready.clone();
                    let notified = ready.notified();
                    tokio::pin!(notified);
                    // Register before unlocking so the owner's notify cannot
                    // slip in between.
                    notified.as_mut().enable();
                    drop(nodes);

                    report.waits += 1;
                    debug!("Merge waiting for '{}' to get a successor", current);
                    match (deadline, merge_timeout) {
                        (Some(deadline), Some(limit)) => {
                            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                                return Err(GraphError::MergeTimeout {
                                    title: current,
                                    waited: limit,
                                });
                            }
                        }
                        _ => notified.await,
                    }

                    nodes = self.nodes.lock().await;
                }
            }
        }
    }
}

fn node_mut<'a>(nodes: &'a mut Nodes, title: &str) -> Result<&'a mut PageNode> {
    nodes
        .get_mut(title)
        .ok_or_else(|| GraphError::UnknownNode(title.to_string()))
}

/// Set `from`'s outgoing edge and wake anyone waiting on it.
fn link_edge(nodes: &mut Nodes, from: &str, to: &str) -> Result<()> {
    let node = node_mut(nodes, from)?;
    match &node.next {
        NextEdge::Pending => {
            node.next = NextEdge::Linked(to.to_string());
            node.ready.notify_waiters();
            Ok(())
        }
        NextEdge::Linked(existing) if existing == to => Ok(()),
        NextEdge::Linked(existing) => Err(GraphError::EdgeAlreadySet {
            from: from.to_string(),
            existing: existing.clone(),
            attempted: to.to_string(),
        }),
        NextEdge::DeadEnd => Err(GraphError::EdgeSealed {
            from: from.to_string(),
        }),
    }
}

fn summarize(title: &str, node: &PageNode) -> NodeSummary {
    NodeSummary {
        title: title.to_string(),
        next: node.next.clone(),
        referrers: node.referrers.clone(),
        visits: node.visits,
    }
}
