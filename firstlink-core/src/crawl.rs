use crate::graph::PageGraph;
use crate::walk::{WalkError, WalkOutcome, WalkStart, WalkSummary, Walker};
use firstlink_scanner::PageSource;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::{self, JoinError, JoinSet};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum RunError {
    #[error("No walks requested")]
    NothingToDo,

    #[error("Aborting run: {0}")]
    WalkFailed(#[from] WalkError),

    #[error("Walk task failed: {0}")]
    JoinError(#[from] JoinError),
}

/// Options for configuring a run
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Number of random walks to launch. Ignored when `start` is set.
    pub walks: usize,
    /// Maximum walks in flight; `None` launches everything at once.
    pub concurrency: Option<usize>,
    /// Follow a single chain from this address instead of random entries.
    pub start: Option<String>,
    /// Abort the whole run on the first failed walk.
    pub fail_fast: bool,
    pub merge_timeout: Option<Duration>,
    pub show_progress_bars: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            walks: 100,
            concurrency: None,
            start: None,
            fail_fast: false,
            merge_timeout: None,
            show_progress_bars: false,
        }
    }
}

/// Progress snapshot handed to the callback after every finished walk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunProgress {
    pub finished: usize,
    pub failed: usize,
    pub total: usize,
}

pub type RunProgressCallback = Arc<dyn Fn(RunProgress) + Send + Sync>;

#[derive(Debug, Clone, Serialize)]
pub struct WalkFailure {
    pub walk_id: usize,
    pub kind: String,
    pub message: String,
}

/// A walk that ended in an error, or whose task died.
enum Failure {
    Walk(WalkError),
    Task { walk_id: usize, source: JoinError },
}

impl From<Failure> for RunError {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Walk(e) => RunError::WalkFailed(e),
            Failure::Task { source, .. } => RunError::JoinError(source),
        }
    }
}

impl Failure {
    fn message(&self) -> String {
        match self {
            Failure::Walk(e) => e.to_string(),
            Failure::Task { walk_id, source } => format!("Walk {} task failed: {}", walk_id, source),
        }
    }

    fn record(&self) -> WalkFailure {
        let (walk_id, kind) = match self {
            Failure::Walk(e) => (e.walk_id(), e.kind()),
            Failure::Task { walk_id, source } if source.is_panic() => (*walk_id, "panic"),
            Failure::Task { walk_id, .. } => (*walk_id, "cancelled"),
        };
        WalkFailure {
            walk_id,
            kind: kind.to_string(),
            message: self.message(),
        }
    }
}

/// Everything a finished run produced. The graph is quiescent: every walk
/// has exited, so reading it contends with nobody.
pub struct RunResult {
    pub graph: Arc<PageGraph>,
    pub walks: Vec<WalkSummary>,
    pub failures: Vec<WalkFailure>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub walks: usize,
    pub converged: usize,
    pub duplicate_entries: usize,
    pub dead_ends: usize,
    pub failed: usize,
}

impl RunResult {
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            walks: self.walks.len() + self.failures.len(),
            failed: self.failures.len(),
            ..RunSummary::default()
        };
        for walk in &self.walks {
            match walk.outcome {
                WalkOutcome::Converged(_) => summary.converged += 1,
                WalkOutcome::DuplicateEntry => summary.duplicate_entries += 1,
                WalkOutcome::DeadEnd { .. } => summary.dead_ends += 1,
            }
        }
        summary
    }
}

/// Execute a run with the given options.
///
/// Walks are spawned onto the runtime up to the concurrency limit; each
/// finished walk frees a slot for the next. Returns once every walk has
/// terminated.
pub async fn execute_run<S: PageSource>(
    options: RunOptions,
    source: Arc<S>,
    progress_callback: Option<RunProgressCallback>,
) -> Result<RunResult, RunError> {
    let RunOptions {
        walks,
        concurrency,
        start,
        fail_fast,
        merge_timeout,
        show_progress_bars,
    } = options;

    let requests: Vec<WalkStart> = match start {
        Some(address) => vec![WalkStart::Address(address)],
        None => vec![WalkStart::Random; walks],
    };
    if requests.is_empty() {
        return Err(RunError::NothingToDo);
    }

    let total = requests.len();
    let limit = concurrency.unwrap_or(total).clamp(1, total);
    info!("Starting {} walks, at most {} at a time", total, limit);

    let progress_bar = if show_progress_bars {
        let pb = ProgressBar::new(total as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(style.progress_chars("=>-"));
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        pb.set_message("walking...");
        Some(pb)
    } else {
        None
    };

    let graph = Arc::new(PageGraph::new());
    let walker = Walker::new(graph.clone(), source).with_merge_timeout(merge_timeout);

    let mut pending = requests.into_iter().enumerate();
    let mut in_flight: JoinSet<Result<WalkSummary, WalkError>> = JoinSet::new();
    // Task ids of running walks, so a panicked task can still be attributed.
    let mut walk_ids: HashMap<task::Id, usize> = HashMap::new();
    let mut spawn_next = |in_flight: &mut JoinSet<Result<WalkSummary, WalkError>>,
                          walk_ids: &mut HashMap<task::Id, usize>| {
        if let Some((walk_id, start)) = pending.next() {
            let walker = walker.clone();
            let handle = in_flight.spawn(async move { walker.run(walk_id, start).await });
            walk_ids.insert(handle.id(), walk_id);
        }
    };

    for _ in 0..limit {
        spawn_next(&mut in_flight, &mut walk_ids);
    }

    let mut summaries = Vec::with_capacity(total);
    let mut failures = Vec::new();

    while let Some(joined) = in_flight.join_next_with_id().await {
        let failure: Option<Failure> = match joined {
            Ok((id, Ok(summary))) => {
                walk_ids.remove(&id);
                debug!("Walk {} finished: {:?}", summary.walk_id, summary.outcome);
                summaries.push(summary);
                None
            }
            Ok((id, Err(e))) => {
                walk_ids.remove(&id);
                Some(Failure::Walk(e))
            }
            Err(e) => {
                let walk_id = walk_ids.remove(&e.id()).unwrap_or(usize::MAX);
                Some(Failure::Task { walk_id, source: e })
            }
        };

        if let Some(failure) = failure {
            if fail_fast {
                in_flight.abort_all();
                // Cancelled walks are dropped here, not after the run returns.
                while in_flight.join_next().await.is_some() {}
                if let Some(ref pb) = progress_bar {
                    pb.abandon_with_message("aborted");
                }
                return Err(failure.into());
            }
            warn!("{}", failure.message());
            failures.push(failure.record());
        }

        let progress = RunProgress {
            finished: summaries.len() + failures.len(),
            failed: failures.len(),
            total,
        };
        if let Some(ref pb) = progress_bar {
            pb.set_position(progress.finished as u64);
            pb.set_message(format!("{} failed", progress.failed));
        }
        if let Some(ref callback) = progress_callback {
            callback(progress);
        }

        spawn_next(&mut in_flight, &mut walk_ids);
    }

    if let Some(ref pb) = progress_bar {
        pb.finish_with_message(format!("{} walks done", total));
    }

    summaries.sort_by_key(|s| s.walk_id);
    failures.sort_by_key(|f| f.walk_id);
    info!(
        "Run complete: {} walks, {} failed, {} pages",
        total,
        failures.len(),
        graph.len().await
    );

    Ok(RunResult {
        graph,
        walks: summaries,
        failures,
    })
}
