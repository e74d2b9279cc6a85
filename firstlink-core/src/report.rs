// Report generation from a finished run

use crate::attractor::{Attractor, find_attractors};
use crate::crawl::{RunResult, RunSummary, WalkFailure};
use crate::graph::NodeSummary;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub visits: u64,
    pub title: String,
    /// Title of the outgoing edge, if one was linked.
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportData {
    pub summary: RunSummary,
    pub pages: usize,
    pub total_visits: u64,
    pub ranking: Vec<RankedEntry>,
    pub attractors: Vec<Attractor>,
    pub failures: Vec<WalkFailure>,
}

/// Rank nodes ascending by visit count. Ties are ordered by title so the
/// order is stable within and across runs.
pub fn rank_nodes(nodes: &[NodeSummary]) -> Vec<RankedEntry> {
    let mut ranking: Vec<RankedEntry> = nodes
        .iter()
        .map(|node| RankedEntry {
            visits: node.visits,
            title: node.title.clone(),
            next: node.next_title().map(str::to_string),
        })
        .collect();
    ranking.sort_by(|a, b| a.visits.cmp(&b.visits).then_with(|| a.title.cmp(&b.title)));
    ranking
}

pub async fn gather_report_data(result: &RunResult) -> ReportData {
    let nodes = result.graph.snapshot().await;
    ReportData {
        summary: result.summary(),
        pages: nodes.len(),
        total_visits: nodes.iter().map(|n| n.visits).sum(),
        ranking: rank_nodes(&nodes),
        attractors: find_attractors(&nodes),
        failures: result.failures.clone(),
    }
}

/// One line per page: right-aligned counter, tab, title, tab, next title.
pub fn generate_text_report(ranking: &[RankedEntry]) -> String {
    let mut report = String::new();
    for entry in ranking {
        report.push_str(&format!(
            "{:>10}\t{}\t{}\n",
            entry.visits,
            entry.title,
            entry.next.as_deref().unwrap_or("")
        ));
    }
    report
}

pub fn generate_json_report(data: &ReportData) -> serde_json::Result<String> {
    serde_json::to_string_pretty(data)
}

pub fn generate_attractor_summary(attractors: &[Attractor]) -> String {
    let mut report = String::new();
    report.push_str("# Attractors:\n");
    if attractors.is_empty() {
        report.push_str("  none (every chain ended in a dead end)\n");
        return report;
    }
    for attractor in attractors {
        report.push_str(&format!(
            "  basin {:>6}  visits {:>8}  {}\n",
            attractor.basin_size,
            attractor.visits,
            attractor.members.join(" -> ")
        ));
    }
    report
}

pub fn generate_run_summary(data: &ReportData) -> String {
    let summary = &data.summary;
    let mut report = String::new();
    report.push_str("# Summary:\n");
    report.push_str(&format!("  Walks: {}\n", summary.walks));
    report.push_str(&format!("  Converged: {}\n", summary.converged));
    report.push_str(&format!("  Duplicate entries: {}\n", summary.duplicate_entries));
    report.push_str(&format!("  Dead ends: {}\n", summary.dead_ends));
    report.push_str(&format!("  Failed: {}\n", summary.failed));
    report.push_str(&format!("  Pages: {}\n", data.pages));
    report.push_str(&format!("  Total visits: {}\n", data.total_visits));
    for failure in &data.failures {
        report.push_str(&format!("  [!] {}: {}\n", failure.kind, failure.message));
    }
    report
}
