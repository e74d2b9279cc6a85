// Attractor analysis over a finished graph.
//
// Because every page has at most one successor, following edges from any
// page either ends at a page without a successor or enters exactly one
// cycle. Those cycles are the attractors; the pages that flow into one
// form its basin.

use crate::graph::NodeSummary;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attractor {
    /// Cycle members in edge order, starting from the smallest title.
    pub members: Vec<String>,
    /// Number of pages whose chain ends in this cycle, members included.
    pub basin_size: usize,
    /// Sum of the members' visit counters.
    pub visits: u64,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    OnPath,
    Done,
}

/// Find every cycle in `nodes` together with its basin, largest basin first.
pub fn find_attractors(nodes: &[NodeSummary]) -> Vec<Attractor> {
    let index: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.title.as_str(), i))
        .collect();
    let successor: Vec<Option<usize>> = nodes
        .iter()
        .map(|node| node.next_title().and_then(|t| index.get(t).copied()))
        .collect();

    let mut marks = vec![Mark::Unseen; nodes.len()];
    let mut owner: Vec<Option<usize>> = vec![None; nodes.len()];
    let mut cycles: Vec<Vec<usize>> = Vec::new();

    for start in 0..nodes.len() {
        if marks[start] != Mark::Unseen {
            continue;
        }

        let mut path = Vec::new();
        let mut cursor = Some(start);
        while let Some(i) = cursor {
            if marks[i] != Mark::Unseen {
                break;
            }
            marks[i] = Mark::OnPath;
            path.push(i);
            cursor = successor[i];
        }

        let resolved = match cursor {
            Some(i) if marks[i] == Mark::OnPath => path.iter().position(|&p| p == i).map(|pos| {
                let id = cycles.len();
                for &member in &path[pos..] {
                    owner[member] = Some(id);
                }
                cycles.push(path[pos..].to_vec());
                id
            }),
            Some(i) => owner[i],
            None => None,
        };

        for &i in &path {
            marks[i] = Mark::Done;
            if owner[i].is_none() {
                owner[i] = resolved;
            }
        }
    }

    let mut attractors: Vec<Attractor> = cycles
        .into_iter()
        .enumerate()
        .map(|(id, cycle)| {
            let rotate = cycle
                .iter()
                .enumerate()
                .min_by(|a, b| nodes[*a.1].title.cmp(&nodes[*b.1].title))
                .map(|(pos, _)| pos)
                .unwrap_or(0);
            let members = cycle[rotate..]
                .iter()
                .chain(&cycle[..rotate])
                .map(|&i| nodes[i].title.clone())
                .collect();
            Attractor {
                members,
                basin_size: owner.iter().filter(|o| **o == Some(id)).count(),
                visits: cycle.iter().map(|&i| nodes[i].visits).sum(),
            }
        })
        .collect();

    attractors.sort_by(|a, b| {
        b.basin_size
            .cmp(&a.basin_size)
            .then_with(|| a.members.cmp(&b.members))
    });
    attractors
}
