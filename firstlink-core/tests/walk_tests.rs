// Tests for walks sharing one graph

mod common;

use common::{MapSource, address, visits};
use firstlink_core::graph::NextEdge;
use firstlink_core::{PageGraph, WalkError, WalkOutcome, WalkStart, Walker};
use std::sync::Arc;
use std::time::Duration;

fn walker(graph: &Arc<PageGraph>, source: MapSource) -> Walker<MapSource> {
    Walker::new(graph.clone(), Arc::new(source))
}

// ============================================================================
// Single Walk Tests
// ============================================================================

#[tokio::test]
async fn test_walk_creates_chain_until_dead_end() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new()
        .page("A", Some("B"))
        .page("B", Some("C"))
        .page("C", None);

    let summary = walker(&graph, source)
        .run(0, WalkStart::Address(address("A")))
        .await
        .unwrap();

    assert_eq!(summary.entry, "A");
    assert_eq!(summary.created, vec!["A", "B", "C"]);
    assert!(matches!(summary.outcome, WalkOutcome::DeadEnd { ref title, .. } if title == "C"));
    assert_eq!(graph.get("C").await.unwrap().next, NextEdge::DeadEnd);
    assert_eq!(graph.total_visits().await, 3);
}

#[tokio::test]
async fn test_walk_converges_on_own_cycle() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new()
        .page("A", Some("B"))
        .page("B", Some("C"))
        .page("C", Some("B"));

    let summary = walker(&graph, source)
        .run(0, WalkStart::Address(address("A")))
        .await
        .unwrap();

    let WalkOutcome::Converged(report) = summary.outcome else {
        panic!("expected convergence");
    };
    assert_eq!(report.hit, "B");
    assert!(report.closed_cycle);
    assert_eq!(visits(&graph, "A").await, 1);
    assert_eq!(visits(&graph, "B").await, 2);
    assert_eq!(visits(&graph, "C").await, 2);
}

#[tokio::test]
async fn test_redirected_title_is_the_key() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new()
        .page("A", Some("Alias"))
        .redirect("Alias", "Target", Some("A"));

    walker(&graph, source)
        .run(0, WalkStart::Address(address("A")))
        .await
        .unwrap();

    assert!(graph.contains("Target").await);
    assert!(!graph.contains("Alias").await);
    assert_eq!(graph.get("A").await.unwrap().next_title(), Some("Target"));
}

#[tokio::test]
async fn test_duplicate_entry_is_abandoned() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new().page("A", Some("B")).page("B", None);
    let walker = walker(&graph, source);

    walker.run(0, WalkStart::Address(address("A"))).await.unwrap();
    let second = walker.run(1, WalkStart::Address(address("B"))).await.unwrap();

    assert_eq!(second.outcome, WalkOutcome::DuplicateEntry);
    assert!(second.created.is_empty());
    assert_eq!(visits(&graph, "B").await, 1);
}

#[tokio::test]
async fn test_fetch_failure_seals_tail() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new()
        .page("A", Some("Broken"))
        .page("Broken", None)
        .failing("Broken");

    let err = walker(&graph, source)
        .run(7, WalkStart::Address(address("A")))
        .await
        .unwrap_err();

    assert_eq!(err.walk_id(), 7);
    assert!(matches!(err, WalkError::Scan { ref address, .. } if address == "/wiki/Broken"));
    assert_eq!(graph.get("A").await.unwrap().next, NextEdge::DeadEnd);
}

#[tokio::test]
async fn test_entry_failure_leaves_graph_untouched() {
    let graph = Arc::new(PageGraph::new());
    let err = walker(&graph, MapSource::new())
        .run(0, WalkStart::Random)
        .await
        .unwrap_err();

    assert!(matches!(err, WalkError::Scan { ref address, .. } if address == "<random>"));
    assert!(graph.is_empty().await);
}

// ============================================================================
// Convergence Tests
// ============================================================================

#[tokio::test]
async fn test_merge_into_failed_chain_does_not_hang() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new()
        .page("A", Some("Broken"))
        .failing("Broken")
        .page("X", Some("A"));
    let walker = walker(&graph, source);

    assert!(walker.run(0, WalkStart::Address(address("A"))).await.is_err());
    let summary = tokio::time::timeout(
        Duration::from_secs(5),
        walker.run(1, WalkStart::Address(address("X"))),
    )
    .await
    .expect("merge hung on a sealed chain")
    .unwrap();

    assert!(matches!(summary.outcome, WalkOutcome::Converged(_)));
    assert_eq!(visits(&graph, "A").await, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_merge_waits_for_in_flight_owner() {
    let graph = Arc::new(PageGraph::new());
    let source = MapSource::new()
        .page("A", Some("B"))
        .page("B", None)
        .page("X", Some("A"))
        .delay("B", Duration::from_millis(200))
        .delay("X", Duration::from_millis(50));
    let walker = walker(&graph, source);

    let owner = {
        let walker = walker.clone();
        tokio::spawn(async move { walker.run(0, WalkStart::Address(address("A"))).await })
    };
    let merger = {
        let walker = walker.clone();
        tokio::spawn(async move { walker.run(1, WalkStart::Address(address("X"))).await })
    };

    let owner = owner.await.unwrap().unwrap();
    let merger = merger.await.unwrap().unwrap();

    assert!(matches!(owner.outcome, WalkOutcome::DeadEnd { .. }));
    let WalkOutcome::Converged(report) = merger.outcome else {
        panic!("expected convergence");
    };
    assert!(report.waits >= 1, "merge should have waited for A's edge");
    assert_eq!(report.incremented, vec!["A", "B"]);
    assert_eq!(visits(&graph, "A").await, 2);
    assert_eq!(visits(&graph, "B").await, 2);
    assert_eq!(visits(&graph, "X").await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_walks_share_suffix_without_lost_updates() {
    const WALKS: usize = 16;

    let graph = Arc::new(PageGraph::new());
    let mut source = MapSource::new()
        .page("S1", Some("S2"))
        .page("S2", Some("S3"))
        .page("S3", Some("S4"))
        .page("S4", Some("S5"))
        .page("S5", None)
        .probe(graph.clone());
    for suffix in ["S1", "S2", "S3", "S4", "S5"] {
        source = source.delay(suffix, Duration::from_millis(5));
    }
    for i in 0..WALKS {
        let entry = format!("P{}", i);
        let middle = format!("Q{}", i);
        source = source
            .page(&entry, Some(&middle))
            .page(&middle, Some("S1"))
            .delay(&middle, Duration::from_millis((i as u64 % 4) * 3));
    }
    let walker = walker(&graph, source);

    let handles: Vec<_> = (0..WALKS)
        .map(|i| {
            let walker = walker.clone();
            tokio::spawn(async move {
                walker
                    .run(i, WalkStart::Address(address(&format!("P{}", i))))
                    .await
            })
        })
        .collect();

    let all = async {
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("walks deadlocked");

    for suffix in ["S1", "S2", "S3", "S4", "S5"] {
        assert_eq!(visits(&graph, suffix).await, WALKS as u64, "{}", suffix);
    }
    for i in 0..WALKS {
        assert_eq!(visits(&graph, &format!("P{}", i)).await, 1);
        assert_eq!(visits(&graph, &format!("Q{}", i)).await, 1);
    }
    assert_eq!(graph.len().await, 2 * WALKS + 5);
    assert_eq!(graph.total_visits().await, (2 * WALKS + 5 * WALKS) as u64);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_walks_into_shared_cycle() {
    const WALKS: usize = 8;

    let graph = Arc::new(PageGraph::new());
    // S1 -> S2 -> S3 -> S4 -> S2: the walk that builds the cycle lands on
    // S2..S4 twice, every other walk once.
    let mut source = MapSource::new()
        .page("S1", Some("S2"))
        .page("S2", Some("S3"))
        .page("S3", Some("S4"))
        .page("S4", Some("S2"))
        .delay("S3", Duration::from_millis(10))
        .probe(graph.clone());
    for i in 0..WALKS {
        source = source.page(&format!("P{}", i), Some("S1"));
    }
    let walker = walker(&graph, source);

    let handles: Vec<_> = (0..WALKS)
        .map(|i| {
            let walker = walker.clone();
            tokio::spawn(async move {
                walker
                    .run(i, WalkStart::Address(address(&format!("P{}", i))))
                    .await
            })
        })
        .collect();

    let mut merges = 0;
    for handle in handles {
        let summary = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .expect("walk deadlocked")
            .unwrap()
            .unwrap();
        if let WalkOutcome::Converged(_) = summary.outcome {
            merges += 1;
        }
    }

    // One merge pass per walk, no more.
    assert_eq!(merges, WALKS);
    assert_eq!(visits(&graph, "S1").await, WALKS as u64);
    for member in ["S2", "S3", "S4"] {
        assert_eq!(visits(&graph, member).await, WALKS as u64 + 1, "{}", member);
    }
}
