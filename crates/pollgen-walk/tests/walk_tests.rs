use std::cell::RefCell;
use std::rc::Rc;

use pollgen_graph::{NodeId, NodeOptions, NodeOutcome, NoopAction, WalkGraph};
use pollgen_walk::traversal::engine::{Termination, WalkEngine};
use pollgen_walk::traversal::rng::walk_rng;
use pollgen_walk::traversal::selector::{choose_next, edge_probabilities};
use pollgen_walk::traversal::trace::WalkStepKind;
use proptest::prelude::*;

type Transcript = Rc<RefCell<Vec<String>>>;

/// Action that appends an interaction record, like a replay document builder.
fn record(transcript: &Transcript, line: &str) -> impl FnMut() -> NodeOutcome {
    let transcript = Rc::clone(transcript);
    let line = line.to_string();
    move || {
        transcript.borrow_mut().push(line.clone());
        NodeOutcome::Continue
    }
}

/// A small login-style scenario with branching, weights and a cycle.
fn build_session_graph(transcript: &Transcript) -> WalkGraph {
    let mut g = WalkGraph::new();
    let connect = g.add_node("connect", record(transcript, "write HELLO")).unwrap();
    let login = g
        .add_node_with(
            "login",
            record(transcript, "write LOGIN"),
            NodeOptions::default().chance(0.9),
        )
        .unwrap();
    let query = g
        .add_node_with(
            "query",
            record(transcript, "write QUERY"),
            NodeOptions::default().continue_chance(0.8),
        )
        .unwrap();
    let upload = g.add_node("upload", record(transcript, "write PUT")).unwrap();
    let quit = g.add_node("quit", record(transcript, "write QUIT")).unwrap();

    g.add_edge(connect, login).unwrap();
    g.add_weighted_edge(login, query, 3.0).unwrap();
    g.add_edge(login, upload).unwrap();
    g.add_weighted_edge(query, query, 2.0).unwrap();
    g.add_edge(query, quit).unwrap();
    g.add_edge(upload, quit).unwrap();
    g.set_start(connect).unwrap();
    g
}

#[test]
fn test_two_node_scenario_depths() {
    let mut graph = WalkGraph::new();
    let a = graph.add_node("A", NoopAction).unwrap();
    let b = graph
        .add_node_with(
            "B",
            NoopAction,
            NodeOptions::default().continue_chance(f64::MIN_POSITIVE),
        )
        .unwrap();
    let ab = graph.add_edge(a, b).unwrap();
    graph.set_start(a).unwrap();

    let result = WalkEngine::new(&mut graph, walk_rng(42)).walk().unwrap();

    assert_eq!(result.executed_nodes(), vec![a, b]);
    assert_eq!(graph.node(a).unwrap().execution_depths(), &[1]);
    assert_eq!(graph.node(b).unwrap().execution_depths(), &[2]);
    assert_eq!(graph.edge(ab).unwrap().traversal_depths(), &[2]);
}

#[test]
fn test_single_node_scenario() {
    let calls = Rc::new(RefCell::new(0));
    let counter = Rc::clone(&calls);
    let mut graph = WalkGraph::new();
    let a = graph
        .add_node("A", move || {
            *counter.borrow_mut() += 1;
            NodeOutcome::Continue
        })
        .unwrap();

    let result = WalkEngine::new(&mut graph, walk_rng(1)).walk().unwrap();

    assert_eq!(*calls.borrow(), 1);
    assert_eq!(result.termination, Termination::TerminalNode(a));
    assert_eq!(graph.node(a).unwrap().execution_depths(), &[1]);
}

#[test]
fn test_same_seed_same_walks() {
    let run = |seed: u64| {
        let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
        let mut graph = build_session_graph(&transcript);
        let results = WalkEngine::new(&mut graph, walk_rng(seed))
            .walk_many(50)
            .unwrap();
        let sequences: Vec<(Vec<NodeId>, Vec<(NodeId, NodeId)>)> = results
            .iter()
            .map(|r| (r.executed_nodes(), r.traversed_edges()))
            .collect();
        let lines = transcript.borrow().clone();
        (sequences, lines)
    };

    let (seq1, lines1) = run(42);
    let (seq2, lines2) = run(42);
    assert_eq!(seq1, seq2);
    assert_eq!(lines1, lines2);

    let (seq3, _) = run(43);
    assert_ne!(seq1, seq3);
}

#[test]
fn test_walk_follows_registered_edges_only() {
    let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
    let mut graph = build_session_graph(&transcript);
    let results = WalkEngine::new(&mut graph, walk_rng(9)).walk_many(200).unwrap();

    for result in &results {
        for (from, to) in result.traversed_edges() {
            assert!(graph.edge_between(from, to).is_some());
        }
        let executed = result.executed_nodes();
        for pair in executed.windows(2) {
            assert!(graph.edge_between(pair[0], pair[1]).is_some());
        }
    }
}

#[test]
fn test_transcript_matches_executions() {
    let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
    let mut graph = build_session_graph(&transcript);
    let result = WalkEngine::new(&mut graph, walk_rng(5)).walk().unwrap();

    assert_eq!(transcript.borrow().len() as u64, result.depth);
    assert_eq!(transcript.borrow()[0], "write HELLO");
}

#[test]
fn test_selector_ratio_one_to_three() {
    let mut graph = WalkGraph::new();
    let src = graph.add_node("src", NoopAction).unwrap();
    let first = graph.add_node("first", NoopAction).unwrap();
    let second = graph.add_node("second", NoopAction).unwrap();
    graph.add_weighted_edge(src, first, 1.0).unwrap();
    graph.add_weighted_edge(src, second, 3.0).unwrap();

    assert_eq!(
        edge_probabilities(&graph, src),
        vec![(first, 0.25), (second, 0.75)]
    );

    let mut rng = walk_rng(2024);
    let n = 40_000;
    let hits = (0..n)
        .filter(|_| choose_next(&graph, src, &mut rng).unwrap() == second)
        .count();
    let ratio = hits as f64 / n as f64;
    assert!((ratio - 0.75).abs() < 0.015, "ratio was {ratio}");
}

#[test]
fn test_selector_ratio_with_overflowing_total() {
    let mut graph = WalkGraph::new();
    let src = graph.add_node("src", NoopAction).unwrap();
    let first = graph.add_node("first", NoopAction).unwrap();
    let second = graph.add_node("second", NoopAction).unwrap();
    graph.add_weighted_edge(src, first, f64::MAX / 3.0).unwrap();
    graph.add_weighted_edge(src, second, f64::MAX).unwrap();

    let probabilities = edge_probabilities(&graph, src);
    assert!((probabilities[0].1 - 0.25).abs() < 1e-12);
    assert!((probabilities[1].1 - 0.75).abs() < 1e-12);

    let mut rng = walk_rng(2024);
    let n = 40_000;
    let hits = (0..n)
        .filter(|_| choose_next(&graph, src, &mut rng).unwrap() == second)
        .count();
    let ratio = hits as f64 / n as f64;
    assert!((ratio - 0.75).abs() < 0.015, "ratio was {ratio}");
}

#[test]
fn test_abort_ends_walk_mid_path() {
    let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
    let mut graph = WalkGraph::new();
    let a = graph.add_node("a", record(&transcript, "a")).unwrap();
    let sink = Rc::clone(&transcript);
    let b = graph
        .add_node("b", move || {
            sink.borrow_mut().push("b".to_string());
            NodeOutcome::from_code(-1)
        })
        .unwrap();
    let c = graph.add_node("c", record(&transcript, "c")).unwrap();
    graph.add_edge(a, b).unwrap();
    graph.add_edge(b, c).unwrap();
    graph.set_start(a).unwrap();

    let result = WalkEngine::new(&mut graph, walk_rng(0)).walk().unwrap();

    assert_eq!(result.termination, Termination::Aborted(b));
    assert_eq!(*transcript.borrow(), vec!["a".to_string(), "b".to_string()]);
    let last_two: Vec<_> = result.trace.steps().iter().rev().take(2).collect();
    assert!(matches!(
        last_two[1].kind,
        WalkStepKind::Executed {
            outcome: NodeOutcome::Abort,
            ..
        }
    ));
    assert!(graph.node(c).unwrap().execution_depths().is_empty());
}

#[test]
fn test_reset_history_between_batches() {
    let transcript: Transcript = Rc::new(RefCell::new(Vec::new()));
    let mut graph = build_session_graph(&transcript);
    WalkEngine::new(&mut graph, walk_rng(1)).walk_many(20).unwrap();
    assert!(!graph.nodes()[0].execution_depths().is_empty());

    graph.reset_history();
    assert!(graph.nodes().iter().all(|n| n.execution_depths().is_empty()));
    assert!(graph.edges().iter().all(|e| e.traversal_depths().is_empty()));
    assert_eq!(graph.edge_count(), 6);
}

proptest! {
    /// No walk executes more nodes than max_depth, whatever the graph shape.
    #[test]
    fn walks_respect_max_depth(
        node_count in 1usize..6,
        edges in prop::collection::vec((0usize..6, 0usize..6, 0.1f64..5.0), 0..20),
        max_depth in 1u64..12,
        seed in any::<u64>(),
    ) {
        let mut graph = WalkGraph::new();
        for i in 0..node_count {
            graph.add_node(&format!("n{i}"), NoopAction).unwrap();
        }
        for (from, to, weight) in edges {
            let (from, to) = ((from % node_count) as NodeId, (to % node_count) as NodeId);
            // Duplicates are expected from random pairs; skip them.
            let _ = graph.add_weighted_edge(from, to, weight);
        }
        graph.set_max_depth(max_depth).unwrap();

        let mut engine = WalkEngine::new(&mut graph, walk_rng(seed));
        for _ in 0..5 {
            let result = engine.walk().unwrap();
            prop_assert!(result.depth <= max_depth);
            prop_assert_eq!(result.executed_nodes().len() as u64, result.depth);
        }
        drop(engine);

        for node in graph.nodes() {
            prop_assert!(node.execution_depths().iter().all(|&d| d >= 1 && d <= max_depth));
        }
    }

    /// An aborting action is always the last executed step of its walk.
    #[test]
    fn abort_is_always_final(seed in any::<u64>(), abort_at in 0usize..4) {
        let mut graph = WalkGraph::new();
        let mut ids = Vec::new();
        for i in 0..4 {
            let id = if i == abort_at {
                graph.add_node(&format!("n{i}"), || NodeOutcome::Abort).unwrap()
            } else {
                graph.add_node(&format!("n{i}"), NoopAction).unwrap()
            };
            ids.push(id);
        }
        for &from in &ids {
            for &to in &ids {
                graph.add_edge(from, to).unwrap();
            }
        }
        graph.set_max_depth(50).unwrap();

        let mut engine = WalkEngine::new(&mut graph, walk_rng(seed));
        for _ in 0..5 {
            let result = engine.walk().unwrap();
            let executed = result.executed_nodes();
            if let Some(pos) = executed.iter().position(|&n| n == ids[abort_at]) {
                prop_assert_eq!(pos, executed.len() - 1);
                prop_assert_eq!(result.termination, Termination::Aborted(ids[abort_at]));
            }
        }
    }
}
