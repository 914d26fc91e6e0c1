/// Module for computing analytical metrics to evaluate IR obfuscation transforms.
///
/// Implements a small set of metrics quantified by symbol counts, body size, control flow
/// complexity and dominator overlap to assess transform potency (analyst effort). The module
/// provides functions to collect metrics from a [`Module`], compare pre- and post-obfuscation
/// states, and compute dominator/post-dominator pairs for a function's control flow.
///
/// # Usage
/// ```rust,ignore
/// let before = metrics::collect_metrics(&module)?;
/// obfuscator.run(&mut module);
/// let after = metrics::collect_metrics(&module)?;
/// let delta = metrics::compare(&before, &after);
/// println!("{}", serde_json::to_string_pretty(&delta).unwrap());
/// ```
use murk_core::cfg_ir::ControlFlowGraph;
use murk_core::module::{Linkage, Module};
use murk_utils::errors::MetricsError;
use petgraph::{
    algo::dominators::simple_fast,
    graph::{DiGraph, NodeIndex},
    visit::Reversed,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Represents a set of analytical metrics for evaluating module obfuscation.
///
/// Counts cover the module's symbol table and bodies; `dom_overlap` and `potency` summarise
/// control flow complexity across all defined functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Number of globals.
    pub globals: usize,
    /// Number of functions, declarations included.
    pub functions: usize,
    /// Number of functions with a body.
    pub definitions: usize,
    /// Number of basic blocks across all definitions.
    pub blocks: usize,
    /// Number of non-terminator instructions across all definitions.
    pub instructions: usize,
    /// Number of CFG edges across all definitions.
    pub edges: usize,
    /// Number of globals with private linkage.
    pub private_globals: usize,
    /// Number of globals already processed by an obfuscation pass.
    pub obfuscated_globals: usize,
    /// Fraction of blocks whose immediate dominator is also their immediate post-dominator.
    pub dom_overlap: f64,
    /// Composite potency score (heuristic based on blocks, edges, and overlap).
    pub potency: f64,
}

/// Difference between two [`Metrics`] snapshots (`after - before`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsDelta {
    pub globals: i64,
    pub functions: i64,
    pub blocks: i64,
    pub instructions: i64,
    pub edges: i64,
    pub obfuscated_globals: i64,
    pub potency: f64,
}

impl MetricsDelta {
    /// Whether the two snapshots differ in any counted dimension.
    pub fn is_zero(&self) -> bool {
        self.globals == 0
            && self.functions == 0
            && self.blocks == 0
            && self.instructions == 0
            && self.edges == 0
            && self.obfuscated_globals == 0
    }
}

/// Collects metrics from a module.
///
/// Counts symbols, blocks, instructions and edges, then computes dominator overlap over the
/// defined functions and a potency score from the totals.
///
/// # Arguments
/// * `module` - The module to measure.
///
/// # Returns
/// A `Metrics` struct, or `MetricsError::EmptyModule` if the module has no symbols at all.
pub fn collect_metrics(module: &Module) -> Result<Metrics, MetricsError> {
    if module.globals.is_empty() && module.functions.is_empty() {
        return Err(MetricsError::EmptyModule);
    }

    let mut blocks = 0;
    let mut edges = 0;
    let mut instructions = 0;
    let mut definitions = 0;
    let mut common = 0;
    let mut dominated = 0;

    for func in module.functions.iter().filter(|f| !f.is_declaration()) {
        definitions += 1;
        let graph = ControlFlowGraph::build(func);
        blocks += graph.cfg.node_count();
        edges += graph.cfg.edge_count();
        instructions += func.instruction_count();

        let (doms, post_doms) = dominator_pairs(&graph);
        common += shared_count(&doms, &post_doms);
        dominated += doms.len();
    }

    let overlap = if dominated == 0 {
        0.0
    } else {
        common as f64 / dominated as f64
    };

    let metrics = Metrics {
        globals: module.globals.len(),
        functions: module.functions.len(),
        definitions,
        blocks,
        instructions,
        edges,
        private_globals: module
            .globals
            .iter()
            .filter(|g| g.linkage == Linkage::Private)
            .count(),
        obfuscated_globals: module.globals.iter().filter(|g| g.is_obfuscated()).count(),
        dom_overlap: overlap,
        potency: score(overlap, blocks, edges),
    };
    tracing::debug!(
        "metrics for {}: {} blocks, {} edges, potency {:.2}",
        module.name,
        metrics.blocks,
        metrics.edges,
        metrics.potency
    );
    Ok(metrics)
}

type DominatorMap = HashMap<NodeIndex, NodeIndex>;

/// Computes immediate dominator and post-dominator maps for one function.
///
/// Every block without successors is wired to a virtual exit node so that post-dominators are
/// defined for functions with several returns. The virtual exit itself never appears in either
/// map's keys.
///
/// # Returns
/// A tuple of (dominators, post-dominators), mapping node indices of `graph.cfg` to their
/// immediate dominator/post-dominator.
fn dominator_pairs(graph: &ControlFlowGraph) -> (DominatorMap, DominatorMap) {
    let Some(entry) = graph.entry else {
        return (HashMap::new(), HashMap::new());
    };

    let mut g: DiGraph<(), ()> = graph.cfg.map(|_, _| (), |_, _| ());
    let exit = g.add_node(());
    let sinks: Vec<NodeIndex> = graph
        .cfg
        .node_indices()
        .filter(|&n| graph.cfg.neighbors(n).next().is_none())
        .collect();
    for n in sinks {
        g.add_edge(n, exit, ());
    }

    let doms = simple_fast(&g, entry);
    let mut dom_map = HashMap::new();
    for n in graph.cfg.node_indices() {
        if let Some(idom) = doms.immediate_dominator(n) {
            dom_map.insert(n, idom);
        }
    }

    let post = simple_fast(Reversed(&g), exit);
    let mut pdom_map = HashMap::new();
    for n in graph.cfg.node_indices() {
        if let Some(ipdom) = post.immediate_dominator(n) {
            if ipdom != exit {
                pdom_map.insert(n, ipdom);
            }
        }
    }

    (dom_map, pdom_map)
}

/// Number of nodes whose immediate dominator equals their immediate post-dominator.
fn shared_count(doms: &DominatorMap, pdoms: &DominatorMap) -> usize {
    doms.iter()
        .filter(|(n, d)| pdoms.get(*n) == Some(*d))
        .count()
}

/// Computes a composite potency score.
///
/// Emphasizes control flow complexity (blocks, edges) while penalizing high overlap, which
/// indicates simpler, more linear control flow.
fn score(overlap: f64, nodes: usize, edges: usize) -> f64 {
    5.0 * (nodes.max(1) as f64).log2() + edges as f64 + 30.0 * (1.0 - overlap)
}

/// Compares two sets of metrics.
///
/// # Returns
/// The per-field difference `after - before`.
pub fn compare(before: &Metrics, after: &Metrics) -> MetricsDelta {
    let diff = |a: usize, b: usize| a as i64 - b as i64;
    MetricsDelta {
        globals: diff(after.globals, before.globals),
        functions: diff(after.functions, before.functions),
        blocks: diff(after.blocks, before.blocks),
        instructions: diff(after.instructions, before.instructions),
        edges: diff(after.edges, before.edges),
        obfuscated_globals: diff(after.obfuscated_globals, before.obfuscated_globals),
        potency: after.potency - before.potency,
    }
}
