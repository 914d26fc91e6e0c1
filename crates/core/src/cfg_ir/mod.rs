/// Control flow graph view over a function body.
///
/// The function's blocks are the source of truth; [`ControlFlowGraph`] is a read-only
/// `petgraph` projection rebuilt on demand for analyses that need graph algorithms
/// (reachability, dominators, DOT rendering). Structural edits that keep the body consistent
/// live in [`updates`] as methods on [`Function`].
use crate::ir::BlockId;
use crate::module::Function;
use petgraph::algo::dominators::{simple_fast, Dominators};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

mod updates;

/// Represents the type of edge connecting blocks in the CFG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeType {
    /// Unconditional branch.
    Jump,
    /// Conditional branch taken when the condition is true.
    BranchTrue,
    /// Conditional branch taken when the condition is false.
    BranchFalse,
}

/// Graph of a function's blocks with edges implied by terminators.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    /// Graph with block ids as nodes and control transfers as edges.
    pub cfg: DiGraph<BlockId, EdgeType>,
    /// Mapping of block ids to node indices.
    pub block_to_node: HashMap<BlockId, NodeIndex>,
    /// Node of the entry block, if the function has a body.
    pub entry: Option<NodeIndex>,
}

impl ControlFlowGraph {
    /// Builds the graph for `func`. Edges to blocks that do not exist are skipped.
    pub fn build(func: &Function) -> Self {
        let mut cfg = DiGraph::new();
        let mut block_to_node = HashMap::new();

        for block in &func.blocks {
            let node = cfg.add_node(block.id);
            block_to_node.insert(block.id, node);
        }

        for block in &func.blocks {
            let src = block_to_node[&block.id];
            let edges: Vec<(BlockId, EdgeType)> = match &block.terminator {
                crate::ir::Terminator::Br { target } => vec![(*target, EdgeType::Jump)],
                crate::ir::Terminator::CondBr {
                    then_dest,
                    else_dest,
                    ..
                } => vec![
                    (*then_dest, EdgeType::BranchTrue),
                    (*else_dest, EdgeType::BranchFalse),
                ],
                _ => Vec::new(),
            };
            for (target, kind) in edges {
                match block_to_node.get(&target) {
                    Some(&dst) => {
                        cfg.add_edge(src, dst, kind);
                    }
                    None => tracing::warn!(
                        "{}: bb{} branches to missing bb{}",
                        func.name,
                        block.id.0,
                        target.0
                    ),
                }
            }
        }

        let entry = func.entry_id().and_then(|id| block_to_node.get(&id).copied());
        tracing::debug!(
            "Built CFG for {} with {} nodes and {} edges",
            func.name,
            cfg.node_count(),
            cfg.edge_count()
        );

        Self {
            cfg,
            block_to_node,
            entry,
        }
    }

    pub fn node(&self, id: BlockId) -> Option<NodeIndex> {
        self.block_to_node.get(&id).copied()
    }

    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        self.node(id)
            .map(|n| {
                self.cfg
                    .edges_directed(n, petgraph::Outgoing)
                    .map(|e| self.cfg[e.target()])
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn predecessors(&self, id: BlockId) -> Vec<BlockId> {
        self.node(id)
            .map(|n| {
                self.cfg
                    .edges_directed(n, petgraph::Incoming)
                    .map(|e| self.cfg[e.source()])
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Blocks reachable from the entry along any edge.
    pub fn reachable(&self) -> HashSet<BlockId> {
        let mut seen = HashSet::new();
        if let Some(entry) = self.entry {
            let mut dfs = Dfs::new(&self.cfg, entry);
            while let Some(node) = dfs.next(&self.cfg) {
                seen.insert(self.cfg[node]);
            }
        }
        seen
    }

    /// Dominator tree rooted at the entry block.
    pub fn dominators(&self) -> Option<Dominators<NodeIndex>> {
        self.entry.map(|entry| simple_fast(&self.cfg, entry))
    }

    /// Whether block `a` dominates block `b`. Unreachable blocks are dominated by nothing.
    pub fn dominates(&self, doms: &Dominators<NodeIndex>, a: BlockId, b: BlockId) -> bool {
        let (Some(a), Some(b)) = (self.node(a), self.node(b)) else {
            return false;
        };
        doms.dominators(b)
            .is_some_and(|mut chain| chain.any(|n| n == a))
    }

    /// Graphviz rendering with one node per block, labelled with the block label.
    pub fn to_dot(&self, func: &Function) -> String {
        let mut dot = format!("digraph \"{}\" {{\n", func.name);
        for node in self.cfg.node_indices() {
            let id = self.cfg[node];
            let label = func
                .block(id)
                .map(|b| format!("bb{}: {}\\n{} instrs", id.0, b.label, b.instructions.len()))
                .unwrap_or_else(|| format!("bb{}", id.0));
            dot.push_str(&format!("    {} [label=\"{}\"];\n", node.index(), label));
        }
        for edge in self.cfg.edge_references() {
            let label = match edge.weight() {
                EdgeType::Jump => "Jump",
                EdgeType::BranchTrue => "BranchTrue",
                EdgeType::BranchFalse => "BranchFalse",
            };
            dot.push_str(&format!(
                "    {} -> {} [label=\"{}\"];\n",
                edge.source().index(),
                edge.target().index(),
                label
            ));
        }
        dot.push_str("}\n");
        dot
    }
}
