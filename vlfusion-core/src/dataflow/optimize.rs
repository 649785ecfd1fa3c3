/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::graph::DataflowGraph;
use indexmap::IndexMap;
use petgraph::stable_graph::NodeIndex;
use std::collections::{HashMap, VecDeque};
use vlfusion_common::error::Result;

/// Map from removed nodes to the node that replaced them
pub type Replacements = HashMap<NodeIndex, NodeIndex>;

/// Merge sibling nodes that compute the same data, i.e. have equal hashes.
/// The first sibling is kept and adopts the children of the others, which may
/// in turn be merged.
pub fn merge_identical_siblings(graph: &mut DataflowGraph) -> Result<Replacements> {
    let mut replaced = Replacements::new();
    let mut queue = VecDeque::from([graph.roots()]);

    while let Some(siblings) = queue.pop_front() {
        let mut kept: IndexMap<String, NodeIndex> = IndexMap::new();
        for sibling in siblings {
            let hash = graph.node(sibling)?.hash()?;
            if let Some(&keeper) = kept.get(&hash) {
                for child in graph.children(sibling) {
                    graph.set_parent(child, Some(keeper));
                }
                graph.remove_node(sibling);
                log::debug!("Merged duplicate dataflow node {hash}");
                replaced.insert(sibling, keeper);
            } else {
                kept.insert(hash, sibling);
            }
        }
        for keeper in kept.values() {
            queue.push_back(graph.children(*keeper));
        }
    }
    Ok(replaced)
}

/// Node that now holds the data of `index`
pub fn resolve(replaced: &Replacements, index: NodeIndex) -> NodeIndex {
    let mut current = index;
    while let Some(next) = replaced.get(&current) {
        current = *next;
    }
    current
}

#[cfg(test)]
mod tests {
    use crate::dataflow::filter::FilterNode;
    use crate::dataflow::formula::FormulaNode;
    use crate::dataflow::graph::DataflowGraph;
    use crate::dataflow::optimize::{merge_identical_siblings, resolve};
    use crate::dataflow::source::SourceNode;

    #[test]
    fn test_merge_identical_branches() {
        let mut graph = DataflowGraph::new();
        let root = graph.add(SourceNode::named("source_0"), None);
        let a1 = graph.add(FilterNode::new("datum.a > 0"), Some(root));
        let b1 = graph.add(FormulaNode::new("datum.a * 2", "b"), Some(a1));
        let a2 = graph.add(FilterNode::new("datum.a > 0"), Some(root));
        let b2 = graph.add(FormulaNode::new("datum.a * 2", "b"), Some(a2));
        let c2 = graph.add(FormulaNode::new("datum.a * 3", "c"), Some(a2));

        let replaced = merge_identical_siblings(&mut graph).unwrap();
        assert_eq!(graph.len(), 4);
        assert_eq!(resolve(&replaced, a2), a1);
        assert_eq!(resolve(&replaced, b2), b1);
        assert_eq!(resolve(&replaced, c2), c2);
        assert_eq!(graph.children(root), vec![a1]);
        assert_eq!(graph.children(a1), vec![b1, c2]);
    }
}
