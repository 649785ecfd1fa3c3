/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::node::DataflowNode;
use petgraph::prelude::EdgeRef;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use vlfusion_common::error::{Result, ResultWithContext};

#[derive(Debug)]
struct GraphEntry {
    node: Box<dyn DataflowNode>,
    // Insertion order, used to keep children in a deterministic order
    order: usize,
}

/// Arena holding the dataflow nodes of one compile. Edges point from parent to
/// child and every node has at most one parent.
#[derive(Debug, Default)]
pub struct DataflowGraph {
    graph: StableDiGraph<GraphEntry, ()>,
    next_order: usize,
}

impl DataflowGraph {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn add_node(&mut self, node: Box<dyn DataflowNode>, parent: Option<NodeIndex>) -> NodeIndex {
        let order = self.next_order;
        self.next_order += 1;
        let index = self.graph.add_node(GraphEntry { node, order });
        if let Some(parent) = parent {
            self.graph.add_edge(parent, index, ());
        }
        index
    }

    pub fn add<N: DataflowNode + 'static>(&mut self, node: N, parent: Option<NodeIndex>) -> NodeIndex {
        self.add_node(Box::new(node), parent)
    }

    pub fn node(&self, index: NodeIndex) -> Result<&dyn DataflowNode> {
        self.graph
            .node_weight(index)
            .map(|entry| entry.node.as_ref())
            .with_context(|| format!("No dataflow node with index {}", index.index()))
    }

    /// Node downcast to its concrete type
    pub fn node_as<T: 'static>(&self, index: NodeIndex) -> Option<&T> {
        self.graph
            .node_weight(index)
            .and_then(|entry| entry.node.as_any().downcast_ref::<T>())
    }

    pub fn parent(&self, index: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| edge.source())
            .next()
    }

    /// Children in the order they were added
    pub fn children(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut children: Vec<NodeIndex> = self
            .graph
            .edges_directed(index, Direction::Outgoing)
            .map(|edge| edge.target())
            .collect();
        children.sort_by_key(|child| self.order(*child));
        children
    }

    /// Nodes without a parent, in the order they were added
    pub fn roots(&self) -> Vec<NodeIndex> {
        let mut roots: Vec<NodeIndex> = self
            .graph
            .node_indices()
            .filter(|index| self.parent(*index).is_none())
            .collect();
        roots.sort_by_key(|root| self.order(*root));
        roots
    }

    pub fn set_parent(&mut self, index: NodeIndex, parent: Option<NodeIndex>) {
        let incoming: Vec<_> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| edge.id())
            .collect();
        for edge in incoming {
            self.graph.remove_edge(edge);
        }
        if let Some(parent) = parent {
            self.graph.add_edge(parent, index, ());
        }
    }

    /// Remove a node along with its edges. Children of the node become roots.
    pub fn remove_node(&mut self, index: NodeIndex) -> Option<Box<dyn DataflowNode>> {
        self.graph.remove_node(index).map(|entry| entry.node)
    }

    /// Add a detached copy of a node to the graph
    pub fn clone_detached(&mut self, index: NodeIndex) -> Result<NodeIndex> {
        let node = self.node(index)?.clone_node();
        Ok(self.add_node(node, None))
    }

    /// Path of nodes from the root down to `index`, inclusive
    pub fn lineage(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut lineage = vec![index];
        let mut current = index;
        while let Some(parent) = self.parent(current) {
            lineage.push(parent);
            current = parent;
        }
        lineage.reverse();
        lineage
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    fn order(&self, index: NodeIndex) -> usize {
        self.graph
            .node_weight(index)
            .map(|entry| entry.order)
            .unwrap_or(usize::MAX)
    }
}
