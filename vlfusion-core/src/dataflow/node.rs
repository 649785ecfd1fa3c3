/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::vega::transform::TransformSpec;
use std::any::Any;
use std::collections::HashSet;
use std::fmt::Debug;
use vlfusion_common::error::Result;

/// A node of the dataflow graph. Each node is one stage of data
/// transformation and assembles into zero or more renderer transforms.
///
/// Parent links are owned by [`DataflowGraph`](crate::dataflow::graph::DataflowGraph),
/// so a node on its own is always detached.
pub trait DataflowNode: Debug {
    /// Detached copy of this node with no parent
    fn clone_node(&self) -> Box<dyn DataflowNode>;

    /// Fields read by this node
    fn dependent_fields(&self) -> HashSet<String> {
        Default::default()
    }

    /// Fields added by this node
    fn produced_fields(&self) -> HashSet<String> {
        Default::default()
    }

    /// Stable hash of the semantic content of the node. Two nodes with the
    /// same hash and the same parent compute the same data.
    fn hash(&self) -> Result<String>;

    fn assemble(&self) -> Result<Vec<TransformSpec>>;

    fn as_any(&self) -> &dyn Any;
}

impl Clone for Box<dyn DataflowNode> {
    fn clone(&self) -> Self {
        self.clone_node()
    }
}
