/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::aggregate::AggregateNode;
use crate::dataflow::bin::BinNode;
use crate::dataflow::filter::FilterNode;
use crate::dataflow::formula::FormulaNode;
use crate::dataflow::graph::DataflowGraph;
use crate::dataflow::joinaggregate::JoinAggregateNode;
use crate::dataflow::node::DataflowNode;
use crate::dataflow::timeunit::TimeUnitNode;
use crate::spec::transform::Transform;
use petgraph::stable_graph::NodeIndex;
use serde_json::Value;
use vlfusion_common::error::{Result, VlFusionError};

/// Add a chain of nodes for a list of view transforms under `parent`.
/// Returns the last node of the chain, or `parent` for an empty list.
pub fn parse_transforms(
    graph: &mut DataflowGraph,
    parent: NodeIndex,
    transforms: &[Transform],
) -> Result<NodeIndex> {
    let mut current = parent;
    for transform in transforms {
        let node = make_transform_node(transform)?;
        log::debug!("Adding dataflow node {}", node.hash()?);
        current = graph.add_node(node, Some(current));
    }
    Ok(current)
}

pub fn make_transform_node(transform: &Transform) -> Result<Box<dyn DataflowNode>> {
    Ok(match transform {
        Transform::Filter(filter) => Box::new(FilterNode::from_predicate(&filter.filter)?),
        Transform::Calculate(calculate) => Box::new(FormulaNode::new(
            calculate.calculate.clone(),
            calculate.as_.clone(),
        )),
        Transform::Aggregate(aggregate) => Box::new(AggregateNode::new(
            aggregate.groupby.clone(),
            aggregate.aggregate.clone(),
        )),
        Transform::JoinAggregate(joinaggregate) => Box::new(JoinAggregateNode::new(
            joinaggregate.groupby.clone(),
            joinaggregate.joinaggregate.clone(),
        )),
        Transform::Bin(bin) => {
            let (start, end) = bin.as_.fields();
            Box::new(BinNode::new(bin.field.clone(), bin.bin.clone(), start, end))
        }
        Transform::TimeUnit(time_unit) => Box::new(TimeUnitNode::new(
            time_unit.field.clone(),
            time_unit.time_unit.clone(),
            time_unit.as_.clone(),
        )),
        Transform::Other(other) => {
            return Err(VlFusionError::compilation(format!(
                "Unsupported transform: {}",
                Value::Object(other.clone())
            )))
        }
    })
}
