/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::graph::DataflowGraph;
use crate::dataflow::source::SourceNode;
use crate::vega::data::DataSpec;
use petgraph::stable_graph::NodeIndex;
use std::collections::{HashMap, HashSet};
use vlfusion_common::error::{Result, ResultWithContext};

#[derive(Debug, Clone, Default)]
pub struct AssembledData {
    pub data: Vec<DataSpec>,
    /// Dataset holding the output of each requested node
    pub datasets: HashMap<NodeIndex, String>,
}

/// Assemble the graph into datasets. Transforms of a chain of single-child
/// nodes accumulate in one dataset. A new dataset deriving from the current
/// one starts at every branch and after every node in `outputs`, so that
/// the output of those nodes stays addressable by name.
pub fn assemble_data(graph: &DataflowGraph, outputs: &HashSet<NodeIndex>) -> Result<AssembledData> {
    let mut assembler = Assembler {
        graph,
        outputs,
        assembled: Default::default(),
        next_id: 0,
    };
    for root in graph.roots() {
        let source = graph
            .node_as::<SourceNode>(root)
            .with_context(|| format!("Dataflow root {} is not a source", root.index()))?;
        assembler.assembled.data.push(source.to_data_spec()?);
        let dataset = assembler.assembled.data.len() - 1;
        assembler.walk(root, dataset)?;
    }
    Ok(assembler.assembled)
}

struct Assembler<'a> {
    graph: &'a DataflowGraph,
    outputs: &'a HashSet<NodeIndex>,
    assembled: AssembledData,
    next_id: usize,
}

impl Assembler<'_> {
    fn walk(&mut self, index: NodeIndex, dataset: usize) -> Result<()> {
        let transforms = self.graph.node(index)?.assemble()?;
        self.assembled.data[dataset].transform.extend(transforms);

        let is_output = self.outputs.contains(&index);
        if is_output {
            let name = self.assembled.data[dataset].name.clone();
            self.assembled.datasets.insert(index, name);
        }

        let children = self.graph.children(index);
        match children.as_slice() {
            [] => {}
            [child] if !is_output => self.walk(*child, dataset)?,
            _ => {
                let source = self.assembled.data[dataset].name.clone();
                for child in children {
                    let name = format!("data_{}", self.next_id);
                    self.next_id += 1;
                    self.assembled.data.push(DataSpec::from_source(&name, &source));
                    let child_dataset = self.assembled.data.len() - 1;
                    self.walk(child, child_dataset)?;
                }
            }
        }
        Ok(())
    }
}
