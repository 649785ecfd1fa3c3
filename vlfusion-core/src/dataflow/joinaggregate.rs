/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::aggregate::measure_arrays;
use crate::dataflow::content_hash;
use crate::dataflow::node::DataflowNode;
use crate::spec::transform::AggregatedFieldDef;
use crate::vega::transform::joinaggregate::JoinAggregateTransformSpec;
use crate::vega::transform::TransformSpec;
use crate::vega::values::Field;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use vlfusion_common::error::Result;
use vlfusion_common::escape::replace_path_in_field;

/// Computes aggregates per group and joins them back onto every row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinAggregateNode {
    pub groupby: Vec<String>,
    pub measures: Vec<AggregatedFieldDef>,
}

impl JoinAggregateNode {
    pub fn new(groupby: Vec<String>, measures: Vec<AggregatedFieldDef>) -> Self {
        Self { groupby, measures }
    }
}

impl DataflowNode for JoinAggregateNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn dependent_fields(&self) -> HashSet<String> {
        self.groupby
            .iter()
            .cloned()
            .chain(self.measures.iter().filter_map(|m| m.field.clone()))
            .collect()
    }

    fn produced_fields(&self) -> HashSet<String> {
        self.measures.iter().map(|m| m.as_.clone()).collect()
    }

    fn hash(&self) -> Result<String> {
        Ok(format!("JoinAggregate {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        let (fields, ops, as_) = measure_arrays(&self.measures)?;
        let groupby = if self.groupby.is_empty() {
            None
        } else {
            Some(
                self.groupby
                    .iter()
                    .map(|field| Ok(Field::String(replace_path_in_field(field)?)))
                    .collect::<Result<Vec<_>>>()?,
            )
        };
        Ok(vec![TransformSpec::JoinAggregate(JoinAggregateTransformSpec {
            groupby,
            fields,
            ops,
            as_: Some(as_),
            extra: Default::default(),
        })])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
