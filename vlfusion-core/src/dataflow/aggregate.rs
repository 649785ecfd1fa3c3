/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::content_hash;
use crate::dataflow::node::DataflowNode;
use crate::spec::field_def::AggregateOp;
use crate::spec::transform::AggregatedFieldDef;
use crate::vega::transform::aggregate::AggregateTransformSpec;
use crate::vega::transform::TransformSpec;
use crate::vega::values::Field;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use vlfusion_common::error::Result;
use vlfusion_common::escape::replace_path_in_field;

/// Groups rows and computes one output row per group
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateNode {
    pub groupby: Vec<String>,
    pub measures: Vec<AggregatedFieldDef>,
}

impl AggregateNode {
    pub fn new(groupby: Vec<String>, measures: Vec<AggregatedFieldDef>) -> Self {
        // Measures with the same output name are computed once
        let mut unique: Vec<AggregatedFieldDef> = Vec::new();
        for measure in measures {
            if !unique.iter().any(|m| m.as_ == measure.as_) {
                unique.push(measure);
            }
        }
        Self {
            groupby,
            measures: unique,
        }
    }
}

/// Parallel `fields`, `ops` and `as` arrays of a renderer aggregate
pub(crate) fn measure_arrays(
    measures: &[AggregatedFieldDef],
) -> Result<(Vec<Option<Field>>, Vec<AggregateOp>, Vec<Option<String>>)> {
    let mut fields = Vec::with_capacity(measures.len());
    let mut ops = Vec::with_capacity(measures.len());
    let mut as_ = Vec::with_capacity(measures.len());
    for measure in measures {
        fields.push(match &measure.field {
            Some(field) if field != "*" => Some(Field::String(replace_path_in_field(field)?)),
            _ => None,
        });
        ops.push(measure.op);
        as_.push(Some(measure.as_.clone()));
    }
    Ok((fields, ops, as_))
}

impl DataflowNode for AggregateNode {
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
        Ok(format!("Aggregate {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        let (fields, ops, as_) = measure_arrays(&self.measures)?;
        let groupby = self
            .groupby
            .iter()
            .map(|field| Ok(Field::String(replace_path_in_field(field)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(vec![TransformSpec::Aggregate(AggregateTransformSpec {
            groupby,
            fields: Some(fields),
            ops: Some(ops),
            as_: Some(as_),
            cross: None,
            drop: None,
            key: None,
            extra: Default::default(),
        })])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
