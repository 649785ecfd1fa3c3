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
use crate::expression::predicate::datum_fields;
use crate::vega::transform::formula::FormulaTransformSpec;
use crate::vega::transform::TransformSpec;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use vlfusion_common::error::Result;

/// Adds a field computed from an expression
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormulaNode {
    pub expr: String,
    pub as_: String,
}

impl FormulaNode {
    pub fn new<S: Into<String>, T: Into<String>>(expr: S, as_: T) -> Self {
        Self {
            expr: expr.into(),
            as_: as_.into(),
        }
    }
}

impl DataflowNode for FormulaNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn dependent_fields(&self) -> HashSet<String> {
        datum_fields(&self.expr)
    }

    fn produced_fields(&self) -> HashSet<String> {
        HashSet::from([self.as_.clone()])
    }

    fn hash(&self) -> Result<String> {
        Ok(format!("Formula {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        Ok(vec![TransformSpec::Formula(FormulaTransformSpec::new(
            self.expr.clone(),
            self.as_.clone(),
        ))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
