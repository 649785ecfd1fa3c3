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
use crate::expression::predicate::{datum_fields, field_predicate_expr, predicate_expr};
use crate::spec::transform::Predicate;
use crate::vega::transform::filter::FilterTransformSpec;
use crate::vega::transform::TransformSpec;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use vlfusion_common::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterNode {
    pub expr: String,
}

impl FilterNode {
    pub fn new<S: Into<String>>(expr: S) -> Self {
        Self { expr: expr.into() }
    }

    pub fn from_predicate(predicate: &Predicate) -> Result<Self> {
        match predicate {
            Predicate::Expr(expr) => Ok(Self::new(expr.clone())),
            Predicate::Field(field_predicate) => {
                let expr = field_predicate_expr(field_predicate)?.unwrap_or_else(|| "true".to_string());
                Ok(Self::new(expr))
            }
            Predicate::Other(other) => Ok(Self::new(predicate_expr(other)?)),
        }
    }
}

impl DataflowNode for FilterNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn dependent_fields(&self) -> HashSet<String> {
        datum_fields(&self.expr)
    }

    fn hash(&self) -> Result<String> {
        Ok(format!("Filter {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        Ok(vec![TransformSpec::Filter(FilterTransformSpec::new(
            self.expr.clone(),
        ))])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
