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
use crate::spec::field_def::{Bin, DEFAULT_MAXBINS};
use crate::vega::transform::bin::{BinExtent, BinTransformSpec};
use crate::vega::transform::extent::ExtentTransformSpec;
use crate::vega::transform::TransformSpec;
use crate::vega::values::{Field, SignalExpressionSpec};
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use vlfusion_common::error::Result;
use vlfusion_common::escape::replace_path_in_field;

/// Bins a field into `[start, end)` intervals. Without an explicit extent
/// the data extent is computed first and published as a signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinNode {
    pub field: String,
    pub bin: Bin,
    pub as_start: String,
    pub as_end: String,
}

impl BinNode {
    pub fn new<S: Into<String>>(field: S, bin: Bin, as_start: String, as_end: String) -> Self {
        Self {
            field: field.into(),
            bin,
            as_start,
            as_end,
        }
    }

    /// Prefix of the signals published by this node, e.g. `bin_maxbins_10_a`
    pub fn signal_key(&self) -> String {
        let field: String = self
            .field
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        format!("{}_{field}", self.bin.to_field_prefix())
    }

    pub fn bins_signal(&self) -> String {
        format!("{}_bins", self.signal_key())
    }

    pub fn extent_signal(&self) -> String {
        format!("{}_extent", self.signal_key())
    }
}

impl DataflowNode for BinNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn dependent_fields(&self) -> HashSet<String> {
        HashSet::from([self.field.clone()])
    }

    fn produced_fields(&self) -> HashSet<String> {
        HashSet::from([self.as_start.clone(), self.as_end.clone()])
    }

    fn hash(&self) -> Result<String> {
        Ok(format!("Bin {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        let params = self.bin.params();
        let field = replace_path_in_field(&self.field)?;
        let mut transforms = Vec::new();

        let extent = match params.extent {
            Some(extent) => BinExtent::Value(extent),
            None => {
                let signal = self.extent_signal();
                transforms.push(TransformSpec::Extent(ExtentTransformSpec {
                    field: field.clone(),
                    signal: Some(signal.clone()),
                    extra: Default::default(),
                }));
                BinExtent::Signal(SignalExpressionSpec { signal })
            }
        };

        let maxbins = match (params.maxbins, params.step) {
            (Some(maxbins), _) => Some(maxbins),
            (None, None) => Some(DEFAULT_MAXBINS),
            (None, Some(_)) => None,
        };
        transforms.push(TransformSpec::Bin(Box::new(BinTransformSpec {
            field: Field::String(field),
            extent,
            signal: Some(self.bins_signal()),
            as_: Some(vec![self.as_start.clone(), self.as_end.clone()]),
            anchor: params.anchor,
            maxbins,
            base: params.base,
            step: params.step,
            steps: None,
            minstep: params.minstep,
            divide: None,
            nice: params.nice,
            extra: params.extra,
        })));
        Ok(transforms)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
