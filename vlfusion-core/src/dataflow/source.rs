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
use crate::vega::data::DataSpec;
use crate::vega::transform::TransformSpec;
use serde::Serialize;
use serde_json::Value;
use std::any::Any;
use vlfusion_common::error::Result;

/// Root of a dataflow branch: the named input dataset and, when the view
/// declares one, its inline data definition (url, values, format)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceNode {
    pub name: String,
    pub data: Option<Value>,
}

impl SourceNode {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            data: None,
        }
    }

    pub fn with_data<S: Into<String>>(name: S, data: Value) -> Self {
        Self {
            name: name.into(),
            data: Some(data),
        }
    }

    /// Root dataset of the branch
    pub fn to_data_spec(&self) -> Result<DataSpec> {
        let mut spec = DataSpec {
            name: self.name.clone(),
            source: None,
            url: None,
            format: None,
            values: None,
            transform: Vec::new(),
            extra: Default::default(),
        };
        if let Some(Value::Object(data)) = &self.data {
            if let Some(url) = data.get("url") {
                spec.url = Some(serde_json::from_value(url.clone())?);
            }
            spec.values = data.get("values").cloned();
            spec.format = data.get("format").cloned();
        }
        Ok(spec)
    }
}

impl DataflowNode for SourceNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn hash(&self) -> Result<String> {
        Ok(format!("Source {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        Ok(Vec::new())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
