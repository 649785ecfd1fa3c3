/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::encoding::Encoding;
use crate::spec::mark::AnyMark;
use crate::spec::transform::Transform;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Single view: one mark with its encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitSpec {
    pub mark: AnyMark,

    #[serde(default, skip_serializing_if = "Encoding::is_empty")]
    pub encoding: Encoding,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<Transform>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UnitSpec {
    pub fn new<M: Into<AnyMark>>(mark: M, encoding: Encoding) -> Self {
        Self {
            mark: mark.into(),
            encoding,
            transform: Vec::new(),
            params: None,
            projection: None,
            name: None,
            data: None,
            extra: Default::default(),
        }
    }
}

/// Views drawn on top of each other, sharing the layer's transforms and encoding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub layer: Vec<Spec>,

    #[serde(default, skip_serializing_if = "Encoding::is_empty")]
    pub encoding: Encoding,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<Transform>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LayerSpec {
    pub fn new(layer: Vec<Spec>) -> Self {
        Self {
            layer,
            encoding: Default::default(),
            transform: Vec::new(),
            name: None,
            data: None,
            extra: Default::default(),
        }
    }

    pub fn with_transform(mut self, transform: Vec<Transform>) -> Self {
        self.transform = transform;
        self
    }
}

/// A view specification. After normalization every unit holds a primitive mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Spec {
    Layer(LayerSpec),
    Unit(Box<UnitSpec>),
}

/// Spec whose composite marks have been expanded into layers of primitive marks
pub type NormalizedSpec = Spec;

impl Spec {
    pub fn transform(&self) -> &[Transform] {
        match self {
            Spec::Layer(layer) => &layer.transform,
            Spec::Unit(unit) => &unit.transform,
        }
    }

    pub fn as_layer(&self) -> Option<&LayerSpec> {
        match self {
            Spec::Layer(layer) => Some(layer),
            Spec::Unit(_) => None,
        }
    }

    pub fn as_unit(&self) -> Option<&UnitSpec> {
        match self {
            Spec::Unit(unit) => Some(unit),
            Spec::Layer(_) => None,
        }
    }
}

impl From<UnitSpec> for Spec {
    fn from(unit: UnitSpec) -> Self {
        Spec::Unit(Box::new(unit))
    }
}

impl From<LayerSpec> for Spec {
    fn from(layer: LayerSpec) -> Self {
        Spec::Layer(layer)
    }
}
