/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkSpec {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<MarkFromSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encode: Option<MarkEncodeSpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkSpec {
    pub fn update_channels(&self) -> Option<&IndexMap<String, MarkEncodingOrList>> {
        self.encode
            .as_ref()
            .and_then(|encode| encode.encodings.get("update"))
            .map(|update| &update.channels)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkEncodeSpec {
    // e.g. enter, update, hover, etc.
    #[serde(flatten)]
    pub encodings: IndexMap<String, MarkEncodingsSpec>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkEncodingsSpec {
    // e.g. x, fill, width, etc.
    #[serde(flatten)]
    pub channels: IndexMap<String, MarkEncodingOrList>,
}

impl MarkEncodingsSpec {
    pub fn extend(&mut self, other: MarkEncodingsSpec) {
        self.channels.extend(other.channels)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkEncodingOrList {
    List(Vec<MarkEncodingSpec>),
    Scalar(Box<MarkEncodingSpec>),
}

/// A Vega value reference, optionally guarded by a `test` expression
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkEncodingSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<MarkEncodingField>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mult: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkEncodingSpec {
    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }

    pub fn signal(signal: &str) -> Self {
        Self {
            signal: Some(signal.to_string()),
            ..Default::default()
        }
    }

    pub fn field(field: &str) -> Self {
        Self {
            field: Some(MarkEncodingField::Field(field.to_string())),
            ..Default::default()
        }
    }

    pub fn with_scale(mut self, scale: Option<&str>) -> Self {
        self.scale = scale.map(String::from);
        self
    }

    pub fn with_test(mut self, test: &str) -> Self {
        self.test = Some(test.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkFromSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkEncodingField {
    Field(String),
    Object(MarkEncodingFieldObject),
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkEncodingFieldObject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datum: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MarkEncodingField {
    pub fn group(name: &str) -> Self {
        MarkEncodingField::Object(MarkEncodingFieldObject {
            group: Some(name.to_string()),
            ..Default::default()
        })
    }
}
