/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::field_def::{AggregateOp, Bin, TimeUnit};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Vega-Lite view-level transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Transform {
    Filter(FilterTransform),
    Calculate(CalculateTransform),
    Aggregate(AggregateTransform),
    JoinAggregate(JoinAggregateTransform),
    Bin(BinTransform),
    TimeUnit(TimeUnitTransform),
    Other(Map<String, Value>),
}

impl Transform {
    pub fn filter<S: Into<String>>(expr: S) -> Self {
        Transform::Filter(FilterTransform {
            filter: Predicate::Expr(expr.into()),
        })
    }

    pub fn calculate<S: Into<String>, T: Into<String>>(expr: S, as_: T) -> Self {
        Transform::Calculate(CalculateTransform {
            calculate: expr.into(),
            as_: as_.into(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTransform {
    pub filter: Predicate,
}

/// Filter predicate: an expression string or a field predicate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Predicate {
    Expr(String),
    Field(FieldPredicate),
    Other(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldPredicate {
    pub field: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub equal: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lt: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub lte: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gt: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub gte: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<[f64; 2]>,

    #[serde(rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub valid: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculateTransform {
    pub calculate: String,

    #[serde(rename = "as")]
    pub as_: String,
}

/// One output field of an aggregate or joinaggregate transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedFieldDef {
    pub op: AggregateOp,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(rename = "as")]
    pub as_: String,
}

impl AggregatedFieldDef {
    pub fn new<S: Into<String>, T: Into<String>>(op: AggregateOp, field: S, as_: T) -> Self {
        Self {
            op,
            field: Some(field.into()),
            as_: as_.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateTransform {
    pub aggregate: Vec<AggregatedFieldDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groupby: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinAggregateTransform {
    pub joinaggregate: Vec<AggregatedFieldDef>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groupby: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BinAs {
    Single(String),
    Pair([String; 2]),
}

impl BinAs {
    /// Start and end field names of the bin
    pub fn fields(&self) -> (String, String) {
        match self {
            BinAs::Single(start) => (start.clone(), format!("{start}_end")),
            BinAs::Pair([start, end]) => (start.clone(), end.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinTransform {
    pub bin: Bin,
    pub field: String,

    #[serde(rename = "as")]
    pub as_: BinAs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeUnitTransform {
    #[serde(rename = "timeUnit")]
    pub time_unit: TimeUnit,
    pub field: String,

    #[serde(rename = "as")]
    pub as_: String,
}
