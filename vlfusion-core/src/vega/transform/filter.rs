/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Struct that serializes to Vega spec for the filter transform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterTransformSpec {
    pub expr: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FilterTransformSpec {
    pub fn new<S: Into<String>>(expr: S) -> Self {
        Self {
            expr: expr.into(),
            extra: Default::default(),
        }
    }
}
