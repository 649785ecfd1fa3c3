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

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormulaTransformSpec {
    pub expr: String,

    #[serde(rename = "as")]
    pub as_: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormulaTransformSpec {
    pub fn new<S: Into<String>, T: Into<String>>(expr: S, as_: T) -> Self {
        Self {
            expr: expr.into(),
            as_: as_.into(),
            extra: Default::default(),
        }
    }
}
