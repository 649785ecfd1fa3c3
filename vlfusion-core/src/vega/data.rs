/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::vega::transform::TransformSpec;
use crate::vega::values::StringOrSignalSpec;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSpec {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<StringOrSignalSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub values: Option<Value>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transform: Vec<TransformSpec>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DataSpec {
    /// Dataset deriving from another named dataset
    pub fn from_source(name: &str, source: &str) -> Self {
        Self {
            name: name.to_string(),
            source: Some(source.to_string()),
            url: None,
            format: None,
            values: None,
            transform: Vec::new(),
            extra: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::vega::data::DataSpec;
    use crate::vega::transform::filter::FilterTransformSpec;
    use crate::vega::transform::TransformSpec;
    use serde_json::json;

    #[test]
    fn test_derived_dataset() {
        let mut data = DataSpec::from_source("data_1", "source_0");
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({"name": "data_1", "source": "source_0"})
        );

        data.transform
            .push(TransformSpec::Filter(FilterTransformSpec::new("datum.a > 0")));
        assert_eq!(
            serde_json::to_value(&data).unwrap()["transform"],
            json!([{"type": "filter", "expr": "datum.a > 0"}])
        );
    }
}
