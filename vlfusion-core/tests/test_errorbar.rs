#[macro_use]
extern crate lazy_static;

mod utils;
use rstest::rstest;
use serde_json::{json, Value};
use utils::{init_logging, normalize_spec, parse_spec, to_json, units, DEFAULT_CONFIG};
use vlfusion_common::error::VlFusionError;
use vlfusion_core::compositemark::{normalize, NormalizeWarning};
use vlfusion_core::spec::unit::Spec;

fn raw_spec(mark: Value) -> Value {
    json!({
        "mark": mark,
        "encoding": {
            "x": {"field": "variety", "type": "nominal"},
            "y": {"field": "yield", "type": "quantitative"}
        }
    })
}

#[cfg(test)]
mod test_raw_extents {
    use crate::*;

    #[rstest(
        extent,
        aggregate,
        case(
            "stderr",
            json!([
                {"op": "stderr", "field": "yield", "as": "extent_yield"},
                {"op": "mean", "field": "yield", "as": "center_yield"}
            ])
        ),
        case(
            "stdev",
            json!([
                {"op": "stdev", "field": "yield", "as": "extent_yield"},
                {"op": "mean", "field": "yield", "as": "center_yield"}
            ])
        ),
        case(
            "ci",
            json!([
                {"op": "ci0", "field": "yield", "as": "lower_yield"},
                {"op": "ci1", "field": "yield", "as": "upper_yield"},
                {"op": "mean", "field": "yield", "as": "center_yield"}
            ])
        ),
        case(
            "iqr",
            json!([
                {"op": "q1", "field": "yield", "as": "lower_yield"},
                {"op": "q3", "field": "yield", "as": "upper_yield"},
                {"op": "median", "field": "yield", "as": "center_yield"}
            ])
        )
    )]
    fn test(extent: &str, aggregate: Value) {
        let normalized = normalize_spec(raw_spec(json!({"type": "errorbar", "extent": extent})));
        assert!(normalized.warnings.is_empty());

        // Only the rule is enabled by default, so the error bar collapses to one unit
        let Spec::Unit(rule) = &normalized.spec else {
            panic!("Expected a unit")
        };
        let transform = to_json(&rule.transform);
        assert_eq!(
            transform[0],
            json!({"aggregate": aggregate, "groupby": ["variety"]})
        );
        let mark = to_json(&rule.mark);
        assert_eq!(mark["type"], json!("rule"));
        assert_eq!(mark["style"], json!("errorbar-rule"));
        let encoding = to_json(&rule.encoding);
        assert_eq!(encoding["y"]["field"], json!("lower_yield"));
        assert_eq!(encoding["y2"]["field"], json!("upper_yield"));
        assert_eq!(encoding["x"]["field"], json!("variety"));
    }
}

#[cfg(test)]
mod test_default_extent {
    use crate::*;

    #[test]
    fn test() {
        let normalized = normalize_spec(raw_spec(json!("errorbar")));
        let unit = normalized.spec.as_unit().unwrap();
        assert_eq!(
            to_json(&unit.transform),
            json!([
                {
                    "aggregate": [
                        {"op": "stderr", "field": "yield", "as": "extent_yield"},
                        {"op": "mean", "field": "yield", "as": "center_yield"}
                    ],
                    "groupby": ["variety"]
                },
                {"calculate": "datum['center_yield'] + datum['extent_yield']", "as": "upper_yield"},
                {"calculate": "datum['center_yield'] - datum['extent_yield']", "as": "lower_yield"}
            ])
        );
    }
}

#[cfg(test)]
mod test_ticks {
    use crate::*;

    #[test]
    fn test() {
        let normalized = normalize_spec(raw_spec(json!({
            "type": "errorbar",
            "ticks": true,
            "thickness": 3
        })));
        let Spec::Layer(layer) = &normalized.spec else {
            panic!("Expected a layer")
        };
        assert_eq!(layer.layer.len(), 3);
        let parts = units(&normalized.spec);
        let marks: Vec<_> = parts.iter().map(|unit| to_json(&unit.mark)).collect();
        assert_eq!(marks[0]["type"], json!("tick"));
        assert_eq!(marks[0]["orient"], json!("horizontal"));
        assert_eq!(marks[0]["thickness"], json!(3));
        assert_eq!(marks[1]["type"], json!("tick"));
        assert_eq!(marks[2]["type"], json!("rule"));
        assert_eq!(marks[2]["size"], json!(3));
        assert_eq!(to_json(&parts[0].encoding)["y"]["field"], json!("lower_yield"));
        assert_eq!(to_json(&parts[1].encoding)["y"]["field"], json!("upper_yield"));
    }
}

#[cfg(test)]
mod test_no_parts {
    use crate::*;

    #[test]
    fn test() {
        let normalized = normalize_spec(raw_spec(json!({"type": "errorbar", "rule": false})));
        let Spec::Layer(layer) = &normalized.spec else {
            panic!("Expected a layer")
        };
        assert!(layer.layer.is_empty());
        assert!(!layer.transform.is_empty());
    }
}

#[cfg(test)]
mod test_aggregated_input {
    use crate::*;

    #[rstest(
        encoding,
        calculates,
        case(
            json!({
                "x": {"field": "variety", "type": "nominal"},
                "y": {"field": "low", "type": "quantitative"},
                "y2": {"field": "high"}
            }),
            json!([
                {"calculate": "datum['high']", "as": "upper_low"},
                {"calculate": "datum['low']", "as": "lower_low"}
            ])
        ),
        case(
            json!({
                "x": {"field": "variety", "type": "nominal"},
                "y": {"field": "center", "type": "quantitative"},
                "yError": {"field": "err"}
            }),
            json!([
                {"calculate": "datum['center'] + datum['err']", "as": "upper_center"},
                {"calculate": "datum['center'] - datum['err']", "as": "lower_center"}
            ])
        ),
        case(
            json!({
                "y": {"field": "variety", "type": "nominal"},
                "x": {"field": "center", "type": "quantitative"},
                "xError": {"field": "err"},
                "xError2": {"field": "err2"}
            }),
            json!([
                {"calculate": "datum['center'] + datum['err']", "as": "upper_center"},
                {"calculate": "datum['center'] + datum['err2']", "as": "lower_center"}
            ])
        )
    )]
    fn test(encoding: Value, calculates: Value) {
        let normalized = normalize_spec(json!({"mark": "errorbar", "encoding": encoding}));
        assert!(normalized.warnings.is_empty());
        let unit = normalized.spec.as_unit().unwrap();
        assert_eq!(to_json(&unit.transform), calculates);
    }

    #[test]
    fn test_quoted_field_names() {
        let normalized = normalize_spec(json!({
            "mark": "errorbar",
            "encoding": {
                "x": {"field": "variety", "type": "nominal"},
                "y": {"field": "it's \"low\"", "type": "quantitative"},
                "y2": {"field": "high"}
            }
        }));
        let unit = normalized.spec.as_unit().unwrap();
        assert_eq!(
            to_json(&unit.transform),
            json!([
                {"calculate": "datum['high']", "as": "upper_it's \"low\""},
                {"calculate": "datum['it\\'s \"low\"']", "as": "lower_it's \"low\""}
            ])
        );
    }

    #[test]
    fn test_center_not_needed() {
        let normalized = normalize_spec(json!({
            "mark": {"type": "errorbar", "center": "median"},
            "encoding": {
                "x": {"field": "variety", "type": "nominal"},
                "y": {"field": "low", "type": "quantitative"},
                "y2": {"field": "high"}
            }
        }));
        assert_eq!(
            normalized.warnings,
            vec![NormalizeWarning::CenterAndExtentNotNeeded {
                center: true,
                extent: false
            }]
        );
        assert_eq!(
            normalized.warnings[0].to_string(),
            "Center is not needed when data are aggregated."
        );
    }
}

#[cfg(test)]
mod test_wrong_extent {
    use crate::*;

    #[test]
    fn test() {
        let normalized = normalize_spec(raw_spec(json!({
            "type": "errorbar",
            "center": "median",
            "extent": "stderr"
        })));
        assert_eq!(
            normalized.warnings,
            vec![NormalizeWarning::CenterIsUsedWithWrongExtent {
                center: "median".to_string(),
                extent: "stderr".to_string(),
                mark: "errorbar".to_string(),
            }]
        );
    }
}

#[cfg(test)]
mod test_invalid_input {
    use crate::*;

    #[rstest(
        mark,
        encoding,
        case(
            json!("errorbar"),
            json!({
                "x": {"field": "a", "type": "quantitative"},
                "x2": {"field": "b"},
                "y": {"field": "c", "type": "quantitative"},
                "y2": {"field": "d"}
            })
        ),
        case(
            json!("errorbar"),
            json!({
                "y": {"field": "a", "type": "quantitative"},
                "y2": {"field": "b"},
                "yError": {"field": "c"}
            })
        ),
        case(
            json!("errorbar"),
            json!({
                "y": {"field": "a", "type": "quantitative"},
                "yError2": {"field": "c"}
            })
        ),
        case(
            json!("errorbar"),
            json!({
                "y": {"field": "a", "type": "nominal"},
                "yError": {"field": "c"}
            })
        ),
        case(
            json!({"type": "errorbar", "extent": "range"}),
            json!({
                "x": {"field": "a", "type": "nominal"},
                "y": {"field": "b", "type": "quantitative"}
            })
        ),
        case(
            json!({"type": "errorbar", "center": "mode"}),
            json!({
                "x": {"field": "a", "type": "nominal"},
                "y": {"field": "b", "type": "quantitative"}
            })
        )
    )]
    fn test(mark: Value, encoding: Value) {
        init_logging();
        let spec = parse_spec(json!({"mark": mark, "encoding": encoding}));
        let result = normalize(&spec, &DEFAULT_CONFIG);
        assert!(matches!(result, Err(VlFusionError::SpecificationError(..))));
    }
}

#[cfg(test)]
mod test_errorband {
    use crate::*;

    #[test]
    fn test() {
        let spec = parse_spec(raw_spec(json!("errorband")));
        let result = normalize(&spec, &DEFAULT_CONFIG);
        assert!(matches!(result, Err(VlFusionError::CompilationError(..))));
    }
}
