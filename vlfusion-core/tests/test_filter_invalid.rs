#[macro_use]
extern crate lazy_static;

mod utils;
use rstest::rstest;
use serde_json::{json, Value};
use utils::{compile_spec, make_model, to_json};
use vlfusion_core::dataflow::filter_invalid::FilterInvalidNode;
use vlfusion_core::dataflow::node::DataflowNode;

fn point_spec(invalid: Option<Value>) -> Value {
    let mut mark = json!({"type": "point"});
    if let Some(invalid) = invalid {
        mark["invalid"] = invalid;
    }
    json!({
        "data": {"name": "table"},
        "mark": mark,
        "encoding": {
            "x": {"field": "a", "type": "quantitative"},
            "y": {"field": "b", "type": "quantitative"},
            "color": {"field": "c", "type": "nominal"}
        }
    })
}

#[cfg(test)]
mod test_point_modes {
    use crate::*;

    #[rstest(
        invalid,
        filtered,
        case(None, true),
        case(Some(json!("filter")), true),
        case(Some(json!("break-paths-filter-domains")), true),
        case(Some(json!("show")), false),
        case(Some(Value::Null), false)
    )]
    fn test(invalid: Option<Value>, filtered: bool) {
        let chart = compile_spec(point_spec(invalid));
        let data = to_json(&chart.data);
        let from = to_json(&chart.marks[0].from);
        if filtered {
            assert_eq!(
                data,
                json!([{
                    "name": "table",
                    "transform": [{
                        "type": "filter",
                        "expr": "isValid(datum[\"a\"]) && isFinite(+datum[\"a\"]) && isValid(datum[\"b\"]) && isFinite(+datum[\"b\"])"
                    }]
                }])
            );
        } else {
            assert_eq!(data, json!([{"name": "table"}]));
        }
        assert_eq!(from, json!({"data": "table"}));
    }
}

#[cfg(test)]
mod test_path_modes {
    use crate::*;

    #[rstest(
        invalid,
        datasets,
        case(None, 1),
        case(Some(json!("break-paths-show-domains")), 1),
        case(Some(json!("break-paths-filter-domains")), 2),
        case(Some(json!("filter")), 1)
    )]
    fn test(invalid: Option<Value>, datasets: usize) {
        let mut mark = json!({"type": "line"});
        if let Some(invalid) = invalid {
            mark["invalid"] = invalid;
        }
        let chart = compile_spec(json!({
            "data": {"name": "table"},
            "mark": mark,
            "encoding": {
                "x": {"field": "t", "type": "temporal"},
                "y": {"field": "b", "type": "quantitative"}
            }
        }));
        assert_eq!(chart.data.len(), datasets);
        // Lines break at invalid values unless the rows are filtered
        let update = to_json(chart.marks[0].update_channels().unwrap());
        let filtered = chart.data.len() == 1 && !chart.data[0].transform.is_empty();
        assert_eq!(update.get("defined").is_some(), !filtered);
        assert_eq!(
            to_json(&chart.marks[0].from),
            json!({"data": "table"})
        );
    }
}

#[cfg(test)]
mod test_make {
    use crate::*;

    #[test]
    fn test_temporal_and_discrete() {
        let model = make_model(
            json!({"type": "bar"}),
            json!({
                "x": {"field": "t", "type": "temporal"},
                "y": {"field": "v", "type": "quantitative", "scale": {"type": "log"}},
                "color": {"field": "c", "type": "nominal"}
            }),
        );
        let data_sources = model.data_sources_for_invalid().unwrap();
        let node = FilterInvalidNode::make(&model, &data_sources).unwrap().unwrap();
        assert_eq!(
            node.filter().keys().collect::<Vec<_>>(),
            vec!["t", "v"]
        );
        assert_eq!(
            to_json(&node.assemble().unwrap()),
            json!([{
                "type": "filter",
                "expr": "(isDate(datum[\"t\"]) || (isValid(datum[\"t\"]) && isFinite(+datum[\"t\"]))) && isValid(datum[\"v\"]) && isFinite(+datum[\"v\"])"
            }])
        );
    }

    #[rstest(
        mark,
        encoding,
        case(
            json!({"type": "bar"}),
            json!({"x": {"field": "a", "type": "nominal"}, "y": {"aggregate": "count", "type": "quantitative"}})
        ),
        case(
            json!({"type": "point", "invalid": null}),
            json!({"x": {"field": "a", "type": "quantitative"}})
        ),
        case(
            json!({"type": "point"}),
            json!({"x": {"field": "a", "type": "nominal"}, "shape": {"field": "b", "type": "nominal"}})
        ),
        case(
            json!({"type": "point"}),
            json!({"x": {"field": "a", "type": "quantitative", "scale": null}})
        ),
        case(
            json!({"type": "point"}),
            json!({"x": {"field": "a", "type": "nominal", "scale": {"type": "linear"}}})
        )
    )]
    fn test_no_filter(mark: Value, encoding: Value) {
        let model = make_model(mark, encoding);
        let data_sources = model.data_sources_for_invalid().unwrap();
        assert!(FilterInvalidNode::make(&model, &data_sources).unwrap().is_none());
    }

    #[test]
    fn test_hash_depends_on_fields() {
        let make = |field: &str| {
            let model = make_model(
                json!({"type": "point"}),
                json!({"x": {"field": field, "type": "quantitative"}}),
            );
            let data_sources = model.data_sources_for_invalid().unwrap();
            FilterInvalidNode::make(&model, &data_sources).unwrap().unwrap()
        };
        assert_eq!(make("a").hash().unwrap(), make("a").hash().unwrap());
        assert_ne!(make("a").hash().unwrap(), make("b").hash().unwrap());
    }

    #[test]
    fn test_hash_ignores_channel_order() {
        let make = |x: &str, y: &str| {
            let model = make_model(
                json!({"type": "point"}),
                json!({
                    "x": {"field": x, "type": "quantitative"},
                    "y": {"field": y, "type": "quantitative"}
                }),
            );
            let data_sources = model.data_sources_for_invalid().unwrap();
            FilterInvalidNode::make(&model, &data_sources).unwrap().unwrap()
        };
        let ab = make("a", "b");
        let ba = make("b", "a");
        assert_eq!(ab.filter().keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(ba.filter().keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(ab.hash().unwrap(), ba.hash().unwrap());
    }

    #[test]
    fn test_incompatible_scale_type_compiles() {
        let chart = compile_spec(json!({
            "data": {"name": "table"},
            "mark": "point",
            "encoding": {
                "x": {"field": "a", "type": "nominal", "scale": {"type": "linear"}},
                "y": {"field": "b", "type": "quantitative"}
            }
        }));
        assert_eq!(
            to_json(&chart.data),
            json!([{
                "name": "table",
                "transform": [{
                    "type": "filter",
                    "expr": "isValid(datum[\"b\"]) && isFinite(+datum[\"b\"])"
                }]
            }])
        );
    }
}
