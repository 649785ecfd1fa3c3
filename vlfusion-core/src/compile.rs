/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::compositemark::{normalize, NormalizeWarning, Normalized};
use crate::dataflow::assemble::assemble_data;
use crate::dataflow::filter_invalid::FilterInvalidNode;
use crate::dataflow::graph::DataflowGraph;
use crate::dataflow::optimize::{merge_identical_siblings, resolve};
use crate::dataflow::parse::parse_transforms;
use crate::dataflow::source::SourceNode;
use crate::encode::mark::encode_mark;
use crate::invalid::DataSourceInvalidHandling;
use crate::model::UnitModel;
use crate::spec::config::Config;
use crate::spec::encoding::extract_transforms_from_encoding;
use crate::spec::transform::{AggregateTransform, Transform};
use crate::spec::unit::{Spec, UnitSpec};
use crate::vega::data::DataSpec;
use crate::vega::mark::{MarkEncodeSpec, MarkFromSpec, MarkSpec};
use indexmap::IndexMap;
use petgraph::stable_graph::NodeIndex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use vlfusion_common::error::{Result, ResultWithContext};

/// Name of the input dataset of a spec without named data
pub const DEFAULT_SOURCE: &str = "source_0";

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Name given to the root dataset when the spec's data is not named
    pub source: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
        }
    }
}

/// Datasets and marks of a compiled spec
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledChart {
    pub data: Vec<DataSpec>,
    pub marks: Vec<MarkSpec>,
    #[serde(skip)]
    pub warnings: Vec<NormalizeWarning>,
}

struct CompiledUnit<'a> {
    model: UnitModel<'a>,
    mark_name: String,
    data: NodeIndex,
}

struct Compiler<'a> {
    config: &'a Config,
    opts: &'a CompileOptions,
    graph: DataflowGraph,
    sources: HashMap<String, NodeIndex>,
    unnamed_sources: usize,
    units: Vec<CompiledUnit<'a>>,
}

/// Compile a spec into renderer datasets and marks.
///
/// Composite marks are expanded first. Every view then contributes a chain of
/// dataflow nodes for its transforms, the bins, time units and aggregates of
/// its encoding, and the filter removing invalid values. Identical branches
/// are merged before the graph is assembled into datasets.
pub fn compile(spec: &Spec, config: &Config, opts: &CompileOptions) -> Result<CompiledChart> {
    let Normalized {
        spec: normalized,
        warnings,
    } = normalize(spec, config)?;

    let mut compiler = Compiler {
        config,
        opts,
        graph: DataflowGraph::new(),
        sources: HashMap::new(),
        unnamed_sources: 0,
        units: Vec::new(),
    };
    let root_name = match &normalized {
        Spec::Layer(layer) => layer.name.clone(),
        Spec::Unit(unit) => unit.name.clone(),
    };
    compiler.walk(&normalized, None, root_name.unwrap_or_default())?;

    let Compiler {
        mut graph, units, ..
    } = compiler;
    let replaced = merge_identical_siblings(&mut graph)?;
    let outputs: HashSet<NodeIndex> = units
        .iter()
        .map(|unit| resolve(&replaced, unit.data))
        .collect();
    let assembled = assemble_data(&graph, &outputs)?;

    let mut marks = Vec::new();
    for unit in &units {
        let dataset = assembled
            .datasets
            .get(&resolve(&replaced, unit.data))
            .with_context(|| format!("No dataset assembled for {}", unit.mark_name))?;
        marks.push(assemble_mark(unit, dataset)?);
    }

    Ok(CompiledChart {
        data: assembled.data,
        marks,
        warnings,
    })
}

fn child_name(parent: &str, index: usize) -> String {
    if parent.is_empty() {
        format!("layer_{index}")
    } else {
        format!("{parent}_layer_{index}")
    }
}

impl<'a> Compiler<'a> {
    /// Root node for a data definition. Named data is shared between views
    /// that reference it.
    fn source(&mut self, data: Option<&Value>) -> NodeIndex {
        let name = match data.and_then(|data| data.get("name")).and_then(Value::as_str) {
            Some(name) => name.to_string(),
            None => {
                let name = if self.unnamed_sources == 0 {
                    self.opts.source.clone()
                } else {
                    format!("source_{}", self.unnamed_sources)
                };
                self.unnamed_sources += 1;
                name
            }
        };
        if let Some(index) = self.sources.get(&name) {
            return *index;
        }
        let inline = data.is_some_and(|data| data.get("url").is_some() || data.get("values").is_some());
        let node = match data {
            Some(data) if inline => SourceNode::with_data(name.clone(), data.clone()),
            _ => SourceNode::named(name.clone()),
        };
        let index = self.graph.add(node, None);
        self.sources.insert(name, index);
        index
    }

    fn walk(&mut self, spec: &Spec, parent: Option<NodeIndex>, name: String) -> Result<()> {
        let data = match spec {
            Spec::Layer(layer) => layer.data.as_ref(),
            Spec::Unit(unit) => unit.data.as_ref(),
        };
        let start = match (data, parent) {
            (Some(data), _) => self.source(Some(data)),
            (None, Some(parent)) => parent,
            (None, None) => self.source(None),
        };
        let current = parse_transforms(&mut self.graph, start, spec.transform())?;

        match spec {
            Spec::Layer(layer) => {
                for (index, child) in layer.layer.iter().enumerate() {
                    let child_name = match child {
                        Spec::Unit(unit) if unit.name.is_some() => unit.name.clone(),
                        Spec::Layer(layer) if layer.name.is_some() => layer.name.clone(),
                        _ => None,
                    }
                    .unwrap_or_else(|| child_name(&name, index));
                    self.walk(child, Some(current), child_name)?;
                }
                Ok(())
            }
            Spec::Unit(unit) => self.unit(unit, current, name),
        }
    }

    fn unit(&mut self, unit: &UnitSpec, parent: NodeIndex, name: String) -> Result<()> {
        let extracted = extract_transforms_from_encoding(&unit.encoding, self.config)?;
        let mut transforms: Vec<Transform> = extracted
            .bins
            .into_iter()
            .map(Transform::Bin)
            .chain(extracted.time_units.into_iter().map(Transform::TimeUnit))
            .collect();
        if !extracted.aggregate.is_empty() {
            transforms.push(Transform::Aggregate(AggregateTransform {
                aggregate: extracted.aggregate,
                groupby: extracted.groupby,
            }));
        }
        let current = parse_transforms(&mut self.graph, parent, &transforms)?;

        let mark_name = if name.is_empty() {
            "marks".to_string()
        } else {
            format!("{name}_marks")
        };
        let model = UnitModel::try_new(name, unit.mark.to_mark_def(), extracted.encoding, self.config)?;

        let data_sources = model.data_sources_for_invalid()?;
        let data = match FilterInvalidNode::make(&model, &data_sources)? {
            Some(filter) => {
                let filtered = self.graph.add(filter, Some(current));
                if data_sources.marks == DataSourceInvalidHandling::ExcludeInvalidValues {
                    filtered
                } else {
                    current
                }
            }
            None => current,
        };

        self.units.push(CompiledUnit {
            model,
            mark_name,
            data,
        });
        Ok(())
    }
}

fn assemble_mark(unit: &CompiledUnit, dataset: &str) -> Result<MarkSpec> {
    let mark_def = &unit.model.mark_def;
    let mut style = vec![mark_def.type_.name().to_string()];
    match mark_def.get("style") {
        Some(Value::String(s)) => style.push(s.clone()),
        Some(Value::Array(styles)) => {
            style.extend(styles.iter().filter_map(Value::as_str).map(String::from))
        }
        _ => {}
    }

    let mut extra = Map::new();
    for prop in ["clip", "aria"] {
        if let Some(value) = mark_def.get(prop) {
            extra.insert(prop.to_string(), value.clone());
        }
    }

    let update = encode_mark(&unit.model)?;
    Ok(MarkSpec {
        type_: mark_def.type_.vg_mark().to_string(),
        name: Some(unit.mark_name.clone()),
        style: Some(style),
        from: Some(MarkFromSpec {
            data: Some(dataset.to_string()),
        }),
        encode: Some(MarkEncodeSpec {
            encodings: IndexMap::from([("update".to_string(), update)]),
        }),
        extra,
    })
}

#[cfg(test)]
mod tests {
    use crate::compile::{compile, CompileOptions};
    use crate::spec::config::Config;
    use crate::spec::unit::Spec;
    use serde_json::json;

    #[test]
    fn test_compile_aggregated_bar() {
        let spec: Spec = serde_json::from_value(json!({
            "data": {"url": "data/cars.json"},
            "mark": "bar",
            "encoding": {
                "x": {"field": "Origin", "type": "nominal"},
                "y": {"field": "Horsepower", "aggregate": "mean", "type": "quantitative"}
            }
        }))
        .unwrap();
        let compiled = compile(&spec, &Config::default(), &CompileOptions::default()).unwrap();

        assert_eq!(compiled.data.len(), 1);
        let data = serde_json::to_value(&compiled.data[0]).unwrap();
        assert_eq!(data["name"], json!("source_0"));
        assert_eq!(data["url"], json!("data/cars.json"));
        assert_eq!(
            data["transform"],
            json!([
                {"type": "aggregate", "groupby": ["Origin"], "ops": ["mean"], "fields": ["Horsepower"], "as": ["mean_Horsepower"]},
                {"type": "filter", "expr": "isValid(datum[\"mean_Horsepower\"]) && isFinite(+datum[\"mean_Horsepower\"])"}
            ])
        );

        assert_eq!(compiled.marks.len(), 1);
        let mark = serde_json::to_value(&compiled.marks[0]).unwrap();
        assert_eq!(mark["type"], json!("rect"));
        assert_eq!(mark["name"], json!("marks"));
        assert_eq!(mark["style"], json!(["bar"]));
        assert_eq!(mark["from"], json!({"data": "source_0"}));
        assert_eq!(
            mark["encode"]["update"]["y"],
            json!({"field": "mean_Horsepower", "scale": "y"})
        );
    }

    #[test]
    fn test_compile_named_source() {
        let spec: Spec = serde_json::from_value(json!({
            "mark": {"type": "point", "invalid": null},
            "encoding": {"x": {"field": "a", "type": "quantitative"}}
        }))
        .unwrap();
        let opts = CompileOptions {
            source: "table".to_string(),
        };
        let compiled = compile(&spec, &Config::default(), &opts).unwrap();
        assert_eq!(compiled.data.len(), 1);
        assert_eq!(compiled.data[0].name, "table");
        assert!(compiled.data[0].transform.is_empty());
        let mark = serde_json::to_value(&compiled.marks[0]).unwrap();
        assert_eq!(mark["type"], json!("symbol"));
        assert_eq!(mark["from"], json!({"data": "table"}));
    }

    #[test]
    fn test_compile_layers_share_source() {
        let spec: Spec = serde_json::from_value(json!({
            "data": {"name": "table"},
            "layer": [
                {"mark": "line", "encoding": {"x": {"field": "a", "type": "quantitative"}, "y": {"field": "b", "type": "quantitative"}}},
                {"mark": "point", "encoding": {"x": {"field": "a", "type": "quantitative"}, "y": {"field": "b", "type": "quantitative"}}}
            ]
        }))
        .unwrap();
        let compiled = compile(&spec, &Config::default(), &CompileOptions::default()).unwrap();
        let names: Vec<_> = compiled
            .marks
            .iter()
            .map(|mark| mark.name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["layer_0_marks", "layer_1_marks"]);
        // The line keeps invalid values, the points read from the filtered branch
        assert_eq!(compiled.marks[0].from.as_ref().unwrap().data.as_deref(), Some("table"));
        assert_eq!(compiled.data[0].name, "table");
        assert_eq!(compiled.data.len(), 2);
        assert_eq!(compiled.data[1].source.as_deref(), Some("table"));
        assert_eq!(
            compiled.marks[1].from.as_ref().unwrap().data.as_deref(),
            Some(compiled.data[1].name.as_str())
        );
    }

    #[test]
    fn test_compile_boxplot() {
        let spec: Spec = serde_json::from_value(json!({
            "data": {"url": "data/population.json"},
            "mark": "boxplot",
            "encoding": {
                "x": {"field": "age", "type": "ordinal"},
                "y": {"field": "people", "type": "quantitative"}
            }
        }))
        .unwrap();
        let compiled = compile(&spec, &Config::default(), &CompileOptions::default()).unwrap();
        let styles: Vec<_> = compiled
            .marks
            .iter()
            .map(|mark| mark.style.clone().unwrap())
            .collect();
        assert!(styles.contains(&vec!["bar".to_string(), "boxplot-box".to_string()]));
        assert!(styles.contains(&vec!["point".to_string(), "boxplot-outliers".to_string()]));
        assert!(styles.contains(&vec!["tick".to_string(), "boxplot-median".to_string()]));
        assert!(compiled.warnings.is_empty());
        assert_eq!(compiled.data[0].name, "source_0");
        assert_eq!(
            serde_json::to_value(&compiled.data[0].transform[0]).unwrap()["type"],
            json!("joinaggregate")
        );
    }

    #[test]
    fn test_compile_unsupported_transform() {
        let spec: Spec = serde_json::from_value(json!({
            "mark": "point",
            "transform": [{"fold": ["a", "b"]}]
        }))
        .unwrap();
        assert!(compile(&spec, &Config::default(), &CompileOptions::default()).is_err());
    }
}
