/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::channel::Channel;
use crate::spec::mark::MarkDef;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;

pub const DEFAULT_MARK_COLOR: &str = "#4c78a8";
pub const DEFAULT_COUNT_TITLE: &str = "Count of Records";

/// Chart configuration. Only the options consulted while compiling are
/// typed, per-mark configs are kept as plain JSON objects keyed by mark type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub mark: Map<String, Value>,

    pub boxplot: BoxPlotConfig,

    pub errorbar: ErrorBarConfig,

    pub scale: ScaleConfig,

    #[serde(rename = "countTitle")]
    pub count_title: String,

    #[serde(flatten)]
    pub mark_configs: Map<String, Value>,
}

impl Default for Config {
    fn default() -> Self {
        let mut mark = Map::new();
        mark.insert("color".to_string(), json!(DEFAULT_MARK_COLOR));
        Self {
            mark,
            boxplot: Default::default(),
            errorbar: Default::default(),
            scale: Default::default(),
            count_title: DEFAULT_COUNT_TITLE.to_string(),
            mark_configs: Default::default(),
        }
    }
}

impl Config {
    /// Config object for a primitive mark type, e.g. `config.bar`
    pub fn mark_type_config(&self, mark_type: &str) -> Option<&Map<String, Value>> {
        self.mark_configs.get(mark_type).and_then(Value::as_object)
    }

    /// Look up a property in the config of a mark type, falling back on `config.mark`
    pub fn get_mark_config(&self, prop: &str, mark_type: &str) -> Option<Value> {
        self.mark_type_config(mark_type)
            .and_then(|config| config.get(prop))
            .or_else(|| self.mark.get(prop))
            .cloned()
    }
}

/// Extent of boxplot whiskers: an IQR multiplier or a named extent such as `min-max`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BoxPlotExtent {
    Factor(f64),
    Named(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoxPlotConfig {
    pub extent: BoxPlotExtent,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,

    #[serde(rename = "box")]
    pub box_: Option<Value>,
    pub median: Option<Value>,
    pub outliers: Option<Value>,
    pub rule: Option<Value>,
    pub ticks: Option<Value>,
}

impl Default for BoxPlotConfig {
    fn default() -> Self {
        Self {
            extent: BoxPlotExtent::Factor(1.5),
            size: Some(14.0),
            box_: Some(json!({})),
            median: Some(json!({"color": "white"})),
            outliers: Some(json!({})),
            rule: Some(json!({})),
            ticks: Some(json!({})),
        }
    }
}

impl CompositePartsConfig for BoxPlotConfig {
    fn part(&self, part: &str) -> Option<&Value> {
        match part {
            "box" => self.box_.as_ref(),
            "median" => self.median.as_ref(),
            "outliers" => self.outliers.as_ref(),
            "rule" => self.rule.as_ref(),
            "ticks" => self.ticks.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErrorBarConfig {
    pub center: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thickness: Option<f64>,

    pub rule: Option<Value>,
    pub ticks: Option<Value>,
}

impl Default for ErrorBarConfig {
    fn default() -> Self {
        Self {
            center: Some("mean".to_string()),
            extent: None,
            size: None,
            thickness: None,
            rule: Some(Value::Bool(true)),
            ticks: Some(Value::Bool(false)),
        }
    }
}

impl CompositePartsConfig for ErrorBarConfig {
    fn part(&self, part: &str) -> Option<&Value> {
        match part {
            "rule" => self.rule.as_ref(),
            "ticks" => self.ticks.as_ref(),
            _ => None,
        }
    }
}

/// Per-part configuration of a composite mark. A part is enabled when its
/// config is an object or `true`.
pub trait CompositePartsConfig {
    fn part(&self, part: &str) -> Option<&Value>;

    fn part_enabled(&self, part: &str) -> bool {
        is_truthy(self.part(part))
    }
}

pub fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleConfig {
    /// Output value used for invalid data, per scale channel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invalid: Option<HashMap<Channel, ScaleInvalidOutput>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScaleConfig {
    pub fn invalid_output(&self, channel: Channel) -> Option<&ScaleInvalidOutput> {
        self.invalid.as_ref().and_then(|invalid| invalid.get(&channel))
    }
}

/// Visual output for invalid values: a literal value or a signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScaleInvalidOutput {
    Signal { signal: String },
    Value { value: Value },
}

#[derive(Debug, Clone, Default)]
pub struct MarkPropOptions<'a> {
    pub vg_channel: Option<&'a str>,
    pub ignore_vg_config: bool,
}

/// Look up a mark property, first on the mark definition (under the output
/// channel name, then the encoding channel name), then in the config of the
/// mark type and finally in `config.mark`.
///
/// A `null` value on the mark definition is returned as `Some(Value::Null)`.
pub fn get_mark_prop_or_config(
    prop: &str,
    mark_def: &MarkDef,
    config: &Config,
    opts: MarkPropOptions,
) -> Option<Value> {
    let MarkPropOptions {
        vg_channel,
        ignore_vg_config,
    } = opts;

    if let Some(value) = vg_channel.and_then(|vg| mark_def.get(vg)) {
        return Some(value.clone());
    }
    if let Some(value) = mark_def.get(prop) {
        return Some(value.clone());
    }
    if ignore_vg_config && vg_channel.map_or(true, |vg| vg == prop) {
        return None;
    }
    let mark_type_config = config.mark_type_config(mark_def.type_.name());
    vg_channel
        .and_then(|vg| mark_type_config.and_then(|c| c.get(vg)))
        .or_else(|| mark_type_config.and_then(|c| c.get(prop)))
        .or_else(|| config.mark.get(vg_channel.unwrap_or(prop)))
        .cloned()
}

#[cfg(test)]
mod tests {
    use crate::spec::config::{
        get_mark_prop_or_config, BoxPlotExtent, CompositePartsConfig, Config, MarkPropOptions,
        ScaleInvalidOutput,
    };
    use crate::spec::channel::Channel;
    use crate::spec::mark::MarkDef;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.boxplot.extent, BoxPlotExtent::Factor(1.5));
        assert!(config.boxplot.part_enabled("ticks"));
        assert!(config.errorbar.part_enabled("rule"));
        assert!(!config.errorbar.part_enabled("ticks"));
        assert_eq!(config.count_title, "Count of Records");
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = serde_json::from_value(json!({
            "boxplot": {"extent": "min-max"},
            "bar": {"color": "red"},
            "scale": {"invalid": {"color": {"value": "grey"}}}
        }))
        .unwrap();
        assert_eq!(
            config.boxplot.extent,
            BoxPlotExtent::Named("min-max".to_string())
        );
        assert_eq!(config.boxplot.size, Some(14.0));
        assert_eq!(config.get_mark_config("color", "bar"), Some(json!("red")));
        assert_eq!(
            config.get_mark_config("color", "point"),
            Some(json!("#4c78a8"))
        );
        assert_eq!(
            config.scale.invalid_output(Channel::Color),
            Some(&ScaleInvalidOutput::Value {
                value: json!("grey")
            })
        );
    }

    #[test]
    fn test_mark_prop_precedence() {
        let config: Config = serde_json::from_value(json!({"point": {"size": 40}})).unwrap();
        let mark_def: MarkDef = serde_json::from_value(json!({"type": "point"})).unwrap();

        let opts = MarkPropOptions {
            vg_channel: None,
            ignore_vg_config: false,
        };
        assert_eq!(
            get_mark_prop_or_config("size", &mark_def, &config, opts),
            Some(json!(40))
        );

        // Config is skipped when ignoring the output channel's config
        let opts = MarkPropOptions {
            vg_channel: None,
            ignore_vg_config: true,
        };
        assert_eq!(get_mark_prop_or_config("size", &mark_def, &config, opts), None);

        let mark_def: MarkDef =
            serde_json::from_value(json!({"type": "point", "size": 10})).unwrap();
        assert_eq!(
            get_mark_prop_or_config("size", &mark_def, &config, Default::default()),
            Some(json!(10))
        );
    }
}
