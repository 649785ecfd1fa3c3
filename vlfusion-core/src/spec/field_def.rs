/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::channel::{Channel, RangeType};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Quantitative,
    Temporal,
    Ordinal,
    Nominal,
}

impl FieldType {
    pub fn is_continuous(&self) -> bool {
        matches!(self, FieldType::Quantitative | FieldType::Temporal)
    }
}

/// Vega-Lite aggregate operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateOp {
    Count,
    Valid,
    Values,
    Missing,
    Distinct,
    Sum,
    Product,
    Mean,
    Average,
    Variance,
    Variancep,
    Stdev,
    Stdevp,
    Stderr,
    Median,
    Q1,
    Q3,
    Ci0,
    Ci1,
    Min,
    Max,
    Argmin,
    Argmax,
    Exponential,
    Exponentialb,
}

impl AggregateOp {
    pub fn name(&self) -> &'static str {
        use AggregateOp::*;
        match self {
            Count => "count",
            Valid => "valid",
            Values => "values",
            Missing => "missing",
            Distinct => "distinct",
            Sum => "sum",
            Product => "product",
            Mean => "mean",
            Average => "average",
            Variance => "variance",
            Variancep => "variancep",
            Stdev => "stdev",
            Stdevp => "stdevp",
            Stderr => "stderr",
            Median => "median",
            Q1 => "q1",
            Q3 => "q3",
            Ci0 => "ci0",
            Ci1 => "ci1",
            Min => "min",
            Max => "max",
            Argmin => "argmin",
            Argmax => "argmax",
            Exponential => "exponential",
            Exponentialb => "exponentialb",
        }
    }

    /// Operations whose output is a count and therefore can never be invalid
    pub fn is_counting(&self) -> bool {
        matches!(
            self,
            AggregateOp::Count | AggregateOp::Valid | AggregateOp::Missing | AggregateOp::Distinct
        )
    }
}

impl Display for AggregateOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Composite mark names that may appear as an aggregate of the continuous axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeAggregate {
    Boxplot,
    Errorbar,
    Errorband,
}

impl CompositeAggregate {
    pub fn name(&self) -> &'static str {
        match self {
            CompositeAggregate::Boxplot => "boxplot",
            CompositeAggregate::Errorbar => "errorbar",
            CompositeAggregate::Errorband => "errorband",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgAggregate {
    Argmax(String),
    Argmin(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Aggregate {
    Op(AggregateOp),
    Composite(CompositeAggregate),
    Arg(ArgAggregate),
}

impl Aggregate {
    pub fn is_counting(&self) -> bool {
        matches!(self, Aggregate::Op(op) if op.is_counting())
    }

    pub fn is_count(&self) -> bool {
        matches!(self, Aggregate::Op(AggregateOp::Count))
    }
}

/// Bin parameters. Only the parameters that affect the generated field name
/// and the renderer's bin transform are modelled, the rest pass through.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BinParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxbins: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub anchor: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nice: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub minstep: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub extent: Option<[f64; 2]>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinnedToken {
    Binned,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bin {
    Flag(bool),
    Binned(BinnedToken),
    Params(BinParams),
}

pub const DEFAULT_MAXBINS: f64 = 10.0;

impl Bin {
    /// Whether the field must be binned by a transform (as opposed to being
    /// already binned in the input data)
    pub fn is_binning(&self) -> bool {
        matches!(self, Bin::Flag(true) | Bin::Params(_))
    }

    pub fn is_binned(&self) -> bool {
        matches!(self, Bin::Binned(_))
    }

    /// Binning parameters with defaults filled in
    pub fn params(&self) -> BinParams {
        match self {
            Bin::Params(params) => params.clone(),
            _ => BinParams {
                maxbins: Some(DEFAULT_MAXBINS),
                ..Default::default()
            },
        }
    }

    /// Name fragment for the binned field, e.g. `bin_maxbins_10`
    pub fn to_field_prefix(&self) -> String {
        let params = self.params();
        let mut prefix = String::from("bin");
        let numeric = [
            ("maxbins", params.maxbins),
            ("step", params.step),
            ("anchor", params.anchor),
            ("base", params.base),
            ("minstep", params.minstep),
        ];
        for (name, value) in numeric {
            if let Some(value) = value {
                prefix.push_str(&format!("_{name}_{}", format_number(value)));
            }
        }
        if let Some(nice) = params.nice {
            prefix.push_str(&format!("_nice_{nice}"));
        }
        if let Some([lo, hi]) = params.extent {
            prefix.push_str(&format!(
                "_extent_{}_{}",
                format_number(lo),
                format_number(hi)
            ));
        }
        prefix
    }
}

/// Format a number the way a JavaScript template string would
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

/// Time unit, either as a plain unit string (e.g. `yearmonth`, `utcmonth`) or
/// as a parameter object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeUnit {
    Unit(String),
    Params(TimeUnitParams),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeUnitParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub utc: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Single time unit parts in the order they appear in compound units
pub const TIME_UNIT_PARTS: [&str; 11] = [
    "year",
    "quarter",
    "month",
    "week",
    "dayofyear",
    "date",
    "day",
    "hours",
    "minutes",
    "seconds",
    "milliseconds",
];

impl TimeUnit {
    /// Normalized unit string, including a `utc` prefix for UTC units
    pub fn unit(&self) -> Option<String> {
        match self {
            TimeUnit::Unit(unit) => Some(unit.clone()),
            TimeUnit::Params(params) => params.unit.as_ref().map(|unit| {
                if params.utc == Some(true) && !unit.starts_with("utc") {
                    format!("utc{unit}")
                } else {
                    unit.clone()
                }
            }),
        }
    }

    /// `binned*` units describe data that is already discretized
    pub fn is_binned(&self) -> bool {
        self.unit().is_some_and(|unit| unit.starts_with("binned"))
    }

    pub fn is_utc(&self) -> bool {
        self.unit().is_some_and(|unit| unit.starts_with("utc"))
    }

    /// Name fragment for the time unit field, e.g. `yearmonth` or `utcyear_step_2`
    pub fn to_field_prefix(&self) -> String {
        let unit = self.unit().unwrap_or_default();
        match self {
            TimeUnit::Params(TimeUnitParams {
                step: Some(step), ..
            }) => format!("{unit}_step_{}", format_number(*step)),
            _ => unit,
        }
    }

    /// Single unit parts of a (possibly compound) time unit, e.g. `yearmonth` -> `[year, month]`
    pub fn parts(&self) -> Vec<&'static str> {
        let unit = self.unit().unwrap_or_default();
        let unit = unit.strip_prefix("utc").unwrap_or(&unit);
        TIME_UNIT_PARTS
            .iter()
            .copied()
            .filter(|part| contains_part(unit, part))
            .collect()
    }
}

fn contains_part(unit: &str, part: &str) -> bool {
    // `day` is a substring of `dayofyear`, so strip the longer match first
    match part {
        "day" => unit.replace("dayofyear", "").contains("day"),
        _ => unit.contains(part),
    }
}

/// Keeps an explicit `null` as `Some(Value::Null)` so it stays distinct from an absent property
pub(crate) fn explicit_null<'de, D>(deserializer: D) -> std::result::Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Definition of a field bound to an encoding channel
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FieldDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<FieldType>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregate: Option<Aggregate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin: Option<Bin>,

    #[serde(rename = "timeUnit", skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<TimeUnit>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Value>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub scale: Option<Value>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub axis: Option<Value>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub legend: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<crate::spec::channel_def::Conditions>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDef {
    pub fn new<S: Into<String>>(field: S, type_: FieldType) -> Self {
        Self {
            field: Some(field.into()),
            type_: Some(type_),
            ..Default::default()
        }
    }

    pub fn with_aggregate(mut self, op: AggregateOp) -> Self {
        self.aggregate = Some(Aggregate::Op(op));
        self
    }

    /// Field name, or empty string for a field-less count
    pub fn field_name(&self) -> &str {
        self.field.as_deref().unwrap_or("")
    }

    pub fn is_count(&self) -> bool {
        self.aggregate.as_ref().is_some_and(|agg| agg.is_count())
    }

    pub fn is_counting_aggregate(&self) -> bool {
        self.aggregate.as_ref().is_some_and(|agg| agg.is_counting())
    }

    pub fn is_binning(&self) -> bool {
        self.bin.as_ref().is_some_and(|bin| bin.is_binning())
    }

    /// Quantitative or temporal and not discretized by a bin
    pub fn is_continuous(&self) -> bool {
        self.type_.is_some_and(|t| t.is_continuous()) && !self.is_binning()
    }

    /// Whether values of this field are formatted as dates
    pub fn is_for_time_format(&self) -> bool {
        self.type_ == Some(FieldType::Temporal)
            || self.time_unit.as_ref().is_some_and(|tu| !tu.is_binned())
    }

    /// Title of the field, the explicit title if there is one
    pub fn title_or_field(&self) -> Value {
        self.title
            .clone()
            .unwrap_or_else(|| Value::String(self.field_name().to_string()))
    }

    /// Title describing the field and its transformation, e.g. `Mean of price`
    pub fn verbal_title(&self, count_title: &str) -> String {
        let field = self.field_name();
        if self.is_count() {
            return count_title.to_string();
        }
        if self.is_binning() {
            return format!("{field} (binned)");
        }
        if let Some(time_unit) = self.time_unit.as_ref().filter(|tu| !tu.is_binned()) {
            let parts = time_unit.parts();
            if !parts.is_empty() {
                return format!("{field} ({})", parts.join("-"));
            }
        }
        match &self.aggregate {
            Some(Aggregate::Arg(ArgAggregate::Argmax(arg))) => format!("{field} for max {arg}"),
            Some(Aggregate::Arg(ArgAggregate::Argmin(arg))) => format!("{field} for min {arg}"),
            Some(Aggregate::Op(op)) => format!("{} of {field}", title_case(op.name())),
            Some(Aggregate::Composite(composite)) => {
                format!("{} of {field}", title_case(composite.name()))
            }
            None => field.to_string(),
        }
    }
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Infer the type of a field that does not declare one
pub fn default_type(field_def: &FieldDef, channel: Channel) -> FieldType {
    if field_def
        .time_unit
        .as_ref()
        .is_some_and(|tu| !tu.is_binned())
    {
        return FieldType::Temporal;
    }
    if field_def.is_binning() {
        return FieldType::Quantitative;
    }
    if field_def.is_counting_aggregate() {
        return FieldType::Quantitative;
    }
    match channel.range_type() {
        RangeType::Continuous => FieldType::Quantitative,
        RangeType::Discrete | RangeType::Flexible => FieldType::Nominal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_aggregate_variants() {
        let op: Aggregate = serde_json::from_value(json!("q1")).unwrap();
        assert_eq!(op, Aggregate::Op(AggregateOp::Q1));

        let composite: Aggregate = serde_json::from_value(json!("boxplot")).unwrap();
        assert_eq!(composite, Aggregate::Composite(CompositeAggregate::Boxplot));

        let arg: Aggregate = serde_json::from_value(json!({"argmax": "price"})).unwrap();
        assert_eq!(arg, Aggregate::Arg(ArgAggregate::Argmax("price".to_string())));
    }

    #[test]
    fn test_bin_prefix() {
        assert_eq!(Bin::Flag(true).to_field_prefix(), "bin_maxbins_10");
        let bin: Bin = serde_json::from_value(json!({"maxbins": 20})).unwrap();
        assert_eq!(bin.to_field_prefix(), "bin_maxbins_20");
        let binned: Bin = serde_json::from_value(json!("binned")).unwrap();
        assert!(binned.is_binned());
        assert!(!binned.is_binning());
    }

    #[test]
    fn test_time_unit_parts() {
        let tu = TimeUnit::Unit("yearmonthdate".to_string());
        assert_eq!(tu.parts(), vec!["year", "month", "date"]);
        let tu = TimeUnit::Unit("utcdayofyear".to_string());
        assert_eq!(tu.parts(), vec!["dayofyear"]);
        assert!(tu.is_utc());
    }

    #[test]
    fn test_default_type() {
        let def = FieldDef {
            field: Some("a".to_string()),
            ..Default::default()
        };
        assert_eq!(default_type(&def, Channel::X), FieldType::Quantitative);
        assert_eq!(default_type(&def, Channel::Color), FieldType::Nominal);

        let def = FieldDef {
            field: Some("a".to_string()),
            time_unit: Some(TimeUnit::Unit("month".to_string())),
            ..Default::default()
        };
        assert_eq!(default_type(&def, Channel::Color), FieldType::Temporal);
    }

    #[test]
    fn test_verbal_title() {
        let count = FieldDef::default().with_aggregate(AggregateOp::Count);
        assert_eq!(count.verbal_title("Count of Records"), "Count of Records");

        let mean = FieldDef::new("price", FieldType::Quantitative).with_aggregate(AggregateOp::Mean);
        assert_eq!(mean.verbal_title("Count of Records"), "Mean of price");

        let binned = FieldDef {
            bin: Some(Bin::Flag(true)),
            ..FieldDef::new("price", FieldType::Quantitative)
        };
        assert_eq!(binned.verbal_title("Count of Records"), "price (binned)");

        let monthly = FieldDef {
            time_unit: Some(TimeUnit::Unit("yearmonth".to_string())),
            ..FieldDef::new("date", FieldType::Temporal)
        };
        assert_eq!(monthly.verbal_title("Count of Records"), "date (year-month)");
    }
}
