#![allow(dead_code)]
use serde::Serialize;
use serde_json::Value;
use vlfusion_core::compile::{compile, CompileOptions, CompiledChart};
use vlfusion_core::compositemark::{normalize, Normalized};
use vlfusion_core::model::UnitModel;
use vlfusion_core::spec::config::Config;
use vlfusion_core::spec::encoding::Encoding;
use vlfusion_core::spec::mark::MarkDef;
use vlfusion_core::spec::unit::{Spec, UnitSpec};

lazy_static! {
    pub static ref DEFAULT_CONFIG: Config = Config::default();
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

pub fn parse_spec(spec: Value) -> Spec {
    serde_json::from_value(spec).unwrap()
}

pub fn normalize_spec(spec: Value) -> Normalized {
    init_logging();
    normalize(&parse_spec(spec), &DEFAULT_CONFIG).unwrap()
}

pub fn compile_spec(spec: Value) -> CompiledChart {
    init_logging();
    compile(&parse_spec(spec), &DEFAULT_CONFIG, &CompileOptions::default()).unwrap()
}

pub fn make_model(mark_def: Value, encoding: Value) -> UnitModel<'static> {
    let mark_def: MarkDef = serde_json::from_value(mark_def).unwrap();
    let encoding: Encoding = serde_json::from_value(encoding).unwrap();
    UnitModel::try_new("unit", mark_def, encoding, &DEFAULT_CONFIG).unwrap()
}

/// Unit specs of a normalized spec in drawing order
pub fn units(spec: &Spec) -> Vec<&UnitSpec> {
    match spec {
        Spec::Unit(unit) => vec![unit.as_ref()],
        Spec::Layer(layer) => layer.layer.iter().flat_map(units).collect(),
    }
}

/// Mark type, style and continuous field names of a part
pub fn part_summary(unit: &UnitSpec, channel: &str) -> (String, Value, Value, Value) {
    let mark = to_json(&unit.mark);
    let encoding = to_json(&unit.encoding);
    (
        mark["type"].as_str().unwrap().to_string(),
        mark["style"].clone(),
        encoding[channel]["field"].clone(),
        encoding[format!("{channel}2")]["field"].clone(),
    )
}

/// Update encode entry of the first compiled mark having `style`
pub fn mark_update_by_style(chart: &CompiledChart, style: &str) -> Value {
    let mark = chart
        .marks
        .iter()
        .find(|mark| {
            mark.style
                .as_ref()
                .is_some_and(|styles| styles.iter().any(|s| s == style))
        })
        .unwrap();
    to_json(mark.update_channels().unwrap())
}
