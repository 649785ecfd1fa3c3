/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::valueref::signal_or_value_ref;
use crate::encode::EncodeEntry;
use crate::expression::field::{field_ref, FieldRefOptions};
use crate::model::UnitModel;
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::encoding::ChannelDefOrList;
use crate::spec::field_def::{FieldDef, FieldType};
use crate::vega::mark::{MarkEncodingOrList, MarkEncodingSpec};
use serde_json::Value;
use vlfusion_common::error::Result;

pub const DEFAULT_TIME_FORMAT: &str = "%b %d, %Y";

/// Encode entry for the tooltip channel.
///
/// Field definitions are rendered as a signal building an object from their
/// titles to their formatted values. `tooltip: true` on the mark shows every
/// encoded field.
pub fn tooltip(model: &UnitModel) -> Result<EncodeEntry> {
    let mut entry = EncodeEntry::default();
    let value_ref = match model.encoding.get(Channel::Tooltip) {
        Some(ChannelDefOrList::Single(ChannelDef::Value(value_def))) => {
            value_def.value.as_ref().map(signal_or_value_ref)
        }
        Some(defs) => {
            let field_defs: Vec<FieldDef> = defs
                .to_vec()
                .iter()
                .filter_map(ChannelDef::as_field_def)
                .cloned()
                .collect();
            tooltip_signal(model, &field_defs)?
        }
        None => match model.mark_def.get("tooltip") {
            None | Some(Value::Null) | Some(Value::Bool(false)) => None,
            Some(Value::Bool(true)) => {
                let field_defs: Vec<FieldDef> = model
                    .encoding
                    .iter()
                    .filter(|(channel, _)| **channel != Channel::Tooltip)
                    .flat_map(|(_, defs)| defs.to_vec())
                    .filter_map(|def| def.as_field_def().cloned())
                    .collect();
                tooltip_signal(model, &field_defs)?
            }
            Some(Value::Object(content)) if content.get("content") == Some(&Value::from("data")) => {
                Some(MarkEncodingSpec::signal("datum"))
            }
            Some(value) => Some(signal_or_value_ref(value)),
        },
    };
    if let Some(value_ref) = value_ref {
        entry.channels.insert(
            "tooltip".to_string(),
            MarkEncodingOrList::Scalar(Box::new(value_ref)),
        );
    }
    Ok(entry)
}

fn tooltip_signal(model: &UnitModel, field_defs: &[FieldDef]) -> Result<Option<MarkEncodingSpec>> {
    let mut entries: Vec<String> = Vec::new();
    let mut seen: Vec<String> = Vec::new();
    for field_def in field_defs {
        let title = match &field_def.title {
            Some(Value::String(title)) => title.clone(),
            _ => field_def.verbal_title(&model.config.count_title),
        };
        if seen.contains(&title) {
            continue;
        }
        let value = format_value(field_def)?;
        entries.push(format!("{}: {value}", Value::String(title.clone())));
        seen.push(title);
    }
    if entries.is_empty() {
        return Ok(None);
    }
    Ok(Some(MarkEncodingSpec::signal(&format!(
        "{{{}}}",
        entries.join(", ")
    ))))
}

fn format_value(field_def: &FieldDef) -> Result<String> {
    let value = field_ref(field_def, &FieldRefOptions::expr("datum"))?;
    Ok(if field_def.is_for_time_format() {
        format!("timeFormat({value}, '{DEFAULT_TIME_FORMAT}')")
    } else if field_def.type_ == Some(FieldType::Quantitative) {
        format!("format({value}, \"\")")
    } else {
        format!("isValid({value}) ? {value} : \"\"+{value}")
    })
}

#[cfg(test)]
mod tests {
    use crate::encode::tooltip::tooltip;
    use crate::model::UnitModel;
    use crate::spec::config::Config;
    use crate::spec::encoding::Encoding;
    use crate::spec::mark::{Mark, MarkDef};
    use serde_json::json;

    #[test]
    fn test_tooltip_list() {
        let config = Config::default();
        let encoding: Encoding = serde_json::from_value(json!({
            "tooltip": [
                {"field": "max_b", "type": "quantitative", "title": "Max of b"},
                {"field": "a", "type": "nominal"},
                {"field": "t", "type": "temporal"}
            ]
        }))
        .unwrap();
        let model = UnitModel::try_new("unit", MarkDef::new(Mark::Bar), encoding, &config).unwrap();
        let entry = tooltip(&model).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"tooltip": {"signal": "{\"Max of b\": format(datum[\"max_b\"], \"\"), \"a\": isValid(datum[\"a\"]) ? datum[\"a\"] : \"\"+datum[\"a\"], \"t\": timeFormat(datum[\"t\"], '%b %d, %Y')}"}})
        );
    }

    #[test]
    fn test_tooltip_from_mark() {
        let config = Config::default();
        let encoding: Encoding = serde_json::from_value(json!({
            "x": {"field": "a", "type": "quantitative"}
        }))
        .unwrap();
        let mark_def = MarkDef::new(Mark::Point).with("tooltip", json!(true));
        let model = UnitModel::try_new("unit", mark_def, encoding.clone(), &config).unwrap();
        assert_eq!(
            serde_json::to_value(tooltip(&model).unwrap()).unwrap(),
            json!({"tooltip": {"signal": "{\"a\": format(datum[\"a\"], \"\")}"}})
        );

        let model = UnitModel::try_new("unit", MarkDef::new(Mark::Point), encoding, &config).unwrap();
        assert!(tooltip(&model).unwrap().channels.is_empty());
    }
}
