/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::valueref::{scaled_zero_or_min, signal_or_value_ref};
use crate::expression::field::{field_ref, FieldRefOptions};
use crate::expression::predicate::field_valid_predicate;
use crate::invalid::{get_scale_invalid_data_mode, ScaleInvalidDataMode, ScaleInvalidDataModeParams};
use crate::scale::ScaleComponent;
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::config::{Config, ScaleInvalidOutput};
use crate::spec::mark::MarkDef;
use crate::vega::mark::MarkEncodingSpec;
use vlfusion_common::error::Result;

#[derive(Debug, Clone, Copy)]
pub struct InvalidValueRefParams<'a> {
    pub scale_channel: Channel,
    pub channel_def: Option<&'a ChannelDef>,
    pub scale_name: Option<&'a str>,
    pub scale: Option<&'a ScaleComponent>,
    pub mark_def: &'a MarkDef,
    pub config: &'a Config,
}

/// Conditional reference that draws invalid values of a field at the
/// configured output (`config.scale.invalid`), or at the scaled zero/minimum.
/// Only produced when the scale shows invalid values.
pub fn get_conditional_value_ref_for_including_invalid_value(
    params: &InvalidValueRefParams,
) -> Result<Option<MarkEncodingSpec>> {
    let field_def = match params.channel_def {
        Some(def) => def.field_def()?,
        None => None,
    };
    let Some(field_def) = field_def else {
        return Ok(None);
    };

    let mode = get_scale_invalid_data_mode(ScaleInvalidDataModeParams {
        scale_channel: params.scale_channel,
        mark_def: params.mark_def,
        config: params.config,
        scale_type: params.scale.map(|scale| scale.type_),
        is_count_aggregate: field_def.is_counting_aggregate(),
    })?;
    if mode != ScaleInvalidDataMode::Show {
        return Ok(None);
    }

    let include_as = match params.config.scale.invalid_output(params.scale_channel) {
        Some(ScaleInvalidOutput::Signal { signal }) => MarkEncodingSpec::signal(signal),
        Some(ScaleInvalidOutput::Value { value }) => signal_or_value_ref(value),
        None => match (params.scale_name, params.scale) {
            (Some(scale_name), Some(scale)) => scaled_zero_or_min(scale_name, scale),
            _ => return Ok(None),
        },
    };
    let field = field_ref(&field_def, &FieldRefOptions::expr("datum"))?;
    Ok(Some(include_as.with_test(&field_valid_predicate(&field, false))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleType;
    use crate::spec::mark::Mark;
    use serde_json::{json, Value};

    fn invalid_ref(mark_def: &MarkDef, config: &Config) -> Option<Value> {
        let channel_def: ChannelDef =
            serde_json::from_value(json!({"field": "a", "type": "quantitative"})).unwrap();
        let scale = ScaleComponent::new("size", ScaleType::Linear);
        get_conditional_value_ref_for_including_invalid_value(&InvalidValueRefParams {
            scale_channel: Channel::Size,
            channel_def: Some(&channel_def),
            scale_name: Some("size"),
            scale: Some(&scale),
            mark_def,
            config,
        })
        .unwrap()
        .map(|value_ref| serde_json::to_value(value_ref).unwrap())
    }

    #[test]
    fn test_only_when_showing_invalid_values() {
        let config = Config::default();
        assert_eq!(invalid_ref(&MarkDef::new(Mark::Point), &config), None);

        let show = MarkDef::new(Mark::Point).with("invalid", Value::Null);
        assert_eq!(
            invalid_ref(&show, &config),
            Some(json!({
                "test": "!isValid(datum[\"a\"]) || !isFinite(+datum[\"a\"])",
                "scale": "size",
                "value": 0
            }))
        );
    }

    #[test]
    fn test_configured_output() {
        let config: Config =
            serde_json::from_value(json!({"scale": {"invalid": {"size": {"value": 3}}}})).unwrap();
        assert_eq!(
            invalid_ref(&MarkDef::new(Mark::Point), &config),
            Some(json!({
                "test": "!isValid(datum[\"a\"]) || !isFinite(+datum[\"a\"])",
                "value": 3
            }))
        );
    }
}
