/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::conditional::wrap_condition;
use crate::encode::invalid::{
    get_conditional_value_ref_for_including_invalid_value, InvalidValueRefParams,
};
use crate::encode::valueref::{mid_point, signal_or_value_ref, MidPointParams};
use crate::encode::EncodeEntry;
use crate::model::UnitModel;
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::config::MarkPropOptions;
use crate::vega::mark::MarkEncodingSpec;
use serde_json::Value;
use vlfusion_common::error::Result;

#[derive(Debug, Clone, Default)]
pub struct NonPositionOptions<'a> {
    /// Reference used when the channel has no definition
    pub default_ref: Option<MarkEncodingSpec>,
    /// Value used when the channel has no definition and no default reference is given.
    /// Looked up on the mark and config when unset.
    pub default_value: Option<Value>,
    /// Output channel name, the encoding channel name when unset
    pub vg_channel: Option<&'a str>,
}

/// Encode entry of a non-position channel such as color, opacity, size or shape
pub fn non_position(
    channel: Channel,
    model: &UnitModel,
    opts: NonPositionOptions,
) -> Result<EncodeEntry> {
    let NonPositionOptions {
        mut default_ref,
        default_value,
        vg_channel,
    } = opts;
    let channel_def = model.encoding.get_def(channel);

    if default_ref.is_none() {
        let default_value = default_value.or_else(|| {
            model.get_mark_prop_or_config(
                channel.name(),
                MarkPropOptions {
                    vg_channel,
                    ignore_vg_config: !channel_def.is_some_and(ChannelDef::is_conditional),
                },
            )
        });
        default_ref = default_value.as_ref().map(signal_or_value_ref);
    }

    let scale_name = model.scale_name(channel);
    let scale = model.get_scale_component(channel);

    let invalid_ref =
        get_conditional_value_ref_for_including_invalid_value(&InvalidValueRefParams {
            scale_channel: channel,
            channel_def,
            scale_name: scale_name.as_deref(),
            scale,
            mark_def: &model.mark_def,
            config: model.config,
        })?;

    let main_ref_fn = |def: Option<&ChannelDef>| {
        mid_point(&MidPointParams {
            channel: Some(channel),
            channel_def: def,
            scale_name: scale_name.as_deref(),
            scale,
            default_ref: default_ref.as_ref(),
            ..Default::default()
        })
    };

    wrap_condition(
        model,
        channel_def,
        vg_channel.unwrap_or(channel.name()),
        invalid_ref,
        main_ref_fn,
    )
}

#[cfg(test)]
mod tests {
    use crate::encode::nonposition::{non_position, NonPositionOptions};
    use crate::model::UnitModel;
    use crate::spec::channel::Channel;
    use crate::spec::config::Config;
    use crate::spec::encoding::Encoding;
    use crate::spec::mark::{Mark, MarkDef};
    use serde_json::{json, Value};

    fn encode(channel: Channel, mark_def: MarkDef, encoding: Value, config: &Config) -> Value {
        let encoding: Encoding = serde_json::from_value(encoding).unwrap();
        let model = UnitModel::try_new("unit", mark_def, encoding, config).unwrap();
        serde_json::to_value(non_position(channel, &model, Default::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_field_through_scale() {
        let config = Config::default();
        assert_eq!(
            encode(
                Channel::Size,
                MarkDef::new(Mark::Point),
                json!({"size": {"field": "a", "type": "quantitative"}}),
                &config
            ),
            json!({"size": {"field": "a", "scale": "size"}})
        );
    }

    #[test]
    fn test_default_from_mark() {
        let config = Config::default();
        assert_eq!(
            encode(
                Channel::Opacity,
                MarkDef::new(Mark::Point).with("opacity", json!(0.3)),
                json!({}),
                &config
            ),
            json!({"opacity": {"value": 0.3}})
        );
        // Config values are applied by the renderer through the mark style
        assert_eq!(
            encode(Channel::Opacity, MarkDef::new(Mark::Point), json!({}), &config),
            json!({})
        );
    }

    #[test]
    fn test_condition_with_config_default() {
        let config: Config =
            serde_json::from_value(json!({"point": {"opacity": 0.7}})).unwrap();
        assert_eq!(
            encode(
                Channel::Opacity,
                MarkDef::new(Mark::Point),
                json!({"opacity": {"condition": {"test": "datum.a > 1", "value": 1}}}),
                &config
            ),
            json!({"opacity": [
                {"test": "datum.a > 1", "value": 1},
                {"value": 0.7}
            ]})
        );
    }

    #[test]
    fn test_invalid_values_shown() {
        let config = Config::default();
        assert_eq!(
            encode(
                Channel::Size,
                MarkDef::new(Mark::Point).with("invalid", Value::Null),
                json!({"size": {"field": "a", "type": "quantitative"}}),
                &config
            ),
            json!({"size": [
                {"test": "!isValid(datum[\"a\"]) || !isFinite(+datum[\"a\"])", "scale": "size", "value": 0},
                {"field": "a", "scale": "size"}
            ]})
        );
    }

    #[test]
    fn test_vg_channel() {
        let config = Config::default();
        let encoding: Encoding =
            serde_json::from_value(json!({"color": {"value": "red"}})).unwrap();
        let model =
            UnitModel::try_new("unit", MarkDef::new(Mark::Point), encoding, &config).unwrap();
        let entry = non_position(
            Channel::Color,
            &model,
            NonPositionOptions {
                vg_channel: Some("fill"),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(serde_json::to_value(entry).unwrap(), json!({"fill": {"value": "red"}}));
    }
}
