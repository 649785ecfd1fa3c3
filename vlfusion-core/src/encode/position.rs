/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::invalid::{
    get_conditional_value_ref_for_including_invalid_value, InvalidValueRefParams,
};
use crate::encode::valueref::{
    mid_point, scaled_zero_or_min, width_height_value_or_signal_ref, MidPointParams,
};
use crate::encode::EncodeEntry;
use crate::expression::field::{field_ref, BinSuffix, FieldRefOptions};
use crate::model::UnitModel;
use crate::spec::channel::Channel;
use crate::spec::config::MarkPropOptions;
use crate::vega::mark::{MarkEncodingField, MarkEncodingOrList, MarkEncodingSpec};
use serde_json::Value;
use vlfusion_common::error::{Result, VlFusionError};

/// Position used when a position channel has no definition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionDefault {
    /// Scaled zero (or domain minimum), the plot's left or bottom edge without a scale
    ZeroOrMin,
    /// Middle of the plot
    Mid,
}

#[derive(Debug, Clone, Copy)]
pub struct PointPositionOptions<'a> {
    pub default_pos: PositionDefault,
    pub vg_channel: Option<&'a str>,
    pub band_position: Option<f64>,
}

impl<'a> PointPositionOptions<'a> {
    pub fn new(default_pos: PositionDefault) -> Self {
        Self {
            default_pos,
            vg_channel: None,
            band_position: None,
        }
    }
}

fn main_channel(channel: Channel) -> Channel {
    match channel {
        Channel::X2 => Channel::X,
        Channel::Y2 => Channel::Y,
        _ => channel,
    }
}

/// Default position reference of a channel: the mark property when set, the
/// position described by `default_pos` otherwise
fn point_position_default_ref(
    model: &UnitModel,
    channel: Channel,
    default_pos: PositionDefault,
) -> Option<MarkEncodingSpec> {
    if let Some(value) = model.get_mark_prop_or_config(channel.name(), MarkPropOptions::default())
    {
        return Some(width_height_value_or_signal_ref(channel, &value));
    }
    let main = main_channel(channel);
    match default_pos {
        PositionDefault::ZeroOrMin => {
            let scale = model.get_scale_component(main);
            match scale {
                Some(scale) => Some(scaled_zero_or_min(&scale.name, scale)),
                None if main == Channel::Y => Some(MarkEncodingSpec {
                    field: Some(MarkEncodingField::group("height")),
                    ..Default::default()
                }),
                None => Some(MarkEncodingSpec::value(Value::from(0))),
            }
        }
        PositionDefault::Mid => {
            let size = if main == Channel::Y { "height" } else { "width" };
            Some(MarkEncodingSpec {
                mult: Some(Value::from(0.5)),
                ..MarkEncodingSpec::signal(size)
            })
        }
    }
}

fn with_invalid_test(
    main_ref: Option<MarkEncodingSpec>,
    invalid_ref: Option<MarkEncodingSpec>,
) -> Option<MarkEncodingOrList> {
    match (invalid_ref, main_ref) {
        (Some(invalid_ref), Some(main_ref)) => {
            Some(MarkEncodingOrList::List(vec![invalid_ref, main_ref]))
        }
        (None, Some(main_ref)) => Some(MarkEncodingOrList::Scalar(Box::new(main_ref))),
        (_, None) => None,
    }
}

/// Encode entry for the x or y position of a mark
pub fn point_position(
    channel: Channel,
    model: &UnitModel,
    opts: PointPositionOptions,
) -> Result<EncodeEntry> {
    if !channel.is_xor_y() {
        return Err(VlFusionError::internal(format!(
            "Point position requires the x or y channel, received {}",
            channel.name()
        )));
    }
    let channel_def = model.encoding.get_def(channel);
    let channel2_def = channel
        .secondary()
        .and_then(|channel2| model.encoding.get_def(channel2));
    let scale_name = model.scale_name(channel);
    let scale = model.get_scale_component(channel);
    let default_ref = point_position_default_ref(model, channel, opts.default_pos);

    let main_ref = mid_point(&MidPointParams {
        channel: Some(channel),
        channel_def,
        channel2_def,
        scale_name: scale_name.as_deref(),
        scale,
        default_ref: default_ref.as_ref(),
        band_position: opts.band_position,
    })?;
    let invalid_ref =
        get_conditional_value_ref_for_including_invalid_value(&InvalidValueRefParams {
            scale_channel: channel,
            channel_def,
            scale_name: scale_name.as_deref(),
            scale,
            mark_def: &model.mark_def,
            config: model.config,
        })?;

    let mut entry = EncodeEntry::default();
    if let Some(value) = with_invalid_test(main_ref, invalid_ref) {
        entry
            .channels
            .insert(opts.vg_channel.unwrap_or(channel.name()).to_string(), value);
    }
    Ok(entry)
}

/// Encode entry for the x2 or y2 position of a mark. Uses the secondary
/// channel definition under the primary channel's scale, the end of a bin
/// of the primary field, or the default position.
pub fn point_position2(
    channel: Channel,
    model: &UnitModel,
    default_pos: PositionDefault,
) -> Result<EncodeEntry> {
    let base = main_channel(channel);
    if base == channel || !base.is_xor_y() {
        return Err(VlFusionError::internal(format!(
            "Secondary point position requires the x2 or y2 channel, received {}",
            channel.name()
        )));
    }
    let scale_name = model.scale_name(base);
    let scale = model.get_scale_component(base);

    let value_ref = if let Some(channel2_def) = model.encoding.get_def(channel) {
        let main_ref = mid_point(&MidPointParams {
            channel: Some(channel),
            channel_def: Some(channel2_def),
            scale_name: scale_name.as_deref(),
            scale,
            ..Default::default()
        })?;
        let invalid_ref =
            get_conditional_value_ref_for_including_invalid_value(&InvalidValueRefParams {
                scale_channel: base,
                channel_def: Some(channel2_def),
                scale_name: scale_name.as_deref(),
                scale,
                mark_def: &model.mark_def,
                config: model.config,
            })?;
        with_invalid_test(main_ref, invalid_ref)
    } else if let Some(field_def) = model
        .encoding
        .field_def(base)
        .filter(|field_def| field_def.is_binning())
    {
        let end = field_ref(field_def, &FieldRefOptions::bin_suffix(BinSuffix::End))?;
        Some(MarkEncodingOrList::Scalar(Box::new(
            MarkEncodingSpec::field(&end).with_scale(scale_name.as_deref()),
        )))
    } else {
        point_position_default_ref(model, channel, default_pos)
            .map(|default_ref| MarkEncodingOrList::Scalar(Box::new(default_ref)))
    };

    let mut entry = EncodeEntry::default();
    if let Some(value_ref) = value_ref {
        entry.channels.insert(channel.name().to_string(), value_ref);
    }
    Ok(entry)
}
