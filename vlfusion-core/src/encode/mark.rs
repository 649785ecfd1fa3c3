/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::nonposition::{non_position, NonPositionOptions};
use crate::encode::position::{point_position, point_position2, PointPositionOptions, PositionDefault};
use crate::encode::tooltip::tooltip;
use crate::encode::valueref::width_height_value_or_signal_ref;
use crate::encode::EncodeEntry;
use crate::expression::field::{field_ref, FieldRefOptions};
use crate::expression::predicate::{and_all, field_valid_predicate};
use crate::invalid::mode::{normalize_invalid_data_mode, ScaleInvalidDataMode};
use crate::model::UnitModel;
use crate::scale::ScaleType;
use crate::spec::channel::Channel;
use crate::spec::config::MarkPropOptions;
use crate::spec::mark::{Mark, Orient};
use crate::vega::mark::{MarkEncodingField, MarkEncodingOrList, MarkEncodingSpec};
use serde_json::Value;
use vlfusion_common::error::Result;

/// Fraction of a band covered by a tick without an explicit size
const TICK_BAND_SIZE: f64 = 0.75;

/// Tick length on a continuous or unscaled axis, 3/4 of the default step
const DEFAULT_TICK_SIZE: f64 = 15.0;

/// Marks whose color is applied to the fill unless `filled` says otherwise
fn is_filled(model: &UnitModel) -> bool {
    match model.mark_def.get("filled").and_then(Value::as_bool) {
        Some(filled) => filled,
        None => !matches!(
            model.mark_def.type_,
            Mark::Point | Mark::Line | Mark::Rule | Mark::Trail
        ),
    }
}

/// The `update` encode entry of a unit's mark
pub fn encode_mark(model: &UnitModel) -> Result<EncodeEntry> {
    let mut entry = EncodeEntry::default();
    match model.mark_def.type_ {
        Mark::Bar | Mark::Rect | Mark::Image => {
            entry.extend(rect_position(model, Channel::X)?);
            entry.extend(rect_position(model, Channel::Y)?);
        }
        Mark::Tick => entry.extend(tick_position(model)?),
        Mark::Rule => {
            entry.extend(rule_position(model, Channel::X)?);
            entry.extend(rule_position(model, Channel::Y)?);
        }
        Mark::Area => entry.extend(area_position(model)?),
        _ => {
            entry.extend(point_position(
                Channel::X,
                model,
                PointPositionOptions::new(PositionDefault::Mid),
            )?);
            entry.extend(point_position(
                Channel::Y,
                model,
                PointPositionOptions::new(PositionDefault::Mid),
            )?);
        }
    }

    entry.extend(color(model)?);
    for channel in [
        Channel::Opacity,
        Channel::FillOpacity,
        Channel::StrokeOpacity,
        Channel::StrokeWidth,
        Channel::StrokeDash,
        Channel::Angle,
    ] {
        entry.extend(non_position(channel, model, Default::default())?);
    }
    if matches!(
        model.mark_def.type_,
        Mark::Point | Mark::Circle | Mark::Square | Mark::Text
    ) {
        entry.extend(non_position(Channel::Size, model, Default::default())?);
    }
    match model.mark_def.type_ {
        Mark::Point => entry.extend(non_position(Channel::Shape, model, Default::default())?),
        Mark::Circle => entry.extend(shape_value("circle")),
        Mark::Square => entry.extend(shape_value("square")),
        Mark::Text => entry.extend(non_position(Channel::Text, model, Default::default())?),
        _ => {}
    }
    entry.extend(tooltip(model)?);
    entry.extend(defined(model)?);
    Ok(entry)
}

fn shape_value(shape: &str) -> EncodeEntry {
    let mut entry = EncodeEntry::default();
    entry.channels.insert(
        "shape".to_string(),
        MarkEncodingOrList::Scalar(Box::new(MarkEncodingSpec::value(Value::from(shape)))),
    );
    entry
}

/// Fill or stroke of the mark from the color channel, with explicit fill and
/// stroke channels taking precedence
fn color(model: &UnitModel) -> Result<EncodeEntry> {
    let vg_channel = if is_filled(model) { "fill" } else { "stroke" };
    let default_value = model
        .mark_def
        .get(vg_channel)
        .or_else(|| model.mark_def.get("color"))
        .cloned()
        .or_else(|| {
            model
                .config
                .get_mark_config("color", model.mark_def.type_.name())
        });
    let mut entry = non_position(
        Channel::Color,
        model,
        NonPositionOptions {
            default_value,
            vg_channel: Some(vg_channel),
            ..Default::default()
        },
    )?;
    if vg_channel == "stroke" && model.mark_def.type_ == Mark::Point {
        entry.channels.insert(
            "fill".to_string(),
            MarkEncodingOrList::Scalar(Box::new(MarkEncodingSpec::value(Value::from(
                "transparent",
            )))),
        );
    }
    for channel in [Channel::Fill, Channel::Stroke] {
        if model.encoding.contains(channel) {
            entry.extend(non_position(channel, model, Default::default())?);
        }
    }
    Ok(entry)
}

fn size_channel(channel: Channel) -> &'static str {
    if channel == Channel::X {
        "width"
    } else {
        "height"
    }
}

fn center_channel(channel: Channel) -> &'static str {
    if channel == Channel::X {
        "xc"
    } else {
        "yc"
    }
}

fn secondary(channel: Channel) -> Channel {
    if channel == Channel::X {
        Channel::X2
    } else {
        Channel::Y2
    }
}

fn insert(entry: &mut EncodeEntry, vg_channel: &str, value_ref: MarkEncodingSpec) {
    entry.channels.insert(
        vg_channel.to_string(),
        MarkEncodingOrList::Scalar(Box::new(value_ref)),
    );
}

/// Span of the whole plot along an axis
fn full_span(model: &UnitModel, channel: Channel) -> Result<EncodeEntry> {
    let mut entry = point_position(
        channel,
        model,
        PointPositionOptions::new(PositionDefault::ZeroOrMin),
    )?;
    let end = if channel == Channel::X {
        MarkEncodingSpec {
            field: Some(MarkEncodingField::group("width")),
            ..Default::default()
        }
    } else {
        MarkEncodingSpec::value(Value::from(0))
    };
    insert(&mut entry, secondary(channel).name(), end);
    Ok(entry)
}

/// Position and extent of a bar or rect along one axis
fn rect_position(model: &UnitModel, channel: Channel) -> Result<EncodeEntry> {
    let channel2 = secondary(channel);
    let has_def = model.encoding.contains(channel);
    let has_def2 = model.encoding.contains(channel2);
    let scale = model.get_scale_component(channel);
    let discrete = scale.is_some_and(|scale| scale.type_.has_discrete_domain());

    if has_def && discrete && !has_def2 {
        let size = model
            .get_mark_prop_or_config("size", MarkPropOptions::default())
            .or_else(|| model.get_mark_prop_or_config("discreteBandSize", MarkPropOptions::default()));
        let mut entry = EncodeEntry::default();
        match (size, scale) {
            (Some(size), _) => {
                entry.extend(point_position(
                    channel,
                    model,
                    PointPositionOptions {
                        vg_channel: Some(center_channel(channel)),
                        band_position: Some(0.5),
                        ..PointPositionOptions::new(PositionDefault::Mid)
                    },
                )?);
                insert(
                    &mut entry,
                    size_channel(channel),
                    width_height_value_or_signal_ref(channel, &size),
                );
            }
            (None, Some(scale)) if scale.type_ == ScaleType::Band => {
                entry.extend(point_position(
                    channel,
                    model,
                    PointPositionOptions {
                        band_position: Some(0.0),
                        ..PointPositionOptions::new(PositionDefault::ZeroOrMin)
                    },
                )?);
                insert(
                    &mut entry,
                    size_channel(channel),
                    MarkEncodingSpec {
                        scale: Some(scale.name.clone()),
                        band: Some(1.0),
                        ..Default::default()
                    },
                );
            }
            _ => {
                entry.extend(point_position(
                    channel,
                    model,
                    PointPositionOptions {
                        vg_channel: Some(center_channel(channel)),
                        ..PointPositionOptions::new(PositionDefault::Mid)
                    },
                )?);
                insert(
                    &mut entry,
                    size_channel(channel),
                    MarkEncodingSpec::value(Value::from(DEFAULT_TICK_SIZE)),
                );
            }
        }
        Ok(entry)
    } else if has_def || has_def2 {
        let mut entry = point_position(
            channel,
            model,
            PointPositionOptions {
                band_position: Some(0.0),
                ..PointPositionOptions::new(PositionDefault::ZeroOrMin)
            },
        )?;
        entry.extend(point_position2(channel2, model, PositionDefault::ZeroOrMin)?);
        Ok(entry)
    } else {
        full_span(model, channel)
    }
}

/// Default tick orientation: horizontal when only y is continuous
fn tick_orient(model: &UnitModel) -> Orient {
    if let Some(orient) = model.mark_def.orient() {
        return orient;
    }
    let continuous = |channel| {
        model
            .encoding
            .get_def(channel)
            .is_some_and(|def| def.is_continuous())
    };
    if continuous(Channel::Y) && !continuous(Channel::X) {
        Orient::Horizontal
    } else {
        Orient::Vertical
    }
}

fn tick_position(model: &UnitModel) -> Result<EncodeEntry> {
    let mut entry = EncodeEntry::default();
    for channel in [Channel::X, Channel::Y] {
        entry.extend(point_position(
            channel,
            model,
            PointPositionOptions {
                vg_channel: Some(center_channel(channel)),
                ..PointPositionOptions::new(PositionDefault::Mid)
            },
        )?);
    }

    // A vertical tick is thin along x and long along y
    let (thick_axis, long_axis) = match tick_orient(model) {
        Orient::Vertical => (Channel::X, Channel::Y),
        Orient::Horizontal => (Channel::Y, Channel::X),
    };
    let thickness = model
        .get_mark_prop_or_config("thickness", MarkPropOptions::default())
        .unwrap_or_else(|| Value::from(1));
    insert(
        &mut entry,
        size_channel(thick_axis),
        width_height_value_or_signal_ref(thick_axis, &thickness),
    );

    let size_ref = match model.get_mark_prop_or_config("size", MarkPropOptions::default()) {
        Some(size) => width_height_value_or_signal_ref(long_axis, &size),
        None => match model.get_scale_component(long_axis) {
            Some(scale) if scale.type_ == ScaleType::Band => MarkEncodingSpec {
                scale: Some(scale.name.clone()),
                band: Some(TICK_BAND_SIZE),
                ..Default::default()
            },
            _ => MarkEncodingSpec::value(Value::from(DEFAULT_TICK_SIZE)),
        },
    };
    insert(&mut entry, size_channel(long_axis), size_ref);
    Ok(entry)
}

/// A rule spans the whole plot along an axis without a definition, unless
/// the other axis draws a segment
fn rule_position(model: &UnitModel, channel: Channel) -> Result<EncodeEntry> {
    let channel2 = secondary(channel);
    let other2 = secondary(if channel == Channel::X {
        Channel::Y
    } else {
        Channel::X
    });
    if model.encoding.contains(channel) || model.encoding.contains(channel2) {
        let mut entry = point_position(
            channel,
            model,
            PointPositionOptions::new(PositionDefault::Mid),
        )?;
        if model.encoding.contains(channel2) {
            entry.extend(point_position2(channel2, model, PositionDefault::ZeroOrMin)?);
        }
        Ok(entry)
    } else if model.encoding.contains(other2) {
        point_position(
            channel,
            model,
            PointPositionOptions::new(PositionDefault::Mid),
        )
    } else {
        full_span(model, channel)
    }
}

/// An area grows from the baseline of its continuous axis
fn area_position(model: &UnitModel) -> Result<EncodeEntry> {
    let continuous = |channel| {
        model
            .encoding
            .get_def(channel)
            .is_some_and(|def| def.is_continuous())
    };
    let horizontal = model.mark_def.orient() == Some(Orient::Horizontal)
        || (model.mark_def.orient().is_none() && continuous(Channel::X) && !continuous(Channel::Y));
    let (base, other) = if horizontal {
        (Channel::X, Channel::Y)
    } else {
        (Channel::Y, Channel::X)
    };
    let mut entry = point_position(
        other,
        model,
        PointPositionOptions::new(PositionDefault::Mid),
    )?;
    entry.extend(point_position(
        base,
        model,
        PointPositionOptions::new(PositionDefault::ZeroOrMin),
    )?);
    entry.extend(point_position2(
        secondary(base),
        model,
        PositionDefault::ZeroOrMin,
    )?);
    Ok(entry)
}

/// `defined` entry breaking the paths of line, area and trail marks at
/// invalid values of continuous position fields
fn defined(model: &UnitModel) -> Result<EncodeEntry> {
    let mut entry = EncodeEntry::default();
    if !model.mark_def.is_path() {
        return Ok(entry);
    }
    let invalid = model.get_mark_prop_or_config("invalid", MarkPropOptions::default());
    let mode = normalize_invalid_data_mode(invalid.as_ref(), true)?;
    if !matches!(
        mode,
        ScaleInvalidDataMode::BreakPathsShowDomains | ScaleInvalidDataMode::BreakPathsFilterDomains
    ) {
        return Ok(entry);
    }
    let mut predicates: Vec<String> = Vec::new();
    for channel in [Channel::X, Channel::Y] {
        let Some(scale) = model.get_scale_component(channel) else {
            continue;
        };
        let Some(field_def) = model.encoding.field_def(channel) else {
            continue;
        };
        if !scale.type_.has_continuous_domain() {
            continue;
        }
        let field = field_ref(field_def, &FieldRefOptions::expr("datum"))?;
        let predicate = field_valid_predicate(&field, true);
        if !predicates.contains(&predicate) {
            predicates.push(predicate);
        }
    }
    if let Some(signal) = and_all(predicates) {
        insert(&mut entry, "defined", MarkEncodingSpec::signal(&signal));
    }
    Ok(entry)
}
