/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::compositemark::{record_warning, NormalizeWarning};
use crate::expression::field::field_ref;
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::config::{is_truthy, CompositePartsConfig};
use crate::spec::encoding::{ChannelDefOrList, Encoding};
use crate::spec::field_def::{Aggregate, FieldDef};
use crate::spec::mark::{Mark, MarkDef, Orient};
use crate::spec::transform::Transform;
use crate::spec::unit::{Spec, UnitSpec};
use serde_json::{Map, Value};
use vlfusion_common::error::{Result, VlFusionError};

fn is_composite_aggregate(channel_def: Option<&ChannelDef>, mark: Mark) -> bool {
    matches!(
        channel_def.and_then(ChannelDef::as_field_def).and_then(|def| def.aggregate.as_ref()),
        Some(Aggregate::Composite(composite)) if composite.name() == mark.name()
    )
}

fn is_continuous(channel_def: Option<&ChannelDef>) -> bool {
    channel_def.is_some_and(ChannelDef::is_continuous)
}

/// Orientation of a composite mark: explicit `orient`, otherwise vertical
/// when y is the (only, or aggregated) continuous axis.
pub fn composite_mark_orient(mark_def: &MarkDef, encoding: &Encoding) -> Result<Orient> {
    if let Some(orient) = mark_def.orient() {
        return Ok(orient);
    }
    let mark = mark_def.type_;
    let x = encoding.get_def(Channel::X);
    let y = encoding.get_def(Channel::Y);

    if is_continuous(x) {
        if !is_continuous(y) {
            return Ok(Orient::Horizontal);
        }
        let x_aggregate = x.and_then(ChannelDef::as_field_def).and_then(|d| d.aggregate.as_ref());
        let y_aggregate = y.and_then(ChannelDef::as_field_def).and_then(|d| d.aggregate.as_ref());
        let x_composite = is_composite_aggregate(x, mark);
        let y_composite = is_composite_aggregate(y, mark);
        Ok(if x_aggregate.is_none() && y_composite {
            Orient::Vertical
        } else if y_aggregate.is_none() && x_composite {
            Orient::Horizontal
        } else if x_composite && y_composite {
            return Err(VlFusionError::specification(
                "Both x and y cannot have aggregate",
            ));
        } else if y.is_some_and(ChannelDef::is_for_time_format)
            && !x.is_some_and(ChannelDef::is_for_time_format)
        {
            // Time is rarely the measured quantity
            Orient::Horizontal
        } else {
            Orient::Vertical
        })
    } else if is_continuous(y) {
        Ok(Orient::Vertical)
    } else {
        Err(VlFusionError::specification(format!(
            "Need a valid continuous axis for {mark}s"
        )))
    }
}

/// The continuous axis of a composite mark and its related channel definitions,
/// with any aggregate removed from them
#[derive(Debug, Clone, PartialEq)]
pub struct ContinuousAxis {
    pub channel: Channel,
    pub def: FieldDef,
    pub def2: Option<FieldDef>,
    pub error: Option<FieldDef>,
    pub error2: Option<FieldDef>,
}

impl ContinuousAxis {
    /// Name of the continuous field
    pub fn field(&self) -> &str {
        self.def.field_name()
    }

    pub fn channel2(&self) -> Channel {
        self.channel.secondary().unwrap_or(self.channel)
    }

    /// Channels that belong to the continuous axis
    pub fn channels(&self) -> Vec<Channel> {
        let mut channels = vec![self.channel, self.channel2()];
        channels.extend(self.channel.error());
        channels.extend(self.channel.error2());
        channels
    }
}

pub fn composite_mark_continuous_axis(
    encoding: &Encoding,
    orient: Orient,
    mark: Mark,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<ContinuousAxis> {
    let channel = match orient {
        Orient::Vertical => Channel::Y,
        Orient::Horizontal => Channel::X,
    };
    let mut related = |channel: Option<Channel>| {
        channel
            .and_then(|channel| encoding.field_def(channel))
            .map(|def| filter_aggregate_from_field_def(def, mark, warnings))
    };
    let def = related(Some(channel))
        .filter(|def| def.field.is_some())
        .ok_or_else(|| {
            VlFusionError::specification(format!(
                "The continuous axis {channel} of {mark} requires a field definition"
            ))
        })?;
    Ok(ContinuousAxis {
        channel,
        def,
        def2: related(channel.secondary()),
        error: related(channel.error()),
        error2: related(channel.error2()),
    })
}

fn filter_aggregate_from_field_def(
    field_def: &FieldDef,
    mark: Mark,
    warnings: &mut Vec<NormalizeWarning>,
) -> FieldDef {
    let Some(aggregate) = &field_def.aggregate else {
        return field_def.clone();
    };
    let is_mark_aggregate =
        matches!(aggregate, Aggregate::Composite(composite) if composite.name() == mark.name());
    if !is_mark_aggregate {
        let aggregate = serde_json::to_value(aggregate)
            .map(|value| value.as_str().map(String::from).unwrap_or(value.to_string()))
            .unwrap_or_default();
        record_warning(
            warnings,
            NormalizeWarning::ContinuousAxisHasCustomizedAggregate {
                aggregate,
                mark: mark.name().to_string(),
            },
        );
    }
    FieldDef {
        aggregate: None,
        ..field_def.clone()
    }
}

/// Title of the continuous axis, its explicit title or field name
pub fn get_title(field_def: &FieldDef) -> Value {
    field_def.title_or_field()
}

fn title_text(field_def: &FieldDef) -> String {
    match get_title(field_def) {
        Value::String(title) => title,
        title => title.to_string(),
    }
}

/// Split the tooltip of an encoding: tooltip fields with an aggregate stay in
/// the returned encoding, the others are returned separately to be shown on
/// raw data points.
pub fn filter_tooltip_with_aggregated_field(
    encoding: &Encoding,
) -> (Option<ChannelDefOrList>, Encoding) {
    let mut filtered = encoding.without(&[Channel::Tooltip]);
    let is_aggregated = |def: &ChannelDef| {
        def.as_field_def()
            .is_some_and(|field_def| field_def.aggregate.is_some())
    };
    match encoding.get(Channel::Tooltip) {
        None => (None, filtered),
        Some(ChannelDefOrList::Single(def)) => {
            if is_aggregated(def) {
                filtered.insert(Channel::Tooltip, def.clone());
                (None, filtered)
            } else {
                (Some(ChannelDefOrList::Single(def.clone())), filtered)
            }
        }
        Some(ChannelDefOrList::List(defs)) => {
            let (with_aggregate, mut without_aggregate): (Vec<ChannelDef>, Vec<ChannelDef>) =
                defs.iter().cloned().partition(is_aggregated);
            if !with_aggregate.is_empty() {
                filtered.insert(Channel::Tooltip, with_aggregate);
            }
            let custom = match without_aggregate.len() {
                0 => None,
                1 => without_aggregate.pop().map(ChannelDefOrList::Single),
                _ => Some(ChannelDefOrList::List(without_aggregate)),
            };
            (custom, filtered)
        }
    }
}

/// One entry of a composite mark's summary tooltip
#[derive(Debug, Clone, PartialEq)]
pub struct TooltipSummary {
    pub field_prefix: String,
    pub title_prefix: String,
}

impl TooltipSummary {
    pub fn new<S: Into<String>, T: Into<String>>(field_prefix: S, title_prefix: T) -> Self {
        Self {
            field_prefix: field_prefix.into(),
            title_prefix: title_prefix.into(),
        }
    }
}

/// Tooltip encoding of a composite mark: the user's tooltip when there is
/// one, otherwise the summary fields followed by the other encoded fields.
pub fn get_composite_mark_tooltip(
    summary: &[TooltipSummary],
    continuous_def: &FieldDef,
    encoding_without_continuous_axis: &Encoding,
    with_field_name: bool,
) -> Result<Encoding> {
    let mut encoding = Encoding::default();
    if let Some(tooltip) = encoding_without_continuous_axis.get(Channel::Tooltip) {
        encoding.insert(Channel::Tooltip, tooltip.clone());
        return Ok(encoding);
    }

    let main_title = if with_field_name {
        format!(" of {}", title_text(continuous_def))
    } else {
        String::new()
    };
    let mut tooltip: Vec<ChannelDef> = summary
        .iter()
        .map(|entry| {
            ChannelDef::Field(FieldDef {
                field: Some(format!("{}{}", entry.field_prefix, continuous_def.field_name())),
                type_: continuous_def.type_,
                title: Some(Value::String(format!("{}{main_title}", entry.title_prefix))),
                ..Default::default()
            })
        })
        .collect();

    for field_def in encoding_without_continuous_axis.field_defs() {
        let def = ChannelDef::Field(FieldDef {
            field: Some(field_ref(field_def, &Default::default())?),
            aggregate: None,
            bin: None,
            time_unit: None,
            condition: None,
            ..field_def.clone()
        });
        if !tooltip.contains(&def) {
            tooltip.push(def);
        }
    }
    encoding.insert(Channel::Tooltip, tooltip);
    Ok(encoding)
}

/// The parts of a spec that one part layer contributes
#[derive(Debug, Clone, PartialEq)]
pub struct PartBase {
    pub mark: MarkDef,
    pub encoding: Encoding,
    pub transform: Vec<Transform>,
}

/// Layer for one part of a composite mark, or `None` when the part is
/// disabled. A part property on the mark definition takes precedence over
/// the part config, and an object value is merged into the part's mark.
pub fn part_layer_mixins<C: CompositePartsConfig>(
    mark_def: &MarkDef,
    part: &str,
    config: &C,
    base: PartBase,
) -> Option<UnitSpec> {
    let part_def = mark_def.get(part);
    let enabled = match part_def {
        Some(part_def) => is_truthy(Some(part_def)),
        None => config.part_enabled(part),
    };
    if !enabled {
        return None;
    }

    let mut props = Map::new();
    if let Some(Value::Object(part_config)) = config.part(part) {
        props.extend(part_config.clone());
    }
    for prop in ["clip", "color", "opacity"] {
        if let Some(value) = mark_def.get(prop).filter(|value| is_truthy(Some(value))) {
            props.insert(prop.to_string(), value.clone());
        }
    }
    props.extend(base.mark.props);
    props.insert(
        "style".to_string(),
        Value::String(format!("{}-{part}", mark_def.type_)),
    );
    if let Some(Value::Object(part_props)) = part_def {
        props.extend(part_props.clone());
    }

    Some(UnitSpec {
        transform: base.transform,
        ..UnitSpec::new(
            MarkDef {
                type_: base.mark.type_,
                props,
            },
            base.encoding,
        )
    })
}

/// Position and mark of one part built by a [`CompositePartFactory`]
#[derive(Debug, Clone)]
pub struct PartSpec<'a> {
    pub part: &'a str,
    pub mark: MarkDef,
    /// Prefix of the aggregated field for the continuous axis
    pub position_prefix: &'a str,
    /// Prefix of the aggregated field for the secondary continuous channel
    pub end_position_prefix: Option<&'a str>,
    pub extra_encoding: Encoding,
}

/// Builds the layers of a composite mark's parts from shared context: the
/// composite mark definition, its continuous axis and the encoding shared by
/// all parts made by this factory.
#[derive(Debug, Clone)]
pub struct CompositePartFactory<'a, C: CompositePartsConfig> {
    pub mark_def: &'a MarkDef,
    pub continuous_axis: &'a ContinuousAxis,
    pub shared_encoding: Encoding,
    pub config: &'a C,
}

impl<'a, C: CompositePartsConfig> CompositePartFactory<'a, C> {
    pub fn new(
        mark_def: &'a MarkDef,
        continuous_axis: &'a ContinuousAxis,
        shared_encoding: Encoding,
        config: &'a C,
    ) -> Self {
        Self {
            mark_def,
            continuous_axis,
            shared_encoding,
            config,
        }
    }

    pub fn make_part(&self, part: PartSpec) -> Option<Spec> {
        let axis = self.continuous_axis;
        let field = axis.field();
        let mut encoding = Encoding::default();
        encoding.insert(
            axis.channel,
            FieldDef {
                field: Some(format!("{}_{field}", part.position_prefix)),
                type_: axis.def.type_,
                title: Some(get_title(&axis.def)),
                scale: axis.def.scale.clone(),
                axis: axis.def.axis.clone(),
                ..Default::default()
            },
        );
        if let Some(end_prefix) = part.end_position_prefix {
            encoding.insert(
                axis.channel2(),
                FieldDef {
                    field: Some(format!("{end_prefix}_{field}")),
                    ..Default::default()
                },
            );
        }
        let encoding = encoding
            .merged(&self.shared_encoding)
            .merged(&part.extra_encoding);

        part_layer_mixins(
            self.mark_def,
            part.part,
            self.config,
            PartBase {
                mark: part.mark,
                encoding,
                transform: Vec::new(),
            },
        )
        .map(Spec::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::config::BoxPlotConfig;
    use serde_json::json;

    fn encoding(value: Value) -> Encoding {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_orient() {
        let mark_def = MarkDef::new(Mark::Boxplot);
        let vertical = encoding(json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"field": "b", "type": "quantitative"}
        }));
        assert_eq!(composite_mark_orient(&mark_def, &vertical).unwrap(), Orient::Vertical);

        let horizontal = encoding(json!({
            "x": {"field": "b", "type": "quantitative", "aggregate": "boxplot"},
            "y": {"field": "c", "type": "quantitative"}
        }));
        assert_eq!(composite_mark_orient(&mark_def, &horizontal).unwrap(), Orient::Horizontal);

        let temporal_y = encoding(json!({
            "x": {"field": "b", "type": "quantitative"},
            "y": {"field": "d", "type": "temporal"}
        }));
        assert_eq!(composite_mark_orient(&mark_def, &temporal_y).unwrap(), Orient::Horizontal);

        let explicit = MarkDef::new(Mark::Boxplot).with("orient", json!("horizontal"));
        assert_eq!(composite_mark_orient(&explicit, &vertical).unwrap(), Orient::Horizontal);

        let discrete = encoding(json!({"x": {"field": "a", "type": "nominal"}}));
        assert!(composite_mark_orient(&mark_def, &discrete).is_err());
    }

    #[test]
    fn test_continuous_axis_aggregate_removed() {
        let mut warnings = Vec::new();
        let enc = encoding(json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"field": "b", "type": "quantitative", "aggregate": "mean"}
        }));
        let axis = composite_mark_continuous_axis(&enc, Orient::Vertical, Mark::Boxplot, &mut warnings)
            .unwrap();
        assert_eq!(axis.channel, Channel::Y);
        assert_eq!(axis.def, FieldDef::new("b", crate::spec::field_def::FieldType::Quantitative));
        assert_eq!(
            warnings,
            vec![NormalizeWarning::ContinuousAxisHasCustomizedAggregate {
                aggregate: "mean".to_string(),
                mark: "boxplot".to_string()
            }]
        );
    }

    #[test]
    fn test_filter_tooltip() {
        let enc = encoding(json!({
            "x": {"field": "a", "type": "nominal"},
            "tooltip": [
                {"field": "b", "type": "quantitative", "aggregate": "mean"},
                {"field": "c", "type": "nominal"}
            ]
        }));
        let (custom, filtered) = filter_tooltip_with_aggregated_field(&enc);
        assert_eq!(
            serde_json::to_value(custom).unwrap(),
            json!({"field": "c", "type": "nominal"})
        );
        assert_eq!(
            serde_json::to_value(filtered).unwrap(),
            json!({
                "x": {"field": "a", "type": "nominal"},
                "tooltip": [{"field": "b", "type": "quantitative", "aggregate": "mean"}]
            })
        );
    }

    #[test]
    fn test_part_layer_mixins() {
        let config = BoxPlotConfig::default();
        let mark_def = MarkDef::new(Mark::Boxplot)
            .with("color", json!("red"))
            .with("median", json!({"color": "black"}))
            .with("outliers", json!(false));
        let base = PartBase {
            mark: MarkDef::new(Mark::Tick).with("orient", json!("horizontal")),
            encoding: Default::default(),
            transform: Vec::new(),
        };

        let median = part_layer_mixins(&mark_def, "median", &config, base.clone()).unwrap();
        assert_eq!(
            serde_json::to_value(&median.mark).unwrap(),
            json!({"type": "tick", "color": "black", "orient": "horizontal", "style": "boxplot-median"})
        );
        assert!(part_layer_mixins(&mark_def, "outliers", &config, base).is_none());
    }
}
