/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::compositemark::common::{
    composite_mark_continuous_axis, composite_mark_orient, get_composite_mark_tooltip,
    CompositePartFactory, ContinuousAxis, PartSpec, TooltipSummary,
};
use crate::compositemark::{record_warning, NormalizeWarning};
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::config::Config;
use crate::spec::encoding::{extract_transforms_from_encoding, normalize_encoding, Encoding};
use crate::spec::field_def::{AggregateOp, FieldDef, FieldType};
use crate::spec::mark::{Mark, MarkDef, Orient};
use crate::spec::transform::{AggregateTransform, AggregatedFieldDef, Transform};
use crate::spec::unit::{LayerSpec, Spec, UnitSpec};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use vlfusion_common::error::{Result, VlFusionError};
use vlfusion_common::escape::access_with_datum_to_unescaped_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBarCenter {
    Mean,
    Median,
}

impl ErrorBarCenter {
    fn op(&self) -> AggregateOp {
        match self {
            ErrorBarCenter::Mean => AggregateOp::Mean,
            ErrorBarCenter::Median => AggregateOp::Median,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            ErrorBarCenter::Mean => "Mean",
            ErrorBarCenter::Median => "Median",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorBarExtent {
    Stderr,
    Stdev,
    Ci,
    Iqr,
}

impl ErrorBarExtent {
    fn name(&self) -> &'static str {
        match self {
            ErrorBarExtent::Stderr => "stderr",
            ErrorBarExtent::Stdev => "stdev",
            ErrorBarExtent::Ci => "ci",
            ErrorBarExtent::Iqr => "iqr",
        }
    }
}

/// Shape of the data an error bar is drawn from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorBarInputType {
    /// Raw values of the continuous field, aggregated per group
    Raw,
    /// Precomputed bounds in the continuous channel and its secondary channel
    AggregatedUpperLower,
    /// A precomputed center in the continuous channel with its error in the
    /// error channels
    AggregatedError,
}

fn parse_mark_prop<T: for<'de> Deserialize<'de>>(mark_def: &MarkDef, prop: &str) -> Result<Option<T>> {
    mark_def
        .get(prop)
        .filter(|value| !value.is_null())
        .map(|value| {
            serde_json::from_value::<T>(value.clone()).map_err(|_| {
                VlFusionError::specification(format!(
                    "Invalid {prop} for {}: {value}",
                    mark_def.type_
                ))
            })
        })
        .transpose()
}

fn has_field_or_datum(encoding: &Encoding, channel: Channel) -> bool {
    matches!(
        encoding.get_def(channel),
        Some(ChannelDef::Field(_) | ChannelDef::Datum(_))
    )
}

fn is_continuous(encoding: &Encoding, channel: Channel) -> bool {
    encoding.get_def(channel).is_some_and(ChannelDef::is_continuous)
}

/// Orientation and input type of an error bar, from the channels it encodes
pub fn error_bar_orient_and_input_type(
    mark_def: &MarkDef,
    encoding: &Encoding,
) -> Result<(Orient, ErrorBarInputType)> {
    let mark = mark_def.type_;
    let has = |channel| has_field_or_datum(encoding, channel);
    let is_aggregated_upper_lower = has(Channel::X2) || has(Channel::Y2);
    let is_aggregated_error = has(Channel::XError)
        || has(Channel::XError2)
        || has(Channel::YError)
        || has(Channel::YError2);

    if (has(Channel::X) || has(Channel::Y)) && !is_aggregated_upper_lower && !is_aggregated_error
    {
        return Ok((
            composite_mark_orient(mark_def, encoding)?,
            ErrorBarInputType::Raw,
        ));
    }

    let err = |msg: String| Err(VlFusionError::specification(msg));
    if is_aggregated_upper_lower {
        if is_aggregated_error {
            return err(format!(
                "{mark} cannot be both type aggregated-upper-lower and aggregated-error"
            ));
        }
        return match (has(Channel::X2), has(Channel::Y2)) {
            (true, true) => err(format!("{mark} cannot have both x2 and y2")),
            (true, false) if is_continuous(encoding, Channel::X) => {
                Ok((Orient::Horizontal, ErrorBarInputType::AggregatedUpperLower))
            }
            (true, false) => err(format!("Both x and x2 have to be quantitative in {mark}")),
            (false, true) if is_continuous(encoding, Channel::Y) => {
                Ok((Orient::Vertical, ErrorBarInputType::AggregatedUpperLower))
            }
            (false, true) => err(format!("Both y and y2 have to be quantitative in {mark}")),
            (false, false) => err("No ranged axis".to_string()),
        };
    }

    if has(Channel::XError2) && !has(Channel::XError) {
        return err(format!("{mark} cannot have xError2 without xError"));
    }
    if has(Channel::YError2) && !has(Channel::YError) {
        return err(format!("{mark} cannot have yError2 without yError"));
    }
    match (has(Channel::XError), has(Channel::YError)) {
        (true, true) => err(format!("{mark} cannot have both xError and yError")),
        (true, false) if is_continuous(encoding, Channel::X) => {
            Ok((Orient::Horizontal, ErrorBarInputType::AggregatedError))
        }
        (true, false) => err("All x, xError, and xError2 (if exist) have to be quantitative".to_string()),
        (false, true) if is_continuous(encoding, Channel::Y) => {
            Ok((Orient::Vertical, ErrorBarInputType::AggregatedError))
        }
        (false, true) => err("All y, yError, and yError2 (if exist) have to be quantitative".to_string()),
        (false, false) => err("No ranged axis".to_string()),
    }
}

#[derive(Debug, Default)]
struct ErrorBarAggregation {
    aggregate: Vec<AggregatedFieldDef>,
    post_aggregate_calculates: Vec<Transform>,
    tooltip_summary: Vec<TooltipSummary>,
    tooltip_title_with_field_name: bool,
}

fn required_field<'a>(def: Option<&'a FieldDef>, channel: &str) -> Result<&'a str> {
    def.and_then(|def| def.field.as_deref())
        .ok_or_else(|| VlFusionError::specification(format!("Error bar requires a field for {channel}")))
}

fn datum(field: &str) -> String {
    access_with_datum_to_unescaped_path(field)
}

fn error_bar_aggregation_and_calculation(
    mark_def: &MarkDef,
    axis: &ContinuousAxis,
    input_type: ErrorBarInputType,
    config: &Config,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<ErrorBarAggregation> {
    let field = axis.field();
    let center = parse_mark_prop::<ErrorBarCenter>(mark_def, "center")?;
    let extent = parse_mark_prop::<ErrorBarExtent>(mark_def, "extent")?;

    if input_type != ErrorBarInputType::Raw {
        if center.is_some() || extent.is_some() {
            record_warning(
                warnings,
                NormalizeWarning::CenterAndExtentNotNeeded {
                    center: center.is_some(),
                    extent: extent.is_some(),
                },
            );
        }
        let calculates = match input_type {
            ErrorBarInputType::AggregatedUpperLower => {
                let field2 = required_field(axis.def2.as_ref(), "the secondary channel")?;
                vec![
                    (datum(field2), field2.to_string(), format!("upper_{field}")),
                    (datum(field), field.to_string(), format!("lower_{field}")),
                ]
            }
            _ => {
                let error = required_field(axis.error.as_ref(), "the error channel")?;
                let (lower, lower_title) = match axis.error2.as_ref() {
                    Some(error2) => {
                        let error2 = required_field(Some(error2), "the second error channel")?;
                        (
                            format!("{} + {}", datum(field), datum(error2)),
                            format!("{field} + {error2}"),
                        )
                    }
                    None => (
                        format!("{} - {}", datum(field), datum(error)),
                        format!("{field} - {error}"),
                    ),
                };
                vec![
                    (
                        format!("{} + {}", datum(field), datum(error)),
                        format!("{field} + {error}"),
                        format!("upper_{field}"),
                    ),
                    (lower, lower_title, format!("lower_{field}")),
                ]
            }
        };
        let mut tooltip_summary = match input_type {
            ErrorBarInputType::AggregatedError => vec![TooltipSummary::new("", field)],
            _ => Vec::new(),
        };
        for (_, title, as_) in &calculates {
            tooltip_summary.push(TooltipSummary::new(
                as_.chars().take(6).collect::<String>(),
                title.clone(),
            ));
        }
        return Ok(ErrorBarAggregation {
            post_aggregate_calculates: calculates
                .into_iter()
                .map(|(calculate, _, as_)| Transform::calculate(calculate, as_))
                .collect(),
            tooltip_summary,
            ..Default::default()
        });
    }

    let center = match (center, extent) {
        (Some(center), _) => center,
        (None, Some(ErrorBarExtent::Iqr)) => ErrorBarCenter::Median,
        (None, Some(_)) => ErrorBarCenter::Mean,
        (None, None) => match config.errorbar.center.as_deref() {
            None | Some("mean") => ErrorBarCenter::Mean,
            Some("median") => ErrorBarCenter::Median,
            Some(other) => {
                return Err(VlFusionError::specification(format!(
                    "Invalid errorbar center {other}"
                )))
            }
        },
    };
    let extent = match extent {
        Some(extent) => extent,
        None => match config.errorbar.extent.as_deref() {
            Some(extent) => serde_json::from_value(json!(extent)).map_err(|_| {
                VlFusionError::specification(format!("Invalid errorbar extent {extent}"))
            })?,
            None if center == ErrorBarCenter::Mean => ErrorBarExtent::Stderr,
            None => ErrorBarExtent::Iqr,
        },
    };
    if (center == ErrorBarCenter::Median) != (extent == ErrorBarExtent::Iqr) {
        record_warning(
            warnings,
            NormalizeWarning::CenterIsUsedWithWrongExtent {
                center: center.title().to_lowercase(),
                extent: extent.name().to_string(),
                mark: mark_def.type_.to_string(),
            },
        );
    }

    Ok(match extent {
        ErrorBarExtent::Stderr | ErrorBarExtent::Stdev => {
            let extent_op = if extent == ErrorBarExtent::Stderr {
                AggregateOp::Stderr
            } else {
                AggregateOp::Stdev
            };
            let center_field = datum(&format!("center_{field}"));
            let extent_field = datum(&format!("extent_{field}"));
            ErrorBarAggregation {
                aggregate: vec![
                    AggregatedFieldDef::new(extent_op, field, format!("extent_{field}")),
                    AggregatedFieldDef::new(center.op(), field, format!("center_{field}")),
                ],
                post_aggregate_calculates: vec![
                    Transform::calculate(
                        format!("{center_field} + {extent_field}"),
                        format!("upper_{field}"),
                    ),
                    Transform::calculate(
                        format!("{center_field} - {extent_field}"),
                        format!("lower_{field}"),
                    ),
                ],
                tooltip_summary: vec![
                    TooltipSummary::new("center_", center.title()),
                    TooltipSummary::new("upper_", format!("{} + {}", center.title(), extent.name())),
                    TooltipSummary::new("lower_", format!("{} - {}", center.title(), extent.name())),
                ],
                tooltip_title_with_field_name: true,
            }
        }
        ErrorBarExtent::Ci | ErrorBarExtent::Iqr => {
            let (center_op, lower_op, upper_op) = if extent == ErrorBarExtent::Ci {
                (AggregateOp::Mean, AggregateOp::Ci0, AggregateOp::Ci1)
            } else {
                (AggregateOp::Median, AggregateOp::Q1, AggregateOp::Q3)
            };
            let title = |op: AggregateOp| {
                FieldDef::new(field, FieldType::Quantitative)
                    .with_aggregate(op)
                    .verbal_title(&config.count_title)
            };
            ErrorBarAggregation {
                aggregate: vec![
                    AggregatedFieldDef::new(lower_op, field, format!("lower_{field}")),
                    AggregatedFieldDef::new(upper_op, field, format!("upper_{field}")),
                    AggregatedFieldDef::new(center_op, field, format!("center_{field}")),
                ],
                post_aggregate_calculates: Vec::new(),
                tooltip_summary: vec![
                    TooltipSummary::new("upper_", title(upper_op)),
                    TooltipSummary::new("lower_", title(lower_op)),
                    TooltipSummary::new("center_", title(center_op)),
                ],
                tooltip_title_with_field_name: false,
            }
        }
    })
}

/// Expand an error bar into tick and rule layers spanning `lower_<field>`
/// to `upper_<field>`.
pub fn normalize_errorbar(
    unit: &UnitSpec,
    config: &Config,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<Spec> {
    let encoding = normalize_encoding(&unit.encoding, warnings);
    let mark_def = unit.mark.to_mark_def();
    let mark = mark_def.type_;

    if unit.params.is_some() {
        record_warning(warnings, NormalizeWarning::SelectionNotSupported(mark.to_string()));
    }

    let (orient, input_type) = error_bar_orient_and_input_type(&mark_def, &encoding)?;
    let axis = composite_mark_continuous_axis(&encoding, orient, mark, warnings)?;
    let ErrorBarAggregation {
        aggregate,
        post_aggregate_calculates,
        tooltip_summary,
        tooltip_title_with_field_name,
    } = error_bar_aggregation_and_calculation(&mark_def, &axis, input_type, config, warnings)?;

    let extracted = extract_transforms_from_encoding(&encoding.without(&axis.channels()), config)?;
    let mut all_aggregate = extracted.aggregate;
    all_aggregate.extend(aggregate);
    let groupby = match input_type {
        ErrorBarInputType::Raw => extracted.groupby,
        _ => Vec::new(),
    };

    let tooltip = get_composite_mark_tooltip(
        &tooltip_summary,
        &axis.def,
        &extracted.encoding,
        tooltip_title_with_field_name,
    )?;

    let mut transform = unit.transform.clone();
    transform.extend(extracted.bins.into_iter().map(Transform::Bin));
    transform.extend(extracted.time_units.into_iter().map(Transform::TimeUnit));
    if !all_aggregate.is_empty() {
        transform.push(Transform::Aggregate(AggregateTransform {
            aggregate: all_aggregate,
            groupby,
        }));
    }
    transform.extend(post_aggregate_calculates);

    let factory = CompositePartFactory::new(
        &mark_def,
        &axis,
        extracted.encoding.without(&[Channel::Size]),
        &config.errorbar,
    );
    let thickness = mark_def.get("thickness").cloned();
    let tick = MarkDef::new(Mark::Tick)
        .with("orient", json!(orient.flip()))
        .with("aria", Value::Bool(false))
        .with_opt("thickness", thickness.clone())
        .with_opt("size", mark_def.get("size").cloned());
    let rule = MarkDef::new(Mark::Rule)
        .with("ariaRoleDescription", json!("errorbar"))
        .with_opt("size", thickness);

    let mut layer: Vec<Spec> = Vec::new();
    layer.extend(factory.make_part(PartSpec {
        part: "ticks",
        mark: tick.clone(),
        position_prefix: "lower",
        end_position_prefix: None,
        extra_encoding: tooltip.clone(),
    }));
    layer.extend(factory.make_part(PartSpec {
        part: "ticks",
        mark: tick,
        position_prefix: "upper",
        end_position_prefix: None,
        extra_encoding: tooltip.clone(),
    }));
    layer.extend(factory.make_part(PartSpec {
        part: "rule",
        mark: rule,
        position_prefix: "lower",
        end_position_prefix: Some("upper"),
        extra_encoding: tooltip,
    }));

    if layer.len() == 1 {
        if let Some(Spec::Unit(part)) = layer.pop() {
            return Ok(Spec::from(UnitSpec {
                transform,
                name: unit.name.clone(),
                data: unit.data.clone(),
                extra: unit.extra.clone(),
                ..*part
            }));
        }
    }
    Ok(Spec::Layer(LayerSpec {
        layer,
        encoding: Default::default(),
        transform,
        name: unit.name.clone(),
        data: unit.data.clone(),
        extra: unit.extra.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(value: Value) -> Encoding {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_input_types() {
        let mark_def = MarkDef::new(Mark::ErrorBar);
        let raw = encoding(json!({
            "x": {"field": "a", "type": "ordinal"},
            "y": {"field": "b", "type": "quantitative"}
        }));
        assert_eq!(
            error_bar_orient_and_input_type(&mark_def, &raw).unwrap(),
            (Orient::Vertical, ErrorBarInputType::Raw)
        );

        let upper_lower = encoding(json!({
            "x": {"field": "lo", "type": "quantitative"},
            "x2": {"field": "hi"},
            "y": {"field": "a", "type": "nominal"}
        }));
        assert_eq!(
            error_bar_orient_and_input_type(&mark_def, &upper_lower).unwrap(),
            (Orient::Horizontal, ErrorBarInputType::AggregatedUpperLower)
        );

        let error = encoding(json!({
            "y": {"field": "b", "type": "quantitative"},
            "yError": {"field": "err"}
        }));
        assert_eq!(
            error_bar_orient_and_input_type(&mark_def, &error).unwrap(),
            (Orient::Vertical, ErrorBarInputType::AggregatedError)
        );
    }

    #[test]
    fn test_invalid_input_types() {
        let mark_def = MarkDef::new(Mark::ErrorBar);
        for enc in [
            json!({"x": {"field": "a", "type": "quantitative"}, "x2": {"field": "b"}, "y": {"field": "c", "type": "quantitative"}, "y2": {"field": "d"}}),
            json!({"x": {"field": "a", "type": "quantitative"}, "xError": {"field": "b"}, "y": {"field": "c", "type": "quantitative"}, "yError": {"field": "d"}}),
            json!({"y": {"field": "a", "type": "quantitative"}, "yError2": {"field": "b"}}),
            json!({"y": {"field": "a", "type": "nominal"}, "y2": {"field": "b"}}),
        ] {
            assert!(matches!(
                error_bar_orient_and_input_type(&mark_def, &encoding(enc)),
                Err(VlFusionError::SpecificationError(..))
            ));
        }
    }
}
