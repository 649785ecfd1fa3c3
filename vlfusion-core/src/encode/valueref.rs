/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::expression::field::{field_ref, BinSuffix, FieldRefOptions};
use crate::scale::{ScaleComponent, ScaleType};
use crate::spec::channel::Channel;
use crate::spec::channel_def::{ChannelDef, ValueDef};
use crate::spec::encoding::bin_requires_range;
use crate::spec::field_def::{format_number, FieldDef};
use crate::vega::mark::{MarkEncodingField, MarkEncodingSpec};
use serde_json::Value;
use vlfusion_common::error::Result;

/// Signal reference for `{signal}` and `{expr}` objects, value reference otherwise
pub fn signal_or_value_ref(value: &Value) -> MarkEncodingSpec {
    let signal = value
        .get("signal")
        .or_else(|| value.get("expr"))
        .and_then(Value::as_str);
    match signal {
        Some(signal) => MarkEncodingSpec::signal(signal),
        None => MarkEncodingSpec::value(value.clone()),
    }
}

/// Like [`signal_or_value_ref`], with the `width` and `height` keywords of
/// position channels resolved to the enclosing group's size
pub fn width_height_value_or_signal_ref(channel: Channel, value: &Value) -> MarkEncodingSpec {
    match (channel, value.as_str()) {
        (Channel::X | Channel::X2, Some(size @ "width"))
        | (Channel::Y | Channel::Y2, Some(size @ "height")) => MarkEncodingSpec {
            field: Some(MarkEncodingField::group(size)),
            ..Default::default()
        },
        _ => signal_or_value_ref(value),
    }
}

/// Scaled zero, or the scaled domain minimum for scales that cannot contain zero
pub fn scaled_zero_or_min(scale_name: &str, scale: &ScaleComponent) -> MarkEncodingSpec {
    if scale.type_.excludes_zero() {
        MarkEncodingSpec::signal(&format!(
            "scale('{scale_name}', domain('{scale_name}')[0])"
        ))
    } else {
        MarkEncodingSpec::value(Value::from(0)).with_scale(Some(scale_name))
    }
}

/// Reference to a field or datum through a scale
pub fn field_or_datum_ref(
    channel_def: &ChannelDef,
    scale_name: Option<&str>,
    opts: &FieldRefOptions,
    band: Option<f64>,
) -> Result<Option<MarkEncodingSpec>> {
    let mut value_ref = match channel_def {
        ChannelDef::Field(field_def) => MarkEncodingSpec::field(&field_ref(field_def, opts)?),
        ChannelDef::Datum(datum_def) => signal_or_value_ref(&datum_def.datum),
        ChannelDef::Value(_) => return Ok(None),
    };
    value_ref.scale = scale_name.map(String::from);
    value_ref.band = band;
    Ok(Some(value_ref))
}

/// Start and end of a bin interval, as field names and as datum expressions
struct BinBounds {
    start: String,
    start_expr: String,
    end: String,
    end_expr: String,
}

impl BinBounds {
    fn binning(field_def: &FieldDef) -> Result<Self> {
        let end_opts = FieldRefOptions::bin_suffix(BinSuffix::End);
        Ok(Self {
            start: field_ref(field_def, &Default::default())?,
            start_expr: field_ref(field_def, &FieldRefOptions::expr("datum"))?,
            end: field_ref(field_def, &end_opts)?,
            end_expr: field_ref(
                field_def,
                &FieldRefOptions {
                    expr: Some("datum"),
                    ..end_opts
                },
            )?,
        })
    }

    fn binned(start_def: &FieldDef, end_def: &FieldDef) -> Result<Self> {
        Ok(Self {
            start: field_ref(start_def, &Default::default())?,
            start_expr: field_ref(start_def, &FieldRefOptions::expr("datum"))?,
            end: field_ref(end_def, &Default::default())?,
            end_expr: field_ref(end_def, &FieldRefOptions::expr("datum"))?,
        })
    }
}

/// Position between the bounds of a bin. Band positions 0 and 1 reference the
/// bound fields directly.
fn interpolated_signal_ref(
    scale_name: Option<&str>,
    bounds: BinBounds,
    band_position: f64,
) -> MarkEncodingSpec {
    if band_position == 0.0 || band_position == 1.0 {
        let field = if band_position == 0.0 {
            bounds.start
        } else {
            bounds.end
        };
        return MarkEncodingSpec::field(&field).with_scale(scale_name);
    }
    let datum = format!(
        "{} * {} + {} * {}",
        format_number(1.0 - band_position),
        bounds.start_expr,
        format_number(band_position),
        bounds.end_expr
    );
    match scale_name {
        Some(scale_name) => MarkEncodingSpec::signal(&format!("scale(\"{scale_name}\", {datum})")),
        None => MarkEncodingSpec::signal(&datum),
    }
}

#[derive(Debug, Clone, Default)]
pub struct MidPointParams<'a> {
    pub channel: Option<Channel>,
    pub channel_def: Option<&'a ChannelDef>,
    /// Secondary channel definition, the end of an already binned field
    pub channel2_def: Option<&'a ChannelDef>,
    pub scale_name: Option<&'a str>,
    pub scale: Option<&'a ScaleComponent>,
    pub default_ref: Option<&'a MarkEncodingSpec>,
    /// Position within a band or bin, 0.5 when unset
    pub band_position: Option<f64>,
}

/// Value reference for the middle of a channel's value: a field or datum
/// through its scale, the midpoint of a bin, a literal value or the default.
pub fn mid_point(params: &MidPointParams) -> Result<Option<MarkEncodingSpec>> {
    let scale_type = params.scale.map(|scale| scale.type_);
    let discrete = scale_type.is_some_and(|t| t.has_discrete_domain());
    let band_position = params.band_position.unwrap_or(0.5);

    match params.channel_def {
        Some(def @ ChannelDef::Field(field_def)) => {
            let bounds = if field_def.type_.is_none() {
                None
            } else if field_def.is_binning() {
                Some(BinBounds::binning(field_def)?)
            } else if field_def.bin.as_ref().is_some_and(|bin| bin.is_binned()) {
                match params.channel2_def.and_then(ChannelDef::as_field_def) {
                    Some(end_def) => Some(BinBounds::binned(field_def, end_def)?),
                    None => None,
                }
            } else {
                None
            };

            if let Some(bounds) = bounds {
                if !discrete {
                    return Ok(Some(interpolated_signal_ref(
                        params.scale_name,
                        bounds,
                        band_position,
                    )));
                }
                let requires_range = params
                    .channel
                    .is_some_and(|channel| bin_requires_range(field_def, channel));
                let opts = if requires_range {
                    FieldRefOptions::bin_suffix(BinSuffix::Range)
                } else {
                    Default::default()
                };
                return field_or_datum_ref(def, params.scale_name, &opts, None);
            }

            let opts = if discrete {
                FieldRefOptions::bin_suffix(BinSuffix::Range)
            } else {
                Default::default()
            };
            field_or_datum_ref(def, params.scale_name, &opts, band(scale_type, band_position))
        }
        Some(def @ ChannelDef::Datum(_)) => {
            field_or_datum_ref(def, params.scale_name, &Default::default(), band(scale_type, band_position))
        }
        Some(ChannelDef::Value(ValueDef {
            value: Some(value), ..
        })) => Ok(Some(match params.channel {
            Some(channel) => width_height_value_or_signal_ref(channel, value),
            None => signal_or_value_ref(value),
        })),
        _ => Ok(params.default_ref.cloned()),
    }
}

fn band(scale_type: Option<ScaleType>, band_position: f64) -> Option<f64> {
    (scale_type == Some(ScaleType::Band) && band_position != 0.0).then_some(band_position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn def(value: Value) -> ChannelDef {
        serde_json::from_value(value).unwrap()
    }

    fn to_json(value_ref: Option<MarkEncodingSpec>) -> Value {
        serde_json::to_value(value_ref).unwrap()
    }

    #[test]
    fn test_signal_or_value() {
        assert_eq!(
            to_json(Some(signal_or_value_ref(&json!({"expr": "width / 2"})))),
            json!({"signal": "width / 2"})
        );
        assert_eq!(
            to_json(Some(signal_or_value_ref(&json!("red")))),
            json!({"value": "red"})
        );
        assert_eq!(
            to_json(Some(width_height_value_or_signal_ref(Channel::Y, &json!("height")))),
            json!({"field": {"group": "height"}})
        );
    }

    #[test]
    fn test_field_through_scale() {
        let channel_def = def(json!({"field": "a", "type": "nominal"}));
        let scale = ScaleComponent::new("x", ScaleType::Band);
        let params = MidPointParams {
            channel: Some(Channel::X),
            channel_def: Some(&channel_def),
            scale_name: Some("x"),
            scale: Some(&scale),
            ..Default::default()
        };
        assert_eq!(
            to_json(mid_point(&params).unwrap()),
            json!({"field": "a", "scale": "x", "band": 0.5})
        );
    }

    #[test]
    fn test_binned_field_on_continuous_scale() {
        let channel_def = def(json!({"field": "a", "type": "quantitative", "bin": true}));
        let scale = ScaleComponent::new("x", ScaleType::Linear);
        let params = MidPointParams {
            channel: Some(Channel::X),
            channel_def: Some(&channel_def),
            scale_name: Some("x"),
            scale: Some(&scale),
            ..Default::default()
        };
        assert_eq!(
            to_json(mid_point(&params).unwrap()),
            json!({"signal": "scale(\"x\", 0.5 * datum[\"bin_maxbins_10_a\"] + 0.5 * datum[\"bin_maxbins_10_a_end\"])"})
        );

        let start = MidPointParams {
            band_position: Some(0.0),
            ..params
        };
        assert_eq!(
            to_json(mid_point(&start).unwrap()),
            json!({"field": "bin_maxbins_10_a", "scale": "x"})
        );
    }

    #[test]
    fn test_value_datum_and_default() {
        let value_def = def(json!({"value": "red"}));
        let params = MidPointParams {
            channel: Some(Channel::Color),
            channel_def: Some(&value_def),
            ..Default::default()
        };
        assert_eq!(to_json(mid_point(&params).unwrap()), json!({"value": "red"}));

        let datum_def = def(json!({"datum": 3}));
        let params = MidPointParams {
            channel: Some(Channel::Y),
            channel_def: Some(&datum_def),
            scale_name: Some("y"),
            ..Default::default()
        };
        assert_eq!(
            to_json(mid_point(&params).unwrap()),
            json!({"value": 3, "scale": "y"})
        );

        let default_ref = MarkEncodingSpec::value(json!(0));
        let params = MidPointParams {
            default_ref: Some(&default_ref),
            ..Default::default()
        };
        assert_eq!(to_json(mid_point(&params).unwrap()), json!({"value": 0}));
    }

    #[test]
    fn test_scaled_zero_or_min() {
        let linear = ScaleComponent::new("y", ScaleType::Linear);
        assert_eq!(
            to_json(Some(scaled_zero_or_min("y", &linear))),
            json!({"value": 0, "scale": "y"})
        );
        let log = ScaleComponent::new("y", ScaleType::Log);
        assert_eq!(
            to_json(Some(scaled_zero_or_min("y", &log))),
            json!({"signal": "scale('y', domain('y')[0])"})
        );
    }
}
