/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::field_def::FieldType;
use crate::spec::mark::Mark;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::{Display, Formatter};
use vlfusion_common::error::{Result, ResultWithContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleType {
    Linear,
    Log,
    Pow,
    Sqrt,
    Symlog,
    Identity,
    Sequential,
    Time,
    Utc,
    Quantile,
    Quantize,
    Threshold,
    BinOrdinal,
    Ordinal,
    Point,
    Band,
}

impl ScaleType {
    pub fn name(&self) -> &'static str {
        use ScaleType::*;
        match self {
            Linear => "linear",
            Log => "log",
            Pow => "pow",
            Sqrt => "sqrt",
            Symlog => "symlog",
            Identity => "identity",
            Sequential => "sequential",
            Time => "time",
            Utc => "utc",
            Quantile => "quantile",
            Quantize => "quantize",
            Threshold => "threshold",
            BinOrdinal => "bin-ordinal",
            Ordinal => "ordinal",
            Point => "point",
            Band => "band",
        }
    }

    /// Scales whose domain is a numeric or temporal interval. Invalid values
    /// cannot be mapped by these scales.
    pub fn has_continuous_domain(&self) -> bool {
        use ScaleType::*;
        matches!(
            self,
            Linear | Log | Pow | Sqrt | Symlog | Time | Utc | Quantile | Quantize | Threshold
        )
    }

    pub fn has_discrete_domain(&self) -> bool {
        matches!(
            self,
            ScaleType::Ordinal | ScaleType::Point | ScaleType::Band | ScaleType::BinOrdinal
        )
    }

    /// Scales whose domain can never include zero
    pub fn excludes_zero(&self) -> bool {
        matches!(self, ScaleType::Log | ScaleType::Time | ScaleType::Utc)
    }
}

impl Display for ScaleType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Scale bound to a channel of a unit. Scales are named after their channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleComponent {
    pub name: String,
    pub type_: ScaleType,
}

impl ScaleComponent {
    pub fn new<S: Into<String>>(name: S, type_: ScaleType) -> Self {
        Self {
            name: name.into(),
            type_,
        }
    }
}

/// Scale for a channel definition, or `None` when the channel is not
/// scaled (value definitions, `scale: null`, channels without scales).
pub fn scale_for_channel_def(
    channel: Channel,
    channel_def: &ChannelDef,
    mark: Mark,
) -> Result<Option<ScaleComponent>> {
    if !channel.is_scale_channel() {
        return Ok(None);
    }
    let (scale, field_type, is_binning, is_utc) = match channel_def {
        ChannelDef::Field(def) => (
            def.scale.as_ref(),
            def.type_,
            def.is_binning(),
            def.time_unit.as_ref().is_some_and(|tu| tu.is_utc()),
        ),
        ChannelDef::Datum(def) => (def.scale.as_ref(), def.type_, false, false),
        ChannelDef::Value(_) => return Ok(None),
    };
    let explicit_type = match scale {
        Some(Value::Null) => return Ok(None),
        Some(scale) => scale
            .get("type")
            .map(|tpe| serde_json::from_value::<ScaleType>(tpe.clone()))
            .transpose()
            .with_context(|| format!("Invalid scale type for channel {channel}"))?,
        None => None,
    };
    let Some(field_type) = field_type else {
        return Ok(None);
    };
    let type_ = match explicit_type {
        Some(type_) if scale_type_supports_field_type(type_, field_type) => type_,
        Some(type_) => {
            let fallback = default_scale_type(channel, field_type, mark, is_binning, is_utc);
            log::warn!(
                "Scale type {type_} is incompatible with {field_type:?} data on channel {channel}, using {fallback} instead"
            );
            fallback
        }
        None => default_scale_type(channel, field_type, mark, is_binning, is_utc),
    };
    Ok(Some(ScaleComponent::new(channel.name(), type_)))
}

/// Discrete data cannot be placed on a scale with a continuous domain
pub fn scale_type_supports_field_type(scale_type: ScaleType, field_type: FieldType) -> bool {
    match field_type {
        FieldType::Nominal | FieldType::Ordinal => !scale_type.has_continuous_domain(),
        FieldType::Quantitative | FieldType::Temporal => true,
    }
}

pub fn default_scale_type(
    channel: Channel,
    field_type: FieldType,
    mark: Mark,
    is_binning: bool,
    is_utc: bool,
) -> ScaleType {
    match field_type {
        FieldType::Nominal | FieldType::Ordinal => {
            if channel.is_position_scale_channel() {
                if matches!(mark, Mark::Bar | Mark::Rect | Mark::Image | Mark::Rule) {
                    ScaleType::Band
                } else {
                    ScaleType::Point
                }
            } else {
                ScaleType::Ordinal
            }
        }
        FieldType::Temporal if is_utc => ScaleType::Utc,
        FieldType::Temporal => ScaleType::Time,
        FieldType::Quantitative => {
            if is_binning && is_color_channel(channel) {
                ScaleType::BinOrdinal
            } else {
                ScaleType::Linear
            }
        }
    }
}

fn is_color_channel(channel: Channel) -> bool {
    matches!(channel, Channel::Color | Channel::Fill | Channel::Stroke)
}
