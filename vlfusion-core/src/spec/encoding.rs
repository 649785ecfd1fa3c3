/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::compositemark::{record_warning, NormalizeWarning};
use crate::expression::field::{field_ref, BinSuffix, FieldRefOptions};
use crate::spec::channel::Channel;
use crate::spec::channel_def::{ChannelDef, DatumDef};
use crate::spec::config::Config;
use crate::spec::field_def::{
    default_type, Aggregate, AggregateOp, ArgAggregate, Bin, BinnedToken, FieldDef, FieldType,
};
use crate::spec::transform::{AggregatedFieldDef, BinAs, BinTransform, TimeUnitTransform};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use vlfusion_common::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelDefOrList {
    List(Vec<ChannelDef>),
    Single(ChannelDef),
}

impl ChannelDefOrList {
    pub fn to_vec(&self) -> Vec<ChannelDef> {
        match self {
            ChannelDefOrList::List(defs) => defs.clone(),
            ChannelDefOrList::Single(def) => vec![def.clone()],
        }
    }

    pub fn as_single(&self) -> Option<&ChannelDef> {
        match self {
            ChannelDefOrList::Single(def) => Some(def),
            ChannelDefOrList::List(_) => None,
        }
    }
}

impl From<ChannelDef> for ChannelDefOrList {
    fn from(def: ChannelDef) -> Self {
        ChannelDefOrList::Single(def)
    }
}

impl From<FieldDef> for ChannelDefOrList {
    fn from(def: FieldDef) -> Self {
        ChannelDefOrList::Single(ChannelDef::Field(def))
    }
}

impl From<Vec<ChannelDef>> for ChannelDefOrList {
    fn from(defs: Vec<ChannelDef>) -> Self {
        ChannelDefOrList::List(defs)
    }
}

/// Mapping from encoding channel to channel definition(s), in spec order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Encoding {
    pub channels: IndexMap<Channel, ChannelDefOrList>,
}

impl Encoding {
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn contains(&self, channel: Channel) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn get(&self, channel: Channel) -> Option<&ChannelDefOrList> {
        self.channels.get(&channel)
    }

    /// Channel definition of a channel that holds a single definition
    pub fn get_def(&self, channel: Channel) -> Option<&ChannelDef> {
        self.get(channel).and_then(ChannelDefOrList::as_single)
    }

    pub fn field_def(&self, channel: Channel) -> Option<&FieldDef> {
        self.get_def(channel).and_then(ChannelDef::as_field_def)
    }

    /// Insert or replace a channel. A replaced channel keeps its position.
    pub fn insert<D: Into<ChannelDefOrList>>(&mut self, channel: Channel, def: D) {
        self.channels.insert(channel, def.into());
    }

    pub fn remove(&mut self, channel: Channel) -> Option<ChannelDefOrList> {
        self.channels.shift_remove(&channel)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Channel, &ChannelDefOrList)> {
        self.channels.iter()
    }

    /// Copy of the encoding without the given channels
    pub fn without(&self, channels: &[Channel]) -> Encoding {
        Encoding {
            channels: self
                .channels
                .iter()
                .filter(|(channel, _)| !channels.contains(channel))
                .map(|(channel, def)| (*channel, def.clone()))
                .collect(),
        }
    }

    /// Copy of the encoding with the channels of `other` added on top
    pub fn merged(&self, other: &Encoding) -> Encoding {
        let mut merged = self.clone();
        for (channel, def) in other.iter() {
            merged.channels.insert(*channel, def.clone());
        }
        merged
    }

    /// All field definitions, including those in channel lists
    pub fn field_defs(&self) -> Vec<&FieldDef> {
        self.channels
            .values()
            .flat_map(|defs| match defs {
                ChannelDefOrList::Single(def) => vec![def],
                ChannelDefOrList::List(defs) => defs.iter().collect(),
            })
            .filter_map(ChannelDef::as_field_def)
            .collect()
    }
}

impl FromIterator<(Channel, ChannelDefOrList)> for Encoding {
    fn from_iter<T: IntoIterator<Item = (Channel, ChannelDefOrList)>>(iter: T) -> Self {
        Encoding {
            channels: iter.into_iter().collect(),
        }
    }
}

/// Channels whose field definitions stay untyped, they borrow the type of
/// their primary channel
fn is_untyped_channel(channel: Channel) -> bool {
    channel.is_secondary_range_channel()
        || matches!(
            channel,
            Channel::XError | Channel::XError2 | Channel::YError | Channel::YError2
        )
}

/// Resolve shorthand in an encoding: infer missing field types and drop
/// channel definitions that cannot be encoded, recording a warning for each.
pub fn normalize_encoding(encoding: &Encoding, warnings: &mut Vec<NormalizeWarning>) -> Encoding {
    let mut normalized = Encoding::default();
    for (channel, defs) in encoding.iter() {
        let channel = *channel;
        match defs {
            ChannelDefOrList::List(defs) if !channel.supports_array() => {
                record_warning(warnings, NormalizeWarning::ListNotSupported(channel));
                // Keep the first definition, as a renderer would
                if let Some(def) = defs.first() {
                    if let Some(def) = normalize_channel_def(channel, def, warnings) {
                        normalized.insert(channel, def);
                    }
                }
            }
            ChannelDefOrList::List(defs) => {
                let defs: Vec<ChannelDef> = defs
                    .iter()
                    .filter_map(|def| normalize_channel_def(channel, def, warnings))
                    .collect();
                if !defs.is_empty() {
                    normalized.insert(channel, defs);
                }
            }
            ChannelDefOrList::Single(def) => {
                if let Some(def) = normalize_channel_def(channel, def, warnings) {
                    normalized.insert(channel, def);
                }
            }
        }
    }
    normalized
}

fn normalize_channel_def(
    channel: Channel,
    def: &ChannelDef,
    warnings: &mut Vec<NormalizeWarning>,
) -> Option<ChannelDef> {
    match def {
        ChannelDef::Field(field_def) => {
            if field_def.field.is_none() && !field_def.is_count() {
                record_warning(warnings, NormalizeWarning::EmptyFieldDef(channel));
                return None;
            }
            let mut field_def = field_def.clone();
            if field_def.type_.is_none() && !is_untyped_channel(channel) {
                field_def.type_ = Some(default_type(&field_def, channel));
            }
            Some(ChannelDef::Field(field_def))
        }
        ChannelDef::Datum(datum_def) => {
            let mut datum_def = datum_def.clone();
            if datum_def.type_.is_none() && !is_untyped_channel(channel) {
                datum_def.type_ = Some(default_datum_type(&datum_def));
            }
            Some(ChannelDef::Datum(datum_def))
        }
        ChannelDef::Value(_) => Some(def.clone()),
    }
}

fn default_datum_type(datum_def: &DatumDef) -> FieldType {
    match &datum_def.datum {
        Value::Number(_) => FieldType::Quantitative,
        Value::Object(obj) if obj.contains_key("year") || obj.contains_key("date") => {
            FieldType::Temporal
        }
        _ => FieldType::Nominal,
    }
}

/// Transforms implied by the aggregate/bin/time unit properties of an
/// encoding, with the encoding rewritten to reference the derived fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedTransforms {
    pub bins: Vec<BinTransform>,
    pub time_units: Vec<TimeUnitTransform>,
    pub aggregate: Vec<AggregatedFieldDef>,
    pub groupby: Vec<String>,
    pub encoding: Encoding,
}

/// Pull bins, time units and aggregates out of an encoding so that they can be
/// computed by explicit transforms. Channels without an aggregate become
/// grouping fields.
pub fn extract_transforms_from_encoding(
    encoding: &Encoding,
    config: &Config,
) -> Result<ExtractedTransforms> {
    let mut extracted = ExtractedTransforms::default();

    for (channel, defs) in encoding.iter() {
        let channel = *channel;
        let mut new_defs: Vec<ChannelDef> = Vec::new();
        for def in defs.to_vec() {
            let new_def = match def {
                ChannelDef::Field(field_def) => {
                    extract_field_def(channel, &field_def, config, &mut extracted)?
                }
                other => other,
            };
            new_defs.push(new_def);
        }
        match defs {
            ChannelDefOrList::List(_) => extracted.encoding.insert(channel, new_defs),
            ChannelDefOrList::Single(_) => {
                if let Some(def) = new_defs.pop() {
                    extracted.encoding.insert(channel, def)
                }
            }
        }
    }

    Ok(extracted)
}

fn push_groupby(groupby: &mut Vec<String>, field: String) {
    if !groupby.contains(&field) {
        groupby.push(field);
    }
}

fn extract_field_def(
    channel: Channel,
    field_def: &FieldDef,
    config: &Config,
    extracted: &mut ExtractedTransforms,
) -> Result<ChannelDef> {
    let has_time_unit = field_def.time_unit.is_some();
    let has_bin = field_def.bin.is_some();
    if field_def.aggregate.is_none() && !has_time_unit && !has_bin {
        if let Some(field) = &field_def.field {
            push_groupby(&mut extracted.groupby, field.clone());
        }
        return Ok(ChannelDef::Field(field_def.clone()));
    }

    let mut new_field = field_ref(field_def, &FieldRefOptions::for_as())?;
    let mut new_def = FieldDef {
        field: None,
        aggregate: None,
        bin: None,
        time_unit: None,
        ..field_def.clone()
    };
    if field_def.title.is_none() && !guide_has_title(field_def, channel) {
        new_def.title = Some(Value::String(field_def.verbal_title(&config.count_title)));
    }

    if let Some(aggregate) = &field_def.aggregate {
        let aggregated = match aggregate {
            Aggregate::Arg(arg_aggregate) => {
                let (op, arg) = match arg_aggregate {
                    ArgAggregate::Argmax(arg) => (AggregateOp::Argmax, arg),
                    ArgAggregate::Argmin(arg) => (AggregateOp::Argmin, arg),
                };
                new_field = format!("{}_{arg}", op.name());
                new_def.field = Some(format!("{new_field}.{}", field_def.field_name()));
                Some((op, Some(arg.clone())))
            }
            Aggregate::Op(op) => Some((*op, field_def.field.clone())),
            Aggregate::Composite(_) => None,
        };
        if let Some((op, field)) = aggregated {
            extracted.aggregate.push(AggregatedFieldDef {
                op,
                field,
                as_: new_field.clone(),
            });
        }
        if new_def.field.is_none() {
            new_def.field = Some(new_field);
        }
        return Ok(ChannelDef::Field(new_def));
    }

    new_def.field = Some(new_field.clone());
    push_groupby(&mut extracted.groupby, new_field.clone());

    match (&field_def.bin, &field_def.time_unit) {
        (Some(bin), _) if bin.is_binning() => {
            extracted.bins.push(BinTransform {
                bin: bin.clone(),
                field: field_def.field_name().to_string(),
                as_: BinAs::Single(new_field.clone()),
            });
            push_groupby(
                &mut extracted.groupby,
                field_ref(field_def, &FieldRefOptions::bin_suffix(BinSuffix::End))?,
            );
            if bin_requires_range(field_def, channel) {
                push_groupby(
                    &mut extracted.groupby,
                    field_ref(field_def, &FieldRefOptions::bin_suffix(BinSuffix::Range))?,
                );
            }
            if channel.is_xor_y() {
                if let Some(secondary) = channel.secondary() {
                    extracted.encoding.insert(
                        secondary,
                        FieldDef {
                            field: Some(format!("{new_field}_end")),
                            ..Default::default()
                        },
                    );
                }
            }
            new_def.bin = Some(Bin::Binned(BinnedToken::Binned));
            if !channel.is_secondary_range_channel() {
                new_def.type_ = Some(FieldType::Quantitative);
            }
        }
        (_, Some(time_unit)) if !time_unit.is_binned() => {
            extracted.time_units.push(TimeUnitTransform {
                time_unit: time_unit.clone(),
                field: field_def.field_name().to_string(),
                as_: new_field,
            });
            if field_def.type_.is_some() && field_def.type_ != Some(FieldType::Temporal) {
                add_time_format_type(&mut new_def, channel);
            }
        }
        _ => {}
    }

    Ok(ChannelDef::Field(new_def))
}

/// Whether the title of the field's guide is set explicitly
fn guide_has_title(field_def: &FieldDef, channel: Channel) -> bool {
    let guide = if channel.is_position_scale_channel() {
        field_def.axis.as_ref()
    } else {
        field_def.legend.as_ref()
    };
    guide
        .and_then(|guide| guide.get("title"))
        .is_some_and(|title| !title.is_null())
}

/// Binned discrete fields need both bin bounds to label their range
pub fn bin_requires_range(field_def: &FieldDef, channel: Channel) -> bool {
    channel.is_scale_channel()
        && matches!(
            field_def.type_,
            Some(FieldType::Ordinal) | Some(FieldType::Nominal)
        )
}

fn add_time_format_type(field_def: &mut FieldDef, channel: Channel) {
    if matches!(channel, Channel::Text | Channel::Tooltip) {
        field_def
            .extra
            .insert("formatType".to_string(), json!("time"));
        return;
    }
    let guide = if channel.is_non_position_scale_channel() {
        &mut field_def.legend
    } else if channel.is_xor_y() {
        &mut field_def.axis
    } else {
        return;
    };
    let mut props = match guide.take() {
        Some(Value::Object(props)) => props,
        _ => Map::new(),
    };
    props.entry("formatType").or_insert_with(|| json!("time"));
    *guide = Some(Value::Object(props));
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn encoding(value: Value) -> Encoding {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_infers_types_and_drops_empty() {
        let mut warnings = Vec::new();
        let normalized = normalize_encoding(
            &encoding(json!({
                "x": {"field": "a"},
                "x2": {"field": "b"},
                "color": {"field": "c"},
                "size": {"aggregate": "mean"}
            })),
            &mut warnings,
        );
        assert_eq!(
            normalized.field_def(Channel::X).unwrap().type_,
            Some(FieldType::Quantitative)
        );
        assert_eq!(normalized.field_def(Channel::X2).unwrap().type_, None);
        assert_eq!(
            normalized.field_def(Channel::Color).unwrap().type_,
            Some(FieldType::Nominal)
        );
        assert!(!normalized.contains(Channel::Size));
        assert_eq!(warnings, vec![NormalizeWarning::EmptyFieldDef(Channel::Size)]);
    }

    #[test]
    fn test_extract_aggregate_and_groupby() {
        let extracted = extract_transforms_from_encoding(
            &encoding(json!({
                "x": {"field": "category", "type": "nominal"},
                "color": {"field": "price", "type": "quantitative", "aggregate": "mean"}
            })),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(extracted.groupby, vec!["category"]);
        assert_eq!(
            extracted.aggregate,
            vec![AggregatedFieldDef::new(
                AggregateOp::Mean,
                "price",
                "mean_price"
            )]
        );
        let color = extracted.encoding.field_def(Channel::Color).unwrap();
        assert_eq!(color.field.as_deref(), Some("mean_price"));
        assert_eq!(color.aggregate, None);
        assert_eq!(color.title, Some(json!("Mean of price")));
    }

    #[test]
    fn test_extract_bin_on_x_adds_secondary() {
        let extracted = extract_transforms_from_encoding(
            &encoding(json!({
                "x": {"field": "a", "type": "quantitative", "bin": true}
            })),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(extracted.bins.len(), 1);
        assert_eq!(
            extracted.groupby,
            vec!["bin_maxbins_10_a", "bin_maxbins_10_a_end"]
        );
        let x2 = extracted.encoding.field_def(Channel::X2).unwrap();
        assert_eq!(x2.field.as_deref(), Some("bin_maxbins_10_a_end"));
        let x = extracted.encoding.field_def(Channel::X).unwrap();
        assert!(x.bin.as_ref().is_some_and(|b| b.is_binned()));
    }

    #[test]
    fn test_extract_time_unit() {
        let extracted = extract_transforms_from_encoding(
            &encoding(json!({
                "color": {"field": "d", "type": "ordinal", "timeUnit": "month"}
            })),
            &Config::default(),
        )
        .unwrap();
        assert_eq!(extracted.time_units[0].as_, "month_d");
        let color = extracted.encoding.field_def(Channel::Color).unwrap();
        assert_eq!(color.legend, Some(json!({"formatType": "time"})));
    }
}
