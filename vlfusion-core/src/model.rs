/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::invalid::DataSourcesForHandlingInvalidValues;
use crate::scale::{scale_for_channel_def, ScaleComponent};
use crate::spec::channel::Channel;
use crate::spec::channel_def::ChannelDef;
use crate::spec::config::{get_mark_prop_or_config, Config, MarkPropOptions};
use crate::spec::encoding::{ChannelDefOrList, Encoding};
use crate::spec::field_def::FieldDef;
use crate::spec::mark::MarkDef;
use indexmap::IndexMap;
use serde_json::Value;
use vlfusion_common::error::{Result, VlFusionError};

/// Compiled state of a unit specification with a primitive mark: its mark
/// definition, normalized encoding, config and the scales bound to its channels.
#[derive(Debug, Clone)]
pub struct UnitModel<'a> {
    pub name: String,
    pub mark_def: MarkDef,
    pub encoding: Encoding,
    pub config: &'a Config,
    scales: IndexMap<Channel, ScaleComponent>,
}

impl<'a> UnitModel<'a> {
    pub fn try_new<S: Into<String>>(
        name: S,
        mark_def: MarkDef,
        encoding: Encoding,
        config: &'a Config,
    ) -> Result<Self> {
        if mark_def.type_.is_composite() {
            return Err(VlFusionError::compilation(format!(
                "Composite mark {} must be normalized before compilation",
                mark_def.type_
            )));
        }
        let mut scales = IndexMap::new();
        for (channel, defs) in encoding.iter() {
            let ChannelDefOrList::Single(def) = defs else {
                continue;
            };
            // A value definition is scaled through the field of its condition
            let scaled_def = match def {
                ChannelDef::Value(_) => def.field_def()?.map(ChannelDef::Field),
                _ => Some(def.clone()),
            };
            let Some(scaled_def) = scaled_def else {
                continue;
            };
            if let Some(scale) = scale_for_channel_def(*channel, &scaled_def, mark_def.type_)? {
                scales.insert(*channel, scale);
            }
        }
        Ok(Self {
            name: name.into(),
            mark_def,
            encoding,
            config,
            scales,
        })
    }

    /// Fold over every field definition of the encoding, including those
    /// inside channel lists and conditions
    pub fn reduce_field_def<T, F>(&self, init: T, mut f: F) -> Result<T>
    where
        F: FnMut(T, &FieldDef, Channel) -> Result<T>,
    {
        let mut acc = init;
        for (channel, defs) in self.encoding.iter() {
            for def in defs.to_vec() {
                if let Some(field_def) = def.field_def()? {
                    acc = f(acc, &field_def, *channel)?;
                }
            }
        }
        Ok(acc)
    }

    /// Scale bound to a channel. Secondary channels share the scale of their primary.
    pub fn get_scale_component(&self, channel: Channel) -> Option<&ScaleComponent> {
        self.scales.get(&primary_channel(channel))
    }

    pub fn scale_name(&self, channel: Channel) -> Option<String> {
        self.get_scale_component(channel).map(|scale| scale.name.clone())
    }

    pub fn scales(&self) -> impl Iterator<Item = (&Channel, &ScaleComponent)> {
        self.scales.iter()
    }

    pub fn get_mark_prop_or_config(&self, prop: &str, opts: MarkPropOptions) -> Option<Value> {
        get_mark_prop_or_config(prop, &self.mark_def, self.config, opts)
    }

    /// Which data sources of this unit keep invalid values
    pub fn data_sources_for_invalid(&self) -> Result<DataSourcesForHandlingInvalidValues> {
        let invalid = self.get_mark_prop_or_config("invalid", Default::default());
        DataSourcesForHandlingInvalidValues::for_invalid(invalid.as_ref(), self.mark_def.is_path())
    }
}

fn primary_channel(channel: Channel) -> Channel {
    match channel {
        Channel::X2 => Channel::X,
        Channel::Y2 => Channel::Y,
        Channel::Theta2 => Channel::Theta,
        Channel::Radius2 => Channel::Radius,
        _ => channel,
    }
}

#[cfg(test)]
mod tests {
    use crate::model::UnitModel;
    use crate::scale::ScaleType;
    use crate::spec::channel::Channel;
    use crate::spec::config::Config;
    use crate::spec::encoding::Encoding;
    use crate::spec::mark::{Mark, MarkDef};
    use serde_json::json;

    #[test]
    fn test_scales_and_field_defs() {
        let config = Config::default();
        let encoding: Encoding = serde_json::from_value(json!({
            "x": {"field": "a", "type": "nominal"},
            "y": {"field": "b", "type": "quantitative"},
            "y2": {"field": "c"},
            "tooltip": [{"field": "d", "type": "nominal"}],
            "color": {"condition": {"test": "datum.e > 0", "field": "e", "type": "quantitative"}, "value": "red"}
        }))
        .unwrap();
        let model = UnitModel::try_new("unit", MarkDef::new(Mark::Bar), encoding, &config).unwrap();

        assert_eq!(model.get_scale_component(Channel::X).unwrap().type_, ScaleType::Band);
        assert_eq!(model.scale_name(Channel::Y2).as_deref(), Some("y"));
        assert!(model.get_scale_component(Channel::Tooltip).is_none());
        assert_eq!(
            model.get_scale_component(Channel::Color).unwrap().type_,
            ScaleType::Linear
        );

        let fields = model
            .reduce_field_def(Vec::new(), |mut acc, field_def, channel| {
                acc.push((channel, field_def.field_name().to_string()));
                Ok(acc)
            })
            .unwrap();
        assert_eq!(
            fields,
            vec![
                (Channel::X, "a".to_string()),
                (Channel::Y, "b".to_string()),
                (Channel::Y2, "c".to_string()),
                (Channel::Tooltip, "d".to_string()),
                (Channel::Color, "e".to_string()),
            ]
        );
    }

    #[test]
    fn test_composite_mark_rejected() {
        let config = Config::default();
        assert!(
            UnitModel::try_new("unit", MarkDef::new(Mark::Boxplot), Default::default(), &config)
                .is_err()
        );
    }
}
