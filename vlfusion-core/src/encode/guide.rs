/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::conditional::wrap_condition;
use crate::encode::valueref::signal_or_value_ref;
use crate::encode::EncodeEntry;
use crate::model::UnitModel;
use crate::spec::channel_def::{ChannelDef, ValueDef};
use crate::spec::encoding::{ChannelDefOrList, Encoding};
use vlfusion_common::error::Result;

/// Encode entry of an axis or legend part. Every channel holds a value
/// definition, possibly conditional.
pub fn guide_encode_entry(encoding: &Encoding, model: &UnitModel) -> Result<EncodeEntry> {
    let mut entry = EncodeEntry::default();
    for (channel, defs) in encoding.iter() {
        let ChannelDefOrList::Single(def) = defs else {
            continue;
        };
        let channel_entry = wrap_condition(model, Some(def), channel.name(), None, |def| {
            Ok(match def {
                Some(ChannelDef::Value(ValueDef {
                    value: Some(value), ..
                })) => Some(signal_or_value_ref(value)),
                _ => None,
            })
        })?;
        entry.extend(channel_entry);
    }
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use crate::encode::guide::guide_encode_entry;
    use crate::model::UnitModel;
    use crate::spec::config::Config;
    use crate::spec::encoding::Encoding;
    use crate::spec::mark::{Mark, MarkDef};
    use serde_json::json;

    #[test]
    fn test_guide_encode_entry() {
        let config = Config::default();
        let model =
            UnitModel::try_new("unit", MarkDef::new(Mark::Point), Default::default(), &config)
                .unwrap();
        let encoding: Encoding = serde_json::from_value(json!({
            "opacity": {"condition": {"test": "datum.value > 0", "value": 1}, "value": 0.5},
            "stroke": {"value": {"signal": "strokeColor"}}
        }))
        .unwrap();
        let entry = guide_encode_entry(&encoding, &model).unwrap();
        assert_eq!(
            serde_json::to_value(entry).unwrap(),
            json!({
                "opacity": [{"test": "datum.value > 0", "value": 1}, {"value": 0.5}],
                "stroke": {"signal": "strokeColor"}
            })
        );
    }
}
