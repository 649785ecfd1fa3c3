/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::encode::EncodeEntry;
use crate::expression::predicate::predicate_expr;
use crate::model::UnitModel;
use crate::spec::channel_def::ChannelDef;
use crate::vega::mark::{MarkEncodingOrList, MarkEncodingSpec};
use vlfusion_common::error::Result;

/// Encode entry for one output channel. The references of the channel's
/// conditions come first, then the invalid-value reference, then the main
/// reference computed by `main_ref_fn`. A single unconditional reference is
/// emitted as a scalar, anything else as a list.
pub fn wrap_condition<F>(
    model: &UnitModel,
    channel_def: Option<&ChannelDef>,
    vg_channel: &str,
    invalid_ref: Option<MarkEncodingSpec>,
    mut main_ref_fn: F,
) -> Result<EncodeEntry>
where
    F: FnMut(Option<&ChannelDef>) -> Result<Option<MarkEncodingSpec>>,
{
    let mut refs: Vec<MarkEncodingSpec> = Vec::new();

    if let Some(conditions) = channel_def.and_then(ChannelDef::condition) {
        for condition in conditions.to_vec() {
            if let Some(param) = &condition.param {
                log::warn!(
                    "Ignoring condition on parameter {param} of {vg_channel} in {}, selections are not supported",
                    model.name
                );
                continue;
            }
            let Some(test) = &condition.test else {
                continue;
            };
            let test = predicate_expr(test)?;
            let target = condition.target_def()?;
            if let Some(value_ref) = main_ref_fn(Some(&target))? {
                refs.push(value_ref.with_test(&test));
            }
        }
    }

    refs.extend(invalid_ref);

    let main_def = channel_def.map(ChannelDef::without_condition);
    if let Some(main_ref) = main_ref_fn(main_def.as_ref())? {
        refs.push(main_ref);
    }

    let mut entry = EncodeEntry::default();
    let value = match refs.len() {
        0 => return Ok(entry),
        1 if refs[0].test.is_none() => MarkEncodingOrList::Scalar(Box::new(refs.remove(0))),
        _ => MarkEncodingOrList::List(refs),
    };
    entry.channels.insert(vg_channel.to_string(), value);
    Ok(entry)
}
