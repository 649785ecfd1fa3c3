/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::scale::ScaleType;
use crate::spec::channel::Channel;
use crate::spec::config::{get_mark_prop_or_config, Config};
use crate::spec::mark::MarkDef;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vlfusion_common::error::{Result, VlFusionError};

/// How a mark treats invalid (null, NaN or infinite) values, as written in
/// the `invalid` mark property
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarkInvalidDataMode {
    Filter,
    BreakPathsFilterDomains,
    BreakPathsShowDomains,
    BreakPathsShowPathDomains,
    Show,
}

/// How invalid values are handled for one scale of a unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScaleInvalidDataMode {
    Filter,
    BreakPathsFilterDomains,
    BreakPathsShowDomains,
    Show,
    /// The scale never receives invalid values, e.g. counts or discrete domains
    AlwaysValid,
}

impl ScaleInvalidDataMode {
    /// Whether rows with invalid values must be removed before reaching the scale or mark
    pub fn requires_filter(&self) -> bool {
        !matches!(
            self,
            ScaleInvalidDataMode::Show | ScaleInvalidDataMode::AlwaysValid
        )
    }
}

/// Resolve the `invalid` mark property. An absent property defaults to
/// breaking paths for path marks and filtering otherwise, `null` shows
/// invalid values.
pub fn normalize_invalid_data_mode(
    mode: Option<&Value>,
    is_path: bool,
) -> Result<ScaleInvalidDataMode> {
    let mode = match mode {
        None => None,
        Some(Value::Null) => return Ok(ScaleInvalidDataMode::Show),
        Some(value) => Some(
            serde_json::from_value::<MarkInvalidDataMode>(value.clone()).map_err(|_| {
                VlFusionError::specification(format!("Invalid value for mark property invalid: {value}"))
            })?,
        ),
    };
    Ok(match mode {
        None | Some(MarkInvalidDataMode::BreakPathsShowPathDomains) => {
            if is_path {
                ScaleInvalidDataMode::BreakPathsShowDomains
            } else {
                ScaleInvalidDataMode::Filter
            }
        }
        Some(MarkInvalidDataMode::Filter) => ScaleInvalidDataMode::Filter,
        Some(MarkInvalidDataMode::BreakPathsFilterDomains) => {
            ScaleInvalidDataMode::BreakPathsFilterDomains
        }
        Some(MarkInvalidDataMode::BreakPathsShowDomains) => {
            ScaleInvalidDataMode::BreakPathsShowDomains
        }
        Some(MarkInvalidDataMode::Show) => ScaleInvalidDataMode::Show,
    })
}

#[derive(Debug, Clone, Copy)]
pub struct ScaleInvalidDataModeParams<'a> {
    pub scale_channel: Channel,
    pub mark_def: &'a MarkDef,
    pub config: &'a Config,
    pub scale_type: Option<ScaleType>,
    pub is_count_aggregate: bool,
}

/// Invalid-data policy of the scale bound to `scale_channel`
pub fn get_scale_invalid_data_mode(
    params: ScaleInvalidDataModeParams,
) -> Result<ScaleInvalidDataMode> {
    let ScaleInvalidDataModeParams {
        scale_channel,
        mark_def,
        config,
        scale_type,
        is_count_aggregate,
    } = params;

    let has_continuous_domain = scale_type.is_some_and(|t| t.has_continuous_domain());
    if !has_continuous_domain || is_count_aggregate {
        return Ok(ScaleInvalidDataMode::AlwaysValid);
    }

    let invalid = get_mark_prop_or_config("invalid", mark_def, config, Default::default());
    let mode = normalize_invalid_data_mode(invalid.as_ref(), mark_def.is_path())?;

    if config.scale.invalid_output(scale_channel).is_some() {
        // An explicit output for invalid values means they are drawn
        return Ok(ScaleInvalidDataMode::Show);
    }
    Ok(mode)
}
