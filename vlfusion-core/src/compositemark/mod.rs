/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod boxplot;
pub mod common;
pub mod errorbar;

use crate::spec::channel::Channel;
use crate::spec::config::Config;
use crate::spec::encoding::{normalize_encoding, Encoding};
use crate::spec::mark::Mark;
use crate::spec::unit::{LayerSpec, NormalizedSpec, Spec, UnitSpec};
use thiserror::Error;
use vlfusion_common::error::{Result, VlFusionError};

/// Non-fatal problem found while normalizing a spec. The offending feature
/// is dropped and normalization continues.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum NormalizeWarning {
    #[error("Selection not supported for {0} yet.")]
    SelectionNotSupported(String),

    #[error("Continuous axis should not have customized aggregation function {aggregate}; {mark} already aggregates the axis.")]
    ContinuousAxisHasCustomizedAggregate { aggregate: String, mark: String },

    #[error("{center} is not usually used with {extent} for {mark}.")]
    CenterIsUsedWithWrongExtent {
        center: String,
        extent: String,
        mark: String,
    },

    #[error("{} not needed when data are aggregated.", needed_props(.center, .extent))]
    CenterAndExtentNotNeeded { center: bool, extent: bool },

    #[error("Dropping {0} from encoding because it has no field.")]
    EmptyFieldDef(Channel),

    #[error("{0} channel does not support a list of definitions, only the first one is used.")]
    ListNotSupported(Channel),
}

fn needed_props(center: &bool, extent: &bool) -> &'static str {
    match (*center, *extent) {
        (true, true) => "Center and extent are",
        (true, false) => "Center is",
        _ => "Extent is",
    }
}

pub fn record_warning(warnings: &mut Vec<NormalizeWarning>, warning: NormalizeWarning) {
    log::warn!("{warning}");
    warnings.push(warning);
}

/// A spec with every composite mark expanded into layers of primitive marks
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub spec: NormalizedSpec,
    pub warnings: Vec<NormalizeWarning>,
}

/// Expand composite marks and normalize encodings throughout a spec.
///
/// The encoding of a layer is pushed down into its children, with the
/// child's channels taking precedence.
pub fn normalize(spec: &Spec, config: &Config) -> Result<Normalized> {
    let mut warnings = Vec::new();
    let spec = normalize_spec(spec, None, config, &mut warnings)?;
    Ok(Normalized { spec, warnings })
}

fn normalize_spec(
    spec: &Spec,
    parent_encoding: Option<&Encoding>,
    config: &Config,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<Spec> {
    match spec {
        Spec::Layer(layer) => {
            let encoding = merge_encoding(parent_encoding, &layer.encoding);
            let children = layer
                .layer
                .iter()
                .map(|child| normalize_spec(child, Some(&encoding), config, warnings))
                .collect::<Result<Vec<_>>>()?;
            Ok(Spec::Layer(LayerSpec {
                layer: children,
                encoding: Default::default(),
                ..layer.clone()
            }))
        }
        Spec::Unit(unit) => {
            let unit = UnitSpec {
                encoding: merge_encoding(parent_encoding, &unit.encoding),
                ..unit.as_ref().clone()
            };
            let mark = unit.mark.mark_type();
            let expanded = match mark {
                Mark::Boxplot => boxplot::normalize_boxplot(&unit, config, warnings)?,
                Mark::ErrorBar => errorbar::normalize_errorbar(&unit, config, warnings)?,
                Mark::ErrorBand => {
                    return Err(VlFusionError::compilation(format!(
                        "Composite mark {mark} is not supported"
                    )))
                }
                _ => {
                    return Ok(Spec::from(UnitSpec {
                        encoding: normalize_encoding(&unit.encoding, warnings),
                        ..unit
                    }))
                }
            };
            // Expanded parts only hold primitive marks
            normalize_spec(&expanded, None, config, warnings)
        }
    }
}

fn merge_encoding(parent: Option<&Encoding>, encoding: &Encoding) -> Encoding {
    match parent {
        Some(parent) => parent.merged(encoding),
        None => encoding.clone(),
    }
}
