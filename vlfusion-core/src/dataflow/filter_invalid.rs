/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::dataflow::content_hash;
use crate::dataflow::node::DataflowNode;
use crate::expression::field::{field_ref, FieldRefOptions};
use crate::expression::predicate::{and_all, is_valid_finite_number_expr};
use crate::invalid::{
    get_scale_invalid_data_mode, DataSourcesForHandlingInvalidValues, ScaleInvalidDataModeParams,
};
use crate::model::UnitModel;
use crate::spec::field_def::{FieldDef, FieldType};
use crate::vega::transform::filter::FilterTransformSpec;
use crate::vega::transform::TransformSpec;
use indexmap::IndexMap;
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use vlfusion_common::error::{Result, VlFusionError};

/// A field whose invalid values are removed, tagged with how validity is tested
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "def", rename_all = "lowercase")]
pub enum FilteredField {
    Quantitative(FieldDef),
    Temporal(FieldDef),
}

impl FilteredField {
    pub fn field_def(&self) -> &FieldDef {
        match self {
            FilteredField::Quantitative(def) | FilteredField::Temporal(def) => def,
        }
    }

    fn validity_expr(&self) -> Result<String> {
        let field = field_ref(self.field_def(), &FieldRefOptions::expr("datum"))?;
        Ok(match self {
            FilteredField::Temporal(_) => format!(
                "(isDate({field}) || ({}))",
                is_valid_finite_number_expr(&field)
            ),
            FilteredField::Quantitative(_) => is_valid_finite_number_expr(&field),
        })
    }
}

/// Removes rows holding null, NaN or infinite values in fields bound to
/// continuous scales that do not show invalid values
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterInvalidNode {
    filter: IndexMap<String, FilteredField>,
}

impl FilterInvalidNode {
    pub fn new(filter: IndexMap<String, FilteredField>) -> Self {
        Self { filter }
    }

    pub fn filter(&self) -> &IndexMap<String, FilteredField> {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut IndexMap<String, FilteredField> {
        &mut self.filter
    }

    /// Build the filter for a unit, or `None` when the data consumers keep
    /// invalid values or no field needs filtering
    pub fn make(
        model: &UnitModel,
        data_sources: &DataSourcesForHandlingInvalidValues,
    ) -> Result<Option<Self>> {
        if data_sources.includes_all() {
            return Ok(None);
        }

        let filter = model.reduce_field_def(IndexMap::new(), |mut filter, field_def, channel| {
            if !channel.is_scale_channel() {
                return Ok(filter);
            }
            let Some(scale) = model.get_scale_component(channel) else {
                return Ok(filter);
            };
            let mode = get_scale_invalid_data_mode(ScaleInvalidDataModeParams {
                scale_channel: channel,
                mark_def: &model.mark_def,
                config: model.config,
                scale_type: Some(scale.type_),
                is_count_aggregate: field_def.is_counting_aggregate(),
            })?;
            if !mode.requires_filter() {
                return Ok(filter);
            }

            let filtered = match field_def.type_ {
                Some(FieldType::Quantitative) => FilteredField::Quantitative(field_def.clone()),
                Some(FieldType::Temporal) => FilteredField::Temporal(field_def.clone()),
                other => {
                    log::error!(
                        "Field {:?} of type {:?} on channel {channel} cannot be filtered for invalid values",
                        field_def.field_name(),
                        other
                    );
                    return Err(VlFusionError::internal(format!(
                        "Invalid-value filter reached field {:?} without a continuous type",
                        field_def.field_name()
                    )));
                }
            };
            filter.insert(field_def.field_name().to_string(), filtered);
            Ok(filter)
        })?;

        if filter.is_empty() {
            return Ok(None);
        }
        log::debug!(
            "Filtering invalid values of {:?} for {}",
            filter.keys().collect::<Vec<_>>(),
            model.name
        );
        Ok(Some(Self { filter }))
    }

    /// Single filter transform combining the validity test of every field
    pub fn assemble_filter(&self) -> Result<Option<TransformSpec>> {
        let exprs = self
            .filter
            .values()
            .map(FilteredField::validity_expr)
            .collect::<Result<Vec<_>>>()?;
        Ok(and_all(exprs).map(|expr| TransformSpec::Filter(FilterTransformSpec::new(expr))))
    }
}

impl DataflowNode for FilterInvalidNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn dependent_fields(&self) -> HashSet<String> {
        self.filter.keys().cloned().collect()
    }

    fn hash(&self) -> Result<String> {
        // Sorted by field so equal filters hash alike whatever the channel order
        let sorted: BTreeMap<_, _> = self.filter.iter().collect();
        Ok(format!("FilterInvalid {}", content_hash(&sorted)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        Ok(self.assemble_filter()?.into_iter().collect())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
