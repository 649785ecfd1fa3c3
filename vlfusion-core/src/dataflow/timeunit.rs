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
use crate::spec::field_def::TimeUnit;
use crate::vega::transform::timeunit::{TimeUnitTransformSpec, TimeUnitUnitSpec, TimeZone};
use crate::vega::transform::TransformSpec;
use serde::Serialize;
use std::any::Any;
use std::collections::HashSet;
use vlfusion_common::error::{Result, VlFusionError};
use vlfusion_common::escape::replace_path_in_field;

/// Truncates a date field to a time unit, producing `<as>` and `<as>_end`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeUnitNode {
    pub field: String,
    pub time_unit: TimeUnit,
    pub as_: String,
}

impl TimeUnitNode {
    pub fn new<S: Into<String>, T: Into<String>>(field: S, time_unit: TimeUnit, as_: T) -> Self {
        Self {
            field: field.into(),
            time_unit,
            as_: as_.into(),
        }
    }
}

impl DataflowNode for TimeUnitNode {
    fn clone_node(&self) -> Box<dyn DataflowNode> {
        Box::new(self.clone())
    }

    fn dependent_fields(&self) -> HashSet<String> {
        HashSet::from([self.field.clone()])
    }

    fn produced_fields(&self) -> HashSet<String> {
        HashSet::from([self.as_.clone(), format!("{}_end", self.as_)])
    }

    fn hash(&self) -> Result<String> {
        Ok(format!("TimeUnit {}", content_hash(self)?))
    }

    fn assemble(&self) -> Result<Vec<TransformSpec>> {
        let units: Vec<TimeUnitUnitSpec> = self
            .time_unit
            .parts()
            .into_iter()
            .filter_map(TimeUnitUnitSpec::from_part)
            .collect();
        if units.is_empty() {
            return Err(VlFusionError::specification(format!(
                "Unsupported time unit {:?} for field {}",
                self.time_unit.unit(),
                self.field
            )));
        }
        let step = match &self.time_unit {
            TimeUnit::Params(params) => params.step,
            TimeUnit::Unit(_) => None,
        };
        Ok(vec![TransformSpec::Timeunit(TimeUnitTransformSpec {
            field: replace_path_in_field(&self.field)?,
            units: Some(units),
            step,
            timezone: self.time_unit.is_utc().then_some(TimeZone::Utc),
            as_: Some(vec![self.as_.clone(), format!("{}_end", self.as_)]),
            extra: Default::default(),
        })])
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
