/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod aggregate;
pub mod bin;
pub mod extent;
pub mod filter;
pub mod formula;
pub mod joinaggregate;
pub mod timeunit;

use crate::vega::transform::aggregate::AggregateTransformSpec;
use crate::vega::transform::bin::BinTransformSpec;
use crate::vega::transform::extent::ExtentTransformSpec;
use crate::vega::transform::filter::FilterTransformSpec;
use crate::vega::transform::formula::FormulaTransformSpec;
use crate::vega::transform::joinaggregate::JoinAggregateTransformSpec;
use crate::vega::transform::timeunit::TimeUnitTransformSpec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransformSpec {
    Extent(ExtentTransformSpec),
    Filter(FilterTransformSpec),
    Formula(FormulaTransformSpec),
    Bin(Box<BinTransformSpec>), // Box since transform is much larger than others
    Aggregate(AggregateTransformSpec),
    JoinAggregate(JoinAggregateTransformSpec),
    Timeunit(TimeUnitTransformSpec),
}
