/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod compile;
pub mod compositemark;
pub mod dataflow;
pub mod encode;
pub mod expression;
pub mod invalid;
pub mod model;
pub mod scale;
pub mod spec;
pub mod vega;

pub use compile::{compile, CompileOptions, CompiledChart};
pub use compositemark::{normalize, NormalizeWarning, Normalized};
