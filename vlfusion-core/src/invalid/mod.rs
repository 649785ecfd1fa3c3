/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod datasources;
pub mod mode;

pub use datasources::{DataSourceInvalidHandling, DataSourcesForHandlingInvalidValues};
pub use mode::{
    get_scale_invalid_data_mode, normalize_invalid_data_mode, MarkInvalidDataMode,
    ScaleInvalidDataMode, ScaleInvalidDataModeParams,
};
