/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod conditional;
pub mod guide;
pub mod invalid;
pub mod mark;
pub mod nonposition;
pub mod position;
pub mod tooltip;
pub mod valueref;

use crate::vega::mark::MarkEncodingsSpec;

/// Encode entry of a mark or guide: output channel name to value reference(s)
pub type EncodeEntry = MarkEncodingsSpec;
