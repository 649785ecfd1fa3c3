/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod channel;
pub mod channel_def;
pub mod config;
pub mod encoding;
pub mod field_def;
pub mod mark;
pub mod transform;
pub mod unit;
