/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
pub mod aggregate;
pub mod assemble;
pub mod bin;
pub mod filter;
pub mod filter_invalid;
pub mod formula;
pub mod graph;
pub mod joinaggregate;
pub mod node;
pub mod optimize;
pub mod parse;
pub mod source;
pub mod timeunit;

use serde::Serialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use vlfusion_common::error::Result;

/// Hash of the JSON serialization of a value. Stable across runs and platforms so
/// that node hashes can be compared between compiles.
pub fn content_hash<T: Serialize + ?Sized>(value: &T) -> Result<u64> {
    let serialized = serde_json::to_string(value)?;
    let mut hasher = deterministic_hash::DeterministicHasher::new(DefaultHasher::new());
    serialized.hash(&mut hasher);
    Ok(hasher.finish())
}
