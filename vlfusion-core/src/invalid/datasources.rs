/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::invalid::mode::{normalize_invalid_data_mode, ScaleInvalidDataMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use vlfusion_common::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSourceInvalidHandling {
    IncludeInvalidValues,
    ExcludeInvalidValues,
}

/// Whether the data feeding marks and scale domains keeps invalid values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DataSourcesForHandlingInvalidValues {
    pub marks: DataSourceInvalidHandling,
    pub scales: DataSourceInvalidHandling,
}

impl DataSourcesForHandlingInvalidValues {
    pub fn from_mode(mode: ScaleInvalidDataMode, is_path: bool) -> Self {
        use DataSourceInvalidHandling::*;
        let path_marks = if is_path {
            IncludeInvalidValues
        } else {
            ExcludeInvalidValues
        };
        let (marks, scales) = match mode {
            ScaleInvalidDataMode::Filter => (ExcludeInvalidValues, ExcludeInvalidValues),
            ScaleInvalidDataMode::BreakPathsShowDomains => (path_marks, IncludeInvalidValues),
            ScaleInvalidDataMode::BreakPathsFilterDomains => (path_marks, ExcludeInvalidValues),
            ScaleInvalidDataMode::Show | ScaleInvalidDataMode::AlwaysValid => {
                (IncludeInvalidValues, IncludeInvalidValues)
            }
        };
        Self { marks, scales }
    }

    /// Data sources for the `invalid` mark property of a unit
    pub fn for_invalid(invalid: Option<&Value>, is_path: bool) -> Result<Self> {
        let mode = normalize_invalid_data_mode(invalid, is_path)?;
        Ok(Self::from_mode(mode, is_path))
    }

    pub fn includes_all(&self) -> bool {
        self.marks == DataSourceInvalidHandling::IncludeInvalidValues
            && self.scales == DataSourceInvalidHandling::IncludeInvalidValues
    }
}

#[cfg(test)]
mod tests {
    use super::DataSourceInvalidHandling::*;
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_sources_per_mode() {
        let filter = DataSourcesForHandlingInvalidValues::for_invalid(None, false).unwrap();
        assert_eq!(filter.marks, ExcludeInvalidValues);
        assert_eq!(filter.scales, ExcludeInvalidValues);

        let line = DataSourcesForHandlingInvalidValues::for_invalid(None, true).unwrap();
        assert_eq!(line.marks, IncludeInvalidValues);
        assert_eq!(line.scales, IncludeInvalidValues);
        assert!(line.includes_all());

        let domains = DataSourcesForHandlingInvalidValues::for_invalid(
            Some(&json!("break-paths-filter-domains")),
            false,
        )
        .unwrap();
        assert_eq!(domains.marks, ExcludeInvalidValues);
        assert_eq!(domains.scales, ExcludeInvalidValues);

        let show = DataSourcesForHandlingInvalidValues::for_invalid(Some(&Value::Null), false)
            .unwrap();
        assert!(show.includes_all());
    }
}
