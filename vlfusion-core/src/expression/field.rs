/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::field_def::{Aggregate, ArgAggregate, FieldDef};
use vlfusion_common::error::Result;
use vlfusion_common::escape::{flat_access_with_datum, remove_path_from_field, replace_path_in_field};

/// Name of the field produced by a field-less count aggregate
pub const COUNT_FIELD: &str = "__count";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinSuffix {
    End,
    Range,
    Mid,
}

impl BinSuffix {
    pub fn as_str(&self) -> &'static str {
        match self {
            BinSuffix::End => "end",
            BinSuffix::Range => "range",
            BinSuffix::Mid => "mid",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldRefOptions<'a> {
    pub prefix: Option<&'a str>,
    pub suffix: Option<&'a str>,
    pub bin_suffix: Option<BinSuffix>,
    /// Skip the aggregate/bin/time unit function prefix
    pub nofn: bool,
    /// Return the name as used in an `as` output, with access path flattened
    pub for_as: bool,
    /// Return an expression accessing the field on the given datum variable
    pub expr: Option<&'a str>,
}

impl<'a> FieldRefOptions<'a> {
    pub fn expr(datum: &'a str) -> Self {
        Self {
            expr: Some(datum),
            ..Default::default()
        }
    }

    pub fn for_as() -> Self {
        Self {
            for_as: true,
            ..Default::default()
        }
    }

    pub fn bin_suffix(bin_suffix: BinSuffix) -> Self {
        Self {
            bin_suffix: Some(bin_suffix),
            ..Default::default()
        }
    }
}

/// Renderer field name of a field definition.
///
/// The name encodes the transformation applied to the field: `__count` for a
/// field-less count, `bin_maxbins_10_<field>` for a binned field,
/// `<op>_<field>` for an aggregate and `<unit>_<field>` for a time unit.
pub fn field_ref(field_def: &FieldDef, opts: &FieldRefOptions) -> Result<String> {
    let mut field = field_def.field.clone().unwrap_or_default();
    let mut suffix = opts.suffix.map(String::from);
    let mut arg_accessor = String::new();

    if field_def.is_count() {
        field = COUNT_FIELD.to_string();
    } else {
        let mut fn_: Option<String> = None;
        if !opts.nofn {
            if let Some(bin) = field_def.bin.as_ref().filter(|bin| bin.is_binning()) {
                fn_ = Some(bin.to_field_prefix());
                suffix = join_suffix(opts.bin_suffix.map(|s| s.as_str()), opts.suffix);
            } else if let Some(aggregate) = &field_def.aggregate {
                match aggregate {
                    Aggregate::Arg(ArgAggregate::Argmax(arg)) => {
                        arg_accessor = format!("[\"{field}\"]");
                        field = format!("argmax_{arg}");
                    }
                    Aggregate::Arg(ArgAggregate::Argmin(arg)) => {
                        arg_accessor = format!("[\"{field}\"]");
                        field = format!("argmin_{arg}");
                    }
                    Aggregate::Op(op) => fn_ = Some(op.name().to_string()),
                    Aggregate::Composite(composite) => fn_ = Some(composite.name().to_string()),
                }
            } else if let Some(time_unit) =
                field_def.time_unit.as_ref().filter(|tu| !tu.is_binned())
            {
                fn_ = Some(time_unit.to_field_prefix());
                let bin_suffix = opts
                    .bin_suffix
                    .filter(|s| !matches!(s, BinSuffix::Range | BinSuffix::Mid))
                    .map(|s| s.as_str());
                suffix = join_suffix(bin_suffix, opts.suffix);
            }
        }

        if let Some(fn_) = fn_ {
            field = if field.is_empty() {
                fn_
            } else {
                format!("{fn_}_{field}")
            };
        }
    }

    if let Some(suffix) = suffix.filter(|s| !s.is_empty()) {
        field = format!("{field}_{suffix}");
    }
    if let Some(prefix) = opts.prefix {
        field = format!("{prefix}_{field}");
    }

    if opts.for_as {
        remove_path_from_field(&field)
    } else if let Some(datum) = opts.expr {
        Ok(flat_access_with_datum(&field, datum)? + &arg_accessor)
    } else {
        Ok(replace_path_in_field(&field)? + &arg_accessor)
    }
}

fn join_suffix(first: Option<&str>, second: Option<&str>) -> Option<String> {
    let joined = format!("{}{}", first.unwrap_or(""), second.unwrap_or(""));
    if joined.is_empty() {
        None
    } else {
        Some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::field_def::{AggregateOp, Bin, FieldType, TimeUnit};

    #[test]
    fn test_plain_and_nested_fields() {
        let def = FieldDef::new("a", FieldType::Quantitative);
        assert_eq!(field_ref(&def, &Default::default()).unwrap(), "a");
        assert_eq!(
            field_ref(&def, &FieldRefOptions::expr("datum")).unwrap(),
            r#"datum["a"]"#
        );

        let def = FieldDef::new("a.b", FieldType::Quantitative);
        assert_eq!(field_ref(&def, &Default::default()).unwrap(), r"a\.b");
        assert_eq!(field_ref(&def, &FieldRefOptions::for_as()).unwrap(), "a.b");
        assert_eq!(
            field_ref(&def, &FieldRefOptions::expr("datum")).unwrap(),
            r#"datum["a.b"]"#
        );
    }

    #[test]
    fn test_transformed_fields() {
        let count = FieldDef::default().with_aggregate(AggregateOp::Count);
        assert_eq!(field_ref(&count, &Default::default()).unwrap(), "__count");

        let mean = FieldDef::new("a", FieldType::Quantitative).with_aggregate(AggregateOp::Mean);
        assert_eq!(field_ref(&mean, &Default::default()).unwrap(), "mean_a");

        let binned = FieldDef {
            bin: Some(Bin::Flag(true)),
            ..FieldDef::new("a", FieldType::Quantitative)
        };
        assert_eq!(
            field_ref(&binned, &Default::default()).unwrap(),
            "bin_maxbins_10_a"
        );
        assert_eq!(
            field_ref(&binned, &FieldRefOptions::bin_suffix(BinSuffix::End)).unwrap(),
            "bin_maxbins_10_a_end"
        );

        let monthly = FieldDef {
            time_unit: Some(TimeUnit::Unit("yearmonth".to_string())),
            ..FieldDef::new("d", FieldType::Temporal)
        };
        assert_eq!(
            field_ref(&monthly, &Default::default()).unwrap(),
            "yearmonth_d"
        );
        assert_eq!(
            field_ref(&monthly, &FieldRefOptions::bin_suffix(BinSuffix::Range)).unwrap(),
            "yearmonth_d"
        );
    }

    #[test]
    fn test_prefix_suffix_nofn() {
        let mean = FieldDef::new("a", FieldType::Quantitative).with_aggregate(AggregateOp::Mean);
        let opts = FieldRefOptions {
            prefix: Some("lower_box"),
            nofn: true,
            ..Default::default()
        };
        assert_eq!(field_ref(&mean, &opts).unwrap(), "lower_box_a");

        let opts = FieldRefOptions {
            suffix: Some("start"),
            ..Default::default()
        };
        assert_eq!(field_ref(&mean, &opts).unwrap(), "mean_a_start");
    }

    #[test]
    fn test_malformed_path_is_an_error() {
        let def = FieldDef::new("a[0", FieldType::Quantitative);
        assert!(field_ref(&def, &Default::default()).is_err());
    }
}
