/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::compositemark::common::{
    composite_mark_continuous_axis, composite_mark_orient, filter_tooltip_with_aggregated_field,
    get_composite_mark_tooltip, get_title, part_layer_mixins, CompositePartFactory,
    ContinuousAxis, PartBase, PartSpec, TooltipSummary,
};
use crate::compositemark::{record_warning, NormalizeWarning};
use crate::spec::channel::Channel;
use crate::spec::channel_def::{ChannelDef, Conditional, Conditions, ValueDef};
use crate::spec::config::{BoxPlotExtent, Config, DEFAULT_MARK_COLOR};
use crate::spec::encoding::{
    extract_transforms_from_encoding, normalize_encoding, ChannelDefOrList, Encoding,
};
use crate::spec::field_def::{format_number, AggregateOp, FieldDef};
use crate::spec::mark::{Mark, MarkDef, Orient};
use crate::spec::transform::{
    AggregateTransform, AggregatedFieldDef, JoinAggregateTransform, Transform,
};
use crate::spec::unit::{LayerSpec, Spec, UnitSpec};
use serde_json::{json, Value};
use vlfusion_common::error::{Result, VlFusionError};
use vlfusion_common::escape::{access_with_datum_to_unescaped_path, remove_path_from_field};

/// How the whiskers of a boxplot are computed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoxPlotType {
    /// Whiskers span the minimum and maximum of each group
    MinMax,
    /// Whiskers span the most extreme values within `k` IQRs of the box,
    /// values beyond are drawn as outliers
    Tukey(f64),
    /// Whiskers span `k` IQRs from the box, clamped to the minimum and maximum
    KIqr(f64),
}

impl BoxPlotType {
    pub fn from_extent(extent: &BoxPlotExtent) -> Result<Self> {
        match extent {
            BoxPlotExtent::Factor(k) => Ok(BoxPlotType::Tukey(*k)),
            BoxPlotExtent::Named(name) if name == "min-max" => Ok(BoxPlotType::MinMax),
            BoxPlotExtent::Named(name) if name == "tukey" => Ok(BoxPlotType::Tukey(1.5)),
            BoxPlotExtent::Named(name) => Err(VlFusionError::specification(format!(
                "Invalid boxplot extent {name}, expected a number or \"min-max\""
            ))),
        }
    }

    fn whisker_prefixes(&self) -> (&'static str, &'static str) {
        match self {
            BoxPlotType::MinMax => ("lower_whisker_", "upper_whisker_"),
            BoxPlotType::Tukey(_) | BoxPlotType::KIqr(_) => ("min_", "max_"),
        }
    }
}

fn quartiles(field: &str, aliased: &str) -> Vec<AggregatedFieldDef> {
    vec![
        AggregatedFieldDef::new(AggregateOp::Q1, field, format!("lower_box_{aliased}")),
        AggregatedFieldDef::new(AggregateOp::Q3, field, format!("upper_box_{aliased}")),
    ]
}

/// Transforms and encodings derived from a boxplot spec before its layers are built
struct BoxParams {
    bins: Vec<Transform>,
    time_units: Vec<Transform>,
    transform: Vec<Transform>,
    groupby: Vec<String>,
    aggregate: Vec<AggregatedFieldDef>,
    continuous_axis: ContinuousAxis,
    encoding_without_continuous_axis: Encoding,
    ticks_orient: Orient,
    box_orient: Orient,
    custom_tooltip_without_aggregated_field: Option<ChannelDefOrList>,
}

fn box_params(
    mark_def: &MarkDef,
    encoding: &Encoding,
    box_plot_type: BoxPlotType,
    config: &Config,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<BoxParams> {
    let orient = composite_mark_orient(mark_def, encoding)?;
    let continuous_axis =
        composite_mark_continuous_axis(encoding, orient, Mark::Boxplot, warnings)?;
    let field = continuous_axis.field().to_string();
    let aliased = remove_path_from_field(&field)?;

    let (lower_prefix, upper_prefix) = box_plot_type.whisker_prefixes();
    let mut boxplot_aggregate = quartiles(&field, &aliased);
    boxplot_aggregate.extend([
        AggregatedFieldDef::new(AggregateOp::Median, &field, format!("mid_box_{aliased}")),
        AggregatedFieldDef::new(AggregateOp::Min, &field, format!("{lower_prefix}{aliased}")),
        AggregatedFieldDef::new(AggregateOp::Max, &field, format!("{upper_prefix}{aliased}")),
    ]);

    let post_aggregate_calculates = match box_plot_type {
        BoxPlotType::KIqr(k) => {
            let datum = |prefix: &str| access_with_datum_to_unescaped_path(&format!("{prefix}_{aliased}"));
            let k = format_number(k);
            vec![
                Transform::calculate(
                    format!("{} - {}", datum("upper_box"), datum("lower_box")),
                    format!("iqr_{aliased}"),
                ),
                Transform::calculate(
                    format!("min({} + {} * {k}, {})", datum("upper_box"), datum("iqr"), datum("max")),
                    format!("upper_whisker_{aliased}"),
                ),
                Transform::calculate(
                    format!("max({} - {} * {k}, {})", datum("lower_box"), datum("iqr"), datum("min")),
                    format!("lower_whisker_{aliased}"),
                ),
            ]
        }
        BoxPlotType::MinMax | BoxPlotType::Tukey(_) => Vec::new(),
    };

    let (custom_tooltip_without_aggregated_field, filtered_encoding) =
        filter_tooltip_with_aggregated_field(&encoding.without(&[continuous_axis.channel]));
    let extracted = extract_transforms_from_encoding(&filtered_encoding, config)?;

    let bins: Vec<Transform> = extracted.bins.into_iter().map(Transform::Bin).collect();
    let time_units: Vec<Transform> = extracted
        .time_units
        .into_iter()
        .map(Transform::TimeUnit)
        .collect();
    let mut transform = bins.clone();
    transform.extend(time_units.iter().cloned());
    transform.push(Transform::Aggregate(AggregateTransform {
        aggregate: extracted
            .aggregate
            .iter()
            .cloned()
            .chain(boxplot_aggregate)
            .collect(),
        groupby: extracted.groupby.clone(),
    }));
    transform.extend(post_aggregate_calculates);

    Ok(BoxParams {
        bins,
        time_units,
        transform,
        groupby: extracted.groupby,
        aggregate: extracted.aggregate,
        continuous_axis,
        encoding_without_continuous_axis: extracted.encoding,
        ticks_orient: orient.flip(),
        box_orient: orient,
        custom_tooltip_without_aggregated_field,
    })
}

/// Layer spec carrying the outer properties of the boxplot unit
fn outer_layer(unit: &UnitSpec, transform: Vec<Transform>, layer: Vec<Spec>) -> Spec {
    Spec::Layer(LayerSpec {
        layer,
        encoding: Default::default(),
        transform,
        name: unit.name.clone(),
        data: unit.data.clone(),
        extra: unit.extra.clone(),
    })
}

/// Expand a boxplot into layers of rule, tick, bar and point marks.
///
/// A min-max boxplot aggregates once and draws every part from that
/// aggregate. A Tukey boxplot needs the quartiles on every row to find the
/// whisker ends and the outliers, so its whiskers and outliers are drawn
/// from a separate branch: joinaggregate, filter, aggregate.
pub fn normalize_boxplot(
    unit: &UnitSpec,
    config: &Config,
    warnings: &mut Vec<NormalizeWarning>,
) -> Result<Spec> {
    let encoding = normalize_encoding(&unit.encoding, warnings);
    let mark_def = unit.mark.to_mark_def();

    if unit.params.is_some() {
        record_warning(
            warnings,
            NormalizeWarning::SelectionNotSupported(Mark::Boxplot.to_string()),
        );
    }

    let extent = match mark_def.get("extent") {
        Some(extent) => serde_json::from_value::<BoxPlotExtent>(extent.clone()).map_err(|_| {
            VlFusionError::specification(format!("Invalid boxplot extent {extent}"))
        })?,
        None => config.boxplot.extent.clone(),
    };
    let box_plot_type = BoxPlotType::from_extent(&extent)?;
    let size_value = mark_def
        .get("size")
        .cloned()
        .or_else(|| config.boxplot.size.map(Value::from))
        .or_else(|| config.mark.get("size").cloned());
    let invalid = mark_def.get("invalid").cloned();

    let BoxParams {
        bins,
        time_units,
        transform,
        groupby,
        aggregate,
        continuous_axis,
        encoding_without_continuous_axis,
        ticks_orient,
        box_orient,
        custom_tooltip_without_aggregated_field,
    } = box_params(&mark_def, &encoding, box_plot_type, config, warnings)?;

    let field = continuous_axis.field().to_string();
    let aliased = remove_path_from_field(&field)?;
    let color = encoding_without_continuous_axis.get(Channel::Color).cloned();
    let size = encoding_without_continuous_axis.get(Channel::Size).cloned();
    let encoding_without_size_color =
        encoding_without_continuous_axis.without(&[Channel::Color, Channel::Size]);

    let part_factory = |shared_encoding: Encoding| {
        CompositePartFactory::new(&mark_def, &continuous_axis, shared_encoding, &config.boxplot)
    };
    let extent_factory = part_factory(encoding_without_size_color.clone());
    let box_factory = part_factory(encoding_without_continuous_axis.clone());

    // The median tick takes the box color when the box collapses to a line.
    // An object box config owns that color, otherwise the mark color applies.
    let default_box_color = match &config.boxplot.box_ {
        Some(Value::Object(box_config)) => box_config.get("color"),
        _ => config.mark.get("color"),
    }
    .filter(|color| !color.is_null())
    .cloned()
    .unwrap_or_else(|| json!(DEFAULT_MARK_COLOR));
    let collapsed_box_test = format!(
        "{} >= {}",
        access_with_datum_to_unescaped_path(&format!("lower_box_{field}")),
        access_with_datum_to_unescaped_path(&format!("upper_box_{field}"))
    );
    let color_target = match color.as_ref().and_then(ChannelDefOrList::as_single) {
        Some(color) => color.clone(),
        None => ChannelDef::Value(ValueDef::new(default_box_color)),
    };
    let mut mid_tick_encoding = encoding_without_size_color.clone();
    if let Some(size) = &size {
        mid_tick_encoding.insert(Channel::Size, size.clone());
    }
    mid_tick_encoding.insert(
        Channel::Color,
        ChannelDef::Value(ValueDef {
            value: None,
            condition: Some(Conditions::Single(Box::new(Conditional::with_test(
                collapsed_box_test,
                color_target,
            )?))),
            extra: Default::default(),
        }),
    );
    let mid_tick_factory = part_factory(mid_tick_encoding);

    let (min_prefix, max_prefix) = box_plot_type.whisker_prefixes();
    let five_summary_tooltip = get_composite_mark_tooltip(
        &[
            TooltipSummary::new(max_prefix, "Max"),
            TooltipSummary::new("upper_box_", "Q3"),
            TooltipSummary::new("mid_box_", "Median"),
            TooltipSummary::new("lower_box_", "Q1"),
            TooltipSummary::new(min_prefix, "Min"),
        ],
        &continuous_axis.def,
        &encoding_without_continuous_axis,
        true,
    )?;

    // Whisker layers
    let end_tick = MarkDef::new(Mark::Tick)
        .with("color", json!("black"))
        .with("opacity", json!(1))
        .with("orient", json!(ticks_orient))
        .with_opt("invalid", invalid.clone())
        .with("aria", json!(false));
    let whisker_tooltip = match box_plot_type {
        BoxPlotType::MinMax => five_summary_tooltip.clone(),
        BoxPlotType::Tukey(_) | BoxPlotType::KIqr(_) => get_composite_mark_tooltip(
            &[
                TooltipSummary::new("upper_whisker_", "Upper Whisker"),
                TooltipSummary::new("lower_whisker_", "Lower Whisker"),
            ],
            &continuous_axis.def,
            &encoding_without_continuous_axis,
            true,
        )?,
    };
    let whisker_rule = MarkDef::new(Mark::Rule)
        .with_opt("invalid", invalid.clone())
        .with("aria", json!(false));
    let whisker_part = |part: &'static str, mark: &MarkDef, position: &'static str, end: Option<&'static str>| {
        extent_factory.make_part(PartSpec {
            part,
            mark: mark.clone(),
            position_prefix: position,
            end_position_prefix: end,
            extra_encoding: whisker_tooltip.clone(),
        })
    };
    let whisker_layers: Vec<Spec> = [
        whisker_part("rule", &whisker_rule, "lower_whisker", Some("lower_box")),
        whisker_part("rule", &whisker_rule, "upper_box", Some("upper_whisker")),
        whisker_part("ticks", &end_tick, "lower_whisker", None),
        whisker_part("ticks", &end_tick, "upper_whisker", None),
    ]
    .into_iter()
    .flatten()
    .collect();

    // Box layers
    let mut box_layers: Vec<Spec> = match box_plot_type {
        BoxPlotType::Tukey(_) => Vec::new(),
        BoxPlotType::MinMax | BoxPlotType::KIqr(_) => whisker_layers.clone(),
    };
    let box_mark = MarkDef::new(Mark::Bar)
        .with_opt("size", size_value.clone())
        .with("orient", json!(box_orient))
        .with_opt("invalid", invalid.clone())
        .with("ariaRoleDescription", json!("box"));
    box_layers.extend(box_factory.make_part(PartSpec {
        part: "box",
        mark: box_mark,
        position_prefix: "lower_box",
        end_position_prefix: Some("upper_box"),
        extra_encoding: five_summary_tooltip.clone(),
    }));
    let median_color = config
        .boxplot
        .median
        .as_ref()
        .and_then(|median| median.get("color"))
        .filter(|color| !color.is_null())
        .cloned();
    let median_mark = MarkDef::new(Mark::Tick)
        .with_opt("invalid", invalid.clone())
        .with_opt("color", median_color)
        .with_opt("size", size_value)
        .with("orient", json!(ticks_orient))
        .with("aria", json!(false));
    box_layers.extend(mid_tick_factory.make_part(PartSpec {
        part: "median",
        mark: median_mark,
        position_prefix: "mid_box",
        end_position_prefix: None,
        extra_encoding: five_summary_tooltip,
    }));

    let k = match box_plot_type {
        BoxPlotType::Tukey(k) => k,
        BoxPlotType::MinMax | BoxPlotType::KIqr(_) => {
            let transform = unit.transform.iter().cloned().chain(transform).collect();
            return Ok(outer_layer(unit, transform, box_layers));
        }
    };

    // Tukey boxplot
    let lower_box_expr = access_with_datum_to_unescaped_path(&format!("lower_box_{field}"));
    let upper_box_expr = access_with_datum_to_unescaped_path(&format!("upper_box_{field}"));
    let iqr_expr = format!("({upper_box_expr} - {lower_box_expr})");
    let k = format_number(k);
    let lower_whisker_expr = format!("{lower_box_expr} - {k} * {iqr_expr}");
    let upper_whisker_expr = format!("{upper_box_expr} + {k} * {iqr_expr}");
    let field_expr = access_with_datum_to_unescaped_path(&field);

    let joinaggregate = Transform::JoinAggregate(JoinAggregateTransform {
        joinaggregate: quartiles(&field, &aliased),
        groupby: groupby.clone(),
    });
    let mut whisker_aggregate = vec![
        AggregatedFieldDef::new(AggregateOp::Min, &field, format!("lower_whisker_{aliased}")),
        AggregatedFieldDef::new(AggregateOp::Max, &field, format!("upper_whisker_{aliased}")),
        // Keep the box bounds for the whisker rules
        AggregatedFieldDef::new(
            AggregateOp::Min,
            format!("lower_box_{field}"),
            format!("lower_box_{aliased}"),
        ),
        AggregatedFieldDef::new(
            AggregateOp::Max,
            format!("upper_box_{field}"),
            format!("upper_box_{aliased}"),
        ),
    ];
    whisker_aggregate.extend(aggregate);
    let mut filtered_whisker = LayerSpec::new(whisker_layers).with_transform(vec![
        Transform::filter(format!(
            "({lower_whisker_expr} <= {field_expr}) && ({field_expr} <= {upper_whisker_expr})"
        )),
        Transform::Aggregate(AggregateTransform {
            aggregate: whisker_aggregate,
            groupby,
        }),
    ]);

    let mut outlier_encoding = Encoding::default();
    outlier_encoding.insert(continuous_axis.channel, outlier_axis_def(&continuous_axis.def));
    let mut outlier_encoding = outlier_encoding.merged(&encoding_without_size_color.without(&[Channel::Tooltip]));
    if let Some(color) = color {
        outlier_encoding.insert(Channel::Color, color);
    }
    if let Some(tooltip) = custom_tooltip_without_aggregated_field {
        outlier_encoding.insert(Channel::Tooltip, tooltip);
    }
    let outliers = part_layer_mixins(
        &mark_def,
        "outliers",
        &config.boxplot,
        PartBase {
            mark: MarkDef::new(Mark::Point),
            encoding: outlier_encoding,
            transform: vec![Transform::filter(format!(
                "({field_expr} < {lower_whisker_expr}) || ({field_expr} > {upper_whisker_expr})"
            ))],
        },
    );

    let mut filtered_transforms = bins;
    filtered_transforms.extend(time_units);
    filtered_transforms.push(joinaggregate);
    let filtered_layers = match outliers {
        Some(outliers) => LayerSpec::new(vec![Spec::from(outliers), Spec::from(filtered_whisker)])
            .with_transform(filtered_transforms),
        None => {
            filtered_transforms.append(&mut filtered_whisker.transform);
            filtered_whisker.transform = filtered_transforms;
            filtered_whisker
        }
    };

    Ok(outer_layer(
        unit,
        unit.transform.clone(),
        vec![
            Spec::from(filtered_layers),
            Spec::from(LayerSpec::new(box_layers).with_transform(transform)),
        ],
    ))
}

/// Continuous axis of the outlier points: the raw field with the axis title
/// moved onto the field definition
fn outlier_axis_def(def: &FieldDef) -> FieldDef {
    let axis = def.axis.as_ref().and_then(|axis| match axis {
        Value::Object(axis) => {
            let mut axis = axis.clone();
            axis.remove("title");
            (!axis.is_empty()).then_some(Value::Object(axis))
        }
        other => Some(other.clone()),
    });
    FieldDef {
        field: def.field.clone(),
        type_: def.type_,
        title: Some(get_title(def)),
        scale: def.scale.clone(),
        axis,
        ..Default::default()
    }
}
