/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Encoding channel of a Vega-Lite unit specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    X,
    Y,
    X2,
    Y2,
    XOffset,
    YOffset,
    XError,
    XError2,
    YError,
    YError2,
    Theta,
    Theta2,
    Radius,
    Radius2,
    Color,
    Fill,
    Stroke,
    Opacity,
    FillOpacity,
    StrokeOpacity,
    StrokeWidth,
    StrokeDash,
    Size,
    Angle,
    Shape,
    Detail,
    Key,
    Text,
    Tooltip,
    Href,
    Url,
    Description,
    Order,
    Row,
    Column,
    Facet,
}

/// How values of a channel are distributed over its output range, used to
/// infer a default field type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeType {
    Continuous,
    Discrete,
    Flexible,
}

impl Channel {
    pub fn name(&self) -> &'static str {
        use Channel::*;
        match self {
            X => "x",
            Y => "y",
            X2 => "x2",
            Y2 => "y2",
            XOffset => "xOffset",
            YOffset => "yOffset",
            XError => "xError",
            XError2 => "xError2",
            YError => "yError",
            YError2 => "yError2",
            Theta => "theta",
            Theta2 => "theta2",
            Radius => "radius",
            Radius2 => "radius2",
            Color => "color",
            Fill => "fill",
            Stroke => "stroke",
            Opacity => "opacity",
            FillOpacity => "fillOpacity",
            StrokeOpacity => "strokeOpacity",
            StrokeWidth => "strokeWidth",
            StrokeDash => "strokeDash",
            Size => "size",
            Angle => "angle",
            Shape => "shape",
            Detail => "detail",
            Key => "key",
            Text => "text",
            Tooltip => "tooltip",
            Href => "href",
            Url => "url",
            Description => "description",
            Order => "order",
            Row => "row",
            Column => "column",
            Facet => "facet",
        }
    }

    /// Channels that may be bound to a scale
    pub fn is_scale_channel(&self) -> bool {
        use Channel::*;
        matches!(
            self,
            X | Y
                | XOffset
                | YOffset
                | Theta
                | Radius
                | Color
                | Fill
                | Stroke
                | Opacity
                | FillOpacity
                | StrokeOpacity
                | StrokeWidth
                | StrokeDash
                | Size
                | Angle
                | Shape
        )
    }

    pub fn is_xor_y(&self) -> bool {
        matches!(self, Channel::X | Channel::Y)
    }

    pub fn is_position_scale_channel(&self) -> bool {
        matches!(
            self,
            Channel::X | Channel::Y | Channel::XOffset | Channel::YOffset
        )
    }

    pub fn is_non_position_scale_channel(&self) -> bool {
        self.is_scale_channel() && !self.is_position_scale_channel()
    }

    /// x2, y2, theta2 and radius2 share the scale of their primary channel
    pub fn is_secondary_range_channel(&self) -> bool {
        matches!(
            self,
            Channel::X2 | Channel::Y2 | Channel::Theta2 | Channel::Radius2
        )
    }

    /// Secondary channel (e.g. x2 for x) if there is one
    pub fn secondary(&self) -> Option<Channel> {
        match self {
            Channel::X => Some(Channel::X2),
            Channel::Y => Some(Channel::Y2),
            Channel::Theta => Some(Channel::Theta2),
            Channel::Radius => Some(Channel::Radius2),
            _ => None,
        }
    }

    /// Error channel (e.g. xError for x) if there is one
    pub fn error(&self) -> Option<Channel> {
        match self {
            Channel::X => Some(Channel::XError),
            Channel::Y => Some(Channel::YError),
            _ => None,
        }
    }

    /// Second error channel (e.g. xError2 for x) if there is one
    pub fn error2(&self) -> Option<Channel> {
        match self {
            Channel::X => Some(Channel::XError2),
            Channel::Y => Some(Channel::YError2),
            _ => None,
        }
    }

    /// Channels that are allowed to hold a list of channel definitions
    pub fn supports_array(&self) -> bool {
        matches!(self, Channel::Detail | Channel::Tooltip | Channel::Order)
    }

    pub fn range_type(&self) -> RangeType {
        use Channel::*;
        match self {
            X | Y | X2 | Y2 | XOffset | YOffset | XError | XError2 | YError | YError2
            | Theta | Theta2 | Radius | Radius2 | Size | Angle | StrokeWidth | Opacity
            | FillOpacity | StrokeOpacity => RangeType::Continuous,
            Shape | StrokeDash | Detail | Key | Tooltip | Href | Url | Description | Row
            | Column | Facet | Text => RangeType::Discrete,
            Color | Fill | Stroke | Order => RangeType::Flexible,
        }
    }
}

impl Display for Channel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::spec::channel::Channel;

    #[test]
    fn test_channel_names_match_serde() {
        for channel in [
            Channel::X,
            Channel::XError2,
            Channel::FillOpacity,
            Channel::StrokeDash,
            Channel::Tooltip,
        ] {
            let serialized = serde_json::to_value(channel).unwrap();
            assert_eq!(serialized.as_str(), Some(channel.name()));
        }
    }

    #[test]
    fn test_scale_channels() {
        assert!(Channel::Color.is_scale_channel());
        assert!(Channel::X.is_position_scale_channel());
        assert!(Channel::Size.is_non_position_scale_channel());
        assert!(!Channel::Tooltip.is_scale_channel());
        assert!(!Channel::X2.is_scale_channel());
    }
}
