/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Arc,
    Area,
    Bar,
    Image,
    Line,
    Point,
    Rect,
    Rule,
    Text,
    Tick,
    Trail,
    Circle,
    Square,
    Geoshape,
    Boxplot,
    #[serde(rename = "errorbar")]
    ErrorBar,
    #[serde(rename = "errorband")]
    ErrorBand,
}

impl Mark {
    pub fn name(&self) -> &'static str {
        match self {
            Mark::Arc => "arc",
            Mark::Area => "area",
            Mark::Bar => "bar",
            Mark::Image => "image",
            Mark::Line => "line",
            Mark::Point => "point",
            Mark::Rect => "rect",
            Mark::Rule => "rule",
            Mark::Text => "text",
            Mark::Tick => "tick",
            Mark::Trail => "trail",
            Mark::Circle => "circle",
            Mark::Square => "square",
            Mark::Geoshape => "geoshape",
            Mark::Boxplot => "boxplot",
            Mark::ErrorBar => "errorbar",
            Mark::ErrorBand => "errorband",
        }
    }

    pub fn is_composite(&self) -> bool {
        matches!(self, Mark::Boxplot | Mark::ErrorBar | Mark::ErrorBand)
    }

    /// Marks drawn as a single connected path
    pub fn is_path(&self) -> bool {
        matches!(self, Mark::Line | Mark::Area | Mark::Trail)
    }

    /// Renderer mark type of a primitive mark
    pub fn vg_mark(&self) -> &'static str {
        match self {
            Mark::Bar | Mark::Tick => "rect",
            Mark::Point | Mark::Circle | Mark::Square => "symbol",
            Mark::Geoshape => "shape",
            Mark::Line => "line",
            Mark::Area => "area",
            Mark::Trail => "trail",
            Mark::Rect => "rect",
            Mark::Rule => "rule",
            Mark::Text => "text",
            Mark::Image => "image",
            Mark::Arc => "arc",
            Mark::Boxplot | Mark::ErrorBar | Mark::ErrorBand => "group",
        }
    }
}

impl Display for Mark {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orient {
    Horizontal,
    Vertical,
}

impl Orient {
    pub fn flip(&self) -> Orient {
        match self {
            Orient::Horizontal => Orient::Vertical,
            Orient::Vertical => Orient::Horizontal,
        }
    }
}

/// Mark definition object: a mark type plus mark properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkDef {
    #[serde(rename = "type")]
    pub type_: Mark,

    #[serde(flatten)]
    pub props: Map<String, Value>,
}

impl MarkDef {
    pub fn new(type_: Mark) -> Self {
        Self {
            type_,
            props: Default::default(),
        }
    }

    /// Set a property
    pub fn with<S: Into<String>>(mut self, prop: S, value: Value) -> Self {
        self.props.insert(prop.into(), value);
        self
    }

    /// Add a property only when a value is present
    pub fn with_opt<S: Into<String>>(mut self, prop: S, value: Option<Value>) -> Self {
        if let Some(value) = value {
            self.props.insert(prop.into(), value);
        }
        self
    }

    pub fn get(&self, prop: &str) -> Option<&Value> {
        self.props.get(prop)
    }

    pub fn orient(&self) -> Option<Orient> {
        self.get("orient")
            .and_then(|orient| serde_json::from_value(orient.clone()).ok())
    }

    pub fn is_path(&self) -> bool {
        self.type_.is_path()
    }
}

/// Mark as written in a spec: a bare mark type or a mark definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnyMark {
    Mark(Mark),
    Def(MarkDef),
}

impl AnyMark {
    pub fn mark_type(&self) -> Mark {
        match self {
            AnyMark::Mark(mark) => *mark,
            AnyMark::Def(def) => def.type_,
        }
    }

    pub fn to_mark_def(&self) -> MarkDef {
        match self {
            AnyMark::Mark(mark) => MarkDef::new(*mark),
            AnyMark::Def(def) => def.clone(),
        }
    }
}

impl From<MarkDef> for AnyMark {
    fn from(def: MarkDef) -> Self {
        AnyMark::Def(def)
    }
}

#[cfg(test)]
mod tests {
    use crate::spec::mark::{AnyMark, Mark, Orient};
    use serde_json::json;

    #[test]
    fn test_parse_any_mark() {
        let mark: AnyMark = serde_json::from_value(json!("boxplot")).unwrap();
        assert_eq!(mark.mark_type(), Mark::Boxplot);

        let mark: AnyMark =
            serde_json::from_value(json!({"type": "errorbar", "orient": "horizontal"})).unwrap();
        let def = mark.to_mark_def();
        assert_eq!(def.type_, Mark::ErrorBar);
        assert_eq!(def.orient(), Some(Orient::Horizontal));
        assert!(def.type_.is_composite());
    }
}
