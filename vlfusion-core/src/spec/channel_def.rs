/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::field_def::{explicit_null, FieldDef, FieldType};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use vlfusion_common::error::Result;

/// Definition of a constant data value bound to an encoding channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatumDef {
    pub datum: Value,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<FieldType>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub title: Option<Value>,

    #[serde(
        default,
        deserialize_with = "explicit_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub scale: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Conditions>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DatumDef {
    pub fn is_continuous(&self) -> bool {
        self.type_.is_some_and(|t| t.is_continuous())
    }

    pub fn is_for_time_format(&self) -> bool {
        self.type_ == Some(FieldType::Temporal)
    }
}

/// Definition of a constant visual value, possibly with conditions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ValueDef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<Conditions>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ValueDef {
    pub fn new(value: Value) -> Self {
        Self {
            value: Some(value),
            ..Default::default()
        }
    }
}

/// One conditional branch of a channel definition. The branch target is a
/// field, datum or value definition stored alongside the predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conditional {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub empty: Option<bool>,

    #[serde(flatten)]
    pub target: Map<String, Value>,
}

impl Conditional {
    pub fn with_test<S: Into<String>>(test: S, target: ChannelDef) -> Result<Self> {
        let target = match serde_json::to_value(target)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        Ok(Self {
            test: Some(Value::String(test.into())),
            param: None,
            empty: None,
            target,
        })
    }

    /// The channel definition applied when the predicate holds
    pub fn target_def(&self) -> Result<ChannelDef> {
        Ok(serde_json::from_value(Value::Object(self.target.clone()))?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conditions {
    List(Vec<Conditional>),
    Single(Box<Conditional>),
}

impl Conditions {
    pub fn to_vec(&self) -> Vec<Conditional> {
        match self {
            Conditions::List(list) => list.clone(),
            Conditions::Single(single) => vec![single.as_ref().clone()],
        }
    }
}

/// Channel definition: a field, a datum or a value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ChannelDef {
    Field(FieldDef),
    Datum(DatumDef),
    Value(ValueDef),
}

impl<'de> Deserialize<'de> for ChannelDef {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let Value::Object(map) = &value else {
            return Err(D::Error::custom(format!(
                "Channel definition must be an object, received {value}"
            )));
        };
        if map.contains_key("field") || map.contains_key("aggregate") {
            FieldDef::deserialize(value)
                .map(ChannelDef::Field)
                .map_err(D::Error::custom)
        } else if map.contains_key("datum") {
            DatumDef::deserialize(value)
                .map(ChannelDef::Datum)
                .map_err(D::Error::custom)
        } else {
            ValueDef::deserialize(value)
                .map(ChannelDef::Value)
                .map_err(D::Error::custom)
        }
    }
}

impl From<FieldDef> for ChannelDef {
    fn from(field_def: FieldDef) -> Self {
        ChannelDef::Field(field_def)
    }
}

impl From<ValueDef> for ChannelDef {
    fn from(value_def: ValueDef) -> Self {
        ChannelDef::Value(value_def)
    }
}

impl ChannelDef {
    pub fn as_field_def(&self) -> Option<&FieldDef> {
        match self {
            ChannelDef::Field(field_def) => Some(field_def),
            _ => None,
        }
    }

    pub fn as_datum_def(&self) -> Option<&DatumDef> {
        match self {
            ChannelDef::Datum(datum_def) => Some(datum_def),
            _ => None,
        }
    }

    /// The definition itself when it is a field definition, otherwise the
    /// first field definition among its conditions
    pub fn field_def(&self) -> Result<Option<FieldDef>> {
        if let ChannelDef::Field(def) = self {
            return Ok(Some(def.clone()));
        }
        if let Some(conditions) = self.condition() {
            for condition in conditions.to_vec() {
                if let ChannelDef::Field(def) = condition.target_def()? {
                    return Ok(Some(def));
                }
            }
        }
        Ok(None)
    }

    pub fn condition(&self) -> Option<&Conditions> {
        match self {
            ChannelDef::Field(def) => def.condition.as_ref(),
            ChannelDef::Datum(def) => def.condition.as_ref(),
            ChannelDef::Value(def) => def.condition.as_ref(),
        }
    }

    pub fn is_conditional(&self) -> bool {
        self.condition().is_some()
    }

    /// Copy of this definition with its conditions removed
    pub fn without_condition(&self) -> ChannelDef {
        let mut def = self.clone();
        match &mut def {
            ChannelDef::Field(def) => def.condition = None,
            ChannelDef::Datum(def) => def.condition = None,
            ChannelDef::Value(def) => def.condition = None,
        }
        def
    }

    pub fn field_type(&self) -> Option<FieldType> {
        match self {
            ChannelDef::Field(def) => def.type_,
            ChannelDef::Datum(def) => def.type_,
            ChannelDef::Value(_) => None,
        }
    }

    /// Continuous field or datum, i.e. quantitative or temporal and not binned
    pub fn is_continuous(&self) -> bool {
        match self {
            ChannelDef::Field(def) => def.is_continuous(),
            ChannelDef::Datum(def) => def.is_continuous(),
            ChannelDef::Value(_) => false,
        }
    }

    pub fn is_for_time_format(&self) -> bool {
        match self {
            ChannelDef::Field(def) => def.is_for_time_format(),
            ChannelDef::Datum(def) => def.is_for_time_format(),
            ChannelDef::Value(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::spec::channel_def::ChannelDef;
    use crate::spec::field_def::FieldType;
    use serde_json::json;

    #[test]
    fn test_dispatch_on_keys() {
        let def: ChannelDef =
            serde_json::from_value(json!({"field": "a", "type": "quantitative"})).unwrap();
        assert_eq!(
            def.as_field_def().and_then(|d| d.type_),
            Some(FieldType::Quantitative)
        );

        let def: ChannelDef = serde_json::from_value(json!({"aggregate": "count"})).unwrap();
        assert!(def.as_field_def().is_some_and(|d| d.is_count()));

        let def: ChannelDef = serde_json::from_value(json!({"datum": 10})).unwrap();
        assert!(def.as_datum_def().is_some());

        let def: ChannelDef = serde_json::from_value(json!({"value": "red"})).unwrap();
        assert!(matches!(def, ChannelDef::Value(_)));
    }

    #[test]
    fn test_condition_target() {
        let def: ChannelDef = serde_json::from_value(json!({
            "condition": {"test": "datum.a > 1", "value": "red"},
            "value": "blue"
        }))
        .unwrap();
        assert!(def.is_conditional());
        let conditions = def.condition().unwrap().to_vec();
        assert_eq!(conditions.len(), 1);
        let target = conditions[0].target_def().unwrap();
        assert_eq!(target, serde_json::from_value(json!({"value": "red"})).unwrap());

        // Serializes back to the same shape
        assert_eq!(
            serde_json::to_value(&def).unwrap(),
            json!({"value": "blue", "condition": {"test": "datum.a > 1", "value": "red"}})
        );
    }

    #[test]
    fn test_reject_non_object() {
        assert!(serde_json::from_value::<ChannelDef>(json!("a")).is_err());
    }
}
