/*
 * VlFusion
 * Copyright (C) 2022 VegaFusion Technologies LLC
 *
 * This program is distributed under multiple licenses.
 * Please consult the license documentation provided alongside
 * this program the details of the active license.
 */
use crate::spec::transform::FieldPredicate;
use itertools::Itertools;
use serde_json::Value;
use std::collections::HashSet;
use vlfusion_common::error::{Result, ResultWithContext, VlFusionError};
use vlfusion_common::escape::{access_with_datum_to_unescaped_path, flat_access_with_datum};

/// `isValid(ref) && isFinite(+ref)`
pub fn is_valid_finite_number_expr(field_ref: &str) -> String {
    format!("isValid({field_ref}) && isFinite(+{field_ref})")
}

/// Predicate that holds for valid values of a field, or for invalid values when
/// `valid` is false
pub fn field_valid_predicate(field_ref: &str, valid: bool) -> String {
    if valid {
        is_valid_finite_number_expr(field_ref)
    } else {
        format!("!isValid({field_ref}) || !isFinite(+{field_ref})")
    }
}

/// Expression accessing an unescaped field name on `datum`
pub fn datum_access(path: &str) -> String {
    access_with_datum_to_unescaped_path(path)
}

pub fn and_all<I, S>(exprs: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_exprs(exprs, " && ")
}

pub fn or_all<I, S>(exprs: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    join_exprs(exprs, " || ")
}

fn join_exprs<I, S>(exprs: I, sep: &str) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut exprs = exprs
        .into_iter()
        .filter(|expr| !expr.as_ref().is_empty())
        .peekable();
    exprs.peek()?;
    Some(exprs.map(|expr| expr.as_ref().to_string()).join(sep))
}

/// Expression equivalent of a field predicate, with all comparisons combined
/// by `&&`
pub fn field_predicate_expr(predicate: &FieldPredicate) -> Result<Option<String>> {
    let field = flat_access_with_datum(&predicate.field, "datum")?;
    let mut exprs: Vec<String> = Vec::new();
    if let Some(equal) = &predicate.equal {
        exprs.push(format!("{field}==={equal}"));
    }
    if let Some(lt) = predicate.lt {
        exprs.push(format!("{field}<{lt}"));
    }
    if let Some(lte) = predicate.lte {
        exprs.push(format!("{field}<={lte}"));
    }
    if let Some(gt) = predicate.gt {
        exprs.push(format!("{field}>{gt}"));
    }
    if let Some(gte) = predicate.gte {
        exprs.push(format!("{field}>={gte}"));
    }
    if let Some([lo, hi]) = predicate.range {
        exprs.push(format!("inrange({field}, [{lo}, {hi}])"));
    }
    if let Some(one_of) = &predicate.one_of {
        let values = serde_json::to_string(one_of)?;
        exprs.push(format!("indexof({values}, {field}) !== -1"));
    }
    if let Some(valid) = predicate.valid {
        exprs.push(if valid {
            format!("{field}!==null && !isNaN({field})")
        } else {
            format!("{field}===null || isNaN({field})")
        });
    }
    Ok(and_all(exprs))
}

/// Expression for a predicate: an expression string, a field predicate or a
/// `not`/`and`/`or` composition of predicates
pub fn predicate_expr(predicate: &Value) -> Result<String> {
    let Value::Object(obj) = predicate else {
        return match predicate {
            Value::String(expr) => Ok(expr.clone()),
            _ => Err(VlFusionError::specification(format!(
                "Unsupported predicate: {predicate}"
            ))),
        };
    };
    if let Some(inner) = obj.get("not") {
        return Ok(format!("!({})", predicate_expr(inner)?));
    }
    for (op, sep) in [("and", " && "), ("or", " || ")] {
        if let Some(Value::Array(operands)) = obj.get(op) {
            let exprs = operands
                .iter()
                .map(|operand| Ok(format!("({})", predicate_expr(operand)?)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(exprs.join(sep));
        }
    }
    if obj.contains_key("param") {
        return Err(VlFusionError::specification(
            "Parameter predicates are not supported",
        ));
    }
    let field_predicate: FieldPredicate = serde_json::from_value(predicate.clone())
        .with_context(|| format!("Unsupported predicate: {predicate}"))?;
    Ok(field_predicate_expr(&field_predicate)?.unwrap_or_else(|| "true".to_string()))
}

/// Fields read from `datum` by an expression, found by scanning for
/// `datum.name`, `datum['name']` and `datum["name"]` accessors.
pub fn datum_fields(expr: &str) -> HashSet<String> {
    let mut fields = HashSet::new();
    let chars: Vec<char> = expr.chars().collect();
    let mut i = 0;
    while let Some(offset) = find_from(&chars, i, "datum") {
        let preceded_by_ident = offset > 0 && is_ident_char(chars[offset - 1]);
        let mut j = offset + "datum".len();
        i = j;
        if preceded_by_ident {
            continue;
        }
        match chars.get(j) {
            Some('.') => {
                j += 1;
                let start = j;
                while j < chars.len() && is_ident_char(chars[j]) {
                    j += 1;
                }
                if j > start {
                    fields.insert(chars[start..j].iter().collect());
                }
            }
            Some('[') => {
                let Some(&quote) = chars.get(j + 1).filter(|c| **c == '\'' || **c == '"') else {
                    continue;
                };
                j += 2;
                let mut name = String::new();
                while j < chars.len() && chars[j] != quote {
                    if chars[j] == '\\' && j + 1 < chars.len() {
                        j += 1;
                    }
                    name.push(chars[j]);
                    j += 1;
                }
                fields.insert(name);
            }
            _ => {}
        }
        i = j;
    }
    fields
}

fn find_from(chars: &[char], from: usize, pattern: &str) -> Option<usize> {
    let pattern: Vec<char> = pattern.chars().collect();
    if chars.len() < pattern.len() {
        return None;
    }
    (from..=chars.len() - pattern.len()).find(|&i| chars[i..i + pattern.len()] == pattern[..])
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::transform::FieldPredicate;
    use serde_json::json;

    #[test]
    fn test_validity_exprs() {
        assert_eq!(
            is_valid_finite_number_expr("datum[\"a\"]"),
            "isValid(datum[\"a\"]) && isFinite(+datum[\"a\"])"
        );
        assert_eq!(
            field_valid_predicate("datum[\"a\"]", false),
            "!isValid(datum[\"a\"]) || !isFinite(+datum[\"a\"])"
        );
        assert_eq!(datum_access("mid_box_a"), "datum['mid_box_a']");
    }

    #[test]
    fn test_joiners() {
        assert_eq!(and_all(["a", "b"]), Some("a && b".to_string()));
        assert_eq!(or_all(["a", "", "b"]), Some("a || b".to_string()));
        assert_eq!(and_all(Vec::<String>::new()), None);
    }

    #[test]
    fn test_field_predicate() {
        let predicate: FieldPredicate =
            serde_json::from_value(json!({"field": "a", "gte": 1, "lt": 3})).unwrap();
        assert_eq!(
            field_predicate_expr(&predicate).unwrap(),
            Some(r#"datum["a"]<3 && datum["a"]>=1"#.to_string())
        );
    }

    #[test]
    fn test_logical_composition() {
        let predicate = json!({"and": [
            "datum.a > 1",
            {"not": {"field": "b", "equal": "x"}}
        ]});
        assert_eq!(
            predicate_expr(&predicate).unwrap(),
            r#"(datum.a > 1) && (!(datum["b"]==="x"))"#
        );
        assert!(predicate_expr(&json!({"param": "brush"})).is_err());
        assert!(predicate_expr(&json!(3)).is_err());
    }

    #[test]
    fn test_datum_fields() {
        let fields = datum_fields("datum.a > 1 && datum['b c'] < datum[\"d\"] && mydatum.e");
        let mut fields: Vec<_> = fields.into_iter().collect();
        fields.sort();
        assert_eq!(fields, vec!["a", "b c", "d"]);
    }
}
