use crate::error::{Result, VlFusionError};

pub fn escape_field(col: &str) -> String {
    // Escape single quote, double quote, period, and brackets with a backslash
    col.replace('\'', "\\'")
        .replace('\"', "\\\"")
        .replace('.', "\\.")
        .replace('[', "\\[")
        .replace(']', "\\]")
}

/// Split a field access path like `a.b`, `a["b.c"]` or `a\.b` into its
/// unescaped segments.
pub fn split_access_path(path: &str) -> Result<Vec<String>> {
    let chars: Vec<char> = path.chars().collect();
    let n = chars.len();
    let slice = |from: usize, to: usize| -> String {
        let to = to.min(n);
        let from = from.min(to);
        chars[from..to].iter().collect()
    };

    let mut segments: Vec<String> = Vec::new();
    let mut prefix = String::new();
    let mut quote: Option<char> = None;
    // 0 outside brackets, -1 right after a closing quote, otherwise the index
    // of the first character inside the open bracket
    let mut bracket: isize = 0;
    let mut i: usize = 0;
    let mut j: usize = 0;

    while j < n {
        let c = chars[j];
        if c == '\\' {
            prefix.push_str(&slice(i, j));
            j += 1;
            i = j;
        } else if Some(c) == quote {
            segments.push(format!("{}{}", std::mem::take(&mut prefix), slice(i, j)));
            i = j + 1;
            quote = None;
            bracket = -1;
        } else if quote.is_some() {
            // inside quotes
        } else if i as isize == bracket && (c == '"' || c == '\'') {
            i = j + 1;
            quote = Some(c);
        } else if c == '.' && bracket == 0 {
            if j > i {
                segments.push(format!("{}{}", std::mem::take(&mut prefix), slice(i, j)));
            }
            i = j + 1;
        } else if c == '[' {
            if j > i {
                segments.push(format!("{}{}", std::mem::take(&mut prefix), slice(i, j)));
            }
            i = j + 1;
            bracket = i as isize;
        } else if c == ']' {
            if bracket == 0 {
                return Err(VlFusionError::specification(format!(
                    "Access path missing open bracket: {path}"
                )));
            }
            if bracket > 0 {
                segments.push(format!("{}{}", std::mem::take(&mut prefix), slice(i, j)));
            }
            bracket = 0;
            i = j + 1;
        }
        j += 1;
    }

    if bracket != 0 {
        return Err(VlFusionError::specification(format!(
            "Access path missing closing bracket: {path}"
        )));
    }
    if quote.is_some() {
        return Err(VlFusionError::specification(format!(
            "Access path missing closing quote: {path}"
        )));
    }
    if j > i {
        segments.push(format!("{}{}", prefix, slice(i, j + 1)));
    }
    Ok(segments)
}

/// Render a string as a JSON string literal, suitable for embedding in an expression
pub fn string_value(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Flatten a nested access path into a single (unescaped) field name
pub fn remove_path_from_field(path: &str) -> Result<String> {
    Ok(split_access_path(path)?.join("."))
}

/// Flatten a nested access path into a single field name, escaping periods
/// so the renderer treats the result as one field
pub fn replace_path_in_field(path: &str) -> Result<String> {
    Ok(split_access_path(path)?
        .iter()
        .map(|segment| escape_field(segment))
        .collect::<Vec<_>>()
        .join("\\."))
}

/// Access a flattened field on a datum object, e.g. `datum["a.b"]`
pub fn flat_access_with_datum(path: &str, datum: &str) -> Result<String> {
    let flat = split_access_path(path)?.join(".");
    Ok(format!("{datum}[{}]", string_value(&flat)))
}

/// Access an already unescaped field name on `datum`, e.g. `datum['lower_box_a.b']`
pub fn access_with_datum_to_unescaped_path(unescaped_path: &str) -> String {
    format!("datum['{}']", unescaped_path.replace('\'', "\\'"))
}

#[cfg(test)]
mod tests {
    use crate::escape::{
        access_with_datum_to_unescaped_path, escape_field, flat_access_with_datum,
        remove_path_from_field, replace_path_in_field, split_access_path,
    };

    #[test]
    fn test_escape() {
        let col = "'foo'_._\"bar\"";
        let escaped = escape_field(col);
        assert_eq!(escaped, r#"\'foo\'_\._\"bar\""#)
    }

    #[test]
    fn test_split_access_path() {
        assert_eq!(split_access_path("a").unwrap(), vec!["a"]);
        assert_eq!(split_access_path("a.b").unwrap(), vec!["a", "b"]);
        assert_eq!(split_access_path("a[0]").unwrap(), vec!["a", "0"]);
        assert_eq!(split_access_path("a['b.c']").unwrap(), vec!["a", "b.c"]);
        assert_eq!(split_access_path(r"a\.b").unwrap(), vec!["a.b"]);
        assert_eq!(split_access_path("a b").unwrap(), vec!["a b"]);
    }

    #[test]
    fn test_split_access_path_errors() {
        assert!(split_access_path("a]").is_err());
        assert!(split_access_path("a[0").is_err());
        assert!(split_access_path("a['b").is_err());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(remove_path_from_field("a.b").unwrap(), "a.b");
        assert_eq!(remove_path_from_field(r"a\.b").unwrap(), "a.b");
        assert_eq!(replace_path_in_field("a.b").unwrap(), r"a\.b");
        assert_eq!(
            flat_access_with_datum("a.b", "datum").unwrap(),
            r#"datum["a.b"]"#
        );
        assert_eq!(
            access_with_datum_to_unescaped_path("lower_box_it's"),
            r"datum['lower_box_it\'s']"
        );
    }
}
