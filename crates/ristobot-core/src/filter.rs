//! Boolean filter expressions over result rows.
//!
//! Filters use the vector database's expression syntax (`book_id == 1`,
//! `word_count > 10 and sentence == 'pera'`, `book_id in [0, 2]`). Backends
//! that evaluate filters locally translate the `and`/`or` keywords to JEXL
//! operators and evaluate the result with `jexl_eval` against the row.
//!
//! Rows are always passed as context objects, never interpolated into
//! expression strings.

use serde_json::Value;

use ristobot_types::entity::Row;
use ristobot_types::search::PrimaryKey;

/// Errors that can occur during filter evaluation.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("filter evaluation failed: {0}")]
    EvalFailed(String),

    #[error("filter is empty")]
    Empty,
}

/// Build an equality filter on one field (`field == literal`).
pub fn eq_filter(field: &str, key: &PrimaryKey) -> String {
    format!("{field} == {}", key.to_filter_literal())
}

/// Evaluates filter expressions against rows.
pub struct FilterEvaluator {
    evaluator: jexl_eval::Evaluator<'static>,
}

impl FilterEvaluator {
    pub fn new() -> Self {
        Self {
            evaluator: jexl_eval::Evaluator::new(),
        }
    }

    /// Whether `row` satisfies `expression`.
    ///
    /// Non-boolean results are coerced with JavaScript-like truthiness.
    pub fn matches(&self, expression: &str, row: &Row) -> Result<bool, FilterError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Err(FilterError::Empty);
        }

        let translated = translate_keywords(expression);
        let context = numbers_as_floats(Value::Object(row.clone()));
        let result = self
            .evaluator
            .eval_in_context(&translated, &context)
            .map_err(|e| FilterError::EvalFailed(format!("{expression}: {e}")))?;

        Ok(truthy(&result))
    }
}

impl Default for FilterEvaluator {
    fn default() -> Self {
        Self::new()
    }
}

/// Rewrite `and`/`or` keywords outside string literals to `&&`/`||`.
fn translate_keywords(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len());
    let mut word = String::new();
    let mut quote: Option<char> = None;
    let mut escaped = false;

    let flush_word = |word: &mut String, out: &mut String| {
        match word.to_ascii_lowercase().as_str() {
            "and" => out.push_str("&&"),
            "or" => out.push_str("||"),
            _ => out.push_str(word),
        }
        word.clear();
    };

    for c in expression.chars() {
        if let Some(q) = quote {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }

        if c.is_alphanumeric() || c == '_' {
            word.push(c);
            continue;
        }

        flush_word(&mut word, &mut out);
        if c == '\'' || c == '"' {
            quote = Some(c);
        }
        out.push(c);
    }
    flush_word(&mut word, &mut out);
    out
}

/// JEXL number literals are floats; stored integers must compare equal to them.
fn numbers_as_floats(value: Value) -> Value {
    match value {
        Value::Number(n) => n
            .as_f64()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Value::Array(items) => Value::Array(items.into_iter().map(numbers_as_floats).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, numbers_as_floats(v)))
                .collect(),
        ),
        other => other,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().unwrap_or(0.0) != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_translate_keywords() {
        assert_eq!(
            translate_keywords("a == 1 and b == 2 or c == 3"),
            "a == 1 && b == 2 || c == 3"
        );
        assert_eq!(translate_keywords("brand == 'and or'"), "brand == 'and or'");
        assert_eq!(translate_keywords("android == 1"), "android == 1");
        assert_eq!(translate_keywords("x == 1 AND y == 2"), "x == 1 && y == 2");
    }

    #[test]
    fn test_integer_equality_matches() {
        let eval = FilterEvaluator::new();
        let r = row(json!({ "book_id": 1, "word_count": 42, "sentence": "pera" }));
        assert!(eval.matches("book_id == 1", &r).unwrap());
        assert!(!eval.matches("book_id == 2", &r).unwrap());
    }

    #[test]
    fn test_string_and_comparison() {
        let eval = FilterEvaluator::new();
        let r = row(json!({ "book_id": 1, "word_count": 42, "sentence": "pera" }));
        assert!(eval.matches("word_count > 10 and sentence == 'pera'", &r).unwrap());
        assert!(!eval.matches("word_count > 50 and sentence == 'pera'", &r).unwrap());
        assert!(eval.matches("word_count > 50 or sentence == 'pera'", &r).unwrap());
    }

    #[test]
    fn test_empty_filter_rejected() {
        let eval = FilterEvaluator::new();
        let r = row(json!({ "book_id": 1 }));
        assert!(matches!(eval.matches("  ", &r), Err(FilterError::Empty)));
    }

    #[test]
    fn test_eq_filter_literal() {
        assert_eq!(eq_filter("book_id", &PrimaryKey::Int(2)), "book_id == 2");
        assert_eq!(
            eq_filter("name", &PrimaryKey::Str("pera".into())),
            "name == 'pera'"
        );
    }
}
