use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

// Largest integer an f64 represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Best-effort typing of a raw form value: numeric-looking text becomes a
/// number, `on`/`off` become booleans, anything else stays a string.
///
/// Lossy on purpose: a name like `"42"` turns into the number 42.
pub fn coerce_form_value(raw: &str) -> Value {
    let trimmed = raw.trim();

    if !trimmed.is_empty() {
        if let Ok(number) = trimmed.parse::<f64>() {
            if number.is_finite() {
                if number.fract() == 0.0 && number.abs() <= MAX_SAFE_INTEGER {
                    return Value::from(number as i64);
                }
                if let Some(number) = Number::from_f64(number) {
                    return Value::Number(number);
                }
            }
        }
    }

    match raw {
        "on" => Value::Bool(true),
        "off" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

pub fn coerce_form(fields: BTreeMap<String, String>) -> Map<String, Value> {
    fields
        .into_iter()
        .map(|(key, raw)| {
            let value = coerce_form_value(&raw);
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::coerce_form_value;
    use serde_json::json;

    #[test]
    fn test_numbers_and_switches() {
        assert_eq!(coerce_form_value("30"), json!(30));
        assert_eq!(coerce_form_value(" 2.5 "), json!(2.5));
        assert_eq!(coerce_form_value("on"), json!(true));
        assert_eq!(coerce_form_value("off"), json!(false));
    }

    #[test]
    fn test_text_stays_text() {
        assert_eq!(coerce_form_value("1к8"), json!("1к8"));
        assert_eq!(coerce_form_value(""), json!(""));
        assert_eq!(coerce_form_value("inf"), json!("inf"));
    }
}
