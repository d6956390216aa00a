use serde_json::Value;

/// Promotes plain decimal strings to numbers; everything else passes through.
///
/// After dropping at most one `.`, the rest must be ASCII digits. Signs,
/// exponents, whitespace and empty strings stay text.
pub fn cast_value(raw: &Value) -> Value {
    let Value::String(text) = raw else {
        return raw.clone();
    };

    let digits = text.replacen('.', "", 1);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return raw.clone();
    }

    let parsed = if text.contains('.') {
        text.parse::<f64>().ok().and_then(|f| serde_json::Number::from_f64(f)).map(Value::Number)
    } else {
        text.parse::<i64>()
            .map(Value::from)
            .or_else(|_| text.parse::<u64>().map(Value::from))
            .ok()
    };

    parsed.unwrap_or_else(|| raw.clone())
}
