//! Formatting and validation utilities
//!
//! Pure helpers shared by the gateways and the order workflow: nickname
//! normalization, lenient numeric parsing of spreadsheet cells, integer
//! clamping for user input and the point-accrual formula.

use serde_json::Value;

/// Points granted per clip before the volume bonus
const POINTS_PER_CLIP: f64 = 50.0;

/// Bonus rate applied per additional clip
const BONUS_RATE: f64 = 0.03;

/// Normalize a nickname for comparison: trimmed and lowercased
pub fn normalize_nick(nick: &str) -> String {
    nick.trim().to_lowercase()
}

/// Normalize a ledger cell holding a nickname
///
/// Missing cells and non-string values normalize to the empty string.
pub fn nick_from_cell(cell: Option<&Value>) -> String {
    match cell {
        Some(Value::String(s)) => normalize_nick(s),
        _ => String::new(),
    }
}

/// Parse a points cell into a number
///
/// Numbers pass through. Strings may use a comma as the decimal separator
/// and blank strings count as zero. Anything else, including missing and
/// null cells, yields `f64::NAN`.
pub fn parse_points(cell: Option<&Value>) -> f64 {
    match cell {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(f64::NAN),
        Some(Value::String(s)) => parse_points_str(s),
        _ => f64::NAN,
    }
}

/// String form of [`parse_points`]
pub fn parse_points_str(raw: &str) -> f64 {
    let cleaned = raw.trim().replacen(',', ".", 1);
    if cleaned.is_empty() {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => f64::NAN,
    }
}

/// Parse the leading integer of a string, ignoring any trailing garbage
///
/// `"  42abc"` is 42, `"-5"` is -5, `"1.9"` is 1 and `"abc"` is `None`.
/// Values beyond the `i64` range saturate.
pub fn leading_integer(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let digits_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    if digits_len == 0 {
        return None;
    }

    let digits = &rest[..digits_len];
    let value = match digits.parse::<i64>() {
        Ok(v) if negative => -v,
        Ok(v) => v,
        Err(_) if negative => i64::MIN,
        Err(_) => i64::MAX,
    };
    Some(value)
}

/// Parse user input as an integer and clamp it into `[min, max]`
///
/// Unparseable input falls back to `min`.
pub fn clamp_integer(raw: &str, min: i64, max: i64) -> i64 {
    match leading_integer(raw) {
        Some(v) => v.clamp(min, max),
        None => min,
    }
}

/// Points accrued for `clips` clips: `50n + 0.03 * 50n * (n - 1)`, rounded
///
/// Callers clamp the input to at least 1; zero is treated as one clip.
pub fn accrued_points(clips: u32) -> u64 {
    let n = f64::from(clips.max(1));
    let base = POINTS_PER_CLIP * n;
    let bonus = BONUS_RATE * base * (n - 1.0);
    (base + bonus).round() as u64
}

/// JSON truthiness as the storefront backends use it for their `ok` flags
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Keep at most `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accrued_points_fixture() {
        assert_eq!(accrued_points(1), 50);
        assert_eq!(accrued_points(2), 103);
        assert_eq!(accrued_points(3), 159);
        assert_eq!(accrued_points(4), 218);
    }

    #[test]
    fn test_accrued_points_zero_counts_as_one() {
        assert_eq!(accrued_points(0), 50);
    }

    #[test]
    fn test_normalize_nick() {
        assert_eq!(normalize_nick(" FooBar "), "foobar");
        assert_eq!(normalize_nick(""), "");
        assert_eq!(nick_from_cell(Some(&Value::Null)), "");
        assert_eq!(nick_from_cell(None), "");
        assert_eq!(nick_from_cell(Some(&json!(42))), "");
        assert_eq!(nick_from_cell(Some(&json!("  Yammy\t"))), "yammy");
    }

    #[test]
    fn test_parse_points() {
        assert_eq!(parse_points(Some(&json!("12,5"))), 12.5);
        assert_eq!(parse_points(Some(&json!(" 300 "))), 300.0);
        assert_eq!(parse_points(Some(&json!(750))), 750.0);
        assert_eq!(parse_points(Some(&json!(""))), 0.0);
        assert!(parse_points(Some(&json!("abc"))).is_nan());
        assert!(parse_points(Some(&Value::Null)).is_nan());
        assert!(parse_points(None).is_nan());
        assert!(parse_points(Some(&json!(true))).is_nan());
        assert!(parse_points(Some(&json!("inf"))).is_nan());
    }

    #[test]
    fn test_clamp_integer() {
        assert_eq!(clamp_integer("abc", 0, 10), 0);
        assert_eq!(clamp_integer("15", 0, 10), 10);
        assert_eq!(clamp_integer("-5", 0, 10), 0);
        assert_eq!(clamp_integer(" 7 clips", 0, 10), 7);
        assert_eq!(clamp_integer("3.9", 0, 10), 3);
        assert_eq!(clamp_integer("99999999999999999999999", 0, 9999), 9999);
    }

    #[test]
    fn test_leading_integer() {
        assert_eq!(leading_integer("42abc"), Some(42));
        assert_eq!(leading_integer("+8"), Some(8));
        assert_eq!(leading_integer("-"), None);
        assert_eq!(leading_integer(""), None);
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&json!(true)));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("yes")));
        assert!(is_truthy(&json!({})));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&Value::Null));
    }

    #[test]
    fn test_truncate_chars_counts_characters() {
        assert_eq!(truncate_chars("привет", 3), "при");
        assert_eq!(truncate_chars("ok", 200), "ok");
    }
}
