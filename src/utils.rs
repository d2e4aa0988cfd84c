use std::collections::BTreeMap;
use std::str::FromStr;
use tokio::time::Duration;

/// Parses a duration string in the format "30s", "10m", "5h" or a bare number of seconds.
///
/// Supported units:
/// - `s` for seconds
/// - `m` for minutes
/// - `h` for hours
/// - no unit for seconds
pub fn parse_duration_string(s: &str) -> Result<Duration, String> {
    let s = s.trim();

    if s.is_empty() {
        return Err("Duration string cannot be empty".to_string());
    }

    if let Ok(secs) = u64::from_str(s) {
        return Ok(Duration::from_secs(secs));
    }

    let (value_str, unit_char) = match s.char_indices().last() {
        Some((idx, ch)) => (&s[..idx], ch),
        None => return Err("Duration string cannot be empty".to_string()),
    };

    let value = match u64::from_str(value_str) {
        Ok(v) => v,
        Err(_) => {
            return Err(format!(
                "Invalid numeric value in duration: '{}'",
                value_str
            ))
        }
    };

    let multiplier = match unit_char {
        's' => 1,
        'm' => 60,
        'h' => 60 * 60,
        _ => {
            return Err(format!(
                "Unknown duration unit: '{}'. Use 's', 'm', or 'h'.",
                unit_char
            ))
        }
    };

    value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Duration '{}' is too large", s))
}

/// Parses a query string of the form `key1=value1&key2=value2`.
///
/// Empty pairs are skipped, a pair without `=` maps to an empty value, and a
/// repeated key keeps the last value.
pub fn parse_query_string(query: &str) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();

    for pair in query.trim().trim_start_matches('?').split('&') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }

        let (key, value) = match pair.split_once('=') {
            Some((k, v)) => (k.trim(), v.trim()),
            None => (pair, ""),
        };

        if key.is_empty() {
            continue;
        }

        params.insert(key.to_string(), value.to_string());
    }

    params
}

/// Parses a comma-separated header string with support for escaped commas.
///
/// Use `\,` to include a literal comma in a header value.
/// Example: "Accept:text/html\,application/json,X-Trace:on"
pub fn parse_headers_with_escapes(headers_str: &str) -> Vec<String> {
    let mut headers = Vec::new();
    let mut current_header = String::new();
    let mut chars = headers_str.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if chars.peek() == Some(&',') {
                    current_header.push(',');
                    chars.next();
                } else {
                    current_header.push('\\');
                }
            }
            ',' => {
                if !current_header.trim().is_empty() {
                    headers.push(current_header.clone());
                }
                current_header.clear();
            }
            _ => {
                current_header.push(ch);
            }
        }
    }

    if !current_header.trim().is_empty() {
        headers.push(current_header);
    }

    headers
}

/// Shortens `text` to at most `max_chars` characters, appending "..." when cut.
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut)
}
