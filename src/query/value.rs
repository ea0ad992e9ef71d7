//! Value comparison primitives shared by every predicate kind.

use crate::tree::PropertyValue;
use url::Url;

/// Host used to anchor scheme-less and host-less URLs before extracting the path.
const PLACEHOLDER_ORIGIN: &str = "http://example.com/";

/// Compare a node value against a rule value.
///
/// Text compares case-insensitively; a `~` prefix on `pattern` turns the
/// comparison into a substring test. Numbers compare against the integer
/// prefix of `pattern`. A missing value never matches.
pub fn match_value(value: Option<&PropertyValue>, pattern: &str) -> bool {
    match value {
        Some(PropertyValue::Text(text)) => match_text(text, pattern),
        Some(PropertyValue::Number(number)) => parse_int(pattern).is_some_and(|n| *number == n),
        None => false,
    }
}

pub fn match_text(text: &str, pattern: &str) -> bool {
    match pattern.strip_prefix('~') {
        Some(needle) => text.to_lowercase().contains(&needle.to_lowercase()),
        None => text.to_lowercase() == pattern.to_lowercase(),
    }
}

/// Integer prefix of `input`, the way `parseInt(input, 10)` reads it:
/// leading whitespace and an optional sign, then as many digits as present.
pub fn parse_int(input: &str) -> Option<f64> {
    let trimmed = input.trim_start();
    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1.0, &trimmed[1..]),
        Some(b'+') => (1.0, &trimmed[1..]),
        _ => (1.0, trimmed),
    };
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return None;
    }
    rest[..digits_end].parse::<f64>().ok().map(|n| sign * n)
}

/// Drop everything from the last `px` on (`"100px"` -> `"100"`).
pub fn trim_px(input: &str) -> &str {
    match input.rfind("px") {
        Some(index) => &input[..index],
        None => input,
    }
}

/// Reduce a URL to its path, always with a leading `/`.
///
/// Scheme and host are dropped, protocol-relative (`//host/a`) and
/// root-relative (`/a`) forms are accepted, and the query string and
/// fragment are ignored. Unparseable input yields an empty path.
pub fn extract_path(href: &str) -> String {
    if href.is_empty() {
        return String::new();
    }
    let parsed = if href.starts_with("//") {
        Url::parse(&format!("http:{href}")).ok()
    } else {
        Url::parse(href).ok().or_else(|| {
            Url::parse(PLACEHOLDER_ORIGIN)
                .ok()
                .and_then(|base| base.join(href).ok())
        })
    };
    let Some(url) = parsed else {
        return String::new();
    };
    let path = url.path();
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    }
}
