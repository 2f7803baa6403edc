//! Role extraction from verified token claims.

use serde_json::Value;

/// Follow a dot-separated `path` through the claims and return the roles
/// found there. A string array or a single string count as roles; anything
/// else, including a missing path, yields none.
pub fn roles_at_path(claims: &Value, path: &str) -> Vec<String> {
    let target = path
        .split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(claims, |value, segment| value.get(segment));

    match target {
        Some(Value::Array(values)) => values
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(role)) => vec![role.clone()],
        _ => Vec::new(),
    }
}

/// Username of the token subject
pub fn username(claims: &Value) -> Option<String> {
    claims
        .get("preferred_username")
        .or_else(|| claims.get("sub"))
        .and_then(Value::as_str)
        .map(str::to_string)
}
