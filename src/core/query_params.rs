use std::collections::HashMap;

use spin_sdk::http::Request;

use crate::core::errors::ApiError;

/// Parse query parameters from a URI string
///
/// Handles URL decoding and returns a HashMap of parameter key-value pairs.
/// Multiple values for the same key are not supported (only the last is kept).
///
/// # Example
/// ```
/// use perch::core::query_params::parse_query_params;
///
/// let params = parse_query_params("/profile/42?page=2&sort=new");
/// assert_eq!(params.get("page"), Some(&"2".to_string()));
/// assert_eq!(params.get("sort"), Some(&"new".to_string()));
/// ```
pub fn parse_query_params(uri: &str) -> HashMap<String, String> {
    match uri.find('?') {
        Some(query_start) => parse_pairs(&uri[query_start + 1..], false),
        None => HashMap::new(),
    }
}

/// Parse an `application/x-www-form-urlencoded` body
pub fn parse_form(body: &str) -> HashMap<String, String> {
    parse_pairs(body, true)
}

fn parse_pairs(query: &str, plus_as_space: bool) -> HashMap<String, String> {
    let mut params = HashMap::new();

    for param in query.split('&').filter(|p| !p.is_empty()) {
        if let Some(eq_idx) = param.find('=') {
            let key = &param[..eq_idx];
            let raw = &param[eq_idx + 1..];
            let raw = if plus_as_space {
                raw.replace('+', " ")
            } else {
                raw.to_string()
            };
            let decoded = match urlencoding::decode(&raw) {
                Ok(v) => v.into_owned(),
                Err(_) => raw.clone(),
            };
            params.insert(key.to_string(), decoded);
        } else {
            // Flag parameter without value
            params.insert(param.to_string(), String::new());
        }
    }

    params
}

/// Read a request body as flat string fields, from either a JSON object or
/// an urlencoded form. Non-string JSON values are skipped.
pub fn read_fields(req: &Request) -> Result<HashMap<String, String>, ApiError> {
    let is_form = req
        .header("Content-Type")
        .and_then(|h| h.as_str())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false);

    if is_form {
        let body = std::str::from_utf8(req.body())
            .map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;
        return Ok(parse_form(body));
    }

    let value: serde_json::Value = serde_json::from_slice(req.body())
        .map_err(|_| ApiError::BadRequest("Invalid request body".to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| ApiError::BadRequest("Invalid request body".to_string()))?;

    Ok(object
        .iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
        .collect())
}

/// Get a string parameter from parsed query params with optional default
pub fn get_string(params: &HashMap<String, String>, key: &str, default: Option<&str>) -> Option<String> {
    params.get(key)
        .cloned()
        .or_else(|| default.map(|d| d.to_string()))
}

/// Get an integer parameter with validation and default, never below 1.
/// Digit strings too large for `usize` saturate to `usize::MAX`.
pub fn get_int(params: &HashMap<String, String>, key: &str, default: usize) -> usize {
    params.get(key)
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .map(|s| s.parse::<usize>().unwrap_or(usize::MAX))
        .unwrap_or(default)
        .max(1)
}
