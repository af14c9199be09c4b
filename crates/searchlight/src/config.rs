//! Credential and endpoint normalization.
//!
//! Sample configs ship placeholder values; those are normalized to the empty
//! string so callers see "not configured" rather than "configured wrong".

/// Credential values that count as unset.
pub const API_KEY_PLACEHOLDERS: &[&str] = &["YOUR_API_KEY", "API_KEY", "CHANGE_ME", "REPLACE_ME"];

/// Endpoint values that count as unset.
pub const ENDPOINT_PLACEHOLDERS: &[&str] = &[
    "HTTPS://YOUR-SEARCH-ENDPOINT.EXAMPLE",
    "YOUR_BASE_URL",
    "BASE_URL",
    "CHANGE_ME",
    "REPLACE_ME",
];

/// Default system prompt asking the remote model for a single JSON object
/// with `content` and `sources` keys. Overridable per request.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a web research assistant. \
Use live web search/browsing when answering. \
Return ONLY a single JSON object with keys: \
content (string), sources (array of objects with url/title/snippet when possible). \
Keep content concise and evidence-backed. \
IMPORTANT: Do NOT use Markdown formatting in the content field - use plain text only.";

/// Trim an API key, mapping placeholders to the empty string.
pub fn normalize_api_key(api_key: &str) -> String {
    let api_key = api_key.trim();
    if api_key.is_empty() || API_KEY_PLACEHOLDERS.contains(&api_key.to_uppercase().as_str()) {
        return String::new();
    }
    api_key.to_string()
}

/// Trim an endpoint, mapping placeholders to the empty string and stripping
/// trailing slashes plus a trailing `/v1` suffix. The request builder always
/// appends `/v1/chat/completions` to the result.
pub fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() || ENDPOINT_PLACEHOLDERS.contains(&endpoint.to_uppercase().as_str()) {
        return String::new();
    }
    let stripped = endpoint.trim_end_matches('/');
    let stripped = stripped.strip_suffix("/v1").unwrap_or(stripped);
    stripped.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_api_key_trims() {
        assert_eq!(normalize_api_key("  sk-abc123  "), "sk-abc123");
    }

    #[test]
    fn test_normalize_api_key_placeholders_case_insensitive() {
        assert_eq!(normalize_api_key("YOUR_API_KEY"), "");
        assert_eq!(normalize_api_key("your_api_key"), "");
        assert_eq!(normalize_api_key("Change_Me"), "");
        assert_eq!(normalize_api_key("replace_me"), "");
        assert_eq!(normalize_api_key(""), "");
        assert_eq!(normalize_api_key("   "), "");
    }

    #[test]
    fn test_normalize_endpoint_strips_v1_suffix() {
        assert_eq!(
            normalize_endpoint("https://api.example.com/v1"),
            "https://api.example.com"
        );
        assert_eq!(
            normalize_endpoint("https://api.example.com/v1/"),
            "https://api.example.com"
        );
        assert_eq!(
            normalize_endpoint("https://api.example.com///"),
            "https://api.example.com"
        );
    }

    #[test]
    fn test_normalize_endpoint_placeholders() {
        assert_eq!(normalize_endpoint("BASE_URL"), "");
        assert_eq!(normalize_endpoint("your_base_url"), "");
        assert_eq!(normalize_endpoint("https://your-search-endpoint.example"), "");
    }

    #[test]
    fn test_normalize_endpoint_idempotent() {
        for input in [
            "https://api.example.com",
            "https://api.example.com/",
            "https://api.example.com/v1",
            "  https://api.example.com/v1/  ",
            "BASE_URL",
            "",
        ] {
            let once = normalize_endpoint(input);
            assert_eq!(normalize_endpoint(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_endpoint_keeps_non_v1_paths() {
        assert_eq!(
            normalize_endpoint("https://api.example.com/openai"),
            "https://api.example.com/openai"
        );
    }
}
