//! Provider credential detection

/// Reserved prefix of placeholder keys shipped in sample configuration
const PLACEHOLDER_PREFIX: &str = "your_";

/// True when a credential is present and not a placeholder such as
/// `YOUR_API_KEY` or `your_openrouter_api_key_here`.
#[must_use]
pub fn is_configured(value: Option<&str>) -> bool {
    let Some(value) = value.map(str::trim) else {
        return false;
    };
    if value.is_empty() {
        return false;
    }
    let prefix_len = PLACEHOLDER_PREFIX.len();
    !(value.len() >= prefix_len
        && value.is_char_boundary(prefix_len)
        && value[..prefix_len].eq_ignore_ascii_case(PLACEHOLDER_PREFIX))
}

/// Returns the credential only when it is usable
#[must_use]
pub fn configured(value: Option<&str>) -> Option<&str> {
    value.filter(|v| is_configured(Some(v))).map(str::trim)
}
