//! URL validation and normalization for index lookups.

use crate::error_handling::{Error, Result};

/// Maximum URL length (2048 characters), the common browser and server limit.
const MAX_URL_LENGTH: usize = 2048;

/// Validates and normalizes a URL.
///
/// Adds an `https://` prefix when no scheme is given, then checks that the
/// result parses and uses http or https.
///
/// # Errors
///
/// Returns `Error::Configuration` for an empty, overlong, unparsable or
/// non-http(s) URL.
pub fn normalize_url(url: &str) -> Result<String> {
    let url = url.trim();
    if url.is_empty() {
        return Err(Error::config("url must not be empty"));
    }

    let normalized = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if let Some((scheme, _)) = url.split_once("://") {
        return Err(Error::config(format!("unsupported URL scheme '{scheme}'")));
    } else {
        format!("https://{url}")
    };

    // Checked after normalization, the prefix can push a URL over the limit
    if normalized.len() > MAX_URL_LENGTH {
        return Err(Error::config(format!(
            "URL exceeds maximum length ({} > {MAX_URL_LENGTH})",
            normalized.len()
        )));
    }

    let parsed = url::Url::parse(&normalized)
        .map_err(|e| Error::config(format!("invalid URL '{url}': {e}")))?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(Error::config(format!("URL '{url}' has no host")));
    }
    Ok(normalized)
}
