//! Archive URL construction.
//!
//! Archive URLs have the form `<base>/<timestamp><mode>/<original>`, where
//! the optional mode suffix selects how the archive serves the capture.
//! The `id_` mode returns the captured bytes without the archive's toolbar
//! and link rewriting, which is smaller and faster to download.

use std::sync::LazyLock;

use regex::Regex;

use crate::error_handling::{Error, Result};

static ARCHIVE_URL: LazyLock<std::result::Result<Regex, regex::Error>> = LazyLock::new(|| {
    Regex::new(r"^(https?://[^/]+(?:/[^/]+)*?/web)/(\d{14})([a-z]{2}_)?/(.+)$")
});

/// How the archive serves a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArchiveMode {
    /// Archive page with toolbar and rewritten links
    #[default]
    Standard,
    /// Original bytes as captured (`id_`)
    Raw,
    /// Frame content without the toolbar (`if_`)
    Frame,
    /// Image (`im_`)
    Image,
    /// JavaScript (`js_`)
    Script,
    /// Stylesheet (`cs_`)
    Stylesheet,
}

impl ArchiveMode {
    pub fn suffix(&self) -> &'static str {
        match self {
            ArchiveMode::Standard => "",
            ArchiveMode::Raw => "id_",
            ArchiveMode::Frame => "if_",
            ArchiveMode::Image => "im_",
            ArchiveMode::Script => "js_",
            ArchiveMode::Stylesheet => "cs_",
        }
    }
}

/// Builds `<archive_base>/<timestamp><mode>/<url>`.
///
/// # Errors
///
/// Returns `Error::Configuration` if `timestamp` is empty, longer than 14
/// characters or not all digits, or if `url` is empty.
pub fn build_archive_url(
    archive_base: &str,
    timestamp: &str,
    url: &str,
    mode: ArchiveMode,
) -> Result<String> {
    if timestamp.is_empty()
        || timestamp.len() > 14
        || !timestamp.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(Error::config(format!(
            "archive timestamp '{timestamp}' must be 1 to 14 digits"
        )));
    }
    if url.is_empty() {
        return Err(Error::config("archived URL must not be empty"));
    }
    Ok(format!(
        "{}/{}{}/{}",
        archive_base.trim_end_matches('/'),
        timestamp,
        mode.suffix(),
        url
    ))
}

/// Rewrites an archive URL of any mode to the raw `id_` mode.
///
/// ```
/// use wayback_harvest::download::convert_to_id_url;
///
/// let raw = convert_to_id_url("https://web.archive.org/web/20200101000000/https://example.com/").unwrap();
/// assert_eq!(raw, "https://web.archive.org/web/20200101000000id_/https://example.com/");
/// ```
///
/// # Errors
///
/// Returns `Error::Configuration` if `archive_url` is not of the form
/// `<base>/web/<14 digits>[mode]/<url>`.
pub fn convert_to_id_url(archive_url: &str) -> Result<String> {
    let pattern = ARCHIVE_URL
        .as_ref()
        .map_err(|e| Error::config(format!("archive URL pattern: {e}")))?;
    let captures = pattern
        .captures(archive_url)
        .ok_or_else(|| Error::config(format!("not an archive URL: {archive_url}")))?;
    Ok(format!(
        "{}/{}{}/{}",
        &captures[1],
        &captures[2],
        ArchiveMode::Raw.suffix(),
        &captures[4]
    ))
}
