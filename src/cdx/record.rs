//! Capture records: one entry of the CDX index.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::Serialize;

use super::timestamp::is_full_timestamp;
use crate::error_handling::ParseError;

/// Field layout of an index row when no `fl` list was requested.
pub const DEFAULT_FIELDS: [&str; 7] = [
    "urlkey",
    "timestamp",
    "original",
    "mimetype",
    "statuscode",
    "digest",
    "length",
];

/// One archived capture of a URL.
///
/// Built by parsing one index row; values are compared by content only.
/// Fields the query did not request stay empty (`""` or `None`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CaptureRecord {
    /// SURT-form sort key of the original URL
    pub urlkey: String,
    /// 14-digit capture time
    pub timestamp: String,
    /// The captured URL
    pub original: String,
    /// MIME type reported at capture time
    pub mimetype: String,
    /// HTTP status of the capture; `None` for `-` (e.g. revisit records)
    pub statuscode: Option<u16>,
    /// Content digest, used for de-duplication
    pub digest: String,
    /// Compressed record length in bytes
    pub length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dupecount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub groupcount: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endtimestamp: Option<String>,
    /// Requested fields without a dedicated slot
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl CaptureRecord {
    /// Builds a record from the values of one row and the names of its columns.
    ///
    /// `line` is only used to locate the row in a [`ParseError`].
    pub fn from_fields<S: AsRef<str>>(
        values: &[S],
        field_names: &[String],
        line: usize,
    ) -> Result<Self, ParseError> {
        if values.len() != field_names.len() {
            return Err(ParseError {
                line,
                reason: format!(
                    "expected {} fields, found {}",
                    field_names.len(),
                    values.len()
                ),
            });
        }

        let mut record = CaptureRecord::default();
        for (name, value) in field_names.iter().zip(values) {
            let value = value.as_ref();
            match name.as_str() {
                "urlkey" => record.urlkey = value.to_string(),
                "timestamp" => {
                    if !is_full_timestamp(value) {
                        return Err(ParseError {
                            line,
                            reason: format!("timestamp '{value}' is not 14 digits"),
                        });
                    }
                    record.timestamp = value.to_string();
                }
                "original" => record.original = value.to_string(),
                "mimetype" => record.mimetype = value.to_string(),
                "statuscode" => record.statuscode = parse_optional(value, name, line)?,
                "digest" => record.digest = value.to_string(),
                "length" => record.length = parse_optional(value, name, line)?,
                "filename" => record.filename = Some(value.to_string()),
                "offset" => record.offset = Some(value.to_string()),
                "dupecount" => record.dupecount = parse_optional(value, name, line)?,
                "groupcount" => record.groupcount = parse_optional(value, name, line)?,
                "endtimestamp" => record.endtimestamp = Some(value.to_string()),
                other => {
                    record.extra.insert(other.to_string(), value.to_string());
                }
            }
        }
        Ok(record)
    }

    /// Archive URL of this capture: `<archive_base>/<timestamp>/<original>`.
    pub fn wayback_url(&self, archive_base: &str) -> String {
        format!(
            "{}/{}/{}",
            archive_base.trim_end_matches('/'),
            self.timestamp,
            self.original
        )
    }

    /// Value of a field by its index name, as it would appear on the wire.
    pub fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match name {
            "urlkey" => Some(Cow::Borrowed(&self.urlkey)),
            "timestamp" => Some(Cow::Borrowed(&self.timestamp)),
            "original" => Some(Cow::Borrowed(&self.original)),
            "mimetype" => Some(Cow::Borrowed(&self.mimetype)),
            "statuscode" => Some(display_optional(self.statuscode)),
            "digest" => Some(Cow::Borrowed(&self.digest)),
            "length" => Some(display_optional(self.length)),
            "filename" => self.filename.as_deref().map(Cow::Borrowed),
            "offset" => self.offset.as_deref().map(Cow::Borrowed),
            "dupecount" => Some(display_optional(self.dupecount)),
            "groupcount" => Some(display_optional(self.groupcount)),
            "endtimestamp" => self.endtimestamp.as_deref().map(Cow::Borrowed),
            other => self.extra.get(other).map(|v| Cow::Borrowed(v.as_str())),
        }
    }
}

fn parse_optional<T: std::str::FromStr>(
    value: &str,
    name: &str,
    line: usize,
) -> Result<Option<T>, ParseError> {
    if value.is_empty() || value == "-" {
        return Ok(None);
    }
    value.parse().map(Some).map_err(|_| ParseError {
        line,
        reason: format!("{name} '{value}' is not a number"),
    })
}

fn display_optional<T: ToString>(value: Option<T>) -> Cow<'static, str> {
    match value {
        Some(v) => Cow::Owned(v.to_string()),
        None => Cow::Borrowed("-"),
    }
}
