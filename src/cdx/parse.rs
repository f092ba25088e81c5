//! Index response parsing.
//!
//! Handles both encodings the index produces:
//! - text: one space-delimited row per line, an optional header line, and,
//!   with `showResumeKey`, a blank line followed by the resume key;
//! - JSON: an array of arrays whose first row names the columns, and, with
//!   `showResumeKey`, an empty array followed by a one-element key array.
//!
//! Malformed rows are skipped with a warning. A response in which every data
//! row is malformed is a `ParseError`.

use log::warn;
use serde_json::Value;

use super::query::OutputFormat;
use super::record::{CaptureRecord, DEFAULT_FIELDS};
use crate::error_handling::{Error, ParseError, Result};

/// Column names the index may emit in a header row.
const KNOWN_FIELDS: [&str; 14] = [
    "urlkey",
    "timestamp",
    "original",
    "mimetype",
    "statuscode",
    "digest",
    "length",
    "redirect",
    "robotflags",
    "offset",
    "filename",
    "dupecount",
    "groupcount",
    "endtimestamp",
];

/// One parsed index response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CdxResponse {
    /// Records in the order the index returned them
    pub records: Vec<CaptureRecord>,
    /// Continuation token, present when more data follows
    pub resume_key: Option<String>,
    /// Data rows that could not be parsed
    pub skipped_rows: usize,
}

impl CdxResponse {
    /// Data rows in the response, parsed or not.
    pub fn row_count(&self) -> usize {
        self.records.len() + self.skipped_rows
    }
}

/// Parses a response body.
///
/// `fields` is the column layout requested with `fl` (empty for the default
/// seven columns); a header row in the body takes precedence over it.
pub fn parse_response(
    body: &str,
    format: OutputFormat,
    fields: &[String],
    expect_resume_key: bool,
) -> Result<CdxResponse> {
    let fields = if fields.is_empty() {
        DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect()
    } else {
        fields.to_vec()
    };
    match format {
        OutputFormat::Json => parse_json(body, fields, expect_resume_key),
        OutputFormat::Text => parse_text(body, fields, expect_resume_key),
    }
}

fn is_header<S: AsRef<str>>(row: &[S]) -> bool {
    !row.is_empty() && row.iter().all(|v| KNOWN_FIELDS.contains(&v.as_ref()))
}

fn parse_text(body: &str, mut fields: Vec<String>, expect_resume_key: bool) -> Result<CdxResponse> {
    let lines: Vec<&str> = body.lines().collect();
    let mut data_end = lines.len();
    let mut resume_key = None;

    if expect_resume_key {
        if let Some(blank) = lines.iter().position(|l| l.trim().is_empty()) {
            resume_key = lines[blank + 1..]
                .iter()
                .map(|l| l.trim())
                .find(|l| !l.is_empty())
                .map(str::to_string);
            data_end = blank;
        } else if fields.len() > 1 {
            // A key-only response may arrive without the separating blank line
            if let Some(last) = lines.last() {
                let trimmed = last.trim();
                if !trimmed.is_empty() && !trimmed.contains(' ') {
                    resume_key = Some(trimmed.to_string());
                    data_end = lines.len() - 1;
                }
            }
        }
    }

    let mut response = CdxResponse {
        resume_key,
        ..Default::default()
    };
    let mut first_error = None;

    for (idx, line) in lines[..data_end].iter().enumerate() {
        let values: Vec<&str> = line.split_whitespace().collect();
        if values.is_empty() {
            continue;
        }
        if idx == 0 && is_header(&values) {
            fields = values.iter().map(|s| s.to_string()).collect();
            continue;
        }
        push_row(&mut response, &mut first_error, &values, &fields, idx + 1);
    }

    finish(response, first_error)
}

fn parse_json(body: &str, fields: Vec<String>, expect_resume_key: bool) -> Result<CdxResponse> {
    if body.trim().is_empty() {
        return Ok(CdxResponse::default());
    }
    let rows: Vec<Vec<Value>> = serde_json::from_str(body).map_err(|e| ParseError {
        line: 0,
        reason: format!("response is not a JSON array of rows: {e}"),
    })?;
    let rows: Vec<Vec<String>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(json_to_string).collect())
        .collect();

    let mut data: &[Vec<String>] = &rows;
    let mut resume_key = None;

    if expect_resume_key {
        if let Some(sep) = data.iter().position(|r| r.is_empty()) {
            resume_key = data[sep + 1..]
                .iter()
                .find_map(|r| r.first().cloned())
                .filter(|k| !k.is_empty());
            data = &data[..sep];
        } else if fields.len() > 1 {
            if let Some(last) = data.last() {
                if last.len() == 1 && !is_header(last) {
                    resume_key = Some(last[0].clone());
                    data = &data[..data.len() - 1];
                }
            }
        }
    }

    let mut fields = fields;
    if let Some(first) = data.first() {
        if is_header(first) {
            fields = first.clone();
            data = &data[1..];
        }
    }

    let mut response = CdxResponse {
        resume_key,
        ..Default::default()
    };
    let mut first_error = None;
    for (idx, row) in data.iter().enumerate() {
        if row.is_empty() {
            continue;
        }
        push_row(&mut response, &mut first_error, row, &fields, idx + 1);
    }

    finish(response, first_error)
}

fn json_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => "-".to_string(),
        other => other.to_string(),
    }
}

fn push_row<S: AsRef<str>>(
    response: &mut CdxResponse,
    first_error: &mut Option<ParseError>,
    values: &[S],
    fields: &[String],
    line: usize,
) {
    match CaptureRecord::from_fields(values, fields, line) {
        Ok(record) => response.records.push(record),
        Err(err) => {
            warn!("Skipping malformed index row: {err}");
            response.skipped_rows += 1;
            first_error.get_or_insert(err);
        }
    }
}

fn finish(response: CdxResponse, first_error: Option<ParseError>) -> Result<CdxResponse> {
    match first_error {
        Some(err) if response.records.is_empty() => Err(Error::Parse(ParseError {
            line: err.line,
            reason: format!(
                "all {} rows are malformed; first: {}",
                response.skipped_rows, err.reason
            ),
        })),
        _ => Ok(response),
    }
}

/// Parses the body of a page-count probe.
pub fn parse_page_count(body: &str) -> Result<u32> {
    let trimmed = body.trim();
    // JSON output wraps the count in an array on some deployments
    let digits = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
    digits.parse().map_err(|_| {
        Error::Parse(ParseError {
            line: 0,
            reason: format!("page count '{trimmed}' is not a number"),
        })
    })
}
