//! Query construction for the CDX index.
//!
//! [`QueryBuilder`] collects settings fluently and validates each one as it
//! is set; [`QueryBuilder::build`] reports the first problem as
//! `Error::Configuration` and otherwise yields an immutable [`QuerySpec`].
//! A spec serializes to request parameters with [`QuerySpec::to_params`] and
//! can be executed any number of times.

use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;

use super::record::{CaptureRecord, DEFAULT_FIELDS};
use super::timestamp::{expand_from, expand_to};
use crate::error_handling::{Error, Result};

/// URL matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    /// Only the exact URL
    #[default]
    Exact,
    /// Every URL under the given path
    Prefix,
    /// Every URL on the given host
    Host,
    /// The host and all of its subdomains
    Domain,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Prefix => "prefix",
            MatchType::Host => "host",
            MatchType::Domain => "domain",
        }
    }
}

/// Result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortType {
    /// Ascending by timestamp
    #[default]
    Regular,
    /// Descending by timestamp
    Reverse,
    /// By distance to the `closest` timestamp
    Closest,
}

impl SortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::Regular => "regular",
            SortType::Reverse => "reverse",
            SortType::Closest => "closest",
        }
    }
}

/// Response encoding requested from the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Space-delimited rows
    Text,
    /// A JSON array of arrays, header row first
    #[default]
    Json,
}

/// A `[!][~]field:pattern` filter.
///
/// Without `~` the pattern is a regex that must match the whole field; with
/// `~` it is a substring match. `!` negates either form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: String,
    pub pattern: String,
    pub negated: bool,
    pub contains: bool,
}

impl FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut rest = s;
        let negated = rest.starts_with('!');
        if negated {
            rest = &rest[1..];
        }
        let contains = rest.starts_with('~');
        if contains {
            rest = &rest[1..];
        }
        let (field, pattern) = rest
            .split_once(':')
            .ok_or_else(|| Error::config(format!("filter '{s}' must be [!][~]field:pattern")))?;
        if field.is_empty() {
            return Err(Error::config(format!("filter '{s}' has an empty field name")));
        }
        if !contains {
            Regex::new(pattern).map_err(|e| {
                Error::config(format!("filter '{s}' has an invalid regex: {e}"))
            })?;
        }
        Ok(Filter {
            field: field.to_string(),
            pattern: pattern.to_string(),
            negated,
            contains,
        })
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            f.write_str("!")?;
        }
        if self.contains {
            f.write_str("~")?;
        }
        write!(f, "{}:{}", self.field, self.pattern)
    }
}

/// A collapse key: `field` or `field:N` (first N characters of the field).
///
/// Adjacent captures whose key values are equal collapse to the first one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapseKey {
    pub field: String,
    pub prefix_len: Option<usize>,
}

impl CollapseKey {
    /// Key value of a record, `None` when the record lacks the field.
    pub fn value_of(&self, record: &CaptureRecord) -> Option<String> {
        let value = record.field(&self.field)?;
        Some(match self.prefix_len {
            Some(n) => value.chars().take(n).collect(),
            None => value.into_owned(),
        })
    }
}

impl FromStr for CollapseKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (field, prefix_len) = match s.split_once(':') {
            Some((field, n)) => {
                let n: usize = n.parse().map_err(|_| {
                    Error::config(format!("collapse '{s}' must be field or field:N"))
                })?;
                if n == 0 {
                    return Err(Error::config(format!(
                        "collapse '{s}' needs a prefix length of at least 1"
                    )));
                }
                (field, Some(n))
            }
            None => (s, None),
        };
        if field.is_empty() {
            return Err(Error::config("collapse key has an empty field name"));
        }
        Ok(CollapseKey {
            field: field.to_string(),
            prefix_len,
        })
    }
}

impl fmt::Display for CollapseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix_len {
            Some(n) => write!(f, "{}:{}", self.field, n),
            None => f.write_str(&self.field),
        }
    }
}

/// Fully resolved parameters of one index request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    url: String,
    match_type: Option<MatchType>,
    from: Option<String>,
    to: Option<String>,
    filters: Vec<Filter>,
    collapse: Vec<CollapseKey>,
    sort: Option<SortType>,
    closest: Option<String>,
    limit: Option<u32>,
    offset: Option<u32>,
    fields: Vec<String>,
    show_resume_key: bool,
    resume_key: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
    show_num_pages: bool,
    show_dupe_count: bool,
    resolve_revisits: bool,
    fast_latest: Option<bool>,
    gzip: Option<bool>,
    output: OutputFormat,
}

impl QuerySpec {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn match_type(&self) -> Option<MatchType> {
        self.match_type
    }

    /// Expanded 14-digit lower bound.
    pub fn from(&self) -> Option<&str> {
        self.from.as_deref()
    }

    /// Expanded 14-digit upper bound.
    pub fn to(&self) -> Option<&str> {
        self.to.as_deref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn collapse(&self) -> &[CollapseKey] {
        &self.collapse
    }

    pub fn sort(&self) -> Option<SortType> {
        self.sort
    }

    pub fn closest(&self) -> Option<&str> {
        self.closest.as_deref()
    }

    pub fn limit(&self) -> Option<u32> {
        self.limit
    }

    pub fn page_size(&self) -> Option<u32> {
        self.page_size
    }

    pub fn show_resume_key(&self) -> bool {
        self.show_resume_key
    }

    pub fn output(&self) -> OutputFormat {
        self.output
    }

    /// Column names of the rows this query returns.
    pub fn field_names(&self) -> Vec<String> {
        if self.fields.is_empty() {
            DEFAULT_FIELDS.iter().map(|s| s.to_string()).collect()
        } else {
            self.fields.clone()
        }
    }

    /// Serializes the query to query parameters, repeating `filter` and
    /// `collapse` once per entry.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("url", self.url.clone())];
        if let Some(match_type) = self.match_type {
            params.push(("matchType", match_type.as_str().to_string()));
        }
        if let Some(from) = &self.from {
            params.push(("from", from.clone()));
        }
        if let Some(to) = &self.to {
            params.push(("to", to.clone()));
        }
        for filter in &self.filters {
            params.push(("filter", filter.to_string()));
        }
        for key in &self.collapse {
            params.push(("collapse", key.to_string()));
        }
        if let Some(sort) = self.sort {
            params.push(("sort", sort.as_str().to_string()));
        }
        if let Some(closest) = &self.closest {
            params.push(("closest", closest.clone()));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if !self.fields.is_empty() {
            params.push(("fl", self.fields.join(",")));
        }
        if self.show_resume_key {
            params.push(("showResumeKey", "true".to_string()));
        }
        if let Some(key) = &self.resume_key {
            params.push(("resumeKey", key.clone()));
        }
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(size) = self.page_size {
            params.push(("pageSize", size.to_string()));
        }
        if self.show_num_pages {
            params.push(("showNumPages", "true".to_string()));
        }
        if self.show_dupe_count {
            params.push(("showDupeCount", "true".to_string()));
        }
        if self.resolve_revisits {
            params.push(("resolveRevisits", "true".to_string()));
        }
        if let Some(fast) = self.fast_latest {
            params.push(("fastLatest", fast.to_string()));
        }
        if let Some(gzip) = self.gzip {
            params.push(("gzip", gzip.to_string()));
        }
        if self.output == OutputFormat::Json {
            params.push(("output", "json".to_string()));
        }
        params
    }

    /// Same query for one page of page-indexed iteration.
    pub(crate) fn for_page(&self, page: u32) -> QuerySpec {
        QuerySpec {
            page: Some(page),
            show_num_pages: false,
            show_resume_key: false,
            resume_key: None,
            ..self.clone()
        }
    }

    /// Same query for one resume-key batch.
    pub(crate) fn for_resume_batch(&self, batch_size: u32, key: Option<&str>) -> QuerySpec {
        QuerySpec {
            limit: Some(batch_size),
            show_resume_key: true,
            resume_key: key.map(str::to_string),
            page: None,
            show_num_pages: false,
            ..self.clone()
        }
    }

    /// Same query as a page-count probe.
    pub(crate) fn for_page_count(&self) -> QuerySpec {
        QuerySpec {
            show_num_pages: true,
            page: None,
            show_resume_key: false,
            resume_key: None,
            output: OutputFormat::Text,
            ..self.clone()
        }
    }
}

/// Fluent builder for [`QuerySpec`].
///
/// Each setter validates its own input; the first failure is kept and
/// returned by [`build`](QueryBuilder::build).
///
/// # Example
///
/// ```
/// use wayback_harvest::cdx::{MatchType, QueryBuilder};
///
/// let spec = QueryBuilder::new("example.com")
///     .match_type(MatchType::Prefix)
///     .from_date("2020")
///     .to_date("2021")
///     .filter("statuscode:200")
///     .collapse("timestamp:8")
///     .limit(100)
///     .build()
///     .unwrap();
/// assert_eq!(spec.from(), Some("20200101000000"));
/// ```
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    spec: QuerySpec,
    errors: Vec<String>,
}

impl QueryBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        QueryBuilder {
            spec: QuerySpec {
                url: url.into(),
                match_type: None,
                from: None,
                to: None,
                filters: Vec::new(),
                collapse: Vec::new(),
                sort: None,
                closest: None,
                limit: None,
                offset: None,
                fields: Vec::new(),
                show_resume_key: false,
                resume_key: None,
                page: None,
                page_size: None,
                show_num_pages: false,
                show_dupe_count: false,
                resolve_revisits: false,
                fast_latest: None,
                gzip: None,
                output: OutputFormat::default(),
            },
            errors: Vec::new(),
        }
    }

    fn record<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(Error::Configuration(message)) => {
                self.errors.push(message);
                None
            }
            Err(other) => {
                self.errors.push(other.to_string());
                None
            }
        }
    }

    pub fn match_type(mut self, match_type: MatchType) -> Self {
        self.spec.match_type = Some(match_type);
        self
    }

    /// Start of the date range, `yyyy[MM[dd[hh[mm[ss]]]]]`.
    pub fn from_date(mut self, date: &str) -> Self {
        let expanded = expand_from(date);
        self.spec.from = self.record(expanded);
        self
    }

    /// End of the date range (inclusive), `yyyy[MM[dd[hh[mm[ss]]]]]`.
    pub fn to_date(mut self, date: &str) -> Self {
        let expanded = expand_to(date);
        self.spec.to = self.record(expanded);
        self
    }

    /// Adds a `[!][~]field:pattern` filter.
    pub fn filter(mut self, filter: &str) -> Self {
        let parsed = filter.parse::<Filter>();
        if let Some(filter) = self.record(parsed) {
            self.spec.filters.push(filter);
        }
        self
    }

    /// Adds a `field` or `field:N` collapse key.
    pub fn collapse(mut self, key: &str) -> Self {
        let parsed = key.parse::<CollapseKey>();
        if let Some(key) = self.record(parsed) {
            self.spec.collapse.push(key);
        }
        self
    }

    pub fn sort(mut self, sort: SortType) -> Self {
        self.spec.sort = Some(sort);
        self
    }

    /// Target timestamp for closest sorting; implies `sort=closest` unless
    /// another sort was chosen explicitly (which `build` rejects).
    pub fn closest(mut self, timestamp: &str) -> Self {
        let expanded = expand_from(timestamp);
        self.spec.closest = self.record(expanded);
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        let checked = positive(limit, "limit");
        self.spec.limit = self.record(checked);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        let checked = u32::try_from(offset)
            .map_err(|_| Error::config(format!("offset must be between 0 and {}", u32::MAX)));
        self.spec.offset = self.record(checked);
        self
    }

    /// Restricts the returned columns (`fl`).
    pub fn fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.spec.fields = fields.into_iter().map(Into::into).collect();
        if self.spec.fields.iter().any(|f| f.trim().is_empty()) {
            self.errors.push("field names must not be empty".to_string());
        }
        self
    }

    pub fn show_resume_key(mut self, show: bool) -> Self {
        self.spec.show_resume_key = show;
        self
    }

    /// Continues a previous query; implies `showResumeKey`.
    pub fn resume_key(mut self, key: &str) -> Self {
        if key.is_empty() {
            self.errors.push("resume key must not be empty".to_string());
        } else {
            self.spec.resume_key = Some(key.to_string());
            self.spec.show_resume_key = true;
        }
        self
    }

    /// Page number (0-based) for page-indexed queries.
    pub fn page(mut self, page: u32) -> Self {
        self.spec.page = Some(page);
        self
    }

    pub fn page_size(mut self, size: i64) -> Self {
        let checked = positive(size, "page size");
        self.spec.page_size = self.record(checked);
        self
    }

    pub fn show_num_pages(mut self, show: bool) -> Self {
        self.spec.show_num_pages = show;
        self
    }

    pub fn show_dupe_count(mut self, show: bool) -> Self {
        self.spec.show_dupe_count = show;
        self
    }

    pub fn resolve_revisits(mut self, resolve: bool) -> Self {
        self.spec.resolve_revisits = resolve;
        self
    }

    pub fn fast_latest(mut self, fast: bool) -> Self {
        self.spec.fast_latest = Some(fast);
        self
    }

    pub fn gzip(mut self, enabled: bool) -> Self {
        self.spec.gzip = Some(enabled);
        self
    }

    pub fn output(mut self, output: OutputFormat) -> Self {
        self.spec.output = output;
        self
    }

    /// Validates the combination of settings and freezes the query.
    ///
    /// # Errors
    ///
    /// Returns `Error::Configuration` for the first invalid setting, an empty
    /// URL, `sort=closest` without a timestamp, a timestamp combined with a
    /// different explicit sort, or `from` later than `to`.
    pub fn build(self) -> Result<QuerySpec> {
        let QueryBuilder { mut spec, errors } = self;
        if let Some(first) = errors.into_iter().next() {
            return Err(Error::Configuration(first));
        }
        if spec.url.trim().is_empty() {
            return Err(Error::config("url must not be empty"));
        }
        match (spec.sort, spec.closest.is_some()) {
            (Some(SortType::Closest), false) => {
                return Err(Error::config(
                    "sort=closest requires a closest timestamp",
                ));
            }
            (Some(other), true) if other != SortType::Closest => {
                return Err(Error::config(format!(
                    "closest timestamp conflicts with sort={}",
                    other.as_str()
                )));
            }
            (None, true) => spec.sort = Some(SortType::Closest),
            _ => {}
        }
        if let (Some(from), Some(to)) = (&spec.from, &spec.to) {
            if from > to {
                return Err(Error::config(format!(
                    "from ({from}) is later than to ({to})"
                )));
            }
        }
        Ok(spec)
    }
}

fn positive(value: i64, what: &str) -> Result<u32> {
    if value < 1 {
        return Err(Error::config(format!("{what} must be at least 1, got {value}")));
    }
    u32::try_from(value).map_err(|_| Error::config(format!("{what} {value} is too large")))
}
