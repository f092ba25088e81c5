//! Snapshot summary of one URL.

use log::{debug, warn};
use serde::Serialize;

use super::url::normalize_url;
use crate::cdx::timestamp::human_readable;
use crate::cdx::{collapse, CaptureRecord, IndexClient, QueryBuilder, QuerySpec, SortType};
use crate::error_handling::Result;

/// Collapse key used when the caller does not pick one: one snapshot a year.
pub const DEFAULT_METADATA_COLLAPSE: &str = "timestamp:4";

/// How latest/oldest are determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoundStrategy {
    /// Smallest and greatest timestamp of the collapsed snapshot list
    #[default]
    FromSnapshots,
    /// Two extra `limit=1` queries, reverse and regular sorted
    DedicatedQueries,
}

/// Inputs of [`get_wayback_metadata`].
#[derive(Debug, Clone)]
pub struct MetadataOptions {
    /// Start date, `yyyy[MM[dd[hh[mm[ss]]]]]`
    pub from: Option<String>,
    /// End date, `yyyy[MM[dd[hh[mm[ss]]]]]`
    pub to: Option<String>,
    /// Collapse key; `None` disables collapsing
    pub collapse: Option<String>,
    pub bounds: BoundStrategy,
}

impl Default for MetadataOptions {
    fn default() -> Self {
        Self {
            from: None,
            to: None,
            collapse: Some(DEFAULT_METADATA_COLLAPSE.to_string()),
            bounds: BoundStrategy::default(),
        }
    }
}

/// A capture annotated for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    #[serde(flatten)]
    pub record: CaptureRecord,
    /// Archive URL of the capture
    pub wayback_url: String,
    /// `yyyy`
    pub year: String,
    /// `yyyyMMdd`
    pub date: String,
    /// `YYYY-MM-DD HH:MM:SS`
    pub captured_at: String,
}

impl Snapshot {
    pub fn new(record: CaptureRecord, archive_base: &str) -> Self {
        let wayback_url = record.wayback_url(archive_base);
        let year = record.timestamp.chars().take(4).collect();
        let date = record.timestamp.chars().take(8).collect();
        let captured_at =
            human_readable(&record.timestamp).unwrap_or_else(|| record.timestamp.clone());
        Self {
            record,
            wayback_url,
            year,
            date,
            captured_at,
        }
    }
}

/// Latest or oldest snapshot.
///
/// `Absent` means the URL has no capture in the window; `Unavailable` means
/// the lookup itself failed and nothing is known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "snapshot", rename_all = "snake_case")]
pub enum SnapshotBound {
    Found(Box<Snapshot>),
    Absent,
    Unavailable(String),
}

impl SnapshotBound {
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            SnapshotBound::Found(snapshot) => Some(snapshot),
            _ => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, SnapshotBound::Absent)
    }

    fn from_option(snapshot: Option<Snapshot>) -> Self {
        match snapshot {
            Some(snapshot) => SnapshotBound::Found(Box::new(snapshot)),
            None => SnapshotBound::Absent,
        }
    }
}

/// Snapshot summary of one URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WaybackMetadata {
    /// Normalized URL that was queried
    pub url: String,
    pub snapshots_count: usize,
    /// Collapsed snapshots in index order
    pub snapshots: Vec<Snapshot>,
    pub latest: SnapshotBound,
    pub oldest: SnapshotBound,
}

/// Summarizes the snapshots of `url` between `from` and `to`.
///
/// Records outside the expanded date window are dropped even if the index
/// returned them, then the list is collapsed locally with the same key sent
/// to the index.
///
/// # Errors
///
/// Configuration errors (bad URL, dates or collapse key) and failures of the
/// main query propagate. With [`BoundStrategy::DedicatedQueries`] a failed
/// bound query is reported as [`SnapshotBound::Unavailable`] instead.
pub async fn get_wayback_metadata(
    client: &IndexClient,
    url: &str,
    options: &MetadataOptions,
) -> Result<WaybackMetadata> {
    let normalized = normalize_url(url)?;
    let mut builder = windowed(client.query(&normalized), options);
    if let Some(key) = &options.collapse {
        builder = builder.collapse(key);
    }
    let spec = builder.build()?;

    let records = client.search(&spec).await?;
    let received = records.len();
    let in_window: Vec<CaptureRecord> = records
        .into_iter()
        .filter(|r| within_window(r, &spec))
        .collect();
    if in_window.len() < received {
        warn!(
            "Dropped {} records outside the requested date window for {normalized}",
            received - in_window.len()
        );
    }
    let collapsed = collapse::apply(in_window, spec.collapse());

    let archive_base = &client.config().archive_base;
    let snapshots: Vec<Snapshot> = collapsed
        .into_iter()
        .map(|record| Snapshot::new(record, archive_base))
        .collect();
    debug!("{} snapshots for {normalized}", snapshots.len());

    let (latest, oldest) = match options.bounds {
        BoundStrategy::FromSnapshots => {
            let oldest = snapshots
                .iter()
                .min_by(|a, b| a.record.timestamp.cmp(&b.record.timestamp))
                .cloned();
            let latest = snapshots
                .iter()
                .max_by(|a, b| a.record.timestamp.cmp(&b.record.timestamp))
                .cloned();
            (
                SnapshotBound::from_option(latest),
                SnapshotBound::from_option(oldest),
            )
        }
        BoundStrategy::DedicatedQueries => {
            let latest = bound_query(client, &normalized, options, SortType::Reverse).await;
            let oldest = bound_query(client, &normalized, options, SortType::Regular).await;
            (latest, oldest)
        }
    };

    Ok(WaybackMetadata {
        url: normalized,
        snapshots_count: snapshots.len(),
        snapshots,
        latest,
        oldest,
    })
}

fn windowed(mut builder: QueryBuilder, options: &MetadataOptions) -> QueryBuilder {
    if let Some(from) = &options.from {
        builder = builder.from_date(from);
    }
    if let Some(to) = &options.to {
        builder = builder.to_date(to);
    }
    builder
}

fn within_window(record: &CaptureRecord, spec: &QuerySpec) -> bool {
    let ts = record.timestamp.as_str();
    spec.from().is_none_or(|from| ts >= from) && spec.to().is_none_or(|to| ts <= to)
}

async fn bound_query(
    client: &IndexClient,
    url: &str,
    options: &MetadataOptions,
    sort: SortType,
) -> SnapshotBound {
    let spec = match windowed(client.query(url), options).sort(sort).limit(1).build() {
        Ok(spec) => spec,
        Err(e) => return SnapshotBound::Unavailable(e.to_string()),
    };
    match client.search(&spec).await {
        Ok(records) => SnapshotBound::from_option(
            records
                .into_iter()
                .next()
                .map(|record| Snapshot::new(record, &client.config().archive_base)),
        ),
        Err(e) => {
            warn!("{} lookup for {url} failed: {e}", sort.as_str());
            SnapshotBound::Unavailable(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(ts: &str) -> Snapshot {
        Snapshot::new(
            CaptureRecord {
                timestamp: ts.to_string(),
                original: "https://example.com/".to_string(),
                ..Default::default()
            },
            "https://web.archive.org/web",
        )
    }

    #[test]
    fn test_snapshot_annotations() {
        let s = snapshot("20200315123456");
        assert_eq!(s.year, "2020");
        assert_eq!(s.date, "20200315");
        assert_eq!(s.captured_at, "2020-03-15 12:34:56");
        assert_eq!(
            s.wayback_url,
            "https://web.archive.org/web/20200315123456/https://example.com/"
        );
    }

    #[test]
    fn test_bound_serialization_distinguishes_absent_and_unavailable() {
        let absent = serde_json::to_value(SnapshotBound::Absent).unwrap();
        assert_eq!(absent["status"], "absent");
        let unavailable =
            serde_json::to_value(SnapshotBound::Unavailable("HTTP 503".into())).unwrap();
        assert_eq!(unavailable["status"], "unavailable");
        assert_eq!(unavailable["snapshot"], "HTTP 503");
    }

    #[test]
    fn test_within_window_uses_expanded_bounds() {
        let spec = QueryBuilder::new("example.com")
            .from_date("2020")
            .to_date("2020")
            .build()
            .unwrap();
        let inside = snapshot("20201231235959").record;
        let outside = snapshot("20210101000000").record;
        assert!(within_window(&inside, &spec));
        assert!(!within_window(&outside, &spec));
    }

    #[test]
    fn test_default_options_collapse_per_year() {
        let options = MetadataOptions::default();
        assert_eq!(options.collapse.as_deref(), Some("timestamp:4"));
        assert_eq!(options.bounds, BoundStrategy::FromSnapshots);
    }
}
