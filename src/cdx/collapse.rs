//! Local collapse and closest-capture ranking.
//!
//! `apply` mirrors the index's own collapse: a capture is dropped when its key
//! value equals the one of the capture kept just before it. Captures missing
//! the key field are always kept. Several keys are applied one after another.

use std::cmp::Ordering;

use super::query::CollapseKey;
use super::record::CaptureRecord;
use super::timestamp::{distance_seconds, expand_from};
use crate::error_handling::Result;

/// Collapses adjacent captures that share a key value, keeping the first.
pub fn apply(records: Vec<CaptureRecord>, keys: &[CollapseKey]) -> Vec<CaptureRecord> {
    keys.iter().fold(records, |records, key| collapse_by(records, key))
}

fn collapse_by(records: Vec<CaptureRecord>, key: &CollapseKey) -> Vec<CaptureRecord> {
    let mut kept: Vec<CaptureRecord> = Vec::with_capacity(records.len());
    let mut previous: Option<String> = None;
    for record in records {
        let value = key.value_of(&record);
        if value.is_some() && value == previous {
            continue;
        }
        previous = value;
        kept.push(record);
    }
    kept
}

/// Orders captures by distance to `target`, nearest first.
///
/// Equal distances keep the earlier capture first. Captures whose timestamp
/// cannot be parsed sort last, in their original order.
///
/// # Errors
///
/// Returns `Error::Configuration` if `target` is not a valid date prefix.
pub fn rank_by_closest(mut records: Vec<CaptureRecord>, target: &str) -> Result<Vec<CaptureRecord>> {
    let target = expand_from(target)?;
    records.sort_by(|a, b| {
        let da = distance_seconds(&a.timestamp, &target);
        let db = distance_seconds(&b.timestamp, &target);
        match (da, db) {
            (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.timestamp.cmp(&b.timestamp)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    });
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture(timestamp: &str, digest: &str) -> CaptureRecord {
        CaptureRecord {
            timestamp: timestamp.to_string(),
            digest: digest.to_string(),
            original: "https://example.com/".to_string(),
            ..Default::default()
        }
    }

    fn stamps(records: &[CaptureRecord]) -> Vec<&str> {
        records.iter().map(|r| r.timestamp.as_str()).collect()
    }

    #[test]
    fn test_collapse_by_day_keeps_first_of_each_run() {
        let records = vec![
            capture("20200101080000", "a"),
            capture("20200101120000", "b"),
            capture("20200102080000", "c"),
            capture("20200103080000", "d"),
            capture("20200103230000", "e"),
        ];
        let key: CollapseKey = "timestamp:8".parse().unwrap();
        let collapsed = apply(records, &[key]);
        assert_eq!(
            stamps(&collapsed),
            vec!["20200101080000", "20200102080000", "20200103080000"]
        );
    }

    #[test]
    fn test_collapse_is_adjacent_only() {
        let records = vec![
            capture("20200101000000", "a"),
            capture("20200102000000", "b"),
            capture("20200103000000", "a"),
        ];
        let key: CollapseKey = "digest".parse().unwrap();
        assert_eq!(apply(records, &[key]).len(), 3);
    }

    #[test]
    fn test_collapse_keeps_records_without_the_field() {
        let records = vec![capture("20200101000000", "a"), capture("20200102000000", "a")];
        let key: CollapseKey = "filename".parse().unwrap();
        assert_eq!(apply(records, &[key]).len(), 2);
    }

    #[test]
    fn test_collapse_by_dupecount() {
        let counted = |ts: &str, dupes: u64| CaptureRecord {
            dupecount: Some(dupes),
            ..capture(ts, "a")
        };
        let records = vec![
            counted("20200101000000", 1),
            counted("20200102000000", 1),
            counted("20200103000000", 2),
        ];
        let key: CollapseKey = "dupecount".parse().unwrap();
        assert_eq!(
            stamps(&apply(records, &[key])),
            vec!["20200101000000", "20200103000000"]
        );
    }

    #[test]
    fn test_multiple_keys_apply_in_order() {
        let records = vec![
            capture("20200101000000", "a"),
            capture("20200101120000", "a"),
            capture("20200102000000", "a"),
            capture("20200102120000", "b"),
        ];
        let keys: Vec<CollapseKey> = vec!["timestamp:8".parse().unwrap(), "digest".parse().unwrap()];
        assert_eq!(stamps(&apply(records, &keys)), vec!["20200101000000", "20200102120000"]);
    }

    #[test]
    fn test_rank_by_closest_breaks_ties_toward_earlier() {
        let records = vec![
            capture("20200110000000", "a"),
            capture("20200104000000", "b"),
            capture("20200106000000", "c"),
            capture("20200101000000", "d"),
        ];
        let ranked = rank_by_closest(records, "20200105").unwrap();
        assert_eq!(
            stamps(&ranked),
            vec![
                "20200104000000",
                "20200106000000",
                "20200101000000",
                "20200110000000"
            ]
        );
    }

    #[test]
    fn test_collapse_then_rank() {
        let records = vec![
            capture("20200105000000", "a"),
            capture("20200105230000", "b"),
            capture("20200107000000", "c"),
        ];
        let key: CollapseKey = "timestamp:8".parse().unwrap();
        let ranked = rank_by_closest(apply(records, &[key]), "20200105220000").unwrap();
        // The 23:00 capture was collapsed away before ranking
        assert_eq!(stamps(&ranked), vec!["20200105000000", "20200107000000"]);
    }

    #[test]
    fn test_rank_rejects_invalid_target() {
        assert!(rank_by_closest(vec![], "20x").is_err());
    }
}
