// Shared test helpers: a stateful stub CDX index and a recording sleeper.
//
// Each integration test file pulls this in with `mod helpers;`, so not every
// helper is used by every file.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use wiremock::{MockServer, Request, Respond, ResponseTemplate};

use wayback_harvest::config::IndexClientConfig;
use wayback_harvest::download::Sleeper;
use wayback_harvest::IndexClient;

pub const HEADER: [&str; 7] = [
    "urlkey",
    "timestamp",
    "original",
    "mimetype",
    "statuscode",
    "digest",
    "length",
];

/// One index row with the default seven columns.
pub fn row(timestamp: &str, digest: &str) -> Vec<String> {
    vec![
        "com,example)/".to_string(),
        timestamp.to_string(),
        "https://example.com/".to_string(),
        "text/html".to_string(),
        "200".to_string(),
        digest.to_string(),
        "1024".to_string(),
    ]
}

/// `count` rows, one per hour starting 2020-01-01 00:00.
pub fn hourly_rows(count: usize) -> Vec<Vec<String>> {
    (0..count)
        .map(|i| {
            let ts = format!("202001{:02}{:02}0000", 1 + i / 24, i % 24);
            row(&ts, &format!("DIGEST{i:03}"))
        })
        .collect()
}

/// JSON body with a header row.
pub fn json_body(rows: &[Vec<String>]) -> String {
    let mut all: Vec<Vec<String>> = vec![HEADER.iter().map(|s| s.to_string()).collect()];
    all.extend(rows.iter().cloned());
    serde_json::to_string(&all).expect("rows serialize")
}

/// Space-delimited text body.
pub fn text_body(rows: &[Vec<String>]) -> String {
    rows.iter().map(|r| r.join(" ") + "\n").collect()
}

/// Stateful stub of the CDX endpoint over a fixed set of rows.
///
/// Supports `page`/`pageSize`, `showNumPages`, `showResumeKey`/`resumeKey`
/// (keys are `key-<offset>`), `limit` and `output=json`.
#[derive(Clone)]
pub struct StubIndex {
    rows: Arc<Vec<Vec<String>>>,
    requests: Arc<AtomicUsize>,
    key_only_first: bool,
}

impl StubIndex {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self {
            rows: Arc::new(rows),
            requests: Arc::new(AtomicUsize::new(0)),
            key_only_first: false,
        }
    }

    /// The first resume-key response carries no rows, only a key.
    pub fn with_key_only_first_response(mut self) -> Self {
        self.key_only_first = true;
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn render(&self, rows: &[Vec<String>], key: Option<String>, json: bool) -> ResponseTemplate {
        let body = if json {
            let mut all: Vec<Vec<String>> = vec![HEADER.iter().map(|s| s.to_string()).collect()];
            all.extend(rows.iter().cloned());
            if let Some(key) = key {
                all.push(Vec::new());
                all.push(vec![key]);
            }
            serde_json::to_string(&all).expect("rows serialize")
        } else {
            let mut body = text_body(rows);
            if let Some(key) = key {
                body.push('\n');
                body.push_str(&key);
                body.push('\n');
            }
            body
        };
        ResponseTemplate::new(200).set_body_string(body)
    }
}

impl Respond for StubIndex {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let call = self.requests.fetch_add(1, Ordering::SeqCst);
        let params: HashMap<String, String> = request
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let json = params.get("output").map(String::as_str) == Some("json");
        let total = self.rows.len();
        let number = |name: &str| params.get(name).and_then(|v| v.parse::<usize>().ok());

        if params.get("showNumPages").map(String::as_str) == Some("true") {
            let size = number("pageSize").unwrap_or(total.max(1));
            return ResponseTemplate::new(200).set_body_string(format!("{}\n", total.div_ceil(size)));
        }

        if let Some(page) = number("page") {
            let size = number("pageSize").unwrap_or(total.max(1));
            let start = (page * size).min(total);
            let end = (start + size).min(total);
            return self.render(&self.rows[start..end], None, json);
        }

        if params.get("showResumeKey").map(String::as_str) == Some("true") {
            let offset = params
                .get("resumeKey")
                .and_then(|k| k.strip_prefix("key-"))
                .and_then(|n| n.parse::<usize>().ok())
                .unwrap_or(0);
            if self.key_only_first && call == 0 {
                return self.render(&[], Some(format!("key-{offset}")), json);
            }
            let limit = number("limit").unwrap_or(total);
            let end = (offset + limit).min(total);
            let key = (end < total).then(|| format!("key-{end}"));
            return self.render(&self.rows[offset.min(total)..end], key, json);
        }

        let limit = number("limit").unwrap_or(total).min(total);
        self.render(&self.rows[..limit], None, json)
    }
}

/// Index client pointed at `server`'s `/cdx` path.
pub fn index_client(server: &MockServer) -> IndexClient {
    let config = IndexClientConfig {
        endpoint: format!("{}/cdx", server.uri()),
        archive_base: "https://web.archive.org/web".to_string(),
        timeout: Duration::from_secs(5),
        ..Default::default()
    };
    IndexClient::new(config).expect("index client builds")
}

/// Sleeper that records requested delays and returns at once.
#[derive(Default)]
pub struct RecordingSleeper {
    delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn delays(&self) -> Vec<Duration> {
        self.delays.lock().expect("sleeper lock").clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration) -> BoxFuture<'static, ()> {
        self.delays.lock().expect("sleeper lock").push(delay);
        Box::pin(async {})
    }
}
