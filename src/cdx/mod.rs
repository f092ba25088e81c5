//! CDX index access.
//!
//! This module provides:
//! - The capture record model and timestamp helpers
//! - The fluent query builder and its immutable `QuerySpec`
//! - The index client (search, latest, oldest, closest, page count)
//! - Page-indexed and resume-key iteration
//! - Local collapse and closest ranking

mod client;
pub mod collapse;
mod pagination;
mod parse;
mod query;
mod record;
pub mod timestamp;

// Re-export public API
pub use client::IndexClient;
pub use pagination::{PageIterator, ResumeKeyIterator};
pub use parse::{parse_page_count, parse_response, CdxResponse};
pub use query::{CollapseKey, Filter, MatchType, OutputFormat, QueryBuilder, QuerySpec, SortType};
pub use record::{CaptureRecord, DEFAULT_FIELDS};
