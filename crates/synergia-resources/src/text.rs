//! Text-extraction helpers shared by the resource parsers.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;

static DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("static pattern is valid"));

/// First `YYYY-MM-DD` date embedded in `text`, if any.
pub(crate) fn first_date(text: &str) -> Option<NaiveDate> {
    let found = DATE.find(text)?;
    NaiveDate::parse_from_str(found.as_str(), "%Y-%m-%d").ok()
}

/// The portal's `YYYY-MM-DD HH:MM:SS` timestamps.
pub(crate) fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text.trim(), "%Y-%m-%d %H:%M:%S").ok()
}

/// Numeric id from the last segment of an href-like path.
pub(crate) fn trailing_id(href: &str) -> Option<u64> {
    href.trim_end_matches('/').rsplit('/').next()?.parse().ok()
}
