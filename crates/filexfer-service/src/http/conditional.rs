//! Validators and conditional request evaluation.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, NaiveDateTime, Utc};
use http::HeaderMap;
use http::header;

/// Outcome of evaluating the conditional headers of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    /// Serve the representation.
    Proceed,
    /// Answer 304 Not Modified.
    NotModified,
    /// Answer 412 Precondition Failed.
    Failed,
}

/// The validators of one file version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validators {
    /// Strong entity tag, quotes included.
    pub etag: String,
    /// Modification time in whole seconds since the epoch.
    pub modified_secs: i64,
}

impl Validators {
    /// Derive validators from a file's mtime and size.
    ///
    /// The entity tag carries the mtime down to the nanosecond, so a
    /// same-size replacement within one second still gets a new tag.
    pub fn new(modified: SystemTime, size: u64) -> Self {
        let since_epoch = modified.duration_since(UNIX_EPOCH).unwrap_or_default();
        let secs = since_epoch.as_secs();
        let nanos = since_epoch.subsec_nanos();
        Self {
            etag: format!("\"{secs:x}.{nanos:x}-{size:x}\""),
            modified_secs: i64::try_from(secs).unwrap_or(i64::MAX),
        }
    }

    /// `Last-Modified` header value.
    pub fn last_modified(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.modified_secs, 0)
            .map(|dt| format_http_date(&dt))
            .unwrap_or_default()
    }

    /// Evaluate `If-Match`, `If-Unmodified-Since`, `If-None-Match` and
    /// `If-Modified-Since`, in that order.
    ///
    /// Date conditions are ignored when the corresponding entity-tag
    /// condition is present. Unparseable dates are ignored.
    pub fn evaluate(&self, headers: &HeaderMap) -> Precondition {
        if let Some(value) = header_str(headers, header::IF_MATCH) {
            if !etag_list_matches(value, &self.etag, strong_eq) {
                return Precondition::Failed;
            }
        } else if let Some(since) = header_date(headers, header::IF_UNMODIFIED_SINCE) {
            if self.modified_secs > since {
                return Precondition::Failed;
            }
        }

        if let Some(value) = header_str(headers, header::IF_NONE_MATCH) {
            if etag_list_matches(value, &self.etag, weak_eq) {
                return Precondition::NotModified;
            }
        } else if let Some(since) = header_date(headers, header::IF_MODIFIED_SINCE) {
            if self.modified_secs <= since {
                return Precondition::NotModified;
            }
        }

        Precondition::Proceed
    }

    /// Whether a `Range` header should be honored given `If-Range`.
    ///
    /// Absent `If-Range` allows the range. An entity tag must match strongly;
    /// a date must equal the modification time exactly.
    pub fn range_allowed(&self, headers: &HeaderMap) -> bool {
        let Some(value) = header_str(headers, header::IF_RANGE) else {
            return true;
        };
        let value = value.trim();
        if value.starts_with('"') || value.starts_with("W/") {
            return strong_eq(value, &self.etag);
        }
        parse_http_date(value).is_some_and(|dt| dt.timestamp() == self.modified_secs)
    }
}

/// Format a timestamp as an IMF-fixdate (`Sun, 06 Nov 1994 08:49:37 GMT`).
pub fn format_http_date(dt: &DateTime<Utc>) -> String {
    dt.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP-date in IMF-fixdate, RFC 850 or asctime form.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%A, %d-%b-%y %H:%M:%S GMT", "%a %b %e %H:%M:%S %Y"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|naive| naive.and_utc())
}

fn header_str(headers: &HeaderMap, name: header::HeaderName) -> Option<&str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn header_date(headers: &HeaderMap, name: header::HeaderName) -> Option<i64> {
    header_str(headers, name)
        .and_then(parse_http_date)
        .map(|dt| dt.timestamp())
}

fn etag_list_matches(list: &str, current: &str, eq: fn(&str, &str) -> bool) -> bool {
    list.split(',')
        .map(str::trim)
        .any(|candidate| candidate == "*" || eq(candidate, current))
}

fn strong_eq(a: &str, b: &str) -> bool {
    !a.starts_with("W/") && !b.starts_with("W/") && a == b
}

fn weak_eq(a: &str, b: &str) -> bool {
    a.trim_start_matches("W/") == b.trim_start_matches("W/")
}
