//! `Range` header parsing and `multipart/byteranges` framing.
//!
//! Parsing is lenient in the same places common servers are: the end of a
//! range is clamped to the file, a suffix longer than the file selects all of
//! it, and ranges that start past the end are dropped as long as at least one
//! other range overlaps the file.

use filexfer_core::error::AppError;
use filexfer_core::result::AppResult;

const UNIT_PREFIX: &str = "bytes=";

/// One satisfiable byte range, already clamped to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// Offset of the first byte.
    pub start: u64,
    /// Number of bytes, always at least one.
    pub length: u64,
}

impl ByteRange {
    /// Offset of the last byte (inclusive).
    pub fn end(&self) -> u64 {
        self.start + self.length - 1
    }

    /// `Content-Range` value for this range of a `size`-byte file.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end(), size)
    }
}

/// `Content-Range` value sent with a 416 response.
pub fn unsatisfied_content_range(size: u64) -> String {
    format!("bytes */{size}")
}

/// Parse a `Range` header value against a file of `size` bytes.
///
/// An empty header yields no ranges. A malformed header, or one where no
/// range overlaps the file, is a [`RangeNotSatisfiable`] error carrying
/// `size`.
///
/// [`RangeNotSatisfiable`]: filexfer_core::error::ErrorKind::RangeNotSatisfiable
pub fn parse_range(header: &str, size: u64) -> AppResult<Vec<ByteRange>> {
    let invalid = || AppError::range_not_satisfiable(size);

    if header.is_empty() {
        return Ok(Vec::new());
    }
    let set = header.strip_prefix(UNIT_PREFIX).ok_or_else(invalid)?;

    let mut ranges = Vec::new();
    let mut no_overlap = false;
    for raw in set.split(',') {
        let raw = trim(raw);
        if raw.is_empty() {
            continue;
        }
        let (first, last) = raw.split_once('-').ok_or_else(invalid)?;
        let (first, last) = (trim(first), trim(last));

        if first.is_empty() {
            let suffix: u64 = last.parse().map_err(|_| invalid())?;
            let length = suffix.min(size);
            if length == 0 {
                no_overlap = true;
                continue;
            }
            ranges.push(ByteRange {
                start: size - length,
                length,
            });
            continue;
        }

        let start: u64 = first.parse().map_err(|_| invalid())?;
        if start >= size {
            no_overlap = true;
            continue;
        }
        let length = if last.is_empty() {
            size - start
        } else {
            let end: u64 = last.parse().map_err(|_| invalid())?;
            if start > end {
                return Err(invalid());
            }
            end.min(size - 1) - start + 1
        };
        ranges.push(ByteRange { start, length });
    }

    if no_overlap && ranges.is_empty() {
        return Err(invalid());
    }
    Ok(ranges)
}

/// Sum of the lengths of `ranges`.
pub fn total_length(ranges: &[ByteRange]) -> u64 {
    ranges.iter().map(|r| r.length).sum()
}

fn trim(s: &str) -> &str {
    s.trim_matches([' ', '\t'])
}

/// Framing for a `multipart/byteranges` body.
#[derive(Debug, Clone)]
pub struct Multipart {
    boundary: String,
}

impl Multipart {
    /// A layout with a freshly generated boundary.
    pub fn new() -> Self {
        Self::with_boundary(uuid::Uuid::new_v4().simple().to_string())
    }

    /// A layout with a fixed boundary.
    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
        }
    }

    /// Value of the response `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/byteranges; boundary={}", self.boundary)
    }

    /// Header block preceding the data of one part.
    pub fn part_header(&self, range: &ByteRange, content_type: &str, size: u64) -> String {
        format!(
            "--{}\r\nContent-Type: {}\r\nContent-Range: {}\r\n\r\n",
            self.boundary,
            content_type,
            range.content_range(size)
        )
    }

    /// Line break that terminates the data of each part.
    pub fn part_trailer(&self) -> &'static str {
        "\r\n"
    }

    /// Closing delimiter after the last part.
    pub fn closing(&self) -> String {
        format!("--{}--\r\n", self.boundary)
    }

    /// Exact length of the whole body.
    pub fn content_length(&self, ranges: &[ByteRange], content_type: &str, size: u64) -> u64 {
        let parts: u64 = ranges
            .iter()
            .map(|r| {
                self.part_header(r, content_type, size).len() as u64
                    + r.length
                    + self.part_trailer().len() as u64
            })
            .sum();
        parts + self.closing().len() as u64
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}
