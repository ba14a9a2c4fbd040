//! `Range` request header parsing and bounds checking.

use std::{str::FromStr, sync::LazyLock};

use bytes::Bytes;
use regex::Regex;
use thiserror::Error;

static RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^bytes=(\d*)-(\d*)$").expect("static range pattern")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RangeError {
    #[error("malformed Range header: {0}")]
    Malformed(String),

    #[error("requested range not satisfiable for {len} bytes")]
    Unsatisfiable { len: u64 },
}

/// A single byte range as sent by the client, before the blob length is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeSpec {
    /// `bytes=<start>-` or `bytes=<start>-<end>`.
    FromStart { start: u64, end: Option<u64> },
    /// `bytes=-<n>`: the last `n` bytes.
    Suffix(u64),
}

impl FromStr for RangeSpec {
    type Err = RangeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let malformed = || RangeError::Malformed(value.to_string());
        let caps = RANGE_RE.captures(value.trim()).ok_or_else(malformed)?;
        let number = |i: usize| -> Result<Option<u64>, RangeError> {
            match caps.get(i).map(|m| m.as_str()).filter(|s| !s.is_empty()) {
                Some(digits) => digits.parse().map(Some).map_err(|_| malformed()),
                None => Ok(None),
            }
        };

        match (number(1)?, number(2)?) {
            (Some(start), end) => Ok(Self::FromStart { start, end }),
            (None, Some(n)) => Ok(Self::Suffix(n)),
            (None, None) => Err(malformed()),
        }
    }
}

impl RangeSpec {
    /// Validates the range against a blob of `len` bytes.
    pub fn resolve(self, len: u64) -> Result<ByteRange, RangeError> {
        let unsatisfiable = RangeError::Unsatisfiable { len };
        if len == 0 {
            return Err(unsatisfiable);
        }
        let last = len - 1;

        let (start, end) = match self {
            Self::FromStart { start, end } => (start, end.unwrap_or(last)),
            Self::Suffix(0) => return Err(unsatisfiable),
            Self::Suffix(n) => (len.saturating_sub(n), last),
        };
        if start > end || end > last {
            return Err(unsatisfiable);
        }
        Ok(ByteRange { start, end })
    }
}

/// Inclusive byte range with `start <= end < len`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Never zero.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn content_range(&self, total: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, total)
    }

    /// Zero-copy view of the range within `blob`.
    pub fn slice(&self, blob: &Bytes) -> Bytes {
        blob.slice(self.start as usize..=self.end as usize)
    }
}

pub fn unsatisfied_content_range(len: u64) -> String {
    format!("bytes */{}", len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(v: &str) -> Result<RangeSpec, RangeError> {
        v.parse()
    }

    #[test]
    fn open_range_covers_whole_blob() {
        let r = parse("bytes=0-").expect("valid").resolve(100).expect("satisfiable");
        assert_eq!(r, ByteRange { start: 0, end: 99 });
        assert_eq!(r.len(), 100);
        assert_eq!(r.content_range(100), "bytes 0-99/100");
    }

    #[test]
    fn closed_range_is_inclusive() {
        let blob = Bytes::from((0u8..100).collect::<Vec<_>>());
        let r = parse("bytes=10-19").expect("valid").resolve(100).expect("satisfiable");
        assert_eq!(r.len(), 10);
        assert_eq!(&r.slice(&blob)[..], &(10u8..20).collect::<Vec<_>>()[..]);
        assert_eq!(r.content_range(100), "bytes 10-19/100");
    }

    #[test]
    fn suffix_takes_tail() {
        let r = parse("bytes=-10").expect("valid").resolve(100).expect("satisfiable");
        assert_eq!(r, ByteRange { start: 90, end: 99 });
        let all = parse("bytes=-500").expect("valid").resolve(100).expect("satisfiable");
        assert_eq!(all, ByteRange { start: 0, end: 99 });
    }

    #[test]
    fn rejects_malformed_headers() {
        for bad in ["", "bytes=", "bytes=-", "items=0-10", "bytes=a-b", "bytes=0-1,5-6", "0-10"] {
            assert!(
                matches!(parse(bad), Err(RangeError::Malformed(_))),
                "accepted {:?}",
                bad
            );
        }
        assert!(matches!(
            parse("bytes=99999999999999999999999-"),
            Err(RangeError::Malformed(_))
        ));
    }

    #[test]
    fn out_of_bounds_is_unsatisfiable() {
        let unsat = Err(RangeError::Unsatisfiable { len: 100 });
        assert_eq!(parse("bytes=100-").expect("valid").resolve(100), unsat);
        assert_eq!(parse("bytes=50-100").expect("valid").resolve(100), unsat);
        assert_eq!(parse("bytes=20-10").expect("valid").resolve(100), unsat);
        assert_eq!(parse("bytes=-0").expect("valid").resolve(100), unsat);
        assert_eq!(
            parse("bytes=0-").expect("valid").resolve(0),
            Err(RangeError::Unsatisfiable { len: 0 })
        );
        assert_eq!(unsatisfied_content_range(100), "bytes */100");
    }
}
