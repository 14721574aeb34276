// Copyright 2025 Lablup Inc. and Jeongkyu Shin
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cache file lines: `<host> <metric> <value>`.
//!
//! The metric and the value never contain whitespace, the host field may
//! (VM display names such as `web 01`), so lines are split from the right.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheLineError {
    #[error("line is empty")]
    Empty,
    #[error("expected 3 fields, found {0}")]
    MissingField(usize),
}

/// One record of a cache file, borrowed from the line it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheLine<'a> {
    pub host: &'a str,
    pub metric: &'a str,
    pub value: &'a str,
}

impl<'a> CacheLine<'a> {
    pub fn new(host: &'a str, metric: &'a str, value: &'a str) -> Self {
        Self {
            host,
            metric,
            value,
        }
    }

    pub fn parse(line: &'a str) -> Result<Self, CacheLineError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(CacheLineError::Empty);
        }

        let (rest, value) = split_last_field(line).ok_or(CacheLineError::MissingField(1))?;
        let (host, metric) = split_last_field(rest).ok_or(CacheLineError::MissingField(2))?;

        Ok(Self {
            host,
            metric,
            value,
        })
    }
}

impl fmt::Display for CacheLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.host, self.metric, self.value)
    }
}

/// Split off the last whitespace-delimited token.
/// Returns `(rest, token)` with `rest` right-trimmed, or None when there is
/// no separator or either side would be empty.
fn split_last_field(s: &str) -> Option<(&str, &str)> {
    let idx = s.rfind(char::is_whitespace)?;
    let sep_len = s[idx..].chars().next().map_or(1, char::len_utf8);
    let token = &s[idx + sep_len..];
    let rest = s[..idx].trim_end();
    if token.is_empty() || rest.is_empty() {
        None
    } else {
        Some((rest, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let line = CacheLine::parse("xs01 cpu0 0.0312\n").unwrap();
        assert_eq!(line, CacheLine::new("xs01", "cpu0", "0.0312"));
    }

    #[test]
    fn test_host_with_spaces() {
        let line = CacheLine::parse("web server 01 vbd_xvda_read 1024.5").unwrap();
        assert_eq!(line.host, "web server 01");
        assert_eq!(line.metric, "vbd_xvda_read");
        assert_eq!(line.value, "1024.5");
    }

    #[test]
    fn test_rejects_short_lines() {
        assert_eq!(CacheLine::parse(""), Err(CacheLineError::Empty));
        assert_eq!(CacheLine::parse("   \n"), Err(CacheLineError::Empty));
        assert_eq!(
            CacheLine::parse("xs01"),
            Err(CacheLineError::MissingField(1))
        );
        assert_eq!(
            CacheLine::parse("xs01 cpu0"),
            Err(CacheLineError::MissingField(2))
        );
    }

    #[test]
    fn test_display_roundtrip() {
        let line = CacheLine::new("xs01", "cpu_count", "8");
        assert_eq!(line.to_string(), "xs01 cpu_count 8");
        let rendered = line.to_string();
        assert_eq!(CacheLine::parse(&rendered).unwrap(), line);
    }

    #[test]
    fn test_repeated_separators() {
        let line = CacheLine::parse("xs01  memory_total_kib   8388608").unwrap();
        assert_eq!(line.host, "xs01");
        assert_eq!(line.metric, "memory_total_kib");
        assert_eq!(line.value, "8388608");
    }
}
