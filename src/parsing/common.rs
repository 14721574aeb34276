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

// Common parsing utilities for number extraction, float rendering and name sanitization.

use std::borrow::Cow;
use std::str::FromStr;

/// Parse a number from a string after trimming surrounding whitespace.
/// Returns None if parsing fails.
pub fn parse_number<T: FromStr>(s: &str) -> Option<T> {
    s.trim().parse::<T>().ok()
}

/// Render a float the way it is stored in the cache: always with a decimal
/// point for finite integral values (`35.0`, not `35`).
pub fn format_float(value: f64) -> String {
    let rendered = value.to_string();
    if !value.is_finite() || rendered.contains('.') {
        rendered
    } else {
        format!("{rendered}.0")
    }
}

/// Replace every whitespace character with `_` so the value can be stored
/// as a single cache field.
pub fn collapse_whitespace(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect()
}

/// Replace control characters (line breaks, tabs, ...) with `_` so a
/// display name can never span more than one cache line.
pub fn single_line(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_control) {
        Cow::Owned(
            s.chars()
                .map(|c| if c.is_control() { '_' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(s)
    }
}

/// Leading hexadecimal group of a UUID (`"3f2a9c1e-..."` -> `"3f2a9c1e"`).
/// Returns None when the input does not start with `<hex>-`.
pub fn uuid_head(uuid: &str) -> Option<&str> {
    let (head, _) = uuid.split_once('-')?;
    if !head.is_empty() && head.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(head)
    } else {
        None
    }
}
