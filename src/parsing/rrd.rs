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

//! rrd_updates export documents.
//!
//! ```text
//! <xport>
//!   <meta> ... <legend><entry>AVERAGE:host:<uuid>:cpu0</entry> ... </legend></meta>
//!   <data><row><t>1700000000</t><v>0.0123</v> ... </row> ... </data>
//! </xport>
//! ```
//!
//! The N-th legend entry describes the N-th `<v>` of a row. Only the first
//! row (the most recent sample) is used.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Error, Result};

static LEGEND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<legend>(.*?)</legend>").expect("legend pattern is valid")
});
static ENTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<entry>([^<]*)</entry>").expect("entry pattern is valid"));
static ROW_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<row>(.*?)</row>").expect("row pattern is valid"));
static VALUE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<v>([^<]*)</v>").expect("value pattern is valid"));

/// Legend plus most recent row of one rrd_updates response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeriesDocument {
    legend: Vec<String>,
    values: Vec<String>,
}

impl TimeSeriesDocument {
    /// Parse a raw rrd_updates document fetched from `host`.
    ///
    /// Fails when the legend is missing, or when the first row does not carry
    /// exactly one value per legend entry. A document without rows yields no
    /// samples.
    pub fn parse(host: &str, text: &str) -> Result<Self> {
        let legend_block = LEGEND_RE
            .captures(text)
            .and_then(|cap| cap.get(1))
            .ok_or_else(|| Error::TimeSeries {
                host: host.to_string(),
                reason: "document has no <legend>".to_string(),
            })?;

        let legend: Vec<String> = ENTRY_RE
            .captures_iter(legend_block.as_str())
            .map(|cap| cap[1].trim().to_string())
            .collect();

        let Some(row) = ROW_RE.captures(text).and_then(|cap| cap.get(1)) else {
            debug!(host, entries = legend.len(), "rrd_updates document has no rows");
            return Ok(Self {
                legend,
                values: Vec::new(),
            });
        };

        let values: Vec<String> = VALUE_RE
            .captures_iter(row.as_str())
            .map(|cap| cap[1].trim().to_string())
            .collect();

        if values.len() != legend.len() {
            return Err(Error::TimeSeries {
                host: host.to_string(),
                reason: format!(
                    "legend has {} entries but the row has {} values",
                    legend.len(),
                    values.len()
                ),
            });
        }

        Ok(Self { legend, values })
    }

    /// Legend entries paired with their value, in document order.
    pub fn samples(&self) -> impl Iterator<Item = (&str, &str)> {
        self.legend
            .iter()
            .zip(self.values.iter())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
