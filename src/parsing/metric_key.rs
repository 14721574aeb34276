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

//! RRD legend keys of the form `AVERAGE:host:<uuid>:cpu0`.

use std::fmt;
use std::str::FromStr;

/// Consolidation function of an RRD data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregationKind {
    Average,
    Min,
    Max,
    Last,
    Other(String),
}

impl From<&str> for AggregationKind {
    fn from(s: &str) -> Self {
        match s {
            "AVERAGE" => Self::Average,
            "MIN" => Self::Min,
            "MAX" => Self::Max,
            "LAST" => Self::Last,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Kind of object an RRD data source belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainKind {
    Host,
    Vm,
    Other(String),
}

impl From<&str> for DomainKind {
    fn from(s: &str) -> Self {
        match s {
            "host" => Self::Host,
            "vm" => Self::Vm,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Reasons a legend entry is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricKeyError {
    #[error("expected 4 ':'-separated fields, found {0}")]
    FieldCount(usize),
    #[error("field {0} is empty")]
    EmptyField(usize),
    #[error("field {0} contains whitespace")]
    Whitespace(usize),
}

/// A parsed `(aggregation, domain, object id, metric name)` legend entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricKey {
    pub aggregation: AggregationKind,
    pub domain: DomainKind,
    pub object_id: String,
    pub metric: String,
}

impl MetricKey {
    pub fn is_average(&self) -> bool {
        self.aggregation == AggregationKind::Average
    }
}

impl FromStr for MetricKey {
    type Err = MetricKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().splitn(4, ':').collect();
        if fields.len() != 4 {
            return Err(MetricKeyError::FieldCount(fields.len()));
        }
        for (index, field) in fields.iter().enumerate() {
            if field.is_empty() {
                return Err(MetricKeyError::EmptyField(index));
            }
            if field.chars().any(char::is_whitespace) {
                return Err(MetricKeyError::Whitespace(index));
            }
        }

        Ok(Self {
            aggregation: AggregationKind::from(fields[0]),
            domain: DomainKind::from(fields[1]),
            object_id: fields[2].to_string(),
            metric: fields[3].to_string(),
        })
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let aggregation = match &self.aggregation {
            AggregationKind::Average => "AVERAGE",
            AggregationKind::Min => "MIN",
            AggregationKind::Max => "MAX",
            AggregationKind::Last => "LAST",
            AggregationKind::Other(s) => s,
        };
        let domain = match &self.domain {
            DomainKind::Host => "host",
            DomainKind::Vm => "vm",
            DomainKind::Other(s) => s,
        };
        write!(f, "{aggregation}:{domain}:{}:{}", self.object_id, self.metric)
    }
}
