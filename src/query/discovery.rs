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

//! Zabbix low-level discovery payloads.
//!
//! Every list command answers with `{"data": [ ... ]}` where each element
//! uses the `{#MACRO}` field names the discovery rules expect.

use std::fmt;

use serde::Serialize;

/// The discovery envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discovery<T> {
    pub data: Vec<T>,
}

impl<T> Discovery<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Default for Discovery<T> {
    fn default() -> Self {
        Self { data: Vec::new() }
    }
}

impl<T: Serialize> fmt::Display for Discovery<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| fmt::Error)?;
        f.write_str(&json)
    }
}

/// `list`: one metric name of the queried host or VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricEntry {
    #[serde(rename = "{#CPUNAME}")]
    pub name: String,
}

/// `listni` and `listvbd`: a device key (`vif_0`, `vbd_xvda`) and its bare name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceEntry {
    #[serde(rename = "{#KEY}")]
    pub key: String,
    #[serde(rename = "{#NAME}")]
    pub name: String,
}

/// `listsr`: a storage repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageRepoEntry {
    #[serde(rename = "{#KEY}")]
    pub key: String,
    #[serde(rename = "{#UUID}")]
    pub uuid: String,
    #[serde(rename = "{#NAME}")]
    pub name: String,
}
