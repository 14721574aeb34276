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

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::metrics::types::{Inventory, MetricSample};
use crate::parsing::cache_line::CacheLine;
use crate::parsing::common::{format_float, parse_number, single_line};
use crate::parsing::metric_key::{DomainKind, MetricKey};
use crate::parsing::rrd::TimeSeriesDocument;

static CPU_METRIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^cpu\d+$").expect("cpu pattern is valid"));

/// Synthetic metric carrying the sum of all `cpuN` values of a target.
pub const CPU_SUM_METRIC: &str = "cpu";
/// Synthetic metric carrying how many `cpuN` values were summed.
pub const CPU_COUNT_METRIC: &str = "cpu_count";

pub fn is_cpu_metric(metric: &str) -> bool {
    CPU_METRIC_RE.is_match(metric)
}

/// Running sum of the per-core CPU values of one host or VM.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuAggregate {
    pub sum: f64,
    pub count: u32,
}

impl CpuAggregate {
    pub fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
    }
}

/// Samples for one cache file plus the CPU aggregates collected on the way.
#[derive(Debug, Default)]
struct SampleSet {
    samples: Vec<MetricSample>,
    cpu_order: Vec<String>,
    cpu: HashMap<String, CpuAggregate>,
}

impl SampleSet {
    fn push(&mut self, target: &str, metric: &str, value: &str) {
        let target = single_line(target);
        let target = target.as_ref();
        if is_cpu_metric(metric) {
            match parse_number::<f64>(value) {
                Some(v) => {
                    if !self.cpu.contains_key(target) {
                        self.cpu_order.push(target.to_string());
                    }
                    self.cpu.entry(target.to_string()).or_default().add(v);
                }
                None => warn!(
                    subject = target,
                    metric,
                    value,
                    "non-numeric cpu sample left out of aggregate"
                ),
            }
        }
        self.samples.push(MetricSample::new(target, metric, value));
    }

    fn finish(mut self) -> Vec<MetricSample> {
        for target in &self.cpu_order {
            let agg = self.cpu[target];
            self.samples
                .push(MetricSample::new(target, CPU_SUM_METRIC, format_float(agg.sum)));
        }
        for target in &self.cpu_order {
            let agg = self.cpu[target];
            self.samples
                .push(MetricSample::new(target, CPU_COUNT_METRIC, agg.count.to_string()));
        }
        self.samples
    }
}

/// Output of one aggregation pass: the contents of the host and VM cache files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectedStats {
    pub host_samples: Vec<MetricSample>,
    pub vm_samples: Vec<MetricSample>,
}

/// Turns raw legend/value pairs into resolved samples for the cache files.
pub struct StatsAggregator<'a> {
    inventory: &'a Inventory,
}

impl<'a> StatsAggregator<'a> {
    pub fn new(inventory: &'a Inventory) -> Self {
        Self { inventory }
    }

    /// Resolve, filter and aggregate `(legend key, value)` pairs.
    ///
    /// Only `AVERAGE` samples of known hosts and VMs are kept; the control
    /// domain is dropped. `cpu` and `cpu_count` lines are appended after all
    /// regular samples.
    pub fn aggregate<'s, I>(&self, entries: I) -> CollectedStats
    where
        I: IntoIterator<Item = (&'s str, &'s str)>,
    {
        let mut hosts = SampleSet::default();
        let mut vms = SampleSet::default();

        for (raw_key, value) in entries {
            let key = match raw_key.parse::<MetricKey>() {
                Ok(key) => key,
                Err(e) => {
                    debug!(key = raw_key, error = %e, "skipping malformed legend entry");
                    continue;
                }
            };
            if !key.is_average() {
                continue;
            }

            match key.domain {
                DomainKind::Host => {
                    if let Some(hostname) = self.inventory.hostname(&key.object_id) {
                        hosts.push(hostname, &key.metric, value);
                    }
                }
                DomainKind::Vm => {
                    if let Some(vm) = self.inventory.vm(&key.object_id) {
                        if !vm.is_control_domain() {
                            vms.push(&vm.name, &key.metric, value);
                        }
                    }
                }
                DomainKind::Other(_) => {}
            }
        }

        CollectedStats {
            host_samples: hosts.finish(),
            vm_samples: vms.finish(),
        }
    }

    /// Aggregate the merged samples of several documents.
    pub fn aggregate_documents(&self, documents: &[TimeSeriesDocument]) -> CollectedStats {
        let merged = merge_documents(documents);
        self.aggregate(merged.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }
}

/// Merge the samples of several documents into one ordered list.
///
/// A key reported by more than one host keeps the position of its first
/// appearance and the value of its last.
pub fn merge_documents(documents: &[TimeSeriesDocument]) -> Vec<(String, String)> {
    let mut merged: Vec<(String, String)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for document in documents {
        for (key, value) in document.samples() {
            match index.get(key) {
                Some(&i) => merged[i].1 = value.to_string(),
                None => {
                    index.insert(key.to_string(), merged.len());
                    merged.push((key.to_string(), value.to_string()));
                }
            }
        }
    }

    merged
}

/// Render samples as cache file contents, one line per sample.
pub fn render_samples(samples: &[MetricSample]) -> String {
    let mut out = String::new();
    for sample in samples {
        out.push_str(&CacheLine::new(&sample.target, &sample.metric, &sample.value).to_string());
        out.push('\n');
    }
    out
}

/// Render the storage repository list: `<short key> <uuid> <name>` per line.
pub fn render_storage_repos(inventory: &Inventory) -> String {
    let mut out = String::new();
    for sr in inventory.storage_repos() {
        out.push_str(&CacheLine::new(sr.short_key(), &sr.uuid, &sr.name).to_string());
        out.push('\n');
    }
    out
}
