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

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use regex::Regex;
use tracing::{debug, warn};

use crate::common::config::CachePaths;
use crate::error::{Error, Result};
use crate::parsing::cache_line::{CacheLine, CacheLineError};
use crate::query::discovery::{DeviceEntry, Discovery, MetricEntry, StorageRepoEntry};

/// Which per-hostname cache file a query reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Host,
    Vm,
}

impl FromStr for TargetKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "host" => Ok(Self::Host),
            "vm" => Ok(Self::Vm),
            other => Err(Error::InvalidTarget(other.to_string())),
        }
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => f.write_str("host"),
            Self::Vm => f.write_str("vm"),
        }
    }
}

/// Compile a list filter. Patterns match from the start of the candidate.
pub fn compile_filter(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?:{pattern})")).map_err(|source| Error::InvalidFilter {
        pattern: pattern.to_string(),
        source,
    })
}

/// A network device metric split into `(kind, suffix)`:
/// `vif_0_rx` is `("vif", "0")`, `pif_eth0_io_write` is `("pif", "eth0")`.
pub fn split_interface_metric(metric: &str) -> Option<(&str, &str)> {
    let kind = ["vif", "pif"]
        .into_iter()
        .find(|kind| metric.starts_with(kind))?;
    device_suffix(metric, kind).map(|suffix| (kind, suffix))
}

/// The device of a virtual block device metric: `vbd_xvda_read` is `xvda`.
pub fn split_disk_metric(metric: &str) -> Option<&str> {
    device_suffix(metric, "vbd")
}

fn device_suffix<'a>(metric: &'a str, kind: &str) -> Option<&'a str> {
    let rest = metric.strip_prefix(kind)?.strip_prefix('_')?;
    let (suffix, attribute) = rest.split_once('_')?;
    if suffix.is_empty() || attribute.is_empty() {
        None
    } else {
        Some(suffix)
    }
}

/// A fully validated poller request, built before any network traffic.
#[derive(Debug, Clone)]
pub enum Query {
    Metrics(Regex),
    Interfaces(Regex),
    VirtualDisks(Regex),
    StorageRepos(Regex),
    Value(String),
}

/// Read-only queries against the published cache of one hostname.
///
/// Readers never take the refresh lock: files are only ever replaced by
/// rename, so every read sees one complete generation.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    paths: CachePaths,
}

impl QueryEngine {
    pub fn new(paths: CachePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &CachePaths {
        &self.paths
    }

    /// Run `query` and render what goes to stdout. `None` means print
    /// nothing.
    pub fn execute(&self, target: TargetKind, query: &Query) -> Result<Option<String>> {
        let rendered = match query {
            Query::Metrics(filter) => self.list_metrics(target, filter)?.to_string(),
            Query::Interfaces(filter) => self.list_interfaces(target, filter)?.to_string(),
            Query::VirtualDisks(filter) => self.list_virtual_disks(target, filter)?.to_string(),
            Query::StorageRepos(filter) => self.list_storage_repos(filter)?.to_string(),
            Query::Value(metric) => return self.read_value(target, metric),
        };
        Ok(Some(rendered))
    }

    /// `list`: metric names of the queried host (or VM) matching `filter`.
    pub fn list_metrics(
        &self,
        target: TargetKind,
        filter: &Regex,
    ) -> Result<Discovery<MetricEntry>> {
        let mut data = Vec::new();
        self.for_each_own_line(target, |line| {
            if filter.is_match(line.metric) {
                data.push(MetricEntry {
                    name: line.metric.to_string(),
                });
            }
        })?;
        Ok(Discovery::new(data))
    }

    /// `listni`: distinct VIF/PIF devices, keyed `<kind>_<suffix>`.
    pub fn list_interfaces(
        &self,
        target: TargetKind,
        filter: &Regex,
    ) -> Result<Discovery<DeviceEntry>> {
        self.list_devices(target, filter, |metric| {
            if !(metric.starts_with("vif") || metric.starts_with("pif")) {
                return DeviceMetric::Other;
            }
            match split_interface_metric(metric) {
                Some((kind, suffix)) => DeviceMetric::Device {
                    key: format!("{kind}_{suffix}"),
                    name: suffix.to_string(),
                },
                None => DeviceMetric::Malformed,
            }
        })
    }

    /// `listvbd`: distinct virtual block devices, keyed `vbd_<device>`.
    pub fn list_virtual_disks(
        &self,
        target: TargetKind,
        filter: &Regex,
    ) -> Result<Discovery<DeviceEntry>> {
        self.list_devices(target, filter, |metric| {
            if !metric.starts_with("vbd") {
                return DeviceMetric::Other;
            }
            match split_disk_metric(metric) {
                Some(device) => DeviceMetric::Device {
                    key: format!("vbd_{device}"),
                    name: device.to_string(),
                },
                None => DeviceMetric::Malformed,
            }
        })
    }

    /// `listsr`: the cluster-wide storage repositories whose name matches
    /// `filter`. Not scoped to the queried host.
    pub fn list_storage_repos(&self, filter: &Regex) -> Result<Discovery<StorageRepoEntry>> {
        let path = self.paths.sr_file();
        let content = read_cache(&path)?;
        let mut data = Vec::new();
        for_each_line(&path, &content, |line| {
            if filter.is_match(line.value) {
                data.push(StorageRepoEntry {
                    key: line.host.to_string(),
                    uuid: line.metric.to_string(),
                    name: line.value.to_string(),
                });
            }
        });
        Ok(Discovery::new(data))
    }

    /// `value`: the first value recorded for `metric` on the queried host
    /// (or VM), or None when there is none.
    pub fn read_value(&self, target: TargetKind, metric: &str) -> Result<Option<String>> {
        let path = self.file_for(target);
        let content = read_cache(&path)?;
        let host = self.paths.hostname();

        let mut found = None;
        for_each_line(&path, &content, |line| {
            if found.is_none() && line.host == host && line.metric == metric {
                found = Some(line.value.to_string());
            }
        });

        if found.is_none() {
            debug!(host, metric, file = %path.display(), "no value cached for metric");
        }
        Ok(found)
    }

    fn file_for(&self, target: TargetKind) -> PathBuf {
        match target {
            TargetKind::Host => self.paths.host_file(),
            TargetKind::Vm => self.paths.vm_file(),
        }
    }

    fn for_each_own_line<F>(&self, target: TargetKind, mut f: F) -> Result<()>
    where
        F: FnMut(CacheLine<'_>),
    {
        let path = self.file_for(target);
        let content = read_cache(&path)?;
        let host = self.paths.hostname();
        for_each_line(&path, &content, |line| {
            if line.host == host {
                f(line);
            }
        });
        Ok(())
    }

    /// Collapse device metrics to one entry per key, in first-seen order.
    fn list_devices<F>(
        &self,
        target: TargetKind,
        filter: &Regex,
        classify: F,
    ) -> Result<Discovery<DeviceEntry>>
    where
        F: Fn(&str) -> DeviceMetric,
    {
        let mut seen = HashSet::new();
        let mut devices = Vec::new();
        self.for_each_own_line(target, |line| match classify(line.metric) {
            DeviceMetric::Other => {}
            DeviceMetric::Malformed => {
                warn!(metric = line.metric, "skipping device metric without a device name");
            }
            DeviceMetric::Device { key, name } => {
                if seen.insert(key.clone()) {
                    devices.push(DeviceEntry { key, name });
                }
            }
        })?;

        devices.retain(|entry| filter.is_match(&entry.key));
        Ok(Discovery::new(devices))
    }
}

enum DeviceMetric {
    Other,
    Malformed,
    Device { key: String, name: String },
}

fn read_cache(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::cache(path, e))
}

fn for_each_line<'a, F>(path: &Path, content: &'a str, mut f: F)
where
    F: FnMut(CacheLine<'a>),
{
    for (number, raw) in content.lines().enumerate() {
        match CacheLine::parse(raw) {
            Ok(line) => f(line),
            Err(CacheLineError::Empty) => {}
            Err(e) => {
                warn!(
                    file = %path.display(),
                    line = number + 1,
                    error = %e,
                    "skipping malformed cache line"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn engine(dir: &TempDir, host_lines: &str) -> QueryEngine {
        let paths = CachePaths::new(dir.path(), "h1");
        std::fs::write(paths.host_file(), host_lines).unwrap();
        std::fs::write(paths.vm_file(), "").unwrap();
        std::fs::write(paths.sr_file(), "").unwrap();
        QueryEngine::new(paths)
    }

    fn names(discovery: &Discovery<MetricEntry>) -> Vec<&str> {
        discovery.data.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_target_kind_parsing() {
        assert_eq!("host".parse::<TargetKind>().unwrap(), TargetKind::Host);
        assert_eq!("vm".parse::<TargetKind>().unwrap(), TargetKind::Vm);
        let err = "cluster".parse::<TargetKind>().unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_INVALID_TARGET);
    }

    #[test]
    fn test_filter_is_anchored_at_start() {
        let filter = compile_filter(r"cpu\d+").unwrap();
        assert!(filter.is_match("cpu0"));
        assert!(filter.is_match("cpu12_extra"));
        assert!(!filter.is_match("avg_cpu0"));
        assert!(matches!(
            compile_filter("(unclosed"),
            Err(Error::InvalidFilter { .. })
        ));
    }

    #[test]
    fn test_list_metrics_filters_by_host_and_pattern() {
        let dir = TempDir::new().unwrap();
        let engine = engine(
            &dir,
            "h1 cpu0 0.1\nh1 cpu1 0.2\nh1 memory_total 1024\nh2 cpu0 0.9\n",
        );
        let filter = compile_filter(r"cpu\d+").unwrap();
        let result = engine.list_metrics(TargetKind::Host, &filter).unwrap();
        assert_eq!(names(&result), vec!["cpu0", "cpu1"]);
    }

    #[test]
    fn test_malformed_lines_are_skipped() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, "h1 cpu0 0.1\ngarbage\n\nh1 cpu1 0.2\n");
        let filter = compile_filter(".*").unwrap();
        let result = engine.list_metrics(TargetKind::Host, &filter).unwrap();
        assert_eq!(names(&result), vec!["cpu0", "cpu1"]);
    }

    #[test]
    fn test_interfaces_collapse() {
        let dir = TempDir::new().unwrap();
        let engine = engine(
            &dir,
            "h1 vif_0_rx 1\nh1 vif_0_tx 2\nh1 pif_eth0_rx 3\nh1 vif_broken 4\nh1 cpu0 0.1\n",
        );
        let filter = compile_filter(".*").unwrap();
        let result = engine.list_interfaces(TargetKind::Host, &filter).unwrap();
        assert_eq!(
            result.data,
            vec![
                DeviceEntry {
                    key: "vif_0".into(),
                    name: "0".into()
                },
                DeviceEntry {
                    key: "pif_eth0".into(),
                    name: "eth0".into()
                },
            ]
        );

        let only_pif = compile_filter("pif").unwrap();
        let result = engine.list_interfaces(TargetKind::Host, &only_pif).unwrap();
        assert_eq!(result.len(), 1);
    }

    #[test]
    fn test_virtual_disks() {
        let dir = TempDir::new().unwrap();
        let paths = CachePaths::new(dir.path(), "web 01");
        std::fs::write(
            paths.vm_file(),
            "web 01 vbd_xvda_read 10\nweb 01 vbd_xvda_write 20\nweb 01 vbd_xvdb_read 0\ndb01 vbd_xvdc_read 1\n",
        )
        .unwrap();
        let engine = QueryEngine::new(paths);
        let filter = compile_filter(".*").unwrap();
        let result = engine.list_virtual_disks(TargetKind::Vm, &filter).unwrap();
        let keys: Vec<_> = result.data.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["vbd_xvda", "vbd_xvdb"]);
        assert_eq!(result.data[0].name, "xvda");
    }

    #[test]
    fn test_storage_repos_are_cluster_wide() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, "");
        std::fs::write(
            engine.paths().sr_file(),
            "9a8b7c6d 9a8b7c6d-1111-2222-3333-444455556666 Local_storage\n0f0f0f0f 0f0f0f0f-aaaa NFS_share\n",
        )
        .unwrap();

        let all = engine.list_storage_repos(&compile_filter(".*").unwrap()).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all.data[0].key, "9a8b7c6d");
        assert_eq!(all.data[0].uuid, "9a8b7c6d-1111-2222-3333-444455556666");

        let nfs = engine.list_storage_repos(&compile_filter("NFS").unwrap()).unwrap();
        assert_eq!(nfs.data[0].name, "NFS_share");
        assert_eq!(nfs.len(), 1);
    }

    #[test]
    fn test_read_value() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, "h2 cpu 9.0\nh1 cpu 35.0\nh1 cpu 1.0\n");
        assert_eq!(
            engine.read_value(TargetKind::Host, "cpu").unwrap(),
            Some("35.0".to_string())
        );
        assert_eq!(engine.read_value(TargetKind::Host, "memory").unwrap(), None);
    }

    #[derive(Clone, Default)]
    struct LogCapture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogCapture {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_read_value_reports_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, "garbage\nh1 cpu 35.0\n");

        let capture = LogCapture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .with_writer(move || writer.clone())
            .finish();
        let value = tracing::subscriber::with_default(subscriber, || {
            engine.read_value(TargetKind::Host, "cpu").unwrap()
        });

        assert_eq!(value.as_deref(), Some("35.0"));
        let logs = String::from_utf8(capture.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("skipping malformed cache line"));
        assert!(logs.contains("line=1"));
    }

    #[test]
    fn test_execute_renders_discovery() {
        let dir = TempDir::new().unwrap();
        let engine = engine(&dir, "h1 cpu0 0.1\nh1 cpu 0.1\n");
        let query = Query::Metrics(compile_filter(r"cpu\d").unwrap());
        let out = engine.execute(TargetKind::Host, &query).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value, serde_json::json!({ "data": [{ "{#CPUNAME}": "cpu0" }] }));

        let miss = Query::Value("nope".into());
        assert_eq!(engine.execute(TargetKind::Host, &miss).unwrap(), None);
    }

    #[test]
    fn test_missing_cache_is_cache_error() {
        let dir = TempDir::new().unwrap();
        let engine = QueryEngine::new(CachePaths::new(dir.path(), "h1"));
        let err = engine.read_value(TargetKind::Host, "cpu").unwrap_err();
        assert!(matches!(err, Error::CacheAccess { .. }));
    }
}
