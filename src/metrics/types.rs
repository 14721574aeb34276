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

use crate::common::config::AppConfig;
use crate::parsing::common::{collapse_whitespace, uuid_head};

/// A pool member: UUID and the hostname it reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRecord {
    pub uuid: String,
    pub hostname: String,
}

/// A resident VM: UUID and display name (`name_label`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRecord {
    pub uuid: String,
    pub name: String,
}

impl VmRecord {
    /// The dom0 pseudo-VM, which is never reported as a VM.
    pub fn is_control_domain(&self) -> bool {
        is_control_domain(&self.name)
    }
}

pub fn is_control_domain(name: &str) -> bool {
    name.contains(AppConfig::CONTROL_DOMAIN_MARKER)
}

/// A storage repository attached to at least one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageRepoRecord {
    pub uuid: String,
    /// Display name with whitespace collapsed to `_`.
    pub name: String,
}

impl StorageRepoRecord {
    pub fn new(uuid: impl Into<String>, name_label: &str) -> Self {
        Self {
            uuid: uuid.into(),
            name: collapse_whitespace(name_label),
        }
    }

    /// Removable media and tools ISOs are infrastructure, not storage.
    pub fn is_infrastructure(&self) -> bool {
        AppConfig::EXCLUDED_SR_PREFIXES
            .iter()
            .any(|prefix| self.name.starts_with(prefix))
    }

    /// Short key used as `{#KEY}` in discovery: the UUID's first group.
    pub fn short_key(&self) -> &str {
        uuid_head(&self.uuid).unwrap_or(&self.uuid)
    }
}

/// One `(target, metric, value)` record, where target is a hostname or a VM
/// display name. Values stay text so nothing is lost in formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSample {
    pub target: String,
    pub metric: String,
    pub value: String,
}

impl MetricSample {
    pub fn new(
        target: impl Into<String>,
        metric: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            target: target.into(),
            metric: metric.into(),
            value: value.into(),
        }
    }
}

/// Hosts, VMs and storage repositories enumerated during one refresh.
///
/// Insertion order is kept; records are de-duplicated by UUID.
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: Vec<HostRecord>,
    vms: Vec<VmRecord>,
    storage_repos: Vec<StorageRepoRecord>,
    host_index: HashMap<String, usize>,
    vm_index: HashMap<String, usize>,
    sr_index: HashMap<String, usize>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_host(&mut self, record: HostRecord) {
        upsert(&mut self.hosts, &mut self.host_index, record.uuid.clone(), record);
    }

    pub fn add_vm(&mut self, record: VmRecord) {
        upsert(&mut self.vms, &mut self.vm_index, record.uuid.clone(), record);
    }

    /// Record a storage repository. Returns false when it is skipped as
    /// infrastructure-internal.
    pub fn add_storage_repo(&mut self, record: StorageRepoRecord) -> bool {
        if record.is_infrastructure() {
            return false;
        }
        upsert(
            &mut self.storage_repos,
            &mut self.sr_index,
            record.uuid.clone(),
            record,
        );
        true
    }

    pub fn hosts(&self) -> &[HostRecord] {
        &self.hosts
    }

    pub fn vms(&self) -> &[VmRecord] {
        &self.vms
    }

    pub fn storage_repos(&self) -> &[StorageRepoRecord] {
        &self.storage_repos
    }

    pub fn hostname(&self, uuid: &str) -> Option<&str> {
        self.host_index
            .get(uuid)
            .map(|&i| self.hosts[i].hostname.as_str())
    }

    pub fn vm(&self, uuid: &str) -> Option<&VmRecord> {
        self.vm_index.get(uuid).map(|&i| &self.vms[i])
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

fn upsert<T>(items: &mut Vec<T>, index: &mut HashMap<String, usize>, key: String, item: T) {
    match index.get(&key) {
        Some(&i) => items[i] = item,
        None => {
            index.insert(key, items.len());
            items.push(item);
        }
    }
}
