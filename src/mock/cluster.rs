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

//! A synthetic pool: hosts, guests, storage and the samples they report.

use std::fmt::Write;

use rand::{rng, Rng};
use serde_json::{json, Map, Value};

use crate::mock::constants::{
    HOST_CPU_COUNT, HOST_MEMORY_KIB, HOST_PIFS, NULL_REF, RRD_STEP_SECS, VM_CPU_COUNT, VM_DISKS,
    VM_MEMORY_BYTES, VM_VIF_COUNT,
};

#[derive(Debug, Clone)]
pub struct MockHost {
    pub reference: String,
    pub uuid: String,
    pub hostname: String,
}

#[derive(Debug, Clone)]
pub struct MockVm {
    pub reference: String,
    pub uuid: String,
    pub name_label: String,
    pub resident_on: String,
    pub is_a_template: bool,
    pub is_control_domain: bool,
}

#[derive(Debug, Clone)]
pub struct MockSr {
    pub reference: String,
    pub uuid: String,
    pub name_label: String,
}

#[derive(Debug, Clone)]
pub struct MockPbd {
    pub reference: String,
    pub host: String,
    pub sr: String,
}

#[derive(Debug, Clone, Default)]
pub struct MockCluster {
    pub hosts: Vec<MockHost>,
    pub vms: Vec<MockVm>,
    pub srs: Vec<MockSr>,
    pub pbds: Vec<MockPbd>,
}

pub fn generate_uuid() -> String {
    let mut rng = rng();
    let bytes: [u8; 16] = rng.random();
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        bytes[8], bytes[9], bytes[10], bytes[11], bytes[12], bytes[13], bytes[14], bytes[15]
    )
}

fn opaque_ref() -> String {
    format!("OpaqueRef:{}", generate_uuid())
}

impl MockCluster {
    /// Build a pool of `host_count` members named `127.0.0.1`, `127.0.0.2`, ...
    /// each running `vms_per_host` guests plus its control domain.
    pub fn generate(host_count: usize, vms_per_host: usize) -> Self {
        let mut cluster = Self::default();

        let shared = MockSr {
            reference: opaque_ref(),
            uuid: generate_uuid(),
            name_label: "NFS VM storage".to_string(),
        };
        let tools = MockSr {
            reference: opaque_ref(),
            uuid: generate_uuid(),
            name_label: "XenServer Tools".to_string(),
        };

        for i in 0..host_count {
            let host = MockHost {
                reference: opaque_ref(),
                uuid: generate_uuid(),
                hostname: format!("127.0.0.{}", i + 1),
            };

            cluster.vms.push(MockVm {
                reference: opaque_ref(),
                uuid: generate_uuid(),
                name_label: format!("Control domain on host: {}", host.hostname),
                resident_on: host.reference.clone(),
                is_a_template: false,
                is_control_domain: true,
            });
            for v in 0..vms_per_host {
                cluster.vms.push(MockVm {
                    reference: opaque_ref(),
                    uuid: generate_uuid(),
                    name_label: format!("guest {:02}-{:02}", i + 1, v + 1),
                    resident_on: host.reference.clone(),
                    is_a_template: false,
                    is_control_domain: false,
                });
            }

            let local = MockSr {
                reference: opaque_ref(),
                uuid: generate_uuid(),
                name_label: format!("Local storage {}", i + 1),
            };
            let dvd = MockSr {
                reference: opaque_ref(),
                uuid: generate_uuid(),
                name_label: "DVD drives".to_string(),
            };
            for sr in [&local, &dvd, &shared, &tools] {
                cluster.pbds.push(MockPbd {
                    reference: opaque_ref(),
                    host: host.reference.clone(),
                    sr: sr.reference.clone(),
                });
            }
            cluster.srs.push(local);
            cluster.srs.push(dvd);
            cluster.hosts.push(host);
        }
        cluster.srs.push(shared);
        cluster.srs.push(tools);

        // Neither is resident anywhere, so neither has samples.
        cluster.vms.push(MockVm {
            reference: opaque_ref(),
            uuid: generate_uuid(),
            name_label: "Debian Bookworm 12".to_string(),
            resident_on: NULL_REF.to_string(),
            is_a_template: true,
            is_control_domain: false,
        });
        cluster.vms.push(MockVm {
            reference: opaque_ref(),
            uuid: generate_uuid(),
            name_label: "halted guest".to_string(),
            resident_on: NULL_REF.to_string(),
            is_a_template: false,
            is_control_domain: false,
        });

        cluster
    }

    pub fn host_by_name(&self, hostname: &str) -> Option<&MockHost> {
        self.hosts.iter().find(|h| h.hostname == hostname)
    }

    /// `get_all_records` result for `class`, or None for an unknown class.
    pub fn all_records(&self, class: &str) -> Option<Value> {
        let mut records = Map::new();
        match class {
            "host" => {
                for host in &self.hosts {
                    let resident: Vec<&str> = self
                        .vms
                        .iter()
                        .filter(|vm| vm.resident_on == host.reference)
                        .map(|vm| vm.reference.as_str())
                        .collect();
                    let pbds: Vec<&str> = self
                        .pbds
                        .iter()
                        .filter(|pbd| pbd.host == host.reference)
                        .map(|pbd| pbd.reference.as_str())
                        .collect();
                    records.insert(
                        host.reference.clone(),
                        json!({
                            "uuid": host.uuid,
                            "hostname": host.hostname,
                            "name_label": host.hostname,
                            "resident_VMs": resident,
                            "PBDs": pbds,
                        }),
                    );
                }
            }
            "VM" => {
                for vm in &self.vms {
                    let power_state = if vm.resident_on == NULL_REF {
                        "Halted"
                    } else {
                        "Running"
                    };
                    records.insert(
                        vm.reference.clone(),
                        json!({
                            "uuid": vm.uuid,
                            "name_label": vm.name_label,
                            "resident_on": vm.resident_on,
                            "power_state": power_state,
                            "is_a_template": vm.is_a_template,
                            "is_control_domain": vm.is_control_domain,
                        }),
                    );
                }
            }
            "PBD" => {
                for pbd in &self.pbds {
                    records.insert(
                        pbd.reference.clone(),
                        json!({
                            "uuid": generate_uuid(),
                            "host": pbd.host,
                            "SR": pbd.sr,
                            "currently_attached": true,
                        }),
                    );
                }
            }
            "SR" => {
                for sr in &self.srs {
                    records.insert(
                        sr.reference.clone(),
                        json!({ "uuid": sr.uuid, "name_label": sr.name_label }),
                    );
                }
            }
            _ => return None,
        }
        Some(Value::Object(records))
    }

    /// An rrd_updates export for `host`: its own samples followed by those of
    /// every VM resident on it, with a single row of fresh random values.
    pub fn rrd_document(&self, host: &MockHost, now: i64) -> String {
        let mut rng = rng();
        let mut samples: Vec<(String, String)> = Vec::new();
        let host_key = |metric: &str| format!("AVERAGE:host:{}:{metric}", host.uuid);

        for cpu in 0..HOST_CPU_COUNT {
            samples.push((
                host_key(&format!("cpu{cpu}")),
                format!("{:.4}", rng.random_range(0.0..1.0)),
            ));
            samples.push((
                host_key(&format!("cpu{cpu}-C0")),
                format!("{:.4}", rng.random_range(0.0..1.0)),
            ));
        }
        samples.push((host_key("cpu_avg"), format!("{:.4}", rng.random_range(0.0..1.0))));
        samples.push((host_key("memory_total_kib"), HOST_MEMORY_KIB.to_string()));
        samples.push((
            host_key("memory_free_kib"),
            rng.random_range(HOST_MEMORY_KIB / 10..HOST_MEMORY_KIB / 2).to_string(),
        ));
        samples.push((host_key("loadavg"), format!("{:.4}", rng.random_range(0.0..4.0))));
        for pif in HOST_PIFS {
            for attr in ["rx", "tx"] {
                samples.push((
                    host_key(&format!("pif_{pif}_{attr}")),
                    format!("{:.4}", rng.random_range(0.0..1.0e7)),
                ));
            }
        }
        // Peak value, dropped by the bridge.
        samples.push((
            format!("MAX:host:{}:cpu0", host.uuid),
            format!("{:.4}", rng.random_range(0.0..1.0)),
        ));

        for vm in self.vms.iter().filter(|vm| vm.resident_on == host.reference) {
            let vm_key = |metric: &str| format!("AVERAGE:vm:{}:{metric}", vm.uuid);
            for cpu in 0..VM_CPU_COUNT {
                samples.push((
                    vm_key(&format!("cpu{cpu}")),
                    format!("{:.4}", rng.random_range(0.0..1.0)),
                ));
            }
            samples.push((vm_key("memory"), VM_MEMORY_BYTES.to_string()));
            samples.push((
                vm_key("memory_internal_free"),
                rng.random_range(0..VM_MEMORY_BYTES / 1024).to_string(),
            ));
            for vif in 0..VM_VIF_COUNT {
                for attr in ["rx", "tx"] {
                    samples.push((
                        vm_key(&format!("vif_{vif}_{attr}")),
                        format!("{:.4}", rng.random_range(0.0..1.0e6)),
                    ));
                }
            }
            for disk in VM_DISKS {
                for attr in ["read", "write", "read_latency"] {
                    samples.push((
                        vm_key(&format!("vbd_{disk}_{attr}")),
                        format!("{:.4}", rng.random_range(0.0..1.0e6)),
                    ));
                }
            }
        }

        render_xport(&samples, now)
    }
}

fn render_xport(samples: &[(String, String)], now: i64) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        "<xport><meta><start>{}</start><step>{RRD_STEP_SECS}</step><end>{now}</end><rows>1</rows><columns>{}</columns><legend>",
        now - RRD_STEP_SECS as i64,
        samples.len()
    );
    for (key, _) in samples {
        let _ = write!(out, "<entry>{key}</entry>");
    }
    let _ = write!(out, "</legend></meta><data><row><t>{now}</t>");
    for (_, value) in samples {
        let _ = write!(out, "<v>{value}</v>");
    }
    out.push_str("</row></data></xport>");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::rrd::TimeSeriesDocument;

    #[test]
    fn test_generated_shape() {
        let cluster = MockCluster::generate(2, 3);
        assert_eq!(cluster.hosts.len(), 2);
        // 3 guests + control domain per host, plus a template and a halted guest
        assert_eq!(cluster.vms.len(), 2 * 4 + 2);
        assert!(cluster.host_by_name("127.0.0.2").is_some());
        assert!(cluster.all_records("VIF").is_none());
    }

    #[test]
    fn test_document_parses() {
        let cluster = MockCluster::generate(1, 2);
        let host = &cluster.hosts[0];
        let text = cluster.rrd_document(host, 1_700_000_000);
        let doc = TimeSeriesDocument::parse(&host.hostname, &text).unwrap();
        assert!(!doc.is_empty());
        assert!(doc
            .samples()
            .any(|(key, _)| key == format!("AVERAGE:host:{}:cpu0", host.uuid)));
    }
}
