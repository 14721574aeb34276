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

//! Integration tests for cache refresh: staleness, single-flight and
//! atomic publication, driven through an in-memory control plane.

use std::collections::HashMap;
use std::fs::File;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use tempfile::TempDir;
use xenstat_bridge::error::EXIT_MASTER_UNREACHABLE;
use xenstat_bridge::prelude::*;

const HOST_UUID: &str = "aaaa1111-0000-0000-0000-000000000001";
const VM_UUID: &str = "bbbb2222-0000-0000-0000-000000000002";
const DOM0_UUID: &str = "cccc3333-0000-0000-0000-000000000003";
const SR_UUID: &str = "9a8b7c6d-1111-2222-3333-444455556666";

fn document() -> String {
    let entries = [
        (format!("AVERAGE:host:{HOST_UUID}:cpu0"), "10.0"),
        (format!("AVERAGE:host:{HOST_UUID}:cpu1"), "20.0"),
        (format!("AVERAGE:host:{HOST_UUID}:cpu3"), "5.0"),
        (format!("AVERAGE:host:{HOST_UUID}:memory_total_kib"), "1024"),
        (format!("MAX:host:{HOST_UUID}:cpu0"), "99.0"),
        (format!("AVERAGE:vm:{VM_UUID}:memory"), "4096"),
        (format!("AVERAGE:vm:{VM_UUID}:vif_0_rx"), "1.5"),
        (format!("AVERAGE:vm:{DOM0_UUID}:memory"), "8192"),
        ("AVERAGE:vm:dddd-unknown:memory".to_string(), "1"),
    ];
    let legend: String = entries
        .iter()
        .map(|(k, _)| format!("<entry>{k}</entry>"))
        .collect();
    let row: String = entries.iter().map(|(_, v)| format!("<v>{v}</v>")).collect();
    format!(
        "<xport><meta><legend>{legend}</legend></meta><data><row><t>0</t>{row}</row></data></xport>"
    )
}

/// In-memory pool with one host, one guest, its control domain and two SRs.
struct FakePool {
    logins: AtomicUsize,
    fetches: AtomicUsize,
    hosts: Vec<HostRecord>,
    documents: HashMap<String, String>,
    fetch_delay: Duration,
    fail_fetch: bool,
}

impl FakePool {
    fn new() -> Self {
        let mut documents = HashMap::new();
        documents.insert("xs01".to_string(), document());
        Self {
            logins: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            hosts: vec![HostRecord {
                uuid: HOST_UUID.to_string(),
                hostname: "xs01".to_string(),
            }],
            documents,
            fetch_delay: Duration::ZERO,
            fail_fetch: false,
        }
    }

    fn logins(&self) -> usize {
        self.logins.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlPlane for FakePool {
    async fn login(&self, endpoint: &str, credentials: &Credentials) -> Result<Session> {
        self.logins.fetch_add(1, Ordering::SeqCst);
        Ok(Session {
            endpoint: endpoint.to_string(),
            reference: "OpaqueRef:test".to_string(),
            credentials: credentials.clone(),
        })
    }

    async fn list_hosts(&self, _session: &Session) -> Result<Vec<HostRecord>> {
        Ok(self.hosts.clone())
    }

    async fn list_vms(&self, _session: &Session) -> Result<Vec<VmRecord>> {
        Ok(vec![
            VmRecord {
                uuid: VM_UUID.to_string(),
                name: "web 01".to_string(),
            },
            VmRecord {
                uuid: DOM0_UUID.to_string(),
                name: "Control domain on host: xs01".to_string(),
            },
        ])
    }

    async fn list_storage_repos(&self, _session: &Session) -> Result<Vec<StorageRepoRecord>> {
        Ok(vec![
            StorageRepoRecord::new(SR_UUID, "Local storage"),
            StorageRepoRecord::new("0f0f0f0f-aaaa", "DVD drives"),
        ])
    }

    async fn fetch_time_series(
        &self,
        _session: &Session,
        host: &str,
        _window: Duration,
    ) -> Result<String> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        if self.fail_fetch {
            return Err(Error::MasterUnreachable(format!("{host} did not answer")));
        }
        self.documents
            .get(host)
            .cloned()
            .ok_or_else(|| Error::MasterUnreachable(format!("unknown host {host}")))
    }
}

fn credentials() -> Credentials {
    Credentials::new("root", "secret")
}

fn age_host_file(paths: &CachePaths, by: Duration) {
    File::options()
        .write(true)
        .open(paths.host_file())
        .unwrap()
        .set_modified(SystemTime::now() - by)
        .unwrap();
}

#[tokio::test]
async fn test_refresh_writes_cache_triple() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let refresher = CacheRefresher::new(FakePool::new());

    let outcome = refresher
        .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
        .await
        .unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let host_file = std::fs::read_to_string(paths.host_file()).unwrap();
    assert_eq!(
        host_file,
        "xs01 cpu0 10.0\nxs01 cpu1 20.0\nxs01 cpu3 5.0\nxs01 memory_total_kib 1024\nxs01 cpu 35.0\nxs01 cpu_count 3\n"
    );

    let vm_file = std::fs::read_to_string(paths.vm_file()).unwrap();
    assert!(vm_file.contains("web 01 memory 4096\n"));
    assert!(vm_file.contains("web 01 vif_0_rx 1.5\n"));
    assert!(!vm_file.contains("Control domain"));
    assert!(!vm_file.contains("8192"));

    let sr_file = std::fs::read_to_string(paths.sr_file()).unwrap();
    assert_eq!(sr_file, format!("9a8b7c6d {SR_UUID} Local_storage\n"));

    assert!(paths.lock_file().exists());
}

#[tokio::test]
async fn test_fresh_cache_is_not_refetched() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let refresher = CacheRefresher::new(FakePool::new());
    let max_age = Duration::from_secs(60);

    refresher
        .ensure_fresh(&paths, "master", &credentials(), max_age)
        .await
        .unwrap();
    age_host_file(&paths, Duration::from_secs(59));
    let outcome = refresher
        .ensure_fresh(&paths, "master", &credentials(), max_age)
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Fresh);
    assert_eq!(refresher.control_plane().logins(), 1);
}

#[tokio::test]
async fn test_stale_cache_is_refetched() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let refresher = CacheRefresher::new(FakePool::new());
    let max_age = Duration::from_secs(60);

    refresher
        .ensure_fresh(&paths, "master", &credentials(), max_age)
        .await
        .unwrap();
    age_host_file(&paths, Duration::from_secs(61));
    let outcome = refresher
        .ensure_fresh(&paths, "master", &credentials(), max_age)
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert_eq!(refresher.control_plane().logins(), 2);
}

#[tokio::test]
async fn test_missing_sibling_file_forces_refresh() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let refresher = CacheRefresher::new(FakePool::new());
    let max_age = Duration::from_secs(60);

    refresher
        .ensure_fresh(&paths, "master", &credentials(), max_age)
        .await
        .unwrap();
    std::fs::remove_file(paths.sr_file()).unwrap();
    let outcome = refresher
        .ensure_fresh(&paths, "master", &credentials(), max_age)
        .await
        .unwrap();

    assert_eq!(outcome, RefreshOutcome::Refreshed);
    assert!(paths.sr_file().exists());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_fetch_once() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let mut pool = FakePool::new();
    pool.fetch_delay = Duration::from_millis(200);
    let refresher = Arc::new(CacheRefresher::new(pool));

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let refresher = Arc::clone(&refresher);
        let paths = paths.clone();
        tasks.push(tokio::spawn(async move {
            refresher
                .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
                .await
        }));
    }

    let mut refreshed = 0;
    for task in tasks {
        if task.await.unwrap().unwrap() == RefreshOutcome::Refreshed {
            refreshed += 1;
        }
    }

    assert_eq!(refreshed, 1);
    assert_eq!(refresher.control_plane().logins(), 1);
    assert_eq!(refresher.control_plane().fetches.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_see_whole_generations_during_refresh() {
    const OLD: &str = "xs01 previous 1\n";

    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    for path in paths.all() {
        std::fs::write(&path, OLD).unwrap();
    }
    age_host_file(&paths, Duration::from_secs(3600));

    let mut pool = FakePool::new();
    pool.fetch_delay = Duration::from_millis(300);
    let refresher = Arc::new(CacheRefresher::new(pool));

    let done = Arc::new(AtomicBool::new(false));
    let reader = {
        let paths = paths.clone();
        let done = Arc::clone(&done);
        tokio::spawn(async move {
            let mut seen: Vec<Vec<String>> = Vec::new();
            while !done.load(Ordering::SeqCst) {
                let snapshot = paths
                    .all()
                    .iter()
                    .map(|path| std::fs::read_to_string(path).unwrap())
                    .collect();
                seen.push(snapshot);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            seen
        })
    };

    let outcome = refresher
        .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
        .await
        .unwrap();
    done.store(true, Ordering::SeqCst);
    let seen = reader.await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Refreshed);

    let published: Vec<String> = paths
        .all()
        .iter()
        .map(|path| std::fs::read_to_string(path).unwrap())
        .collect();
    assert!(published.iter().all(|body| body != OLD));

    assert!(seen.iter().any(|snapshot| snapshot.iter().all(|body| body == OLD)));
    for snapshot in &seen {
        for (body, new) in snapshot.iter().zip(&published) {
            assert!(body == OLD || body == new, "torn cache file: {body:?}");
        }
    }
}

#[tokio::test]
async fn test_hostnames_refresh_independently() {
    let dir = TempDir::new().unwrap();
    let refresher = CacheRefresher::new(FakePool::new());
    let max_age = Duration::from_secs(60);

    for hostname in ["xs01", "web 01"] {
        let paths = CachePaths::new(dir.path(), hostname);
        let outcome = refresher
            .ensure_fresh(&paths, "master", &credentials(), max_age)
            .await
            .unwrap();
        assert_eq!(outcome, RefreshOutcome::Refreshed);
    }
    assert_eq!(refresher.control_plane().logins(), 2);
}

#[tokio::test]
async fn test_empty_pool_is_master_unreachable() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let mut pool = FakePool::new();
    pool.hosts.clear();
    let refresher = CacheRefresher::new(pool);

    let err = refresher
        .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::MasterUnreachable(_)));
    assert_eq!(err.exit_code(), EXIT_MASTER_UNREACHABLE);
    for path in paths.all() {
        assert!(!path.exists());
    }
}

#[tokio::test]
async fn test_failed_refresh_keeps_previous_generation() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    for path in paths.all() {
        std::fs::write(&path, "previous 1 2\n").unwrap();
    }
    age_host_file(&paths, Duration::from_secs(3600));

    let mut pool = FakePool::new();
    pool.fail_fetch = true;
    let refresher = CacheRefresher::new(pool);
    let err = refresher
        .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
        .await
        .unwrap_err();
    assert_eq!(err.exit_code(), EXIT_MASTER_UNREACHABLE);

    for path in paths.all() {
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "previous 1 2\n");
        assert!(!CachePaths::staging(&path).exists());
    }
}

#[tokio::test]
async fn test_mismatched_document_publishes_nothing() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let mut pool = FakePool::new();
    pool.documents.insert(
        "xs01".to_string(),
        document().replacen("<v>20.0</v>", "", 1),
    );
    let refresher = CacheRefresher::new(pool);

    let err = refresher
        .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TimeSeries { .. }));
    assert!(!paths.host_file().exists());
}

#[tokio::test]
async fn test_queries_after_refresh() {
    let dir = TempDir::new().unwrap();
    let paths = CachePaths::new(dir.path(), "xs01");
    let refresher = CacheRefresher::new(FakePool::new());
    refresher
        .ensure_fresh(&paths, "master", &credentials(), Duration::from_secs(60))
        .await
        .unwrap();

    let engine = QueryEngine::new(paths);
    let cpus = engine
        .list_metrics(TargetKind::Host, &compile_filter(r"cpu\d+").unwrap())
        .unwrap();
    let names: Vec<_> = cpus.data.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["cpu0", "cpu1", "cpu3"]);

    assert_eq!(
        engine.read_value(TargetKind::Host, "cpu").unwrap().as_deref(),
        Some("35.0")
    );
    assert_eq!(
        engine.read_value(TargetKind::Host, "cpu_count").unwrap().as_deref(),
        Some("3")
    );

    let repos = engine
        .list_storage_repos(&compile_filter(".*").unwrap())
        .unwrap();
    assert_eq!(repos.len(), 1);
    assert_eq!(repos.data[0].name, "Local_storage");
}
