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

use std::io;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use futures_util::future::try_join_all;
use tracing::{debug, info, warn};

use crate::cache::lock::CacheLock;
use crate::common::config::CachePaths;
use crate::error::{Error, Result};
use crate::metrics::aggregator::{render_samples, render_storage_repos, StatsAggregator};
use crate::metrics::types::Inventory;
use crate::parsing::rrd::TimeSeriesDocument;
use crate::traits::control_plane::{ControlPlane, Credentials, Session};

/// What [`CacheRefresher::ensure_fresh`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The published cache was young enough and left untouched.
    Fresh,
    /// A new cache generation was collected and published.
    Refreshed,
}

/// True when all three cache files exist and the host file was modified
/// less than `max_age` before `now`.
///
/// A modification time in the future counts as fresh.
pub fn is_fresh(paths: &CachePaths, max_age: Duration, now: SystemTime) -> Result<bool> {
    for path in paths.all() {
        match std::fs::metadata(&path) {
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(Error::cache(path, e)),
        }
    }

    let host_file = paths.host_file();
    let modified = std::fs::metadata(&host_file)
        .and_then(|m| m.modified())
        .map_err(|e| Error::cache(&host_file, e))?;

    Ok(match now.duration_since(modified) {
        Ok(age) => age < max_age,
        Err(_) => true,
    })
}

/// Keeps the cache triple of one hostname fresh.
///
/// Refreshes are serialized through the per-hostname lock file, and the
/// freshness check runs while the lock is held, so concurrent callers that
/// queued behind a refresh see the new generation instead of fetching again.
pub struct CacheRefresher<C> {
    control_plane: C,
}

impl<C: ControlPlane> CacheRefresher<C> {
    pub fn new(control_plane: C) -> Self {
        Self { control_plane }
    }

    pub fn control_plane(&self) -> &C {
        &self.control_plane
    }

    pub async fn ensure_fresh(
        &self,
        paths: &CachePaths,
        endpoint: &str,
        credentials: &Credentials,
        max_age: Duration,
    ) -> Result<RefreshOutcome> {
        let _lock = CacheLock::acquire(&paths.lock_file()).await?;

        if is_fresh(paths, max_age, SystemTime::now())? {
            debug!(host = paths.hostname(), "cache is fresh");
            return Ok(RefreshOutcome::Fresh);
        }

        info!(host = paths.hostname(), endpoint, "refreshing cache");
        self.refresh(paths, endpoint, credentials, max_age).await?;
        Ok(RefreshOutcome::Refreshed)
    }

    async fn refresh(
        &self,
        paths: &CachePaths,
        endpoint: &str,
        credentials: &Credentials,
        window: Duration,
    ) -> Result<()> {
        let session = self.control_plane.login(endpoint, credentials).await?;
        let collected = self.collect(&session, window).await;
        if let Err(e) = self.control_plane.logout(&session).await {
            warn!(endpoint = %session.endpoint, error = %e, "logout failed");
        }
        let (inventory, documents) = collected?;

        let stats = StatsAggregator::new(&inventory).aggregate_documents(&documents);
        debug!(
            host_samples = stats.host_samples.len(),
            vm_samples = stats.vm_samples.len(),
            storage_repos = inventory.storage_repos().len(),
            "aggregated cluster samples"
        );

        publish(
            paths,
            [
                render_samples(&stats.host_samples),
                render_samples(&stats.vm_samples),
                render_storage_repos(&inventory),
            ],
        )
        .await
    }

    async fn collect(
        &self,
        session: &Session,
        window: Duration,
    ) -> Result<(Inventory, Vec<TimeSeriesDocument>)> {
        let mut inventory = Inventory::new();
        for host in self.control_plane.list_hosts(session).await? {
            inventory.add_host(host);
        }
        if inventory.is_empty() {
            return Err(Error::MasterUnreachable(format!(
                "{} reported no hosts",
                session.endpoint
            )));
        }
        for vm in self.control_plane.list_vms(session).await? {
            inventory.add_vm(vm);
        }
        for sr in self.control_plane.list_storage_repos(session).await? {
            let name = sr.name.clone();
            if !inventory.add_storage_repo(sr) {
                debug!(sr = %name, "skipping infrastructure storage repository");
            }
        }

        // Every host is fetched, not only the queried one: each document
        // carries that host's samples plus its resident VMs.
        let documents = try_join_all(inventory.hosts().iter().map(|host| async move {
            let text = self
                .control_plane
                .fetch_time_series(session, &host.hostname, window)
                .await?;
            TimeSeriesDocument::parse(&host.hostname, &text)
        }))
        .await?;

        Ok((inventory, documents))
    }
}

/// Write the host, VM and storage repository files to their staging paths,
/// then rename each into place. Nothing is renamed unless all three writes
/// succeeded.
///
/// If a later rename fails, the freshly renamed host file is removed so the
/// half-published generation is stale and the next call collects again.
async fn publish(paths: &CachePaths, contents: [String; 3]) -> Result<()> {
    let targets = paths.all();
    let staged: Vec<PathBuf> = targets.iter().map(|p| CachePaths::staging(p)).collect();

    for (staging, body) in staged.iter().zip(contents.iter()) {
        if let Err(e) = tokio::fs::write(staging, body).await {
            discard(&staged).await;
            return Err(Error::cache(staging, e));
        }
    }

    for (i, (staging, target)) in staged.iter().zip(targets.iter()).enumerate() {
        if let Err(e) = tokio::fs::rename(staging, target).await {
            discard(&staged[i..]).await;
            if i > 0 {
                if let Err(remove_err) = tokio::fs::remove_file(&targets[0]).await {
                    warn!(
                        path = %targets[0].display(),
                        error = %remove_err,
                        "could not invalidate host cache file"
                    );
                }
            }
            return Err(Error::cache(target, e));
        }
    }

    debug!(
        dir = %paths.dir().display(),
        host = paths.hostname(),
        "published cache generation"
    );
    Ok(())
}

async fn discard(staged: &[PathBuf]) {
    for path in staged {
        let _ = tokio::fs::remove_file(path).await;
    }
}
