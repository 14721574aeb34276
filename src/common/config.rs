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

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration constants
pub struct AppConfig;

impl AppConfig {
    // Cache
    pub const DEFAULT_MAX_AGE_SECS: u64 = 60;
    pub const DEFAULT_CACHE_DIR: &'static str = "/tmp";
    pub const CACHE_FILE_PREFIX: &'static str = "xenapi";
    pub const TEMP_SUFFIX: &'static str = "cache";
    pub const LOCK_SUFFIX: &'static str = "lock";

    // Network Configuration
    pub const CONNECTION_TIMEOUT_SECS: u64 = 10;
    pub const REQUEST_TIMEOUT_SECS: u64 = 30;

    // XenAPI
    pub const API_VERSION: &'static str = "1.0";
    pub const CLIENT_ORIGINATOR: &'static str = "xenstat-bridge";
    pub const JSONRPC_PATH: &'static str = "jsonrpc";
    pub const RRD_UPDATES_PATH: &'static str = "rrd_updates";

    // Collection
    pub const CONTROL_DOMAIN_MARKER: &'static str = "Control domain on host";
    pub const EXCLUDED_SR_PREFIXES: [&'static str; 3] =
        ["DVD_drives", "Removable_storage", "XenServer_Tools"];
}

impl AppConfig {
    pub fn connection_timeout() -> Duration {
        Duration::from_secs(Self::CONNECTION_TIMEOUT_SECS)
    }

    pub fn request_timeout() -> Duration {
        Duration::from_secs(Self::REQUEST_TIMEOUT_SECS)
    }
}

/// Location of the cache triple and its lock for one queried hostname.
///
/// One value is built per invocation and threaded through the refresher
/// and the query engine; nothing about cache locations is global.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePaths {
    dir: PathBuf,
    hostname: String,
}

impl CachePaths {
    pub fn new(dir: impl Into<PathBuf>, hostname: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            hostname: hostname.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Per-host metrics, one `<host> <metric> <value>` line each.
    pub fn host_file(&self) -> PathBuf {
        self.file("hostperformance")
    }

    /// Per-VM metrics, keyed by VM display name.
    pub fn vm_file(&self) -> PathBuf {
        self.file("vmperformance")
    }

    /// Cluster-wide storage repository list.
    pub fn sr_file(&self) -> PathBuf {
        self.file("srlist")
    }

    /// Lock serializing refreshes of this cache triple.
    pub fn lock_file(&self) -> PathBuf {
        with_suffix(&self.host_file(), AppConfig::LOCK_SUFFIX)
    }

    /// All three published cache files, host file first.
    pub fn all(&self) -> [PathBuf; 3] {
        [self.host_file(), self.vm_file(), self.sr_file()]
    }

    /// Staging path a cache file is written to before being renamed into place.
    pub fn staging(path: &Path) -> PathBuf {
        with_suffix(path, AppConfig::TEMP_SUFFIX)
    }

    fn file(&self, kind: &str) -> PathBuf {
        // Hostnames never contain a path separator in practice, but a VM
        // display name might.
        let safe_host = self.hostname.replace(['/', '\\'], "_");
        self.dir.join(format!(
            "{}.{safe_host}.{kind}.tmp",
            AppConfig::CACHE_FILE_PREFIX
        ))
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}
