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

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::metrics::types::{HostRecord, StorageRepoRecord, VmRecord};

/// Username and password for the pool master.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// An authenticated session on the pool master.
#[derive(Debug, Clone)]
pub struct Session {
    /// Endpoint the session was established on. After a primary redirect
    /// this is the primary, not the address originally given.
    pub endpoint: String,
    /// Opaque session reference handed out by the control plane.
    pub reference: String,
    pub credentials: Credentials,
}

/// The control-plane operations the refresh pipeline depends on.
///
/// Implementations own the wire protocol; callers only ever see records
/// and raw time-series documents.
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Authenticate against `endpoint`.
    ///
    /// When the endpoint is a pool member rather than the primary, the
    /// implementation reconnects to the primary it names and retries once.
    async fn login(&self, endpoint: &str, credentials: &Credentials) -> Result<Session>;

    /// All hosts of the pool.
    async fn list_hosts(&self, session: &Session) -> Result<Vec<HostRecord>>;

    /// VMs currently resident on any host of the pool.
    async fn list_vms(&self, session: &Session) -> Result<Vec<VmRecord>>;

    /// Storage repositories plugged into any host of the pool.
    async fn list_storage_repos(&self, session: &Session) -> Result<Vec<StorageRepoRecord>>;

    /// Raw rrd_updates document of `host` covering the last `window`.
    async fn fetch_time_series(
        &self,
        session: &Session,
        host: &str,
        window: Duration,
    ) -> Result<String>;

    /// Release the session. Failures are not fatal to the caller.
    async fn logout(&self, _session: &Session) -> Result<()> {
        Ok(())
    }
}
