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


//! # xenstat-bridge
//!
//! External-check bridge between XenServer/XCP-ng performance counters and
//! Zabbix low-level discovery.
//!
//! Each poller invocation makes sure the local cache for its hostname is
//! fresh (refreshing it under a per-hostname lock when it is not) and then
//! answers from the cache: a discovery list or a single value.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use xenstat_bridge::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let paths = CachePaths::new("/tmp", "xs01");
//! let refresher = CacheRefresher::new(XenApiClient::new()?);
//! refresher
//!     .ensure_fresh(&paths, "xs-master", &Credentials::new("root", "secret"), Duration::from_secs(60))
//!     .await?;
//!
//! let engine = QueryEngine::new(paths);
//! let discovery = engine.list_metrics(TargetKind::Host, &compile_filter(r"cpu\d+")?)?;
//! println!("{discovery}");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod cli;
pub mod error;
pub mod metrics;
pub mod network;
pub mod parsing;
pub mod prelude;
pub mod query;
pub mod traits;

#[cfg(feature = "mock")]
pub mod mock;

// Re-export just the config module from common for library users
pub mod common {
    pub mod config;
}

pub use error::{Error, Result};
