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


//! The xenstat-bridge prelude.
//!
//! Re-exports the types needed to refresh a cache and query it:
//!
//! ```rust
//! use xenstat_bridge::prelude::*;
//! ```

// Errors
pub use crate::error::{Error, Result};

// Cache location and refresh
pub use crate::cache::{CacheLock, CacheRefresher, RefreshOutcome};
pub use crate::common::config::{AppConfig, CachePaths};

// Control plane
pub use crate::network::XenApiClient;
pub use crate::traits::control_plane::{ControlPlane, Credentials, Session};

// Collected data
pub use crate::metrics::types::{HostRecord, MetricSample, StorageRepoRecord, VmRecord};

// Queries
pub use crate::query::{compile_filter, Discovery, Query, QueryEngine, TargetKind};
