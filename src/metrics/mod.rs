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

//! Data model of one refresh cycle and the stats aggregator that turns raw
//! time-series samples into cache file contents.

pub mod aggregator;
pub mod types;

pub use aggregator::{
    merge_documents, render_samples, render_storage_repos, CollectedStats, CpuAggregate,
    StatsAggregator, CPU_COUNT_METRIC, CPU_SUM_METRIC,
};
pub use types::{HostRecord, Inventory, MetricSample, StorageRepoRecord, VmRecord};
