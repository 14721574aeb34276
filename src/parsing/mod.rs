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

//! Structured parsers for the three text formats the bridge deals with:
//! XenAPI RRD metric keys, cache file lines and rrd_updates documents.
//!
//! Every parser returns a typed result so that one malformed input never
//! aborts the surrounding loop.

pub mod cache_line;
pub mod common;
pub mod metric_key;
pub mod rrd;

pub use cache_line::{CacheLine, CacheLineError};
pub use metric_key::{AggregationKind, DomainKind, MetricKey, MetricKeyError};
pub use rrd::TimeSeriesDocument;
