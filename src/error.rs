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

//! Unified error types for the xenstat-bridge library.
//!
//! Every failure the bridge can run into maps to one variant of [`enum@Error`],
//! and every variant maps to the process exit status the poller expects
//! through [`Error::exit_code`].
//!
//! # Example
//!
//! ```rust
//! use xenstat_bridge::Error;
//!
//! let err = Error::InvalidTarget("cluster".to_string());
//! assert_eq!(err.exit_code(), 2);
//! ```

use std::path::PathBuf;

use thiserror::Error;

/// Exit status for a successful run (also used for `--help`).
pub const EXIT_OK: i32 = 0;
/// Exit status when the bridge was started without any argument.
pub const EXIT_NO_ARGUMENTS: i32 = 1;
/// Exit status for a `-t` value other than `host` or `vm`.
pub const EXIT_INVALID_TARGET: i32 = 2;
/// Exit status when a required flag is missing.
pub const EXIT_MISSING_ARGUMENT: i32 = 3;
/// Exit status when a cache file cannot be read or written.
pub const EXIT_CACHE_ACCESS: i32 = 4;
/// Exit status when the control plane cannot be reached or refuses us.
pub const EXIT_MASTER_UNREACHABLE: i32 = 254;
/// Exit status for any other argument parse failure.
pub const EXIT_PARSE_ERROR: i32 = 255;

/// The main error type for xenstat-bridge operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A required command-line argument was not supplied.
    #[error("Parameter missing: {0}")]
    MissingArgument(String),

    /// The `-t` target kind is neither `host` nor `vm`.
    #[error("Parameter t must be host or vm, got '{0}'")]
    InvalidTarget(String),

    /// The filter supplied for a list command is not a valid regular expression.
    #[error("Invalid filter pattern '{pattern}': {source}")]
    InvalidFilter {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// The pool master answered but knows no hosts, or could not be reached at all.
    #[error("xenmaster not found or not available: {0}")]
    MasterUnreachable(String),

    /// The control plane rejected the supplied credentials.
    #[error("Authentication against {endpoint} failed: {details}")]
    Authentication { endpoint: String, details: String },

    /// The control plane returned a XenAPI failure.
    ///
    /// `code` is the XenAPI error code (e.g. `HOST_IS_SLAVE`), `details` the
    /// remaining parameters of the failure.
    #[error("XenAPI call {method} failed: {code} {details:?}")]
    Api {
        method: String,
        code: String,
        details: Vec<String>,
    },

    /// Transport-level failure talking to the control plane.
    #[error("HTTP request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A rolling time-series document could not be interpreted.
    #[error("Invalid time-series document from {host}: {reason}")]
    TimeSeries { host: String, reason: String },

    /// A cache file could not be opened, written or renamed.
    ///
    /// The most common cause is a cache created by a different user (e.g. a
    /// manual run as root before the poller user takes over).
    #[error("Cannot access cache file {}: {source} (check ownership and permissions)", path.display())]
    CacheAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error that happened on a specific cache path.
    pub fn cache(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CacheAccess {
            path: path.into(),
            source,
        }
    }

    /// The process exit status this error should terminate the invocation with.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingArgument(_) => EXIT_MISSING_ARGUMENT,
            Self::InvalidTarget(_) => EXIT_INVALID_TARGET,
            Self::InvalidFilter { .. } => EXIT_PARSE_ERROR,
            Self::MasterUnreachable(_)
            | Self::Authentication { .. }
            | Self::Api { .. }
            | Self::Http { .. }
            | Self::TimeSeries { .. } => EXIT_MASTER_UNREACHABLE,
            Self::CacheAccess { .. } => EXIT_CACHE_ACCESS,
        }
    }
}

/// A specialized Result type for xenstat-bridge operations.
pub type Result<T> = std::result::Result<T, Error>;
