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

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::common::config::{AppConfig, CachePaths};
use crate::error::{Error, Result};
use crate::query::{compile_filter, Query, TargetKind};
use crate::traits::control_plane::Credentials;

/// One-line usage printed when the bridge is started without arguments.
pub const USAGE: &str = "xenstat-bridge -m <master> -u <username> -p <password> -c <command> -f <filter> -t <host|vm> -H <hostname|vmname> [-a <maxage>]";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pool master to log in to (hostname, or a full URL such as http://127.0.0.1:8080).
    #[arg(short = 'm', long = "master")]
    pub master: String,
    /// XenAPI username.
    #[arg(short = 'u', long = "username")]
    pub username: String,
    /// XenAPI password.
    #[arg(short = 'p', long = "password")]
    pub password: String,
    /// What to answer: a discovery list or a single value.
    #[arg(short = 'c', long = "command", value_enum)]
    pub command: Command,
    /// Regex for the list commands (matched from the start), exact metric name for `value`.
    #[arg(short = 'f', long = "filter", allow_hyphen_values = true)]
    pub filter: String,
    /// Target kind: host or vm.
    #[arg(short = 't', long = "target")]
    pub target: String,
    /// Host or VM display name. Also selects the cache files used.
    #[arg(short = 'H', long = "hostname")]
    pub hostname: String,
    /// Seconds a cached snapshot stays valid before it is fetched again.
    #[arg(short = 'a', long = "max-age", default_value_t = AppConfig::DEFAULT_MAX_AGE_SECS)]
    pub max_age: u64,
    /// Directory holding the cache and lock files.
    #[arg(long = "cache-dir", env = "XENSTAT_CACHE_DIR", default_value = AppConfig::DEFAULT_CACHE_DIR)]
    pub cache_dir: PathBuf,
    /// Log debug diagnostics to stderr.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Discovery list of metric names.
    #[value(name = "list")]
    List,
    /// Discovery list of storage repositories.
    #[value(name = "listsr")]
    ListSr,
    /// Discovery list of network interfaces.
    #[value(name = "listni")]
    ListNi,
    /// Discovery list of virtual block devices.
    #[value(name = "listvbd")]
    ListVbd,
    /// A single metric value.
    #[value(name = "value")]
    Value,
}

impl Cli {
    /// Reject flags given with an empty value, as a poller macro that
    /// expanded to nothing produces. Checked before anything else.
    pub fn check_required(&self) -> Result<()> {
        let flags = [
            ("-m", &self.master),
            ("-u", &self.username),
            ("-p", &self.password),
            ("-f", &self.filter),
            ("-t", &self.target),
            ("-H", &self.hostname),
        ];
        match flags.iter().find(|(_, value)| value.is_empty()) {
            Some((flag, _)) => Err(Error::MissingArgument((*flag).to_string())),
            None => Ok(()),
        }
    }

    /// Validated `-t`.
    pub fn target_kind(&self) -> Result<TargetKind> {
        self.target.parse()
    }

    /// The request to answer. List filters are compiled here so a bad
    /// pattern is rejected before the control plane is contacted.
    pub fn query(&self) -> Result<Query> {
        Ok(match self.command {
            Command::List => Query::Metrics(compile_filter(&self.filter)?),
            Command::ListNi => Query::Interfaces(compile_filter(&self.filter)?),
            Command::ListVbd => Query::VirtualDisks(compile_filter(&self.filter)?),
            Command::ListSr => Query::StorageRepos(compile_filter(&self.filter)?),
            Command::Value => Query::Value(self.filter.clone()),
        })
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }

    pub fn cache_paths(&self) -> CachePaths {
        CachePaths::new(&self.cache_dir, &self.hostname)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age)
    }
}
