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

use crate::mock::constants::{
    DEFAULT_HOST_COUNT, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USERNAME, DEFAULT_VMS_PER_HOST,
};
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about = "Synthetic XenServer pool for exercising xenstat-bridge", long_about = None)]
pub struct Args {
    #[arg(long, default_value_t = DEFAULT_PORT, help = "Port to listen on")]
    pub port: u16,

    #[arg(
        long,
        default_value = "0.0.0.0",
        help = "Address to bind. Simulated hosts are named 127.0.0.1, 127.0.0.2, ... so the default accepts all of them"
    )]
    pub bind: String,

    #[arg(long, default_value_t = DEFAULT_HOST_COUNT, help = "Number of pool members")]
    pub hosts: usize,

    #[arg(long, default_value_t = DEFAULT_VMS_PER_HOST, help = "Running guests per host")]
    pub vms_per_host: usize,

    #[arg(long, default_value = DEFAULT_USERNAME, help = "Accepted username")]
    pub username: String,

    #[arg(long, default_value = DEFAULT_PASSWORD, help = "Accepted password")]
    pub password: String,

    #[arg(
        long,
        help = "Answer logins addressed to any host but the first with HOST_IS_SLAVE"
    )]
    pub simulate_members: bool,
}
