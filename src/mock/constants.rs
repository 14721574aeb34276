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

// General configuration constants
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HOST_COUNT: usize = 3;
pub const DEFAULT_VMS_PER_HOST: usize = 4;
pub const DEFAULT_USERNAME: &str = "root";
pub const DEFAULT_PASSWORD: &str = "secret";

// Hardware shape of every simulated host
pub const HOST_CPU_COUNT: usize = 8;
pub const HOST_PIFS: [&str; 2] = ["eth0", "eth1"];
pub const HOST_MEMORY_KIB: u64 = 256 * 1024 * 1024;

// Guest shape
pub const VM_CPU_COUNT: usize = 2;
pub const VM_DISKS: [&str; 2] = ["xvda", "xvdb"];
pub const VM_VIF_COUNT: usize = 1;
pub const VM_MEMORY_BYTES: u64 = 4 * 1024 * 1024 * 1024;

// Sample step reported in generated rrd_updates documents
pub const RRD_STEP_SECS: u64 = 5;

pub const NULL_REF: &str = "OpaqueRef:NULL";
