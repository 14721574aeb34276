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

//! Exclusive advisory lock serializing cache refreshes.
//!
//! The lock is an `flock(2)` on a dedicated file next to the cache. It is
//! tied to the open file description, so it is released when the guard is
//! dropped and also when the holding process dies. The lock file itself is
//! never removed: unlinking it while another process waits on it would let
//! a third process lock a fresh inode and refresh concurrently.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Held lock on a cache lock file. Unlocks on drop.
#[derive(Debug)]
pub struct CacheLock {
    file: File,
    path: PathBuf,
}

impl CacheLock {
    /// Block until the exclusive lock on `path` is held.
    ///
    /// The file is created when missing. Runs on the blocking pool so the
    /// runtime keeps serving other tasks while waiting.
    pub async fn acquire(path: &Path) -> Result<Self> {
        let owned = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::acquire_blocking(owned))
            .await
            .map_err(|e| Error::cache(path, io::Error::other(e)))?
    }

    /// Blocking variant of [`CacheLock::acquire`].
    pub fn acquire_blocking(path: PathBuf) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::cache(&path, e))?;

        debug!(path = %path.display(), "waiting for cache lock");
        flock(&file, libc::LOCK_EX).map_err(|e| Error::cache(&path, e))?;
        debug!(path = %path.display(), "cache lock acquired");

        Ok(Self { file, path })
    }

    /// Take the lock only if nobody holds it.
    pub fn try_acquire(path: PathBuf) -> Result<Option<Self>> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| Error::cache(&path, e))?;

        match flock(&file, libc::LOCK_EX | libc::LOCK_NB) {
            Ok(()) => Ok(Some(Self { file, path })),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(Error::cache(&path, e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CacheLock {
    fn drop(&mut self) {
        if let Err(e) = flock(&self.file, libc::LOCK_UN) {
            warn!(path = %self.path.display(), error = %e, "failed to release cache lock");
        }
    }
}

fn flock(file: &File, operation: libc::c_int) -> io::Result<()> {
    loop {
        // SAFETY: the descriptor is owned by `file` and stays open for the call.
        let rc = unsafe { libc::flock(file.as_raw_fd(), operation) };
        if rc == 0 {
            return Ok(());
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(err);
        }
    }
}
