// Copyright 2025 canopy Project Authors
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

use std::{thread::JoinHandle, time::Duration};

use canopy_common::error::Result;

/// A named background thread that runs a task at a fixed interval.
///
/// The task returns `false` to stop the timer. Dropping the timer signals the thread to stop without waiting for it.
#[derive(Debug)]
pub struct EvictionTimer {
    interval: Duration,
    stop_tx: flume::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl EvictionTimer {
    /// Name of the timer thread.
    pub const THREAD_NAME: &'static str = "canopy-eviction-timer";

    /// Spawn the timer thread. The first run happens one `interval` after spawning.
    pub fn spawn<F>(interval: Duration, mut task: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (stop_tx, stop_rx) = flume::bounded::<()>(1);
        let handle = std::thread::Builder::new()
            .name(Self::THREAD_NAME.to_string())
            .spawn(move || {
                tracing::info!("[eviction timer]: started, interval: {:?}", interval);
                loop {
                    match stop_rx.recv_timeout(interval) {
                        Err(flume::RecvTimeoutError::Timeout) => {
                            if !task() {
                                break;
                            }
                        }
                        Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::info!("[eviction timer]: stopped");
            })?;
        Ok(Self {
            interval,
            stop_tx,
            handle: Some(handle),
        })
    }

    /// Interval between two runs.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns `true` if the thread is still running.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Stop the thread and wait for it. Must not be called from the task.
    pub fn stop(mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("[eviction timer]: task panicked");
            }
        }
    }
}

impl Drop for EvictionTimer {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
    }
}
