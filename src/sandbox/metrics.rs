// src/sandbox/metrics.rs

//! Peak memory sampling for sandboxed children.
//!
//! Sampling uses `sysinfo` on a background thread and is best-effort:
//! - short spikes between samples are missed
//! - only the direct child is measured, not its descendants
//! - if the PID cannot be inspected the result is `None`

use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    Arc,
};
use std::thread;
use std::time::Duration;

use sysinfo::{Pid, System};

/// Tracks peak RSS of one child process while it runs.
pub struct MemoryTracker {
    stop: Arc<AtomicBool>,
    max_kb: Arc<AtomicU64>,
    handle: Option<thread::JoinHandle<()>>,
}

impl MemoryTracker {
    /// Start sampling `pid_u32` every `sample_every`.
    pub fn start(pid_u32: u32, sample_every: Duration) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let max_kb = Arc::new(AtomicU64::new(0));

        let stop_clone = Arc::clone(&stop);
        let max_clone = Arc::clone(&max_kb);

        let handle = thread::spawn(move || {
            let pid = Pid::from_u32(pid_u32);
            let mut system = System::new();

            while !stop_clone.load(Ordering::Relaxed) {
                system.refresh_process(pid);

                match system.process(pid) {
                    // sysinfo 0.30 reports bytes
                    Some(process) => {
                        max_clone.fetch_max(process.memory() / 1024, Ordering::Relaxed);
                    }
                    None => break,
                }

                thread::sleep(sample_every);
            }
        });

        Self {
            stop,
            max_kb,
            handle: Some(handle),
        }
    }

    /// Stop sampling and return the peak RSS in KB, `None` if never sampled.
    ///
    /// The sampler may be mid-sleep, so the join happens on the blocking pool.
    pub async fn stop_and_take(mut self) -> Option<u64> {
        self.stop.store(true, Ordering::Relaxed);

        if let Some(handle) = self.handle.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || handle.join()).await {
                tracing::debug!(error = %e, "memory sampler join failed");
            }
        }

        match self.max_kb.load(Ordering::Relaxed) {
            0 => None,
            kb => Some(kb),
        }
    }
}

impl Drop for MemoryTracker {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Instant;

    #[tokio::test]
    async fn own_process_is_measurable() {
        let tracker = MemoryTracker::start(std::process::id(), Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(tracker.stop_and_take().await.is_some());
    }

    #[tokio::test]
    async fn vanished_pid_yields_none() {
        // PIDs this large are not handed out on common configurations
        let tracker = MemoryTracker::start(u32::MAX - 7, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(tracker.stop_and_take().await, None);
    }

    // current-thread runtime: a blocking join would stall the timer below
    #[tokio::test]
    async fn stopping_does_not_block_the_runtime() {
        let tracker = MemoryTracker::start(std::process::id(), Duration::from_millis(600));
        tokio::time::sleep(Duration::from_millis(30)).await;

        let start = Instant::now();
        let (peak, ticked_after) = tokio::join!(tracker.stop_and_take(), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            start.elapsed()
        });

        assert!(peak.is_some());
        assert!(
            ticked_after < Duration::from_millis(300),
            "timer stalled for {ticked_after:?}"
        );
    }
}
