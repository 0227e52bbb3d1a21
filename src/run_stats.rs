//! Run resource statistics
//!
//! Tracks process memory and throughput for one evaluation run. Peak memory
//! is sampled from a background thread so short allocation spikes between
//! explicit snapshots still show up in the report.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{Pid, ProcessesToUpdate, System};

/// Sampling interval for peak memory tracking
const SAMPLE_INTERVAL_MS: u64 = 50;

/// Resource statistics recorded in the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub elapsed_secs: f64,
    /// Records evaluated per second of wall time.
    pub throughput_per_sec: f64,
    pub baseline_memory_mb: f64,
    pub peak_memory_mb: f64,
}

/// Monitor for one evaluation run's resource usage.
pub struct RunMonitor {
    system: System,
    pid: Pid,
    baseline_memory_mb: f64,
    peak_memory_mb: Arc<AtomicU64>,
    sampling_active: Arc<AtomicBool>,
}

impl RunMonitor {
    pub fn new() -> Self {
        let mut system = System::new_all();
        system.refresh_all();

        Self {
            system,
            pid: Pid::from_u32(std::process::id()),
            baseline_memory_mb: 0.0,
            peak_memory_mb: Arc::new(AtomicU64::new(0)),
            sampling_active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Current process RSS in MB.
    fn get_process_memory_mb(&mut self) -> f64 {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.pid]), true);
        if let Some(process) = self.system.process(self.pid) {
            process.memory() as f64 / (1024.0 * 1024.0)
        } else {
            0.0
        }
    }

    /// Snapshot baseline memory before the run starts.
    pub fn snapshot_baseline(&mut self) {
        self.baseline_memory_mb = self.get_process_memory_mb();
        self.peak_memory_mb
            .store(self.baseline_memory_mb.to_bits(), Ordering::SeqCst);
        tracing::debug!("Baseline memory: {:.1} MB", self.baseline_memory_mb);
    }

    fn update_peak(peak_memory: &AtomicU64, current_mb: f64) {
        let current_bits = current_mb.to_bits();
        loop {
            let peak_bits = peak_memory.load(Ordering::SeqCst);
            if current_mb <= f64::from_bits(peak_bits) {
                break;
            }
            if peak_memory
                .compare_exchange(peak_bits, current_bits, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }
    }

    /// Start background memory sampling.
    ///
    /// Returns a handle that must be kept alive until sampling should stop.
    pub fn start_sampling(&self) -> SamplingHandle {
        self.sampling_active.store(true, Ordering::SeqCst);

        let peak_memory = Arc::clone(&self.peak_memory_mb);
        let sampling_active = Arc::clone(&self.sampling_active);
        let pid = self.pid;

        // Plain thread rather than a task so sampling never competes with
        // the adapter calls for the runtime.
        let handle = std::thread::spawn(move || {
            let mut system = System::new();

            while sampling_active.load(Ordering::SeqCst) {
                system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
                if let Some(process) = system.process(pid) {
                    let current_mb = process.memory() as f64 / (1024.0 * 1024.0);
                    Self::update_peak(&peak_memory, current_mb);
                }
                std::thread::sleep(Duration::from_millis(SAMPLE_INTERVAL_MS));
            }
        });

        SamplingHandle {
            sampling_active: Arc::clone(&self.sampling_active),
            _thread: Some(handle),
        }
    }

    /// Finalize statistics after the run completes.
    pub fn finalize(mut self, elapsed: Duration, record_count: usize) -> RunStats {
        self.sampling_active.store(false, Ordering::SeqCst);

        let final_memory = self.get_process_memory_mb();
        Self::update_peak(&self.peak_memory_mb, final_memory);

        let elapsed_secs = elapsed.as_secs_f64();
        let throughput = if elapsed_secs > 0.0 {
            record_count as f64 / elapsed_secs
        } else {
            0.0
        };

        RunStats {
            elapsed_secs,
            throughput_per_sec: throughput,
            baseline_memory_mb: self.baseline_memory_mb,
            peak_memory_mb: f64::from_bits(self.peak_memory_mb.load(Ordering::SeqCst)),
        }
    }
}

impl Default for RunMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for background memory sampling
///
/// Sampling continues while this handle is held. Drop to stop sampling.
pub struct SamplingHandle {
    sampling_active: Arc<AtomicBool>,
    _thread: Option<std::thread::JoinHandle<()>>,
}

impl Drop for SamplingHandle {
    fn drop(&mut self) {
        self.sampling_active.store(false, Ordering::SeqCst);
    }
}
