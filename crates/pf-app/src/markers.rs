//! File-marker pause/stop signalling for runs executing in another process.
//!
//! `PAUSE` and `STOP` files in the run directory request a pause or a stop.
//! The stop marker's content selects the mode (`retain` or `discard`);
//! an empty marker means retain.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use pf_results::RunStore;
use pf_sim::{ControlSignals, Signal, SignalFlags, StopMode};
use tracing::warn;

/// Default minimum wall time between marker checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct MarkerSignals {
    pause_path: PathBuf,
    stop_path: PathBuf,
    interval: Duration,
    last_check: Option<Instant>,
    flags: Option<SignalFlags>,
}

impl MarkerSignals {
    pub fn for_run(store: &RunStore, run_id: &str) -> Self {
        Self {
            pause_path: store.pause_marker(run_id),
            stop_path: store.stop_marker(run_id),
            interval: DEFAULT_POLL_INTERVAL,
            last_check: None,
            flags: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Also honour in-process requests made through `flags`.
    pub fn with_flags(mut self, flags: Option<SignalFlags>) -> Self {
        self.flags = flags;
        self
    }

    fn check_files(&self) -> Signal {
        if self.stop_path.exists() {
            let content = fs::read_to_string(&self.stop_path).unwrap_or_default();
            let mode = if content.trim().is_empty() {
                StopMode::Retain
            } else {
                StopMode::parse(&content).unwrap_or_else(|| {
                    warn!(marker = %self.stop_path.display(), content = content.trim(), "unrecognised stop mode, retaining checkpoint");
                    StopMode::Retain
                })
            };
            return Signal::Stop(mode);
        }
        if self.pause_path.exists() {
            return Signal::Pause;
        }
        Signal::None
    }
}

impl ControlSignals for MarkerSignals {
    fn poll(&mut self) -> Signal {
        if let Some(flags) = self.flags.as_mut() {
            let signal = flags.poll();
            if signal != Signal::None {
                return signal;
            }
        }
        let now = Instant::now();
        if let Some(last) = self.last_check
            && now.duration_since(last) < self.interval
        {
            return Signal::None;
        }
        self.last_check = Some(now);
        self.check_files()
    }
}

/// Write a pause request for a running run.
pub fn write_pause_marker(store: &RunStore, run_id: &str) -> std::io::Result<()> {
    fs::create_dir_all(store.run_dir(run_id))?;
    fs::write(store.pause_marker(run_id), b"")
}

/// Write a stop request for a running run.
pub fn write_stop_marker(store: &RunStore, run_id: &str, mode: StopMode) -> std::io::Result<()> {
    fs::create_dir_all(store.run_dir(run_id))?;
    fs::write(store.stop_marker(run_id), mode.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("{prefix}_{nanos}"))
    }

    #[test]
    fn markers_map_to_signals() {
        let dir = unique_temp_dir("pf_markers");
        let store = RunStore::new(dir.clone()).unwrap();
        let mut signals = MarkerSignals::for_run(&store, "r1").with_interval(Duration::ZERO);
        assert_eq!(signals.poll(), Signal::None);

        write_pause_marker(&store, "r1").unwrap();
        assert_eq!(signals.poll(), Signal::Pause);

        write_stop_marker(&store, "r1", StopMode::Discard).unwrap();
        assert_eq!(signals.poll(), Signal::Stop(StopMode::Discard));

        fs::write(store.stop_marker("r1"), "").unwrap();
        assert_eq!(signals.poll(), Signal::Stop(StopMode::Retain));

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn checks_are_rate_limited() {
        let dir = unique_temp_dir("pf_markers_rate");
        let store = RunStore::new(dir.clone()).unwrap();
        let mut signals =
            MarkerSignals::for_run(&store, "r1").with_interval(Duration::from_secs(3600));
        assert_eq!(signals.poll(), Signal::None);
        write_pause_marker(&store, "r1").unwrap();
        assert_eq!(signals.poll(), Signal::None);
        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn in_process_flags_bypass_rate_limit() {
        let dir = unique_temp_dir("pf_markers_flags");
        let store = RunStore::new(dir.clone()).unwrap();
        let flags = SignalFlags::new();
        let mut signals = MarkerSignals::for_run(&store, "r1")
            .with_interval(Duration::from_secs(3600))
            .with_flags(Some(flags.clone()));
        assert_eq!(signals.poll(), Signal::None);
        flags.request_pause();
        assert_eq!(signals.poll(), Signal::Pause);
        let _ = fs::remove_dir_all(dir);
    }
}
