//! Cooperative pause/stop requests, polled between sub-steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// What a stop does with the run's checkpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopMode {
    /// Keep a checkpoint so the run can be resumed.
    Retain,
    /// Drop any checkpoint.
    Discard,
}

impl StopMode {
    pub fn as_str(self) -> &'static str {
        match self {
            StopMode::Retain => "retain",
            StopMode::Discard => "discard",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "retain" => Some(StopMode::Retain),
            "discard" => Some(StopMode::Discard),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    None,
    Pause,
    Stop(StopMode),
}

pub trait ControlSignals {
    fn poll(&mut self) -> Signal;
}

/// Never signals.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoSignals;

impl ControlSignals for NoSignals {
    fn poll(&mut self) -> Signal {
        Signal::None
    }
}

/// In-process flags; clones share state, so a handle can be kept by the
/// requesting side while the walker polls another.
#[derive(Clone, Debug, Default)]
pub struct SignalFlags {
    pause: Arc<AtomicBool>,
    stop: Arc<AtomicBool>,
    discard: Arc<AtomicBool>,
}

impl SignalFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_pause(&self) {
        self.pause.store(true, Ordering::SeqCst);
    }

    pub fn request_stop(&self, mode: StopMode) {
        self.discard
            .store(mode == StopMode::Discard, Ordering::SeqCst);
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn clear(&self) {
        self.pause.store(false, Ordering::SeqCst);
        self.stop.store(false, Ordering::SeqCst);
        self.discard.store(false, Ordering::SeqCst);
    }
}

impl ControlSignals for SignalFlags {
    /// Stop wins over pause.
    fn poll(&mut self) -> Signal {
        if self.stop.load(Ordering::SeqCst) {
            let mode = if self.discard.load(Ordering::SeqCst) {
                StopMode::Discard
            } else {
                StopMode::Retain
            };
            return Signal::Stop(mode);
        }
        if self.pause.load(Ordering::SeqCst) {
            return Signal::Pause;
        }
        Signal::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_shared_between_clones() {
        let handle = SignalFlags::new();
        let mut polled = handle.clone();
        assert_eq!(polled.poll(), Signal::None);

        handle.request_pause();
        assert_eq!(polled.poll(), Signal::Pause);

        handle.request_stop(StopMode::Discard);
        assert_eq!(polled.poll(), Signal::Stop(StopMode::Discard));

        handle.clear();
        assert_eq!(polled.poll(), Signal::None);
    }

    #[test]
    fn stop_mode_tokens() {
        assert_eq!(StopMode::parse(" Retain\n"), Some(StopMode::Retain));
        assert_eq!(StopMode::parse("discard"), Some(StopMode::Discard));
        assert_eq!(StopMode::parse("maybe"), None);
    }
}
