use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::movement::Classification;
use crate::session::SessionContext;
use crate::tracker::{ClassId, TrackId, Trajectory};

use super::report::FlowReport;

/// A classified trajectory, ready to be counted.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowEvent {
    pub camera_id: Arc<str>,
    pub track_id: TrackId,
    pub class_id: ClassId,
    pub classification: Classification,
    /// Time of the trajectory's last observation, in seconds
    pub timestamp: f64,
    pub frame_index: Option<u64>,
}

impl FlowEvent {
    pub fn new(camera_id: Arc<str>, trajectory: &Trajectory, classification: Classification) -> Self {
        Self {
            camera_id,
            track_id: trajectory.track_id,
            class_id: trajectory.class_id,
            classification,
            timestamp: trajectory.end_timestamp(),
            frame_index: trajectory.last_observed().map(|p| p.frame_index),
        }
    }
}

/// Which part of a camera's counts to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    /// The window `[index * window_secs, (index + 1) * window_secs)`
    Bucket(u64),
    /// Every window of the session
    Total,
}

#[derive(Debug)]
struct CameraCounts {
    window_secs: f64,
    windows: BTreeMap<u64, FlowReport>,
}

/// Windowed flow counts for any number of cameras.
///
/// Shared between camera workers; every call takes a short lock around the
/// count map.
#[derive(Debug)]
pub struct FlowCounter {
    default_window_secs: f64,
    cameras: Mutex<BTreeMap<Arc<str>, CameraCounts>>,
}

impl Default for FlowCounter {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl FlowCounter {
    /// `window_secs` applies to cameras that were never registered.
    /// Non-positive values fall back to one minute.
    pub fn new(window_secs: f64) -> Self {
        let default_window_secs = if window_secs.is_finite() && window_secs > 0.0 {
            window_secs
        } else {
            warn!(window_secs, "invalid counting window, using 60s");
            60.0
        };
        Self {
            default_window_secs,
            cameras: Mutex::new(BTreeMap::new()),
        }
    }

    /// Use the session's window length for its camera.
    ///
    /// Must happen before that camera's first event; later calls leave the
    /// existing windows untouched.
    pub fn register(&self, context: &SessionContext) {
        self.register_window(context.camera_id_arc(), context.window_secs());
    }

    pub(crate) fn register_window(&self, camera_id: Arc<str>, window_secs: f64) {
        self.cameras
            .lock()
            .entry(camera_id)
            .or_insert_with(|| CameraCounts {
                window_secs,
                windows: BTreeMap::new(),
            });
    }

    pub fn record(&self, event: &FlowEvent) {
        let mut cameras = self.cameras.lock();
        let counts = cameras
            .entry(Arc::clone(&event.camera_id))
            .or_insert_with(|| CameraCounts {
                window_secs: self.default_window_secs,
                windows: BTreeMap::new(),
            });
        let index = window_index(event.timestamp, counts.window_secs, event.track_id);
        counts
            .windows
            .entry(index)
            .or_default()
            .add(event.classification, event.class_id);
    }

    pub fn record_all<'a>(&self, events: impl IntoIterator<Item = &'a FlowEvent>) {
        for event in events {
            self.record(event);
        }
    }

    /// Counts of one camera. Unknown cameras and empty windows give an empty
    /// report.
    pub fn report(&self, camera_id: &str, window: Window) -> FlowReport {
        let cameras = self.cameras.lock();
        let Some(counts) = cameras.get(camera_id) else {
            return FlowReport::default();
        };
        match window {
            Window::Bucket(index) => counts.windows.get(&index).cloned().unwrap_or_default(),
            Window::Total => {
                let mut total = FlowReport::default();
                for report in counts.windows.values() {
                    total.merge(report);
                }
                total
            }
        }
    }

    /// Indices of the windows that hold at least one event, ascending.
    pub fn windows(&self, camera_id: &str) -> Vec<u64> {
        self.cameras
            .lock()
            .get(camera_id)
            .map(|counts| counts.windows.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Start and end time of a window, in seconds.
    pub fn window_bounds(&self, camera_id: &str, index: u64) -> (f64, f64) {
        let window_secs = self
            .cameras
            .lock()
            .get(camera_id)
            .map_or(self.default_window_secs, |counts| counts.window_secs);
        (index as f64 * window_secs, (index + 1) as f64 * window_secs)
    }

    pub fn cameras(&self) -> Vec<String> {
        self.cameras.lock().keys().map(|id| id.to_string()).collect()
    }
}

fn window_index(timestamp: f64, window_secs: f64, track_id: TrackId) -> u64 {
    if !(timestamp.is_finite() && timestamp >= 0.0) {
        warn!(timestamp, track_id, "invalid event timestamp, counting in first window");
        return 0;
    }
    (timestamp / window_secs).floor() as u64
}
