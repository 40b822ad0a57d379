//! CameraPipeline: one camera's detections in, classified flow events out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, info_span};

use crate::flow::{FlowCounter, FlowEvent};
use crate::movement::MovementClassifier;
use crate::session::SessionContext;
use crate::tracker::{TrackManager, TrackerStats, Trajectory};

use super::DetectionSource;

/// End-of-session totals for one camera.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionSummary {
    pub camera_id: String,
    pub stats: TrackerStats,
    /// Trajectories finalized during the session
    pub trajectories: u64,
    pub matched: u64,
    pub unmatched: u64,
}

/// Bundles a detection source with the tracker and classifier of one camera.
///
/// Every finalized trajectory is classified exactly once and turned into a
/// single [`FlowEvent`].
pub struct CameraPipeline<D: DetectionSource> {
    source: D,
    tracker: TrackManager,
    classifier: MovementClassifier,
    camera_id: Arc<str>,
    window_secs: f64,
    summary: SessionSummary,
    finished: bool,
}

impl<D: DetectionSource> CameraPipeline<D> {
    pub fn new(context: &SessionContext, source: D) -> Self {
        Self {
            source,
            tracker: TrackManager::new(context),
            classifier: MovementClassifier::new(context),
            camera_id: context.camera_id_arc(),
            window_secs: context.window_secs(),
            summary: SessionSummary {
                camera_id: context.camera_id().to_string(),
                ..SessionSummary::default()
            },
            finished: false,
        }
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    /// Pull one frame from the source and return the flow events of the
    /// trajectories that finished on it. At end of stream the live tracks are
    /// flushed; after that `Ok(None)` is returned.
    pub fn step(&mut self) -> Result<Option<Vec<FlowEvent>>, D::Error> {
        if self.finished {
            return Ok(None);
        }
        match self.source.next_frame()? {
            Some(frame) => {
                let finalized = self.tracker.update(&frame);
                Ok(Some(self.classify_all(finalized)))
            }
            None => Ok(Some(self.finish())),
        }
    }

    /// End the session: terminate every live track and classify what it
    /// leaves behind. Does nothing the second time.
    pub fn finish(&mut self) -> Vec<FlowEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let finalized = self.tracker.finish();
        let events = self.classify_all(finalized);
        self.summary.stats = *self.tracker.stats();
        info!(
            camera = %self.camera_id,
            trajectories = self.summary.trajectories,
            matched = self.summary.matched,
            unmatched = self.summary.unmatched,
            "camera session finished"
        );
        events
    }

    /// Drive the source to its end, recording every event into `counter`.
    /// The camera is registered with the session's counting window unless
    /// `counter` already knows it.
    ///
    /// A source error aborts the run without flushing; the tracks seen so
    /// far stay live and [`finish`](Self::finish) may still be called.
    pub fn run(&mut self, counter: &FlowCounter) -> Result<SessionSummary, D::Error> {
        let span = info_span!("camera", id = %self.camera_id);
        let _guard = span.enter();
        counter.register_window(Arc::clone(&self.camera_id), self.window_secs);
        while let Some(events) = self.step()? {
            counter.record_all(&events);
        }
        Ok(self.summary())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            stats: *self.tracker.stats(),
            ..self.summary.clone()
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn source(&self) -> &D {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut D {
        &mut self.source
    }

    pub fn tracker(&self) -> &TrackManager {
        &self.tracker
    }

    pub fn classifier(&self) -> &MovementClassifier {
        &self.classifier
    }

    fn classify_all(&mut self, trajectories: Vec<Trajectory>) -> Vec<FlowEvent> {
        trajectories
            .iter()
            .map(|trajectory| {
                let classification = self.classifier.classify(trajectory);
                self.summary.trajectories += 1;
                if classification.is_matched() {
                    self.summary.matched += 1;
                } else {
                    self.summary.unmatched += 1;
                }
                FlowEvent::new(Arc::clone(&self.camera_id), trajectory, classification)
            })
            .collect()
    }
}
