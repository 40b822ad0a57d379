//! Parallel processing of several camera streams.

use std::collections::BTreeSet;
use std::fmt::Display;
use std::thread;

use crossbeam_channel::{Receiver, Select, Sender};
use tracing::{debug, info_span, warn};

use crate::error::{Error, Result};
use crate::flow::{FlowCounter, FlowEvent};
use crate::session::SessionContext;

use super::{CameraPipeline, DetectionSource, SessionSummary};

/// Pending messages per camera before its worker blocks.
const CHANNEL_CAPACITY: usize = 64;

enum CameraMessage {
    Flow(Vec<FlowEvent>),
    Done(SessionSummary),
    Failed(String),
}

/// Run one worker thread per camera and count everything into `counter`.
///
/// Each worker owns its camera's tracker and classifier and sends its flow
/// events over a dedicated bounded channel; the calling thread is the only
/// one recording into the counter. Summaries come back in job order.
///
/// A failing source is flushed and reported as [`Error::Source`] once every
/// other camera has finished.
pub fn run_cameras<D>(jobs: Vec<(SessionContext, D)>, counter: &FlowCounter) -> Result<Vec<SessionSummary>>
where
    D: DetectionSource + Send,
    D::Error: Display,
{
    let mut seen = BTreeSet::new();
    for (context, _) in &jobs {
        if !seen.insert(context.camera_id()) {
            return Err(Error::DuplicateCamera(context.camera_id().to_string()));
        }
    }
    for (context, _) in &jobs {
        counter.register(context);
    }

    thread::scope(|scope| {
        let mut cameras = Vec::with_capacity(jobs.len());
        let mut handles = Vec::with_capacity(jobs.len());

        for (context, source) in jobs {
            let (tx, rx) = crossbeam_channel::bounded(CHANNEL_CAPACITY);
            let camera = context.camera_id().to_string();
            let handle = thread::Builder::new()
                .name(format!("camera-{camera}"))
                .spawn_scoped(scope, move || camera_worker(&context, source, &tx))?;
            cameras.push((camera, rx));
            handles.push(handle);
        }

        let (summaries, failure) = drain(&cameras, counter);

        let mut panicked = None;
        for (handle, (camera, _)) in handles.into_iter().zip(&cameras) {
            if handle.join().is_err() {
                panicked.get_or_insert_with(|| camera.clone());
            }
        }
        if let Some(camera) = panicked {
            return Err(Error::WorkerPanicked(camera));
        }
        if let Some(error) = failure {
            return Err(error);
        }
        summaries
            .into_iter()
            .zip(&cameras)
            .map(|(summary, (camera, _))| summary.ok_or_else(|| Error::WorkerPanicked(camera.clone())))
            .collect()
    })
}

fn camera_worker<D>(context: &SessionContext, source: D, tx: &Sender<CameraMessage>)
where
    D: DetectionSource,
    D::Error: Display,
{
    let span = info_span!("camera", id = context.camera_id());
    let _guard = span.enter();

    let mut pipeline = CameraPipeline::new(context, source);
    loop {
        match pipeline.step() {
            Ok(Some(events)) if events.is_empty() => {}
            Ok(Some(events)) => {
                if tx.send(CameraMessage::Flow(events)).is_err() {
                    debug!("coordinator gone, stopping");
                    return;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "detection source failed");
                let events = pipeline.finish();
                let _ = tx.send(CameraMessage::Flow(events));
                let _ = tx.send(CameraMessage::Failed(e.to_string()));
                return;
            }
        }
    }
    let _ = tx.send(CameraMessage::Done(pipeline.summary()));
}

/// Record every camera's events until all workers have hung up.
fn drain(
    cameras: &[(String, Receiver<CameraMessage>)],
    counter: &FlowCounter,
) -> (Vec<Option<SessionSummary>>, Option<Error>) {
    let mut summaries = vec![None; cameras.len()];
    let mut failure = None;

    let mut select = Select::new();
    for (_, rx) in cameras {
        select.recv(rx);
    }

    let mut open = cameras.len();
    while open > 0 {
        let op = select.select();
        let idx = op.index();
        let (camera, rx) = &cameras[idx];
        match op.recv(rx) {
            Ok(CameraMessage::Flow(events)) => counter.record_all(&events),
            Ok(CameraMessage::Done(summary)) => summaries[idx] = Some(summary),
            Ok(CameraMessage::Failed(message)) => {
                failure.get_or_insert(Error::Source {
                    camera: camera.clone(),
                    message,
                });
            }
            Err(_) => {
                select.remove(idx);
                open -= 1;
            }
        }
    }
    (summaries, failure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::Window;
    use crate::integration::VecSource;
    use crate::movement::{CameraConfig, ClassificationPolicy, MovementConfig};
    use crate::session::SessionConfig;
    use crate::tracker::{Detection, Frame};

    fn context(camera_id: &str) -> SessionContext {
        let camera = CameraConfig::new(camera_id, ClassificationPolicy::RegionCrossing).with_movement(
            MovementConfig::regions(
                1,
                "eastbound",
                vec![[0.0, 0.0], [40.0, 0.0], [40.0, 40.0], [0.0, 40.0]],
                vec![[80.0, 0.0], [140.0, 0.0], [140.0, 40.0], [80.0, 40.0]],
            ),
        );
        SessionContext::new(SessionConfig::new(camera)).unwrap()
    }

    fn vehicles(count: usize) -> VecSource {
        // One vehicle after another, 40 frames apart.
        let frames = (0..count * 40).map(|i| {
            let step = (i % 40) as f32;
            if step < 25.0 {
                vec![Detection::new(10.0 + 4.0 * step, 10.0, 10.0, 10.0, 0, 0.9)]
            } else {
                Vec::new()
            }
        });
        VecSource::from_detections(10.0, frames)
    }

    #[test]
    fn test_cameras_counted_independently() {
        let counter = FlowCounter::default();
        let jobs = vec![(context("a"), vehicles(1)), (context("b"), vehicles(3))];
        let summaries = run_cameras(jobs, &counter).unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].camera_id, "a");
        assert_eq!(summaries[1].camera_id, "b");
        assert_eq!(counter.report("a", Window::Total).count(1), 1);
        assert_eq!(counter.report("b", Window::Total).count(1), 3);
    }

    #[test]
    fn test_duplicate_camera_rejected() {
        let counter = FlowCounter::default();
        let jobs = vec![(context("a"), vehicles(1)), (context("a"), vehicles(1))];
        assert!(matches!(run_cameras(jobs, &counter), Err(Error::DuplicateCamera(id)) if id == "a"));
    }

    struct FailingSource {
        frames: u64,
    }

    impl DetectionSource for FailingSource {
        type Error = String;

        fn next_frame(&mut self) -> std::result::Result<Option<Frame>, Self::Error> {
            if self.frames == 0 {
                return Err("decoder lost".to_string());
            }
            self.frames -= 1;
            Ok(Some(Frame::default()))
        }
    }

    #[test]
    fn test_source_failure_is_reported() {
        let counter = FlowCounter::default();
        let jobs = vec![(context("broken"), FailingSource { frames: 3 })];
        match run_cameras(jobs, &counter) {
            Err(Error::Source { camera, message }) => {
                assert_eq!(camera, "broken");
                assert_eq!(message, "decoder lost");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
