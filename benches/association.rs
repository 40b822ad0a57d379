use criterion::{Criterion, black_box, criterion_group, criterion_main};
use trackflow_rs::tracker::{Associator, AssociatorConfig, TrackCandidate};
use trackflow_rs::{
    CameraConfig, ClassificationPolicy, Detection, Frame, MovementConfig, MovementSet,
    PathDistance, Rect, TrackManager, TrackerConfig, Trajectory, classify,
};

/// A grid of `n` objects, each shifted a little between prediction and detection.
fn scene(n: usize) -> (Vec<TrackCandidate>, Vec<Detection>) {
    let cols = (n as f32).sqrt().ceil() as usize;
    let mut tracks = Vec::with_capacity(n);
    let mut detections = Vec::with_capacity(n);
    for i in 0..n {
        let x = (i % cols) as f32 * 60.0;
        let y = (i / cols) as f32 * 60.0;
        tracks.push(TrackCandidate {
            id: i as u64 + 1,
            predicted: Rect::new(x, y, 40.0, 40.0),
            class_id: (i % 3) as u32,
        });
        let jitter = (i % 5) as f32;
        detections.push(Detection::new(x + jitter, y - jitter, 40.0, 40.0, (i % 3) as u32, 0.9));
    }
    // Detector output order is unrelated to track order.
    detections.reverse();
    (tracks, detections)
}

fn bench_associate(c: &mut Criterion) {
    let associator = Associator::new(AssociatorConfig::default());
    for n in [10, 50, 100] {
        let (tracks, detections) = scene(n);
        c.bench_function(&format!("associate_{n}x{n}"), |b| {
            b.iter(|| associator.associate(black_box(&tracks), black_box(&detections)))
        });
    }
}

fn bench_track_manager(c: &mut Criterion) {
    let frames: Vec<Frame> = (0..200u64)
        .map(|i| {
            let detections = (0..30)
                .map(|k| Detection::new(2.0 * i as f32 + 5.0, k as f32 * 50.0, 30.0, 30.0, 0, 0.8))
                .collect();
            Frame::at_rate(i, 25.0, detections)
        })
        .collect();

    c.bench_function("track_manager_200_frames_30_objects", |b| {
        b.iter(|| {
            let mut manager = TrackManager::with_config(TrackerConfig::default());
            for frame in &frames {
                black_box(manager.update(frame));
            }
            manager.finish()
        })
    });
}

fn bench_classify(c: &mut Criterion) {
    let mut config = CameraConfig::new("bench", ClassificationPolicy::path_similarity(PathDistance::Dtw));
    for k in 0..12u32 {
        let y = k as f32 * 40.0;
        config = config.with_movement(MovementConfig::path(
            k + 1,
            format!("lane {k}"),
            vec![[0.0, y], [400.0, y], [400.0 + y, 600.0]],
            15.0,
        ));
    }
    let movements = MovementSet::from_config(&config).unwrap();
    let centers: Vec<(f32, f32)> = (0..300).map(|i| (i as f32 * 1.5, 121.0)).collect();
    let trajectory = Trajectory::from_centers(1, 0, &centers);

    c.bench_function("classify_dtw_12_movements", |b| {
        b.iter(|| classify(black_box(&trajectory), black_box(&movements)))
    });
}

criterion_group!(benches, bench_associate, bench_track_manager, bench_classify);
criterion_main!(benches);
