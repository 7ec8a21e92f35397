use ndarray::{Array2, Array4};
use xrf_align::{
    roll2d, AlignmentCommand, AlignmentEngine, CenterOfMassMode, Config, ProjectionVolume,
};

fn disk(size: usize, radius: f64) -> Array2<f32> {
    let center = size as f64 / 2.0;
    Array2::from_shape_fn((size, size), |(y, x)| {
        let dy = y as f64 - center;
        let dx = x as f64 - center;
        if (dy * dy + dx * dx).sqrt() <= radius {
            1.0
        } else {
            0.0
        }
    })
}

/// Stack of identical centered disks, each rolled by its own offset, in
/// `channels` identical channels.
fn rolled_disk_volume(
    size: usize,
    channels: usize,
    offsets: &[(i32, i32)],
) -> ProjectionVolume {
    let base = disk(size, (size / 8) as f64);
    let projections = offsets.len();
    let mut data = Array4::<f32>::zeros((channels, projections, size, size));
    for (p, &(dy, dx)) in offsets.iter().enumerate() {
        let rolled = roll2d(base.view(), dy, dx);
        for c in 0..channels {
            data.slice_mut(ndarray::s![c, p, .., ..]).assign(&rolled);
        }
    }
    let angles = (0..projections)
        .map(|p| p as f64 * 180.0 / projections as f64)
        .collect();
    let filenames = (0..projections)
        .map(|p| format!("proj_{:04}.h5", p))
        .collect();
    ProjectionVolume::new(data, angles, filenames).unwrap()
}

fn centroid2d(image: ndarray::ArrayView2<f32>) -> (f64, f64) {
    let mut total = 0.0f64;
    let mut cy = 0.0f64;
    let mut cx = 0.0f64;
    for ((y, x), &v) in image.indexed_iter() {
        total += v as f64;
        cy += y as f64 * v as f64;
        cx += x as f64 * v as f64;
    }
    (cy / total, cx / total)
}

#[test]
fn test_cross_correlation_pass_registers_rolled_disks() {
    let offsets = [(0, 0), (0, 2), (0, -3), (0, 1), (0, 4)];
    let volume = rolled_disk_volume(64, 1, &offsets);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    engine
        .execute(AlignmentCommand::RunCrossCorrelation)
        .unwrap();

    // Pairwise chaining anchors on projection 0, so each correction is the
    // negated absolute offset.
    assert_eq!(engine.state().dx, vec![0, -2, 3, -1, -4]);
    assert_eq!(engine.state().dy, vec![0, 0, 0, 0, 0]);

    // All 5 disks end up centered within 1 pixel of each other.
    let (ref_cy, ref_cx) = centroid2d(engine.volume().projection(0, 0));
    for p in 1..5 {
        let (cy, cx) = centroid2d(engine.volume().projection(0, p));
        assert!((cy - ref_cy).abs() <= 1.0, "projection {} cy {}", p, cy);
        assert!((cx - ref_cx).abs() <= 1.0, "projection {} cx {}", p, cx);
    }
}

#[test]
fn test_second_pass_adds_no_further_delta() {
    let offsets = [(1, 0), (-2, 3), (2, -1), (0, 2)];
    let volume = rolled_disk_volume(64, 1, &offsets);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    engine
        .execute(AlignmentCommand::RunCrossCorrelation)
        .unwrap();
    let after_first = engine.state().clone();

    let report = engine
        .execute(AlignmentCommand::RunCrossCorrelation)
        .unwrap();
    assert!(report.applied.iter().all(|&d| d == (0, 0)));
    assert_eq!(engine.state().dx, after_first.dx);
    assert_eq!(engine.state().dy, after_first.dy);
}

#[test]
fn test_shifts_are_applied_to_all_channels_together() {
    let offsets = [(0, 0), (2, -3)];
    let volume = rolled_disk_volume(32, 3, &offsets);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    engine
        .execute(AlignmentCommand::RunCrossCorrelation)
        .unwrap();

    let reference = engine.volume().projection(0, 1).to_owned();
    for c in 1..3 {
        assert_eq!(engine.volume().projection(c, 1), reference.view());
    }
}

#[test]
fn test_manual_nudges_accumulate_on_active_projection() {
    let volume = rolled_disk_volume(32, 1, &[(0, 0), (0, 0), (0, 0)]);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    engine
        .execute(AlignmentCommand::SelectProjection(1))
        .unwrap();
    engine.execute(AlignmentCommand::ShiftRight).unwrap();
    engine.execute(AlignmentCommand::ShiftRight).unwrap();
    engine.execute(AlignmentCommand::ShiftUp).unwrap();

    assert_eq!(engine.state().dx, vec![0, 2, 0]);
    assert_eq!(engine.state().dy, vec![0, -1, 0]);
}

#[test]
fn test_exclude_keeps_parallel_arrays_in_lockstep() {
    let offsets = [(0, 0), (1, 1), (2, 2), (3, 3), (4, 4), (5, 5)];
    let volume = rolled_disk_volume(32, 2, &offsets);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    for select in [3usize, 0, 2] {
        engine
            .execute(AlignmentCommand::SelectProjection(select))
            .unwrap();
        engine.execute(AlignmentCommand::ExcludeProjection).unwrap();

        let p = engine.volume().projections();
        assert_eq!(engine.volume().angles().len(), p);
        assert_eq!(engine.volume().filenames().len(), p);
        assert_eq!(engine.state().dx.len(), p);
        assert_eq!(engine.state().dy.len(), p);
        assert_eq!(engine.hotspots().projections(), p);
        assert!(engine.active() < p);
    }
    assert_eq!(engine.volume().projections(), 3);
}

#[test]
fn test_exclude_active_index_policy() {
    let volume = rolled_disk_volume(32, 1, &[(0, 0), (0, 0), (0, 0), (0, 0)]);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    // Removing index 0 keeps the cursor at 0.
    engine.execute(AlignmentCommand::ExcludeProjection).unwrap();
    assert_eq!(engine.active(), 0);

    // Removing index i > 0 steps the cursor back to i - 1.
    engine
        .execute(AlignmentCommand::SelectProjection(2))
        .unwrap();
    engine.execute(AlignmentCommand::ExcludeProjection).unwrap();
    assert_eq!(engine.active(), 1);
}

#[test]
fn test_exclude_removes_matching_metadata_entry() {
    let volume = rolled_disk_volume(32, 1, &[(0, 0), (0, 0), (0, 0)]);
    let mut engine = AlignmentEngine::new(volume, Config::default());
    engine.execute(AlignmentCommand::ShiftLeft).unwrap(); // dx[0] = -1

    engine
        .execute(AlignmentCommand::SelectProjection(1))
        .unwrap();
    engine.execute(AlignmentCommand::ExcludeProjection).unwrap();

    assert_eq!(
        engine.volume().filenames(),
        &["proj_0000.h5".to_string(), "proj_0002.h5".to_string()]
    );
    assert_eq!(engine.state().dx, vec![-1, 0]);
}

#[test]
fn test_select_out_of_range_is_rejected() {
    let volume = rolled_disk_volume(32, 1, &[(0, 0), (0, 0)]);
    let mut engine = AlignmentEngine::new(volume, Config::default());
    assert!(engine
        .execute(AlignmentCommand::SelectProjection(2))
        .is_err());
    assert_eq!(engine.active(), 0);
}

#[test]
fn test_cannot_exclude_last_projection() {
    let volume = rolled_disk_volume(32, 1, &[(0, 0)]);
    let mut engine = AlignmentEngine::new(volume, Config::default());
    assert!(engine.execute(AlignmentCommand::ExcludeProjection).is_err());
    assert_eq!(engine.volume().projections(), 1);
}

#[test]
fn test_center_of_mass_sine_holds_prior_center() {
    let offsets = [(0, 0), (0, 1), (0, -1), (0, 2), (0, 0), (0, -2)];
    let volume = rolled_disk_volume(64, 1, &offsets);
    let mut engine = AlignmentEngine::new(volume, Config::default());

    // Seed the prior center with a free 3-parameter fit first.
    engine
        .execute(AlignmentCommand::RunCenterOfMass(CenterOfMassMode::Line))
        .unwrap();
    let prior = engine.state().center.offset;

    engine
        .execute(AlignmentCommand::RunCenterOfMass(CenterOfMassMode::Sine))
        .unwrap();
    assert_eq!(engine.state().center.offset, prior);
}
