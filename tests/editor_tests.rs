use ndarray::{Array3, Array4};
use xrf_align::{HotspotPositions, ProjectionEditor, ProjectionVolume, ShiftState};

fn volume(projections: usize) -> ProjectionVolume {
    let data = Array4::from_shape_fn((2, projections, 8, 8), |(c, p, y, x)| {
        (c * 1000 + p * 100 + y * 8 + x) as f32
    });
    let angles = (0..projections).map(|p| p as f64 * 15.0).collect();
    let filenames = (0..projections).map(|p| format!("f{}.h5", p)).collect();
    ProjectionVolume::new(data, angles, filenames).unwrap()
}

#[test]
fn test_remove_deletes_matching_slice_everywhere() {
    let mut vol = volume(4);
    let mut state = ShiftState::new(4);
    let mut hotspots = HotspotPositions::new(4);
    state.dx = vec![1, 2, 3, 4];
    state.dy = vec![5, 6, 7, 8];
    hotspots.mark(0, 2, 3.0, 4.0).unwrap();

    let active = ProjectionEditor::remove(&mut vol, &mut state, &mut hotspots, 1).unwrap();

    assert_eq!(active, 0);
    assert_eq!(vol.projections(), 3);
    assert_eq!(vol.angles(), &[0.0, 30.0, 45.0]);
    assert_eq!(
        vol.filenames(),
        &["f0.h5".to_string(), "f2.h5".to_string(), "f3.h5".to_string()]
    );
    assert_eq!(state.dx, vec![1, 3, 4]);
    assert_eq!(state.dy, vec![5, 7, 8]);
    assert_eq!(hotspots.projections(), 3);
    // The mark moved down with its projection.
    assert_eq!(hotspots.get(0, 1), Some((3.0, 4.0)));
    // Pixel data from the old projection 2 now sits at index 1.
    assert_eq!(vol.projection(0, 1)[[0, 0]], 200.0);
    assert_eq!(vol.projection(1, 1)[[0, 0]], 1200.0);
}

#[test]
fn test_remove_out_of_range_changes_nothing() {
    let mut vol = volume(3);
    let mut state = ShiftState::new(3);
    let mut hotspots = HotspotPositions::new(3);

    assert!(ProjectionEditor::remove(&mut vol, &mut state, &mut hotspots, 5).is_err());
    assert_eq!(vol.projections(), 3);
    assert_eq!(state.len(), 3);
    assert_eq!(hotspots.projections(), 3);
}

#[test]
fn test_insert_restores_lengths_and_order() {
    let mut vol = volume(3);
    let mut state = ShiftState::new(3);
    let mut hotspots = HotspotPositions::new(3);
    state.dx = vec![1, 2, 3];

    let frame = Array3::from_elem((2, 8, 8), 9.0f32);
    ProjectionEditor::insert(
        &mut vol,
        &mut state,
        &mut hotspots,
        1,
        frame,
        22.5,
        "inserted.h5".to_string(),
    )
    .unwrap();

    assert_eq!(vol.projections(), 4);
    assert_eq!(vol.angles(), &[0.0, 22.5, 15.0, 30.0]);
    assert_eq!(vol.filenames()[1], "inserted.h5");
    assert_eq!(state.dx, vec![1, 0, 2, 3]);
    assert_eq!(state.dy.len(), 4);
    assert_eq!(hotspots.projections(), 4);
    assert_eq!(vol.projection(0, 1)[[4, 4]], 9.0);
    // The displaced projection keeps its pixels.
    assert_eq!(vol.projection(0, 2)[[0, 0]], 100.0);
}

#[test]
fn test_insert_rejects_mismatched_frame() {
    let mut vol = volume(2);
    let mut state = ShiftState::new(2);
    let mut hotspots = HotspotPositions::new(2);

    let wrong = Array3::from_elem((1, 8, 8), 0.0f32);
    assert!(ProjectionEditor::insert(
        &mut vol,
        &mut state,
        &mut hotspots,
        0,
        wrong,
        0.0,
        "x.h5".to_string(),
    )
    .is_err());
    assert_eq!(vol.projections(), 2);
    assert_eq!(state.len(), 2);
}
