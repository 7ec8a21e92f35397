use ndarray::Array2;
use xrf_align::algorithms::{cross_correlation, phase_correlation};
use xrf_align::roll2d;

const EPSILON: f32 = 1e-10;

fn checker_pattern(height: usize, width: usize) -> Array2<f32> {
    Array2::from_shape_fn((height, width), |(y, x)| {
        if (x + y) % 8 < 4 {
            1.0
        } else {
            0.0
        }
    })
}

fn disk(size: usize, cy: f64, cx: f64, radius: f64) -> Array2<f32> {
    Array2::from_shape_fn((size, size), |(y, x)| {
        let dy = y as f64 - cy;
        let dx = x as f64 - cx;
        if (dy * dy + dx * dx).sqrt() <= radius {
            1.0
        } else {
            0.0
        }
    })
}

#[test]
fn test_cross_correlation_of_image_with_itself_is_zero() {
    let image = disk(64, 32.0, 32.0, 9.0);
    let (dy, dx) = cross_correlation::correlate(image.view(), image.view()).unwrap();
    assert_eq!((dy, dx), (0, 0));
}

#[test]
fn test_cross_correlation_recovers_circular_shifts() {
    let image = disk(64, 30.0, 34.0, 7.0);
    for &(dy0, dx0) in &[(0, 5), (3, 0), (-4, 7), (12, -9), (-15, -11)] {
        let shifted = roll2d(image.view(), dy0, dx0);
        let (dy, dx) = cross_correlation::correlate(image.view(), shifted.view()).unwrap();
        assert_eq!((dy, dx), (dy0, dx0), "shift ({}, {})", dy0, dx0);
    }
}

#[test]
fn test_cross_correlation_rejects_shape_mismatch() {
    let a = disk(32, 16.0, 16.0, 5.0);
    let b = disk(64, 32.0, 32.0, 5.0);
    assert!(cross_correlation::correlate(a.view(), b.view()).is_err());
}

#[test]
fn test_phase_correlation_of_image_with_itself_is_zero() {
    let image = checker_pattern(48, 48);
    let (dy, dx) = phase_correlation::correlate(image.view(), image.view(), EPSILON).unwrap();
    assert_eq!((dy, dx), (0, 0));
}

#[test]
fn test_phase_correlation_recovers_circular_shifts() {
    let image = disk(64, 28.0, 36.0, 8.0);
    for &(dy0, dx0) in &[(2, -3), (-7, 6), (10, 13)] {
        let shifted = roll2d(image.view(), dy0, dx0);
        let (dy, dx) = phase_correlation::correlate(image.view(), shifted.view(), EPSILON).unwrap();
        assert_eq!((dy, dx), (dy0, dx0), "shift ({}, {})", dy0, dx0);
    }
}

#[test]
fn test_phase_correlation_on_empty_images_stays_finite() {
    // Every spectral bin is below epsilon; the guarded normalization must
    // yield a usable (zero) displacement instead of NaN propagation.
    let blank = Array2::<f32>::zeros((32, 32));
    let (dy, dx) = phase_correlation::correlate(blank.view(), blank.view(), EPSILON).unwrap();
    assert_eq!((dy, dx), (0, 0));
}

#[test]
fn test_roll2d_wraps_toroidally() {
    let mut image = Array2::<f32>::zeros((4, 4));
    image[[0, 0]] = 1.0;
    let rolled = roll2d(image.view(), -1, -1);
    assert_eq!(rolled[[3, 3]], 1.0);
    assert_eq!(rolled[[0, 0]], 0.0);
}
