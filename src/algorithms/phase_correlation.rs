//! Normalized (phase) correlation.
//!
//! Same pipeline as cross-correlation, but each cross-power bin is divided
//! by its own magnitude before the inverse transform, whitening the
//! spectrum and sharpening the correlation peak. The division is guarded:
//! bins whose magnitude falls below `epsilon` carry essentially no signal
//! and would otherwise produce non-finite values, so they are zeroed.

use ndarray::{Array2, ArrayView2};
use rustfft::num_complex::Complex;
use tracing::debug;

use crate::algorithms::fft2d::{fft2d, find_correlation_peak, fold_displacement, ifft2d};
use crate::volume::{roll2d, ProjectionVolume};

fn normalized_cross_power(
    ref_fft: &Array2<Complex<f32>>,
    tgt_fft: &Array2<Complex<f32>>,
    epsilon: f32,
) -> Array2<Complex<f32>> {
    let (height, width) = ref_fft.dim();
    let mut result = Array2::zeros((height, width));

    for y in 0..height {
        for x in 0..width {
            let product = tgt_fft[[y, x]] * ref_fft[[y, x]].conj();
            let magnitude = product.norm();
            if magnitude > epsilon {
                result[[y, x]] = product / magnitude;
            }
        }
    }

    result
}

/// Displacement `(dy, dx)` of `target` relative to `reference`, estimated
/// from the whitened cross-power spectrum.
pub fn correlate(
    reference: ArrayView2<f32>,
    target: ArrayView2<f32>,
    epsilon: f32,
) -> crate::Result<(i32, i32)> {
    if reference.dim() != target.dim() {
        anyhow::bail!(
            "image shapes {:?} and {:?} differ",
            reference.dim(),
            target.dim()
        );
    }
    let (height, width) = reference.dim();

    let ref_fft = fft2d(reference);
    let tgt_fft = fft2d(target);

    let cross_power = normalized_cross_power(&ref_fft, &tgt_fft, epsilon);
    let correlation = ifft2d(&cross_power);

    let (peak_y, peak_x) = find_correlation_peak(&correlation);
    Ok((
        fold_displacement(peak_y, height),
        fold_displacement(peak_x, width),
    ))
}

/// Pairwise chain over one channel, as in
/// [`cross_correlation::align_stack`](crate::algorithms::cross_correlation::align_stack).
pub fn align_stack(
    volume: &ProjectionVolume,
    channel: usize,
    epsilon: f32,
) -> crate::Result<Vec<(i32, i32)>> {
    let projections = volume.projections();
    if projections == 0 {
        return Ok(Vec::new());
    }
    let mut deltas = Vec::with_capacity(projections);
    deltas.push((0, 0));

    let mut previous = volume.projection(channel, 0).to_owned();
    for i in 1..projections {
        let current = volume.projection(channel, i);
        let (dy, dx) = correlate(previous.view(), current, epsilon)?;
        let correction = (-dy, -dx);
        debug!(projection = i, dy = -dy, dx = -dx, "pairwise correction");
        previous = roll2d(current, correction.0, correction.1);
        deltas.push(correction);
    }

    Ok(deltas)
}
