//! FFT cross-correlation displacement estimation.
//!
//! Pairwise use registers projection i+1 against projection i *after* i's
//! own correction, so estimation errors can accumulate along the sequence.
//! That drift is the documented behavior of this aligner, not a defect to
//! be compensated here.

use ndarray::ArrayView2;
use tracing::debug;

use crate::algorithms::fft2d::{fft2d, find_correlation_peak, fold_displacement, ifft2d};
use crate::volume::{roll2d, ProjectionVolume};

/// Displacement `(dy, dx)` of `target` relative to `reference`: if target
/// equals reference circularly rolled by `(dy, dx)`, that roll is returned.
pub fn correlate(reference: ArrayView2<f32>, target: ArrayView2<f32>) -> crate::Result<(i32, i32)> {
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

    // Cross-power spectrum: target spectrum times conjugate reference
    // spectrum, so the correlation peak lands at the target's displacement.
    let cross_power = &tgt_fft * &ref_fft.mapv(|v| v.conj());
    let correlation = ifft2d(&cross_power);

    let (peak_y, peak_x) = find_correlation_peak(&correlation);
    Ok((
        fold_displacement(peak_y, height),
        fold_displacement(peak_x, width),
    ))
}

/// Chain the whole stack pairwise on one channel and return the per-
/// projection corrections `(dy, dx)` that cancel the measured
/// displacements. Projection 0 is the anchor and gets `(0, 0)`.
///
/// Inherently sequential: each step correlates against the previous
/// projection as it would look after its own correction.
pub fn align_stack(volume: &ProjectionVolume, channel: usize) -> crate::Result<Vec<(i32, i32)>> {
    let projections = volume.projections();
    if projections == 0 {
        return Ok(Vec::new());
    }
    let mut deltas = Vec::with_capacity(projections);
    deltas.push((0, 0));

    let mut previous = volume.projection(channel, 0).to_owned();
    for i in 1..projections {
        let current = volume.projection(channel, i);
        let (dy, dx) = correlate(previous.view(), current)?;
        let correction = (-dy, -dx);
        debug!(projection = i, dy = -dy, dx = -dx, "pairwise correction");
        previous = roll2d(current, correction.0, correction.1);
        deltas.push(correction);
    }

    Ok(deltas)
}
