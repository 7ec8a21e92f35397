//! Center-of-mass extraction and sinusoid-based horizontal alignment.
//!
//! Each projection's horizontal intensity centroid should trace a sinusoid
//! across rotation angle. Fitting that curve yields the rotation-center
//! x-estimate; the per-projection residuals become horizontal shifts that
//! collapse the centroids onto the fitted curve ("to a line") or onto a
//! sinusoid with a previously known center ("to a sine").

use ndarray::ArrayView2;
use rayon::prelude::*;
use tracing::warn;

use crate::config::FitConfig;
use crate::fitting::sinusoid::{fit_sinusoid, fit_sinusoid_fixed_offset};
use crate::state::SineParams;
use crate::volume::ProjectionVolume;

/// Side of the corner patch used for the background estimate.
const BACKGROUND_PATCH: usize = 10;

/// Which curve the centroids are collapsed onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CenterOfMassMode {
    /// Full 3-parameter fit; residuals flatten the centroid track.
    Line,
    /// Refit amplitude and phase only, holding the known center fixed.
    Sine,
}

#[derive(Debug, Clone)]
pub struct CenterOfMassResult {
    /// Horizontal correction per projection; 0 for skipped projections.
    pub dx: Vec<i32>,
    /// Projections excluded for a degenerate (zero-sum) profile.
    pub skipped: Vec<usize>,
    pub params: SineParams,
}

/// Horizontal centroid of the background-subtracted intensity profile.
///
/// Background is the mean of the top-left corner patch (clamped to the
/// image extent). Negative background-subtracted sums are clamped to zero
/// so an over-estimated background cannot flip the centroid. A zero-sum
/// profile is degenerate and yields `None`.
pub fn horizontal_centroid(image: ArrayView2<f32>) -> Option<f64> {
    let (height, width) = image.dim();
    let bh = BACKGROUND_PATCH.min(height);
    let bw = BACKGROUND_PATCH.min(width);

    let mut background = 0.0f64;
    for y in 0..bh {
        for x in 0..bw {
            background += image[[y, x]] as f64;
        }
    }
    background /= (bh * bw) as f64;

    let mut total = 0.0f64;
    let mut weighted = 0.0f64;
    for x in 0..width {
        let mut column = 0.0f64;
        for y in 0..height {
            column += image[[y, x]] as f64 - background;
        }
        let column = column.max(0.0);
        total += column;
        weighted += x as f64 * column;
    }

    if total < 1e-12 {
        None
    } else {
        Some(weighted / total)
    }
}

/// Per-projection centroids for one channel. Independent across
/// projections, so computed in parallel.
pub fn measure(volume: &ProjectionVolume, channel: usize) -> Vec<Option<f64>> {
    (0..volume.projections())
        .into_par_iter()
        .map(|p| horizontal_centroid(volume.projection(channel, p)))
        .collect()
}

/// Run the center-of-mass pass. `prior_center` supplies the fixed `c` for
/// [`CenterOfMassMode::Sine`] and is ignored for `Line`.
pub fn align(
    volume: &ProjectionVolume,
    channel: usize,
    mode: CenterOfMassMode,
    prior_center: f64,
    cfg: &FitConfig,
) -> crate::Result<CenterOfMassResult> {
    let centroids = measure(volume, channel);
    let skipped: Vec<usize> = centroids
        .iter()
        .enumerate()
        .filter_map(|(i, c)| c.is_none().then_some(i))
        .collect();
    for &i in &skipped {
        warn!(projection = i, "zero-sum profile, skipping center of mass");
    }

    let mut sample_angles = Vec::new();
    let mut sample_values = Vec::new();
    for (i, centroid) in centroids.iter().enumerate() {
        if let Some(value) = centroid {
            sample_angles.push(volume.angles()[i]);
            sample_values.push(*value);
        }
    }

    let params = match mode {
        CenterOfMassMode::Line => fit_sinusoid(&sample_angles, &sample_values, cfg),
        CenterOfMassMode::Sine => {
            fit_sinusoid_fixed_offset(&sample_angles, &sample_values, prior_center, cfg)
        }
    }
    .ok_or_else(|| {
        anyhow::anyhow!(
            "sinusoid regression failed: {} usable centroids",
            sample_values.len()
        )
    })?;

    let dx = centroids
        .iter()
        .enumerate()
        .map(|(i, centroid)| match centroid {
            Some(measured) => {
                let fitted = params.eval(volume.angles()[i]);
                (fitted - measured).round() as i32
            }
            None => 0,
        })
        .collect();

    Ok(CenterOfMassResult {
        dx,
        skipped,
        params,
    })
}
