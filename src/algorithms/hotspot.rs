//! Hotspot landmark tracking.
//!
//! The user marks a recognizable bright feature in up to
//! [`MAX_HOTSPOT_GROUPS`](crate::state::MAX_HOTSPOT_GROUPS) independent
//! groups; a square patch around each marked position is fitted with a 2D
//! Gaussian for a sub-pixel landmark position, and one of three policies
//! turns the fitted positions into per-projection shifts.

use ndarray::{s, Array2, ArrayView2};
use rayon::prelude::*;
use tracing::warn;

use crate::config::FitConfig;
use crate::fitting::gaussian::fit_gaussian2d;
use crate::fitting::sinusoid::fit_sinusoid;
use crate::state::{HotspotPositions, SineParams};
use crate::volume::ProjectionVolume;

/// How the fitted landmark centroids become shifts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum HotspotPolicy {
    /// Land every projection's landmark on the reference projection's
    /// absolute position, vertically and horizontally.
    Line,
    /// Vertical as `Line`; horizontal from a sinusoid regression over the
    /// landmark x positions of the marked projections.
    Sine,
    /// Vertical as `Line`; horizontal untouched.
    YOnly,
}

/// Everything one hotspot pass needs, by name. `channel` selects the
/// element whose images the landmark is tracked in.
pub struct HotspotRequest<'a> {
    pub volume: &'a ProjectionVolume,
    pub positions: &'a HotspotPositions,
    pub channel: usize,
    pub group: usize,
    pub box_size: usize,
}

#[derive(Debug, Clone)]
pub struct HotspotResult {
    /// `(dy, dx)` correction per projection; `(0, 0)` for skipped ones.
    pub deltas: Vec<(i32, i32)>,
    /// Unmarked projections plus marked ones whose Gaussian fit was
    /// degenerate.
    pub skipped: Vec<usize>,
    /// The reference projection all others are aligned to.
    pub reference: usize,
    /// Sinusoid parameters when the policy was [`HotspotPolicy::Sine`].
    pub params: Option<SineParams>,
}

/// Extract the `box_size`-sided square patch around `(x, y)`, clamping the
/// *center* so the patch stays in bounds: a center closer to an edge than
/// half the box snaps to exactly half the box from that edge. The patch is
/// never resized. Returns the patch and its `(origin_y, origin_x)`.
pub fn extract_patch(
    image: ArrayView2<f32>,
    x: f64,
    y: f64,
    box_size: usize,
) -> crate::Result<(Array2<f32>, (usize, usize))> {
    let (height, width) = image.dim();
    if box_size > height || box_size > width {
        anyhow::bail!(
            "box size {} exceeds image extent {}x{}",
            box_size,
            height,
            width
        );
    }
    let half = box_size / 2;

    let cx = (x.round() as i64).clamp(half as i64, (width - (box_size - half)) as i64) as usize;
    let cy = (y.round() as i64).clamp(half as i64, (height - (box_size - half)) as i64) as usize;

    let origin = (cy - half, cx - half);
    let patch = image
        .slice(s![
            origin.0..origin.0 + box_size,
            origin.1..origin.1 + box_size
        ])
        .to_owned();
    Ok((patch, origin))
}

/// Fitted absolute landmark position `(x, y)` per projection. `None` for
/// unmarked projections and for degenerate (zero-intensity) patches.
/// Projections are independent here, so fits run in parallel.
pub fn fit_positions(
    req: &HotspotRequest<'_>,
    cfg: &FitConfig,
) -> crate::Result<Vec<Option<(f64, f64)>>> {
    if req.group >= req.positions.group_count() {
        anyhow::bail!(
            "hotspot group {} out of range ({} groups)",
            req.group,
            req.positions.group_count()
        );
    }
    (0..req.volume.projections())
        .into_par_iter()
        .map(|p| {
            let Some((x, y)) = req.positions.get(req.group, p) else {
                return Ok(None);
            };
            let image = req.volume.projection(req.channel, p);
            let (patch, origin) = extract_patch(image, x, y, req.box_size)?;
            let fitted = fit_gaussian2d(patch.view(), cfg);
            if fitted.is_degenerate() {
                warn!(
                    projection = p,
                    group = req.group,
                    "degenerate hotspot fit, skipping"
                );
                return Ok(None);
            }
            Ok(Some((
                origin.1 as f64 + fitted.cx,
                origin.0 as f64 + fitted.cy,
            )))
        })
        .collect()
}

/// Run one hotspot alignment pass for a group under the given policy.
pub fn align(
    req: &HotspotRequest<'_>,
    policy: HotspotPolicy,
    cfg: &FitConfig,
) -> crate::Result<HotspotResult> {
    let fitted = fit_positions(req, cfg)?;

    let reference = fitted
        .iter()
        .position(Option::is_some)
        .ok_or_else(|| anyhow::anyhow!("no marked positions in hotspot group {}", req.group))?;
    let (ref_x, ref_y) = fitted[reference].expect("reference position is marked");

    let params = match policy {
        HotspotPolicy::Sine => {
            let mut sample_angles = Vec::new();
            let mut sample_values = Vec::new();
            for (i, pos) in fitted.iter().enumerate() {
                if let Some((x, _)) = pos {
                    sample_angles.push(req.volume.angles()[i]);
                    sample_values.push(*x);
                }
            }
            let params = fit_sinusoid(&sample_angles, &sample_values, cfg).ok_or_else(|| {
                anyhow::anyhow!(
                    "sinusoid regression failed: {} marked landmarks",
                    sample_values.len()
                )
            })?;
            Some(params)
        }
        HotspotPolicy::Line | HotspotPolicy::YOnly => None,
    };

    let mut deltas = Vec::with_capacity(fitted.len());
    let mut skipped = Vec::new();
    for (i, pos) in fitted.iter().enumerate() {
        // Both components are computed fresh for every projection; a
        // skipped projection contributes exactly (0, 0).
        match pos {
            Some((x, y)) => {
                let dy = (ref_y - y).round() as i32;
                let dx = match policy {
                    HotspotPolicy::Line => (ref_x - x).round() as i32,
                    HotspotPolicy::Sine => {
                        let model = params.as_ref().expect("params fitted for sine policy");
                        (model.eval(req.volume.angles()[i]) - x).round() as i32
                    }
                    HotspotPolicy::YOnly => 0,
                };
                deltas.push((dy, dx));
            }
            None => {
                deltas.push((0, 0));
                skipped.push(i);
            }
        }
    }

    Ok(HotspotResult {
        deltas,
        skipped,
        reference,
        params,
    })
}
