//! Sub-pixel 2D Gaussian peak fit over a landmark patch.
//!
//! Two stages: a method-of-moments initial guess, then Levenberg-Marquardt
//! refinement of the pixel-wise residual. Coordinates are `(x, y)` within
//! the patch, row `y` / column `x`.

use ndarray::ArrayView2;

use crate::config::FitConfig;
use crate::fitting::least_squares;

/// An elliptical, axis-aligned 2D Gaussian `height * exp(-(((x-cx)/wx)^2
/// + ((y-cy)/wy)^2) / 2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gaussian2d {
    pub height: f64,
    pub cx: f64,
    pub cy: f64,
    pub width_x: f64,
    pub width_y: f64,
}

impl Gaussian2d {
    pub fn eval(&self, x: f64, y: f64) -> f64 {
        let ax = (x - self.cx) / self.width_x;
        let ay = (y - self.cy) / self.width_y;
        self.height * (-(ax * ax + ay * ay) / 2.0).exp()
    }

    /// A zero-width or non-finite fit. Callers skip the shift for the
    /// affected projection/group instead of dividing by zero.
    pub fn is_degenerate(&self) -> bool {
        !(self.height.is_finite()
            && self.cx.is_finite()
            && self.cy.is_finite()
            && self.width_x.is_finite()
            && self.width_y.is_finite())
            || self.height <= 0.0
            || self.width_x.abs() < 1e-9
            || self.width_y.abs() < 1e-9
    }

    fn to_params(self) -> [f64; 5] {
        [self.height, self.cx, self.cy, self.width_x, self.width_y]
    }

    fn from_params(p: &[f64]) -> Self {
        Self {
            height: p[0],
            cx: p[1],
            cy: p[2],
            width_x: p[3],
            width_y: p[4],
        }
    }
}

/// Method-of-moments estimate: intensity-weighted centroid, widths from the
/// second moment of the column/row passing through the centroid.
///
/// A zero-intensity patch yields the all-zero (degenerate) Gaussian.
pub fn moments(patch: ArrayView2<f32>) -> Gaussian2d {
    let (h, w) = patch.dim();
    let total: f64 = patch.iter().map(|&v| v as f64).sum();
    if total.abs() < 1e-12 {
        return Gaussian2d {
            height: 0.0,
            cx: 0.0,
            cy: 0.0,
            width_x: 0.0,
            width_y: 0.0,
        };
    }

    let mut cx = 0.0f64;
    let mut cy = 0.0f64;
    for y in 0..h {
        for x in 0..w {
            let v = patch[[y, x]] as f64;
            cx += x as f64 * v;
            cy += y as f64 * v;
        }
    }
    cx /= total;
    cy /= total;

    let row = cy.round().clamp(0.0, (h - 1) as f64) as usize;
    let col = cx.round().clamp(0.0, (w - 1) as f64) as usize;

    let mut row_sum = 0.0f64;
    let mut row_second = 0.0f64;
    for x in 0..w {
        let v = patch[[row, x]] as f64;
        row_sum += v;
        row_second += (x as f64 - cx).powi(2) * v;
    }
    let width_x = if row_sum.abs() > 1e-12 {
        (row_second / row_sum).abs().sqrt()
    } else {
        0.0
    };

    let mut col_sum = 0.0f64;
    let mut col_second = 0.0f64;
    for y in 0..h {
        let v = patch[[y, col]] as f64;
        col_sum += v;
        col_second += (y as f64 - cy).powi(2) * v;
    }
    let width_y = if col_sum.abs() > 1e-12 {
        (col_second / col_sum).abs().sqrt()
    } else {
        0.0
    };

    let height = patch.iter().fold(f32::NEG_INFINITY, |a, &b| a.max(b)) as f64;

    Gaussian2d {
        height,
        cx,
        cy,
        width_x,
        width_y,
    }
}

/// Fit a 2D Gaussian to a patch: moments initial guess refined by bounded
/// Levenberg-Marquardt. Degenerate input is returned as-is for the caller
/// to skip.
pub fn fit_gaussian2d(patch: ArrayView2<f32>, cfg: &FitConfig) -> Gaussian2d {
    let initial = moments(patch);
    if initial.is_degenerate() {
        return initial;
    }

    let (h, w) = patch.dim();
    let residuals = |p: &[f64]| -> Vec<f64> {
        let g = Gaussian2d::from_params(p);
        let mut r = Vec::with_capacity(h * w);
        for y in 0..h {
            for x in 0..w {
                r.push(g.eval(x as f64, y as f64) - patch[[y, x]] as f64);
            }
        }
        r
    };

    let mut params = initial.to_params();
    let summary = least_squares(residuals, &mut params, cfg);
    tracing::trace!(
        iterations = summary.iterations,
        cost = summary.cost,
        converged = summary.converged,
        "gaussian fit finished"
    );

    let mut fitted = Gaussian2d::from_params(&params);
    // Widths enter the model squared; report them positive.
    fitted.width_x = fitted.width_x.abs();
    fitted.width_y = fitted.width_y.abs();
    fitted
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn synthetic_gaussian(h: usize, w: usize, g: &Gaussian2d) -> Array2<f32> {
        Array2::from_shape_fn((h, w), |(y, x)| g.eval(x as f64, y as f64) as f32)
    }

    #[test]
    fn test_moments_centroid_of_point_mass() {
        let mut patch = Array2::<f32>::zeros((9, 9));
        patch[[6, 2]] = 4.0;
        let est = moments(patch.view());
        assert!((est.cx - 2.0).abs() < 1e-9);
        assert!((est.cy - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_recovers_noiseless_gaussian() {
        let truth = Gaussian2d {
            height: 3.0,
            cx: 9.4,
            cy: 11.2,
            width_x: 2.3,
            width_y: 1.7,
        };
        let patch = synthetic_gaussian(21, 21, &truth);
        let fitted = fit_gaussian2d(patch.view(), &FitConfig::default());

        assert!((fitted.height - truth.height).abs() / truth.height < 1e-3);
        assert!((fitted.cx - truth.cx).abs() < 1e-3);
        assert!((fitted.cy - truth.cy).abs() < 1e-3);
        assert!((fitted.width_x - truth.width_x).abs() / truth.width_x < 1e-3);
        assert!((fitted.width_y - truth.width_y).abs() / truth.width_y < 1e-3);
    }

    #[test]
    fn test_zero_patch_is_degenerate() {
        let patch = Array2::<f32>::zeros((11, 11));
        let fitted = fit_gaussian2d(patch.view(), &FitConfig::default());
        assert!(fitted.is_degenerate());
        assert_eq!(fitted.width_x, 0.0);
        assert_eq!(fitted.width_y, 0.0);
    }
}
