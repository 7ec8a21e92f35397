//! Rotation-center sinusoid regression.
//!
//! A feature at horizontal offset r from the rotation axis traces
//! `x(theta) = A*sin(2*pi/360*(theta - phi)) + c` across projections; the
//! fitted `c` is the rotation-center x-estimate. Samples are `(angle_deg,
//! x)` pairs for marked/valid projections only; angles need not be sorted.

use crate::config::FitConfig;
use crate::fitting::least_squares;
use crate::state::SineParams;

fn initial_guess(angles: &[f64], values: &[f64]) -> SineParams {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let peak_angle = angles[values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
        .map(|(i, _)| i)
        .unwrap_or(0)];

    SineParams {
        amplitude: (max - min) / 2.0,
        // The sinusoid peaks at theta - phi = 90 degrees.
        phase: peak_angle - 90.0,
        offset: mean,
    }
}

/// Fit all three parameters `(A, phi, c)`.
///
/// Needs at least 3 samples; returns `None` on too-few samples or a fit
/// that never improved on a degenerate start.
pub fn fit_sinusoid(angles: &[f64], values: &[f64], cfg: &FitConfig) -> Option<SineParams> {
    if angles.len() != values.len() || angles.len() < 3 {
        return None;
    }
    let guess = initial_guess(angles, values);
    let mut params = [guess.amplitude, guess.phase, guess.offset];

    let residuals = |p: &[f64]| -> Vec<f64> {
        let model = SineParams {
            amplitude: p[0],
            phase: p[1],
            offset: p[2],
        };
        angles
            .iter()
            .zip(values)
            .map(|(&theta, &v)| model.eval(theta) - v)
            .collect()
    };

    let summary = least_squares(residuals, &mut params, cfg);
    tracing::trace!(
        iterations = summary.iterations,
        cost = summary.cost,
        converged = summary.converged,
        "sinusoid fit finished"
    );

    let fitted = SineParams {
        amplitude: params[0],
        phase: params[1],
        offset: params[2],
    };
    if fitted.amplitude.is_finite() && fitted.phase.is_finite() && fitted.offset.is_finite() {
        Some(fitted)
    } else {
        None
    }
}

/// Fit `(A, phi)` with the center component `c` held fixed at a previously
/// known value, aligning onto a theoretically consistent sinusoid instead
/// of refitting the axis.
pub fn fit_sinusoid_fixed_offset(
    angles: &[f64],
    values: &[f64],
    offset: f64,
    cfg: &FitConfig,
) -> Option<SineParams> {
    if angles.len() != values.len() || angles.len() < 2 {
        return None;
    }
    let guess = initial_guess(angles, values);
    let mut params = [guess.amplitude, guess.phase];

    let residuals = |p: &[f64]| -> Vec<f64> {
        let model = SineParams {
            amplitude: p[0],
            phase: p[1],
            offset,
        };
        angles
            .iter()
            .zip(values)
            .map(|(&theta, &v)| model.eval(theta) - v)
            .collect()
    };

    let summary = least_squares(residuals, &mut params, cfg);
    tracing::trace!(
        iterations = summary.iterations,
        cost = summary.cost,
        converged = summary.converged,
        "fixed-offset sinusoid fit finished"
    );

    if params[0].is_finite() && params[1].is_finite() {
        Some(SineParams {
            amplitude: params[0],
            phase: params[1],
            offset,
        })
    } else {
        None
    }
}
