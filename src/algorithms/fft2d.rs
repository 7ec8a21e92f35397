//! Shared row-pass/column-pass 2D FFT helpers for the correlators.

use ndarray::{Array2, ArrayView2};
use rustfft::{num_complex::Complex, FftPlanner};

/// Forward 2D FFT of a real image. Unnormalized.
pub fn fft2d(input: ArrayView2<f32>) -> Array2<Complex<f32>> {
    let (height, width) = input.dim();
    let mut result = input.mapv(|v| Complex::new(v, 0.0));

    let mut planner = FftPlanner::new();

    let fft_row = planner.plan_fft_forward(width);
    for mut row in result.rows_mut() {
        let mut row_data: Vec<Complex<f32>> = row.to_vec();
        fft_row.process(&mut row_data);
        for (i, val) in row_data.iter().enumerate() {
            row[i] = *val;
        }
    }

    let fft_col = planner.plan_fft_forward(height);
    for mut col in result.columns_mut() {
        let mut col_data: Vec<Complex<f32>> = col.to_vec();
        fft_col.process(&mut col_data);
        for (i, val) in col_data.iter().enumerate() {
            col[i] = *val;
        }
    }

    result
}

/// Inverse 2D FFT, normalized by 1/(height*width).
pub fn ifft2d(input: &Array2<Complex<f32>>) -> Array2<Complex<f32>> {
    let (height, width) = input.dim();
    let mut result = input.clone();

    let mut planner = FftPlanner::new();

    let ifft_row = planner.plan_fft_inverse(width);
    for mut row in result.rows_mut() {
        let mut row_data: Vec<Complex<f32>> = row.to_vec();
        ifft_row.process(&mut row_data);
        for (i, val) in row_data.iter().enumerate() {
            row[i] = *val / width as f32;
        }
    }

    let ifft_col = planner.plan_fft_inverse(height);
    for mut col in result.columns_mut() {
        let mut col_data: Vec<Complex<f32>> = col.to_vec();
        ifft_col.process(&mut col_data);
        for (i, val) in col_data.iter().enumerate() {
            col[i] = *val / height as f32;
        }
    }

    result
}

/// Argmax of the correlation magnitude, returned as `(peak_y, peak_x)`.
pub fn find_correlation_peak(correlation: &Array2<Complex<f32>>) -> (usize, usize) {
    let (height, width) = correlation.dim();
    let mut max_val = f32::NEG_INFINITY;
    let mut peak_y = 0;
    let mut peak_x = 0;

    for y in 0..height {
        for x in 0..width {
            let magnitude = correlation[[y, x]].norm();
            if magnitude > max_val {
                max_val = magnitude;
                peak_y = y;
                peak_x = x;
            }
        }
    }

    (peak_y, peak_x)
}

/// Fold a peak coordinate into a signed displacement: anything past half
/// the axis extent wraps negative (toroidal convention, matching a
/// roll-based correction).
pub fn fold_displacement(peak: usize, extent: usize) -> i32 {
    if peak > extent / 2 {
        peak as i32 - extent as i32
    } else {
        peak as i32
    }
}
