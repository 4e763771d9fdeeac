use ndarray::Array2;

use crate::Frame;

/// Build a normalized 1-D Gaussian kernel. Radius covers 4 standard deviations.
fn gaussian_kernel(sigma: f64) -> Vec<f64> {
    let radius = (4.0 * sigma).ceil().max(1.0) as i64;
    let mut kernel: Vec<f64> = (-radius..=radius)
        .map(|i| (-((i * i) as f64) / (2.0 * sigma * sigma)).exp())
        .collect();
    let sum: f64 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }
    kernel
}

/// Separable Gaussian blur with nearest-edge replication at the boundary.
/// `sigma <= 0` returns the frame unchanged.
pub fn gaussian_blur(frame: &Frame, sigma: f64) -> Frame {
    let (height, width) = frame.dim();
    if sigma <= 0.0 || height == 0 || width == 0 {
        return frame.clone();
    }

    let kernel = gaussian_kernel(sigma);
    let radius = (kernel.len() / 2) as i64;

    // Horizontal pass
    let mut horizontal = Array2::<f64>::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let offset = k as i64 - radius;
                let src = (col as i64 + offset).clamp(0, width as i64 - 1) as usize;
                acc += weight * frame[[row, src]];
            }
            horizontal[[row, col]] = acc;
        }
    }

    // Vertical pass
    let mut blurred = Array2::<f64>::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            let mut acc = 0.0;
            for (k, weight) in kernel.iter().enumerate() {
                let offset = k as i64 - radius;
                let src = (row as i64 + offset).clamp(0, height as i64 - 1) as usize;
                acc += weight * horizontal[[src, col]];
            }
            blurred[[row, col]] = acc;
        }
    }

    blurred
}

/// Sliding-window maximum filter over a square window of side `size`.
///
/// Nearest-edge replication at the boundary; for a maximum this is the same
/// as truncating the window to the frame. Separable: rows first, then columns.
pub fn maximum_filter(frame: &Frame, size: usize) -> Frame {
    let (height, width) = frame.dim();
    if height == 0 || width == 0 || size <= 1 {
        return frame.clone();
    }
    let radius = size / 2;

    let mut rows_max = Array2::<f64>::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            let lo = col.saturating_sub(radius);
            let hi = (col + radius).min(width - 1);
            let mut best = f64::NEG_INFINITY;
            for c in lo..=hi {
                if frame[[row, c]] > best {
                    best = frame[[row, c]];
                }
            }
            rows_max[[row, col]] = best;
        }
    }

    let mut result = Array2::<f64>::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            let lo = row.saturating_sub(radius);
            let hi = (row + radius).min(height - 1);
            let mut best = f64::NEG_INFINITY;
            for r in lo..=hi {
                if rows_max[[r, col]] > best {
                    best = rows_max[[r, col]];
                }
            }
            result[[row, col]] = best;
        }
    }

    result
}

/// Window side for seed separation: `max(3, 2 * min_distance + 1)`.
pub fn window_size(min_distance: usize) -> usize {
    (2 * min_distance + 1).max(3)
}
