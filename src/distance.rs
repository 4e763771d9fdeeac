use ndarray::Array2;

use crate::Frame;

/// Exact Euclidean distance transform with nearest-feature indices.
///
/// For every pixel, finds the closest `true` pixel of `features` and returns
/// both the Euclidean distance and that pixel's (row, col). Pixels that are
/// themselves features get distance 0 and point at themselves. If the mask
/// holds no feature at all, distances are infinite and the indices are
/// meaningless (callers guard against that case).
///
/// Two-phase Felzenszwalb/Huttenlocher scheme: a per-column scan finds the
/// nearest feature row within each column, then a per-row lower envelope of
/// parabolas minimizes over columns. Ties are deterministic: the uppermost
/// row wins within a column, the leftmost column wins across columns.
pub fn distance_transform(features: &Array2<bool>) -> (Frame, Array2<[usize; 2]>) {
    let (height, width) = features.dim();
    let mut dist = Array2::<f64>::zeros((height, width));
    let mut nearest = Array2::<[usize; 2]>::from_elem((height, width), [0, 0]);
    if height == 0 || width == 0 {
        return (dist, nearest);
    }

    // Phase 1: nearest feature row within each column.
    let mut col_dist = Array2::<f64>::from_elem((height, width), f64::INFINITY);
    let mut col_src = Array2::<usize>::zeros((height, width));
    for col in 0..width {
        let mut last: Option<usize> = None;
        for row in 0..height {
            if features[[row, col]] {
                last = Some(row);
            }
            if let Some(feature_row) = last {
                col_dist[[row, col]] = (row - feature_row) as f64;
                col_src[[row, col]] = feature_row;
            }
        }
        last = None;
        for row in (0..height).rev() {
            if features[[row, col]] {
                last = Some(row);
            }
            if let Some(feature_row) = last {
                // Strict improvement keeps the uppermost row on ties
                let d = (feature_row - row) as f64;
                if d < col_dist[[row, col]] {
                    col_dist[[row, col]] = d;
                    col_src[[row, col]] = feature_row;
                }
            }
        }
    }

    // Phase 2: 1-D squared-distance envelope along each row.
    let mut f = vec![0.0f64; width];
    for row in 0..height {
        for col in 0..width {
            let d = col_dist[[row, col]];
            f[col] = if d.is_finite() { d * d } else { f64::INFINITY };
        }
        let (squared, argmin) = envelope_1d(&f);
        for col in 0..width {
            dist[[row, col]] = squared[col].sqrt();
            let src_col = argmin[col];
            nearest[[row, col]] = [col_src[[row, src_col]], src_col];
        }
    }

    (dist, nearest)
}

/// Distance-only variant for callers that do not need the indices.
pub fn distance_only(features: &Array2<bool>) -> Frame {
    distance_transform(features).0
}

/// 1-D squared distance transform: `d[p] = min_q (p - q)^2 + f[q]`, plus the
/// minimizing q per position. Positions with `f = inf` contribute no parabola.
fn envelope_1d(f: &[f64]) -> (Vec<f64>, Vec<usize>) {
    let n = f.len();
    let mut d = vec![f64::INFINITY; n];
    let mut argmin = vec![0usize; n];
    // Hull of parabola vertices and the boundaries between them
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    let mut started = false;

    for q in 0..n {
        if !f[q].is_finite() {
            continue;
        }
        if !started {
            v[0] = q;
            z[0] = f64::NEG_INFINITY;
            z[1] = f64::INFINITY;
            started = true;
            continue;
        }
        loop {
            let p = v[k];
            let s = ((f[q] + (q * q) as f64) - (f[p] + (p * p) as f64))
                / (2.0 * (q as f64 - p as f64));
            if s <= z[k] {
                // z[0] is -inf, so k never underflows
                k -= 1;
            } else {
                k += 1;
                v[k] = q;
                z[k] = s;
                z[k + 1] = f64::INFINITY;
                break;
            }
        }
    }

    if !started {
        return (d, argmin);
    }

    let mut j = 0usize;
    for p in 0..n {
        // Strict comparison keeps the leftmost parabola at exact boundaries
        while z[j + 1] < p as f64 {
            j += 1;
        }
        let q = v[j];
        let delta = p as f64 - q as f64;
        d[p] = delta * delta + f[q];
        argmin[p] = q;
    }

    (d, argmin)
}
