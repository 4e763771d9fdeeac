use ndarray::Array2;

use crate::distance::{distance_only, distance_transform};
use crate::filters::{gaussian_blur, maximum_filter, window_size};
use crate::labeling::label_components;
use crate::watershed::watershed;
use crate::{Frame, Mask};

/// Parameters for local-maxima / Voronoi segmentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeakParams {
    /// Gaussian blur standard deviation; `<= 0` disables the blur
    pub sigma: f64,
    /// Minimum seed separation in pixels
    pub min_distance: usize,
    /// Absolute intensity floor for peak candidates
    pub min_intensity: f64,
}

impl Default for PeakParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            min_distance: 5,
            min_intensity: 0.0,
        }
    }
}

/// Parameters for background-threshold watershed segmentation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatershedParams {
    /// Gaussian blur standard deviation; `<= 0` disables the blur
    pub sigma: f64,
    /// Offset added to the background value for the foreground threshold
    pub margin: f64,
    /// Minimum seed separation in pixels
    pub min_distance: usize,
}

impl Default for WatershedParams {
    fn default() -> Self {
        Self {
            sigma: 2.0,
            margin: 0.0,
            min_distance: 5,
        }
    }
}

/// Segmentation backend. Both variants expose the same capability: turn one
/// fluorescence frame into a labeled cell mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segmenter {
    Peak(PeakParams),
    Watershed(WatershedParams),
}

impl Segmenter {
    /// Segment one frame. The peak backend ignores the background value;
    /// the watershed backend thresholds with it.
    pub fn segment(&self, frame: &Frame, background: f64) -> Mask {
        match self {
            Segmenter::Peak(p) => {
                segment_peaks(frame, p.sigma, p.min_distance, p.min_intensity)
            }
            Segmenter::Watershed(p) => {
                segment_watershed(frame, background, p.sigma, p.margin, p.min_distance)
            }
        }
    }

    /// Short backend name for logs and messages
    pub fn name(&self) -> &'static str {
        match self {
            Segmenter::Peak(_) => "peak",
            Segmenter::Watershed(_) => "watershed",
        }
    }
}

/// Segment a single frame using fluorescence local maxima + Voronoi
/// assignment. Returns a mask where 0 only appears when no peak exists;
/// otherwise every pixel belongs to the nearest seed's cell (labels 1..N).
pub fn segment_peaks(
    frame: &Frame,
    sigma: f64,
    min_distance: usize,
    min_intensity: f64,
) -> Mask {
    let (height, width) = frame.dim();
    if height == 0 || width == 0 {
        return Array2::zeros((height, width));
    }

    let blurred = gaussian_blur(frame, sigma);
    let max_filtered = maximum_filter(&blurred, window_size(min_distance));

    let mut peak_mask = Array2::from_elem((height, width), false);
    for row in 0..height {
        for col in 0..width {
            peak_mask[[row, col]] =
                blurred[[row, col]] >= max_filtered[[row, col]]
                    && blurred[[row, col]] > min_intensity;
        }
    }

    let (plateaus, n_plateaus) = label_components(&peak_mask);
    if n_plateaus == 0 {
        return Array2::zeros((height, width));
    }

    // One seed per plateau: brightest pixel, first in row-major order on ties
    let mut seed_value = vec![f64::NEG_INFINITY; n_plateaus as usize];
    let mut seed_pos = vec![[0usize, 0usize]; n_plateaus as usize];
    for row in 0..height {
        for col in 0..width {
            let plateau = plateaus[[row, col]];
            if plateau == 0 {
                continue;
            }
            let i = (plateau - 1) as usize;
            if blurred[[row, col]] > seed_value[i] {
                seed_value[i] = blurred[[row, col]];
                seed_pos[i] = [row, col];
            }
        }
    }

    let mut seed_label = Array2::<u32>::zeros((height, width));
    let mut seeds = Array2::from_elem((height, width), false);
    for (i, &[row, col]) in seed_pos.iter().enumerate() {
        seed_label[[row, col]] = i as u32 + 1;
        seeds[[row, col]] = true;
    }

    // Voronoi tessellation: every pixel takes its nearest seed's label
    let (_, nearest) = distance_transform(&seeds);
    let mut labels = Array2::<u32>::zeros((height, width));
    for row in 0..height {
        for col in 0..width {
            let [sr, sc] = nearest[[row, col]];
            labels[[row, col]] = seed_label[[sr, sc]];
        }
    }
    labels
}

/// Segment a single frame by thresholding against the background, then
/// running a marker-controlled watershed on the foreground distance map.
/// Returns a mask with 0 outside the foreground and labels 1..N inside.
pub fn segment_watershed(
    frame: &Frame,
    background: f64,
    sigma: f64,
    margin: f64,
    min_distance: usize,
) -> Mask {
    let (height, width) = frame.dim();
    if height == 0 || width == 0 {
        return Array2::zeros((height, width));
    }

    let blurred = gaussian_blur(frame, sigma);

    let mut foreground = Array2::from_elem((height, width), false);
    let mut any_foreground = false;
    for row in 0..height {
        for col in 0..width {
            let fg = blurred[[row, col]] > background + margin;
            foreground[[row, col]] = fg;
            any_foreground |= fg;
        }
    }
    if !any_foreground {
        return Array2::zeros((height, width));
    }

    // Distance from each foreground pixel to the nearest background pixel
    let background_mask = foreground.mapv(|fg| !fg);
    let dist = distance_only(&background_mask);

    let max_dist = maximum_filter(&dist, window_size(min_distance));
    let mut seed_mask = Array2::from_elem((height, width), false);
    for row in 0..height {
        for col in 0..width {
            seed_mask[[row, col]] =
                dist[[row, col]] >= max_dist[[row, col]] && dist[[row, col]] > 0.5;
        }
    }

    let (markers, n_seeds) = label_components(&seed_mask);
    if n_seeds == 0 {
        return Array2::zeros((height, width));
    }

    let negated = dist.mapv(|d| -d);
    watershed(&negated, &markers, &foreground)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_block(
        height: usize,
        width: usize,
        top: usize,
        left: usize,
        side: usize,
        value: f64,
    ) -> Frame {
        let mut frame = Array2::<f64>::zeros((height, width));
        for row in top..top + side {
            for col in left..left + side {
                frame[[row, col]] = value;
            }
        }
        frame
    }

    #[test]
    fn peak_single_maximum_labels_whole_frame() {
        let mut frame = Array2::<f64>::zeros((5, 5));
        frame[[2, 2]] = 100.0;
        let mask = segment_peaks(&frame, 0.0, 1, 0.0);
        assert_eq!(mask.dim(), (5, 5));
        assert!(mask.iter().all(|&v| v == 1));
    }

    #[test]
    fn peak_flat_zero_frame_yields_empty_mask() {
        let frame = Array2::<f64>::zeros((6, 6));
        let mask = segment_peaks(&frame, 0.0, 1, 0.0);
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn peak_two_maxima_partition_the_frame() {
        let mut frame = Array2::<f64>::zeros((5, 9));
        frame[[2, 1]] = 50.0;
        frame[[2, 7]] = 50.0;
        let mask = segment_peaks(&frame, 0.0, 1, 0.0);
        let labels: std::collections::BTreeSet<u32> = mask.iter().copied().collect();
        assert_eq!(labels.into_iter().collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(mask[[2, 0]], 1);
        assert_eq!(mask[[2, 8]], 2);
        // Equidistant middle column goes to the leftmost seed
        assert_eq!(mask[[2, 4]], 1);
    }

    #[test]
    fn peak_min_intensity_suppresses_dim_maxima() {
        let mut frame = Array2::<f64>::zeros((5, 5));
        frame[[2, 2]] = 3.0;
        let mask = segment_peaks(&frame, 0.0, 1, 10.0);
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn peak_zero_sized_frame_degenerates() {
        let frame = Array2::<f64>::zeros((0, 0));
        let mask = segment_peaks(&frame, 2.0, 5, 0.0);
        assert_eq!(mask.dim(), (0, 0));
    }

    #[test]
    fn watershed_block_is_labeled_and_background_stays_zero() {
        let frame = frame_with_block(7, 7, 2, 2, 3, 10.0);
        let mask = segment_watershed(&frame, 0.0, 0.0, 0.0, 1);
        for row in 0..7 {
            for col in 0..7 {
                let inside = (2..5).contains(&row) && (2..5).contains(&col);
                let expected = if inside { 1 } else { 0 };
                assert_eq!(mask[[row, col]], expected, "at ({row}, {col})");
            }
        }
    }

    #[test]
    fn watershed_empty_foreground_yields_empty_mask() {
        let frame = Array2::<f64>::from_elem((6, 6), 1.0);
        let mask = segment_watershed(&frame, 5.0, 0.0, 0.0, 1);
        assert!(mask.iter().all(|&v| v == 0));
    }

    #[test]
    fn watershed_thin_line_collapses_to_one_cell() {
        // A one-pixel-wide line is its own distance ridge: every line pixel
        // is a seed candidate and they merge into a single marker.
        let mut frame = Array2::<f64>::zeros((5, 5));
        for col in 0..5 {
            frame[[2, col]] = 10.0;
        }
        let mask = segment_watershed(&frame, 0.0, 0.0, 0.0, 1);
        for col in 0..5 {
            assert_eq!(mask[[2, col]], 1);
        }
        assert_eq!(mask[[0, 0]], 0);
        assert_eq!(mask[[1, 2]], 0);
    }

    #[test]
    fn watershed_two_blobs_get_distinct_labels() {
        let mut frame = frame_with_block(9, 17, 3, 2, 3, 10.0);
        for row in 3..6 {
            for col in 12..15 {
                frame[[row, col]] = 10.0;
            }
        }
        let mask = segment_watershed(&frame, 0.0, 0.0, 0.0, 1);
        assert_eq!(mask[[4, 3]], 1);
        assert_eq!(mask[[4, 13]], 2);
        assert_eq!(mask[[0, 0]], 0);
    }

    #[test]
    fn segmenter_enum_dispatches_both_backends() {
        let frame = frame_with_block(7, 7, 2, 2, 3, 10.0);
        let peak = Segmenter::Peak(PeakParams {
            sigma: 0.0,
            min_distance: 1,
            min_intensity: 0.0,
        });
        let shed = Segmenter::Watershed(WatershedParams {
            sigma: 0.0,
            margin: 0.0,
            min_distance: 1,
        });
        assert_eq!(peak.segment(&frame, 0.0).dim(), (7, 7));
        let mask = shed.segment(&frame, 0.0);
        assert_eq!(mask[[3, 3]], 1);
        assert_eq!(peak.name(), "peak");
        assert_eq!(shed.name(), "watershed");
    }

    #[test]
    fn segmentation_is_deterministic() {
        let mut frame = Array2::<f64>::zeros((12, 12));
        for (i, v) in frame.iter_mut().enumerate() {
            // Fixed pseudo-random texture
            *v = ((i as u64 * 2654435761) % 97) as f64;
        }
        let a = segment_peaks(&frame, 1.0, 2, 0.0);
        let b = segment_peaks(&frame, 1.0, 2, 0.0);
        assert_eq!(a, b);
        let c = segment_watershed(&frame, 40.0, 1.0, 0.0, 2);
        let d = segment_watershed(&frame, 40.0, 1.0, 0.0, 2);
        assert_eq!(c, d);
    }
}
