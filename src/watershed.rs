use std::cmp::Reverse;
use std::collections::BinaryHeap;

use ndarray::Array2;
use ordered_float::OrderedFloat;

use crate::labeling::neighbors4;
use crate::{Frame, Mask};

/// Marker-controlled watershed flooding restricted to a foreground mask.
///
/// Basins grow from the marker pixels outward in ascending `priority` order
/// (lower value floods first), so passing a negated distance map makes ridges
/// flood before their surroundings. Equal priorities are resolved by heap
/// insertion order, which makes the result deterministic for identical input.
/// Pixels outside `mask` keep label 0.
pub fn watershed(priority: &Frame, markers: &Mask, mask: &Array2<bool>) -> Mask {
    let (height, width) = priority.dim();
    let mut labels = Array2::<u32>::zeros((height, width));
    let mut heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64, usize, usize)>> = BinaryHeap::new();
    let mut seq = 0u64;

    for row in 0..height {
        for col in 0..width {
            if markers[[row, col]] != 0 && mask[[row, col]] {
                labels[[row, col]] = markers[[row, col]];
                heap.push(Reverse((OrderedFloat(priority[[row, col]]), seq, row, col)));
                seq += 1;
            }
        }
    }

    while let Some(Reverse((_, _, row, col))) = heap.pop() {
        let label = labels[[row, col]];
        for (nr, nc) in neighbors4(row, col, height, width) {
            if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                labels[[nr, nc]] = label;
                heap.push(Reverse((OrderedFloat(priority[[nr, nc]]), seq, nr, nc)));
                seq += 1;
            }
        }
    }

    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_marker_floods_entire_foreground() {
        let priority = Array2::<f64>::zeros((4, 4));
        let mut markers = Array2::<u32>::zeros((4, 4));
        markers[[1, 1]] = 1;
        let mask = Array2::from_elem((4, 4), true);
        let labels = watershed(&priority, &markers, &mask);
        assert!(labels.iter().all(|&v| v == 1));
    }

    #[test]
    fn flooding_respects_the_foreground_mask() {
        let priority = Array2::<f64>::zeros((3, 5));
        let mut markers = Array2::<u32>::zeros((3, 5));
        markers[[1, 1]] = 1;
        let mut mask = Array2::from_elem((3, 5), true);
        for row in 0..3 {
            mask[[row, 3]] = false;
        }
        let labels = watershed(&priority, &markers, &mask);
        for row in 0..3 {
            assert_eq!(labels[[row, 3]], 0);
            // The wall at column 3 disconnects column 4
            assert_eq!(labels[[row, 4]], 0);
            assert_eq!(labels[[row, 0]], 1);
        }
    }

    #[test]
    fn two_markers_split_a_corridor() {
        // Lower priority floods first; the middle column has the highest
        // priority so each marker claims its own half before meeting there.
        let mut priority = Array2::<f64>::zeros((1, 7));
        priority[[0, 3]] = 5.0;
        let mut markers = Array2::<u32>::zeros((1, 7));
        markers[[0, 0]] = 1;
        markers[[0, 6]] = 2;
        let mask = Array2::from_elem((1, 7), true);
        let labels = watershed(&priority, &markers, &mask);
        assert_eq!(labels[[0, 1]], 1);
        assert_eq!(labels[[0, 2]], 1);
        assert_eq!(labels[[0, 4]], 2);
        assert_eq!(labels[[0, 5]], 2);
    }

    #[test]
    fn flooding_is_deterministic() {
        let mut priority = Array2::<f64>::zeros((5, 5));
        priority[[2, 2]] = 1.0;
        let mut markers = Array2::<u32>::zeros((5, 5));
        markers[[0, 0]] = 1;
        markers[[4, 4]] = 2;
        let mask = Array2::from_elem((5, 5), true);
        let first = watershed(&priority, &markers, &mask);
        let second = watershed(&priority, &markers, &mask);
        assert_eq!(first, second);
    }
}
