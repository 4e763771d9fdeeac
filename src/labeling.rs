use std::collections::VecDeque;

use ndarray::Array2;

use crate::Mask;

/// Label 4-connected components of a boolean mask.
///
/// Labels are assigned in row-major order of the first pixel reached, so the
/// result is contiguous from 1 and deterministic for identical input. Returns
/// the label image and the number of components.
pub fn label_components(mask: &Array2<bool>) -> (Mask, u32) {
    let (height, width) = mask.dim();
    let mut labels = Array2::<u32>::zeros((height, width));
    let mut next_label = 0u32;
    let mut queue: VecDeque<(usize, usize)> = VecDeque::new();

    for row in 0..height {
        for col in 0..width {
            if !mask[[row, col]] || labels[[row, col]] != 0 {
                continue;
            }
            next_label += 1;
            labels[[row, col]] = next_label;
            queue.push_back((row, col));

            while let Some((r, c)) = queue.pop_front() {
                for (nr, nc) in neighbors4(r, c, height, width) {
                    if mask[[nr, nc]] && labels[[nr, nc]] == 0 {
                        labels[[nr, nc]] = next_label;
                        queue.push_back((nr, nc));
                    }
                }
            }
        }
    }

    (labels, next_label)
}

/// 4-neighborhood of (row, col) clipped to the frame bounds.
pub fn neighbors4(
    row: usize,
    col: usize,
    height: usize,
    width: usize,
) -> impl Iterator<Item = (usize, usize)> {
    const OFFSETS: [(i64, i64); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
    OFFSETS.into_iter().filter_map(move |(dr, dc)| {
        let nr = row as i64 + dr;
        let nc = col as i64 + dc;
        if nr >= 0 && nc >= 0 && (nr as usize) < height && (nc as usize) < width {
            Some((nr as usize, nc as usize))
        } else {
            None
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    #[test]
    fn diagonal_pixels_are_separate_components() {
        let mask = array![
            [true, false, false],
            [false, true, false],
            [false, false, false]
        ];
        let (labels, count) = label_components(&mask);
        assert_eq!(count, 2);
        assert_eq!(labels[[0, 0]], 1);
        assert_eq!(labels[[1, 1]], 2);
    }

    #[test]
    fn connected_plateau_gets_one_label() {
        let mask = array![
            [false, true, true],
            [false, true, false],
            [true, true, false]
        ];
        let (labels, count) = label_components(&mask);
        assert_eq!(count, 1);
        for row in 0..3 {
            for col in 0..3 {
                let expected = if mask[[row, col]] { 1 } else { 0 };
                assert_eq!(labels[[row, col]], expected);
            }
        }
    }

    #[test]
    fn labels_follow_row_major_discovery_order() {
        let mask = array![
            [false, true, false, true],
            [false, false, false, true]
        ];
        let (labels, count) = label_components(&mask);
        assert_eq!(count, 2);
        assert_eq!(labels[[0, 1]], 1);
        assert_eq!(labels[[0, 3]], 2);
        assert_eq!(labels[[1, 3]], 2);
    }

    #[test]
    fn empty_mask_has_zero_components() {
        let mask = Array2::from_elem((4, 4), false);
        let (labels, count) = label_components(&mask);
        assert_eq!(count, 0);
        assert!(labels.iter().all(|&v| v == 0));
    }
}
