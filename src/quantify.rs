use std::collections::BTreeMap;

use crate::errors::{CellFluorError, Result};
use crate::{Frame, Mask};

/// Per-cell measurement for one (timepoint, crop, label). Immutable once
/// emitted; one record per nonzero label in the mask.
#[derive(Debug, Clone, PartialEq)]
pub struct CellRecord {
    pub t: usize,
    pub crop: String,
    pub cell: u32,
    pub total_fluorescence: f64,
    pub cell_area: usize,
    pub background: f64,
}

/// Aggregate per-label fluorescence statistics for one frame/mask pair.
///
/// Returns one record per distinct nonzero label, in ascending label order.
/// Label 0 is background and never produces a record; a mask without nonzero
/// labels yields an empty vector.
pub fn quantify(
    frame: &Frame,
    mask: &Mask,
    background: f64,
    t: usize,
    crop_id: &str,
) -> Result<Vec<CellRecord>> {
    if frame.dim() != mask.dim() {
        return Err(CellFluorError::InvalidInput(format!(
            "mask shape {:?} does not match frame shape {:?}",
            mask.dim(),
            frame.dim()
        )));
    }

    let mut totals: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (&label, &value) in mask.iter().zip(frame.iter()) {
        if label == 0 {
            continue;
        }
        let entry = totals.entry(label).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    Ok(totals
        .into_iter()
        .map(|(cell, (total_fluorescence, cell_area))| CellRecord {
            t,
            crop: crop_id.to_string(),
            cell,
            total_fluorescence,
            cell_area,
            background,
        })
        .collect())
}

/// Median pixel intensity, used as the background fallback when the frame
/// source has no background table. Errors on an empty frame since no
/// meaningful background exists.
pub fn median_intensity(frame: &Frame) -> Result<f64> {
    if frame.is_empty() {
        return Err(CellFluorError::InvalidInput(
            "cannot compute the background of an empty frame".to_string(),
        ));
    }
    let mut values: Vec<f64> = frame.iter().copied().collect();
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 1 {
        Ok(values[n / 2])
    } else {
        Ok((values[n / 2 - 1] + values[n / 2]) / 2.0)
    }
}
