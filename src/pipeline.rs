use rayon::prelude::*;

use crate::errors::Result;
use crate::quantify::{median_intensity, quantify, CellRecord};
use crate::segment::Segmenter;
use crate::{Frame, Mask};

/// Supplies fluorescence frames for one imaging position. Implementations
/// own the storage layout; the pipeline only sees 2-D frames and scalars.
pub trait FrameSource {
    /// Crop identifiers, in the order they should be processed (ascending)
    fn crop_ids(&self) -> Result<Vec<String>>;

    /// Number of timepoints recorded for a crop
    fn num_timepoints(&self, crop_id: &str) -> Result<usize>;

    /// The fluorescence frame for (crop, t)
    fn frame(&self, crop_id: &str, t: usize) -> Result<Frame>;

    /// Background value for (crop, t), or `None` when the source has no
    /// background table (the pipeline then falls back to the frame median)
    fn background(&self, crop_id: &str, t: usize) -> Result<Option<f64>>;
}

/// Receives one mask per (crop, t). Implementations handle durable storage.
pub trait MaskSink {
    fn write_mask(&mut self, crop_id: &str, t: usize, mask: &Mask) -> Result<()>;
}

/// Fire-and-forget progress callback: fraction in [0, 1] plus a message.
pub type ProgressCallback<'a> = &'a (dyn Fn(f64, &str) + Sync);

/// Segment and quantify every (crop, t) unit of a position.
///
/// Crops are visited in ascending id order and timepoints in ascending order
/// within each crop, so the returned records are ordered by (crop, t, cell).
/// With `use_parallel`, the timepoints of a crop are processed on the rayon
/// pool; masks and records are still committed sequentially in order, so the
/// output is identical in both modes. Progress fires after every completed
/// unit and once more with 1.0 at the end.
pub fn run_position<S, K>(
    source: &S,
    sink: &mut K,
    segmenter: &Segmenter,
    use_parallel: bool,
    on_progress: Option<ProgressCallback>,
) -> Result<Vec<CellRecord>>
where
    S: FrameSource + Sync,
    K: MaskSink,
{
    let crop_ids = source.crop_ids()?;
    let n_crops = crop_ids.len();

    let mut timepoints = Vec::with_capacity(n_crops);
    for crop_id in &crop_ids {
        timepoints.push(source.num_timepoints(crop_id)?);
    }
    let total_work: usize = timepoints.iter().sum();

    let mut records = Vec::new();
    let mut done = 0usize;

    for (crop_idx, crop_id) in crop_ids.iter().enumerate() {
        let n_times = timepoints[crop_idx];

        let process_one = |t: usize| -> Result<(Mask, Vec<CellRecord>)> {
            let frame = source.frame(crop_id, t)?;
            let background = match source.background(crop_id, t)? {
                Some(value) => value,
                None => median_intensity(&frame)?,
            };
            let mask = segmenter.segment(&frame, background);
            let cell_records = quantify(&frame, &mask, background, t, crop_id)?;
            Ok((mask, cell_records))
        };

        // Each (crop, t) unit is a pure function of its inputs, so the
        // timepoints of a crop can run on the thread pool. collect()
        // preserves the timepoint order either way.
        let results: Vec<(Mask, Vec<CellRecord>)> = if use_parallel {
            (0..n_times)
                .into_par_iter()
                .map(process_one)
                .collect::<Result<Vec<_>>>()?
        } else {
            (0..n_times).map(process_one).collect::<Result<Vec<_>>>()?
        };

        for (t, (mask, cell_records)) in results.into_iter().enumerate() {
            sink.write_mask(crop_id, t, &mask)?;
            records.extend(cell_records);
            done += 1;
            if let Some(progress) = on_progress {
                if total_work > 0 {
                    progress(
                        done as f64 / total_work as f64,
                        &format!(
                            "Crop {}/{}, frame {}/{}",
                            crop_idx + 1,
                            n_crops,
                            t + 1,
                            n_times
                        ),
                    );
                }
            }
        }
    }

    if let Some(progress) = on_progress {
        progress(1.0, "Done");
    }

    Ok(records)
}
