use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use csv::Writer;
use image::{ImageBuffer, Luma};
use ndarray::Array2;

use crate::errors::{CellFluorError, Result};
use crate::pipeline::{FrameSource, MaskSink};
use crate::quantify::CellRecord;
use crate::{Frame, Mask};

/// Frame source backed by a directory of 16-bit grayscale PNGs.
///
/// Layout: `<root>/<crop_id>/*.png`, one subdirectory per crop, frames in
/// filename order (t = sorted index). An optional `<root>/background.csv`
/// with header `crop,t,background` supplies per-frame background values;
/// frames without an entry fall back to the frame median in the pipeline.
pub struct DirectoryFrameSource {
    frames: HashMap<String, Vec<PathBuf>>,
    backgrounds: HashMap<(String, usize), f64>,
}

impl DirectoryFrameSource {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(CellFluorError::InvalidPath(root));
        }

        let mut frames: HashMap<String, Vec<PathBuf>> = HashMap::new();
        for entry in fs::read_dir(&root)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }
            let crop_id = match path.file_name().and_then(|s| s.to_str()) {
                Some(name) => name.to_string(),
                None => continue,
            };
            let mut files = png_files_in_dir(&path)?;
            files.sort();
            if !files.is_empty() {
                frames.insert(crop_id, files);
            }
        }

        if frames.is_empty() {
            return Err(CellFluorError::DataSource(format!(
                "no crop directories with PNG frames found under {}",
                root.display()
            )));
        }

        let backgrounds = match read_background_table(&root.join("background.csv")) {
            Ok(table) => table,
            Err(CellFluorError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                HashMap::new()
            }
            Err(e) => return Err(e),
        };

        Ok(Self {
            frames,
            backgrounds,
        })
    }
}

impl FrameSource for DirectoryFrameSource {
    fn crop_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.frames.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    fn num_timepoints(&self, crop_id: &str) -> Result<usize> {
        self.frames
            .get(crop_id)
            .map(|files| files.len())
            .ok_or_else(|| CellFluorError::DataSource(format!("unknown crop {crop_id}")))
    }

    fn frame(&self, crop_id: &str, t: usize) -> Result<Frame> {
        let files = self
            .frames
            .get(crop_id)
            .ok_or_else(|| CellFluorError::DataSource(format!("unknown crop {crop_id}")))?;
        let path = files.get(t).ok_or_else(|| {
            CellFluorError::DataSource(format!("crop {crop_id} has no timepoint {t}"))
        })?;
        load_frame(path)
    }

    fn background(&self, crop_id: &str, t: usize) -> Result<Option<f64>> {
        Ok(self
            .backgrounds
            .get(&(crop_id.to_string(), t))
            .copied())
    }
}

/// Collect the PNG files directly inside a directory
fn png_files_in_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            if let Some(ext) = path.extension() {
                if ext.to_ascii_lowercase() == "png" {
                    files.push(path);
                }
            }
        }
    }
    Ok(files)
}

/// Load a grayscale PNG as a float frame (16-bit depth preserved)
pub fn load_frame(path: &Path) -> Result<Frame> {
    let img = image::open(path)?;
    let gray = img.to_luma16();
    let (width, height) = gray.dimensions();
    let mut frame = Array2::<f64>::zeros((height as usize, width as usize));
    for (x, y, pixel) in gray.enumerate_pixels() {
        frame[[y as usize, x as usize]] = pixel[0] as f64;
    }
    Ok(frame)
}

/// Parse `crop,t,background` rows into a lookup table. Quoting and escaping
/// follow standard CSV rules, so tables written by other tools parse too.
fn read_background_table(path: &Path) -> Result<HashMap<(String, usize), f64>> {
    // File::open first so a missing table surfaces as io::NotFound
    let file = fs::File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(file);

    let mut table = HashMap::new();
    for (row_no, result) in reader.records().enumerate() {
        // Header is line 1
        let line_no = row_no + 2;
        let record = result.map_err(|e| {
            CellFluorError::DataSource(format!(
                "malformed background table line {line_no}: {e}"
            ))
        })?;
        if record.len() != 3 {
            return Err(CellFluorError::DataSource(format!(
                "malformed background table line {line_no}: expected crop,t,background"
            )));
        }
        let crop = record[0].trim().to_string();
        let t: usize = record[1].trim().parse().map_err(|_| {
            CellFluorError::DataSource(format!("invalid timepoint on line {line_no}"))
        })?;
        let background: f64 = record[2].trim().parse().map_err(|_| {
            CellFluorError::DataSource(format!("invalid background on line {line_no}"))
        })?;
        table.insert((crop, t), background);
    }
    Ok(table)
}

/// Mask sink writing one 16-bit grayscale PNG per (crop, t) under
/// `<root>/masks/<crop_id>/t0000.png`. Label values map directly to pixel
/// values, so 0 stays black background.
pub struct PngMaskSink {
    root: PathBuf,
}

impl PngMaskSink {
    pub fn new<P: AsRef<Path>>(output_base: P) -> Self {
        Self {
            root: output_base.as_ref().join("masks"),
        }
    }
}

impl MaskSink for PngMaskSink {
    fn write_mask(&mut self, crop_id: &str, t: usize, mask: &Mask) -> Result<()> {
        let dir = self.root.join(crop_id);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("t{t:04}.png"));

        let (height, width) = mask.dim();
        let mut img: ImageBuffer<Luma<u16>, Vec<u16>> =
            ImageBuffer::new(width as u32, height as u32);
        for row in 0..height {
            for col in 0..width {
                let label = mask[[row, col]];
                if label > u16::MAX as u32 {
                    return Err(CellFluorError::InvalidInput(format!(
                        "mask label {label} exceeds 16-bit PNG depth for crop {crop_id}, t {t}"
                    )));
                }
                img.put_pixel(col as u32, row as u32, Luma([label as u16]));
            }
        }
        img.save_with_format(&path, image::ImageFormat::Png)?;
        Ok(())
    }
}

/// Write cell records as CSV with the fixed field order
/// `t,crop,cell,total_fluorescence,cell_area,background`.
pub fn write_records_csv<P: AsRef<Path>>(records: &[CellRecord], path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    write_records(records, file)
}

/// Writer-generic variant of [`write_records_csv`]
pub fn write_records<W: Write>(records: &[CellRecord], writer: W) -> Result<()> {
    let mut csv_writer = Writer::from_writer(writer);

    csv_writer.write_record([
        "t",
        "crop",
        "cell",
        "total_fluorescence",
        "cell_area",
        "background",
    ])?;

    for record in records {
        csv_writer.write_record([
            record.t.to_string(),
            record.crop.clone(),
            record.cell.to_string(),
            format_float(record.total_fluorescence),
            record.cell_area.to_string(),
            format_float(record.background),
        ])?;
    }

    csv_writer
        .flush()
        .map_err(|e| CellFluorError::CsvOutput(csv::Error::from(e)))?;
    Ok(())
}

/// Plain decimal formatting: integers stay integral, fractions keep full
/// precision so the CSV round-trips
fn format_float(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}
