// src/lib.rs - Library interface for CellFluor

pub mod config;
pub mod distance;
pub mod errors;
pub mod filters;
pub mod frame_io;
pub mod labeling;
pub mod pipeline;
pub mod quantify;
pub mod segment;
pub mod watershed;

/// One 2-D fluorescence intensity frame (row-major, height x width)
pub type Frame = ndarray::Array2<f64>;

/// Labeled cell mask matching a frame's shape: 0 = background, 1..N = cells
pub type Mask = ndarray::Array2<u32>;

// Re-export commonly used types and functions
pub use errors::{CellFluorError, Result};
pub use config::{BackendChoice, Config};
pub use pipeline::{run_position, FrameSource, MaskSink, ProgressCallback};
pub use quantify::{median_intensity, quantify, CellRecord};
pub use segment::{segment_peaks, segment_watershed, PeakParams, Segmenter, WatershedParams};

// Re-export numeric kernels
pub use distance::{distance_only, distance_transform};
pub use filters::{gaussian_blur, maximum_filter};
pub use labeling::label_components;
pub use watershed::watershed;

// Re-export disk collaborators
pub use frame_io::{
    load_frame, write_records, write_records_csv, DirectoryFrameSource, PngMaskSink,
};
