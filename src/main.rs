use std::path::{Path, PathBuf};
use std::time::Instant;
use clap::{Parser, ValueEnum};

use cell_fluor_rust_lib::{
    run_position, BackendChoice, Config, DirectoryFrameSource, PngMaskSink, Result,
    write_records_csv,
};

/// Command-line arguments
#[derive(Parser, Debug)]
#[clap(author, version, about = "CellFluor - Per-Cell Fluorescence Quantification")]
struct Args {
    /// Path to the input position directory (one subdirectory per crop)
    #[clap(short, long)]
    input: Option<String>,

    /// Path to output directory
    #[clap(short, long)]
    output: Option<String>,

    /// Path to configuration file
    #[clap(short, long, default_value = "config.toml")]
    config: String,

    /// Segmentation backend (overwrites config)
    #[clap(short, long)]
    backend: Option<BackendArg>,

    /// Disable the parallel worker pool
    #[clap(long)]
    sequential: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendArg {
    Peak,
    Watershed,
}

/// Main function
fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Load configuration; a missing file falls back to defaults so the CLI
    // works with just --input/--output
    let mut config = if Path::new(&args.config).is_file() {
        Config::from_file(&args.config)?
    } else {
        Config::default()
    };

    // Override config with command-line arguments
    if let Some(input) = args.input {
        config.input_path = input;
    }

    if let Some(output) = args.output {
        config.output_base_dir = output;
    }

    if let Some(backend) = args.backend {
        config.backend = match backend {
            BackendArg::Peak => BackendChoice::Peak,
            BackendArg::Watershed => BackendChoice::Watershed,
        };
    }

    if args.sequential {
        config.use_parallel = false;
    }

    // Validate configuration
    config.validate()?;

    // Start timing
    let start_time = Instant::now();

    let segmenter = config.segmenter();
    println!(
        "Segmenting {} with the {} backend",
        config.input_path,
        segmenter.name()
    );

    let source = DirectoryFrameSource::open(&config.input_path)?;
    let output_base = PathBuf::from(&config.output_base_dir);
    let mut sink = PngMaskSink::new(&output_base);

    let progress = |fraction: f64, message: &str| {
        println!("[{:5.1}%] {}", fraction * 100.0, message);
    };
    let records = run_position(
        &source,
        &mut sink,
        &segmenter,
        config.use_parallel,
        Some(&progress),
    )?;

    let csv_path = output_base.join("cells.csv");
    write_records_csv(&records, &csv_path)?;
    println!("Wrote {} records to {}", records.len(), csv_path.display());

    // Report elapsed time
    let elapsed = start_time.elapsed();
    println!("Processing completed in {:.2} seconds", elapsed.as_secs_f64());

    Ok(())
}
