use anyhow::{Context, Result};
use clap::Parser;
use qgis_nuscenes::{
    convert_path, merge_all, persist, ConvertOptions, MapFrame, MapMetadata, NuScenesMap,
};
use rayon::ThreadPoolBuilder;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input GeoJSON files exported from QGIS, or directories containing them
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<PathBuf>,

    /// Map metadata YAML (resolution, origin, image)
    #[arg(short, long, value_name = "YAML")]
    metadata: PathBuf,

    /// Output nuScenes map JSON; merged into when it already exists
    #[arg(short, long, value_name = "JSON")]
    output: PathBuf,

    /// Image width in pixels (skips reading the image)
    #[arg(long, requires = "image_height")]
    image_width: Option<u32>,

    /// Image height in pixels (skips reading the image)
    #[arg(long, requires = "image_width")]
    image_height: Option<u32>,

    /// Also transform polygon hole vertices into the metric frame
    #[arg(long)]
    transform_holes: bool,

    /// Number of worker threads (default: number of CPU cores)
    #[arg(short, long)]
    threads: Option<usize>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let start_time = std::time::Instant::now();

    if let Some(threads) = args.threads {
        ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to build thread pool")?;
    }

    let frame = load_frame(&args)?;
    info!(
        "resolution={}, origin={:?}, image={}x{}px",
        frame.resolution, frame.origin, frame.image_width, frame.image_height
    );

    let options = ConvertOptions {
        transform_holes: args.transform_holes,
    };

    let input_files = collect_inputs(&args.inputs, &args.output)?;
    if input_files.is_empty() {
        anyhow::bail!("No GeoJSON input files found");
    }
    info!("Found {} GeoJSON input files", input_files.len());

    let converted = convert_all(&input_files, frame, options)?;
    let documents = converted
        .iter()
        .map(NuScenesMap::to_document)
        .collect::<qgis_nuscenes::Result<Vec<_>>>()?;
    let incoming = merge_all(documents).context("Input files disagree on canvas size")?;

    let summary = persist(&args.output, incoming)
        .with_context(|| format!("Failed to update {:?}", args.output))?;

    if summary.merged {
        info!("Merged {} into existing output", summary.converted);
    }
    info!("Output now holds {}", summary.written);

    let elapsed = start_time.elapsed();
    info!("Total processing time: {:?}", elapsed);

    Ok(())
}

fn load_frame(args: &Args) -> Result<MapFrame> {
    let metadata = MapMetadata::from_yaml_file(&args.metadata)
        .with_context(|| format!("Failed to load map metadata {:?}", args.metadata))?;

    match (args.image_width, args.image_height) {
        (Some(width), Some(height)) => Ok(metadata.frame(width, height)),
        _ => metadata
            .load_frame()
            .context("Failed to read image dimensions"),
    }
}

/// Converts every input on its own converter, in parallel, keeping input order.
fn convert_all(
    input_files: &[PathBuf],
    frame: MapFrame,
    options: ConvertOptions,
) -> Result<Vec<NuScenesMap>> {
    use rayon::prelude::*;

    let results: Vec<_> = input_files
        .par_iter()
        .map(|path| convert_path(path, frame, options))
        .collect();

    let mut maps = Vec::with_capacity(results.len());
    let mut errors = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(map) => maps.push(map),
            Err(e) => errors.push(format!("{}: {}", input_files[i].display(), e)),
        }
    }

    if !errors.is_empty() {
        error!("Failed to convert {} files:", errors.len());
        for err in &errors {
            error!("  {}", err);
        }
        anyhow::bail!("{} files failed to convert", errors.len());
    }

    Ok(maps)
}

fn collect_inputs(inputs: &[PathBuf], output: &Path) -> Result<Vec<PathBuf>> {
    let output = fs::canonicalize(output).ok();
    let mut files = Vec::new();
    for input in inputs {
        if input.is_file() {
            files.push(input.clone());
        } else if input.is_dir() {
            let mut found = Vec::new();
            collect_geojson_files(input, &mut found)?;
            found.sort();
            files.extend(found);
        } else {
            error!("Invalid input path: {:?}", input);
            anyhow::bail!("Input path must be a file or directory: {:?}", input);
        }
    }

    // The output may sit next to the inputs; never read it back as one.
    if let Some(output) = output {
        files.retain(|file| fs::canonicalize(file).ok().as_ref() != Some(&output));
    }
    Ok(files)
}

fn collect_geojson_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to read {:?}", dir))? {
        let path = entry?.path();
        if path.is_dir() {
            collect_geojson_files(&path, files)?;
        } else if matches!(
            path.extension().and_then(|s| s.to_str()),
            Some("geojson") | Some("json")
        ) {
            files.push(path);
        }
    }
    Ok(())
}
